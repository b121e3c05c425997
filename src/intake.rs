//! Garment photo intake.
//!
//! Accepts one image either picked from disk or dropped in as an encoded
//! payload, and turns it into a base64 transfer string plus a local preview
//! reference.

use crate::error::{Result, TryOnError};
use crate::image::ImageFormat;
use base64::Engine;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where an upload came from.
#[derive(Debug, Clone)]
pub enum IntakeSource {
    /// A file chosen from disk.
    FilePicker(PathBuf),
    /// A payload handed over directly, as a data URI or bare base64.
    Dropped {
        /// Display name of the dropped item.
        name: String,
        /// `data:image/...;base64,...` or plain base64.
        payload: String,
    },
}

/// Locally displayable reference to the uploaded image.
///
/// Valid for the lifetime of the session that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRef(String);

impl PreviewRef {
    /// Wraps a reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn for_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self(format!("file://{}", absolute.display()))
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uploaded garment photo, ready for transfer.
#[derive(Debug, Clone)]
pub struct ClothingImage {
    /// Base64 payload with no data-URI prefix.
    pub encoded: String,
    /// Format detected from the decoded bytes.
    pub format: ImageFormat,
    /// Preview for local display.
    pub preview: PreviewRef,
}

impl ClothingImage {
    /// MIME type sent alongside the payload.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Approximate decoded size in bytes.
    pub fn size_hint(&self) -> usize {
        self.encoded.len() / 4 * 3
    }
}

/// Turns upload sources into [`ClothingImage`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageIntake;

impl ImageIntake {
    /// Creates an intake.
    pub fn new() -> Self {
        Self
    }

    /// Accepts one upload.
    ///
    /// Fails with [`TryOnError::Decode`] when the content is not a PNG, JPEG
    /// or WebP image, and with [`TryOnError::InvalidRequest`] when a picked
    /// file does not carry an image extension.
    pub async fn accept(&self, source: IntakeSource) -> Result<ClothingImage> {
        match source {
            IntakeSource::FilePicker(path) => self.accept_file(&path).await,
            IntakeSource::Dropped { name, payload } => self.accept_payload(&name, &payload),
        }
    }

    async fn accept_file(&self, path: &Path) -> Result<ClothingImage> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ImageFormat::from_extension(extension).is_none() {
            return Err(TryOnError::InvalidRequest(format!(
                "{} is not an image file",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let format = detect(&bytes, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), ?format, "image picked");

        Ok(ClothingImage {
            encoded: base64::engine::general_purpose::STANDARD.encode(&bytes),
            format,
            preview: PreviewRef::for_path(path),
        })
    }

    fn accept_payload(&self, name: &str, payload: &str) -> Result<ClothingImage> {
        let (declared, encoded) = split_data_uri(payload);
        let encoded: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&encoded))
            .map_err(|e| TryOnError::Decode(format!("{name}: {e}")))?;
        let format = detect(&bytes, name)?;

        if let Some(declared) = declared.and_then(ImageFormat::from_mime_type) {
            if declared != format {
                tracing::debug!(name, ?declared, ?format, "declared type differs from content");
            }
        }
        tracing::debug!(name, bytes = bytes.len(), ?format, "image dropped");

        // Re-encode so the payload is canonical padded base64.
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let preview = PreviewRef::new(format!("data:{};base64,{}", format.mime_type(), encoded));
        Ok(ClothingImage {
            encoded,
            format,
            preview,
        })
    }
}

/// Splits `data:<mime>;base64,<data>` into the MIME type and the data.
/// Input without the prefix is returned whole.
pub(crate) fn split_data_uri(input: &str) -> (Option<&str>, &str) {
    let input = input.trim();
    match input.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, data)) => {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            (mime, data)
        }
        None => (None, input),
    }
}

fn detect(bytes: &[u8], name: &str) -> Result<ImageFormat> {
    if bytes.is_empty() {
        return Err(TryOnError::Decode(format!("{name} is empty")));
    }
    ImageFormat::from_magic_bytes(bytes).ok_or_else(|| {
        TryOnError::Decode(format!("{name} is not a PNG, JPEG or WebP image"))
    })
}
