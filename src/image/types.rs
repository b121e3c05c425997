//! Core types for try-on generation.

use crate::error::Result;
use crate::intake::ClothingImage;
use crate::options::{GenerationOptions, OptionGroup};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A single try-on submission: one garment photo and one options snapshot.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    /// The uploaded garment.
    pub image: ClothingImage,
    /// Presentation options captured at submission time.
    pub options: GenerationOptions,
}

impl TryOnRequest {
    /// Creates a new request.
    pub fn new(image: ClothingImage, options: GenerationOptions) -> Self {
        Self { image, options }
    }

    /// Base64 payload of the garment photo, without any data-URI prefix.
    pub fn encoded_image(&self) -> &str {
        &self.image.encoded
    }

    /// Builds the instruction sent alongside the garment photo.
    pub fn prompt(&self) -> String {
        let GenerationOptions {
            ethnicity,
            vibe,
            scene,
        } = self.options;

        format!(
            "Create a photorealistic, full-body fashion photograph of {} model wearing the \
             clothing item shown in the provided image. Reproduce the garment faithfully: keep \
             its colors, fabric, pattern, cut and details exactly as shown. The model's \
             personality and styling should feel {}, reflected in pose and expression. \
             Setting: {}. Professional lighting, sharp focus, natural proportions. \
             Output only the photograph.",
            ethnicity.prompt_fragment(),
            vibe.prompt_fragment(),
            scene.prompt_fragment(),
        )
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be displayed or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a displayable data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::PreviewRef;
    use crate::options::{Ethnicity, Scene, Vibe};

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a......"), None);
        assert_eq!(ImageFormat::from_magic_bytes(&PNG_MAGIC[..4]), None);
    }

    #[test]
    fn test_format_from_extension_and_mime() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("txt"), None);
        assert_eq!(
            ImageFormat::from_mime_type("image/webp"),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_prompt_mentions_every_option() {
        let image = ClothingImage {
            encoded: "AAAA".into(),
            format: ImageFormat::Png,
            preview: PreviewRef::new("file:///tmp/shirt.png"),
        };
        let options = GenerationOptions::new(Ethnicity::Black, Vibe::Vintage, Scene::Beach);
        let prompt = TryOnRequest::new(image, options).prompt();

        assert!(prompt.contains(Ethnicity::Black.prompt_fragment()));
        assert!(prompt.contains(Vibe::Vintage.prompt_fragment()));
        assert!(prompt.contains(Scene::Beach.prompt_fragment()));
    }

    #[test]
    fn test_data_url() {
        let image = GeneratedImage::new(
            vec![1, 2, 3],
            ImageFormat::Jpeg,
            GenerationMetadata::default(),
        );
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,AQID");
        assert_eq!(image.size(), 3);
    }
}
