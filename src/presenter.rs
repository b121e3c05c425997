//! Text rendering of the session and the download action.

use crate::error::Result;
use crate::image::GeneratedImage;
use crate::options::{GenerationOptions, OptionGroup};
use crate::session::{GenerationState, SessionSnapshot};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// File name the generated photo is saved under.
pub const DOWNLOAD_FILENAME: &str = "model-try-on.png";

/// Top-level screen.
#[derive(Debug, Clone)]
pub enum View {
    /// No credential yet; only the login prompt is available.
    Login,
    /// The try-on workspace.
    Workspace(SessionSnapshot),
}

/// Renders the login prompt.
pub fn render_login() -> String {
    [
        "Welcome to the virtual fitting room.",
        "Connect a Gemini API key to start generating try-on photos.",
        "Use a key from a Google Cloud project with billing enabled:",
        "https://ai.google.dev/gemini-api/docs/billing",
    ]
    .join("\n")
}

/// Renders one option group with its selection marked.
pub fn render_group<T: OptionGroup>(step: u8, selected: T) -> String {
    let mut out = format!("[{step}] {}\n", T::TITLE);
    for variant in T::variants() {
        let marker = if *variant == selected { "(*)" } else { "( )" };
        let _ = writeln!(out, "    {marker} {:<16} {}", variant.as_str(), variant.label());
    }
    out
}

/// Renders all three option groups.
pub fn render_options(options: &GenerationOptions) -> String {
    let mut out = render_group(2, options.ethnicity);
    out.push_str(&render_group(3, options.vibe));
    out.push_str(&render_group(4, options.scene));
    out
}

/// Renders the result area.
pub fn render_result(state: &GenerationState) -> String {
    match state {
        GenerationState::Failed(message) => format!("Generation failed\n  {message}"),
        GenerationState::Pending => {
            "Tailoring your look... this can take a few seconds.".to_string()
        }
        GenerationState::Empty => "Your generated photo will appear here.".to_string(),
        GenerationState::Ready(image) => {
            let mut out = format!(
                "Generated photo ready: {} ({} bytes)",
                image.format.mime_type(),
                image.size()
            );
            if let Some(model) = &image.metadata.model {
                let _ = write!(out, " via {model}");
            }
            if let Some(ms) = image.metadata.duration_ms {
                let _ = write!(out, " in {ms}ms");
            }
            let _ = write!(out, "\n  Download saves it as {DOWNLOAD_FILENAME}");
            out
        }
    }
}

/// Renders the whole screen.
pub fn render(view: &View) -> String {
    match view {
        View::Login => render_login(),
        View::Workspace(snapshot) => {
            let upload = match &snapshot.preview {
                Some(preview) if preview.as_str().starts_with("data:") => {
                    "[1] Clothing photo: dropped image".to_string()
                }
                Some(preview) => format!("[1] Clothing photo: {preview}"),
                None => "[1] Clothing photo: none (upload a JPG or PNG)".to_string(),
            };
            let action = if snapshot.state.is_pending() {
                "Generating..."
            } else if snapshot.can_generate {
                "Ready: run `generate`"
            } else {
                "Upload a photo to enable generation"
            };
            format!(
                "{upload}\n{}\n{action}\n\n{}",
                render_options(&snapshot.options),
                render_result(&snapshot.state)
            )
        }
    }
}

/// Saves the generated photo into `dir` under [`DOWNLOAD_FILENAME`].
pub fn download(image: &GeneratedImage, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(DOWNLOAD_FILENAME);
    image.save(&path)?;
    tracing::info!(path = %path.display(), bytes = image.size(), "download saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{GenerationMetadata, ImageFormat};
    use crate::intake::PreviewRef;
    use crate::options::{Ethnicity, Scene, Vibe};

    fn image() -> GeneratedImage {
        GeneratedImage::new(
            vec![9; 10],
            ImageFormat::Png,
            GenerationMetadata {
                model: Some("gemini-2.5-flash-image".into()),
                duration_ms: Some(1200),
            },
        )
    }

    #[test]
    fn test_group_marks_exactly_one() {
        let rendered = render_group(3, Vibe::Elegant);
        assert_eq!(rendered.matches("(*)").count(), 1);
        assert_eq!(rendered.matches("( )").count(), Vibe::ALL.len() - 1);
        let selected = rendered.lines().find(|l| l.contains("(*)")).unwrap();
        assert!(selected.contains("elegant"));
    }

    #[test]
    fn test_result_states_are_distinct() {
        let rendered = [
            render_result(&GenerationState::Empty),
            render_result(&GenerationState::Pending),
            render_result(&GenerationState::Failed("quota exceeded".into())),
            render_result(&GenerationState::Ready(image())),
        ];
        for (i, a) in rendered.iter().enumerate() {
            for b in &rendered[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(rendered[2].contains("quota exceeded"));
        assert!(rendered[3].contains(DOWNLOAD_FILENAME));
        assert!(rendered[3].contains("gemini-2.5-flash-image"));
    }

    #[test]
    fn test_render_login_and_workspace() {
        assert!(render(&View::Login).contains("API key"));

        let snapshot = SessionSnapshot {
            options: GenerationOptions::new(Ethnicity::Black, Vibe::Cool, Scene::Street),
            preview: Some(PreviewRef::new("file:///tmp/tee.png")),
            state: GenerationState::Empty,
            can_generate: true,
        };
        let screen = render(&View::Workspace(snapshot));
        assert!(screen.contains("file:///tmp/tee.png"));
        assert!(screen.contains("Ready"));
        assert_eq!(screen.matches("(*)").count(), 3);
    }

    #[test]
    fn test_download_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloads");
        let path = download(&image(), &target).unwrap();
        assert_eq!(path, target.join(DOWNLOAD_FILENAME));
        assert_eq!(std::fs::read(&path).unwrap(), vec![9; 10]);
    }
}
