#![warn(missing_docs)]
//! tryon - virtual try-on photos from a single garment picture.
//!
//! Upload a photo of a clothing item, pick who should wear it and where, and
//! a hosted image model renders a fashion photo of a model wearing it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tryon::{GeminiProvider, GenerateOutcome, IntakeSource, KeyGate, Scene, Session};
//!
//! #[tokio::main]
//! async fn main() -> tryon::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let session = Session::new(KeyGate::new(None, true), Arc::new(provider));
//!     session.bootstrap().await;
//!
//!     session.upload(IntakeSource::FilePicker("jacket.jpg".into())).await?;
//!     session.set_scene(Scene::Street);
//!
//!     if session.generate().await == GenerateOutcome::Completed {
//!         if let Some(image) = session.state().result() {
//!             tryon::presenter::download(image, ".")?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini` (default): Gemini (Google) image backend
//! - `cli` (default): the `tryon` command-line interface

pub mod config;
pub mod credential;
mod error;
pub mod image;
pub mod intake;
pub mod options;
pub mod presenter;
pub mod session;

// Re-export error types at crate root
pub use error::{Result, TryOnError, ENTITY_NOT_FOUND};

pub use config::{Config, ConfigBuilder};
pub use credential::{CredentialCapability, KeyGate, KeyStore, LoginOutcome, PromptKeySelector};
pub use image::{GeneratedImage, GenerationMetadata, ImageFormat, TryOnProvider, TryOnRequest};
pub use intake::{ClothingImage, ImageIntake, IntakeSource, PreviewRef};
pub use options::{Ethnicity, GenerationOptions, OptionGroup, Scene, Vibe};
pub use presenter::{View, DOWNLOAD_FILENAME};
pub use session::{GenerateOutcome, GenerationState, Session, SessionSnapshot};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, TryOnError};
    pub use crate::image::{GeneratedImage, TryOnProvider, TryOnRequest};
    pub use crate::intake::IntakeSource;
    pub use crate::options::{Ethnicity, GenerationOptions, OptionGroup, Scene, Vibe};
    pub use crate::session::{GenerateOutcome, GenerationState, Session};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiProvider;
}
