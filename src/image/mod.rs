//! Try-on image generation.

mod provider;
pub mod providers;
mod types;

pub use provider::TryOnProvider;
pub use types::{GeneratedImage, GenerationMetadata, ImageFormat, TryOnRequest};
