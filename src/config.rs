//! Runtime configuration.

use crate::error::{Result, TryOnError};
#[cfg(feature = "gemini")]
use crate::image::providers::GeminiModel;
use std::path::PathBuf;

/// Key baked in at compile time, if the build provided one.
const BUILD_API_KEY: Option<&str> = option_env!("API_KEY");

/// Where the generated photo is written by default.
const DEFAULT_OUTPUT_DIR: &str = ".";

/// Settings resolved from the environment, overridable in code.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-provisioned API key, if any.
    pub api_key: Option<String>,
    /// Gemini model to call.
    #[cfg(feature = "gemini")]
    pub model: GeminiModel,
    /// Directory the download is written to.
    pub output_dir: PathBuf,
}

impl Config {
    /// Creates a new `ConfigBuilder`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolves everything from the environment.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Returns true if a key was provisioned ahead of time.
    pub fn has_provisioned_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    #[cfg(feature = "gemini")]
    model: Option<GeminiModel>,
    output_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, `API_KEY`, then the
    /// key baked in at build time.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model. Falls back to `TRYON_MODEL` (`flash` or `pro`).
    #[cfg(feature = "gemini")]
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the download directory. Falls back to `TRYON_OUTPUT_DIR`.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<Config> {
        let api_key = self
            .api_key
            .or_else(|| env_non_empty("GOOGLE_API_KEY"))
            .or_else(|| env_non_empty("API_KEY"))
            .or_else(|| BUILD_API_KEY.map(str::to_string))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        #[cfg(feature = "gemini")]
        let model = match self.model {
            Some(model) => model,
            None => match env_non_empty("TRYON_MODEL") {
                Some(alias) => GeminiModel::from_alias(&alias).ok_or_else(|| {
                    TryOnError::InvalidRequest(format!(
                        "TRYON_MODEL must be 'flash' or 'pro', got '{alias}'"
                    ))
                })?,
                None => GeminiModel::default(),
            },
        };

        let output_dir = self
            .output_dir
            .or_else(|| env_non_empty("TRYON_OUTPUT_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Config {
            api_key,
            #[cfg(feature = "gemini")]
            model,
            output_dir,
        })
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        let config = Config::builder()
            .api_key("  k-123 ")
            .output_dir("/tmp/looks")
            .build()
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert!(config.has_provisioned_key());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/looks"));
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn test_explicit_model() {
        let config = Config::builder()
            .model(GeminiModel::NanoBananaPro)
            .build()
            .unwrap();
        assert_eq!(config.model, GeminiModel::NanoBananaPro);
    }

    #[test]
    fn test_from_env_reads_output_dir() {
        std::env::set_var("TRYON_OUTPUT_DIR", "/tmp/tryon-from-env");
        let config = Config::from_env();
        std::env::remove_var("TRYON_OUTPUT_DIR");

        assert_eq!(
            config.unwrap().output_dir,
            PathBuf::from("/tmp/tryon-from-env")
        );
    }

    #[test]
    fn test_blank_explicit_key_is_absent() {
        let config = Config::builder().api_key("   ").build().unwrap();
        assert_eq!(config.api_key, None);
    }
}
