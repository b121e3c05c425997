//! Gemini (Google) try-on provider.

use crate::credential::KeyStore;
use crate::error::{parse_retry_after, sanitize_error_message, Result, TryOnError, ENTITY_NOT_FOUND};
use crate::image::provider::TryOnProvider;
use crate::image::types::{GeneratedImage, GenerationMetadata, ImageFormat, TryOnRequest};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }

    /// Parses a short alias (`flash`, `pro`) or a full model identifier.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_lowercase().as_str() {
            "flash" | "nano-banana" | "gemini-2.5-flash-image" => Some(Self::NanoBanana),
            "pro" | "nano-banana-pro" | "gemini-3-pro-image-preview" => Some(Self::NanoBananaPro),
            _ => None,
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    key_store: Option<KeyStore>,
    model: GeminiModel,
    base_url: Option<String>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Reads the API key from a shared store on every call, so keys
    /// selected later in the session take effect.
    pub fn key_store(mut self, store: KeyStore) -> Self {
        self.key_store = Some(store);
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root (e.g. for a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key source.
    pub fn build(self) -> Result<GeminiProvider> {
        let keys = match (self.key_store, self.api_key) {
            (Some(store), Some(key)) => {
                store.set(key);
                store
            }
            (Some(store), None) => store,
            (None, key) => {
                let key = key
                    .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
                    .ok_or_else(|| {
                        TryOnError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
                    })?;
                KeyStore::with_key(key)
            }
        };

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            keys,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Gemini try-on provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    keys: KeyStore,
    model: GeminiModel,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Returns the configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn generate_impl(&self, request: &TryOnRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let api_key = self
            .keys
            .get()
            .ok_or_else(|| TryOnError::Auth("no API key selected".into()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_try_on_request(request);
        tracing::debug!(
            model = self.model.as_str(),
            options = ?request.options,
            image_bytes = request.image.size_hint(),
            "submitting try-on request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let mut image = image_from_response(gemini_response)?;
        image.metadata = GenerationMetadata {
            model: Some(self.model.as_str().to_string()),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        };

        tracing::debug!(
            bytes = image.size(),
            duration_ms = image.metadata.duration_ms,
            "try-on image received"
        );
        Ok(image)
    }
}

#[async_trait]
impl TryOnProvider for GeminiProvider {
    async fn generate(&self, request: &TryOnRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> TryOnError {
    let text = sanitize_error_message(text);
    if text.contains(ENTITY_NOT_FOUND) {
        return TryOnError::EntityNotFound(text);
    }
    if status == 404 {
        return TryOnError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return TryOnError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 || text.contains("API key not valid") {
        return TryOnError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return TryOnError::ContentBlocked(text);
    }
    TryOnError::Api {
        status,
        message: text,
    }
}

fn image_from_response(response: GeminiResponse) -> Result<GeneratedImage> {
    // Blocks are reported with HTTP 200
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(TryOnError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        TryOnError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(TryOnError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                return Err(TryOnError::UnexpectedResponse(format!(
                    "Generation failed: {}. Try a different photo or options.",
                    finish_reason
                )));
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let content = candidate.content.ok_or_else(|| {
        TryOnError::UnexpectedResponse("No content in Gemini candidate".into())
    })?;

    let inline_data = content
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| {
            TryOnError::UnexpectedResponse("No image data in Gemini response".into())
        })?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(&inline_data.data)
        .map_err(|e| TryOnError::Decode(e.to_string()))?;

    let format = ImageFormat::from_mime_type(&inline_data.mime_type)
        .or_else(|| ImageFormat::from_magic_bytes(&data))
        .unwrap_or_default();

    Ok(GeneratedImage::new(data, format, GenerationMetadata::default()))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - either text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_try_on_request(req: &TryOnRequest) -> Self {
        // Garment photo first, then the instruction
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.image.mime_type().to_string(),
                    data: req.encoded_image().to_string(),
                },
            },
            GeminiRequestPart::Text { text: req.prompt() },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{ClothingImage, PreviewRef};
    use crate::options::{Ethnicity, GenerationOptions, Scene, Vibe};
    use reqwest::header::HeaderMap;

    fn request() -> TryOnRequest {
        TryOnRequest::new(
            ClothingImage {
                encoded: "/9j/4AAQ".into(),
                format: ImageFormat::Jpeg,
                preview: PreviewRef::new("file:///tmp/jacket.jpg"),
            },
            GenerationOptions::new(Ethnicity::Latino, Vibe::Elegant, Scene::Cafe),
        )
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "gemini-3-pro-image-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_gemini_model_from_alias() {
        assert_eq!(GeminiModel::from_alias("PRO"), Some(GeminiModel::NanoBananaPro));
        assert_eq!(GeminiModel::from_alias("flash"), Some(GeminiModel::NanoBanana));
        assert_eq!(GeminiModel::from_alias("dall-e"), None);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::NanoBananaPro)
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        assert_eq!(provider.model(), GeminiModel::NanoBananaPro);
        assert_eq!(provider.base_url, "http://localhost:9999");
        assert_eq!(provider.keys.get().as_deref(), Some("test-key"));
    }

    #[test]
    fn test_builder_with_empty_store_defers_key() {
        let store = KeyStore::new();
        let provider = GeminiProvider::builder()
            .key_store(store.clone())
            .build()
            .unwrap();
        assert!(provider.keys.get().is_none());

        store.set("picked-later");
        assert_eq!(provider.keys.get().as_deref(), Some("picked-later"));
    }

    #[tokio::test]
    async fn test_generate_without_key_is_auth_error() {
        let provider = GeminiProvider::builder()
            .key_store(KeyStore::new())
            .build()
            .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, TryOnError::Auth(_)));
    }

    #[test]
    fn test_request_construction() {
        let req = request();
        let gemini_req = GeminiRequest::from_try_on_request(&req);

        assert_eq!(gemini_req.contents.len(), 1);
        assert_eq!(gemini_req.contents[0].parts.len(), 2);
        assert_eq!(
            gemini_req.generation_config.response_modalities,
            vec!["IMAGE"]
        );

        let json = serde_json::to_value(&gemini_req).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "/9j/4AAQ");
        assert_eq!(parts[1]["text"], req.prompt());
        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_image_from_response() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your photo"},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let image = image_from_response(resp).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.data[..4], [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_image_from_response_without_image() {
        let json = r#"{"candidates": [{"content": {"parts": [{}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            image_from_response(resp),
            Err(TryOnError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_image_from_response_prompt_blocked() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        match image_from_response(resp) {
            Err(TryOnError::ContentBlocked(msg)) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_image_from_response_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            image_from_response(resp),
            Err(TryOnError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_parse_error_entity_not_found() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let err = parse_error(404, body, &HeaderMap::new());
        assert!(matches!(err, TryOnError::EntityNotFound(_)));
        assert!(err.is_entity_not_found());
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = HeaderMap::new();
        assert!(matches!(
            parse_error(404, "no such model", &headers),
            TryOnError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(403, "denied", &headers),
            TryOnError::Auth(_)
        ));
        assert!(matches!(
            parse_error(
                400,
                r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#,
                &headers
            ),
            TryOnError::Auth(_)
        ));
        assert!(matches!(
            parse_error(400, "request blocked by policy", &headers),
            TryOnError::ContentBlocked(_)
        ));

        let mut with_retry = HeaderMap::new();
        with_retry.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        match parse_error(429, "slow down", &with_retry) {
            TryOnError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(12)))
            }
            other => panic!("unexpected: {other:?}"),
        }

        match parse_error(500, "boom", &headers) {
            TryOnError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
