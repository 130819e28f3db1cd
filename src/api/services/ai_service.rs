//! AI service for product content generation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SERVICE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const SYSTEM_MESSAGE: &str = "You are a Shopify product content assistant.";
pub const TEMPERATURE: f64 = 0.4;
pub const MAX_TOKENS: u32 = 300;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("AI service not configured: OPENAI_API_KEY is missing")]
    NotConfigured,
    #[error("Failed to send request to AI service: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service returned error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid AI response format")]
    InvalidResponse,
    #[error("AI service returned no content")]
    EmptyContent,
    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Generation cancelled")]
    Cancelled,
}

/// Input of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub product_id: String,
    /// Flow prompt followed by the product's source context.
    pub text: String,
    /// Image passed along as visual context.
    pub image_url: Option<String>,
}

/// Outbound text generation.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Generate content for one request, returning trimmed non-empty text
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Chat-completions client with fixed model settings.
pub struct OpenAIGenerator {
    client: Option<Client>,
    api_key: Option<String>,
    model: String,
    url: String,
}

impl OpenAIGenerator {
    /// Create a generator. Without an API key every call fails with
    /// [`GenerationError::NotConfigured`].
    pub fn new(api_key: Option<String>, model: impl Into<String>, url: impl Into<String>) -> Self {
        let client = if api_key.is_some() {
            Some(Client::new())
        } else {
            warn!("OpenAI API key not configured");
            None
        };

        Self {
            client,
            api_key,
            model: model.into(),
            url: url.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut content = vec![json!({ "type": "text", "text": request.text })];
        if let Some(url) = &request.image_url {
            content.push(json!({ "type": "image_url", "image_url": { "url": url } }));
        }

        json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": content }
            ]
        })
    }
}

#[async_trait]
impl GenerationApi for OpenAIGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let (client, api_key) = match (&self.client, &self.api_key) {
            (Some(client), Some(api_key)) => (client, api_key),
            _ => return Err(GenerationError::NotConfigured),
        };

        debug!(
            product_id = %request.product_id,
            with_image = request.image_url.is_some(),
            "Calling AI service"
        );

        let response = client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let response_json: Value = response.json().await?;
        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a completion, trimmed.
pub fn extract_content(response: &Value) -> Result<String, GenerationError> {
    let content = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Some(Value::String(_)) | Some(Value::Null) => Err(GenerationError::EmptyContent),
        _ => Err(GenerationError::InvalidResponse),
    }
}
