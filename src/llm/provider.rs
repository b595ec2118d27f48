use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::observers::payload::Payload;
use crate::tools::definition::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    pub fn user(content: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_data_url(media_type: &str, base64_data: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{media_type};base64,{base64_data}"),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

/// The provider request body as it will go over the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum InputDict {
    Structured(Payload),
    /// Already JSON-encoded, as handed to the transport.
    Encoded(String),
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub api_base: String,
    pub body: InputDict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// A chat provider split at the point observers need: the fully built
/// request exists before anything is sent.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn model_id(&self) -> &str;

    fn build_request(&self, request: &CompletionRequest) -> Result<ProviderRequest, AppError>;

    async fn send(&self, request: &ProviderRequest) -> Result<LLMResponse, AppError>;
}
