use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::AppError;
use crate::llm::model_info::provider_model_id;
use crate::llm::provider::{
    CompletionRequest, ContentPart, InputDict, LLMProvider, LLMResponse, Message, MessageRole,
    ProviderRequest, TokenUsage,
};
use crate::observers::payload::Payload;
use crate::tools::definition::{BuiltinTool, ToolCall, ToolDefinition};

/// Bedrock Runtime `Converse` over HTTPS with a Bedrock API key.
#[derive(Clone)]
pub struct BedrockConverseProvider {
    client: reqwest::Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl BedrockConverseProvider {
    pub fn new(
        model: String,
        api_key: Option<String>,
        region: &str,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let base_url = base_url
            .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com"))
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base_url)
            .map_err(|e| AppError::Config(format!("invalid Bedrock base url '{base_url}': {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            model,
            api_key,
            base_url,
        })
    }

    fn endpoint(&self) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| AppError::Config(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("'{}' cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .push("model")
            .push(provider_model_id(&self.model))
            .push("converse");
        Ok(url)
    }

    fn convert_messages(&self, messages: &[Message]) -> Result<(Vec<Payload>, Vec<Payload>), AppError> {
        let mut system: Vec<Payload> = Vec::new();
        let mut out: Vec<Payload> = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    for part in &msg.content {
                        match part {
                            ContentPart::Text { text } if !text.trim().is_empty() => {
                                system.push(json!({ "text": text }).into());
                            }
                            ContentPart::Text { .. } => {}
                            ContentPart::ImageUrl { .. } => {
                                return Err(AppError::BadRequest(
                                    "system messages cannot carry images".to_string(),
                                ))
                            }
                        }
                    }
                }
                MessageRole::User | MessageRole::Assistant => {
                    let role = if msg.role == MessageRole::User { "user" } else { "assistant" };
                    let blocks = msg
                        .content
                        .iter()
                        .map(convert_part)
                        .collect::<Result<Vec<_>, _>>()?;
                    out.push(
                        Payload::object()
                            .with("role", json!(role))
                            .with("content", blocks),
                    );
                }
            }
        }

        Ok((system, out))
    }
}

fn data_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/(?P<format>[a-zA-Z0-9.+-]+);base64,(?P<data>[A-Za-z0-9+/=\s]+)$")
            .expect("data url pattern is valid")
    })
}

fn convert_part(part: &ContentPart) -> Result<Payload, AppError> {
    match part {
        ContentPart::Text { text } => Ok(json!({ "text": text }).into()),
        ContentPart::ImageUrl { image_url } => {
            let caps = data_url_pattern().captures(&image_url.url).ok_or_else(|| {
                AppError::BadRequest("only base64 data urls are supported for images".to_string())
            })?;
            let format = match caps["format"].to_ascii_lowercase().as_str() {
                "png" => "png",
                "jpg" | "jpeg" => "jpeg",
                "gif" => "gif",
                "webp" => "webp",
                other => {
                    return Err(AppError::BadRequest(format!("unsupported image format '{other}'")))
                }
            };
            let data: String = caps["data"].chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD.decode(data)?;
            Ok(Payload::object().with(
                "image",
                Payload::object()
                    .with("format", json!(format))
                    .with("source", Payload::object().with("bytes", Payload::Bytes(bytes))),
            ))
        }
    }
}

/// Anthropic beta flag required by a versioned builtin tool type.
fn anthropic_beta_for(tool_type: &str) -> Option<&'static str> {
    if tool_type.ends_with("_20241022") {
        Some("computer-use-2024-10-22")
    } else if tool_type.ends_with("_20250124") {
        Some("computer-use-2025-01-24")
    } else {
        None
    }
}

fn convert_builtin(tool: &BuiltinTool) -> Result<Value, AppError> {
    let name = tool.name().ok_or_else(|| {
        AppError::BadRequest(format!("builtin tool '{}' is missing a name", tool.tool_type))
    })?;
    let mut out = serde_json::Map::new();
    out.insert("type".to_string(), json!(tool.tool_type));
    out.insert("name".to_string(), json!(name));
    out.extend(tool.settings());
    Ok(Value::Object(out))
}

/// Function tools go to `toolConfig`; builtin tools go to Anthropic's own
/// `tools` list inside `additionalModelRequestFields`.
fn convert_tools(tools: &[ToolDefinition]) -> Result<(Option<Value>, Option<Value>), AppError> {
    let mut specs = Vec::new();
    let mut builtins = Vec::new();
    let mut betas = BTreeSet::new();

    for tool in tools {
        match tool {
            ToolDefinition::Function(f) => {
                let mut spec = json!({
                    "name": f.name,
                    "inputSchema": { "json": f.parameters }
                });
                if !f.description.trim().is_empty() {
                    spec["description"] = json!(f.description);
                }
                specs.push(json!({ "toolSpec": spec }));
            }
            ToolDefinition::Builtin(b) => {
                builtins.push(convert_builtin(b)?);
                if let Some(beta) = anthropic_beta_for(&b.tool_type) {
                    betas.insert(beta);
                }
            }
        }
    }

    let tool_config = (!specs.is_empty()).then(|| json!({ "tools": specs }));
    let additional = (!builtins.is_empty()).then(|| {
        let mut fields = json!({ "tools": builtins });
        if !betas.is_empty() {
            fields["anthropic_beta"] = json!(betas.into_iter().collect::<Vec<_>>());
        }
        fields
    });
    Ok((tool_config, additional))
}

#[async_trait]
impl LLMProvider for BedrockConverseProvider {
    fn provider_name(&self) -> &'static str {
        "bedrock_converse"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<ProviderRequest, AppError> {
        let (system, messages) = self.convert_messages(&request.messages)?;
        let (tool_config, additional) = convert_tools(&request.tools)?;

        let mut inference = json!({ "maxTokens": request.max_tokens });
        if let Some(temperature) = request.temperature {
            inference["temperature"] = json!(temperature);
        }

        let mut body = Payload::object().with("messages", messages);
        if !system.is_empty() {
            body = body.with("system", system);
        }
        body = body.with("inferenceConfig", inference);
        if let Some(tool_config) = tool_config {
            body = body.with("toolConfig", tool_config);
        }
        if let Some(additional) = additional {
            body = body.with("additionalModelRequestFields", additional);
        }

        Ok(ProviderRequest {
            api_base: self.endpoint()?.to_string(),
            body: InputDict::Encoded(body.to_json_string()?),
        })
    }

    async fn send(&self, request: &ProviderRequest) -> Result<LLMResponse, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Authentication("AWS_BEARER_TOKEN_BEDROCK is not set".to_string())
        })?;
        let body = match &request.body {
            InputDict::Encoded(raw) => raw.clone(),
            InputDict::Structured(payload) => payload.to_json_string()?,
        };

        let resp = self
            .client
            .post(&request.api_base)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(AppError::from_status(status, message));
        }

        let parsed: ConverseResponse = resp.json().await?;
        debug!(stop_reason = ?parsed.stop_reason, "converse response received");

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.output.message.map(|m| m.content).unwrap_or_default() {
            if let Some(text) = block.text {
                content.push_str(&text);
            }
            if let Some(tool_use) = block.tool_use {
                tool_calls.push(ToolCall {
                    id: tool_use.tool_use_id,
                    name: tool_use.name,
                    arguments: tool_use.input,
                });
            }
        }

        let usage = parsed.usage.unwrap_or_default();
        Ok(LLMResponse {
            id: request_id,
            content,
            usage: TokenUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            },
            model: self.model.clone(),
            finish_reason: parsed.stop_reason,
            tool_calls,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    stop_reason: Option<String>,
    usage: Option<ConverseUsage>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: Option<ConverseMessage>,
}

#[derive(Debug, Deserialize)]
struct ConverseMessage {
    #[serde(default)]
    content: Vec<ConverseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseContentBlock {
    text: Option<String>,
    tool_use: Option<ConverseToolUse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseToolUse {
    tool_use_id: String,
    name: String,
    #[serde(default)]
    input: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::tools::builtin::computer_use_definitions;

    fn provider(base_url: &str, api_key: Option<&str>) -> BedrockConverseProvider {
        BedrockConverseProvider::new(
            "bedrock/anthropic.test-model".to_string(),
            api_key.map(str::to_string),
            "us-east-1",
            Some(base_url.to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request(tools: Vec<ToolDefinition>) -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                Message::new(MessageRole::System, vec![ContentPart::text("be brief")]),
                Message::user(vec![
                    ContentPart::text("click the button"),
                    ContentPart::image_data_url("image/png", "UE5H"),
                ]),
            ],
            tools,
            max_tokens: 64,
            temperature: Some(0.2),
        }
    }

    fn body_of(req: &ProviderRequest) -> Value {
        match &req.body {
            InputDict::Encoded(raw) => serde_json::from_str(raw).unwrap(),
            InputDict::Structured(_) => panic!("expected an encoded body"),
        }
    }

    #[test]
    fn default_endpoint_uses_region_and_provider_model_id() {
        let p = BedrockConverseProvider::new(
            "bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0".to_string(),
            None,
            "us-west-2",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            p.endpoint().unwrap().as_str(),
            "https://bedrock-runtime.us-west-2.amazonaws.com/model/us.anthropic.claude-3-5-sonnet-20241022-v2:0/converse"
        );
    }

    #[test]
    fn builds_converse_body_with_both_tool_kinds() {
        let p = provider("http://localhost:9", Some("k"));
        let req = p.build_request(&request(computer_use_definitions())).unwrap();
        let body = body_of(&req);

        assert_eq!(req.api_base, "http://localhost:9/model/anthropic.test-model/converse");
        assert_eq!(body["system"], json!([{ "text": "be brief" }]));
        assert_eq!(body["inferenceConfig"], json!({ "maxTokens": 64, "temperature": 0.2 }));

        let user = &body["messages"][0];
        assert_eq!(user["role"], "user");
        assert_eq!(user["content"][0], json!({ "text": "click the button" }));
        assert_eq!(
            user["content"][1],
            json!({ "image": { "format": "png", "source": { "bytes": "UE5H" } } })
        );

        let specs = body["toolConfig"]["tools"].as_array().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0]["toolSpec"]["name"], "get_weather");
        assert_eq!(specs[0]["toolSpec"]["inputSchema"]["json"]["required"], json!(["location"]));

        let extra = &body["additionalModelRequestFields"];
        assert_eq!(extra["anthropic_beta"], json!(["computer-use-2024-10-22"]));
        assert_eq!(
            extra["tools"][0],
            json!({
                "type": "computer_20241022",
                "name": "computer",
                "display_height_px": 768,
                "display_width_px": 1024,
                "display_number": 0
            })
        );
        assert_eq!(extra["tools"][1], json!({ "type": "bash_20241022", "name": "bash" }));
        assert_eq!(
            extra["tools"][2],
            json!({ "type": "text_editor_20241022", "name": "str_replace_editor" })
        );
    }

    #[test]
    fn omits_tool_sections_without_tools() {
        let p = provider("http://localhost:9", Some("k"));
        let body = body_of(&p.build_request(&request(Vec::new())).unwrap());
        assert!(body.get("toolConfig").is_none());
        assert!(body.get("additionalModelRequestFields").is_none());
    }

    #[test]
    fn rejects_remote_image_urls() {
        let p = provider("http://localhost:9", Some("k"));
        let mut req = request(Vec::new());
        req.messages[1].content[1] = ContentPart::ImageUrl {
            image_url: crate::llm::provider::ImageUrl {
                url: "https://example.com/a.png".to_string(),
            },
        };
        let err = p.build_request(&req).unwrap_err();
        assert_eq!(err.kind(), "BadRequestError");
    }

    #[tokio::test]
    async fn parses_text_and_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/model/anthropic.test-model/converse"))
            .and(header("authorization", "Bearer k"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-amzn-requestid", "req-42")
                    .set_body_json(json!({
                        "output": { "message": { "role": "assistant", "content": [
                            { "text": "Taking a screenshot." },
                            { "toolUse": { "toolUseId": "tu_1", "name": "computer", "input": { "action": "screenshot" } } }
                        ] } },
                        "stopReason": "tool_use",
                        "usage": { "inputTokens": 1200, "outputTokens": 40, "totalTokens": 1240 }
                    })),
            )
            .mount(&server)
            .await;

        let p = provider(&server.uri(), Some("k"));
        let req = p.build_request(&request(computer_use_definitions())).unwrap();
        let resp = p.send(&req).await.unwrap();

        assert_eq!(resp.id.as_deref(), Some("req-42"));
        assert_eq!(resp.content, "Taking a screenshot.");
        assert_eq!(resp.finish_reason.as_deref(), Some("tool_use"));
        assert_eq!(resp.usage.input_tokens, 1200);
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].name, "computer");
        assert_eq!(resp.tool_calls[0].arguments, json!({ "action": "screenshot" }));
    }

    #[tokio::test]
    async fn maps_error_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "The model returned an error" })),
            )
            .mount(&server)
            .await;

        let p = provider(&server.uri(), Some("k"));
        let req = p.build_request(&request(Vec::new())).unwrap();
        let err = p.send(&req).await.unwrap_err();

        assert_eq!(err.kind(), "BadRequestError");
        assert!(err.to_string().contains("The model returned an error"));
    }

    #[tokio::test]
    async fn missing_api_key_is_an_authentication_error() {
        let p = provider("http://localhost:9", None);
        let req = p.build_request(&request(Vec::new())).unwrap();
        let err = p.send(&req).await.unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
    }
}
