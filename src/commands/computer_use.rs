use std::io::{self, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

use crate::error::AppError;
use crate::llm::model_info;
use crate::llm::pipeline::CompletionPipeline;
use crate::llm::provider::{CompletionRequest, ContentPart, LLMResponse, Message};
use crate::models::llm::{MissingImagePolicy, ProbeConfig};
use crate::tools::builtin::computer_use_definitions;

/// A 1x1 PNG used when the screenshot is missing.
pub const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

#[derive(Debug)]
pub enum ProbeOutcome {
    Success(LLMResponse),
    CallFailed(AppError),
}

pub fn load_screenshot(path: &Path, policy: MissingImagePolicy) -> Result<String, AppError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(STANDARD.encode(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => match policy {
            MissingImagePolicy::Placeholder => {
                warn!(path = %path.display(), "screenshot not found, using a placeholder image");
                Ok(PLACEHOLDER_PNG_BASE64.to_string())
            }
            MissingImagePolicy::Abort => Err(AppError::Input(format!(
                "screenshot '{}' not found",
                path.display()
            ))),
        },
        Err(e) => Err(e.into()),
    }
}

pub fn build_request(config: &ProbeConfig, screenshot_base64: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(vec![
            ContentPart::text(config.instruction.clone()),
            ContentPart::image_data_url("image/png", screenshot_base64),
        ])],
        tools: computer_use_definitions(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
    }
}

fn write_model_info(out: &mut impl Write, model: &str) -> io::Result<()> {
    let base = model_info::base_model(model);
    writeln!(out, "Model: {model}")?;
    writeln!(out, "Base model: {base}")?;
    writeln!(out, "Base model starts with 'anthropic': {}", base.starts_with("anthropic"))?;
    writeln!(
        out,
        "Supported params for {model}: {:?}",
        model_info::supported_params(model)
    )
}

/// Sends one computer-use request and prints the response or the error.
///
/// Only a fatal input problem (missing screenshot under the abort policy,
/// unreadable file) or a failure to write the report is returned as `Err`.
/// A failed provider call is reported and returned as
/// [`ProbeOutcome::CallFailed`].
pub async fn run_computer_use_probe(
    pipeline: &CompletionPipeline,
    config: &ProbeConfig,
    out: &mut impl Write,
) -> Result<ProbeOutcome, AppError> {
    let model = pipeline.provider().model_id().to_string();
    write_model_info(out, &model)?;

    let screenshot = load_screenshot(&config.image_path, config.missing_image)?;
    let request = build_request(config, &screenshot);
    let tool_names: Vec<&str> = request.tools.iter().filter_map(|t| t.name()).collect();
    info!(
        model = %model,
        tools = ?tool_names,
        builtin_tools = request.tools.iter().filter(|t| t.is_builtin()).count(),
        screenshot_b64_len = screenshot.len(),
        "issuing computer-use completion"
    );

    match pipeline.completion(request).await {
        Ok(resp) => {
            writeln!(out, "Success! Response:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&resp)?)?;
            Ok(ProbeOutcome::Success(resp))
        }
        Err(e) => {
            writeln!(out, "Error: {e}")?;
            writeln!(out, "Error type: {}", e.kind())?;
            Ok(ProbeOutcome::CallFailed(e))
        }
    }
}
