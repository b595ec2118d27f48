use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::llm::provider::{InputDict, Message};
use crate::observers::payload::Payload;
use crate::observers::{CallDetails, CallObserver, CallOutcome};

/// Writes the provider request body of each call to a JSON file.
///
/// The file name is fixed when the inspector is created and every call
/// overwrites it, so the file always holds the most recent request.
#[derive(Debug, Clone)]
pub struct PayloadInspector {
    output_file: PathBuf,
}

impl PayloadInspector {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let name = format!("bedrock_input_payload_{}.json", Utc::now().timestamp());
        Self::with_output_file(dir.as_ref().join(name))
    }

    pub fn with_output_file(output_file: impl Into<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    fn write_payload(&self, payload: &Payload) -> Result<(), AppError> {
        let text = payload.to_pretty_json()?;
        std::fs::write(&self.output_file, text)?;
        Ok(())
    }
}

/// Decodes an encoded body, keeping the raw string when it is not JSON.
fn decode_input(input: &InputDict) -> Payload {
    match input {
        InputDict::Structured(payload) => payload.clone(),
        InputDict::Encoded(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                warn!(error = %e, "could not parse input payload as JSON, writing it as a string");
                Payload::Json(Value::String(raw.clone()))
            }
        },
    }
}

impl CallObserver for PayloadInspector {
    fn log_pre_api_call(&self, _model: &str, _messages: &[Message], details: &CallDetails) {
        let payload = decode_input(&details.additional_args.complete_input_dict);
        match self.write_payload(&payload) {
            Ok(()) => info!(path = %self.output_file.display(), "input payload written"),
            Err(e) => error!(
                path = %self.output_file.display(),
                error = %e,
                "error writing input payload"
            ),
        }
    }

    fn log_post_api_call(
        &self,
        details: &CallDetails,
        _outcome: CallOutcome<'_>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) {
        debug!(
            call_id = %details.call_id,
            latency_ms = (end_time - start_time).num_milliseconds(),
            "call finished"
        );
    }
}
