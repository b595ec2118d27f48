use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::llm::provider::{InputDict, Message};
use crate::observers::{CallDetails, CallObserver, CallOutcome};

/// Logs call boundaries at debug level, failures at warn.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl CallObserver for TracingObserver {
    fn log_pre_api_call(&self, model: &str, messages: &[Message], details: &CallDetails) {
        let body_len = match &details.additional_args.complete_input_dict {
            InputDict::Encoded(raw) => raw.len(),
            InputDict::Structured(payload) => payload.to_json_string().map(|s| s.len()).unwrap_or(0),
        };
        debug!(
            call_id = %details.call_id,
            provider = details.provider,
            model,
            api_base = %details.additional_args.api_base,
            messages = messages.len(),
            body_bytes = body_len,
            "sending provider request"
        );
    }

    fn log_post_api_call(
        &self,
        details: &CallDetails,
        outcome: CallOutcome<'_>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) {
        let latency_ms = (end_time - start_time).num_milliseconds();
        match outcome {
            Ok(resp) => debug!(
                call_id = %details.call_id,
                latency_ms,
                input_tokens = resp.usage.input_tokens,
                output_tokens = resp.usage.output_tokens,
                tool_calls = resp.tool_calls.len(),
                finish_reason = resp.finish_reason.as_deref().unwrap_or(""),
                "provider call succeeded"
            ),
            Err(e) => warn!(
                call_id = %details.call_id,
                latency_ms,
                error_type = e.kind(),
                error = %e,
                "provider call failed"
            ),
        }
    }
}
