pub mod inspector;
pub mod payload;
pub mod tracing_observer;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::provider::{InputDict, LLMResponse, Message};

#[derive(Debug, Clone)]
pub struct AdditionalArgs {
    /// The complete request body that will be sent to the provider.
    pub complete_input_dict: InputDict,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct CallDetails {
    pub call_id: Uuid,
    pub model: String,
    pub provider: &'static str,
    pub additional_args: AdditionalArgs,
}

pub type CallOutcome<'a> = Result<&'a LLMResponse, &'a AppError>;

/// Hooks invoked around every provider call.
///
/// Observers are side-effect only. Neither hook can fail the call; anything
/// that goes wrong inside an observer is logged by the observer itself.
pub trait CallObserver: Send + Sync {
    fn log_pre_api_call(&self, model: &str, messages: &[Message], details: &CallDetails);

    fn log_post_api_call(
        &self,
        details: &CallDetails,
        outcome: CallOutcome<'_>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) {
        let _ = (details, outcome, start_time, end_time);
    }
}
