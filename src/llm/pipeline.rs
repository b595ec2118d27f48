use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::provider::{CompletionRequest, LLMProvider, LLMResponse};
use crate::observers::{AdditionalArgs, CallDetails, CallObserver};

pub struct CompletionPipeline {
    provider: Arc<dyn LLMProvider>,
    observers: Vec<Arc<dyn CallObserver>>,
}

impl CompletionPipeline {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Arc<dyn CallObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    /// Builds the provider request, shows it to every observer, sends it and
    /// reports the outcome back to every observer.
    pub async fn completion(&self, request: CompletionRequest) -> Result<LLMResponse, AppError> {
        let provider_request = self.provider.build_request(&request)?;

        let details = CallDetails {
            call_id: Uuid::new_v4(),
            model: self.provider.model_id().to_string(),
            provider: self.provider.provider_name(),
            additional_args: AdditionalArgs {
                complete_input_dict: provider_request.body.clone(),
                api_base: provider_request.api_base.clone(),
            },
        };

        for observer in &self.observers {
            observer.log_pre_api_call(&details.model, &request.messages, &details);
        }

        let start_time = Utc::now();
        let result = self.provider.send(&provider_request).await;
        let end_time = Utc::now();

        for observer in &self.observers {
            observer.log_post_api_call(&details, result.as_ref(), start_time, end_time);
        }

        result
    }
}
