use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::llm::bedrock::BedrockConverseProvider;
use crate::llm::model_info;
use crate::llm::provider::LLMProvider;
use crate::models::llm::LLMRuntimeConfig;

pub fn provider_from_runtime_config(cfg: &LLMRuntimeConfig) -> Result<Arc<dyn LLMProvider>, AppError> {
    if model_info::provider_model_id(&cfg.model_id).is_empty() {
        return Err(AppError::Config("Model config is missing model_id".to_string()));
    }
    if cfg.timeout_secs == 0 {
        return Err(AppError::Config("timeout_secs must be greater than zero".to_string()));
    }

    let provider: Arc<dyn LLMProvider> = Arc::new(BedrockConverseProvider::new(
        cfg.model_id.clone(),
        cfg.api_key.clone(),
        &cfg.region,
        cfg.base_url.clone(),
        Duration::from_secs(cfg.timeout_secs),
    )?);

    Ok(provider)
}
