pub mod bedrock;
pub mod factory;
pub mod model_info;
pub mod pipeline;
pub mod provider;
