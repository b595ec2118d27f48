mod commands;
mod error;
mod llm;
mod logging;
mod models;
mod observers;
mod tools;

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use commands::computer_use::{run_computer_use_probe, ProbeOutcome};
use llm::factory::provider_from_runtime_config;
use llm::pipeline::CompletionPipeline;
use models::llm::ProbeConfig;
use observers::inspector::PayloadInspector;
use observers::tracing_observer::TracingObserver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = ProbeConfig::from_env().context("loading configuration")?;
    debug!(config = %serde_json::to_string(&config)?, "configuration loaded");

    let provider = provider_from_runtime_config(&config.llm).context("building provider")?;
    let inspector = Arc::new(PayloadInspector::new(&config.payload_dir));
    println!("Input payload will be saved to: {}", inspector.output_file().display());

    let mut pipeline = CompletionPipeline::new(provider);
    pipeline.register(Arc::new(TracingObserver));
    pipeline.register(inspector.clone());
    info!(observers = pipeline.observer_count(), "call observers registered");

    let outcome = run_computer_use_probe(&pipeline, &config, &mut std::io::stdout())
        .await
        .context("computer-use probe aborted")?;
    if let ProbeOutcome::CallFailed(e) = &outcome {
        debug!(error_type = e.kind(), "probe finished without a response");
    }

    println!();
    println!("Input payload has been saved to: {}", inspector.output_file().display());
    Ok(())
}
