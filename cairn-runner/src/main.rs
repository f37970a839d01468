//! Cairn Runner binary
//!
//! Runs one checkpoint step for the build described by the environment,
//! prints the build log and the outcome, and exits non-zero on failure.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cairn_client::ApiConnector;
use cairn_runner::{
    CheckpointService, Config, InMemoryLogBuffer, LogBufferService, StandardCheckpointService,
};
use cairn_template::Sandbox;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the build log
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cairn_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Cairn Runner");

    let config = Config::from_env().context("Failed to load runner configuration")?;
    config.validate().context("Invalid runner configuration")?;
    let step = config.step();
    info!(
        "Loaded configuration: configuration={}, build_result={}",
        step.settings.configuration_name, config.build.outcome
    );

    let service = StandardCheckpointService::new(
        Arc::new(ApiConnector::new()),
        Arc::new(Sandbox::new()),
    );
    let log_buffer = Arc::new(InMemoryLogBuffer::new());

    let outcome = service.run(&config.build, &step, log_buffer.clone()).await;
    info!(
        success = outcome.is_success(),
        skipped = outcome.is_skipped(),
        "Checkpoint step finished"
    );

    for entry in log_buffer.drain() {
        println!(
            "{} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.level,
            entry.message
        );
    }
    println!(
        "{}",
        serde_json::to_string(&outcome).context("Failed to serialize outcome")?
    );

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
