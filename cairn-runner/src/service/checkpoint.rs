//! Checkpoint service
//!
//! Runs one checkpoint step after a build:
//!
//! ```text
//! Gate -> (Skip | Prepare -> Execute -> (Success | Fail)) -> Cleanup
//! ```
//!
//! Every error, including a panic inside the gateway, is caught here and
//! turned into [`OperationOutcome::Failed`]. A session that was opened is
//! closed exactly once on every path.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use cairn_client::Connector;
use cairn_core::ConfigurationProvider;
use cairn_core::domain::build::BuildContext;
use cairn_core::domain::checkpoint::{OperationOutcome, SkipReason};
use cairn_core::domain::log::LogLevel;
use cairn_template::Sandbox;
use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::service::log_buffer::LogBufferService;
use crate::session_guard::SessionGuard;

/// Service trait for running checkpoint steps
#[async_trait]
pub trait CheckpointService: Send + Sync {
    /// Runs one checkpoint step
    ///
    /// Never fails: problems are reported through the returned outcome and
    /// the build log.
    async fn run(
        &self,
        build: &BuildContext,
        config: &dyn ConfigurationProvider,
        log_buffer: Arc<dyn LogBufferService>,
    ) -> OperationOutcome;
}

/// Standard implementation of CheckpointService
pub struct StandardCheckpointService {
    connector: Arc<dyn Connector>,
    sandbox: Arc<Sandbox>,
}

impl StandardCheckpointService {
    pub fn new(connector: Arc<dyn Connector>, sandbox: Arc<Sandbox>) -> Self {
        Self { connector, sandbox }
    }

    /// Everything after the gate
    async fn perform(
        &self,
        run_id: Uuid,
        build: &BuildContext,
        config: &dyn ConfigurationProvider,
        log_buffer: &dyn LogBufferService,
    ) -> OperationOutcome {
        let label = match self.sandbox.evaluate(&build.env, config.label_template()) {
            Ok(label) => label,
            Err(e) => {
                return fail(
                    log_buffer,
                    format!(
                        "Failed to evaluate label template '{}': {}",
                        config.label_template(),
                        e
                    ),
                );
            }
        };
        debug!(run_id = %run_id, label = %label, "Rendered checkpoint label");

        let session = match self.connector.open(config.connection_settings()).await {
            Ok(session) => session,
            Err(e) => {
                return fail(
                    log_buffer,
                    format!(
                        "An API Session could not be established!  Cannot perform checkpoint operation! ({})",
                        e
                    ),
                );
            }
        };

        let mut guard = SessionGuard::new(run_id, session);
        let outcome = match self
            .checkpoint(&guard, config.configuration_name(), &label, log_buffer)
            .await
        {
            Ok(outcome) => outcome,
            Err(message) => fail(log_buffer, message),
        };

        if let Err(e) = guard.close().await {
            warn!(run_id = %run_id, error = %e, "Failed to close SCM session");
        }

        outcome
    }

    /// Project lookup and checkpoint, on an open session
    async fn checkpoint(
        &self,
        guard: &SessionGuard,
        configuration_name: &str,
        label: &str,
        log_buffer: &dyn LogBufferService,
    ) -> Result<OperationOutcome, String> {
        let session = guard.session().map_err(|e| e.to_string())?;

        let project = session
            .resolve_project(configuration_name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    format!(
                        "Configuration '{}' does not resolve to an SCM project: {}",
                        configuration_name, e
                    )
                } else {
                    format!(
                        "Failed to look up configuration '{}': {}",
                        configuration_name, e
                    )
                }
            })?;

        if project.is_build_configuration() {
            let message = format!(
                "Cannot checkpoint a build project configuration: {}!",
                project.configuration_path
            );
            info!("{}", message);
            log_buffer.log(LogLevel::Info, message);
            return Ok(OperationOutcome::skipped(SkipReason::BuildConfiguration));
        }

        log_buffer.log(
            LogLevel::Info,
            format!(
                "Preparing to execute si checkpoint for {}",
                project.configuration_path
            ),
        );

        let result = session.checkpoint(&project, label).await.map_err(|e| {
            debug!(exit_code = ?e.exit_code(), "Checkpoint command rejected");
            format!(
                "Checkpoint of {} with label '{}' failed: {}",
                project.configuration_path, label, e
            )
        })?;

        let message = format!(
            "Successfully checkpointed project {} with label '{}', new revision is {}",
            project.configuration_path, label, result.resultant_revision_id
        );
        info!(command = %result.command_text, "{}", message);
        log_buffer.log(LogLevel::Info, message);

        Ok(OperationOutcome::Succeeded {
            project,
            label: label.to_string(),
            revision_id: result.resultant_revision_id,
        })
    }
}

#[async_trait]
impl CheckpointService for StandardCheckpointService {
    async fn run(
        &self,
        build: &BuildContext,
        config: &dyn ConfigurationProvider,
        log_buffer: Arc<dyn LogBufferService>,
    ) -> OperationOutcome {
        let run_id = Uuid::new_v4();

        if !build.outcome.is_success() {
            info!(run_id = %run_id, outcome = %build.outcome, "Build not successful, skipping checkpoint");
            log_buffer.log(
                LogLevel::Info,
                format!(
                    "Build result is {}!  Skipping checkpoint step!",
                    build.outcome
                ),
            );
            return OperationOutcome::skipped(SkipReason::BuildNotSuccessful);
        }

        info!(
            run_id = %run_id,
            configuration = config.configuration_name(),
            "Starting checkpoint step"
        );

        let outcome = AssertUnwindSafe(self.perform(run_id, build, config, log_buffer.as_ref()))
            .catch_unwind()
            .await;

        match outcome {
            Ok(outcome) => outcome,
            Err(panic) => fail(
                log_buffer.as_ref(),
                format!(
                    "Unexpected error during checkpoint step: {}",
                    panic_message(panic.as_ref())
                ),
            ),
        }
    }
}

fn fail(log_buffer: &dyn LogBufferService, message: String) -> OperationOutcome {
    error!("{}", message);
    log_buffer.log(LogLevel::Error, message.clone());
    OperationOutcome::failed(message)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
