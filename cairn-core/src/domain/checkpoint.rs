//! Checkpoint result and run outcome types

use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectHandle;

/// Result of a successful checkpoint command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub exit_code: i32,
    pub command_text: String,
    pub resultant_revision_id: String,
}

/// Why a run performed no checkpoint without failing the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BuildNotSuccessful,
    BuildConfiguration,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BuildNotSuccessful => write!(f, "build not successful"),
            SkipReason::BuildConfiguration => write!(f, "cannot checkpoint a build configuration"),
        }
    }
}

/// Outcome of one checkpoint run, reported back to the host build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Skipped {
        reason: SkipReason,
    },
    Succeeded {
        project: ProjectHandle,
        label: String,
        revision_id: String,
    },
    Failed {
        reason: String,
    },
}

impl OperationOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        OperationOutcome::Skipped { reason }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        OperationOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the host should keep the build green
    ///
    /// Skips are not errors, so only `Failed` fails the build.
    pub fn is_success(&self) -> bool {
        !matches!(self, OperationOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, OperationOutcome::Skipped { .. })
    }
}
