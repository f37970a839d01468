//! Build domain types
//!
//! What the host build system hands to the checkpoint step once a build has
//! finished.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Final result of the build that triggered the checkpoint step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutcome {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

impl FromStr for BuildOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUCCESS" => Ok(BuildOutcome::Success),
            "UNSTABLE" => Ok(BuildOutcome::Unstable),
            "FAILURE" | "FAILED" => Ok(BuildOutcome::Failure),
            "NOT_BUILT" => Ok(BuildOutcome::NotBuilt),
            "ABORTED" => Ok(BuildOutcome::Aborted),
            other => Err(format!("unknown build result '{}'", other)),
        }
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildOutcome::Success => "SUCCESS",
            BuildOutcome::Unstable => "UNSTABLE",
            BuildOutcome::Failure => "FAILURE",
            BuildOutcome::NotBuilt => "NOT_BUILT",
            BuildOutcome::Aborted => "ABORTED",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of a finished build
///
/// The environment is captured once per run and is the only input the label
/// template sees besides the read-only system properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildContext {
    pub outcome: BuildOutcome,
    pub env: HashMap<String, String>,
}

impl BuildContext {
    pub fn new(outcome: BuildOutcome, env: HashMap<String, String>) -> Self {
        Self { outcome, env }
    }
}
