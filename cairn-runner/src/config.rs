//! Runner configuration
//!
//! The runner binary is started by the host build once the build is over.
//! Everything it needs comes from the process environment:
//! - CAIRN_CONFIG (optional): TOML file with the descriptor defaults
//! - CAIRN_* (optional): overrides of those defaults
//! - BUILD_RESULT (required): the build's final result
//! - everything else: the build environment seen by the label template

use anyhow::{Context, Result};
use cairn_core::config::CheckpointStep;
use cairn_core::domain::build::{BuildContext, BuildOutcome};
use cairn_core::{CheckpointDefaults, StepConfig, strip_secret_vars};
use std::collections::HashMap;

pub const CONFIG_FILE_VAR: &str = "CAIRN_CONFIG";
pub const BUILD_RESULT_VAR: &str = "BUILD_RESULT";

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: CheckpointDefaults,
    pub step: StepConfig,
    pub build: BuildContext,
}

impl Config {
    /// Creates configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Creates configuration from an explicit variable map
    pub fn from_vars(mut vars: HashMap<String, String>) -> Result<Self> {
        let defaults = match vars.get(CONFIG_FILE_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => CheckpointDefaults::load(path)
                .with_context(|| format!("Failed to load defaults from {}", path))?,
            None => CheckpointDefaults::default(),
        };
        let defaults = defaults
            .with_vars(|name| vars.get(name).cloned())
            .context("Invalid CAIRN_* environment variable")?;

        let outcome: BuildOutcome = vars
            .get(BUILD_RESULT_VAR)
            .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", BUILD_RESULT_VAR))?
            .parse()
            .map_err(anyhow::Error::msg)?;

        strip_secret_vars(&mut vars);

        Ok(Self {
            defaults,
            step: StepConfig::default(),
            build: BuildContext::new(outcome, vars),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.defaults.validate()?;

        if self.step().settings.configuration_name.trim().is_empty() {
            anyhow::bail!("configuration name cannot be empty (set CAIRN_CONFIGURATION)");
        }

        Ok(())
    }

    /// Resolved configuration of the step to run
    pub fn step(&self) -> CheckpointStep {
        self.step.resolve(&self.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::ConfigurationProvider;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(vars(&[
            ("BUILD_RESULT", "SUCCESS"),
            ("JOB_NAME", "nightly"),
            ("CAIRN_HOST", "scm.example.com"),
            ("CAIRN_USER", "builder"),
            ("CAIRN_PASSWORD", "hunter2"),
            ("CAIRN_CONFIGURATION", "main"),
        ]))
        .unwrap();

        assert_eq!(config.build.outcome, BuildOutcome::Success);
        assert_eq!(config.build.env.get("JOB_NAME"), Some(&"nightly".to_string()));
        assert!(config.validate().is_ok());

        let step = config.step();
        assert_eq!(step.configuration_name(), "main");
        assert_eq!(step.connection_settings().password.reveal(), "hunter2");
    }

    #[test]
    fn test_secrets_hidden_from_templates() {
        let config = Config::from_vars(vars(&[
            ("BUILD_RESULT", "SUCCESS"),
            ("CAIRN_PASSWORD", "hunter2"),
            ("CAIRN_ENCRYPTED_PASSWORD", "aHVudGVyMg=="),
        ]))
        .unwrap();

        assert!(!config.build.env.contains_key("CAIRN_PASSWORD"));
        assert!(!config.build.env.contains_key("CAIRN_ENCRYPTED_PASSWORD"));
    }

    #[test]
    fn test_build_result_required() {
        let err = Config::from_vars(vars(&[("JOB_NAME", "nightly")])).unwrap_err();
        assert!(err.to_string().contains("BUILD_RESULT"));

        assert!(Config::from_vars(vars(&[("BUILD_RESULT", "GREEN")])).is_err());
    }

    #[test]
    fn test_validation() {
        let config = Config::from_vars(vars(&[
            ("BUILD_RESULT", "FAILURE"),
            ("CAIRN_USER", "builder"),
        ]))
        .unwrap();
        // No configuration name
        assert!(config.validate().is_err());

        let config = Config::from_vars(vars(&[
            ("BUILD_RESULT", "FAILURE"),
            ("CAIRN_CONFIGURATION", "main"),
        ]))
        .unwrap();
        // No user name
        assert!(config.validate().is_err());
    }
}
