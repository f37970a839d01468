//! Checkpoint step configuration
//!
//! Two layers make up the configuration of a checkpoint step:
//! - [`CheckpointDefaults`]: the descriptor-wide defaults, loaded from a TOML
//!   file and/or `CAIRN_*` environment variables
//! - [`StepConfig`]: optional per-step overrides
//!
//! [`StepConfig::resolve`] merges both into a [`CheckpointStep`], which the
//! orchestrator only ever reads through [`ConfigurationProvider`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::settings::{ConnectionSettings, Secret};

/// Label template used when neither the step nor the defaults provide one
pub const DEFAULT_LABEL_TEMPLATE: &str =
    "${env['JOB_NAME']}-${env['BUILD_NUMBER']}-${date('yyyy_MM_dd')}";

/// Default SCM server port
pub const DEFAULT_PORT: u16 = 7001;

/// Variables that carry the SCM password; never visible to label templates
pub const SECRET_VARS: [&str; 2] = ["CAIRN_PASSWORD", "CAIRN_ENCRYPTED_PASSWORD"];

/// Removes [`SECRET_VARS`] from a build environment
pub fn strip_secret_vars(vars: &mut HashMap<String, String>) {
    for name in SECRET_VARS {
        vars.remove(name);
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("{0}")]
    Validation(String),
}

/// Read-only view of a checkpoint step's configuration
///
/// This is the only way the orchestrator learns about labels and
/// connection parameters.
pub trait ConfigurationProvider: Send + Sync {
    /// Label template to render for this run
    fn label_template(&self) -> &str;

    /// Connection parameters for the SCM session
    fn connection_settings(&self) -> &ConnectionSettings;

    /// Name of the SCM configuration to checkpoint
    fn configuration_name(&self) -> &str {
        &self.connection_settings().configuration_name
    }
}

/// Descriptor defaults shared by every checkpoint step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointDefaults {
    pub label_template: String,
    pub integration_host: String,
    pub integration_port: u16,
    pub host: String,
    pub port: u16,
    pub user_name: String,
    #[serde(rename = "encrypted_password")]
    pub password: Secret,
    pub secure: bool,
    pub configuration_name: String,
}

impl Default for CheckpointDefaults {
    fn default() -> Self {
        Self {
            label_template: DEFAULT_LABEL_TEMPLATE.to_string(),
            integration_host: String::new(),
            integration_port: DEFAULT_PORT,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user_name: String::new(),
            password: Secret::default(),
            secure: false,
            configuration_name: String::new(),
        }
    }
}

impl CheckpointDefaults {
    /// Parses defaults from TOML
    ///
    /// Missing keys keep their default values.
    ///
    /// # Example
    /// ```
    /// use cairn_core::CheckpointDefaults;
    ///
    /// let defaults = CheckpointDefaults::from_toml_str(r#"
    ///     host = "scm.example.com"
    ///     user_name = "builder"
    ///     encrypted_password = "aHVudGVyMg=="
    /// "#)?;
    /// assert_eq!(defaults.password.reveal(), "hunter2");
    /// # Ok::<(), cairn_core::ConfigError>(())
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads defaults from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Overlays values from `CAIRN_*` environment variables
    ///
    /// Expected environment variables (all optional):
    /// - CAIRN_LABEL_TEMPLATE
    /// - CAIRN_INTEGRATION_HOST, CAIRN_INTEGRATION_PORT
    /// - CAIRN_HOST, CAIRN_PORT
    /// - CAIRN_USER
    /// - CAIRN_PASSWORD (plaintext) or CAIRN_ENCRYPTED_PASSWORD (base64)
    /// - CAIRN_SECURE (true/false)
    /// - CAIRN_CONFIGURATION
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlays values from an arbitrary variable lookup
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CAIRN_LABEL_TEMPLATE") {
            self.label_template = v;
        }
        if let Some(v) = get("CAIRN_INTEGRATION_HOST") {
            self.integration_host = v;
        }
        if let Some(v) = get("CAIRN_INTEGRATION_PORT") {
            self.integration_port = parse_port("CAIRN_INTEGRATION_PORT", &v)?;
        }
        if let Some(v) = get("CAIRN_HOST") {
            self.host = v;
        }
        if let Some(v) = get("CAIRN_PORT") {
            self.port = parse_port("CAIRN_PORT", &v)?;
        }
        if let Some(v) = get("CAIRN_USER") {
            self.user_name = v;
        }
        if let Some(v) = get("CAIRN_ENCRYPTED_PASSWORD") {
            self.password = Secret::from_encoded(&v)?;
        }
        if let Some(v) = get("CAIRN_PASSWORD") {
            self.password = Secret::new(v);
        }
        if let Some(v) = get("CAIRN_SECURE") {
            self.secure = parse_bool("CAIRN_SECURE", &v)?;
        }
        if let Some(v) = get("CAIRN_CONFIGURATION") {
            self.configuration_name = v;
        }

        Ok(self)
    }

    /// Validates the connection defaults
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::Validation(
                "port must be greater than 0".to_string(),
            ));
        }

        if !self.integration_host.trim().is_empty() && self.integration_port == 0 {
            return Err(ConfigError::Validation(
                "integration_port must be greater than 0".to_string(),
            ));
        }

        if self.user_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Per-step overrides of the descriptor defaults
///
/// Absent or empty values fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub label_template: Option<String>,
    pub integration_host: Option<String>,
    pub integration_port: Option<u16>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user_name: Option<String>,
    #[serde(rename = "encrypted_password")]
    pub password: Option<Secret>,
    pub secure: Option<bool>,
    pub configuration_name: Option<String>,
}

impl StepConfig {
    /// Merges these overrides over `defaults`
    pub fn resolve(&self, defaults: &CheckpointDefaults) -> CheckpointStep {
        let label_template = pick(&self.label_template, &defaults.label_template);
        let label_template = if label_template.trim().is_empty() {
            DEFAULT_LABEL_TEMPLATE.to_string()
        } else {
            label_template
        };

        let settings = ConnectionSettings {
            integration_host: pick(&self.integration_host, &defaults.integration_host),
            integration_port: self.integration_port.unwrap_or(defaults.integration_port),
            host: pick(&self.host, &defaults.host),
            port: self.port.unwrap_or(defaults.port),
            user_name: pick(&self.user_name, &defaults.user_name),
            password: self
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| defaults.password.clone()),
            secure: self.secure.unwrap_or(defaults.secure),
            configuration_name: pick(&self.configuration_name, &defaults.configuration_name),
        };

        CheckpointStep {
            label_template,
            settings,
        }
    }
}

/// Fully resolved configuration of one checkpoint step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStep {
    pub label_template: String,
    pub settings: ConnectionSettings,
}

impl ConfigurationProvider for CheckpointStep {
    fn label_template(&self) -> &str {
        &self.label_template
    }

    fn connection_settings(&self) -> &ConnectionSettings {
        &self.settings
    }
}

fn pick(value: &Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.clone(),
        _ => fallback.to_string(),
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            message: e.to_string(),
        })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_strip_secret_vars() {
        let mut env: HashMap<String, String> = [
            ("CAIRN_PASSWORD", "hunter2"),
            ("CAIRN_ENCRYPTED_PASSWORD", "aHVudGVyMg=="),
            ("CAIRN_USER", "builder"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        strip_secret_vars(&mut env);

        assert_eq!(env.len(), 1);
        assert_eq!(env.get("CAIRN_USER"), Some(&"builder".to_string()));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_defaults() {
        let defaults = CheckpointDefaults::default();
        assert_eq!(defaults.label_template, DEFAULT_LABEL_TEMPLATE);
        assert_eq!(defaults.port, DEFAULT_PORT);
        assert!(!defaults.secure);
        // No user configured yet
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let defaults = CheckpointDefaults::from_toml_str(
            r#"
            host = "scm.example.com"
            port = 7010
            user_name = "builder"
            encrypted_password = "aHVudGVyMg=="
            secure = true
            configuration_name = "main"
            "#,
        )
        .unwrap();

        assert_eq!(defaults.host, "scm.example.com");
        assert_eq!(defaults.port, 7010);
        assert_eq!(defaults.password.reveal(), "hunter2");
        assert!(defaults.secure);
        assert_eq!(defaults.label_template, DEFAULT_LABEL_TEMPLATE);
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let result = CheckpointDefaults::from_toml_str(r#"port = "seven""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overlay() {
        let defaults = CheckpointDefaults::default()
            .with_vars(vars(&[
                ("CAIRN_HOST", "scm.internal"),
                ("CAIRN_PORT", "7050"),
                ("CAIRN_USER", "ci"),
                ("CAIRN_PASSWORD", "s3cret"),
                ("CAIRN_SECURE", "yes"),
                ("CAIRN_CONFIGURATION", "release"),
                ("CAIRN_INTEGRATION_HOST", ""),
            ]))
            .unwrap();

        assert_eq!(defaults.host, "scm.internal");
        assert_eq!(defaults.port, 7050);
        assert_eq!(defaults.user_name, "ci");
        assert_eq!(defaults.password.reveal(), "s3cret");
        assert!(defaults.secure);
        assert_eq!(defaults.configuration_name, "release");
        // Empty values are ignored
        assert_eq!(defaults.integration_host, "");
    }

    #[test]
    fn test_env_overlay_rejects_bad_port() {
        let result = CheckpointDefaults::default().with_vars(vars(&[("CAIRN_PORT", "70000")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_overlay_rejects_bad_bool() {
        let result = CheckpointDefaults::default().with_vars(vars(&[("CAIRN_SECURE", "maybe")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut defaults = CheckpointDefaults {
            user_name: "builder".to_string(),
            ..Default::default()
        };
        assert!(defaults.validate().is_ok());

        defaults.host = String::new();
        assert!(defaults.validate().is_err());
        defaults.host = "localhost".to_string();

        defaults.port = 0;
        assert!(defaults.validate().is_err());
        defaults.port = DEFAULT_PORT;

        defaults.integration_host = "ip.example.com".to_string();
        defaults.integration_port = 0;
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn test_step_overrides_win() {
        let defaults = CheckpointDefaults {
            user_name: "builder".to_string(),
            configuration_name: "main".to_string(),
            ..Default::default()
        };
        let step = StepConfig {
            label_template: Some("${env['JOB_NAME']}".to_string()),
            host: Some("other.example.com".to_string()),
            port: Some(9000),
            password: Some(Secret::new("override")),
            configuration_name: Some("release".to_string()),
            ..Default::default()
        }
        .resolve(&defaults);

        assert_eq!(step.label_template(), "${env['JOB_NAME']}");
        assert_eq!(step.connection_settings().host, "other.example.com");
        assert_eq!(step.connection_settings().port, 9000);
        assert_eq!(step.connection_settings().user_name, "builder");
        assert_eq!(step.connection_settings().password.reveal(), "override");
        assert_eq!(step.configuration_name(), "release");
    }

    #[test]
    fn test_empty_overrides_fall_back() {
        let defaults = CheckpointDefaults {
            label_template: String::new(),
            user_name: "builder".to_string(),
            password: Secret::new("default-pass"),
            ..Default::default()
        };
        let step = StepConfig {
            label_template: Some("  ".to_string()),
            user_name: Some(String::new()),
            password: Some(Secret::new("")),
            ..Default::default()
        }
        .resolve(&defaults);

        // Empty everywhere means the canonical template
        assert_eq!(step.label_template(), DEFAULT_LABEL_TEMPLATE);
        assert_eq!(step.connection_settings().user_name, "builder");
        assert_eq!(step.connection_settings().password.reveal(), "default-pass");
    }
}
