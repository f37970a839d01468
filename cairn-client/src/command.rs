//! Remote SCM commands

use serde::{Deserialize, Serialize};

/// Application prefix of every command issued by the gateway
pub const SI_APP: &str = "si";

/// One `--name[=value]` option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A command as sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub app: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl Command {
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
            options: Vec::new(),
        }
    }

    /// Adds a flag without a value
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.options.push(CommandOption {
            name: name.into(),
            value: None,
        });
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(CommandOption {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// `si projectinfo --project=<name>`
    pub fn project_info(configuration_name: &str) -> Self {
        Command::new(SI_APP, "projectinfo").option("project", configuration_name)
    }

    /// `si checkpoint --recurse --project=<path> --label=<label> --description=<text>`
    pub fn checkpoint(configuration_path: &str, label: &str, description: &str) -> Self {
        Command::new(SI_APP, "checkpoint")
            .flag("recurse")
            .option("project", configuration_path)
            .option("label", label)
            .option("description", description)
    }

    /// Human readable command line, used in diagnostics
    pub fn text(&self) -> String {
        let mut text = format!("{} {}", self.app, self.name);
        for option in &self.options {
            match &option.value {
                Some(value) => text.push_str(&format!(" --{}={}", option.name, value)),
                None => text.push_str(&format!(" --{}", option.name)),
            }
        }
        text
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
