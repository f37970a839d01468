//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod checkpoint;
mod label;
mod template;

pub use checkpoint::CheckpointArgs;
pub use label::LabelCommands;
pub use template::TemplateCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Label rules
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },
    /// Label templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Run a checkpoint step against the SCM server
    Checkpoint(CheckpointArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Label { command } => label::handle_label_command(command),
        Commands::Template { command } => template::handle_template_command(command),
        Commands::Checkpoint(args) => checkpoint::handle_checkpoint_command(args, config).await,
    }
}

/// Parse a single key=value pair
pub(crate) fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("JOB_NAME=nightly").unwrap(),
            ("JOB_NAME".to_string(), "nightly".to_string())
        );
        assert_eq!(
            parse_key_val("EXPR=a=b").unwrap(),
            ("EXPR".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }
}
