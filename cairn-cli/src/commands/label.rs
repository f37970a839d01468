//! Label command handlers

use anyhow::Result;
use cairn_core::validate_label;
use clap::Subcommand;
use colored::*;

/// Label subcommands
#[derive(Subcommand)]
pub enum LabelCommands {
    /// Check a literal label against the SCM naming rules
    Validate {
        /// The label to check
        label: String,
    },
}

pub fn handle_label_command(command: LabelCommands) -> Result<()> {
    match command {
        LabelCommands::Validate { label } => match validate_label(&label) {
            None => {
                println!("{} {}", "✓ Valid label:".green().bold(), label.cyan());
                Ok(())
            }
            Some(message) => {
                println!("{} {}", "✗".red().bold(), message.red());
                anyhow::bail!("invalid label '{}'", label)
            }
        },
    }
}
