//! Template command handlers
//!
//! Configuration-time helpers: check a template the way the step's form
//! does, render it against a sample environment, list the functions a
//! template can call.

use anyhow::{Context, Result};
use cairn_runner::descriptor::check_label_template;
use cairn_template::Sandbox;
use clap::Subcommand;
use colored::*;
use std::collections::HashMap;

use super::parse_key_val;

/// Template subcommands
#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Check a label template for syntax errors and label rule violations
    Check {
        /// The template, e.g. "${env['JOB_NAME']}-${env['BUILD_NUMBER']}"
        template: String,
    },
    /// Render a template against the given environment
    Render {
        template: String,

        /// Environment entries as KEY=value pairs (e.g., -e JOB_NAME=nightly)
        #[arg(short, long = "env", value_parser = parse_key_val)]
        env: Vec<(String, String)>,
    },
    /// List the functions available to templates
    Functions,
}

pub fn handle_template_command(command: TemplateCommands) -> Result<()> {
    let sandbox = Sandbox::new();

    match command {
        TemplateCommands::Check { template } => check_template(&sandbox, &template),
        TemplateCommands::Render { template, env } => render_template(&sandbox, &template, env),
        TemplateCommands::Functions => {
            print!("{}", sandbox.functions().describe());
            Ok(())
        }
    }
}

fn check_template(sandbox: &Sandbox, template: &str) -> Result<()> {
    match check_label_template(sandbox, template) {
        Ok(()) => {
            println!("{}", "✓ Template is valid".green().bold());
            Ok(())
        }
        Err(message) => {
            println!("{} {}", "✗".red().bold(), message.red());
            anyhow::bail!("invalid label template")
        }
    }
}

fn render_template(sandbox: &Sandbox, template: &str, env: Vec<(String, String)>) -> Result<()> {
    let env: HashMap<String, String> = env.into_iter().collect();
    let label = sandbox
        .evaluate(&env, template)
        .context("Failed to render template")?;

    println!("{}", label);
    Ok(())
}
