//! Checkpoint command handler
//!
//! Runs one checkpoint step from the command line, with the same service
//! the runner uses after a build.

use anyhow::{Context, Result};
use cairn_client::ApiConnector;
use cairn_core::{StepConfig, strip_secret_vars};
use cairn_core::domain::build::{BuildContext, BuildOutcome};
use cairn_core::domain::checkpoint::OperationOutcome;
use cairn_core::domain::log::LogLevel;
use cairn_core::settings::Secret;
use cairn_runner::{
    CheckpointService, InMemoryLogBuffer, LogBufferService, StandardCheckpointService,
};
use cairn_template::Sandbox;
use clap::Args;
use colored::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::parse_key_val;
use crate::config::Config;

#[derive(Args)]
pub struct CheckpointArgs {
    /// Result of the build being checkpointed
    #[arg(long, default_value = "SUCCESS")]
    result: BuildOutcome,

    /// Build environment entries as KEY=value pairs
    #[arg(short, long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Also expose the current process environment to the template
    #[arg(long)]
    inherit_env: bool,

    /// SCM configuration to checkpoint
    #[arg(long)]
    configuration: Option<String>,

    /// Label template (overrides the defaults)
    #[arg(short, long)]
    label: Option<String>,

    /// SCM server host
    #[arg(long)]
    host: Option<String>,

    /// SCM server port
    #[arg(long)]
    port: Option<u16>,

    /// Integration point host
    #[arg(long)]
    integration_host: Option<String>,

    /// Integration point port
    #[arg(long)]
    integration_port: Option<u16>,

    /// SCM user name
    #[arg(short, long)]
    user: Option<String>,

    /// SCM password (prefer CAIRN_PASSWORD or the defaults file)
    #[arg(long)]
    password: Option<String>,

    /// Use an encrypted channel
    #[arg(long, overrides_with = "no_secure")]
    secure: bool,

    /// Use a plain channel even when the defaults say secure
    #[arg(long, overrides_with = "secure")]
    no_secure: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl CheckpointArgs {
    fn step_config(&self) -> StepConfig {
        StepConfig {
            label_template: self.label.clone(),
            integration_host: self.integration_host.clone(),
            integration_port: self.integration_port,
            host: self.host.clone(),
            port: self.port,
            user_name: self.user.clone(),
            password: self.password.clone().map(Secret::new),
            secure: match (self.secure, self.no_secure) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            configuration_name: self.configuration.clone(),
        }
    }

    fn build_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = if self.inherit_env {
            std::env::vars().collect()
        } else {
            HashMap::new()
        };
        env.extend(self.env.iter().cloned());
        strip_secret_vars(&mut env);
        env
    }
}

pub async fn handle_checkpoint_command(args: CheckpointArgs, config: &Config) -> Result<()> {
    let defaults = config.load_defaults()?;
    let step = args.step_config().resolve(&defaults);
    if step.settings.configuration_name.trim().is_empty() {
        anyhow::bail!("No configuration given: use --configuration or CAIRN_CONFIGURATION");
    }

    let build = BuildContext::new(args.result, args.build_env());
    let service =
        StandardCheckpointService::new(Arc::new(ApiConnector::new()), Arc::new(Sandbox::new()));
    let log_buffer = Arc::new(InMemoryLogBuffer::new());

    let outcome = service.run(&build, &step, log_buffer.clone()).await;

    for entry in log_buffer.drain() {
        let line = match entry.level {
            LogLevel::Error => entry.message.red(),
            LogLevel::Warning => entry.message.yellow(),
            LogLevel::Info | LogLevel::Debug => entry.message.normal(),
        };
        println!("{}", line);
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
        );
    } else {
        print_outcome(&outcome);
    }

    if !outcome.is_success() {
        anyhow::bail!("checkpoint failed");
    }
    Ok(())
}

fn print_outcome(outcome: &OperationOutcome) {
    match outcome {
        OperationOutcome::Succeeded {
            project,
            label,
            revision_id,
        } => {
            println!("{}", "✓ Checkpoint created".green().bold());
            println!("  Project:  {}", project.configuration_path.cyan());
            println!("  Label:    {}", label.bold());
            println!("  Revision: {}", revision_id.cyan());
        }
        OperationOutcome::Skipped { reason } => {
            println!("{} {}", "- Checkpoint skipped:".yellow().bold(), reason);
        }
        OperationOutcome::Failed { reason } => {
            println!("{} {}", "✗ Checkpoint failed:".red().bold(), reason.red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::CheckpointDefaults;
    use cairn_core::config::SECRET_VARS;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CheckpointArgs,
    }

    fn parse(argv: &[&str]) -> CheckpointArgs {
        TestCli::parse_from(std::iter::once("cairn").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_overrides_reach_step() {
        let args = parse(&[
            "--result",
            "unstable",
            "--configuration",
            "main",
            "--host",
            "scm.internal",
            "--port",
            "7002",
            "--secure",
            "-e",
            "JOB_NAME=nightly",
        ]);
        assert_eq!(args.result, BuildOutcome::Unstable);

        let step = args.step_config().resolve(&CheckpointDefaults::default());
        assert_eq!(step.settings.configuration_name, "main");
        assert_eq!(step.settings.host, "scm.internal");
        assert_eq!(step.settings.port, 7002);
        assert!(step.settings.secure);
        assert_eq!(
            args.build_env().get("JOB_NAME"),
            Some(&"nightly".to_string())
        );
    }

    #[test]
    fn test_defaults_kept_without_flags() {
        let defaults = CheckpointDefaults {
            host: "scm.example.com".to_string(),
            secure: true,
            ..CheckpointDefaults::default()
        };
        let step = parse(&[]).step_config().resolve(&defaults);

        assert_eq!(step.settings.host, "scm.example.com");
        assert!(step.settings.secure);
        assert_eq!(step.label_template, defaults.label_template);
    }

    #[test]
    fn test_no_secure_overrides_defaults() {
        let defaults = CheckpointDefaults {
            secure: true,
            ..CheckpointDefaults::default()
        };

        let step = parse(&["--no-secure"]).step_config().resolve(&defaults);
        assert!(!step.settings.secure);

        // last flag wins
        let step = parse(&["--no-secure", "--secure"]).step_config().resolve(&defaults);
        assert!(step.settings.secure);
    }

    #[test]
    fn test_password_never_reaches_template_env() {
        let env = parse(&[
            "-e",
            "CAIRN_PASSWORD=hunter2",
            "-e",
            "CAIRN_ENCRYPTED_PASSWORD=aHVudGVyMg==",
            "-e",
            "JOB_NAME=nightly",
        ])
        .build_env();

        assert!(!env.contains_key("CAIRN_PASSWORD"));
        assert!(!env.contains_key("CAIRN_ENCRYPTED_PASSWORD"));
        assert_eq!(env.get("JOB_NAME"), Some(&"nightly".to_string()));
    }

    #[test]
    fn test_inherited_env_is_filtered() {
        let args = parse(&["--inherit-env"]);
        assert!(args.inherit_env);

        let env = args.build_env();
        assert!(env.keys().all(|key| !SECRET_VARS.contains(&key.as_str())));
    }
}
