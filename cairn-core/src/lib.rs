//! Cairn Core
//!
//! Core types and abstractions for the Cairn checkpoint step.
//!
//! This crate contains:
//! - Domain types: build context, project handles, checkpoint results and outcomes
//! - Label validation rules for SCM checkpoint labels
//! - Connection settings with an opaque password secret
//! - The configuration descriptor (defaults plus per-step overrides)

pub mod config;
pub mod domain;
pub mod settings;

pub use config::{
    CheckpointDefaults, ConfigError, ConfigurationProvider, StepConfig, strip_secret_vars,
};
pub use domain::label::validate_label;
pub use settings::{ConnectionSettings, Secret};
