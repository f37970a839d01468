//! Cairn Runner
//!
//! Post-build checkpoint step: decides whether a checkpoint should be taken,
//! renders the label, talks to the SCM server and reports the outcome.
//!
//! Architecture:
//! - Configuration: defaults file, `CAIRN_*` overrides and the build context
//! - Services: the checkpoint run and the build log buffer
//! - Session guard: guarantees the SCM session is released
//! - Descriptor: configuration-time checks of label templates

pub mod config;
pub mod descriptor;
pub mod service;
pub mod session_guard;

pub use config::Config;
pub use service::{
    CheckpointService, InMemoryLogBuffer, LogBufferService, StandardCheckpointService,
};
