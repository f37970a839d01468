//! Core domain types
//!
//! These types are shared between the session gateway (which produces project
//! handles and checkpoint results) and the runner (which turns them into an
//! operation outcome for the host build).

pub mod build;
pub mod checkpoint;
pub mod label;
pub mod log;
pub mod project;
