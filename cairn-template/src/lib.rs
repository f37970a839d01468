//! Cairn label templates
//!
//! A small, sandboxed interpreter that expands checkpoint label templates
//! such as `${env['JOB_NAME']}-${env['BUILD_NUMBER']}-${date('yyyy_MM_dd')}`.
//!
//! It includes:
//! - A parser that turns a template into literal text and interpolations
//! - Two read-only bindings: `env` (the build environment) and `sys`
//!   (system properties)
//! - A registry of helper functions (date formatting, text helpers)
//!
//! Templates cannot reach the filesystem, spawn processes or read anything
//! beyond the two bindings.

pub mod bindings;
pub mod error;
pub mod function;
pub mod functions;
pub mod parser;
pub mod sandbox;

pub use bindings::{SystemProperties, VarProvider};
pub use error::ExpressionError;
pub use function::{CallContext, FunctionMetadata, FunctionRegistry, TemplateFunction, Value};
pub use parser::{Template, parse_template};
pub use sandbox::{Sandbox, evaluate};
