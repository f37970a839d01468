//! Built-in template functions

mod date;
mod text;

pub use date::{DateFunction, UtcDateFunction, format_java_pattern};
pub use text::{LowerFunction, ReplaceFunction, TrimFunction, UpperFunction};

use crate::function::FunctionRegistry;

/// Registry holding every built-in function
pub fn builtin_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register(DateFunction);
    registry.register(UtcDateFunction);
    registry.register(UpperFunction);
    registry.register(LowerFunction);
    registry.register(TrimFunction);
    registry.register(ReplaceFunction);
    registry
}
