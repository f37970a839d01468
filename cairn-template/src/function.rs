//! Template function plumbing
//!
//! The value type expressions evaluate to, the [`TemplateFunction`] trait
//! and the registry a sandbox resolves calls against.

use chrono::{DateTime, FixedOffset};

/// A value flowing through a template expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Result of an unresolved lookup; renders as the empty string
    Null,
    Str(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Null => None,
            Value::Str(s) => Some(s),
        }
    }

    /// Null and the empty string are both "falsy" for the elvis operator
    pub fn is_blank(&self) -> bool {
        self.as_str().is_none_or(str::is_empty)
    }

    pub fn into_string(self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Str(s) => s,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map_or(Value::Null, Value::Str)
    }
}

/// Per-render state handed to functions
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    /// The instant the render started, in the local offset
    pub now: DateTime<FixedOffset>,
}

/// Trait for template helper functions.
///
/// Each function is callable from a template either as `name(arg, ...)` or,
/// for its first argument, as a method: `arg.name(...)`.
///
/// # Example
///
/// ```rust
/// use cairn_template::{CallContext, TemplateFunction, Value};
///
/// struct Shout;
///
/// impl TemplateFunction for Shout {
///     fn name(&self) -> &'static str {
///         "shout"
///     }
///
///     fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
///         let text = args.first().and_then(Value::as_str).unwrap_or_default();
///         Ok(Value::Str(format!("{}!", text.to_uppercase())))
///     }
/// }
/// ```
pub trait TemplateFunction: Send + Sync {
    /// Returns the unique name templates use to call this function.
    fn name(&self) -> &'static str;

    /// Invokes the function.
    ///
    /// # Errors
    /// Returns a message when the arguments are unusable (wrong count,
    /// unsupported pattern, ...). The sandbox reports it as an evaluation
    /// error.
    fn call(&self, ctx: &CallContext, args: &[Value]) -> Result<Value, String>;

    /// Optional: Returns function metadata (signature, description)
    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: self.name(),
            description: "",
        }
    }
}

/// Metadata about a template function
#[derive(Debug, Clone)]
pub struct FunctionMetadata {
    pub name: &'static str,
    /// Call signature as shown to users, e.g. `date(pattern)`
    pub signature: &'static str,
    pub description: &'static str,
}

/// Registry for managing template functions
///
/// The sandbox consults it both when compiling (unknown names are syntax
/// errors) and when rendering.
pub struct FunctionRegistry {
    functions: Vec<Box<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    /// Creates a new empty function registry
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// Registers a function
    ///
    /// # Panics
    /// Panics if a function with the same name is already registered
    pub fn register<F: TemplateFunction + 'static>(&mut self, function: F) {
        let name = function.name();
        if self.contains(name) {
            panic!("Function '{}' is already registered", name);
        }
        self.functions.push(Box::new(function));
    }

    /// Gets a function by name
    pub fn get(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns all registered functions
    pub fn functions(&self) -> &[Box<dyn TemplateFunction>] {
        &self.functions
    }

    /// Renders a one-line-per-function help listing
    pub fn describe(&self) -> String {
        let mut help = String::new();
        for function in &self.functions {
            let meta = function.metadata();
            help.push_str(&format!("{:<28} {}\n", meta.signature, meta.description));
        }
        help
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the argument count of a call
pub(crate) fn expect_args<'a>(
    name: &str,
    args: &'a [Value],
    count: usize,
) -> Result<&'a [Value], String> {
    if args.len() != count {
        return Err(format!(
            "{}() takes {} argument(s) but {} were given",
            name,
            count,
            args.len()
        ));
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TemplateFunction for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
            let args = expect_args(self.name(), args, 1)?;
            Ok(args[0].clone())
        }

        fn metadata(&self) -> FunctionMetadata {
            FunctionMetadata {
                name: self.name(),
                signature: "echo(value)",
                description: "Returns its argument",
            }
        }
    }

    #[test]
    fn test_function_registration() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo);

        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo);
        registry.register(Echo);
    }

    #[test]
    fn test_describe() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo);

        let help = registry.describe();
        assert!(help.contains("echo(value)"));
        assert!(help.contains("Returns its argument"));
    }

    #[test]
    fn test_expect_args() {
        assert!(expect_args("echo", &[Value::Null], 1).is_ok());
        let err = expect_args("echo", &[], 1).unwrap_err();
        assert!(err.contains("takes 1 argument(s) but 0 were given"));
    }

    #[test]
    fn test_value_blankness() {
        assert!(Value::Null.is_blank());
        assert!(Value::Str(String::new()).is_blank());
        assert!(!Value::Str("x".to_string()).is_blank());
        assert_eq!(Value::Null.into_string(), "");
    }
}
