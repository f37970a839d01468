//! Template sandbox
//!
//! The sandbox owns everything a render can touch: the function registry,
//! the `sys` snapshot and the clock. The `env` map is supplied per call.
//!
//! Rendering never performs I/O. The only outside state a template observes
//! is what the caller put in the bindings and the instant the render started.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Local};
use tracing::debug;

use crate::bindings::{SystemProperties, VarProvider};
use crate::error::{ExpressionError, Result};
use crate::function::{CallContext, FunctionRegistry, Value};
use crate::functions::builtin_registry;
use crate::parser::{Binding, Expr, Segment, Template, parse_template};

/// Intermediate result of evaluating an expression
enum Evaluated {
    Value(Value),
    Map(Binding),
}

/// A restricted template evaluator
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use cairn_template::Sandbox;
///
/// let sandbox = Sandbox::new();
/// let env = HashMap::from([
///     ("JOB_NAME".to_string(), "myjob".to_string()),
///     ("BUILD_NUMBER".to_string(), "5".to_string()),
/// ]);
///
/// let label = sandbox.evaluate(&env, "${env['JOB_NAME']}-${env['BUILD_NUMBER']}")?;
/// assert_eq!(label, "myjob-5");
/// # Ok::<(), cairn_template::ExpressionError>(())
/// ```
pub struct Sandbox {
    functions: FunctionRegistry,
    sys: SystemProperties,
    clock: Option<DateTime<FixedOffset>>,
}

impl Sandbox {
    /// Creates a sandbox with the built-in functions, the current process'
    /// system properties and the wall clock
    pub fn new() -> Self {
        Self {
            functions: builtin_registry(),
            sys: SystemProperties::capture(),
            clock: None,
        }
    }

    /// Pins the instant every render sees
    pub fn with_clock(mut self, now: DateTime<FixedOffset>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn with_system_properties(mut self, sys: SystemProperties) -> Self {
        self.sys = sys;
        self
    }

    /// Replaces the function registry
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Parses `source` without rendering it
    pub fn compile(&self, source: &str) -> Result<Template> {
        parse_template(source, &self.functions)
    }

    /// Renders a compiled template against `env`
    pub fn render(&self, template: &Template, env: &dyn VarProvider) -> Result<String> {
        let ctx = CallContext { now: self.now() };
        let mut out = String::new();

        for segment in template.segments() {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(expr) => match self.eval(expr, env, &ctx)? {
                    Evaluated::Value(value) => out.push_str(value.as_str().unwrap_or_default()),
                    Evaluated::Map(binding) => {
                        return Err(ExpressionError::evaluation(format!(
                            "cannot interpolate the whole '{}' map; index it, e.g. {}['KEY']",
                            binding.name(),
                            binding.name()
                        )));
                    }
                },
            }
        }

        Ok(out)
    }

    /// Compiles and renders `source`, trimming surrounding whitespace
    ///
    /// # Errors
    /// [`ExpressionError::Syntax`] when the template is malformed,
    /// [`ExpressionError::Evaluation`] when a well-formed template cannot be
    /// rendered (bad function arguments, indexing a string, ...).
    pub fn evaluate(&self, env: &dyn VarProvider, source: &str) -> Result<String> {
        let template = self.compile(source)?;
        let rendered = self.render(&template, env)?;
        let rendered = rendered.trim().to_string();
        debug!(
            template = source,
            literal = template.is_literal(),
            rendered = %rendered,
            "Evaluated label template"
        );
        Ok(rendered)
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.unwrap_or_else(|| Local::now().fixed_offset())
    }

    fn eval(&self, expr: &Expr, env: &dyn VarProvider, ctx: &CallContext) -> Result<Evaluated> {
        let evaluated = match expr {
            Expr::Empty => Evaluated::Value(Value::Null),
            Expr::Str(s) => Evaluated::Value(Value::Str(s.clone())),
            Expr::Binding(binding) => Evaluated::Map(*binding),
            Expr::Index { target, key } => {
                let key = self.eval_value(key, env, ctx)?;
                match self.eval(target, env, ctx)? {
                    Evaluated::Map(binding) => {
                        let provider: &dyn VarProvider = match binding {
                            Binding::Env => env,
                            Binding::Sys => &self.sys,
                        };
                        let value = key.as_str().and_then(|key| provider.get(key));
                        Evaluated::Value(Value::from(value))
                    }
                    Evaluated::Value(Value::Null) => {
                        return Err(ExpressionError::evaluation(
                            "cannot index a null value",
                        ));
                    }
                    Evaluated::Value(Value::Str(s)) => {
                        return Err(ExpressionError::evaluation(format!(
                            "cannot index the string '{}'",
                            s
                        )));
                    }
                }
            }
            Expr::Call { name, args } => {
                let function = self.functions.get(name).ok_or_else(|| {
                    ExpressionError::evaluation(format!("unknown function '{}'", name))
                })?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_value(arg, env, ctx))
                    .collect::<Result<Vec<_>>>()?;
                let value = function
                    .call(ctx, &args)
                    .map_err(|e| ExpressionError::evaluation(format!("{}(): {}", name, e)))?;
                Evaluated::Value(value)
            }
            Expr::Concat(left, right) => {
                let mut joined = self.eval_value(left, env, ctx)?.into_string();
                joined.push_str(self.eval_value(right, env, ctx)?.as_str().unwrap_or_default());
                Evaluated::Value(Value::Str(joined))
            }
            Expr::Elvis(value, fallback) => {
                let value = self.eval_value(value, env, ctx)?;
                if value.is_blank() {
                    Evaluated::Value(self.eval_value(fallback, env, ctx)?)
                } else {
                    Evaluated::Value(value)
                }
            }
        };

        Ok(evaluated)
    }

    fn eval_value(&self, expr: &Expr, env: &dyn VarProvider, ctx: &CallContext) -> Result<Value> {
        match self.eval(expr, env, ctx)? {
            Evaluated::Value(value) => Ok(value),
            Evaluated::Map(binding) => Err(ExpressionError::evaluation(format!(
                "'{}' is a map and cannot be used as a value",
                binding.name()
            ))),
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates `expr` against `env` in a fresh [`Sandbox`]
pub fn evaluate(env: &HashMap<String, String>, expr: &str) -> Result<String> {
    Sandbox::new().evaluate(env, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DEFAULT_TEMPLATE: &str = "${env['JOB_NAME']}-${env['BUILD_NUMBER']}-${date('yyyy_MM_dd')}";

    fn sandbox() -> Sandbox {
        let now = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 31, 23, 30, 0)
            .unwrap();
        Sandbox::new()
            .with_clock(now)
            .with_system_properties(SystemProperties::from_pairs([
                ("os.name", "linux"),
                ("user.name", "builder"),
            ]))
    }

    fn env() -> HashMap<String, String> {
        HashMap::from([
            ("JOB_NAME".to_string(), "myjob".to_string()),
            ("BUILD_NUMBER".to_string(), "5".to_string()),
            ("BRANCH".to_string(), "  main ".to_string()),
        ])
    }

    #[test]
    fn test_literal_is_unchanged() {
        assert_eq!(sandbox().evaluate(&env(), "literal").unwrap(), "literal");
    }

    #[test]
    fn test_env_lookup() {
        let label = sandbox()
            .evaluate(&env(), "${env['JOB_NAME']}-${env['BUILD_NUMBER']}")
            .unwrap();
        assert_eq!(label, "myjob-5");
    }

    #[test]
    fn test_default_template_with_fixed_clock() {
        let label = sandbox().evaluate(&env(), DEFAULT_TEMPLATE).unwrap();
        assert_eq!(label, "myjob-5-2024_01_31");
    }

    #[test]
    fn test_utc_uses_utc_date() {
        let label = sandbox().evaluate(&env(), "${utc('yyyy_MM_dd HH')}").unwrap();
        assert_eq!(label, "2024_01_31 22");
    }

    #[test]
    fn test_result_is_trimmed() {
        assert_eq!(sandbox().evaluate(&env(), "  padded\t").unwrap(), "padded");
        assert_eq!(sandbox().evaluate(&env(), "${env['BRANCH']}").unwrap(), "main");
    }

    #[test]
    fn test_missing_key_renders_empty() {
        assert_eq!(sandbox().evaluate(&env(), "a${env['NOPE']}b").unwrap(), "ab");
        assert_eq!(sandbox().evaluate(&env(), "${env.NOPE}").unwrap(), "");
    }

    #[test]
    fn test_sys_lookup() {
        let label = sandbox()
            .evaluate(&env(), "${sys['os.name']}-$sys.user")
            .unwrap();
        // `$sys.user` is a lookup of the key "user", which is not exposed
        assert_eq!(label, "linux-");
        assert_eq!(sandbox().evaluate(&env(), "${sys['user.name']}").unwrap(), "builder");
    }

    #[test]
    fn test_elvis_and_concat() {
        let s = sandbox();
        assert_eq!(s.evaluate(&env(), "${env['NOPE'] ?: 'dev'}").unwrap(), "dev");
        assert_eq!(s.evaluate(&env(), "${env['JOB_NAME'] ?: 'dev'}").unwrap(), "myjob");
        assert_eq!(
            s.evaluate(&env(), "${env['JOB_NAME'] + '.' + env['BUILD_NUMBER']}")
                .unwrap(),
            "myjob.5"
        );
    }

    #[test]
    fn test_functions_and_methods() {
        let s = sandbox();
        assert_eq!(s.evaluate(&env(), "${upper(env['JOB_NAME'])}").unwrap(), "MYJOB");
        assert_eq!(
            s.evaluate(&env(), "${env['JOB_NAME'].replace('my', 'our')}").unwrap(),
            "ourjob"
        );
    }

    #[test]
    fn test_unbalanced_quote_is_syntax_error() {
        let err = sandbox().evaluate(&env(), "unbalanced\"").unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_wrong_arity_is_evaluation_error() {
        let err = sandbox().evaluate(&env(), "${date()}").unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation(_)));
        assert!(err.to_string().contains("date()"));
    }

    #[test]
    fn test_bad_date_pattern_is_evaluation_error() {
        let err = sandbox().evaluate(&env(), "${date('QQ')}").unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation(_)));
    }

    #[test]
    fn test_interpolating_a_map_fails() {
        let err = sandbox().evaluate(&env(), "${env}").unwrap_err();
        assert!(err.to_string().contains("cannot interpolate"));
    }

    #[test]
    fn test_indexing_a_string_fails() {
        let err = sandbox()
            .evaluate(&env(), "${env['JOB_NAME']['x']}")
            .unwrap_err();
        assert!(err.to_string().contains("cannot index the string"));
    }

    #[test]
    fn test_render_is_repeatable() {
        let s = sandbox();
        let template = s.compile(DEFAULT_TEMPLATE).unwrap();
        let first = s.render(&template, &env()).unwrap();
        let second = s.render(&template, &env()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hostile_templates_fail_cleanly() {
        let nested = format!("${{{}'a'{}}}", "(".repeat(30_000), ")".repeat(30_000));
        assert!(sandbox().evaluate(&env(), &nested).unwrap_err().is_syntax());

        let long_field = format!("${{date('{}')}}", "d".repeat(70_000));
        let err = sandbox().evaluate(&env(), &long_field).unwrap_err();
        assert!(!err.is_syntax());
        assert!(err.to_string().contains("date pattern field too long"));
    }

    #[test]
    fn test_free_evaluate() {
        let label = evaluate(&env(), "${env['JOB_NAME']}").unwrap();
        assert_eq!(label, "myjob");
    }
}
