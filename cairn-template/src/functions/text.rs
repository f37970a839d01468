//! Text helpers

use crate::function::{CallContext, FunctionMetadata, TemplateFunction, Value, expect_args};

fn text_arg(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

pub struct UpperFunction;

impl TemplateFunction for UpperFunction {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let args = expect_args(self.name(), args, 1)?;
        Ok(Value::Str(text_arg(&args[0]).to_uppercase()))
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "upper(text)",
            description: "Upper-cases text",
        }
    }
}

pub struct LowerFunction;

impl TemplateFunction for LowerFunction {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let args = expect_args(self.name(), args, 1)?;
        Ok(Value::Str(text_arg(&args[0]).to_lowercase()))
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "lower(text)",
            description: "Lower-cases text",
        }
    }
}

pub struct TrimFunction;

impl TemplateFunction for TrimFunction {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let args = expect_args(self.name(), args, 1)?;
        Ok(Value::Str(text_arg(&args[0]).trim().to_string()))
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "trim(text)",
            description: "Strips leading and trailing whitespace",
        }
    }
}

pub struct ReplaceFunction;

impl TemplateFunction for ReplaceFunction {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn call(&self, _ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let args = expect_args(self.name(), args, 3)?;
        let text = text_arg(&args[0]);
        let from = text_arg(&args[1]);
        let to = text_arg(&args[2]);

        if from.is_empty() {
            return Ok(Value::Str(text.to_string()));
        }
        Ok(Value::Str(text.replace(from, to)))
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "replace(text, from, to)",
            description: "Replaces every occurrence of `from` with `to`",
        }
    }
}
