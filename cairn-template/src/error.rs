//! Error types for label templates

use thiserror::Error;

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Errors raised while compiling or rendering a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The template is not well-formed (unbalanced quotes, braces, brackets...)
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The template is well-formed but could not be rendered
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

impl ExpressionError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    /// Check if this error was raised at compile time
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}
