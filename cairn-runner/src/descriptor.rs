//! Configuration-time checks
//!
//! Feedback shown to administrators while they fill in a checkpoint step,
//! before any build runs.

use cairn_core::domain::label::validate_label;
use cairn_template::{ExpressionError, Sandbox, VarProvider};

/// Human readable name of the checkpoint step
pub const DISPLAY_NAME: &str = "Integrity - CM Checkpoint";

pub const EMPTY_TEMPLATE_MESSAGE: &str = "Please specify a label for this Checkpoint!";
pub const UNBALANCED_TEMPLATE_MESSAGE: &str =
    "Check if quotes, braces, or brackets are balanced. ";

/// Build variables are unknown at configuration time; each lookup renders
/// as the variable's own name
struct PlaceholderEnv;

impl VarProvider for PlaceholderEnv {
    fn get(&self, name: &str) -> Option<String> {
        Some(name.to_string())
    }
}

/// Checks a label template the way the step's configuration form does
///
/// # Errors
/// The message to show next to the field.
pub fn check_label_template(sandbox: &Sandbox, template: &str) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err(EMPTY_TEMPLATE_MESSAGE.to_string());
    }

    let label = match sandbox.evaluate(&PlaceholderEnv, template) {
        Ok(label) => label,
        Err(e @ ExpressionError::Syntax { .. }) => {
            return Err(format!("{}{}", UNBALANCED_TEMPLATE_MESSAGE, e));
        }
        Err(e) => return Err(e.to_string()),
    };

    match validate_label(&label) {
        Some(message) => Err(message.to_string()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::config::DEFAULT_LABEL_TEMPLATE;

    #[test]
    fn test_default_template_passes() {
        assert_eq!(check_label_template(&Sandbox::new(), DEFAULT_LABEL_TEMPLATE), Ok(()));
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(
            check_label_template(&Sandbox::new(), "  "),
            Err(EMPTY_TEMPLATE_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_unbalanced_template() {
        let err = check_label_template(&Sandbox::new(), "release\"").unwrap_err();
        assert!(err.starts_with("Check if quotes, braces, or brackets are balanced. "));
    }

    #[test]
    fn test_rendered_label_is_validated() {
        let err = check_label_template(&Sandbox::new(), "1.0-${env['BUILD_NUMBER']}").unwrap_err();
        assert_eq!(err, "The label must start with an alpha character!");

        let err = check_label_template(&Sandbox::new(), "build.${env['BUILD_NUMBER']}").unwrap_err();
        assert!(err.starts_with("The label cannot contain any of the following characters"));
    }

    #[test]
    fn test_hostile_templates_are_reported() {
        let nested = format!("${{{}'a'{}}}", "(".repeat(5000), ")".repeat(5000));
        let err = check_label_template(&Sandbox::new(), &nested).unwrap_err();
        assert!(err.contains("nested too deeply"));

        let long_field = format!("v${{date('{}')}}", "d".repeat(70_000));
        let err = check_label_template(&Sandbox::new(), &long_field).unwrap_err();
        assert!(err.contains("date pattern field too long"));
    }

    #[test]
    fn test_evaluation_error_is_reported() {
        let err = check_label_template(&Sandbox::new(), "v${date()}").unwrap_err();
        assert!(err.contains("date()"));
    }
}
