//! Checkpoint label validation
//!
//! The SCM server only accepts labels that start with an ASCII letter and do
//! not contain any of its reserved characters. These rules are checked at
//! configuration time to give early feedback; at run time a rendered label is
//! submitted as-is and the server has the final word.

/// Characters the SCM server reserves and rejects inside a label
pub const FORBIDDEN_LABEL_CHARS: [char; 8] = ['$', ',', '.', ':', ';', '/', '\\', '@'];

pub const EMPTY_LABEL_MESSAGE: &str = "The label string is empty!";
pub const NON_ALPHA_START_MESSAGE: &str = "The label must start with an alpha character!";
pub const FORBIDDEN_CHAR_MESSAGE: &str =
    "The label cannot contain any of the following characters: $ , . : ; / \\ @";

/// Checks whether `label` is acceptable as a checkpoint label
///
/// Rules are applied in order and the first violation wins:
/// 1. the label must not be empty
/// 2. the first character must be an ASCII letter
/// 3. none of [`FORBIDDEN_LABEL_CHARS`] may appear anywhere
///
/// # Returns
/// `None` when the label is valid, otherwise the reason it is not
///
/// # Example
/// ```
/// use cairn_core::validate_label;
///
/// assert_eq!(validate_label("nightly-42"), None);
/// assert!(validate_label("1.0-release").is_some());
/// ```
pub fn validate_label(label: &str) -> Option<&'static str> {
    let Some(first) = label.chars().next() else {
        return Some(EMPTY_LABEL_MESSAGE);
    };

    if !first.is_ascii_alphabetic() {
        return Some(NON_ALPHA_START_MESSAGE);
    }

    if label.contains(&FORBIDDEN_LABEL_CHARS[..]) {
        return Some(FORBIDDEN_CHAR_MESSAGE);
    }

    None
}
