//! Input validation.

use super::DecomposeError;

/// Trim the input and check it against the length ceiling.
///
/// Length is counted in Unicode scalar values, not bytes.
pub fn validate_input(raw: &str, max_chars: usize) -> Result<&str, DecomposeError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DecomposeError::EmptyInput);
    }

    let actual_chars = text.chars().count();
    if actual_chars > max_chars {
        return Err(DecomposeError::InputTooLong {
            max_chars,
            actual_chars,
        });
    }

    Ok(text)
}
