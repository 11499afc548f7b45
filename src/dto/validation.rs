//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest guess accepted, in characters.
pub const MAX_GUESS_CHARS: usize = 500;

/// Validates that a guess fits the prompt budget and carries no control characters.
///
/// Emptiness is a game rule checked later, in order with the other session rules.
///
/// # Examples
///
/// ```ignore
/// validate_guess_input("tie a knot")   // Ok
/// validate_guess_input("bell\u{7}")    // Err - control character
/// ```
pub fn validate_guess_input(input: &str) -> Result<(), ValidationError> {
    let length = input.chars().count();
    if length > MAX_GUESS_CHARS {
        let mut err = ValidationError::new("guess_length");
        err.message = Some(
            format!("Guess must be at most {MAX_GUESS_CHARS} characters (got {length})").into(),
        );
        return Err(err);
    }

    if input
        .chars()
        .any(|c| c.is_control() && !c.is_whitespace())
    {
        let mut err = ValidationError::new("guess_format");
        err.message = Some("Guess must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_guess_input_valid() {
        assert!(validate_guess_input("tie a knot").is_ok());
        assert!(validate_guess_input("line\nbreak\tand tab").is_ok());
        assert!(validate_guess_input("").is_ok()); // emptiness checked by the session
        assert!(validate_guess_input(&"é".repeat(MAX_GUESS_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_guess_input_too_long() {
        assert!(validate_guess_input(&"a".repeat(MAX_GUESS_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_guess_input_control_chars() {
        assert!(validate_guess_input("bell\u{7}").is_err());
        assert!(validate_guess_input("\u{0}").is_err());
    }
}
