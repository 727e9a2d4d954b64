//! Validation helpers for DTOs.

use std::str::FromStr;

use validator::ValidationError;

use crate::state::game::{Choice, MAX_PLAYER_ID_LENGTH, PlayerId};

/// Rejects strings made only of whitespace.
pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must be non-empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a choice is exactly one of `A`, `B`, `C` or `D`.
///
/// # Examples
///
/// ```ignore
/// validate_choice("B") // Ok
/// validate_choice("b") // Err - case sensitive
/// validate_choice("E") // Err
/// ```
pub fn validate_choice(value: &str) -> Result<(), ValidationError> {
    Choice::from_str(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("choice");
        err.message = Some("answer must be A, B, C, or D".into());
        err
    })
}

/// Validates that a player id is 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn validate_player_id(value: &str) -> Result<(), ValidationError> {
    PlayerId::parse(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("player_id_format");
        err.message = Some(
            format!(
                "player id must be 1 to {MAX_PLAYER_ID_LENGTH} letters, digits, `-` or `_`"
            )
            .into(),
        );
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_blank() {
        assert!(validate_non_blank("x").is_ok());
        assert!(validate_non_blank("").is_err());
        assert!(validate_non_blank(" \t\n").is_err());
    }

    #[test]
    fn test_validate_choice_is_case_sensitive() {
        for valid in ["A", "B", "C", "D"] {
            assert!(validate_choice(valid).is_ok());
        }
        assert!(validate_choice("a").is_err());
        assert!(validate_choice("E").is_err());
        assert!(validate_choice("AB").is_err());
        assert!(validate_choice("").is_err());
    }

    #[test]
    fn test_validate_player_id() {
        assert!(validate_player_id("3f2b-9c_x").is_ok());
        assert!(validate_player_id(&"p".repeat(64)).is_ok());
        assert!(validate_player_id(&"p".repeat(65)).is_err()); // too long
        assert!(validate_player_id("").is_err());
        assert!(validate_player_id("bad id").is_err()); // space
        assert!(validate_player_id("<script>").is_err());
    }
}
