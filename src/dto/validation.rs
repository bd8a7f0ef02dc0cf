//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::session::ReactionType;

const MAX_REACTION_LEN: usize = 32;

/// Validates that a join code is either an adjective-noun pair or six digits.
///
/// The check is case-insensitive; callers normalise before lookup.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("brave-otter") // Ok
/// validate_join_code("Brave-Otter") // Ok
/// validate_join_code("482913")      // Ok
/// validate_join_code("brave_otter") // Err - wrong separator
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim().to_ascii_lowercase();

    let is_word_pair = code
        .split_once('-')
        .is_some_and(|(left, right)| is_word(left) && is_word(right));
    let is_numeric = code.len() == 6 && code.chars().all(|c| c.is_ascii_digit());

    if is_word_pair || is_numeric {
        return Ok(());
    }

    let mut err = ValidationError::new("join_code_format");
    err.message = Some("Join code must look like `word-word` or six digits".into());
    Err(err)
}

fn is_word(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase())
}

/// Validates free-form reaction names; the built-in ones always pass.
pub fn validate_reaction(kind: &ReactionType) -> Result<(), ValidationError> {
    let ReactionType::Other(name) = kind else {
        return Ok(());
    };

    let len = name.chars().count();
    if len == 0 || len > MAX_REACTION_LEN || name.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("reaction_format");
        err.message = Some(
            format!("Reaction must be 1 to {MAX_REACTION_LEN} characters without spaces").into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_join_code_valid() {
        assert!(validate_join_code("brave-otter").is_ok());
        assert!(validate_join_code("BRAVE-Otter").is_ok());
        assert!(validate_join_code(" calm-fox ").is_ok());
        assert!(validate_join_code("004213").is_ok());
    }

    #[test]
    fn test_validate_join_code_invalid() {
        assert!(validate_join_code("").is_err());
        assert!(validate_join_code("brave").is_err());
        assert!(validate_join_code("brave-").is_err());
        assert!(validate_join_code("brave-otter-two").is_err());
        assert!(validate_join_code("brave_otter").is_err());
        assert!(validate_join_code("12345").is_err());
        assert!(validate_join_code("12a456").is_err());
    }

    #[test]
    fn test_validate_reaction() {
        assert!(validate_reaction(&ReactionType::ThumbsUp).is_ok());
        assert!(validate_reaction(&ReactionType::Other("party".into())).is_ok());
        assert!(validate_reaction(&ReactionType::Other(String::new())).is_err());
        assert!(validate_reaction(&ReactionType::Other("two words".into())).is_err());
        assert!(validate_reaction(&ReactionType::Other("x".repeat(33))).is_err());
    }
}
