use crate::dto::validation::validate_join_code;

/// Draw a human-friendly adjective-noun code, e.g. `brave-otter`.
///
/// Uniqueness is enforced by the store, not here.
pub fn generate() -> String {
    loop {
        let code = petname::Petnames::default()
            .generate_one(2, "-")
            .to_lowercase();
        if validate_join_code(&code).is_ok() {
            return code;
        }
    }
}

/// Canonical form used for storage and lookup.
pub fn normalize(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_word_pairs() {
        for _ in 0..50 {
            let code = generate();
            let parts: Vec<&str> = code.split('-').collect();
            assert_eq!(parts.len(), 2, "{code}");
            assert!(code.chars().all(|c| c == '-' || c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Brave-OTTER "), "brave-otter");
    }
}
