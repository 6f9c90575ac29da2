use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation utilities for geo-post-service

// Compile regex patterns once at startup
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_]+$").expect("hardcoded username regex is invalid - fix source code")
});

/// Usernames double as search-index document ids, which are capped at 512 bytes
pub const MAX_USERNAME_BYTES: usize = 512;

/// Validate username format (lowercase letters, digits and underscore)
pub fn validate_username(username: &str) -> bool {
    username.len() <= MAX_USERNAME_BYTES && USERNAME_REGEX.is_match(username)
}

/// Validate signup credentials: a well-formed username and a non-empty password
pub fn validate_signup(username: &str, password: &str) -> bool {
    validate_username(username) && !password.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("bob"));
        assert!(validate_username("jack_2"));
        assert!(validate_username("_"));
        assert!(validate_username("007"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!validate_username(""));
        assert!(!validate_username("Bob"));
        assert!(!validate_username("bob smith"));
        assert!(!validate_username("bob-smith"));
        assert!(!validate_username("bob!"));
        assert!(!validate_username("bób"));
    }

    #[test]
    fn test_username_length_bound() {
        assert!(validate_username(&"a".repeat(MAX_USERNAME_BYTES)));
        assert!(!validate_username(&"a".repeat(MAX_USERNAME_BYTES + 1)));
        assert!(!validate_signup(&"a".repeat(MAX_USERNAME_BYTES + 1), "pw1"));
    }

    #[test]
    fn test_signup_requires_password() {
        assert!(validate_signup("bob", "pw1"));
        assert!(!validate_signup("bob", ""));
        assert!(!validate_signup("Bob", "pw1"));
    }
}
