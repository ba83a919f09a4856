//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Returns the trimmed value if it is present and not blank.
pub fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Same shape the web client checks before submitting: something, an `@`,
/// something, a dot, something. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex")
    });

    email.len() <= 254 && regex.is_match(email)
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims each label and drops blank ones.
pub fn clean_locations(locations: &[String]) -> Vec<String> {
    locations
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some("   ")), None);
        assert_eq!(required(Some(" Paris ")), Some("Paris"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn locations_are_cleaned() {
        let raw = vec![" Kyoto ".to_string(), "".to_string(), "  ".to_string(), "Osaka".to_string()];
        assert_eq!(clean_locations(&raw), vec!["Kyoto", "Osaka"]);
    }
}
