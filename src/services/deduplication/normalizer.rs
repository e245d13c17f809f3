//! Key normalization for duplicate detection.
//!
//! Raw user text is turned into comparable keys before any matching or
//! hashing. Every function here is pure and idempotent.

use sha2::{Digest, Sha256};

/// Normalizes free text: trims, lower-cases, and collapses whitespace runs.
///
/// # Example
///
/// ```rust
/// use lockout::services::deduplication::normalize_text;
///
/// assert_eq!(normalize_text("  Acme   Search "), "acme search");
/// assert_eq!(normalize_text(""), "");
/// ```
#[must_use]
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a phone number to its digits.
///
/// Formatting (spaces, dashes, parentheses, a leading `+`) is discarded.
/// Numbers with different country codes that share trailing digits are
/// not reconciled.
///
/// # Example
///
/// ```rust
/// use lockout::services::deduplication::normalize_phone;
///
/// assert_eq!(normalize_phone("+44 (20) 1234-5678"), "442012345678");
/// ```
#[must_use]
pub fn normalize_phone(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Normalizes an email address for exact comparison and hashing.
///
/// Same folding as [`normalize_text`], so stray inner spaces from a paste do
/// not change the key.
#[must_use]
pub fn normalize_email(s: &str) -> String {
    normalize_text(s)
}

/// Returns the lower-cased domain after the first `@`, or empty.
///
/// # Example
///
/// ```rust
/// use lockout::services::deduplication::email_domain;
///
/// assert_eq!(email_domain("Jane@Acme.COM"), "acme.com");
/// assert_eq!(email_domain("no-at-sign"), "");
/// ```
#[must_use]
pub fn email_domain(s: &str) -> String {
    normalize_email(s)
        .split_once('@')
        .map(|(_, domain)| domain.trim().to_string())
        .unwrap_or_default()
}

/// Computes the salted SHA-256 digest of an already-normalized value.
///
/// Empty input yields an empty digest so records without an email or phone
/// never collide on a shared hash.
///
/// # Returns
///
/// The lowercase hex digest (64 characters), or an empty string.
#[must_use]
pub fn salted_hash(salt: &str, normalized: &str) -> String {
    if normalized.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(" Acme  Co ", "acme co"; "padding and runs")]
    #[test_case("ACME\tCo\n", "acme co"; "tabs and newlines")]
    #[test_case("", ""; "empty")]
    #[test_case("   ", ""; "only whitespace")]
    fn test_normalize_text(input: &str, expected: &str) {
        assert_eq!(normalize_text(input), expected);
    }

    #[test]
    fn test_normalize_text_idempotent() {
        let once = normalize_text("  Partners,  ACME Search ");
        assert_eq!(normalize_text(&once), once);
    }

    #[test_case("+44 (20) 1234-5678", "442012345678")]
    #[test_case("442012345678", "442012345678")]
    #[test_case("ext. only", "")]
    fn test_normalize_phone(input: &str, expected: &str) {
        assert_eq!(normalize_phone(input), expected);
    }

    #[test_case(" Jane@Acme.com ", "jane@acme.com"; "padding and case")]
    #[test_case("Jane  Doe@Acme.com", "jane doe@acme.com"; "inner run collapsed")]
    #[test_case("jane@acme.com\t", "jane@acme.com"; "trailing tab")]
    fn test_normalize_email(input: &str, expected: &str) {
        assert_eq!(normalize_email(input), expected);
    }

    #[test]
    fn test_email_hash_ignores_inner_whitespace_runs() {
        assert_eq!(
            salted_hash("pepper", &normalize_email("Jane   Doe@acme.com")),
            salted_hash("pepper", &normalize_email("jane doe@ACME.com"))
        );
    }

    #[test]
    fn test_email_domain_uses_first_at() {
        assert_eq!(email_domain("a@b@c.com"), "b@c.com");
        assert_eq!(email_domain("trailing@"), "");
    }

    #[test]
    fn test_salted_hash() {
        let a = salted_hash("pepper", "a@x.com");
        assert_eq!(a.len(), 64);
        assert_eq!(a, salted_hash("pepper", "a@x.com"));
        assert_ne!(a, salted_hash("salt", "a@x.com"));
        assert_ne!(a, salted_hash("pepper", "b@x.com"));
    }

    #[test]
    fn test_salted_hash_empty_input() {
        assert_eq!(salted_hash("pepper", ""), "");
    }
}
