//! Small helpers for auth input validation.

use regex::Regex;

/// Emails are stored as entered, minus surrounding whitespace.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
