//! Regex-based field format checks

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

// Permissive by intent: scheme and www. are optional, host must be a dotted
// name or an IPv4 address, port/path/query/fragment are free-form.
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^((https?|ftp)://)?(www\.)?(([a-z0-9]([a-z0-9._~-]*[a-z0-9])?\.)+[a-z]{2,}|(\d{1,3}\.){3}\d{1,3})(:\d+)?(/[^\s?#]*)?(\?[^\s#]*)?(#\S*)?$",
    )
    .expect("url pattern compiles")
});

/// Check address shape for contact email fields
pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Check URL shape for website, registration and attribution link fields
pub fn is_valid_url(value: &str) -> bool {
    URL.is_match(value)
}
