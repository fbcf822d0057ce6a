//! URL, email, phone and HTML safety primitives.
//!
//! Everything that reaches a renderer has passed through here first. URL checks are
//! applied when the view model is built; `escape_html` is applied only by the HTML
//! renderer, so the view model itself carries raw text.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

static DANGEROUS_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(javascript|data|vbscript|file|about):").unwrap());

static HAS_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s()+\-.]+$").unwrap());

const MIN_PHONE_LEN: usize = 10;

/// Normalises a user-supplied link.
///
/// Returns `""` for script-capable or local schemes. A value without a `scheme://`
/// prefix is assumed to be a bare host and gets `https://`.
pub fn sanitize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || DANGEROUS_SCHEME.is_match(trimmed) {
        return String::new();
    }
    if HAS_SCHEME.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// True when the sanitized form of `raw` parses as an absolute URL.
pub fn validate_url(raw: &str) -> bool {
    let sanitized = sanitize_url(raw);
    !sanitized.is_empty() && Url::parse(&sanitized).is_ok()
}

/// Returns the sanitized link when it validates, `None` otherwise.
pub fn safe_url(raw: &str) -> Option<String> {
    if validate_url(raw) {
        Some(sanitize_url(raw))
    } else {
        None
    }
}

pub fn validate_email(raw: &str) -> bool {
    EMAIL.is_match(raw.trim())
}

pub fn validate_phone(raw: &str) -> bool {
    let trimmed = raw.trim();
    PHONE.is_match(trimmed) && trimmed.len() >= MIN_PHONE_LEN
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Trims and drops blank values.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
