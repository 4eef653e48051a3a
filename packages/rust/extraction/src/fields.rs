//! Per-attribute cleaning rules for raw extraction output.
//!
//! Each rule is a predicate/normalizer over one attribute value. A value
//! that fails its rule is dropped — result rows never carry empty or
//! sentinel cells.
//!
//! URL policy: scheme-less values that look like a bare domain
//! (`acme.com`, `www.acme.io/contact`) get `https://` prepended; values
//! that still are not absolute http(s) URLs are dropped.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use leadloom_shared::{ContactField, ExtractedFields};

/// Placeholder tokens models emit for attributes they could not find.
const NOT_FOUND_SENTINELS: [&str; 9] = [
    "not found",
    "not available",
    "unavailable",
    "n/a",
    "na",
    "none",
    "unknown",
    "null",
    "-",
];

/// Clean a raw key → value map into validated [`ExtractedFields`].
///
/// Unknown keys and non-string values are ignored.
pub fn clean_fields(raw: &Map<String, Value>) -> ExtractedFields {
    let mut fields = ExtractedFields::new();

    for (key, value) in raw {
        let Some(field) = ContactField::from_key(key) else {
            continue;
        };
        let Some(raw_value) = value.as_str() else {
            continue;
        };
        if let Some(cleaned) = clean_value(field, raw_value) {
            fields.insert(field, cleaned);
        }
    }

    fields
}

/// Apply the per-attribute rule to one raw value.
pub fn clean_value(field: ContactField, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_sentinel(trimmed) {
        return None;
    }

    match field {
        ContactField::Email => trimmed.contains('@').then(|| trimmed.to_string()),
        ContactField::Phone => trimmed
            .chars()
            .any(|c| c.is_ascii_digit())
            .then(|| trimmed.to_string()),
        field if field.is_link() => normalize_url(trimmed),
        _ => Some(trimmed.to_string()),
    }
}

fn is_sentinel(value: &str) -> bool {
    NOT_FOUND_SENTINELS
        .iter()
        .any(|s| value.eq_ignore_ascii_case(s))
}

/// A bare domain, optionally with a path: `acme.com`, `www.acme.io/contact`.
static BARE_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}(?:/\S*)?$").expect("valid regex")
});

/// Validate a link value as an absolute http(s) URL, prepending a scheme
/// for bare domains. Returns `None` for anything else.
fn normalize_url(raw: &str) -> Option<String> {
    if let Ok(url) = Url::parse(raw) {
        return matches!(url.scheme(), "http" | "https").then(|| raw.to_string());
    }

    if BARE_DOMAIN_RE.is_match(raw) {
        let candidate = format!("https://{raw}");
        if Url::parse(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    None
}
