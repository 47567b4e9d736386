//! Per-field validation error collection for the uniform response envelope.

use std::collections::BTreeMap;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// Return `Ok(())` when no errors were collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Trimmed non-empty text, or `None` when the value is absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Minimal address shape check; full deliverability is out of scope.
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Parse a timestamp from the formats clients actually send: RFC 3339, a
/// naive `YYYY-MM-DD HH:MM:SS` (taken as UTC), or a bare date (midnight UTC).
pub fn parse_flexible_datetime(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }
    let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(value) = PrimitiveDateTime::parse(raw, naive) {
        return Some(value.assume_utc());
    }
    parse_date(raw).map(|date| date.midnight().assume_utc())
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Parse the boolean representations accepted on form submissions.
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_multiple_errors_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "is required");
        errors.add("email", "must be valid");
        errors.add("name", "is required");

        let inner = errors.into_inner();
        assert_eq!(inner["email"].len(), 2);
        assert_eq!(inner["name"].len(), 1);
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ada@example.org"));
        assert!(!looks_like_email("ada"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("ada@nodot"));
    }

    #[test]
    fn form_bool_accepts_numeric_forms() {
        assert_eq!(parse_form_bool("1"), Some(true));
        assert_eq!(parse_form_bool("0"), Some(false));
        assert_eq!(parse_form_bool("true"), Some(true));
        assert_eq!(parse_form_bool("yes"), None);
    }

    #[test]
    fn datetime_parsing_accepts_common_forms() {
        assert!(parse_flexible_datetime("2026-03-01T10:00:00Z").is_some());
        assert!(parse_flexible_datetime("2026-03-01 10:00:00").is_some());
        let midnight = parse_flexible_datetime("2026-03-01").expect("bare date");
        assert_eq!(midnight.time(), time::Time::MIDNIGHT);
        assert!(parse_flexible_datetime("next tuesday").is_none());
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
