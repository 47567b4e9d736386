//! Validator headers for the cached public read endpoints.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::cache::CachedPayload;

/// Strong ETag over the serialized response body.
pub fn body_etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Strong ETag derived from a record's identity and last write. Stays stable
/// across requests without hashing the whole body.
pub fn entity_etag(id: i64, updated_at: OffsetDateTime) -> String {
    let input = format!("{id}{}", updated_at.unix_timestamp());
    format!("\"{}\"", hex::encode(Sha256::digest(input.as_bytes())))
}

/// RFC 7231 IMF-fixdate, always in GMT.
pub fn http_date(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    at.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))
    .unwrap_or_default()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };
    raw == "*"
        || raw
            .split(',')
            .map(str::trim)
            .map(|candidate| candidate.strip_prefix("W/").unwrap_or(candidate))
            .any(|candidate| candidate == etag)
}

/// Render a cached payload honoring `If-None-Match`: 304 when the validator
/// matches, otherwise the full body with cache headers.
pub fn respond(request_headers: &HeaderMap, payload: &CachedPayload, max_age: Duration) -> Response {
    let not_modified = if_none_match_matches(request_headers, &payload.etag);

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mut response = payload.body.clone().into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&payload.etag) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&http_date(payload.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age.as_secs())) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use time::macros::datetime;

    fn payload(etag: &str) -> CachedPayload {
        CachedPayload::new(
            Bytes::from_static(b"{\"success\":true}"),
            etag.to_string(),
            datetime!(2026-03-01 10:00:00 UTC),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn body_etag_is_stable_and_quoted() {
        let etag = body_etag(b"payload");
        assert_eq!(etag, body_etag(b"payload"));
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_ne!(etag, body_etag(b"other"));
    }

    #[test]
    fn entity_etag_tracks_update_time() {
        let first = entity_etag(7, datetime!(2026-03-01 10:00:00 UTC));
        let second = entity_etag(7, datetime!(2026-03-01 10:00:01 UTC));
        assert_ne!(first, second);
    }

    #[test]
    fn http_date_renders_imf_fixdate() {
        let rendered = http_date(datetime!(2026-03-01 10:00:00 UTC));
        assert_eq!(rendered, "Sun, 01 Mar 2026 10:00:00 GMT");
    }

    #[test]
    fn matching_validator_yields_not_modified() {
        let payload = payload("\"abc\"");

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"abc\""));
        let response = respond(&headers, &payload, Duration::from_secs(600));
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG], "\"abc\"");
    }

    #[test]
    fn stale_validator_yields_full_body() {
        let payload = payload("\"abc\"");

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"old\""));
        let response = respond(&headers, &payload, Duration::from_secs(600));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=600"
        );
    }
}
