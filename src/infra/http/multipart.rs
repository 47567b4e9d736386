//! Streaming multipart decoder for the form-based write endpoints.
//!
//! Fields are filtered against a caller-supplied allow-list while the stream
//! is read, so unexpected parts are drained and dropped without buffering.
//! Array fields use the `name[]` convention and collapse onto their base name.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::http::{HeaderMap, header};
use tracing::debug;

use crate::application::events::UploadedFile;

use super::error::ApiError;

/// True when the request carries a `multipart/form-data` body.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

#[derive(Debug, Default)]
pub struct FormPayload {
    texts: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormPayload {
    /// Drain the multipart stream, keeping only fields the endpoint declares.
    pub async fn read(mut multipart: Multipart, allowed: &[&str]) -> Result<Self, ApiError> {
        let mut payload = FormPayload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid multipart payload: {err}")))?
        {
            let Some(raw_name) = field.name().map(str::to_string) else {
                continue;
            };
            let name = raw_name.trim_end_matches("[]").to_string();

            if !allowed.contains(&name.as_str()) {
                debug!(
                    target = "lanterna::http::multipart",
                    field = %raw_name,
                    "ignoring field outside endpoint allow-list"
                );
                continue;
            }

            if field.file_name().is_some() {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read uploaded file: {err}"))
                })?;
                payload.files.entry(name).or_default().push(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            } else {
                let value = field.text().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read form field: {err}"))
                })?;
                payload.texts.entry(name).or_default().push(value);
            }
        }

        Ok(payload)
    }

    /// Last value wins for repeated scalar fields.
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts
            .get(name)
            .and_then(|values| values.last())
            .cloned()
    }

    pub fn all_texts(&self, name: &str) -> Vec<String> {
        self.texts.get(name).cloned().unwrap_or_default()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.texts.contains_key(name) || self.files.contains_key(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files
            .get_mut(name)
            .and_then(|files| if files.is_empty() { None } else { Some(files.remove(0)) })
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use axum::http::Request;

    const BOUNDARY: &str = "test-boundary";

    fn form_request(parts: &[(&str, &str)]) -> Request<axum::body::Body> {
        let mut body = String::new();
        for (name, value) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(axum::body::Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn fields_outside_the_allow_list_are_dropped() {
        let request = form_request(&[("title", "Gala"), ("is_admin", "true")]);
        let multipart = Multipart::from_request(request, &()).await.expect("multipart");

        let payload = FormPayload::read(multipart, &["title"]).await.expect("payload");

        assert_eq!(payload.text("title").as_deref(), Some("Gala"));
        assert!(!payload.has_field("is_admin"));
    }

    #[tokio::test]
    async fn array_fields_collapse_onto_base_name() {
        let request = form_request(&[
            ("available_days[]", "monday"),
            ("available_days[]", "friday"),
        ]);
        let multipart = Multipart::from_request(request, &()).await.expect("multipart");

        let payload = FormPayload::read(multipart, &["available_days"])
            .await
            .expect("payload");

        assert_eq!(payload.all_texts("available_days"), vec!["monday", "friday"]);
    }
}
