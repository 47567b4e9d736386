//! Uniform JSON envelope wrapping every API response body.

use serde::Serialize;

use crate::application::validate::FieldErrors;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_empty_slots() {
        let body = serde_json::to_value(ApiResponse::success(serde_json::json!({"id": 1})))
            .expect("serialize");
        assert_eq!(body["success"], true);
        assert!(body.get("message").is_none());
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn failure_envelope_carries_field_errors() {
        let mut errors = FieldErrors::new();
        errors.add("email", "is required");
        let body = serde_json::to_value(ApiResponse::failure("The given data was invalid.", Some(errors)))
            .expect("serialize");
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["email"][0], "is required");
    }
}
