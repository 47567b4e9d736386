use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::auth::AuthError;
use crate::application::error::{AppError, ErrorReport};
use crate::application::validate::FieldErrors;
use crate::domain::error::DomainError;

use super::envelope::ApiResponse;

/// HTTP-facing error. Renders the failure envelope and attaches a structured
/// report for the logging middleware.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<FieldErrors>,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthenticated.", "missing or invalid bearer token")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden.", "administrator access required")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Resource not found.", "resource not found")
    }

    pub fn unprocessable(errors: FieldErrors) -> Self {
        let detail = format!("validation failed: {:?}", errors);
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "The given data was invalid.".to_string(),
            errors: Some(errors),
            detail,
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(StatusCode::BAD_REQUEST, "Malformed request.", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error.", detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound => Self::not_found(),
            AppError::Validation(errors) => Self::unprocessable(errors),
            AppError::Unauthorized => Self::unauthorized(),
            AppError::Forbidden => Self::forbidden(),
            AppError::Domain(DomainError::NotFound { .. }) => Self::not_found(),
            AppError::Domain(DomainError::Validation { message }) => {
                let mut errors = FieldErrors::new();
                errors.add("request", message);
                Self::unprocessable(errors)
            }
            AppError::Domain(domain) => Self::internal(domain.to_string()),
            AppError::Infra(infra) => Self::internal(infra.to_string()),
            AppError::Unexpected(message) => Self::internal(message),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing | AuthError::Invalid => Self::unauthorized(),
            AuthError::Expired => Self::new(
                StatusCode::UNAUTHORIZED,
                "Unauthenticated.",
                "expired token",
            ),
            AuthError::Repo(repo) => Self::internal(repo.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::failure(self.message.clone(), self.errors);
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http", self.status, self.detail).attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::AppError;

    #[test]
    fn app_errors_map_to_expected_statuses() {
        assert_eq!(ApiError::from(AppError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AppError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AppError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(AppError::validation_message("title", "is required")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(AppError::unexpected("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
