use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::infra::blob::BlobStorageError;
use crate::infra::http::state::AppState;

/// Serve a stored blob by its stored path. Paths that escape the storage
/// root or point at missing files render 404.
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    match state.blobs.read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let mut response = data.into_response();
            if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        Err(BlobStorageError::InvalidPath) => StatusCode::NOT_FOUND.into_response(),
        Err(BlobStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(
                "infra::http::blobs",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub async fn db_health(State(state): State<AppState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
