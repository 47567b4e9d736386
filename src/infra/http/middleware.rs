use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::auth::AuthPrincipal;
use crate::application::error::ErrorReport;

use super::error::ApiError;
use super::state::AppState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let principal_email = request
        .extensions()
        .get::<AuthPrincipal>()
        .map(|principal| principal.email.clone());

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "lanterna::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                principal = principal_email.as_deref().unwrap_or(""),
                "request failed",
            );
        } else {
            warn!(
                target = "lanterna::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                principal = principal_email.as_deref().unwrap_or(""),
                "client request error",
            );
        }
    }

    response
}

/// Authenticate the bearer token and stash the principal plus the credential
/// selector (needed by logout) in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(request.headers().get(header::AUTHORIZATION)) {
        Some(token) => token,
        None => return ApiError::unauthorized().into_response(),
    };

    let (principal, selector) = match state.auth.authenticate(&token).await {
        Ok(resolved) => resolved,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(selector);

    next.run(request).await
}

/// Gate for the admin surface; runs after `require_auth`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthPrincipal>() {
        Some(principal) if principal.is_admin => next.run(request).await,
        Some(_) => ApiError::forbidden().into_response(),
        None => ApiError::unauthorized().into_response(),
    }
}

fn extract_bearer(header: Option<&axum::http::HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction_requires_scheme() {
        let value = HeaderValue::from_static("Bearer lt_secret");
        assert_eq!(extract_bearer(Some(&value)).as_deref(), Some("lt_secret"));

        let basic = HeaderValue::from_static("Basic dXNlcg==");
        assert_eq!(extract_bearer(Some(&basic)), None);
        assert_eq!(extract_bearer(None), None);
    }
}
