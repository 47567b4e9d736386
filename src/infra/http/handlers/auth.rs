use axum::Json;
use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use crate::application::auth::{AuthPrincipal, TokenSelector};
use crate::application::validate::{FieldErrors, non_blank};
use crate::infra::http::envelope::ApiResponse;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn principal_json(principal: &AuthPrincipal) -> serde_json::Value {
    json!({
        "id": principal.user_id,
        "name": principal.name,
        "email": principal.email,
        "is_admin": principal.is_admin,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    let email = non_blank(body.email.as_deref());
    let password = non_blank(body.password.as_deref());
    if email.is_none() {
        errors.add("email", "is required");
    }
    if password.is_none() {
        errors.add("password", "is required");
    }
    if !errors.is_empty() {
        return Err(ApiError::unprocessable(errors));
    }

    let issued = state
        .auth
        .login(email.unwrap_or_default(), password.unwrap_or_default())
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        "Logged in.",
        json!({
            "token": issued.token,
            "user": principal_json(&issued.principal),
        }),
    )))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(selector): Extension<TokenSelector>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(selector).await?;
    Ok(Json(ApiResponse::message_only("Logged out.")))
}

pub async fn me(
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(principal_json(&principal))))
}
