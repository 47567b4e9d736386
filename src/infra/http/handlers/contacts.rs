use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::application::contacts::{ContactInput, ContactListParams, ContactService};
use crate::infra::http::envelope::ApiResponse;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ContactSubmitBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactPatchBody {
    pub status: Option<String>,
    pub admin_reply: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactReplyBody {
    pub admin_reply: Option<String>,
}

pub async fn submit_contact_request(
    State(state): State<AppState>,
    Json(body): Json<ContactSubmitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .contacts
        .submit(ContactInput {
            name: body.name,
            email: body.email,
            subject: body.subject,
            message: body.message,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Thank you for reaching out. We will get back to you soon.",
            contact,
        )),
    ))
}

pub async fn admin_list_contact_requests(
    State(state): State<AppState>,
    Query(query): Query<ContactListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ContactListParams {
        status: query.status,
        search: query.search,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page: query.page,
        per_page: query.per_page,
    };
    let (filter, page) = ContactService::resolve_filter(&params)?;
    let result = state.contacts.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn admin_get_contact_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.contacts.get(id).await?;
    Ok(Json(ApiResponse::success(contact)))
}

pub async fn admin_update_contact_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ContactPatchBody>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .contacts
        .update(id, body.status.as_deref(), body.admin_reply.as_deref())
        .await?;
    Ok(Json(ApiResponse::success_with_message("Contact request updated.", contact)))
}

pub async fn reply_contact_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ContactReplyBody>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.contacts.reply(id, body.admin_reply.as_deref()).await?;
    Ok(Json(ApiResponse::success_with_message("Reply recorded.", contact)))
}

pub async fn delete_contact_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.contacts.delete(id).await?;
    Ok(Json(ApiResponse::message_only("Contact request deleted.")))
}
