use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::application::applications::{ApplicationInput, ApplicationListParams, ApplicationService};
use crate::infra::http::envelope::ApiResponse;
use crate::infra::http::error::ApiError;
use crate::infra::http::multipart::FormPayload;
use crate::infra::http::resources;
use crate::infra::http::state::AppState;

const APPLICATION_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "application_type",
    "nationality",
    "date_of_birth",
    "address_line_1",
    "address_line_2",
    "city",
    "state",
    "zip_code",
    "country",
    "education_level",
    "program_major",
    "languages",
    "available_days",
    "available_times",
    "interests",
    "skills_experience",
    "motivation",
    "emergency_name",
    "emergency_relationship",
    "emergency_phone",
    "reference_name",
    "reference_contact",
    "has_medical_condition",
    "agrees_to_terms",
    "resume",
];

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub application_type: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationPatchBody {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

pub async fn submit_application(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = FormPayload::read(multipart, APPLICATION_FIELDS).await?;
    let application = state.applications.submit(application_input(form)).await?;
    let view = resources::application_view(&state.public_base_url, application);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Application submitted successfully.",
            view,
        )),
    ))
}

pub async fn admin_list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = ApplicationListParams {
        status: query.status,
        application_type: query.application_type,
        search: query.search,
        sort_by: query.sort_by,
        sort_order: query.sort_order,
        page: query.page,
        per_page: query.per_page,
    };
    let (filter, page) = ApplicationService::resolve_filter(&params)?;
    let result = state.applications.list(&filter, page).await?;
    let views = result.map(|application| {
        resources::application_view(&state.public_base_url, application)
    });
    Ok(Json(ApiResponse::success(views)))
}

pub async fn admin_get_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let application = state.applications.get(id).await?;
    let view = resources::application_view(&state.public_base_url, application);
    Ok(Json(ApiResponse::success(view)))
}

pub async fn admin_update_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ApplicationPatchBody>,
) -> Result<impl IntoResponse, ApiError> {
    let application = state
        .applications
        .update(id, body.status.as_deref(), body.admin_notes.as_deref())
        .await?;
    let view = resources::application_view(&state.public_base_url, application);
    Ok(Json(ApiResponse::success_with_message("Application updated.", view)))
}

pub async fn approve_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let application = state.applications.approve(id).await?;
    let view = resources::application_view(&state.public_base_url, application);
    Ok(Json(ApiResponse::success_with_message("Application approved.", view)))
}

pub async fn reject_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let application = state.applications.reject(id).await?;
    let view = resources::application_view(&state.public_base_url, application);
    Ok(Json(ApiResponse::success_with_message("Application rejected.", view)))
}

pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.applications.delete(id).await?;
    Ok(Json(ApiResponse::message_only("Application deleted.")))
}

fn application_input(mut form: FormPayload) -> ApplicationInput {
    ApplicationInput {
        first_name: form.text("first_name"),
        last_name: form.text("last_name"),
        email: form.text("email"),
        phone: form.text("phone"),
        application_type: form.text("application_type"),
        nationality: form.text("nationality"),
        date_of_birth: form.text("date_of_birth"),
        address_line_1: form.text("address_line_1"),
        address_line_2: form.text("address_line_2"),
        city: form.text("city"),
        state: form.text("state"),
        zip_code: form.text("zip_code"),
        country: form.text("country"),
        education_level: form.text("education_level"),
        program_major: form.text("program_major"),
        languages: form.text("languages"),
        available_days: form.all_texts("available_days"),
        available_times: form.all_texts("available_times"),
        interests: form.all_texts("interests"),
        skills_experience: form.text("skills_experience"),
        motivation: form.text("motivation"),
        emergency_name: form.text("emergency_name"),
        emergency_relationship: form.text("emergency_relationship"),
        emergency_phone: form.text("emergency_phone"),
        reference_name: form.text("reference_name"),
        reference_contact: form.text("reference_contact"),
        has_medical_condition: form.text("has_medical_condition"),
        agrees_to_terms: form.text("agrees_to_terms"),
        resume: form.take_file("resume"),
    }
}
