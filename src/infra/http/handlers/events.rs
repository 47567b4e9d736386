use axum::Json;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::application::events::{EventInput, EventListParams, EventService};
use crate::application::pagination::OffsetPage;
use crate::application::repos::{EventFilter, ListScope};
use crate::cache::{CachedPayload, Family, ResponseKey, hash_value};
use crate::infra::http::conditional;
use crate::infra::http::envelope::ApiResponse;
use crate::infra::http::error::ApiError;
use crate::infra::http::multipart::{FormPayload, is_multipart};
use crate::infra::http::resources;
use crate::infra::http::state::AppState;

/// Fields the event form endpoints accept; anything else is dropped.
const EVENT_FIELDS: &[&str] = &[
    "title",
    "description",
    "short_description",
    "start_date",
    "end_date",
    "location",
    "status",
    "metadata",
    "featured_image",
    "gallery_images",
    "gallery_alt_texts",
];

const GALLERY_FIELDS: &[&str] = &["image", "alt_text"];

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<EventListQuery> for EventListParams {
    fn from(query: EventListQuery) -> Self {
        Self {
            status: query.status,
            search: query.search,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            page: query.page,
            per_page: query.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

/// JSON alternative to the multipart form; file fields are multipart-only.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl From<EventBody> for EventInput {
    fn from(body: EventBody) -> Self {
        Self {
            title: body.title,
            description: body.description,
            short_description: body.short_description,
            start_date: body.start_date,
            end_date: body.end_date,
            location: body.location,
            status: body.status,
            metadata: body.metadata.map(|value| value.to_string()),
            ..Default::default()
        }
    }
}

async fn read_event_input(request: Request) -> Result<EventInput, ApiError> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid multipart payload: {err}")))?;
        let form = FormPayload::read(multipart, EVENT_FIELDS).await?;
        Ok(event_input(form))
    } else {
        let Json(body) = Json::<EventBody>::from_request(request, &())
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid JSON payload: {err}")))?;
        Ok(EventInput::from(body))
    }
}

fn list_key(filter: &EventFilter, page: OffsetPage) -> ResponseKey {
    let status = match &filter.scope {
        ListScope::Admin { status } => status.map(|s| s.as_str()),
        ListScope::Public => None,
    };
    ResponseKey::List {
        params_hash: hash_value(&(
            filter.scope.is_admin(),
            status,
            filter.search.as_deref(),
            filter.sort_by.column(),
            filter.sort_order.as_str(),
            page.page,
            page.per_page,
        )),
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventListQuery>,
) -> Result<Response, ApiError> {
    let params = EventListParams::from(query);
    let (filter, page) = EventService::resolve_filter(&params, false)?;

    // Searches are too sparse to be worth cache slots.
    let cacheable = filter.search.is_none();
    let key = list_key(&filter, page);
    let ttl = state.cache.list_ttl();

    if cacheable
        && let Some(hit) = state.cache.get(Family::Events, &key)
    {
        return Ok(conditional::respond(&headers, &hit, ttl));
    }

    let result = state.events.list(&filter, page).await?;
    let views = result.map(|event| resources::event_view(&state.public_base_url, event));
    let body = serde_json::to_vec(&ApiResponse::success(views))
        .map_err(|err| ApiError::internal(format!("failed to serialize response: {err}")))?;

    let etag = conditional::body_etag(&body);
    let payload = CachedPayload::new(Bytes::from(body), etag, OffsetDateTime::now_utc(), ttl);
    if cacheable {
        state.cache.insert(Family::Events, key, payload.clone());
    }

    Ok(conditional::respond(&headers, &payload, ttl))
}

pub async fn get_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let event = state.events.get(id, false).await?;
    let updated_at = event.event.updated_at;
    let key = ResponseKey::Detail {
        id,
        updated_at_unix: updated_at.unix_timestamp(),
    };
    let ttl = state.cache.detail_ttl();

    if let Some(hit) = state.cache.get(Family::Events, &key) {
        return Ok(conditional::respond(&headers, &hit, ttl));
    }

    let view = resources::event_view(&state.public_base_url, event);
    let body = serde_json::to_vec(&ApiResponse::success(view))
        .map_err(|err| ApiError::internal(format!("failed to serialize response: {err}")))?;

    let etag = conditional::entity_etag(id, updated_at);
    let payload = CachedPayload::new(Bytes::from(body), etag, updated_at, ttl);
    state.cache.insert(Family::Events, key, payload.clone());

    Ok(conditional::respond(&headers, &payload, ttl))
}

pub async fn admin_list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = EventListParams::from(query);
    let (filter, page) = EventService::resolve_filter(&params, true)?;
    let result = state.events.list(&filter, page).await?;
    let views = result.map(|event| resources::event_view(&state.public_base_url, event));
    Ok(Json(ApiResponse::success(views)))
}

pub async fn admin_get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.get(id, true).await?;
    let view = resources::event_view(&state.public_base_url, event);
    Ok(Json(ApiResponse::success(view)))
}

pub async fn create_event(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_event_input(request).await?;
    let event = state.events.create(input).await?;
    let view = resources::event_view(&state.public_base_url, event);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Event created.", view)),
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_event_input(request).await?;
    let event = state.events.update(id, input).await?;
    let view = resources::event_view(&state.public_base_url, event);
    Ok(Json(ApiResponse::success_with_message("Event updated.", view)))
}

pub async fn update_event_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (event, change) = state.events.update_status(id, body.status.as_deref()).await?;
    let view = resources::event_view(&state.public_base_url, event);
    Ok(Json(ApiResponse::success_with_message(
        "Event status updated.",
        json!({
            "event": view,
            "previous_status": change.previous_status,
            "status": change.status,
        }),
    )))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.events.delete(id).await?;
    Ok(Json(ApiResponse::message_only("Event deleted.")))
}

pub async fn add_gallery_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = FormPayload::read(multipart, GALLERY_FIELDS).await?;
    let file = form
        .take_file("image")
        .ok_or_else(|| {
            ApiError::from(crate::application::error::AppError::validation_message(
                "image",
                "is required",
            ))
        })?;
    let image = state
        .events
        .add_gallery_image(id, file, form.text("alt_text"))
        .await?;
    let view = resources::gallery_view(&state.public_base_url, image);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Gallery image added.", view)),
    ))
}

pub async fn remove_gallery_image(
    State(state): State<AppState>,
    Path((id, gallery_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    state.events.remove_gallery_image(id, gallery_id).await?;
    Ok(Json(ApiResponse::message_only("Gallery image removed.")))
}

fn event_input(mut form: FormPayload) -> EventInput {
    let gallery_images = form.take_files("gallery_images");
    let gallery_alt_texts = form
        .all_texts("gallery_alt_texts")
        .into_iter()
        .map(Some)
        .collect();

    EventInput {
        title: form.text("title"),
        description: form.text("description"),
        short_description: form.text("short_description"),
        start_date: form.text("start_date"),
        end_date: form.text("end_date"),
        location: form.text("location"),
        status: form.text("status"),
        metadata: form.text("metadata"),
        featured_image: form.take_file("featured_image"),
        gallery_images,
        gallery_alt_texts,
    }
}
