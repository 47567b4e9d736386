use axum::Json;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::application::journals::{JournalInput, JournalListParams, JournalService};
use crate::application::pagination::OffsetPage;
use crate::application::repos::{JournalFilter, ListScope};
use crate::cache::{CachedPayload, Family, ResponseKey, hash_value};
use crate::infra::http::conditional;
use crate::infra::http::envelope::ApiResponse;
use crate::infra::http::error::ApiError;
use crate::infra::http::multipart::{FormPayload, is_multipart};
use crate::infra::http::resources;
use crate::infra::http::state::AppState;

const JOURNAL_FIELDS: &[&str] = &[
    "title",
    "content",
    "excerpt",
    "category",
    "publication_date",
    "description",
    "status",
    "metadata",
    "journal_pdf",
    "cover_image",
    "featured_image",
];

#[derive(Debug, Deserialize)]
pub struct JournalListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<JournalListQuery> for JournalListParams {
    fn from(query: JournalListQuery) -> Self {
        Self {
            status: query.status,
            category: query.category,
            search: query.search,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            page: query.page,
            per_page: query.per_page,
        }
    }
}

fn list_key(filter: &JournalFilter, page: OffsetPage) -> ResponseKey {
    let status = match &filter.scope {
        ListScope::Admin { status } => status.map(|s| s.as_str()),
        ListScope::Public => None,
    };
    ResponseKey::List {
        params_hash: hash_value(&(
            filter.scope.is_admin(),
            status,
            filter.category.as_deref(),
            filter.search.as_deref(),
            filter.sort_by.column(),
            filter.sort_order.as_str(),
            page.page,
            page.per_page,
        )),
    }
}

pub async fn list_journals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<JournalListQuery>,
) -> Result<Response, ApiError> {
    let params = JournalListParams::from(query);
    let (filter, page) = JournalService::resolve_filter(&params, false)?;

    let cacheable = filter.search.is_none();
    let key = list_key(&filter, page);
    let ttl = state.cache.list_ttl();

    if cacheable
        && let Some(hit) = state.cache.get(Family::Journals, &key)
    {
        return Ok(conditional::respond(&headers, &hit, ttl));
    }

    let result = state.journals.list(&filter, page).await?;
    let views = result.map(|journal| resources::journal_view(&state.public_base_url, journal));
    let body = serde_json::to_vec(&ApiResponse::success(views))
        .map_err(|err| ApiError::internal(format!("failed to serialize response: {err}")))?;

    let etag = conditional::body_etag(&body);
    let payload = CachedPayload::new(Bytes::from(body), etag, OffsetDateTime::now_utc(), ttl);
    if cacheable {
        state.cache.insert(Family::Journals, key, payload.clone());
    }

    Ok(conditional::respond(&headers, &payload, ttl))
}

pub async fn get_journal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let journal = state.journals.get(id, false).await?;
    let updated_at = journal.updated_at;
    let key = ResponseKey::Detail {
        id,
        updated_at_unix: updated_at.unix_timestamp(),
    };
    let ttl = state.cache.detail_ttl();

    if let Some(hit) = state.cache.get(Family::Journals, &key) {
        return Ok(conditional::respond(&headers, &hit, ttl));
    }

    let view = resources::journal_view(&state.public_base_url, journal);
    let body = serde_json::to_vec(&ApiResponse::success(view))
        .map_err(|err| ApiError::internal(format!("failed to serialize response: {err}")))?;

    let etag = conditional::entity_etag(id, updated_at);
    let payload = CachedPayload::new(Bytes::from(body), etag, updated_at, ttl);
    state.cache.insert(Family::Journals, key, payload.clone());

    Ok(conditional::respond(&headers, &payload, ttl))
}

pub async fn admin_list_journals(
    State(state): State<AppState>,
    Query(query): Query<JournalListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = JournalListParams::from(query);
    let (filter, page) = JournalService::resolve_filter(&params, true)?;
    let result = state.journals.list(&filter, page).await?;
    let views = result.map(|journal| resources::journal_view(&state.public_base_url, journal));
    Ok(Json(ApiResponse::success(views)))
}

pub async fn admin_get_journal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let journal = state.journals.get(id, true).await?;
    let view = resources::journal_view(&state.public_base_url, journal);
    Ok(Json(ApiResponse::success(view)))
}

/// JSON alternative to the multipart form; file fields are multipart-only.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JournalBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl From<JournalBody> for JournalInput {
    fn from(body: JournalBody) -> Self {
        Self {
            title: body.title,
            content: body.content,
            excerpt: body.excerpt,
            category: body.category,
            publication_date: body.publication_date,
            description: body.description,
            status: body.status,
            metadata: body.metadata.map(|value| value.to_string()),
            ..Default::default()
        }
    }
}

async fn read_journal_input(request: Request) -> Result<JournalInput, ApiError> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid multipart payload: {err}")))?;
        let form = FormPayload::read(multipart, JOURNAL_FIELDS).await?;
        Ok(journal_input(form))
    } else {
        let Json(body) = Json::<JournalBody>::from_request(request, &())
            .await
            .map_err(|err| ApiError::bad_request(format!("invalid JSON payload: {err}")))?;
        Ok(JournalInput::from(body))
    }
}

pub async fn create_journal(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_journal_input(request).await?;
    let journal = state.journals.create(input).await?;
    let view = resources::journal_view(&state.public_base_url, journal);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message("Journal created.", view)),
    ))
}

pub async fn update_journal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let input = read_journal_input(request).await?;
    let journal = state.journals.update(id, input).await?;
    let view = resources::journal_view(&state.public_base_url, journal);
    Ok(Json(ApiResponse::success_with_message("Journal updated.", view)))
}

pub async fn toggle_journal_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (journal, change) = state.journals.toggle_status(id).await?;
    let view = resources::journal_view(&state.public_base_url, journal);
    Ok(Json(ApiResponse::success_with_message(
        "Journal status updated.",
        json!({
            "journal": view,
            "previous_status": change.previous_status,
            "status": change.status,
        }),
    )))
}

pub async fn delete_journal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.journals.delete(id).await?;
    Ok(Json(ApiResponse::message_only("Journal deleted.")))
}

fn journal_input(mut form: FormPayload) -> JournalInput {
    JournalInput {
        title: form.text("title"),
        content: form.text("content"),
        excerpt: form.text("excerpt"),
        category: form.text("category"),
        publication_date: form.text("publication_date"),
        description: form.text("description"),
        status: form.text("status"),
        metadata: form.text("metadata"),
        journal_pdf: form.take_file("journal_pdf"),
        cover_image: form.take_file("cover_image"),
        featured_image: form.take_file("featured_image"),
    }
}
