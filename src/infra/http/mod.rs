//! HTTP surface: public reads, public submissions, and the token-guarded
//! admin API, all under `/api/v1`.

pub mod conditional;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod multipart;
pub mod resources;
pub mod state;

pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};

use handlers::{applications, auth, blobs, contacts, events, journals};

pub fn build_router(state: AppState, max_upload_bytes: u64) -> Router {
    let admin = Router::new()
        .route(
            "/events",
            get(events::admin_list_events).post(events::create_event),
        )
        .route(
            "/events/{id}",
            get(events::admin_get_event)
                .put(events::update_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/{id}/status", patch(events::update_event_status))
        .route("/events/{id}/galleries", post(events::add_gallery_image))
        .route(
            "/events/{id}/galleries/{gallery_id}",
            delete(events::remove_gallery_image),
        )
        .route(
            "/journals",
            get(journals::admin_list_journals).post(journals::create_journal),
        )
        .route(
            "/journals/{id}",
            get(journals::admin_get_journal)
                .put(journals::update_journal)
                .patch(journals::update_journal)
                .delete(journals::delete_journal),
        )
        .route(
            "/journals/{id}/status",
            patch(journals::toggle_journal_status),
        )
        .route("/applications", get(applications::admin_list_applications))
        .route(
            "/applications/{id}",
            get(applications::admin_get_application)
                .patch(applications::admin_update_application)
                .delete(applications::delete_application),
        )
        .route(
            "/applications/{id}/approve",
            post(applications::approve_application),
        )
        .route(
            "/applications/{id}/reject",
            post(applications::reject_application),
        )
        .route(
            "/contact-requests",
            get(contacts::admin_list_contact_requests),
        )
        .route(
            "/contact-requests/{id}",
            get(contacts::admin_get_contact_request)
                .patch(contacts::admin_update_contact_request)
                .delete(contacts::delete_contact_request),
        )
        .route(
            "/contact-requests/{id}/reply",
            post(contacts::reply_contact_request),
        )
        .layer(axum_middleware::from_fn(middleware::require_admin));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .nest("/admin", admin)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let public = Router::new()
        .route("/events", get(events::list_events))
        .route("/events/{id}", get(events::get_event))
        .route("/journals", get(journals::list_journals))
        .route("/journals/{id}", get(journals::get_journal))
        .route("/applications", post(applications::submit_application))
        .route("/contact-requests", post(contacts::submit_contact_request))
        .route("/auth/login", post(auth::login));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .route("/storage/{*path}", get(blobs::serve_blob))
        .route("/health/db", get(blobs::db_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes as usize))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
        .with_state(state)
}
