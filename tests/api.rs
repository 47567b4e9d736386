use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use lanterna::application::applications::{ApplicationInput, ApplicationService};
use lanterna::application::auth::{AuthService, hash_password};
use lanterna::application::contacts::ContactService;
use lanterna::application::events::{EventInput, EventService, UploadedFile};
use lanterna::application::journals::{JournalInput, JournalService};
use lanterna::application::repos::{
    ApplicationsRepo, ContactsRepo, EventsRepo, JournalsRepo, NewUser, TokensRepo, UsersRepo,
};
use lanterna::cache::{CacheConfig, ResponseCache};
use lanterna::infra::blob::BlobStorage;
use lanterna::infra::db::PgRepositories;
use lanterna::infra::http::{AppState, build_router};

const BASE_URL: &str = "http://localhost:8000/storage";
const BOUNDARY: &str = "------------------------lanterna-test";

struct TestApp {
    router: Router,
    state: AppState,
    _storage: TempDir,
}

fn build_app(pool: PgPool) -> TestApp {
    let storage = tempfile::tempdir().expect("temp storage dir");
    let db = Arc::new(PgRepositories::new(pool));

    let events_repo: Arc<dyn EventsRepo> = db.clone();
    let journals_repo: Arc<dyn JournalsRepo> = db.clone();
    let applications_repo: Arc<dyn ApplicationsRepo> = db.clone();
    let contacts_repo: Arc<dyn ContactsRepo> = db.clone();
    let users_repo: Arc<dyn UsersRepo> = db.clone();
    let tokens_repo: Arc<dyn TokensRepo> = db.clone();

    let blobs = Arc::new(BlobStorage::new(storage.path().to_path_buf()).expect("blob storage"));
    let cache = Arc::new(ResponseCache::new(CacheConfig::default()));

    let state = AppState {
        events: Arc::new(EventService::new(
            events_repo,
            blobs.clone(),
            cache.clone(),
        )),
        journals: Arc::new(JournalService::new(
            journals_repo,
            blobs.clone(),
            cache.clone(),
        )),
        applications: Arc::new(ApplicationService::new(applications_repo, blobs.clone())),
        contacts: Arc::new(ContactService::new(contacts_repo)),
        auth: Arc::new(AuthService::new(users_repo, tokens_repo)),
        cache,
        blobs,
        db,
        public_base_url: Url::parse(BASE_URL).expect("base url"),
    };

    let router = build_router(state.clone(), 16 * 1024 * 1024);
    TestApp {
        router,
        state,
        _storage: storage,
    }
}

async fn issue_token(app: &TestApp, email: &str, is_admin: bool) -> String {
    let password = "correct horse battery staple";
    app.state
        .db
        .create_user(NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).expect("password hash"),
            is_admin,
        })
        .await
        .expect("seed user");

    app.state
        .auth
        .login(email, password)
        .await
        .expect("login")
        .token
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_with(uri: &str, headers: &[(header::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    builder.body(Body::empty()).expect("request")
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn text_part(name: &str, value: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
    )
}

fn file_part(name: &str, filename: &str, content_type: &str, data: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n"
    )
}

fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&text_part(name, value));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn png_upload(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        content_type: "image/png".to_string(),
        data: Bytes::from_static(b"\x89PNG\r\n\x1a\nstub"),
    }
}

fn pdf_upload(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        content_type: "application/pdf".to_string(),
        data: Bytes::from_static(b"%PDF-1.4 stub"),
    }
}

fn event_input(title: &str, status: &str) -> EventInput {
    EventInput {
        title: Some(title.to_string()),
        description: Some("An evening of community fundraising.".to_string()),
        start_date: Some("2026-06-01 18:00:00".to_string()),
        status: Some(status.to_string()),
        ..Default::default()
    }
}

fn volunteer_application() -> ApplicationInput {
    ApplicationInput {
        first_name: Some("Amina".to_string()),
        last_name: Some("Diallo".to_string()),
        email: Some("amina@example.org".to_string()),
        phone: Some("+220 555 0101".to_string()),
        application_type: Some("volunteer".to_string()),
        date_of_birth: Some("1995-04-12".to_string()),
        country: Some("Gambia".to_string()),
        agrees_to_terms: Some("true".to_string()),
        available_days: vec!["monday".to_string()],
        available_times: vec!["morning".to_string()],
        interests: vec!["outreach".to_string()],
        resume: Some(pdf_upload("resume.pdf")),
        ..Default::default()
    }
}

// ============ Public reads ============

#[sqlx::test(migrations = "./migrations")]
async fn public_event_list_hides_unpublished_rows(pool: PgPool) {
    let app = build_app(pool);
    app.state
        .events
        .create(event_input("Beach Cleanup", "published"))
        .await
        .expect("create published event");
    app.state
        .events
        .create(event_input("Unannounced Gala", "draft"))
        .await
        .expect("create draft event");

    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/events"))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(true));
    let items = body["data"]["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Beach Cleanup");
}

#[sqlx::test(migrations = "./migrations")]
async fn draft_event_detail_is_invisible_to_the_public(pool: PgPool) {
    let app = build_app(pool);
    let created = app
        .state
        .events
        .create(event_input("Unannounced Gala", "draft"))
        .await
        .expect("create draft event");

    let uri = format!("/api/v1/events/{}", created.event.id);
    let response = app
        .router
        .clone()
        .oneshot(get(&uri))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], "Resource not found.");
}

// ============ Conditional requests and caching ============

#[sqlx::test(migrations = "./migrations")]
async fn repeated_list_reads_share_an_etag_and_revalidate_to_304(pool: PgPool) {
    let app = build_app(pool);
    app.state
        .events
        .create(event_input("Beach Cleanup", "published"))
        .await
        .expect("create event");

    let first = app
        .router
        .clone()
        .oneshot(get("/api/v1/events"))
        .await
        .expect("first read");
    assert_eq!(first.status(), StatusCode::OK);
    let etag = first
        .headers()
        .get(header::ETAG)
        .expect("etag header")
        .to_str()
        .expect("ascii etag")
        .to_string();
    assert!(first.headers().contains_key(header::LAST_MODIFIED));
    assert!(first.headers().contains_key(header::CACHE_CONTROL));

    let second = app
        .router
        .clone()
        .oneshot(get_with("/api/v1/events", &[(header::IF_NONE_MATCH, &etag)]))
        .await
        .expect("revalidation");
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);

    let stale = app
        .router
        .clone()
        .oneshot(get_with(
            "/api/v1/events",
            &[(header::IF_NONE_MATCH, "\"stale\"")],
        ))
        .await
        .expect("stale revalidation");
    assert_eq!(stale.status(), StatusCode::OK);
    assert_eq!(
        stale.headers().get(header::ETAG).and_then(|v| v.to_str().ok()),
        Some(etag.as_str())
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn event_detail_supports_conditional_reads(pool: PgPool) {
    let app = build_app(pool);
    let created = app
        .state
        .events
        .create(event_input("Beach Cleanup", "published"))
        .await
        .expect("create event");

    let uri = format!("/api/v1/events/{}", created.event.id);
    let first = app
        .router
        .clone()
        .oneshot(get(&uri))
        .await
        .expect("detail read");
    assert_eq!(first.status(), StatusCode::OK);
    let etag = first
        .headers()
        .get(header::ETAG)
        .expect("etag header")
        .to_str()
        .expect("ascii etag")
        .to_string();

    let revalidated = app
        .router
        .clone()
        .oneshot(get_with(&uri, &[(header::IF_NONE_MATCH, &etag)]))
        .await
        .expect("detail revalidation");
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_writes_invalidate_the_event_list(pool: PgPool) {
    let app = build_app(pool);
    app.state
        .events
        .create(event_input("Beach Cleanup", "published"))
        .await
        .expect("create event");

    let warm = app
        .router
        .clone()
        .oneshot(get("/api/v1/events"))
        .await
        .expect("warm read");
    let etag = warm
        .headers()
        .get(header::ETAG)
        .expect("etag header")
        .to_str()
        .expect("ascii etag")
        .to_string();

    app.state
        .events
        .create(event_input("Tree Planting Day", "published"))
        .await
        .expect("create second event");

    let after = app
        .router
        .clone()
        .oneshot(get_with("/api/v1/events", &[(header::IF_NONE_MATCH, &etag)]))
        .await
        .expect("read after write");
    assert_eq!(after.status(), StatusCode::OK);

    let body = body_json(after).await;
    let titles: Vec<&str> = body["data"]["items"]
        .as_array()
        .expect("items array")
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    assert!(titles.contains(&"Tree Planting Day"));
}

#[sqlx::test(migrations = "./migrations")]
async fn journal_writes_leave_the_event_cache_alone(pool: PgPool) {
    let app = build_app(pool);
    app.state
        .events
        .create(event_input("Beach Cleanup", "published"))
        .await
        .expect("create event");

    let warm = app
        .router
        .clone()
        .oneshot(get("/api/v1/events"))
        .await
        .expect("warm read");
    let etag = warm
        .headers()
        .get(header::ETAG)
        .expect("etag header")
        .to_str()
        .expect("ascii etag")
        .to_string();

    app.state
        .journals
        .create(JournalInput {
            title: Some("Quarterly Report".to_string()),
            description: Some("Impact summary for Q2.".to_string()),
            journal_pdf: Some(pdf_upload("q2.pdf")),
            ..Default::default()
        })
        .await
        .expect("create journal");

    let after = app
        .router
        .clone()
        .oneshot(get_with("/api/v1/events", &[(header::IF_NONE_MATCH, &etag)]))
        .await
        .expect("read after unrelated write");
    assert_eq!(after.status(), StatusCode::NOT_MODIFIED);
}

// ============ Authentication ============

#[sqlx::test(migrations = "./migrations")]
async fn admin_routes_reject_missing_tokens(pool: PgPool) {
    let app = build_app(pool);

    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/admin/events"))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], "Unauthenticated.");
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_routes_reject_non_admin_users(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "volunteer@example.org", false).await;

    let response = app
        .router
        .clone()
        .oneshot(get_with(
            "/api/v1/admin/events",
            &[(header::AUTHORIZATION, &format!("Bearer {token}"))],
        ))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Forbidden.");
}

#[sqlx::test(migrations = "./migrations")]
async fn logout_revokes_the_presenting_token(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;
    let auth_value = format!("Bearer {token}");

    let me = app
        .router
        .clone()
        .oneshot(get_with(
            "/api/v1/auth/me",
            &[(header::AUTHORIZATION, &auth_value)],
        ))
        .await
        .expect("me");
    assert_eq!(me.status(), StatusCode::OK);

    let logout = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/logout")
                .header(header::AUTHORIZATION, &auth_value)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("logout");
    assert_eq!(logout.status(), StatusCode::OK);

    let after = app
        .router
        .clone()
        .oneshot(get_with(
            "/api/v1/auth/me",
            &[(header::AUTHORIZATION, &auth_value)],
        ))
        .await
        .expect("me after logout");
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn login_rejects_bad_passwords(pool: PgPool) {
    let app = build_app(pool);
    issue_token(&app, "admin@example.org", true).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            serde_json::json!({"email": "admin@example.org", "password": "wrong"}),
        ))
        .await
        .expect("login attempt");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============ Admin writes ============

#[sqlx::test(migrations = "./migrations")]
async fn multipart_create_and_patch_respect_the_field_allow_list(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let created = app
        .router
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/v1/admin/events",
            &token,
            &[
                ("title", "Fundraising Gala"),
                ("description", "Annual fundraising dinner."),
                ("start_date", "2026-09-15 19:00:00"),
                ("status", "published"),
            ],
        ))
        .await
        .expect("create");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body_json(created).await;
    assert_eq!(created["message"], "Event created.");
    let id = created["data"]["id"].as_i64().expect("event id");

    // an unlisted field is dropped, not applied and not an error
    let patched = app
        .router
        .clone()
        .oneshot(multipart_request(
            Method::PATCH,
            &format!("/api/v1/admin/events/{id}"),
            &token,
            &[("title", "Fundraising Gala 2026"), ("internal_flag", "1")],
        ))
        .await
        .expect("patch");
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = body_json(patched).await;
    assert_eq!(patched["data"]["title"], "Fundraising Gala 2026");
    assert_eq!(patched["data"]["description"], "Annual fundraising dinner.");
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_event_writes_accept_json_bodies(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let created = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/admin/events",
            Some(&token),
            serde_json::json!({
                "title": "Fundraising Gala",
                "description": "Annual fundraising dinner.",
                "start_date": "2026-09-15 19:00:00",
                "status": "published",
            }),
        ))
        .await
        .expect("json create");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body_json(created).await;
    let id = created["data"]["id"].as_i64().expect("event id");

    let patched = app
        .router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/admin/events/{id}"),
            Some(&token),
            serde_json::json!({"title": "Fundraising Gala 2026"}),
        ))
        .await
        .expect("json patch");
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = body_json(patched).await;
    assert_eq!(patched["data"]["title"], "Fundraising Gala 2026");
    assert_eq!(patched["data"]["description"], "Annual fundraising dinner.");
}

#[sqlx::test(migrations = "./migrations")]
async fn event_status_endpoint_reports_the_transition(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;
    let created = app
        .state
        .events
        .create(event_input("Beach Cleanup", "draft"))
        .await
        .expect("create event");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/admin/events/{}/status", created.event.id),
            Some(&token),
            serde_json::json!({"status": "published"}),
        ))
        .await
        .expect("status change");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["previous_status"], "draft");
    assert_eq!(body["data"]["status"], "published");
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_event_payload_renders_field_errors(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/v1/admin/events",
            &token,
            &[("title", "Missing Everything"), ("status", "someday")],
        ))
        .await
        .expect("create attempt");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], "The given data was invalid.");
    assert!(body["errors"]["description"].is_array());
    assert!(body["errors"]["start_date"].is_array());
    assert!(body["errors"]["status"].is_array());
}

// ============ Journals ============

#[sqlx::test(migrations = "./migrations")]
async fn first_publish_stamps_published_at(pool: PgPool) {
    let app = build_app(pool);

    let journal = app
        .state
        .journals
        .create(JournalInput {
            title: Some("Quarterly Report".to_string()),
            description: Some("Impact summary for Q2.".to_string()),
            journal_pdf: Some(pdf_upload("q2.pdf")),
            ..Default::default()
        })
        .await
        .expect("create draft journal");
    assert!(journal.published_at.is_none());

    let (published, change) = app
        .state
        .journals
        .toggle_status(journal.id)
        .await
        .expect("publish");
    assert_eq!(change.previous_status.as_str(), "draft");
    assert_eq!(change.status.as_str(), "published");
    let stamped = published.published_at.expect("published_at stamped");

    let (redrafted, _) = app
        .state
        .journals
        .toggle_status(journal.id)
        .await
        .expect("unpublish");
    assert_eq!(redrafted.status.as_str(), "draft");

    // republishing keeps the original timestamp
    let (republished, _) = app
        .state
        .journals
        .toggle_status(journal.id)
        .await
        .expect("republish");
    assert_eq!(republished.published_at, Some(stamped));
}

#[sqlx::test(migrations = "./migrations")]
async fn journal_search_scans_body_content(pool: PgPool) {
    let app = build_app(pool);
    app.state
        .journals
        .create(JournalInput {
            title: Some("Quarterly Report".to_string()),
            description: Some("Impact summary for Q2.".to_string()),
            content: Some("Our mobile clinic reached the hippopotamus reserve.".to_string()),
            status: Some("published".to_string()),
            journal_pdf: Some(pdf_upload("q2.pdf")),
            ..Default::default()
        })
        .await
        .expect("create first journal");
    app.state
        .journals
        .create(JournalInput {
            title: Some("Annual Letter".to_string()),
            description: Some("A year in review.".to_string()),
            status: Some("published".to_string()),
            journal_pdf: Some(pdf_upload("annual.pdf")),
            ..Default::default()
        })
        .await
        .expect("create second journal");

    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/journals?search=hippopotamus"))
        .await
        .expect("search");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let items = body["data"]["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Quarterly Report");
}

#[sqlx::test(migrations = "./migrations")]
async fn journal_list_filters_by_category(pool: PgPool) {
    let app = build_app(pool);
    for (title, category) in [("Clinic Update", "health"), ("School Report", "education")] {
        app.state
            .journals
            .create(JournalInput {
                title: Some(title.to_string()),
                description: Some("A field report.".to_string()),
                category: Some(category.to_string()),
                status: Some("published".to_string()),
                journal_pdf: Some(pdf_upload("report.pdf")),
                ..Default::default()
            })
            .await
            .expect("create journal");
    }

    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/journals?category=health"))
        .await
        .expect("filtered list");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let items = body["data"]["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Clinic Update");
}

#[sqlx::test(migrations = "./migrations")]
async fn journal_create_requires_a_pdf(pool: PgPool) {
    let app = build_app(pool);

    let result = app
        .state
        .journals
        .create(JournalInput {
            title: Some("No Attachment".to_string()),
            description: Some("Missing its PDF.".to_string()),
            ..Default::default()
        })
        .await;
    assert!(result.is_err());
}

// ============ Applications ============

#[sqlx::test(migrations = "./migrations")]
async fn application_submission_round_trips_through_the_form(pool: PgPool) {
    let app = build_app(pool);

    let response = app
        .router
        .clone()
        .oneshot({
            let mut body = String::new();
            for (name, value) in [
                ("first_name", "Amina"),
                ("last_name", "Diallo"),
                ("email", "amina@example.org"),
                ("phone", "+220 555 0101"),
                ("application_type", "volunteer"),
                ("date_of_birth", "1995-04-12"),
                ("country", "Gambia"),
                ("agrees_to_terms", "true"),
                ("available_days[]", "monday"),
                ("available_days[]", "friday"),
                ("available_times[]", "morning"),
                ("interests[]", "outreach"),
            ] {
                body.push_str(&text_part(name, value));
            }
            body.push_str(&file_part(
                "resume",
                "resume.pdf",
                "application/pdf",
                "%PDF-1.4 stub",
            ));
            body.push_str(&format!("--{BOUNDARY}--\r\n"));
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/applications")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .expect("request")
        })
        .await
        .expect("submission");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Application submitted successfully.");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(
        body["data"]["available_days"],
        serde_json::json!(["monday", "friday"])
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn approval_appends_a_timestamped_note(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let application = app
        .state
        .applications
        .submit(volunteer_application())
        .await
        .expect("submit application");
    app.state
        .applications
        .update(application.id, Some("pending"), Some("Initial screening passed"))
        .await
        .expect("record notes");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/v1/admin/applications/{}/approve", application.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("approve");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "approved");
    let notes = body["data"]["admin_notes"].as_str().expect("notes");
    assert!(notes.starts_with("Initial screening passed"));
    assert!(notes.contains("Approved on "));
}

#[sqlx::test(migrations = "./migrations")]
async fn rejected_submissions_name_every_missing_field(pool: PgPool) {
    let app = build_app(pool);

    let result = app
        .state
        .applications
        .submit(ApplicationInput::default())
        .await;
    let Err(lanterna::application::error::AppError::Validation(errors)) = result else {
        panic!("expected a validation failure");
    };
    for field in [
        "first_name",
        "last_name",
        "email",
        "phone",
        "country",
        "application_type",
        "date_of_birth",
        "agrees_to_terms",
        "resume",
        "available_days",
        "available_times",
        "interests",
    ] {
        assert!(errors.contains(field), "missing error for {field}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn submissions_require_resume_availability_and_a_past_birth_date(pool: PgPool) {
    let app = build_app(pool);

    let mut input = volunteer_application();
    input.resume = None;
    input.available_days = Vec::new();
    input.available_times = Vec::new();
    input.interests = Vec::new();
    input.date_of_birth = Some("2999-01-01".to_string());

    let result = app.state.applications.submit(input).await;
    let Err(lanterna::application::error::AppError::Validation(errors)) = result else {
        panic!("expected a validation failure");
    };
    for field in [
        "resume",
        "available_days",
        "available_times",
        "interests",
        "date_of_birth",
    ] {
        assert!(errors.contains(field), "missing error for {field}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn application_updates_require_a_status(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let application = app
        .state
        .applications
        .submit(volunteer_application())
        .await
        .expect("submit application");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/admin/applications/{}", application.id),
            Some(&token),
            serde_json::json!({"admin_notes": "looked fine"}),
        ))
        .await
        .expect("patch without status");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert!(body["errors"]["status"].is_array());
}

// ============ Contact requests ============

#[sqlx::test(migrations = "./migrations")]
async fn contact_submission_validation_uses_the_envelope(pool: PgPool) {
    let app = build_app(pool);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/contact-requests",
            None,
            serde_json::json!({}),
        ))
        .await
        .expect("submission");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["message"], "The given data was invalid.");
    for field in ["name", "email", "subject", "message"] {
        assert!(body["errors"][field].is_array(), "missing errors for {field}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn contact_messages_are_capped_at_two_thousand_characters(pool: PgPool) {
    let app = build_app(pool);

    let over_limit = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/contact-requests",
            None,
            serde_json::json!({
                "name": "Lamin",
                "email": "lamin@example.org",
                "subject": "Partnership",
                "message": "x".repeat(2001),
            }),
        ))
        .await
        .expect("oversized submission");
    assert_eq!(over_limit.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(over_limit).await;
    assert!(body["errors"]["message"].is_array());

    let at_limit = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/contact-requests",
            None,
            serde_json::json!({
                "name": "Lamin",
                "email": "lamin@example.org",
                "subject": "Partnership",
                "message": "x".repeat(2000),
            }),
        ))
        .await
        .expect("submission at the limit");
    assert_eq!(at_limit.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn replying_marks_the_request_replied(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let submitted = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/contact-requests",
            None,
            serde_json::json!({
                "name": "Lamin",
                "email": "lamin@example.org",
                "subject": "Partnership",
                "message": "We would like to collaborate."
            }),
        ))
        .await
        .expect("submission");
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let submitted = body_json(submitted).await;
    let id = submitted["data"]["id"].as_i64().expect("contact id");

    let replied = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/admin/contact-requests/{id}/reply"),
            Some(&token),
            serde_json::json!({"admin_reply": "Thanks, let's talk next week."}),
        ))
        .await
        .expect("reply");
    assert_eq!(replied.status(), StatusCode::OK);

    let body = body_json(replied).await;
    assert_eq!(body["data"]["status"], "replied");
    assert!(!body["data"]["replied_at"].is_null());
    assert_eq!(body["data"]["admin_reply"], "Thanks, let's talk next week.");
}

// ============ Stored files ============

#[sqlx::test(migrations = "./migrations")]
async fn stored_image_urls_join_the_public_base(pool: PgPool) {
    let app = build_app(pool);
    let token = issue_token(&app, "admin@example.org", true).await;

    let mut input = event_input("Beach Cleanup", "published");
    input.featured_image = Some(png_upload("banner.png"));
    let created = app.state.events.create(input).await.expect("create event");

    let response = app
        .router
        .clone()
        .oneshot(get_with(
            &format!("/api/v1/admin/events/{}", created.event.id),
            &[(header::AUTHORIZATION, &format!("Bearer {token}"))],
        ))
        .await
        .expect("admin read");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let url = body["data"]["featured_image_url"]
        .as_str()
        .expect("featured image url");
    assert!(
        url.starts_with("http://localhost:8000/storage/events/featured/"),
        "unexpected url: {url}"
    );

    // and the blob route serves the bytes back
    let stored_path = created.event.featured_image.as_deref().expect("stored path");
    let served = app
        .router
        .clone()
        .oneshot(get(&format!("/storage/{stored_path}")))
        .await
        .expect("blob read");
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_an_event_removes_its_stored_files(pool: PgPool) {
    let app = build_app(pool);

    let mut input = event_input("Beach Cleanup", "published");
    input.featured_image = Some(png_upload("banner.png"));
    let created = app.state.events.create(input).await.expect("create event");
    let stored_path = created
        .event
        .featured_image
        .clone()
        .expect("stored path");
    let absolute = app
        .state
        .blobs
        .absolute_path(&stored_path)
        .expect("absolute path");
    assert!(absolute.exists());

    app.state
        .events
        .delete(created.event.id)
        .await
        .expect("delete event");
    assert!(!absolute.exists());

    let missing = app
        .router
        .clone()
        .oneshot(get(&format!("/storage/{stored_path}")))
        .await
        .expect("blob read");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
