//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use time::{Date, OffsetDateTime};

use crate::application::pagination::{OffsetPage, Page};
use crate::domain::entities::{
    AccessTokenRecord, ApiTokenRecord, ApplicationRecord, ContactRequestRecord, EventGalleryRecord,
    EventRecord, JournalRecord, UserRecord,
};
use crate::domain::types::{
    ApplicationStatus, ApplicationType, ContactStatus, EventStatus, JournalStatus,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read visibility: public reads only ever see published content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope<S> {
    Public,
    Admin { status: Option<S> },
}

impl<S> ListScope<S> {
    pub fn is_admin(&self) -> bool {
        matches!(self, ListScope::Admin { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl TryFrom<&str> for SortOrder {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

// Sortable columns are closed sets: ORDER BY cannot take bind parameters, so
// each resource whitelists what it accepts.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSortKey {
    StartDate,
    CreatedAt,
    Title,
    Status,
}

impl EventSortKey {
    pub fn column(self) -> &'static str {
        match self {
            EventSortKey::StartDate => "start_date",
            EventSortKey::CreatedAt => "created_at",
            EventSortKey::Title => "title",
            EventSortKey::Status => "status",
        }
    }
}

impl TryFrom<&str> for EventSortKey {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "start_date" => Ok(EventSortKey::StartDate),
            "created_at" => Ok(EventSortKey::CreatedAt),
            "title" => Ok(EventSortKey::Title),
            "status" => Ok(EventSortKey::Status),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JournalSortKey {
    PublishedAt,
    CreatedAt,
    Title,
    Category,
}

impl JournalSortKey {
    pub fn column(self) -> &'static str {
        match self {
            JournalSortKey::PublishedAt => "published_at",
            JournalSortKey::CreatedAt => "created_at",
            JournalSortKey::Title => "title",
            JournalSortKey::Category => "category",
        }
    }
}

impl TryFrom<&str> for JournalSortKey {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "published_at" => Ok(JournalSortKey::PublishedAt),
            "created_at" => Ok(JournalSortKey::CreatedAt),
            "title" => Ok(JournalSortKey::Title),
            "category" => Ok(JournalSortKey::Category),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationSortKey {
    CreatedAt,
    FirstName,
    LastName,
    Status,
}

impl ApplicationSortKey {
    pub fn column(self) -> &'static str {
        match self {
            ApplicationSortKey::CreatedAt => "created_at",
            ApplicationSortKey::FirstName => "first_name",
            ApplicationSortKey::LastName => "last_name",
            ApplicationSortKey::Status => "status",
        }
    }
}

impl TryFrom<&str> for ApplicationSortKey {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created_at" => Ok(ApplicationSortKey::CreatedAt),
            "first_name" => Ok(ApplicationSortKey::FirstName),
            "last_name" => Ok(ApplicationSortKey::LastName),
            "status" => Ok(ApplicationSortKey::Status),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactSortKey {
    CreatedAt,
    Name,
    Status,
}

impl ContactSortKey {
    pub fn column(self) -> &'static str {
        match self {
            ContactSortKey::CreatedAt => "created_at",
            ContactSortKey::Name => "name",
            ContactSortKey::Status => "status",
        }
    }
}

impl TryFrom<&str> for ContactSortKey {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created_at" => Ok(ContactSortKey::CreatedAt),
            "name" => Ok(ContactSortKey::Name),
            "status" => Ok(ContactSortKey::Status),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventFilter {
    pub scope: ListScope<EventStatus>,
    pub search: Option<String>,
    pub sort_by: EventSortKey,
    pub sort_order: SortOrder,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            scope: ListScope::Public,
            search: None,
            sort_by: EventSortKey::StartDate,
            sort_order: SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalFilter {
    pub scope: ListScope<JournalStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: JournalSortKey,
    pub sort_order: SortOrder,
}

impl Default for JournalFilter {
    fn default() -> Self {
        Self {
            scope: ListScope::Public,
            category: None,
            search: None,
            sort_by: JournalSortKey::PublishedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub application_type: Option<ApplicationType>,
    pub search: Option<String>,
    pub sort_by: ApplicationSortKey,
    pub sort_order: SortOrder,
}

impl Default for ApplicationFilter {
    fn default() -> Self {
        Self {
            status: None,
            application_type: None,
            search: None,
            sort_by: ApplicationSortKey::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactFilter {
    pub status: Option<ContactStatus>,
    pub search: Option<String>,
    pub sort_by: ContactSortKey,
    pub sort_order: SortOrder,
}

impl Default for ContactFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            sort_by: ContactSortKey::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub start_date: OffsetDateTime,
    pub end_date: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub status: EventStatus,
    pub featured_image: Option<String>,
    pub metadata: JsonValue,
}

/// Partial update; `None` keeps the stored value. Nullable columns use a
/// nested `Option` so a patch can clear them explicitly.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<Option<OffsetDateTime>>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub featured_image: Option<Option<String>>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct NewGalleryImage {
    pub event_id: i64,
    pub image_path: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewJournal {
    pub title: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<String>,
    pub description: String,
    pub journal_pdf: Option<String>,
    pub cover_image: Option<String>,
    pub featured_image: Option<String>,
    pub status: JournalStatus,
    pub published_at: Option<OffsetDateTime>,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, Default)]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<String>,
    pub description: Option<String>,
    pub journal_pdf: Option<Option<String>>,
    pub cover_image: Option<Option<String>>,
    pub featured_image: Option<Option<String>>,
    pub status: Option<JournalStatus>,
    pub published_at: Option<Option<OffsetDateTime>>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub application_type: ApplicationType,
    pub resume_path: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Date,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,
    pub education_level: Option<String>,
    pub program_major: Option<String>,
    pub languages: Option<String>,
    pub available_days: Vec<String>,
    pub available_times: Vec<String>,
    pub interests: Vec<String>,
    pub skills_experience: Option<String>,
    pub motivation: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_relationship: Option<String>,
    pub emergency_phone: Option<String>,
    pub reference_name: Option<String>,
    pub reference_contact: Option<String>,
    pub has_medical_condition: bool,
    pub agrees_to_terms: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub status: Option<ContactStatus>,
    pub admin_reply: Option<String>,
    pub replied_at: Option<Option<OffsetDateTime>>,
}

#[async_trait]
pub trait EventsRepo: Send + Sync {
    async fn list_events(
        &self,
        filter: &EventFilter,
        page: OffsetPage,
    ) -> Result<Page<EventRecord>, RepoError>;

    async fn find_event(&self, id: i64) -> Result<Option<EventRecord>, RepoError>;

    async fn create_event(&self, params: NewEvent) -> Result<EventRecord, RepoError>;

    async fn update_event(&self, id: i64, patch: EventPatch) -> Result<EventRecord, RepoError>;

    async fn delete_event(&self, id: i64) -> Result<(), RepoError>;

    async fn list_galleries(
        &self,
        event_ids: &[i64],
    ) -> Result<Vec<EventGalleryRecord>, RepoError>;

    async fn add_gallery_image(
        &self,
        params: NewGalleryImage,
    ) -> Result<EventGalleryRecord, RepoError>;

    async fn find_gallery_image(
        &self,
        event_id: i64,
        gallery_id: i64,
    ) -> Result<Option<EventGalleryRecord>, RepoError>;

    async fn delete_gallery_image(&self, id: i64) -> Result<(), RepoError>;

    async fn next_gallery_sort_order(&self, event_id: i64) -> Result<i32, RepoError>;
}

#[async_trait]
pub trait JournalsRepo: Send + Sync {
    async fn list_journals(
        &self,
        filter: &JournalFilter,
        page: OffsetPage,
    ) -> Result<Page<JournalRecord>, RepoError>;

    async fn find_journal(&self, id: i64) -> Result<Option<JournalRecord>, RepoError>;

    async fn create_journal(&self, params: NewJournal) -> Result<JournalRecord, RepoError>;

    async fn update_journal(
        &self,
        id: i64,
        patch: JournalPatch,
    ) -> Result<JournalRecord, RepoError>;

    async fn delete_journal(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ApplicationsRepo: Send + Sync {
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: OffsetPage,
    ) -> Result<Page<ApplicationRecord>, RepoError>;

    async fn find_application(&self, id: i64) -> Result<Option<ApplicationRecord>, RepoError>;

    async fn create_application(
        &self,
        params: NewApplication,
    ) -> Result<ApplicationRecord, RepoError>;

    async fn update_application(
        &self,
        id: i64,
        patch: ApplicationPatch,
    ) -> Result<ApplicationRecord, RepoError>;

    async fn delete_application(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ContactsRepo: Send + Sync {
    async fn list_contact_requests(
        &self,
        filter: &ContactFilter,
        page: OffsetPage,
    ) -> Result<Page<ContactRequestRecord>, RepoError>;

    async fn find_contact_request(
        &self,
        id: i64,
    ) -> Result<Option<ContactRequestRecord>, RepoError>;

    async fn create_contact_request(
        &self,
        params: NewContactRequest,
    ) -> Result<ContactRequestRecord, RepoError>;

    async fn update_contact_request(
        &self,
        id: i64,
        patch: ContactPatch,
    ) -> Result<ContactRequestRecord, RepoError>;

    async fn delete_contact_request(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: NewUser) -> Result<UserRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewAccessToken {
    pub user_id: i64,
    pub token_digest: Vec<u8>,
    pub name: String,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait TokensRepo: Send + Sync {
    async fn find_api_token(&self, token: &str) -> Result<Option<ApiTokenRecord>, RepoError>;

    async fn find_access_token(
        &self,
        digest: &[u8],
    ) -> Result<Option<AccessTokenRecord>, RepoError>;

    async fn create_access_token(
        &self,
        params: NewAccessToken,
    ) -> Result<AccessTokenRecord, RepoError>;

    async fn delete_access_token(&self, id: i64) -> Result<(), RepoError>;

    async fn touch_api_token(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError>;

    async fn touch_access_token(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError>;
}
