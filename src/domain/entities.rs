//! Persistent records shared between repositories and services.

use serde::Serialize;
use serde_json::Value as JsonValue;
use time::{Date, OffsetDateTime};

use crate::domain::types::{
    ApplicationStatus, ApplicationType, ContactStatus, EventStatus, JournalStatus,
};

#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub status: EventStatus,
    pub featured_image: Option<String>,
    pub metadata: JsonValue,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventGalleryRecord {
    pub id: i64,
    pub event_id: i64,
    pub image_path: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalRecord {
    pub id: i64,
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
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub metadata: JsonValue,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    pub resume_path: Option<String>,
    pub admin_notes: String,
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactRequestRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub admin_reply: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub replied_at: Option<OffsetDateTime>,
    pub metadata: JsonValue,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Legacy token row; the opaque token is stored verbatim.
#[derive(Debug, Clone)]
pub struct ApiTokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub name: Option<String>,
    pub last_used_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Digest-based token row; only the SHA-256 of the secret is stored.
#[derive(Debug, Clone)]
pub struct AccessTokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token_digest: Vec<u8>,
    pub name: String,
    pub last_used_at: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
