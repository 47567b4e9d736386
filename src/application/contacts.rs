//! Contact requests: public submission and the admin reply workflow.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use tracing::info;

use crate::application::error::AppError;
use crate::application::pagination::{OffsetPage, Page};
use crate::application::repos::{
    ContactFilter, ContactPatch, ContactSortKey, ContactsRepo, NewContactRequest, SortOrder,
};
use crate::application::validate::{FieldErrors, looks_like_email, non_blank};
use crate::domain::entities::ContactRequestRecord;
use crate::domain::types::ContactStatus;

#[derive(Debug, Clone, Default)]
pub struct ContactListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

const MAX_MESSAGE_CHARS: usize = 2000;

pub struct ContactService {
    repo: Arc<dyn ContactsRepo>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactsRepo>) -> Self {
        Self { repo }
    }

    pub fn resolve_filter(
        params: &ContactListParams,
    ) -> Result<(ContactFilter, OffsetPage), AppError> {
        let mut errors = FieldErrors::new();

        let status = match non_blank(params.status.as_deref()) {
            Some(raw) => match ContactStatus::try_from(raw) {
                Ok(status) => Some(status),
                Err(()) => {
                    errors.add("status", "must be one of new, replied, closed");
                    None
                }
            },
            None => None,
        };

        let sort_by = match non_blank(params.sort_by.as_deref()) {
            Some(raw) => match ContactSortKey::try_from(raw) {
                Ok(key) => key,
                Err(()) => {
                    errors.add("sort_by", "is not a sortable column");
                    ContactSortKey::CreatedAt
                }
            },
            None => ContactSortKey::CreatedAt,
        };

        let sort_order = match non_blank(params.sort_order.as_deref()) {
            Some(raw) => match SortOrder::try_from(raw) {
                Ok(order) => order,
                Err(()) => {
                    errors.add("sort_order", "must be `asc` or `desc`");
                    SortOrder::Desc
                }
            },
            None => SortOrder::Desc,
        };

        errors.into_result().map_err(AppError::validation)?;

        let filter = ContactFilter {
            status,
            search: non_blank(params.search.as_deref()).map(str::to_string),
            sort_by,
            sort_order,
        };
        Ok((filter, OffsetPage::new(params.page, params.per_page)))
    }

    pub async fn list(
        &self,
        filter: &ContactFilter,
        page: OffsetPage,
    ) -> Result<Page<ContactRequestRecord>, AppError> {
        Ok(self.repo.list_contact_requests(filter, page).await?)
    }

    pub async fn get(&self, id: i64) -> Result<ContactRequestRecord, AppError> {
        self.repo
            .find_contact_request(id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn submit(&self, input: ContactInput) -> Result<ContactRequestRecord, AppError> {
        let mut errors = FieldErrors::new();

        let name = match non_blank(input.name.as_deref()) {
            Some(value) => value.to_string(),
            None => {
                errors.add("name", "is required");
                String::new()
            }
        };
        let email = match non_blank(input.email.as_deref()) {
            Some(value) if looks_like_email(value) => value.to_string(),
            Some(_) => {
                errors.add("email", "must be a valid email address");
                String::new()
            }
            None => {
                errors.add("email", "is required");
                String::new()
            }
        };
        let subject = match non_blank(input.subject.as_deref()) {
            Some(value) => value.to_string(),
            None => {
                errors.add("subject", "is required");
                String::new()
            }
        };
        let message = match non_blank(input.message.as_deref()) {
            Some(value) if value.chars().count() <= MAX_MESSAGE_CHARS => value.to_string(),
            Some(_) => {
                errors.add("message", "must not exceed 2000 characters");
                String::new()
            }
            None => {
                errors.add("message", "is required");
                String::new()
            }
        };

        errors.into_result().map_err(AppError::validation)?;

        let contact = self
            .repo
            .create_contact_request(NewContactRequest {
                name,
                email,
                subject,
                message,
                metadata: JsonValue::Object(Default::default()),
            })
            .await?;

        info!(target = "lanterna::contacts", contact_id = contact.id, "contact request received");

        Ok(contact)
    }

    pub async fn update(
        &self,
        id: i64,
        status: Option<&str>,
        admin_reply: Option<&str>,
    ) -> Result<ContactRequestRecord, AppError> {
        self.repo
            .find_contact_request(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut patch = ContactPatch::default();
        if let Some(raw) = non_blank(status) {
            let status = ContactStatus::try_from(raw).map_err(|()| {
                AppError::validation_message("status", "must be one of new, replied, closed")
            })?;
            if status == ContactStatus::Replied {
                patch.replied_at = Some(Some(OffsetDateTime::now_utc()));
            }
            patch.status = Some(status);
        }
        if let Some(reply) = admin_reply {
            if reply.chars().count() > MAX_MESSAGE_CHARS {
                return Err(AppError::validation_message(
                    "admin_reply",
                    "must not exceed 2000 characters",
                ));
            }
            patch.admin_reply = Some(reply.to_string());
        }

        Ok(self.repo.update_contact_request(id, patch).await?)
    }

    /// Record a reply: stores the text, marks the request replied and stamps
    /// the reply time.
    pub async fn reply(&self, id: i64, reply: Option<&str>) -> Result<ContactRequestRecord, AppError> {
        let reply = non_blank(reply)
            .ok_or_else(|| AppError::validation_message("admin_reply", "is required"))?;
        if reply.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation_message(
                "admin_reply",
                "must not exceed 2000 characters",
            ));
        }

        self.repo
            .find_contact_request(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let contact = self
            .repo
            .update_contact_request(
                id,
                ContactPatch {
                    status: Some(ContactStatus::Replied),
                    admin_reply: Some(reply.to_string()),
                    replied_at: Some(Some(OffsetDateTime::now_utc())),
                },
            )
            .await?;

        info!(target = "lanterna::contacts", contact_id = id, "reply recorded");

        Ok(contact)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.repo
            .find_contact_request(id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.repo.delete_contact_request(id).await?;
        Ok(())
    }
}
