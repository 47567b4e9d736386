//! Journal management: public reads plus the admin publishing workflow.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::application::error::AppError;
use crate::application::events::UploadedFile;
use crate::application::pagination::{OffsetPage, Page};
use crate::application::repos::{
    JournalFilter, JournalPatch, JournalSortKey, JournalsRepo, ListScope, NewJournal, SortOrder,
};
use crate::application::validate::{FieldErrors, non_blank, parse_flexible_datetime};
use crate::cache::{Family, ResponseCache};
use crate::domain::entities::JournalRecord;
use crate::domain::files::FileRule;
use crate::domain::types::JournalStatus;
use crate::infra::blob::BlobStorage;

const PDF_PREFIX: &str = "journals/pdfs";
const COVER_PREFIX: &str = "journals/covers";
const FEATURED_PREFIX: &str = "journals/featured";

#[derive(Debug, Clone, Default)]
pub struct JournalListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct JournalInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<String>,
    pub journal_pdf: Option<UploadedFile>,
    pub cover_image: Option<UploadedFile>,
    pub featured_image: Option<UploadedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalStatusChange {
    pub previous_status: JournalStatus,
    pub status: JournalStatus,
}

pub struct JournalService {
    repo: Arc<dyn JournalsRepo>,
    blobs: Arc<BlobStorage>,
    cache: Arc<ResponseCache>,
}

impl JournalService {
    pub fn new(
        repo: Arc<dyn JournalsRepo>,
        blobs: Arc<BlobStorage>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self { repo, blobs, cache }
    }

    pub fn resolve_filter(
        params: &JournalListParams,
        admin: bool,
    ) -> Result<(JournalFilter, OffsetPage), AppError> {
        let mut errors = FieldErrors::new();

        let scope = if admin {
            let status = match non_blank(params.status.as_deref()) {
                Some(raw) => match JournalStatus::try_from(raw) {
                    Ok(status) => Some(status),
                    Err(()) => {
                        errors.add("status", "must be `draft` or `published`");
                        None
                    }
                },
                None => None,
            };
            ListScope::Admin { status }
        } else {
            ListScope::Public
        };

        let sort_by = match non_blank(params.sort_by.as_deref()) {
            Some(raw) => match JournalSortKey::try_from(raw) {
                Ok(key) => key,
                Err(()) => {
                    errors.add("sort_by", "is not a sortable column");
                    JournalSortKey::PublishedAt
                }
            },
            None => JournalSortKey::PublishedAt,
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

        let filter = JournalFilter {
            scope,
            category: non_blank(params.category.as_deref()).map(str::to_string),
            search: non_blank(params.search.as_deref()).map(str::to_string),
            sort_by,
            sort_order,
        };
        Ok((filter, OffsetPage::new(params.page, params.per_page)))
    }

    pub async fn list(
        &self,
        filter: &JournalFilter,
        page: OffsetPage,
    ) -> Result<Page<JournalRecord>, AppError> {
        Ok(self.repo.list_journals(filter, page).await?)
    }

    pub async fn get(&self, id: i64, admin: bool) -> Result<JournalRecord, AppError> {
        let journal = self
            .repo
            .find_journal(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !admin && journal.status != JournalStatus::Published {
            return Err(AppError::NotFound);
        }
        Ok(journal)
    }

    pub async fn create(&self, input: JournalInput) -> Result<JournalRecord, AppError> {
        let mut errors = FieldErrors::new();

        let title = match non_blank(input.title.as_deref()) {
            Some(value) => value.to_string(),
            None => {
                errors.add("title", "is required");
                String::new()
            }
        };
        let description = match non_blank(input.description.as_deref()) {
            Some(value) => value.to_string(),
            None => {
                errors.add("description", "is required");
                String::new()
            }
        };

        let status = match non_blank(input.status.as_deref()) {
            Some(raw) => match JournalStatus::try_from(raw) {
                Ok(status) => status,
                Err(()) => {
                    errors.add("status", "must be `draft` or `published`");
                    JournalStatus::Draft
                }
            },
            None => JournalStatus::Draft,
        };

        if input.journal_pdf.is_none() {
            errors.add("journal_pdf", "is required");
        }
        if let Some(file) = input.journal_pdf.as_ref()
            && let Err(reason) = FileRule::pdf().check(&file.filename, &file.content_type, file.size())
        {
            errors.add("journal_pdf", reason);
        }
        for (field, file) in [
            ("cover_image", input.cover_image.as_ref()),
            ("featured_image", input.featured_image.as_ref()),
        ] {
            if let Some(file) = file
                && let Err(reason) =
                    FileRule::image().check(&file.filename, &file.content_type, file.size())
            {
                errors.add(field, reason);
            }
        }

        let metadata = super::events::parse_metadata_value(&mut errors, input.metadata.as_deref());

        errors.into_result().map_err(AppError::validation)?;

        let journal_pdf = match input.journal_pdf {
            Some(file) => Some(self.store_file(PDF_PREFIX, &file).await?),
            None => None,
        };
        let cover_image = match input.cover_image {
            Some(file) => Some(self.store_file(COVER_PREFIX, &file).await?),
            None => None,
        };
        let featured_image = match input.featured_image {
            Some(file) => Some(self.store_file(FEATURED_PREFIX, &file).await?),
            None => None,
        };

        // Body content falls back to the description so list excerpts always
        // have something to render.
        let content = non_blank(input.content.as_deref())
            .map(str::to_string)
            .or_else(|| Some(description.clone()));

        let published_at = match status {
            JournalStatus::Published => Some(OffsetDateTime::now_utc()),
            JournalStatus::Draft => non_blank(input.publication_date.as_deref())
                .and_then(parse_flexible_datetime),
        };

        let journal = self
            .repo
            .create_journal(NewJournal {
                title,
                content,
                excerpt: non_blank(input.excerpt.as_deref()).map(str::to_string),
                category: non_blank(input.category.as_deref()).map(str::to_string),
                publication_date: non_blank(input.publication_date.as_deref())
                    .map(str::to_string),
                description,
                journal_pdf,
                cover_image,
                featured_image,
                status,
                published_at,
                metadata,
            })
            .await?;

        self.cache.invalidate_family(Family::Journals);
        info!(target = "lanterna::journals", journal_id = journal.id, "journal created");

        Ok(journal)
    }

    pub async fn update(&self, id: i64, input: JournalInput) -> Result<JournalRecord, AppError> {
        let existing = self
            .repo
            .find_journal(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut errors = FieldErrors::new();
        let mut patch = JournalPatch::default();

        if let Some(title) = input.title.as_deref() {
            match non_blank(Some(title)) {
                Some(value) => patch.title = Some(value.to_string()),
                None => errors.add("title", "must not be empty"),
            }
        }
        if let Some(description) = input.description.as_deref() {
            match non_blank(Some(description)) {
                Some(value) => patch.description = Some(value.to_string()),
                None => errors.add("description", "must not be empty"),
            }
        }
        if let Some(content) = input.content.as_deref() {
            patch.content = Some(content.trim().to_string());
        }
        if let Some(excerpt) = input.excerpt.as_deref() {
            patch.excerpt = Some(excerpt.trim().to_string());
        }
        if let Some(category) = input.category.as_deref() {
            patch.category = Some(category.trim().to_string());
        }
        if let Some(publication_date) = input.publication_date.as_deref() {
            patch.publication_date = Some(publication_date.trim().to_string());
        }

        let mut new_status = None;
        if let Some(raw) = non_blank(input.status.as_deref()) {
            match JournalStatus::try_from(raw) {
                Ok(status) => {
                    new_status = Some(status);
                    patch.status = Some(status);
                }
                Err(()) => errors.add("status", "must be `draft` or `published`"),
            }
        }
        if input.metadata.is_some() {
            patch.metadata = Some(super::events::parse_metadata_value(
                &mut errors,
                input.metadata.as_deref(),
            ));
        }

        for (field, file) in [
            ("journal_pdf", input.journal_pdf.as_ref()),
            ("cover_image", input.cover_image.as_ref()),
            ("featured_image", input.featured_image.as_ref()),
        ] {
            if let Some(file) = file {
                let rule = if field == "journal_pdf" {
                    FileRule::pdf()
                } else {
                    FileRule::image()
                };
                if let Err(reason) = rule.check(&file.filename, &file.content_type, file.size()) {
                    errors.add(field, reason);
                }
            }
        }

        errors.into_result().map_err(AppError::validation)?;

        if let Some(file) = input.journal_pdf {
            let stored = self.store_file(PDF_PREFIX, &file).await?;
            if let Some(previous) = existing.journal_pdf.as_deref() {
                self.blobs.delete_quietly(previous).await;
            }
            patch.journal_pdf = Some(Some(stored));
        }
        if let Some(file) = input.cover_image {
            let stored = self.store_file(COVER_PREFIX, &file).await?;
            if let Some(previous) = existing.cover_image.as_deref() {
                self.blobs.delete_quietly(previous).await;
            }
            patch.cover_image = Some(Some(stored));
        }
        if let Some(file) = input.featured_image {
            let stored = self.store_file(FEATURED_PREFIX, &file).await?;
            if let Some(previous) = existing.featured_image.as_deref() {
                self.blobs.delete_quietly(previous).await;
            }
            patch.featured_image = Some(Some(stored));
        }

        // First transition to published stamps the publication moment.
        if new_status == Some(JournalStatus::Published) && existing.published_at.is_none() {
            patch.published_at = Some(Some(OffsetDateTime::now_utc()));
        }

        let journal = self.repo.update_journal(id, patch).await?;
        self.cache.invalidate_family(Family::Journals);

        Ok(journal)
    }

    /// Flip between draft and published without touching any other field.
    pub async fn toggle_status(
        &self,
        id: i64,
    ) -> Result<(JournalRecord, JournalStatusChange), AppError> {
        let existing = self
            .repo
            .find_journal(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let previous_status = existing.status;
        let status = match previous_status {
            JournalStatus::Draft => JournalStatus::Published,
            JournalStatus::Published => JournalStatus::Draft,
        };

        let mut patch = JournalPatch {
            status: Some(status),
            ..Default::default()
        };
        if status == JournalStatus::Published && existing.published_at.is_none() {
            patch.published_at = Some(Some(OffsetDateTime::now_utc()));
        }

        let journal = self.repo.update_journal(id, patch).await?;
        self.cache.invalidate_family(Family::Journals);

        Ok((
            journal,
            JournalStatusChange {
                previous_status,
                status,
            },
        ))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let existing = self
            .repo
            .find_journal(id)
            .await?
            .ok_or(AppError::NotFound)?;

        for path in [
            existing.journal_pdf.as_deref(),
            existing.cover_image.as_deref(),
            existing.featured_image.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            self.blobs.delete_quietly(path).await;
        }

        self.repo.delete_journal(id).await?;
        self.cache.invalidate_family(Family::Journals);
        info!(target = "lanterna::journals", journal_id = id, "journal deleted");

        Ok(())
    }

    async fn store_file(&self, prefix: &str, file: &UploadedFile) -> Result<String, AppError> {
        let stored = self
            .blobs
            .store(prefix, &file.filename, file.data.clone())
            .await
            .map_err(|err| AppError::unexpected(format!("failed to store upload: {err}")))?;
        Ok(stored.stored_path)
    }
}
