//! Event management: public listings and the admin write surface.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::application::error::AppError;
use crate::application::pagination::{OffsetPage, Page};
use crate::application::repos::{
    EventFilter, EventPatch, EventSortKey, EventsRepo, ListScope, NewEvent, NewGalleryImage,
    SortOrder,
};
use crate::application::validate::{FieldErrors, non_blank, parse_flexible_datetime};
use crate::cache::{Family, ResponseCache};
use crate::domain::entities::{EventGalleryRecord, EventRecord};
use crate::domain::files::FileRule;
use crate::domain::types::EventStatus;
use crate::infra::blob::BlobStorage;

const FEATURED_PREFIX: &str = "events/featured";
const GALLERY_PREFIX: &str = "events/gallery";

/// A file accepted from the client, buffered and ready for validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventWithGallery {
    #[serde(flatten)]
    pub event: EventRecord,
    pub gallery: Vec<EventGalleryRecord>,
}

/// Raw list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct EventListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Raw create/update fields; file parts arrive separately.
#[derive(Debug, Clone, Default)]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<String>,
    pub featured_image: Option<UploadedFile>,
    pub gallery_images: Vec<UploadedFile>,
    pub gallery_alt_texts: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub previous_status: EventStatus,
    pub status: EventStatus,
}

pub struct EventService {
    repo: Arc<dyn EventsRepo>,
    blobs: Arc<BlobStorage>,
    cache: Arc<ResponseCache>,
}

impl EventService {
    pub fn new(
        repo: Arc<dyn EventsRepo>,
        blobs: Arc<BlobStorage>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self { repo, blobs, cache }
    }

    /// Resolve raw list parameters into a repository filter. Unknown status
    /// or sort values are validation failures, not silent defaults.
    pub fn resolve_filter(
        params: &EventListParams,
        admin: bool,
    ) -> Result<(EventFilter, OffsetPage), AppError> {
        let mut errors = FieldErrors::new();

        let scope = if admin {
            let status = match non_blank(params.status.as_deref()) {
                Some(raw) => match EventStatus::try_from(raw) {
                    Ok(status) => Some(status),
                    Err(()) => {
                        errors.add("status", "must be one of draft, published, cancelled");
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
            Some(raw) => match EventSortKey::try_from(raw) {
                Ok(key) => key,
                Err(()) => {
                    errors.add("sort_by", "is not a sortable column");
                    EventSortKey::StartDate
                }
            },
            None => EventSortKey::StartDate,
        };

        let sort_order = match non_blank(params.sort_order.as_deref()) {
            Some(raw) => match SortOrder::try_from(raw) {
                Ok(order) => order,
                Err(()) => {
                    errors.add("sort_order", "must be `asc` or `desc`");
                    SortOrder::Asc
                }
            },
            None => SortOrder::Asc,
        };

        errors.into_result().map_err(AppError::validation)?;

        let filter = EventFilter {
            scope,
            search: non_blank(params.search.as_deref()).map(str::to_string),
            sort_by,
            sort_order,
        };
        Ok((filter, OffsetPage::new(params.page, params.per_page)))
    }

    pub async fn list(
        &self,
        filter: &EventFilter,
        page: OffsetPage,
    ) -> Result<Page<EventWithGallery>, AppError> {
        let events = self.repo.list_events(filter, page).await?;
        self.attach_galleries(events).await
    }

    pub async fn get(&self, id: i64, admin: bool) -> Result<EventWithGallery, AppError> {
        let event = self.repo.find_event(id).await?.ok_or(AppError::NotFound)?;
        if !admin && event.status != EventStatus::Published {
            // drafts stay invisible to the public; same 404 as a missing row
            return Err(AppError::NotFound);
        }

        let gallery = self.repo.list_galleries(&[event.id]).await?;
        Ok(EventWithGallery { event, gallery })
    }

    pub async fn create(&self, input: EventInput) -> Result<EventWithGallery, AppError> {
        let mut errors = FieldErrors::new();

        let title = require_text(&mut errors, "title", input.title.as_deref());
        let description = require_text(&mut errors, "description", input.description.as_deref());

        let start_date = match non_blank(input.start_date.as_deref()) {
            Some(raw) => match parse_flexible_datetime(raw) {
                Some(value) => Some(value),
                None => {
                    errors.add("start_date", "must be a valid date");
                    None
                }
            },
            None => {
                errors.add("start_date", "is required");
                None
            }
        };

        let end_date = match non_blank(input.end_date.as_deref()) {
            Some(raw) => match parse_flexible_datetime(raw) {
                Some(value) => Some(value),
                None => {
                    errors.add("end_date", "must be a valid date");
                    None
                }
            },
            None => None,
        };

        if let (Some(start), Some(end)) = (start_date, end_date)
            && end < start
        {
            errors.add("end_date", "must not be before start_date");
        }

        let status = match non_blank(input.status.as_deref()) {
            Some(raw) => match EventStatus::try_from(raw) {
                Ok(status) => status,
                Err(()) => {
                    errors.add("status", "must be one of draft, published, cancelled");
                    EventStatus::Draft
                }
            },
            None => EventStatus::Draft,
        };

        let metadata = parse_metadata_value(&mut errors, input.metadata.as_deref());

        if let Some(file) = input.featured_image.as_ref()
            && let Err(reason) = FileRule::image().check(&file.filename, &file.content_type, file.size())
        {
            errors.add("featured_image", reason);
        }
        for (index, file) in input.gallery_images.iter().enumerate() {
            if let Err(reason) =
                FileRule::image().check(&file.filename, &file.content_type, file.size())
            {
                errors.add(&format!("gallery_images.{index}"), reason);
            }
        }

        errors.into_result().map_err(AppError::validation)?;

        let featured_image = match input.featured_image {
            Some(file) => Some(self.store_image(FEATURED_PREFIX, &file).await?),
            None => None,
        };

        let event = self
            .repo
            .create_event(NewEvent {
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                short_description: non_blank(input.short_description.as_deref())
                    .map(str::to_string),
                start_date: start_date.expect("validated above"),
                end_date,
                location: non_blank(input.location.as_deref()).map(str::to_string),
                status,
                featured_image,
                metadata,
            })
            .await?;

        let mut gallery = Vec::with_capacity(input.gallery_images.len());
        for (index, file) in input.gallery_images.iter().enumerate() {
            let image_path = self.store_image(GALLERY_PREFIX, file).await?;
            let record = self
                .repo
                .add_gallery_image(NewGalleryImage {
                    event_id: event.id,
                    image_path,
                    alt_text: input
                        .gallery_alt_texts
                        .get(index)
                        .cloned()
                        .flatten(),
                    sort_order: index as i32,
                })
                .await?;
            gallery.push(record);
        }

        self.cache.invalidate_family(Family::Events);
        info!(target = "lanterna::events", event_id = event.id, "event created");

        Ok(EventWithGallery { event, gallery })
    }

    pub async fn update(&self, id: i64, input: EventInput) -> Result<EventWithGallery, AppError> {
        let existing = self.repo.find_event(id).await?.ok_or(AppError::NotFound)?;

        let mut errors = FieldErrors::new();
        let mut patch = EventPatch::default();

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
        if let Some(short) = input.short_description.as_deref() {
            patch.short_description = Some(short.trim().to_string());
        }
        if let Some(raw) = non_blank(input.start_date.as_deref()) {
            match parse_flexible_datetime(raw) {
                Some(value) => patch.start_date = Some(value),
                None => errors.add("start_date", "must be a valid date"),
            }
        }
        if let Some(raw) = input.end_date.as_deref() {
            match non_blank(Some(raw)) {
                Some(value) => match parse_flexible_datetime(value) {
                    Some(parsed) => patch.end_date = Some(Some(parsed)),
                    None => errors.add("end_date", "must be a valid date"),
                },
                None => patch.end_date = Some(None),
            }
        }
        if let Some(location) = input.location.as_deref() {
            patch.location = Some(location.trim().to_string());
        }
        if let Some(raw) = non_blank(input.status.as_deref()) {
            match EventStatus::try_from(raw) {
                Ok(status) => patch.status = Some(status),
                Err(()) => errors.add("status", "must be one of draft, published, cancelled"),
            }
        }
        if input.metadata.is_some() {
            patch.metadata = Some(parse_metadata_value(&mut errors, input.metadata.as_deref()));
        }

        let effective_start = patch.start_date.unwrap_or(existing.start_date);
        let effective_end = match patch.end_date {
            Some(value) => value,
            None => existing.end_date,
        };
        if let Some(end) = effective_end
            && end < effective_start
        {
            errors.add("end_date", "must not be before start_date");
        }

        if let Some(file) = input.featured_image.as_ref()
            && let Err(reason) = FileRule::image().check(&file.filename, &file.content_type, file.size())
        {
            errors.add("featured_image", reason);
        }

        errors.into_result().map_err(AppError::validation)?;

        if let Some(file) = input.featured_image {
            let stored = self.store_image(FEATURED_PREFIX, &file).await?;
            if let Some(previous) = existing.featured_image.as_deref() {
                self.blobs.delete_quietly(previous).await;
            }
            patch.featured_image = Some(Some(stored));
        }

        let event = self.repo.update_event(id, patch).await?;
        let gallery = self.repo.list_galleries(&[event.id]).await?;

        self.cache.invalidate_family(Family::Events);

        Ok(EventWithGallery { event, gallery })
    }

    pub async fn update_status(
        &self,
        id: i64,
        raw_status: Option<&str>,
    ) -> Result<(EventWithGallery, StatusChange), AppError> {
        let status = match non_blank(raw_status) {
            Some(raw) => EventStatus::try_from(raw).map_err(|()| {
                AppError::validation_message("status", "must be one of draft, published, cancelled")
            })?,
            None => return Err(AppError::validation_message("status", "is required")),
        };

        let existing = self.repo.find_event(id).await?.ok_or(AppError::NotFound)?;
        let previous_status = existing.status;

        let event = self
            .repo
            .update_event(
                id,
                EventPatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        let gallery = self.repo.list_galleries(&[event.id]).await?;

        self.cache.invalidate_family(Family::Events);

        Ok((
            EventWithGallery { event, gallery },
            StatusChange {
                previous_status,
                status,
            },
        ))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let existing = self.repo.find_event(id).await?.ok_or(AppError::NotFound)?;
        let gallery = self.repo.list_galleries(&[existing.id]).await?;

        if let Some(path) = existing.featured_image.as_deref() {
            self.blobs.delete_quietly(path).await;
        }
        for image in &gallery {
            self.blobs.delete_quietly(&image.image_path).await;
        }

        self.repo.delete_event(id).await?;
        self.cache.invalidate_family(Family::Events);
        info!(target = "lanterna::events", event_id = id, "event deleted");

        Ok(())
    }

    pub async fn add_gallery_image(
        &self,
        event_id: i64,
        file: UploadedFile,
        alt_text: Option<String>,
    ) -> Result<EventGalleryRecord, AppError> {
        self.repo
            .find_event(event_id)
            .await?
            .ok_or(AppError::NotFound)?;

        FileRule::image()
            .check(&file.filename, &file.content_type, file.size())
            .map_err(|reason| AppError::validation_message("image", reason))?;

        let image_path = self.store_image(GALLERY_PREFIX, &file).await?;
        let sort_order = self.repo.next_gallery_sort_order(event_id).await?;

        let record = self
            .repo
            .add_gallery_image(NewGalleryImage {
                event_id,
                image_path,
                alt_text: alt_text.and_then(|v| non_blank(Some(&v)).map(str::to_string)),
                sort_order,
            })
            .await?;

        self.cache.invalidate_family(Family::Events);

        Ok(record)
    }

    pub async fn remove_gallery_image(
        &self,
        event_id: i64,
        gallery_id: i64,
    ) -> Result<(), AppError> {
        let image = self
            .repo
            .find_gallery_image(event_id, gallery_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.blobs.delete_quietly(&image.image_path).await;
        self.repo.delete_gallery_image(image.id).await?;
        self.cache.invalidate_family(Family::Events);

        Ok(())
    }

    async fn store_image(&self, prefix: &str, file: &UploadedFile) -> Result<String, AppError> {
        let stored = self
            .blobs
            .store(prefix, &file.filename, file.data.clone())
            .await
            .map_err(|err| AppError::unexpected(format!("failed to store image: {err}")))?;
        Ok(stored.stored_path)
    }

    async fn attach_galleries(
        &self,
        page: Page<EventRecord>,
    ) -> Result<Page<EventWithGallery>, AppError> {
        let ids: Vec<i64> = page.items.iter().map(|event| event.id).collect();
        let mut by_event: HashMap<i64, Vec<EventGalleryRecord>> = HashMap::new();
        if !ids.is_empty() {
            for image in self.repo.list_galleries(&ids).await? {
                by_event.entry(image.event_id).or_default().push(image);
            }
        }

        Ok(page.map(|event| {
            let gallery = by_event.remove(&event.id).unwrap_or_default();
            EventWithGallery { event, gallery }
        }))
    }
}

fn require_text(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    match non_blank(value) {
        Some(text) => Some(text.to_string()),
        None => {
            errors.add(field, "is required");
            None
        }
    }
}

/// Parse an optional JSON-object metadata field, defaulting to `{}`.
pub(crate) fn parse_metadata_value(errors: &mut FieldErrors, raw: Option<&str>) -> JsonValue {
    match non_blank(raw) {
        Some(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(value @ JsonValue::Object(_)) => value,
            Ok(_) => {
                errors.add("metadata", "must be a JSON object");
                JsonValue::Object(Default::default())
            }
            Err(_) => {
                errors.add("metadata", "must be valid JSON");
                JsonValue::Object(Default::default())
            }
        },
        None => JsonValue::Object(Default::default()),
    }
}
