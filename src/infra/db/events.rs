use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::pagination::{OffsetPage, Page},
    application::repos::{
        EventFilter, EventPatch, EventsRepo, ListScope, NewEvent, NewGalleryImage, RepoError,
    },
    domain::{
        entities::{EventGalleryRecord, EventRecord},
        types::EventStatus,
    },
};

use super::{PgRepositories, map_sqlx_error};

const EVENT_COLUMNS: &str = "id, title, description, short_description, start_date, end_date, \
     location, status, featured_image, metadata, created_at, updated_at";

const GALLERY_COLUMNS: &str =
    "id, event_id, image_path, alt_text, sort_order, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: String,
    short_description: Option<String>,
    start_date: OffsetDateTime,
    end_date: Option<OffsetDateTime>,
    location: Option<String>,
    status: EventStatus,
    featured_image: Option<String>,
    metadata: JsonValue,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            short_description: row.short_description,
            start_date: row.start_date,
            end_date: row.end_date,
            location: row.location,
            status: row.status,
            featured_image: row.featured_image,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GalleryRow {
    id: i64,
    event_id: i64,
    image_path: String,
    alt_text: Option<String>,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<GalleryRow> for EventGalleryRecord {
    fn from(row: GalleryRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            image_path: row.image_path,
            alt_text: row.alt_text,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q EventFilter) {
    match &filter.scope {
        ListScope::Public => {
            qb.push(" AND status = ");
            qb.push_bind(EventStatus::Published);
        }
        ListScope::Admin { status } => {
            if let Some(status) = status {
                qb.push(" AND status = ");
                qb.push_bind(*status);
            }
        }
    }

    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (");
        qb.push("title ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR description ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR location ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(")");
    }
}

#[async_trait]
impl EventsRepo for PgRepositories {
    async fn list_events(
        &self,
        filter: &EventFilter,
        page: OffsetPage,
    ) -> Result<Page<EventRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1=1 "));
        apply_filter(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {} {}, id {}",
            filter.sort_by.column(),
            filter.sort_order.as_sql(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<EventRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM events WHERE 1=1 ");
        apply_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(EventRecord::from).collect();
        Ok(Page::new(records, page, Self::convert_count(total)?))
    }

    async fn find_event(&self, id: i64) -> Result<Option<EventRecord>, RepoError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(EventRecord::from))
    }

    async fn create_event(&self, params: NewEvent) -> Result<EventRecord, RepoError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events (title, description, short_description, start_date, end_date, \
             location, status, featured_image, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(params.title)
        .bind(params.description)
        .bind(params.short_description)
        .bind(params.start_date)
        .bind(params.end_date)
        .bind(params.location)
        .bind(params.status)
        .bind(params.featured_image)
        .bind(params.metadata)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(EventRecord::from(row))
    }

    async fn update_event(&self, id: i64, patch: EventPatch) -> Result<EventRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE events SET updated_at = now()");

        if let Some(title) = patch.title {
            qb.push(", title = ");
            qb.push_bind(title);
        }
        if let Some(description) = patch.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(short_description) = patch.short_description {
            qb.push(", short_description = ");
            qb.push_bind(short_description);
        }
        if let Some(start_date) = patch.start_date {
            qb.push(", start_date = ");
            qb.push_bind(start_date);
        }
        if let Some(end_date) = patch.end_date {
            qb.push(", end_date = ");
            qb.push_bind(end_date);
        }
        if let Some(location) = patch.location {
            qb.push(", location = ");
            qb.push_bind(location);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(featured_image) = patch.featured_image {
            qb.push(", featured_image = ");
            qb.push_bind(featured_image);
        }
        if let Some(metadata) = patch.metadata {
            qb.push(", metadata = ");
            qb.push_bind(metadata);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {EVENT_COLUMNS}"));

        let row = qb
            .build_query_as::<EventRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(EventRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_event(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_galleries(
        &self,
        event_ids: &[i64],
    ) -> Result<Vec<EventGalleryRecord>, RepoError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GalleryRow>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM event_galleries \
             WHERE event_id = ANY($1) \
             ORDER BY event_id, sort_order, id"
        ))
        .bind(event_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EventGalleryRecord::from).collect())
    }

    async fn add_gallery_image(
        &self,
        params: NewGalleryImage,
    ) -> Result<EventGalleryRecord, RepoError> {
        let row = sqlx::query_as::<_, GalleryRow>(&format!(
            "INSERT INTO event_galleries (event_id, image_path, alt_text, sort_order) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {GALLERY_COLUMNS}"
        ))
        .bind(params.event_id)
        .bind(params.image_path)
        .bind(params.alt_text)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(EventGalleryRecord::from(row))
    }

    async fn find_gallery_image(
        &self,
        event_id: i64,
        gallery_id: i64,
    ) -> Result<Option<EventGalleryRecord>, RepoError> {
        let row = sqlx::query_as::<_, GalleryRow>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM event_galleries WHERE id = $1 AND event_id = $2"
        ))
        .bind(gallery_id)
        .bind(event_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(EventGalleryRecord::from))
    }

    async fn delete_gallery_image(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM event_galleries WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn next_gallery_sort_order(&self, event_id: i64) -> Result<i32, RepoError> {
        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM event_galleries WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(next)
    }
}
