use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::pagination::{OffsetPage, Page},
    application::repos::{JournalFilter, JournalPatch, JournalsRepo, ListScope, NewJournal, RepoError},
    domain::{entities::JournalRecord, types::JournalStatus},
};

use super::{PgRepositories, map_sqlx_error};

const JOURNAL_COLUMNS: &str = "id, title, content, excerpt, category, publication_date, \
     description, journal_pdf, cover_image, featured_image, status, published_at, metadata, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct JournalRow {
    id: i64,
    title: String,
    content: Option<String>,
    excerpt: Option<String>,
    category: Option<String>,
    publication_date: Option<String>,
    description: String,
    journal_pdf: Option<String>,
    cover_image: Option<String>,
    featured_image: Option<String>,
    status: JournalStatus,
    published_at: Option<OffsetDateTime>,
    metadata: JsonValue,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<JournalRow> for JournalRecord {
    fn from(row: JournalRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            category: row.category,
            publication_date: row.publication_date,
            description: row.description,
            journal_pdf: row.journal_pdf,
            cover_image: row.cover_image,
            featured_image: row.featured_image,
            status: row.status,
            published_at: row.published_at,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q JournalFilter) {
    match &filter.scope {
        ListScope::Public => {
            qb.push(" AND status = ");
            qb.push_bind(JournalStatus::Published);
        }
        ListScope::Admin { status } => {
            if let Some(status) = status {
                qb.push(" AND status = ");
                qb.push_bind(*status);
            }
        }
    }

    if let Some(category) = filter.category.as_ref() {
        qb.push(" AND category = ");
        qb.push_bind(category.clone());
    }

    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (");
        qb.push("title ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR content ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR description ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR category ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(")");
    }
}

#[async_trait]
impl JournalsRepo for PgRepositories {
    async fn list_journals(
        &self,
        filter: &JournalFilter,
        page: OffsetPage,
    ) -> Result<Page<JournalRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {JOURNAL_COLUMNS} FROM journals WHERE 1=1 "));
        apply_filter(&mut qb, filter);
        // NULLS LAST keeps never-published drafts at the tail of admin views.
        qb.push(format!(
            " ORDER BY {} {} NULLS LAST, id {}",
            filter.sort_by.column(),
            filter.sort_order.as_sql(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<JournalRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM journals WHERE 1=1 ");
        apply_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(JournalRecord::from).collect();
        Ok(Page::new(records, page, Self::convert_count(total)?))
    }

    async fn find_journal(&self, id: i64) -> Result<Option<JournalRecord>, RepoError> {
        let row = sqlx::query_as::<_, JournalRow>(&format!(
            "SELECT {JOURNAL_COLUMNS} FROM journals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(JournalRecord::from))
    }

    async fn create_journal(&self, params: NewJournal) -> Result<JournalRecord, RepoError> {
        let row = sqlx::query_as::<_, JournalRow>(&format!(
            "INSERT INTO journals (title, content, excerpt, category, publication_date, \
             description, journal_pdf, cover_image, featured_image, status, published_at, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {JOURNAL_COLUMNS}"
        ))
        .bind(params.title)
        .bind(params.content)
        .bind(params.excerpt)
        .bind(params.category)
        .bind(params.publication_date)
        .bind(params.description)
        .bind(params.journal_pdf)
        .bind(params.cover_image)
        .bind(params.featured_image)
        .bind(params.status)
        .bind(params.published_at)
        .bind(params.metadata)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(JournalRecord::from(row))
    }

    async fn update_journal(
        &self,
        id: i64,
        patch: JournalPatch,
    ) -> Result<JournalRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE journals SET updated_at = now()");

        if let Some(title) = patch.title {
            qb.push(", title = ");
            qb.push_bind(title);
        }
        if let Some(content) = patch.content {
            qb.push(", content = ");
            qb.push_bind(content);
        }
        if let Some(excerpt) = patch.excerpt {
            qb.push(", excerpt = ");
            qb.push_bind(excerpt);
        }
        if let Some(category) = patch.category {
            qb.push(", category = ");
            qb.push_bind(category);
        }
        if let Some(publication_date) = patch.publication_date {
            qb.push(", publication_date = ");
            qb.push_bind(publication_date);
        }
        if let Some(description) = patch.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(journal_pdf) = patch.journal_pdf {
            qb.push(", journal_pdf = ");
            qb.push_bind(journal_pdf);
        }
        if let Some(cover_image) = patch.cover_image {
            qb.push(", cover_image = ");
            qb.push_bind(cover_image);
        }
        if let Some(featured_image) = patch.featured_image {
            qb.push(", featured_image = ");
            qb.push_bind(featured_image);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(published_at) = patch.published_at {
            qb.push(", published_at = ");
            qb.push_bind(published_at);
        }
        if let Some(metadata) = patch.metadata {
            qb.push(", metadata = ");
            qb.push_bind(metadata);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {JOURNAL_COLUMNS}"));

        let row = qb
            .build_query_as::<JournalRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(JournalRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_journal(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM journals WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
