use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::pagination::{OffsetPage, Page},
    application::repos::{
        ContactFilter, ContactPatch, ContactsRepo, NewContactRequest, RepoError,
    },
    domain::{entities::ContactRequestRecord, types::ContactStatus},
};

use super::{PgRepositories, map_sqlx_error};

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, status, admin_reply, \
     replied_at, metadata, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    email: String,
    subject: String,
    message: String,
    status: ContactStatus,
    admin_reply: Option<String>,
    replied_at: Option<OffsetDateTime>,
    metadata: JsonValue,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContactRow> for ContactRequestRecord {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            status: row.status,
            admin_reply: row.admin_reply,
            replied_at: row.replied_at,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q ContactFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND (");
        qb.push("name ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR email ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(" OR subject ILIKE ");
        qb.push_bind(format!("%{}%", search));
        qb.push(")");
    }
}

#[async_trait]
impl ContactsRepo for PgRepositories {
    async fn list_contact_requests(
        &self,
        filter: &ContactFilter,
        page: OffsetPage,
    ) -> Result<Page<ContactRequestRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_requests WHERE 1=1 "
        ));
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
            .build_query_as::<ContactRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM contact_requests WHERE 1=1 ");
        apply_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(ContactRequestRecord::from).collect();
        Ok(Page::new(records, page, Self::convert_count(total)?))
    }

    async fn find_contact_request(
        &self,
        id: i64,
    ) -> Result<Option<ContactRequestRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContactRequestRecord::from))
    }

    async fn create_contact_request(
        &self,
        params: NewContactRequest,
    ) -> Result<ContactRequestRecord, RepoError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "INSERT INTO contact_requests (name, email, subject, message, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(params.name)
        .bind(params.email)
        .bind(params.subject)
        .bind(params.message)
        .bind(params.metadata)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ContactRequestRecord::from(row))
    }

    async fn update_contact_request(
        &self,
        id: i64,
        patch: ContactPatch,
    ) -> Result<ContactRequestRecord, RepoError> {
        let mut qb = QueryBuilder::new("UPDATE contact_requests SET updated_at = now()");

        if let Some(status) = patch.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(admin_reply) = patch.admin_reply {
            qb.push(", admin_reply = ");
            qb.push_bind(admin_reply);
        }
        if let Some(replied_at) = patch.replied_at {
            qb.push(", replied_at = ");
            qb.push_bind(replied_at);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {CONTACT_COLUMNS}"));

        let row = qb
            .build_query_as::<ContactRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ContactRequestRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_contact_request(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM contact_requests WHERE id = $1")
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
