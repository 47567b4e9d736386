use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{NewAccessToken, RepoError, TokensRepo},
    domain::entities::{AccessTokenRecord, ApiTokenRecord},
};

use super::{PgRepositories, map_sqlx_error};

const API_TOKEN_COLUMNS: &str =
    "id, user_id, token, name, last_used_at, expires_at, created_at";

const ACCESS_TOKEN_COLUMNS: &str =
    "id, user_id, token_digest, name, last_used_at, expires_at, created_at";

#[derive(sqlx::FromRow)]
struct ApiTokenRow {
    id: i64,
    user_id: i64,
    token: String,
    name: Option<String>,
    last_used_at: Option<OffsetDateTime>,
    expires_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<ApiTokenRow> for ApiTokenRecord {
    fn from(row: ApiTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            name: row.name,
            last_used_at: row.last_used_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccessTokenRow {
    id: i64,
    user_id: i64,
    token_digest: Vec<u8>,
    name: String,
    last_used_at: Option<OffsetDateTime>,
    expires_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<AccessTokenRow> for AccessTokenRecord {
    fn from(row: AccessTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_digest: row.token_digest,
            name: row.name,
            last_used_at: row.last_used_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TokensRepo for PgRepositories {
    async fn find_api_token(&self, token: &str) -> Result<Option<ApiTokenRecord>, RepoError> {
        let row = sqlx::query_as::<_, ApiTokenRow>(&format!(
            "SELECT {API_TOKEN_COLUMNS} FROM api_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ApiTokenRecord::from))
    }

    async fn find_access_token(
        &self,
        digest: &[u8],
    ) -> Result<Option<AccessTokenRecord>, RepoError> {
        let row = sqlx::query_as::<_, AccessTokenRow>(&format!(
            "SELECT {ACCESS_TOKEN_COLUMNS} FROM access_tokens WHERE token_digest = $1"
        ))
        .bind(digest)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AccessTokenRecord::from))
    }

    async fn create_access_token(
        &self,
        params: NewAccessToken,
    ) -> Result<AccessTokenRecord, RepoError> {
        let row = sqlx::query_as::<_, AccessTokenRow>(&format!(
            "INSERT INTO access_tokens (user_id, token_digest, name, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ACCESS_TOKEN_COLUMNS}"
        ))
        .bind(params.user_id)
        .bind(params.token_digest)
        .bind(params.name)
        .bind(params.expires_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AccessTokenRecord::from(row))
    }

    async fn delete_access_token(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM access_tokens WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn touch_api_token(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE api_tokens SET last_used_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn touch_access_token(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE access_tokens SET last_used_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
