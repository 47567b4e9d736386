//! Bearer-token authentication.
//!
//! Two token schemes are live at once: legacy rows that store the opaque
//! token verbatim, and current rows that store only a SHA-256 digest. Both
//! are expressed as `CredentialResolver` implementations and tried in order,
//! so handlers never care which scheme authenticated the caller.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::repos::{NewAccessToken, RepoError, TokensRepo, UsersRepo};
use crate::domain::entities::UserRecord;

const TOKEN_PREFIX: &str = "lt";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid credentials")]
    Invalid,
    #[error("expired token")]
    Expired,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// The caller a valid token resolves to.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&UserRecord> for AuthPrincipal {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Which stored row authenticated the caller; needed to revoke on logout.
#[derive(Debug, Clone, Copy)]
pub enum TokenSelector {
    Legacy { token_id: i64 },
    Digest { token_id: i64 },
}

pub struct ResolvedCredential {
    pub user_id: i64,
    pub selector: TokenSelector,
}

/// Maps an opaque bearer token to a stored credential, or `None` when the
/// token does not belong to this scheme.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<ResolvedCredential>, AuthError>;
}

/// Legacy scheme: token stored verbatim in `api_tokens`.
pub struct ApiTokenResolver {
    tokens: Arc<dyn TokensRepo>,
}

impl ApiTokenResolver {
    pub fn new(tokens: Arc<dyn TokensRepo>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl CredentialResolver for ApiTokenResolver {
    async fn resolve(&self, token: &str) -> Result<Option<ResolvedCredential>, AuthError> {
        let Some(record) = self.tokens.find_api_token(token).await? else {
            return Ok(None);
        };

        if record.token.as_bytes().ct_eq(token.as_bytes()).unwrap_u8() == 0 {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        if let Some(expires_at) = record.expires_at
            && expires_at <= now
        {
            return Err(AuthError::Expired);
        }

        // best-effort last_used update; do not block auth
        let tokens = self.tokens.clone();
        let token_id = record.id;
        tokio::spawn(async move {
            if let Err(err) = tokens.touch_api_token(token_id, now).await {
                warn!(target = "lanterna::auth", error = %err, "failed to touch api token");
            }
        });

        Ok(Some(ResolvedCredential {
            user_id: record.user_id,
            selector: TokenSelector::Legacy {
                token_id: record.id,
            },
        }))
    }
}

/// Current scheme: only the SHA-256 digest of the secret is stored.
pub struct AccessTokenResolver {
    tokens: Arc<dyn TokensRepo>,
}

impl AccessTokenResolver {
    pub fn new(tokens: Arc<dyn TokensRepo>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl CredentialResolver for AccessTokenResolver {
    async fn resolve(&self, token: &str) -> Result<Option<ResolvedCredential>, AuthError> {
        let digest = hash_token(token);
        let Some(record) = self.tokens.find_access_token(&digest).await? else {
            return Ok(None);
        };

        if record.token_digest.ct_eq(&digest).unwrap_u8() == 0 {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        if let Some(expires_at) = record.expires_at
            && expires_at <= now
        {
            return Err(AuthError::Expired);
        }

        let tokens = self.tokens.clone();
        let token_id = record.id;
        tokio::spawn(async move {
            if let Err(err) = tokens.touch_access_token(token_id, now).await {
                warn!(target = "lanterna::auth", error = %err, "failed to touch access token");
            }
        });

        Ok(Some(ResolvedCredential {
            user_id: record.user_id,
            selector: TokenSelector::Digest {
                token_id: record.id,
            },
        }))
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub principal: AuthPrincipal,
}

pub struct AuthService {
    resolvers: Vec<Arc<dyn CredentialResolver>>,
    users: Arc<dyn UsersRepo>,
    tokens: Arc<dyn TokensRepo>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, tokens: Arc<dyn TokensRepo>) -> Self {
        let resolvers: Vec<Arc<dyn CredentialResolver>> = vec![
            Arc::new(AccessTokenResolver::new(tokens.clone())),
            Arc::new(ApiTokenResolver::new(tokens.clone())),
        ];
        Self {
            resolvers,
            users,
            tokens,
        }
    }

    /// Resolve a bearer token to its principal, trying each scheme in order.
    pub async fn authenticate(
        &self,
        token: &str,
    ) -> Result<(AuthPrincipal, TokenSelector), AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Missing);
        }

        for resolver in &self.resolvers {
            if let Some(resolved) = resolver.resolve(token).await? {
                let user = self
                    .users
                    .find_user(resolved.user_id)
                    .await?
                    .ok_or(AuthError::Invalid)?;
                return Ok((AuthPrincipal::from(&user), resolved.selector));
            }
        }

        Err(AuthError::Invalid)
    }

    /// Verify an email/password pair and issue a fresh access token. The
    /// plaintext token is only ever returned here.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::Invalid)?;

        verify_password(&user.password_hash, password)?;

        let token = generate_token();
        let digest = hash_token(&token);
        self.tokens
            .create_access_token(NewAccessToken {
                user_id: user.id,
                token_digest: digest,
                name: "api".to_string(),
                expires_at: None,
            })
            .await?;

        Ok(IssuedToken {
            token,
            principal: AuthPrincipal::from(&user),
        })
    }

    /// Revoke the presenting credential. Legacy rows are provisioned out of
    /// band and are left in place.
    pub async fn logout(&self, selector: TokenSelector) -> Result<(), AuthError> {
        match selector {
            TokenSelector::Digest { token_id } => {
                self.tokens.delete_access_token(token_id).await?;
                Ok(())
            }
            TokenSelector::Legacy { .. } => Ok(()),
        }
    }
}

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Invalid)
}

fn verify_password(stored_hash: &str, password: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::Invalid)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::Invalid)
}

fn generate_token() -> String {
    format!(
        "{TOKEN_PREFIX}_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_carry_prefix_and_entropy() {
        let token = generate_token();
        let secret = token.strip_prefix("lt_").expect("token prefix");
        assert!(secret.len() >= MIN_SECRET_LEN);
        assert_ne!(generate_token(), token);
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(verify_password(&hash, "correct horse").is_ok());
        assert!(verify_password(&hash, "wrong horse").is_err());
    }

    #[test]
    fn token_digest_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
