//! Participant authentication: bcrypt-hashed credentials and HS256 access
//! tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::experiment;

/// JWT payload: subject is the account name.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Signs and verifies access tokens. Cheap to clone; built once from the
/// configured secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expire_minutes: i64,
}

impl TokenSigner {
    pub fn from_secret(secret: &[u8], expire_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expire_minutes,
        }
    }

    pub fn create(&self, account: &str) -> Result<String> {
        let claims = Claims {
            sub: account.to_string(),
            exp: (Utc::now() + chrono::Duration::minutes(self.expire_minutes)).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Successful login/registration payload.
#[derive(Debug, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub user_id: Uuid,
}

impl AuthToken {
    fn bearer(access_token: String, user_id: Uuid) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user_id,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(pool: PgPool, signer: TokenSigner) -> Self {
        Self { pool, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Register a new account. The experimental condition (group code) is
    /// assigned here, uniformly at random, so every participant carries one
    /// from their first session.
    pub async fn register(&self, account: &str, password: &str) -> Result<AuthToken> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM users WHERE account = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(AdvisorError::AccountExists);
        }

        let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (user_id, account, password, experiment_id, group_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account)
        .bind(&hashed)
        .bind(Uuid::new_v4().to_string())
        .bind(experiment::random_group_code())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(%user_id, "registered new participant");
        Ok(AuthToken::bearer(self.signer.create(account)?, user_id))
    }

    pub async fn login(&self, account: &str, password: &str) -> Result<AuthToken> {
        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT user_id, password FROM users WHERE account = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await?;
        let (user_id, stored_hash) = row.ok_or(AdvisorError::InvalidCredentials)?;

        if !bcrypt::verify(password, &stored_hash)? {
            return Err(AdvisorError::InvalidCredentials);
        }
        Ok(AuthToken::bearer(self.signer.create(account)?, user_id))
    }

    pub async fn reset_password(&self, account: &str, new_password: &str) -> Result<AuthToken> {
        let user_id: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM users WHERE account = $1")
                .bind(account)
                .fetch_optional(&self.pool)
                .await?;
        let user_id = user_id.ok_or(AdvisorError::UserNotFound)?;

        let hashed = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;
        sqlx::query("UPDATE users SET password = $1 WHERE account = $2")
            .bind(&hashed)
            .bind(account)
            .execute(&self.pool)
            .await?;

        Ok(AuthToken::bearer(self.signer.create(account)?, user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let signer = TokenSigner::from_secret(b"test-secret", 30);
        let token = signer.create("alice").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::from_secret(b"test-secret", -5);
        let token = signer.create("alice").unwrap();
        assert!(matches!(
            signer.verify(&token),
            Err(AdvisorError::Token(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = TokenSigner::from_secret(b"secret-a", 30);
        let other = TokenSigner::from_secret(b"secret-b", 30);
        let token = signer.create("alice").unwrap();
        assert!(other.verify(&token).is_err());
    }
}
