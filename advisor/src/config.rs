//! Environment-driven settings.
//!
//! Read once at startup (after `dotenvy::dotenv()`), then passed by value to
//! whatever needs them. No global state.

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string (required).
    pub database_url: String,
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// HMAC secret for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub access_token_expire_minutes: i64,
    /// Chatbot API key handed to participants in the guided-questions arm.
    pub chatbot_with_guide: String,
    /// Chatbot API key for the control arm.
    pub chatbot_without_guide: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = match std::env::var("ADVISOR_JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("ADVISOR_JWT_SECRET not set; using an insecure default");
                "insecure-dev-secret".to_string()
            }
        };

        let access_token_expire_minutes = std::env::var("ADVISOR_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRE_MINUTES);

        Ok(Self {
            database_url,
            bind_addr: std::env::var("ADVISOR_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            access_token_expire_minutes,
            chatbot_with_guide: std::env::var("EXPERIMENT_CHATBOT_WITH_GUIDE")
                .unwrap_or_default(),
            chatbot_without_guide: std::env::var("EXPERIMENT_CHATBOT_WITHOUT_GUIDE")
                .unwrap_or_default(),
        })
    }
}
