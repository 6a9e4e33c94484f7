//! A/B experiment assignment and progress tracking.
//!
//! Each participant carries a 5-character binary group code; each position
//! toggles one condition dimension. Codes are assigned uniformly at random
//! at registration and parsed leniently ever after - a malformed code reads
//! as the all-off control condition, never an error.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

pub const GROUP_CODE_LEN: usize = 5;

const DEFAULT_GROUP_CODE: &str = "00000";

/// Per-dimension condition toggles decoded from a group code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupConfig {
    pub show_algorithm_declaration: bool,
    pub show_interest_declaration: bool,
    pub show_privacy_declaration: bool,
    pub show_data_control: bool,
    pub has_guided_questions: bool,
}

impl GroupConfig {
    /// Decode a group code. Anything that is not exactly five ASCII
    /// characters falls back to the all-off default; positions other than
    /// `'1'` read as off.
    pub fn parse(code: &str) -> Self {
        let bytes = code.as_bytes();
        if bytes.len() != GROUP_CODE_LEN {
            return Self::default();
        }
        Self {
            show_algorithm_declaration: bytes[0] == b'1',
            show_interest_declaration: bytes[1] == b'1',
            show_privacy_declaration: bytes[2] == b'1',
            show_data_control: bytes[3] == b'1',
            has_guided_questions: bytes[4] == b'1',
        }
    }
}

/// Draw a uniformly random 5-bit group code.
pub fn random_group_code() -> String {
    let mut rng = rand::thread_rng();
    (0..GROUP_CODE_LEN)
        .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
        .collect()
}

/// Full experiment state for one participant.
#[derive(Debug, Serialize)]
pub struct ExperimentInfo {
    pub experiment_id: String,
    pub group_code: String,
    #[serde(flatten)]
    pub config: GroupConfig,
    pub chatbot_api_key: String,
    pub completed_pre_survey: bool,
    pub completed_declaration: bool,
    pub completed_conversation: bool,
    pub completed_post_survey: bool,
}

/// Partial progress update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ProgressUpdate {
    pub completed_pre_survey: Option<bool>,
    pub completed_declaration: Option<bool>,
    pub completed_conversation: Option<bool>,
    pub completed_post_survey: Option<bool>,
}

/// Progress snapshot returned after an update.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProgressSnapshot {
    pub completed_pre_survey: bool,
    pub completed_declaration: bool,
    pub completed_conversation: bool,
    pub completed_post_survey: bool,
}

#[derive(Clone)]
pub struct ExperimentService {
    pool: PgPool,
    chatbot_with_guide: String,
    chatbot_without_guide: String,
}

impl ExperimentService {
    pub fn new(pool: PgPool, chatbot_with_guide: String, chatbot_without_guide: String) -> Self {
        Self {
            pool,
            chatbot_with_guide,
            chatbot_without_guide,
        }
    }

    /// Experiment info for one participant; `None` when the user is unknown.
    pub async fn info(&self, user_id: Uuid) -> Result<Option<ExperimentInfo>> {
        type UserRow = (
            Option<String>,
            Option<String>,
            Option<bool>,
            Option<bool>,
            Option<bool>,
            Option<bool>,
        );
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT experiment_id, group_code,
                   completed_pre_survey, completed_declaration,
                   completed_conversation, completed_post_survey
            FROM users WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((experiment_id, group_code, pre, decl, conv, post)) = row else {
            return Ok(None);
        };

        let group_code = group_code.unwrap_or_else(|| DEFAULT_GROUP_CODE.to_string());
        let config = GroupConfig::parse(&group_code);
        let chatbot_api_key = if config.has_guided_questions {
            self.chatbot_with_guide.clone()
        } else {
            self.chatbot_without_guide.clone()
        };

        Ok(Some(ExperimentInfo {
            experiment_id: experiment_id.unwrap_or_default(),
            group_code,
            config,
            chatbot_api_key,
            completed_pre_survey: pre.unwrap_or(false),
            completed_declaration: decl.unwrap_or(false),
            completed_conversation: conv.unwrap_or(false),
            completed_post_survey: post.unwrap_or(false),
        }))
    }

    /// Apply a partial progress update; `None` when the user is unknown.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<Option<ProgressSnapshot>> {
        let snapshot: Option<ProgressSnapshot> = sqlx::query_as(
            r#"
            UPDATE users SET
                completed_pre_survey = COALESCE($2, completed_pre_survey, FALSE),
                completed_declaration = COALESCE($3, completed_declaration, FALSE),
                completed_conversation = COALESCE($4, completed_conversation, FALSE),
                completed_post_survey = COALESCE($5, completed_post_survey, FALSE)
            WHERE user_id = $1
            RETURNING completed_pre_survey, completed_declaration,
                      completed_conversation, completed_post_survey
            "#,
        )
        .bind(user_id)
        .bind(update.completed_pre_survey)
        .bind(update.completed_declaration)
        .bind(update.completed_conversation)
        .bind(update.completed_post_survey)
        .fetch_optional(&self.pool)
        .await?;

        Ok(snapshot)
    }
}
