//! Held-policy list - the products a participant says they already own,
//! stored as one JSONB array per user.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Reference to one owned product: its stable key plus the category needed
/// to look it up again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRef {
    pub product_id: i64,
    pub product_type: String,
}

/// Outcome of an add: rejected when the same product is already listed.
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
}

#[derive(Clone)]
pub struct PolicyService {
    pool: PgPool,
}

impl PolicyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<Vec<PolicyRef>>> {
        let row: Option<Json<Vec<PolicyRef>>> =
            sqlx::query_scalar("SELECT insurance_list FROM insurance_list WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(list)| list))
    }

    async fn store(&self, user_id: Uuid, list: &[PolicyRef]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO insurance_list (user_id, insurance_list) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET insurance_list = EXCLUDED.insurance_list
            "#,
        )
        .bind(user_id)
        .bind(Json(list))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The user's list; a first read creates an empty row so later writes
    /// always have one to update.
    pub async fn get(&self, user_id: Uuid) -> Result<Vec<PolicyRef>> {
        if let Some(list) = self.load(user_id).await? {
            return Ok(list);
        }
        self.store(user_id, &[]).await?;
        Ok(Vec::new())
    }

    /// Append one product unless it is already listed.
    pub async fn add(&self, user_id: Uuid, entry: PolicyRef) -> Result<AddOutcome> {
        let mut list = self.get(user_id).await?;
        if list.contains(&entry) {
            return Ok(AddOutcome::Duplicate);
        }
        list.push(entry);
        self.store(user_id, &list).await?;
        Ok(AddOutcome::Added)
    }

    /// Replace the whole list.
    pub async fn replace(&self, user_id: Uuid, list: Vec<PolicyRef>) -> Result<()> {
        self.store(user_id, &list).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_refs_compare_on_both_fields() {
        let a = PolicyRef {
            product_id: 3,
            product_type: "term_life".into(),
        };
        let same = PolicyRef {
            product_id: 3,
            product_type: "term_life".into(),
        };
        let other_category = PolicyRef {
            product_id: 3,
            product_type: "whole_life".into(),
        };
        assert_eq!(a, same);
        assert_ne!(a, other_category);
    }

    #[test]
    fn policy_refs_round_trip_through_json() {
        let list = vec![
            PolicyRef {
                product_id: 1,
                product_type: "term_life".into(),
            },
            PolicyRef {
                product_id: 9,
                product_type: "critical_illness".into(),
            },
        ];
        let value = serde_json::to_value(&list).unwrap();
        let back: Vec<PolicyRef> = serde_json::from_value(value).unwrap();
        assert_eq!(back, list);
    }
}
