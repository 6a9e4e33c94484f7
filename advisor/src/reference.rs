//! Reference-data lookups: regional basic-medical and social-pension
//! parameters, served off fixed tables through the same metadata and
//! translation path the product engine uses.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::catalog::SchemaCatalog;
use crate::error::Result;
use crate::query::QueryExecutor;
use crate::translate::translate_rows;

const MEDICAL_TABLE: &str = "basic_medical_insurance";
const MEDICAL_KEY: &str = "city";

const PENSION_TABLE: &str = "social_pension_insurance";
const PENSION_KEY: &str = "province_code";

/// The synthetic row key excluded from reference-table field sets.
const ID_COLUMN: &str = "id";

#[derive(Clone)]
pub struct ReferenceService {
    catalog: SchemaCatalog,
    executor: QueryExecutor,
}

impl ReferenceService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: SchemaCatalog::new(pool.clone()),
            executor: QueryExecutor::new(pool),
        }
    }

    /// Basic-medical parameters for a city, matched by substring.
    pub async fn medical_info(&self, city: &str) -> Result<Option<JsonValue>> {
        self.lookup(MEDICAL_TABLE, MEDICAL_KEY, city).await
    }

    /// Social-pension parameters for a province code, matched by substring.
    pub async fn pension_info(&self, province_code: &str) -> Result<Option<JsonValue>> {
        self.lookup(PENSION_TABLE, PENSION_KEY, province_code).await
    }

    async fn lookup(&self, table: &str, key_column: &str, term: &str) -> Result<Option<JsonValue>> {
        let Some(table) = self.catalog.resolve_exact(table).await? else {
            return Ok(None);
        };
        let Some(row) = self
            .executor
            .fetch_by_fuzzy_key(&table, key_column, term)
            .await?
        else {
            return Ok(None);
        };

        let fields = self.catalog.fields_for_table(table.as_str(), ID_COLUMN).await?;
        let mut translated = translate_rows(&[row], &fields, None);
        Ok(translated.pop())
    }
}
