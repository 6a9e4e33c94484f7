//! Schema catalog - runtime resolution of product categories to physical
//! tables and their live column sets.
//!
//! Product tables follow the naming convention `insurance_products_<category>`
//! and can appear or disappear as data re-imports create and drop them, so
//! the catalog lists them from `information_schema` on every call instead of
//! keeping a static enum. Column display labels come from attached Postgres
//! column comments (`pg_description`), falling back to the raw column name.

use sqlx::PgPool;
use tracing::{error, warn};

use crate::error::Result;

/// Prefix shared by all product tables.
pub const TABLE_PREFIX: &str = "insurance_products_";

/// Internal identifier column, excluded from the filterable field set but
/// kept in query output as the stable product key.
pub const PRODUCT_ID_COLUMN: &str = "product_id";

/// Postgres caps identifiers at 63 bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A resolved physical table name, guaranteed identifier-safe.
///
/// The only way to obtain one is through [`SchemaCatalog`], which validates
/// the name before construction; this is what makes interpolating it into
/// SQL text acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId(pub(crate) String);

impl TableId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata for one column of a product table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldDescriptor {
    /// Physical column identifier.
    pub name: String,
    /// Declared SQL type as reported by `information_schema`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Display label; the raw column name when no comment is attached.
    pub description: String,
}

impl FieldDescriptor {
    pub fn is_boolean(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("boolean")
    }
}

/// Allow-list check for anything destined for SQL text interpolation.
///
/// Catalog-derived names should already satisfy this, but every identifier is
/// re-checked immediately before string formatting.
pub fn is_safe_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Uncached catalog over the storage engine's metadata views.
#[derive(Clone)]
pub struct SchemaCatalog {
    pool: PgPool,
}

impl SchemaCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the category tokens of all live product tables.
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name LIKE $1
            ORDER BY table_name
            "#,
        )
        .bind(format!("{TABLE_PREFIX}%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(tables
            .iter()
            .filter_map(|t| t.strip_prefix(TABLE_PREFIX))
            .map(str::to_string)
            .collect())
    }

    /// Resolve a category token to its physical table, if that table exists.
    pub async fn resolve_table(&self, category: &str) -> Result<Option<TableId>> {
        if !is_safe_identifier(category) {
            warn!(category, "rejected unsafe category token");
            return Ok(None);
        }
        self.resolve_exact(&format!("{TABLE_PREFIX}{category}")).await
    }

    /// Resolve a fixed, known table name (reference data tables).
    pub(crate) async fn resolve_exact(&self, table_name: &str) -> Result<Option<TableId>> {
        if !is_safe_identifier(table_name) {
            return Ok(None);
        }
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.then(|| TableId(table_name.to_string())))
    }

    /// List the field descriptors of a category's table.
    ///
    /// Returns an empty vec both when the table does not exist and when the
    /// metadata query itself fails; callers treat empty as "unknown
    /// category". Downstream code depends on this degradation, so failures
    /// are logged here and never propagated.
    pub async fn list_fields(&self, category: &str) -> Vec<FieldDescriptor> {
        if !is_safe_identifier(category) {
            warn!(category, "rejected unsafe category token");
            return Vec::new();
        }
        let table_name = format!("{TABLE_PREFIX}{category}");
        match self.fields_for_table(&table_name, PRODUCT_ID_COLUMN).await {
            Ok(fields) => {
                if fields.is_empty() {
                    warn!(table_name, "table does not exist or has no columns");
                }
                fields
            }
            Err(e) => {
                error!(table_name, error = %e, "failed to read table fields");
                Vec::new()
            }
        }
    }

    /// Column metadata for an arbitrary table, excluding one internal
    /// identifier column. Shared by the product path and the reference-data
    /// lookups.
    pub(crate) async fn fields_for_table(
        &self,
        table_name: &str,
        excluded_column: &str,
    ) -> Result<Vec<FieldDescriptor>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                c.column_name::text,
                c.data_type::text,
                pgd.description
            FROM information_schema.columns c
            LEFT JOIN pg_catalog.pg_statio_all_tables st
                ON c.table_name = st.relname
            LEFT JOIN pg_catalog.pg_description pgd
                ON pgd.objoid = st.relid
                AND pgd.objsubid = c.ordinal_position
            WHERE c.table_name = $1
            AND c.column_name <> $2
            ORDER BY c.ordinal_position
            "#,
        )
        .bind(table_name)
        .bind(excluded_column)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(name, _, _)| {
                // Columns the engine could never safely interpolate are
                // dropped from the field set outright.
                let safe = is_safe_identifier(name);
                if !safe {
                    warn!(table_name, column = %name, "skipping unsafe column name");
                }
                safe
            })
            .map(|(name, data_type, description)| {
                let description = match description {
                    Some(d) if !d.is_empty() => d,
                    _ => name.clone(),
                };
                FieldDescriptor {
                    name,
                    data_type,
                    description,
                }
            })
            .collect())
    }
}
