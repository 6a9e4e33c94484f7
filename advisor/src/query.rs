//! Query executor - assembles and runs the COUNT/SELECT pair for one search
//! request.
//!
//! Rows come back as `row_to_json(t)` so the executor never needs to know the
//! column set at compile time; serde_json's preserve_order keeps the storage
//! engine's column order intact for the translator.
//!
//! Identifiers (table, sort column) are interpolated only after validation
//! against the catalog; every literal value rides a bound parameter.

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::warn;

use crate::catalog::{is_safe_identifier, FieldDescriptor, TableId};
use crate::error::Result;
use crate::filter::{BindValue, CompiledFilters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// `asc` selects ascending; anything else falls back to descending,
    /// matching the tolerant endpoint contract.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Page selection. `page >= 1` and `1 <= limit <= 100` are enforced at the
/// request boundary before this type is built.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn offset(self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// `max(1, ceil(total / limit))` - never zero pages, the UI paginates on it.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + limit - 1) / limit
    }
}

fn build_count_sql(table: &TableId, filters: &CompiledFilters) -> String {
    format!("SELECT COUNT(*) FROM {table}{}", filters.where_sql())
}

fn build_fetch_sql(
    table: &TableId,
    filters: &CompiledFilters,
    sort: Option<(&str, SortDirection)>,
) -> String {
    let where_sql = filters.where_sql();
    let order_sql = match sort {
        Some((field, direction)) => format!(" ORDER BY {field} {}", direction.as_sql()),
        None => String::new(),
    };
    let limit_ph = filters.binds.len() + 1;
    let offset_ph = filters.binds.len() + 2;
    format!(
        "SELECT row_to_json(t) FROM (SELECT * FROM {table}{where_sql}{order_sql} LIMIT ${limit_ph} OFFSET ${offset_ph}) t"
    )
}

/// Read path into the storage engine. One count plus one fetch per request;
/// connections are short-lived pool acquisitions released on every exit path.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: PgPool,
}

impl QueryExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self, table: &TableId, filters: &CompiledFilters) -> Result<i64> {
        let sql = build_count_sql(table, filters);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in &filters.binds {
            query = match bind {
                BindValue::Number(n) => query.bind(*n),
                BindValue::Text(s) => query.bind(s.clone()),
                BindValue::Bool(b) => query.bind(*b),
            };
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    /// Fetch one page of rows as JSON objects.
    ///
    /// A sort field that is not in the category's field set is dropped (the
    /// storage engine's natural order applies), never an error - the
    /// endpoint stays tolerant of stray parameters.
    pub async fn fetch(
        &self,
        table: &TableId,
        filters: &CompiledFilters,
        sort_by: Option<&str>,
        direction: SortDirection,
        page: Pagination,
        fields: &[FieldDescriptor],
    ) -> Result<Vec<JsonValue>> {
        let sort = sort_by.and_then(|s| {
            let known = fields.iter().any(|f| f.name == s) && is_safe_identifier(s);
            if !known {
                warn!(sort_by = s, "dropping unknown sort field");
            }
            known.then_some((s, direction))
        });

        let sql = build_fetch_sql(table, filters, sort);
        let mut query = sqlx::query_scalar::<_, JsonValue>(&sql);
        for bind in &filters.binds {
            query = match bind {
                BindValue::Number(n) => query.bind(*n),
                BindValue::Text(s) => query.bind(s.clone()),
                BindValue::Bool(b) => query.bind(*b),
            };
        }
        query = query.bind(page.limit).bind(page.offset());
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Single row looked up by an integer key column (product detail).
    pub async fn fetch_by_key(
        &self,
        table: &TableId,
        key_column: &str,
        key: i64,
    ) -> Result<Option<JsonValue>> {
        if !is_safe_identifier(key_column) {
            warn!(key_column, "rejected unsafe key column");
            return Ok(None);
        }
        let sql = format!(
            "SELECT row_to_json(t) FROM (SELECT * FROM {table} WHERE {key_column} = $1) t"
        );
        Ok(sqlx::query_scalar::<_, JsonValue>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// First row whose key column fuzzily matches the term (reference data
    /// lookups keyed by city/province names).
    pub async fn fetch_by_fuzzy_key(
        &self,
        table: &TableId,
        key_column: &str,
        term: &str,
    ) -> Result<Option<JsonValue>> {
        if !is_safe_identifier(key_column) {
            warn!(key_column, "rejected unsafe key column");
            return Ok(None);
        }
        let sql = format!(
            "SELECT row_to_json(t) FROM (SELECT * FROM {table} WHERE CAST({key_column} AS TEXT) ILIKE $1 LIMIT 1) t"
        );
        Ok(sqlx::query_scalar::<_, JsonValue>(&sql)
            .bind(format!("%{term}%"))
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{compile, FilterValue};
    use proptest::prelude::*;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor {
                name: "premium".into(),
                data_type: "numeric".into(),
                description: "premium".into(),
            },
            FieldDescriptor {
                name: "product_name".into(),
                data_type: "text".into(),
                description: "product_name".into(),
            },
        ]
    }

    fn table() -> TableId {
        // Tests build the id the same way the catalog would.
        let catalog_name = "insurance_products_term_life";
        assert!(is_safe_identifier(catalog_name));
        TableId(catalog_name.to_string())
    }

    #[test]
    fn count_sql_without_filters() {
        let sql = build_count_sql(&table(), &CompiledFilters::default());
        assert_eq!(sql, "SELECT COUNT(*) FROM insurance_products_term_life");
    }

    #[test]
    fn fetch_sql_with_filters_and_sort() {
        let params = vec![(
            "premium".to_string(),
            FilterValue::Text(">=100".to_string()),
        )];
        let compiled = compile(&params, &fields()).unwrap();
        let sql = build_fetch_sql(&table(), &compiled, Some(("premium", SortDirection::Asc)));
        assert_eq!(
            sql,
            "SELECT row_to_json(t) FROM (SELECT * FROM insurance_products_term_life \
             WHERE CAST(premium AS NUMERIC) >= $1 ORDER BY premium ASC LIMIT $2 OFFSET $3) t"
        );
    }

    #[test]
    fn fetch_sql_natural_order_without_sort() {
        let sql = build_fetch_sql(&table(), &CompiledFilters::default(), None);
        assert_eq!(
            sql,
            "SELECT row_to_json(t) FROM (SELECT * FROM insurance_products_term_life LIMIT $1 OFFSET $2) t"
        );
    }

    #[test]
    fn pagination_offset() {
        assert_eq!(Pagination { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(Pagination { page: 3, limit: 10 }.offset(), 20);
        assert_eq!(Pagination { page: 2, limit: 7 }.offset(), 7);
    }

    #[test]
    fn total_pages_floors_to_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(95, 10), 10);
    }

    #[test]
    fn sort_direction_parse_is_tolerant() {
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Desc);
    }

    proptest! {
        #[test]
        fn total_pages_matches_ceiling(total in 0i64..1_000_000, limit in 1i64..100) {
            let expected = std::cmp::max(1, (total as f64 / limit as f64).ceil() as i64);
            prop_assert_eq!(total_pages(total, limit), expected);
        }
    }
}
