//! Product search facade - wires catalog, filter compiler, executor and
//! translator into the operations the insurance endpoints expose.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::catalog::{FieldDescriptor, SchemaCatalog, PRODUCT_ID_COLUMN};
use crate::error::Result;
use crate::filter::{self, FilterValue};
use crate::query::{total_pages, Pagination, QueryExecutor, SortDirection};
use crate::translate::translate_rows;

/// One search call, as assembled by the request boundary.
///
/// `page >= 1` and `1 <= limit <= 100` are the boundary's responsibility;
/// `filters` holds every query parameter that wasn't a control key, in
/// request order - unknown names are dropped during compilation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub product_type: String,
    pub page: i64,
    pub limit: i64,
    pub sort_by: Option<String>,
    pub sort_order: SortDirection,
    pub filters: Vec<(String, FilterValue)>,
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub pages: i64,
    pub products: Vec<JsonValue>,
}

#[derive(Clone)]
pub struct ProductService {
    catalog: SchemaCatalog,
    executor: QueryExecutor,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: SchemaCatalog::new(pool.clone()),
            executor: QueryExecutor::new(pool),
        }
    }

    /// Category tokens of all live product tables.
    pub async fn product_types(&self) -> Result<Vec<String>> {
        self.catalog.list_categories().await
    }

    /// Filterable fields of one category; empty means unknown category.
    pub async fn product_fields(&self, product_type: &str) -> Vec<FieldDescriptor> {
        self.catalog.list_fields(product_type).await
    }

    /// Run one paginated, filtered, sorted search.
    ///
    /// An unknown category yields an empty page-1 result rather than an
    /// error; the fields endpoint is the channel that reports 404 for the
    /// same condition.
    pub async fn search(&self, req: &SearchRequest) -> Result<SearchOutcome> {
        let fields = self.catalog.list_fields(&req.product_type).await;
        if fields.is_empty() {
            return Ok(SearchOutcome {
                pages: 1,
                products: Vec::new(),
            });
        }
        let Some(table) = self.catalog.resolve_table(&req.product_type).await? else {
            return Ok(SearchOutcome {
                pages: 1,
                products: Vec::new(),
            });
        };

        let params = filter::fold_range_params(req.filters.clone(), &fields);
        let compiled = filter::compile(&params, &fields)?;

        let total = self.executor.count(&table, &compiled).await?;
        let pages = total_pages(total, req.limit);

        let rows = self
            .executor
            .fetch(
                &table,
                &compiled,
                req.sort_by.as_deref(),
                req.sort_order,
                Pagination {
                    page: req.page,
                    limit: req.limit,
                },
                &fields,
            )
            .await?;

        Ok(SearchOutcome {
            pages,
            products: translate_rows(&rows, &fields, Some(PRODUCT_ID_COLUMN)),
        })
    }

    /// Fully translated single-record detail, with the category token merged
    /// in for the caller's convenience.
    pub async fn product_info(
        &self,
        product_type: &str,
        product_id: i64,
    ) -> Result<Option<JsonValue>> {
        let Some(table) = self.catalog.resolve_table(product_type).await? else {
            return Ok(None);
        };
        let fields = self.catalog.list_fields(product_type).await;

        let Some(row) = self
            .executor
            .fetch_by_key(&table, PRODUCT_ID_COLUMN, product_id)
            .await?
        else {
            return Ok(None);
        };

        let mut translated = translate_rows(&[row], &fields, Some(PRODUCT_ID_COLUMN));
        let Some(JsonValue::Object(mut detail)) = translated.pop() else {
            return Ok(None);
        };
        detail.insert(
            "product_type".to_string(),
            JsonValue::String(product_type.to_string()),
        );
        Ok(Some(JsonValue::Object(detail)))
    }
}
