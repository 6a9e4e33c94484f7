//! Insurance product endpoints.
//!
//! These carry their status in the body (`code` field) and answer HTTP 200
//! even for unknown categories; clients of the original API read the in-body
//! code, not the transport status. One deliberate inconsistency survives:
//! `product_fields` reports an unknown category as an in-body 404 while
//! `search` answers it with an empty first page.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use advisor::filter::FilterValue;
use advisor::products::SearchRequest;
use advisor::query::SortDirection;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Query keys with reserved meaning; everything else is a filter parameter.
const CONTROL_KEYS: [&str; 6] = [
    "product_type",
    "page",
    "limit",
    "sort_by",
    "sort_order",
    "user_id",
];

pub async fn product_types(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let product_types = state.products.product_types().await?;
    Ok(Json(json!({
        "code": 200,
        "message": "success",
        "product_types": product_types,
    })))
}

#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    pub product_type: String,
}

pub async fn product_fields(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Json<Value> {
    let fields = state.products.product_fields(&query.product_type).await;
    if fields.is_empty() {
        return Json(json!({
            "code": 404,
            "message": format!("product type '{}' not found", query.product_type),
            "fields": [],
        }));
    }
    Json(json!({
        "code": 200,
        "message": "success",
        "fields": fields,
    }))
}

/// Search parameters arrive as a flat query string; pair order is preserved
/// so filters compile in request order.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    let request = parse_search_request(params)?;
    let outcome = state.products.search(&request).await?;
    Ok(Json(json!({
        "code": 200,
        "message": "success",
        "pages": outcome.pages,
        "products": outcome.products,
    })))
}

fn parse_search_request(params: Vec<(String, String)>) -> Result<SearchRequest, AppError> {
    let lookup = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let product_type = lookup("product_type")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("product_type is required".to_string()))?
        .to_string();

    let page = parse_i64(lookup("page"), DEFAULT_PAGE, "page")?;
    if page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    let limit = parse_i64(lookup("limit"), DEFAULT_LIMIT, "limit")?;
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let sort_by = lookup("sort_by")
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let sort_order = lookup("sort_order")
        .map(SortDirection::parse)
        .unwrap_or_default();

    let filters = params
        .iter()
        .filter(|(k, _)| !CONTROL_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), FilterValue::Text(v.clone())))
        .collect();

    Ok(SearchRequest {
        product_type,
        page,
        limit,
        sort_by,
        sort_order,
        filters,
    })
}

fn parse_i64(raw: Option<&str>, default: i64, name: &str) -> Result<i64, AppError> {
    match raw {
        None => Ok(default),
        Some(s) if s.is_empty() => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| AppError::BadRequest(format!("{name} must be an integer"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductInfoQuery {
    pub product_type: String,
    pub product_id: i64,
}

pub async fn product_info(
    State(state): State<AppState>,
    Query(query): Query<ProductInfoQuery>,
) -> Result<Json<Value>, AppError> {
    let detail = state
        .products
        .product_info(&query.product_type, query.product_id)
        .await?;

    let Some(Value::Object(detail)) = detail else {
        return Ok(Json(json!({
            "code": 404,
            "message": "product not found",
        })));
    };

    // Detail keys are merged into the envelope itself.
    let mut body = serde_json::Map::new();
    body.insert("code".to_string(), json!(200));
    body.insert("message".to_string(), json!("success"));
    body.extend(detail);
    Ok(Json(Value::Object(body)))
}
