//! Result translator - relabels raw column names with their display
//! descriptions.
//!
//! Key order in the output follows the column order the storage engine
//! returned (stable per query, not across schema changes). The stable key
//! column, when requested, is emitted twice: once under its translated label
//! and once under its raw name, so locale-independent consumers always find
//! it.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::catalog::FieldDescriptor;

/// Column name -> display label.
pub fn label_map(fields: &[FieldDescriptor]) -> HashMap<&str, &str> {
    fields
        .iter()
        .map(|f| (f.name.as_str(), f.description.as_str()))
        .collect()
}

/// Translate one row object. Columns without a label keep their raw name.
pub fn translate_row(
    row: &Map<String, Value>,
    labels: &HashMap<&str, &str>,
    stable_key: Option<&str>,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(row.len() + 1);
    for (column, value) in row {
        let label = labels.get(column.as_str()).copied().unwrap_or(column);
        out.insert(label.to_string(), value.clone());
        if stable_key == Some(column.as_str()) {
            out.insert(column.clone(), value.clone());
        }
    }
    out
}

/// Translate a page of rows. Non-object rows (which `row_to_json` never
/// produces) are skipped.
pub fn translate_rows(
    rows: &[Value],
    fields: &[FieldDescriptor],
    stable_key: Option<&str>,
) -> Vec<Value> {
    let labels = label_map(fields);
    rows.iter()
        .filter_map(Value::as_object)
        .map(|row| Value::Object(translate_row(row, &labels, stable_key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor {
                name: "product_name".into(),
                data_type: "text".into(),
                description: "产品名称".into(),
            },
            FieldDescriptor {
                name: "premium".into(),
                data_type: "numeric".into(),
                description: "保费".into(),
            },
        ]
    }

    #[test]
    fn labels_replace_column_names() {
        let rows = vec![json!({"product_name": "定期寿险A", "premium": 1200})];
        let out = translate_rows(&rows, &fields(), None);
        assert_eq!(out, vec![json!({"产品名称": "定期寿险A", "保费": 1200})]);
    }

    #[test]
    fn unlabeled_columns_keep_raw_name() {
        let rows = vec![json!({"product_name": "A", "mystery": 1})];
        let out = translate_rows(&rows, &fields(), None);
        assert_eq!(out, vec![json!({"产品名称": "A", "mystery": 1})]);
    }

    #[test]
    fn stable_key_is_emitted_twice() {
        let mut fields = fields();
        fields.push(FieldDescriptor {
            name: "product_id".into(),
            data_type: "integer".into(),
            description: "编号".into(),
        });
        let rows = vec![json!({"product_id": 42, "premium": 9})];
        let out = translate_rows(&rows, &fields, Some("product_id"));
        let row = out[0].as_object().unwrap();
        assert_eq!(row.get("编号"), Some(&json!(42)));
        assert_eq!(row.get("product_id"), Some(&json!(42)));
        assert_eq!(row.get("保费"), Some(&json!(9)));
    }

    #[test]
    fn stable_key_without_label_appears_once() {
        // product_id is excluded from the catalog's field set, so it has no
        // label and translates to itself; the duplicate insert collapses.
        let rows = vec![json!({"product_id": 7, "premium": 1})];
        let out = translate_rows(&rows, &fields(), Some("product_id"));
        let row = out[0].as_object().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("product_id"), Some(&json!(7)));
    }

    #[test]
    fn key_order_follows_column_order() {
        let rows = vec![json!({"premium": 1, "product_name": "A"})];
        let out = translate_rows(&rows, &fields(), None);
        let keys: Vec<&String> = out[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["保费", "产品名称"]);
    }
}
