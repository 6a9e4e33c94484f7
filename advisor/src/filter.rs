//! Filter compiler - turns raw request parameters into parameterized SQL
//! predicates against a dynamically discovered field set.
//!
//! The same field can demand three different comparison semantics depending
//! on how the caller phrases the value: a plain number means equality, an
//! operator-prefixed number means inequality, unprefixed text means fuzzy
//! search. Recognition runs once per parameter through an ordered rule chain
//! (range -> boolean -> comparator -> number -> fuzzy text), producing a
//! tagged [`FilterExpression`] so the precedence order is a testable artifact
//! rather than implicit fallthrough.
//!
//! Safety model: identifiers (field names) are only ever spliced into SQL
//! after an allow-list check against the catalog's field set; every literal
//! value travels as a bound parameter. The two paths never merge.

use tracing::warn;

use crate::catalog::{is_safe_identifier, FieldDescriptor};
use crate::error::{AdvisorError, Result};

/// Raw filter input, before recognition.
///
/// HTTP callers only ever produce `Text` and `Range` (folded from
/// `<field>_min` / `<field>_max` query keys); the typed variants exist for
/// library callers that already hold native values.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Range {
        min: Option<String>,
        max: Option<String>,
    },
}

/// Relational operator recognized from a value prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

impl CompareOp {
    /// Prefixes in recognition order. Two-character operators come first so
    /// `>=` is never shadowed by `>`.
    const PREFIXES: [(&'static str, CompareOp); 5] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        ("=", CompareOp::Eq),
    ];

    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Eq => "=",
        }
    }
}

/// A recognized filter, tagged by comparison semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Native numeric value: exact equality after numeric cast.
    Exact(f64),
    /// Case-insensitive substring containment.
    Fuzzy(String),
    /// Inclusive bounds; at least one side present.
    Range { min: Option<f64>, max: Option<f64> },
    /// Operator-prefixed numeric comparison.
    Comparator { op: CompareOp, value: f64 },
    Boolean(bool),
}

impl FilterExpression {
    /// Run the ordered recognizer chain for one parameter.
    ///
    /// `Ok(None)` means "no filter" (empty value, or a range with neither
    /// bound); a comparator prefix followed by a non-numeric remainder is a
    /// hard error that aborts the whole compile.
    pub fn recognize(value: &FilterValue, field: &FieldDescriptor) -> Result<Option<Self>> {
        match value {
            FilterValue::Range { min, max } => {
                let min = parse_bound(field, "min", min.as_deref())?;
                let max = parse_bound(field, "max", max.as_deref())?;
                if min.is_none() && max.is_none() {
                    return Ok(None);
                }
                Ok(Some(FilterExpression::Range { min, max }))
            }
            FilterValue::Bool(b) => Ok(Some(FilterExpression::Boolean(*b))),
            FilterValue::Number(n) => Ok(Some(FilterExpression::Exact(*n))),
            FilterValue::Text(s) => {
                if s.is_empty() {
                    return Ok(None);
                }
                if field.is_boolean() {
                    if s.eq_ignore_ascii_case("true") {
                        return Ok(Some(FilterExpression::Boolean(true)));
                    }
                    if s.eq_ignore_ascii_case("false") {
                        return Ok(Some(FilterExpression::Boolean(false)));
                    }
                }
                for (prefix, op) in CompareOp::PREFIXES {
                    if let Some(rest) = s.strip_prefix(prefix) {
                        let value: f64 = rest.trim().parse().map_err(|_| {
                            AdvisorError::FilterParse(format!(
                                "expected a number after '{prefix}' in filter on '{}', got '{rest}'",
                                field.name
                            ))
                        })?;
                        return Ok(Some(FilterExpression::Comparator { op, value }));
                    }
                }
                // A leading '=' always reads as a comparator, even for text
                // columns whose values legitimately contain one.
                Ok(Some(FilterExpression::Fuzzy(s.clone())))
            }
        }
    }
}

fn parse_bound(field: &FieldDescriptor, side: &str, raw: Option<&str>) -> Result<Option<f64>> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.trim().parse().map(Some).map_err(|_| {
            AdvisorError::FilterParse(format!(
                "range {side} bound on '{}' is not numeric: '{s}'",
                field.name
            ))
        }),
    }
}

/// A literal value destined for a bound parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Compiled predicate set: WHERE fragments with positional placeholders plus
/// the values bound to them, in order.
#[derive(Debug, Default, PartialEq)]
pub struct CompiledFilters {
    pub clauses: Vec<String>,
    pub binds: Vec<BindValue>,
}

impl CompiledFilters {
    /// `" WHERE a AND b"`, or empty when no predicate compiled.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Placeholder index for the next bind ($1-based).
    fn next_placeholder(&self) -> usize {
        self.binds.len() + 1
    }

    fn push(&mut self, clause: String, bind: BindValue) {
        self.clauses.push(clause);
        self.binds.push(bind);
    }
}

/// Compile raw parameters against a category's field set.
///
/// Keys that are not recognized field names are silently dropped - this is
/// the boundary that stops arbitrary column injection. Field names are still
/// re-validated right before formatting, since they end up in SQL text.
pub fn compile(
    params: &[(String, FilterValue)],
    fields: &[FieldDescriptor],
) -> Result<CompiledFilters> {
    let mut compiled = CompiledFilters::default();

    for (key, value) in params {
        let Some(field) = fields.iter().find(|f| f.name == *key) else {
            continue;
        };
        if !is_safe_identifier(&field.name) {
            warn!(field = %field.name, "rejected unsafe field name during compile");
            continue;
        }
        let Some(expr) = FilterExpression::recognize(value, field)? else {
            continue;
        };

        let f = &field.name;
        match expr {
            FilterExpression::Exact(n) => {
                let clause = format!("CAST({f} AS NUMERIC) = ${}", compiled.next_placeholder());
                compiled.push(clause, BindValue::Number(n));
            }
            FilterExpression::Comparator { op, value } => {
                let clause = format!(
                    "CAST({f} AS NUMERIC) {} ${}",
                    op.as_sql(),
                    compiled.next_placeholder()
                );
                compiled.push(clause, BindValue::Number(value));
            }
            FilterExpression::Range { min, max } => {
                if let Some(min) = min {
                    let clause =
                        format!("CAST({f} AS NUMERIC) >= ${}", compiled.next_placeholder());
                    compiled.push(clause, BindValue::Number(min));
                }
                if let Some(max) = max {
                    let clause =
                        format!("CAST({f} AS NUMERIC) <= ${}", compiled.next_placeholder());
                    compiled.push(clause, BindValue::Number(max));
                }
            }
            FilterExpression::Boolean(b) => {
                let clause = format!("{f} = ${}", compiled.next_placeholder());
                compiled.push(clause, BindValue::Bool(b));
            }
            FilterExpression::Fuzzy(s) => {
                let clause =
                    format!("CAST({f} AS TEXT) ILIKE ${}", compiled.next_placeholder());
                compiled.push(clause, BindValue::Text(format!("%{s}%")));
            }
        }
    }

    Ok(compiled)
}

/// Fold `<field>_min` / `<field>_max` query keys into structured ranges.
///
/// An exact field-name match always wins over suffix interpretation, so a
/// hypothetical column literally named `premium_min` keeps its plain
/// semantics. Keys that match neither pattern pass through untouched and are
/// dropped later by [`compile`].
pub fn fold_range_params(
    raw: Vec<(String, FilterValue)>,
    fields: &[FieldDescriptor],
) -> Vec<(String, FilterValue)> {
    let known = |name: &str| fields.iter().any(|f| f.name == name);
    let mut out: Vec<(String, FilterValue)> = Vec::with_capacity(raw.len());

    let mut set_bound = |out: &mut Vec<(String, FilterValue)>, stem: &str, text: String, is_min: bool| {
        let entry = out.iter_mut().find(|(k, v)| {
            k == stem && matches!(v, FilterValue::Range { .. })
        });
        let (min, max) = if is_min {
            (Some(text), None)
        } else {
            (None, Some(text))
        };
        match entry {
            Some((_, FilterValue::Range { min: m, max: x })) => {
                if let Some(v) = min {
                    *m = Some(v);
                }
                if let Some(v) = max {
                    *x = Some(v);
                }
            }
            _ => out.push((stem.to_string(), FilterValue::Range { min, max })),
        }
    };

    for (key, value) in raw {
        if known(&key) {
            out.push((key, value));
            continue;
        }
        if let FilterValue::Text(text) = &value {
            if let Some(stem) = key.strip_suffix("_min") {
                if known(stem) {
                    set_bound(&mut out, stem, text.clone(), true);
                    continue;
                }
            }
            if let Some(stem) = key.strip_suffix("_max") {
                if known(stem) {
                    set_bound(&mut out, stem, text.clone(), false);
                    continue;
                }
            }
        }
        out.push((key, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, data_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            description: name.into(),
        }
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            field("premium", "numeric"),
            field("product_name", "text"),
            field("waiting_period", "text"),
            field("renewable", "boolean"),
        ]
    }

    fn text(s: &str) -> FilterValue {
        FilterValue::Text(s.into())
    }

    #[test]
    fn comparator_two_char_operators_win() {
        let f = field("premium", "numeric");
        let expr = FilterExpression::recognize(&text(">=100"), &f).unwrap();
        assert_eq!(
            expr,
            Some(FilterExpression::Comparator {
                op: CompareOp::Ge,
                value: 100.0
            })
        );
        let expr = FilterExpression::recognize(&text(">100"), &f).unwrap();
        assert_eq!(
            expr,
            Some(FilterExpression::Comparator {
                op: CompareOp::Gt,
                value: 100.0
            })
        );
    }

    #[test]
    fn comparator_allows_whitespace_after_operator() {
        let f = field("premium", "numeric");
        let expr = FilterExpression::recognize(&text("<= 42.5"), &f).unwrap();
        assert_eq!(
            expr,
            Some(FilterExpression::Comparator {
                op: CompareOp::Le,
                value: 42.5
            })
        );
    }

    #[test]
    fn comparator_non_numeric_remainder_is_an_error() {
        let f = field("premium", "numeric");
        let err = FilterExpression::recognize(&text(">abc"), &f).unwrap_err();
        assert!(matches!(err, AdvisorError::FilterParse(_)));
    }

    #[test]
    fn bare_equals_reads_as_comparator() {
        let f = field("product_name", "text");
        let expr = FilterExpression::recognize(&text("=5"), &f).unwrap();
        assert_eq!(
            expr,
            Some(FilterExpression::Comparator {
                op: CompareOp::Eq,
                value: 5.0
            })
        );
    }

    #[test]
    fn plain_text_is_fuzzy() {
        let f = field("product_name", "text");
        let expr = FilterExpression::recognize(&text("寿险"), &f).unwrap();
        assert_eq!(expr, Some(FilterExpression::Fuzzy("寿险".into())));
    }

    #[test]
    fn boolean_literal_only_for_boolean_fields() {
        let renewable = field("renewable", "boolean");
        let name = field("product_name", "text");
        assert_eq!(
            FilterExpression::recognize(&text("TRUE"), &renewable).unwrap(),
            Some(FilterExpression::Boolean(true))
        );
        // On a text field the same literal is just fuzzy text.
        assert_eq!(
            FilterExpression::recognize(&text("true"), &name).unwrap(),
            Some(FilterExpression::Fuzzy("true".into()))
        );
    }

    #[test]
    fn empty_values_are_skipped() {
        let f = field("product_name", "text");
        assert_eq!(FilterExpression::recognize(&text(""), &f).unwrap(), None);
        let empty_range = FilterValue::Range {
            min: Some(String::new()),
            max: None,
        };
        assert_eq!(
            FilterExpression::recognize(&empty_range, &f).unwrap(),
            None
        );
    }

    #[test]
    fn native_number_is_exact_match() {
        let f = field("premium", "numeric");
        assert_eq!(
            FilterExpression::recognize(&FilterValue::Number(7.0), &f).unwrap(),
            Some(FilterExpression::Exact(7.0))
        );
    }

    #[test]
    fn compile_unknown_keys_are_dropped() {
        let params = vec![
            ("premium".to_string(), text(">=100")),
            ("no_such_column".to_string(), text("evil")),
        ];
        let compiled = compile(&params, &fields()).unwrap();
        assert_eq!(compiled.clauses.len(), 1);
        assert_eq!(compiled.clauses[0], "CAST(premium AS NUMERIC) >= $1");
        assert_eq!(compiled.binds, vec![BindValue::Number(100.0)]);
    }

    #[test]
    fn compile_fuzzy_binds_wrapped_pattern() {
        let params = vec![("product_name".to_string(), text("寿险"))];
        let compiled = compile(&params, &fields()).unwrap();
        assert_eq!(compiled.clauses[0], "CAST(product_name AS TEXT) ILIKE $1");
        assert_eq!(compiled.binds, vec![BindValue::Text("%寿险%".into())]);
    }

    #[test]
    fn compile_range_emits_both_bounds() {
        let params = vec![(
            "premium".to_string(),
            FilterValue::Range {
                min: Some("1000".into()),
                max: Some("5000".into()),
            },
        )];
        let compiled = compile(&params, &fields()).unwrap();
        assert_eq!(
            compiled.clauses,
            vec![
                "CAST(premium AS NUMERIC) >= $1",
                "CAST(premium AS NUMERIC) <= $2"
            ]
        );
        assert_eq!(
            compiled.binds,
            vec![BindValue::Number(1000.0), BindValue::Number(5000.0)]
        );
    }

    #[test]
    fn compile_numbers_placeholders_across_fields() {
        let params = vec![
            ("premium".to_string(), text(">=100")),
            ("product_name".to_string(), text("term")),
            ("renewable".to_string(), text("true")),
        ];
        let compiled = compile(&params, &fields()).unwrap();
        assert_eq!(
            compiled.clauses,
            vec![
                "CAST(premium AS NUMERIC) >= $1",
                "CAST(product_name AS TEXT) ILIKE $2",
                "renewable = $3",
            ]
        );
        assert_eq!(
            compiled.where_sql(),
            " WHERE CAST(premium AS NUMERIC) >= $1 AND CAST(product_name AS TEXT) ILIKE $2 AND renewable = $3"
        );
    }

    #[test]
    fn compile_parse_failure_aborts_whole_compile() {
        let params = vec![
            ("product_name".to_string(), text("term")),
            ("premium".to_string(), text("<abc")),
        ];
        assert!(compile(&params, &fields()).is_err());
    }

    #[test]
    fn compile_numeric_cast_applies_to_text_declared_columns() {
        // waiting_period is declared text but filtered numerically.
        let params = vec![("waiting_period".to_string(), text("<90"))];
        let compiled = compile(&params, &fields()).unwrap();
        assert_eq!(compiled.clauses[0], "CAST(waiting_period AS NUMERIC) < $1");
        assert_eq!(compiled.binds, vec![BindValue::Number(90.0)]);
    }

    #[test]
    fn empty_where_sql() {
        assert_eq!(CompiledFilters::default().where_sql(), "");
    }

    #[test]
    fn fold_min_max_into_range() {
        let raw = vec![
            ("premium_min".to_string(), text("1000")),
            ("premium_max".to_string(), text("5000")),
            ("product_name".to_string(), text("term")),
        ];
        let folded = fold_range_params(raw, &fields());
        assert_eq!(folded.len(), 2);
        assert_eq!(
            folded[0],
            (
                "premium".to_string(),
                FilterValue::Range {
                    min: Some("1000".into()),
                    max: Some("5000".into()),
                }
            )
        );
        assert_eq!(folded[1].0, "product_name");
    }

    #[test]
    fn fold_exact_field_match_beats_suffix() {
        let fields = vec![field("premium_min", "numeric"), field("premium", "numeric")];
        let raw = vec![("premium_min".to_string(), text("1000"))];
        let folded = fold_range_params(raw, &fields);
        assert_eq!(folded, vec![("premium_min".to_string(), text("1000"))]);
    }

    #[test]
    fn fold_leaves_unknown_stems_alone() {
        let raw = vec![("mystery_min".to_string(), text("1"))];
        let folded = fold_range_params(raw, &fields());
        assert_eq!(folded, vec![("mystery_min".to_string(), text("1"))]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn eval(op: CompareOp, lhs: f64, rhs: f64) -> bool {
            match op {
                CompareOp::Ge => lhs >= rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Lt => lhs < rhs,
                CompareOp::Eq => lhs == rhs,
            }
        }

        proptest! {
            // Recognizing "<op><number>" always yields the comparator whose
            // in-memory evaluation agrees with the arithmetic relation.
            #[test]
            fn comparator_round_trip(
                value in -1.0e6f64..1.0e6,
                probe in -1.0e6f64..1.0e6,
                op_idx in 0usize..5,
            ) {
                let (prefix, op) = CompareOp::PREFIXES[op_idx];
                let f = field("premium", "numeric");
                let raw = format!("{prefix}{value}");
                let expr = FilterExpression::recognize(&FilterValue::Text(raw), &f)
                    .unwrap()
                    .unwrap();
                let FilterExpression::Comparator { op: got, value: bound } = expr else {
                    panic!("expected comparator");
                };
                prop_assert_eq!(got, op);
                prop_assert_eq!(bound, value);
                prop_assert_eq!(eval(got, probe, bound), eval(op, probe, value));
            }

            // Plain strings that don't start with an operator compile to a
            // substring pattern wrapped in '%'.
            #[test]
            fn plain_text_compiles_to_substring_pattern(s in "[a-z\u{4e00}-\u{9fa5}][a-z0-9\u{4e00}-\u{9fa5}]{0,12}") {
                let params = vec![("product_name".to_string(), FilterValue::Text(s.clone()))];
                let compiled = compile(&params, &fields()).unwrap();
                prop_assert_eq!(compiled.binds.len(), 1);
                prop_assert_eq!(&compiled.binds[0], &BindValue::Text(format!("%{s}%")));
            }
        }
    }
}
