//! Query Translation Tests
//!
//! End-to-end compilation of query chains against a mapped record type:
//! - Filters use wire names from the descriptor's name changes
//! - Projections select wire columns and rebuild the shape client-side
//! - Literal rendering is stable across parse and render

mod common;

use aerotable::expr::{Evaluator, Expr, Lambda};
use aerotable::mapping::{DescriptorRegistry, NameChanges, RecordTypeDescriptor};
use aerotable::query::{parse_literal, serialize_literal, QueryCompiler, TranslationResult};
use aerotable::value::Value;
use common::Country;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn descriptor() -> Arc<RecordTypeDescriptor<Country>> {
    DescriptorRegistry::new().descriptor::<Country>().unwrap()
}

fn c(member: &str) -> Expr {
    Expr::param("c").member(member)
}

fn predicate(body: Expr) -> Expr {
    Expr::lambda("c", body)
}

fn sample_rows(descriptor: &RecordTypeDescriptor<Country>) -> Vec<Value> {
    [
        Country::new("Europe", "Germany", 357_022.0, true),
        Country::new("Europe", "Spain", 505_990.0, false),
    ]
    .iter()
    .map(|country| descriptor.to_row(country).unwrap())
    .collect()
}

/// Stands in for the server: keeps the rows the compiled filter accepts
fn apply_filter(result: &TranslationResult, rows: Vec<Value>) -> Vec<Value> {
    match result.filter() {
        Some(filter) => rows
            .into_iter()
            .filter(|row| common::filter::matches(filter, row))
            .collect(),
        None => rows,
    }
}

fn lambda_accepts(lambda: &Expr, row: &Value) -> bool {
    let lambda: &Lambda = lambda.as_lambda().unwrap();
    Evaluator::apply(lambda, row.clone()).unwrap() == Value::Bool(true)
}

fn names(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|row| row.member("Name").and_then(Value::as_str).unwrap().to_string())
        .collect()
}

// =============================================================================
// Filter Tests
// =============================================================================

/// A negated boolean member is a truthiness test on the bare column.
#[test]
fn test_negated_boolean_selects_spain() {
    let descriptor = descriptor();
    let where_not_exists = predicate(c("IsExists").negate());
    let query = Expr::source("Countries").filter(where_not_exists.clone());

    let result = QueryCompiler::new()
        .compile(&query, descriptor.name_changes())
        .unwrap();
    assert_eq!(result.filter(), Some("not IsExists"));

    let selected = apply_filter(&result, sample_rows(&descriptor));
    let selected = result.post_process(selected).unwrap();
    assert_eq!(names(&selected), vec!["Spain"]);
}

/// The compiled filter for a grouped disjunction selects the same rows as the lambda.
#[test]
fn test_grouped_disjunction_matches_lambda() {
    let body = c("A").or(c("B")).and(c("C"));
    let lambda = predicate(body);
    let query = Expr::source("Flags").filter(lambda.clone());

    let result = QueryCompiler::new()
        .compile(&query, &NameChanges::default())
        .unwrap();
    assert_eq!(result.filter(), Some("(A or B) and C"));

    for bits in 0..8u8 {
        let row = Value::record([
            ("A", Value::Bool(bits & 1 != 0)),
            ("B", Value::Bool(bits & 2 != 0)),
            ("C", Value::Bool(bits & 4 != 0)),
        ]);
        let by_filter = !apply_filter(&result, vec![row.clone()]).is_empty();
        assert_eq!(by_filter, lambda_accepts(&lambda, &row), "row {:03b}", bits);
    }
}

/// CompareTo range collapses to plain comparisons on the renamed key.
#[test]
fn test_compare_to_range_uses_row_key() {
    let descriptor = descriptor();
    let body = c("Name")
        .compare_to(Expr::constant("F"))
        .ge(Expr::constant(0))
        .and(c("Name").compare_to(Expr::constant("G")).le(Expr::constant(0)));
    let query = Expr::source("Countries").filter(predicate(body));

    let result = QueryCompiler::new()
        .compile(&query, descriptor.name_changes())
        .unwrap();
    assert_eq!(result.filter(), Some("RowKey ge 'F' and RowKey le 'G'"));
}

/// Captured values are folded into literals before rendering.
#[test]
fn test_captured_values_folded() {
    let captured = Value::record([("MinArea", Value::Double(400_000.0))]);
    let body = c("Area").gt(Expr::constant(captured).member("MinArea"));
    let query = Expr::source("Countries").filter(predicate(body));

    let result = QueryCompiler::new()
        .compile(&query, &descriptor().name_changes().clone())
        .unwrap();
    assert_eq!(result.filter(), Some("Area gt 400000.0"));
}

/// Successive filters conjoin; an `or` side is grouped.
#[test]
fn test_add_filter_conjunction() {
    let mut result = TranslationResult::new();
    result.add_filter("A eq 1").unwrap();
    result.add_filter("B eq 2 or C eq 3").unwrap();
    result.add_filter("D eq 4").unwrap();

    let text = result.filter().unwrap();
    assert_eq!(text, "A eq 1 and (B eq 2 or C eq 3) and D eq 4");
    assert!(result.add_filter("   ").is_err());
}

// =============================================================================
// Projection Tests
// =============================================================================

/// Selected columns use wire names; the projected shape is rebuilt locally.
#[test]
fn test_projection_columns_and_shape() {
    let descriptor = descriptor();
    let projection = Expr::lambda(
        "c",
        Expr::shape([
            ("Name", c("Name")),
            ("Continent", c("Continent")),
            ("Area", c("Area")),
        ]),
    );
    let query = Expr::source("Countries").select(projection);

    let result = QueryCompiler::new()
        .compile(&query, descriptor.name_changes())
        .unwrap();

    let mut columns = result.select_columns().unwrap().to_vec();
    columns.sort();
    assert_eq!(columns, vec!["Area", "PartitionKey", "RowKey"]);

    let shaped = result.post_process(sample_rows(&descriptor)).unwrap();
    assert_eq!(
        shaped[1],
        Value::record([
            ("Area", Value::Double(505_990.0)),
            ("Continent", Value::from("Europe")),
            ("Name", Value::from("Spain")),
        ])
    );
}

/// Filter, projection and element operator combine in one request.
#[test]
fn test_full_chain_parameters() {
    let descriptor = descriptor();
    let query = Expr::source("Countries")
        .filter(predicate(c("Continent").eq(Expr::constant("Europe"))))
        .select(Expr::lambda("c", c("Name")))
        .first_or_default();

    let result = QueryCompiler::new()
        .compile(&query, descriptor.name_changes())
        .unwrap();
    assert_eq!(
        result.query_parameters(),
        vec![
            ("$filter", "PartitionKey eq 'Europe'".to_string()),
            ("$select", "RowKey".to_string()),
            ("$top", "1".to_string()),
        ]
    );

    let rows = result.post_process(sample_rows(&descriptor)).unwrap();
    assert_eq!(rows, vec![Value::from("Germany")]);
    assert_eq!(result.post_process(Vec::new()).unwrap(), vec![Value::Null]);
}

/// Unregistered operators fail with the operator named.
#[test]
fn test_unsupported_operator_named() {
    let query = Expr::source("Countries").operator("OrderBy", vec![predicate(c("Name"))]);
    let err = QueryCompiler::new()
        .compile(&query, &NameChanges::new())
        .err()
        .unwrap();
    assert_eq!(err.code(), "TABLE_QUERY_UNSUPPORTED_OPERATOR");
    assert!(err.to_string().contains("OrderBy"));
}

// =============================================================================
// Literal Tests
// =============================================================================

/// Rendering a parsed literal reproduces the original text.
#[test]
fn test_literal_rendering_stable() {
    let literals = [
        "'O''Brien'",
        "''",
        "X'00ff10'",
        "true",
        "false",
        "42",
        "-7",
        "42L",
        "2.5",
        "42.0",
        "guid'6f9619ff-8b86-d011-b42d-00cf4fc964ff'",
        "datetime'2024-05-01T10:00:00Z'",
    ];

    for text in literals {
        let value = parse_literal(text).unwrap();
        assert_eq!(serialize_literal(&value).unwrap(), text, "literal {}", text);
    }
}

#[test]
fn test_non_finite_double_rejected() {
    assert!(serialize_literal(&Value::Double(f64::NAN)).is_err());
    assert!(serialize_literal(&Value::Null).is_err());
}
