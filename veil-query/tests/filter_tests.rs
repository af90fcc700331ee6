use veil_query::{CmpOp, Filter};
use veil_types::Value;

fn row() -> serde_json::Value {
    serde_json::json!({
        "id": 3,
        "name": "carol",
        "age": 34,
        "score": 7.5,
        "active": true,
        "nickname": null,
    })
}

#[test]
fn comparison_operators() {
    let row = row();
    assert!(Filter::eq("age", 34).matches_row(&row));
    assert!(Filter::ne("age", 33).matches_row(&row));
    assert!(Filter::lt("age", 35).matches_row(&row));
    assert!(Filter::le("age", 34).matches_row(&row));
    assert!(Filter::gt("age", 33).matches_row(&row));
    assert!(Filter::ge("age", 34).matches_row(&row));

    assert!(!Filter::eq("age", 33).matches_row(&row));
    assert!(!Filter::lt("age", 34).matches_row(&row));
    assert!(!Filter::gt("age", 34).matches_row(&row));
}

#[test]
fn integer_operand_matches_real_column() {
    assert!(Filter::gt("score", 7).matches_row(&row()));
    assert!(Filter::eq("score", 7.5).matches_row(&row()));
}

#[test]
fn text_comparison() {
    let row = row();
    assert!(Filter::eq("name", "carol").matches_row(&row));
    assert!(Filter::lt("name", "dave").matches_row(&row));
}

#[test]
fn null_column_never_matches() {
    let row = row();
    assert!(!Filter::eq("nickname", "cc").matches_row(&row));
    assert!(!Filter::ne("nickname", "cc").matches_row(&row));
    assert!(!Filter::eq("nickname", Value::Null).matches_row(&row));
}

#[test]
fn missing_column_never_matches() {
    let row = row();
    assert!(!Filter::eq("missing", 1).matches_row(&row));
    assert!(!Filter::ne("missing", 1).matches_row(&row));
}

#[test]
fn mismatched_types_never_match() {
    let row = row();
    assert!(!Filter::eq("name", 34).matches_row(&row));
    assert!(!Filter::ne("name", 34).matches_row(&row));
}

#[test]
fn and_or_not_compose() {
    let row = row();

    let both = Filter::ge("age", 18).and(Filter::eq("active", true));
    assert!(both.matches_row(&row));

    let either = Filter::eq("name", "dave").or(Filter::eq("name", "carol"));
    assert!(either.matches_row(&row));

    let negated = Filter::eq("name", "dave").negate();
    assert!(negated.matches_row(&row));
}

#[test]
fn chained_and_flattens() {
    let filter = Filter::ge("age", 18)
        .and(Filter::eq("active", true))
        .and(Filter::lt("age", 65));
    assert!(matches!(&filter, Filter::And(parts) if parts.len() == 3));
    assert!(filter.matches_row(&row()));
}

#[test]
fn empty_and_matches_everything_empty_or_nothing() {
    let row = row();
    assert!(Filter::And(vec![]).matches_row(&row));
    assert!(!Filter::Or(vec![]).matches_row(&row));
}

#[test]
fn filter_serde_roundtrip() {
    let filter = Filter::ge("age", 18).and(Filter::eq("name", "carol").negate());
    let json = serde_json::to_string(&filter).unwrap();
    let back: Filter = serde_json::from_str(&json).unwrap();
    assert_eq!(filter, back);
}

#[test]
fn cmp_construction_exposes_parts() {
    let filter = Filter::eq("age", 34);
    assert!(matches!(
        filter,
        Filter::Cmp { ref column, op: CmpOp::Eq, ref value }
            if column == "age" && *value == Value::Integer(34)
    ));
}
