use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use veil_model::{ColumnDef, Entity, EntitySchema, SchemaRegistry};
use veil_query::{compose, Direction, Filter, QueryError, QuerySpec, TrackingMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Person {
    id: i64,
    name: String,
    age: i64,
}

impl Entity for Person {
    const NAME: &'static str = "people";
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ghost {
    id: i64,
}

impl Entity for Ghost {
    const NAME: &'static str = "ghosts";
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            EntitySchema::new("people")
                .column(ColumnDef::integer("id").primary_key())
                .column(ColumnDef::text("name"))
                .column(ColumnDef::integer("age"))
                .relation("addresses", "addresses"),
        )
        .unwrap();
    registry
}

#[test]
fn composes_full_spec() {
    let spec = QuerySpec::new()
        .filter(Filter::ge("age", 18))
        .order_by("name")
        .include("addresses")
        .skip(10)
        .take(5)
        .tracked();

    let query = compose::<Person>(&registry(), spec).unwrap();
    assert_eq!(query.entity_type, "people");
    assert_eq!(query.filter, Some(Filter::ge("age", 18)));
    assert_eq!(query.includes, vec!["addresses".to_string()]);
    assert_eq!(query.order.as_ref().unwrap().column, "name");
    assert_eq!(query.order.as_ref().unwrap().direction, Direction::Ascending);
    assert_eq!(query.skip, Some(10));
    assert_eq!(query.take, Some(5));
    assert_eq!(query.tracking, TrackingMode::Tracked);
}

#[test]
fn empty_spec_composes_untracked() {
    let query = compose::<Person>(&registry(), QuerySpec::new()).unwrap();
    assert_eq!(query.filter, None);
    assert_eq!(query.order, None);
    assert_eq!(query.skip, None);
    assert_eq!(query.take, None);
    assert_eq!(query.tracking, TrackingMode::Untracked);
}

#[test]
fn unknown_entity_type_fails() {
    let err = compose::<Ghost>(&registry(), QuerySpec::new()).unwrap_err();
    assert!(matches!(err, QueryError::UnknownEntityType(name) if name == "ghosts"));
}

#[test]
fn negative_skip_fails() {
    let err = compose::<Person>(&registry(), QuerySpec::new().skip(-1)).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn negative_take_fails() {
    let err = compose::<Person>(&registry(), QuerySpec::new().take(-5)).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn zero_window_is_valid() {
    let query = compose::<Person>(&registry(), QuerySpec::new().skip(0).take(0)).unwrap();
    assert_eq!(query.skip, Some(0));
    assert_eq!(query.take, Some(0));
}

#[test]
fn undeclared_include_fails() {
    let err =
        compose::<Person>(&registry(), QuerySpec::new().include("orders")).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(msg) if msg.contains("orders")));
}

#[test]
fn includes_preserve_order() {
    let mut registry = registry();
    registry
        .register(
            EntitySchema::new("ghosts").column(ColumnDef::integer("id").primary_key()),
        )
        .unwrap();

    let spec = QuerySpec::new().include("addresses").include("addresses");
    let query = compose::<Person>(&registry, spec).unwrap();
    assert_eq!(query.includes.len(), 2);
}

#[test]
fn paging_without_order_composes() {
    // Warned about, but permitted.
    let query = compose::<Person>(&registry(), QuerySpec::new().skip(2).take(3)).unwrap();
    assert_eq!(query.skip, Some(2));
    assert_eq!(query.take, Some(3));
    assert!(query.order.is_none());
}

#[test]
fn order_by_desc_replaces_ascending() {
    let spec = QuerySpec::new().order_by("name").order_by_desc("age");
    let query = compose::<Person>(&registry(), spec).unwrap();
    let order = query.order.unwrap();
    assert_eq!(order.column, "age");
    assert_eq!(order.direction, Direction::Descending);
}
