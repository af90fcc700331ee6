mod common;

use common::{person, registry, repository, Person};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use veil_model::Entity;
use veil_query::{Filter, QuerySpec, TrackingMode};
use veil_repo::{
    ChangeState, FieldError, MemoryEngine, ReadPort, RepoError, Repository, WritePort,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Unregistered {
    id: i64,
}

impl Entity for Unregistered {
    const NAME: &'static str = "unregistered";
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

fn seeded(people: Vec<Person>) -> Repository<MemoryEngine> {
    let mut repo = repository();
    let mut batch = people;
    repo.create_range(&mut batch).unwrap();
    repo.save().unwrap();
    repo
}

#[test]
fn create_save_get_roundtrip() {
    let mut repo = repository();
    let mut alice = person(1, "alice", 30);

    repo.create(&mut alice).unwrap();
    let report = repo.save().unwrap();
    assert_eq!(report.rows_affected, 1);

    let fetched: Vec<Person> = repo.get(QuerySpec::new()).unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].name, "alice");
    assert_eq!(fetched[0].created_at, alice.created_at);
}

#[test]
fn save_clears_the_context() {
    let mut repo = repository();
    let mut alice = person(1, "alice", 30);
    repo.create(&mut alice).unwrap();
    repo.save().unwrap();

    assert!(repo.context().is_empty());
    let report = repo.save().unwrap();
    assert_eq!(report.rows_affected, 0);
}

#[test]
fn get_filters_before_paging() {
    let mut repo = seeded(vec![
        person(1, "alice", 30),
        person(2, "bob", 15),
        person(3, "carol", 45),
        person(4, "dave", 12),
    ]);

    let adults: Vec<Person> = repo
        .get(QuerySpec::new().filter(Filter::ge("age", 18)).order_by("name"))
        .unwrap();
    let names: Vec<&str> = adults.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol"]);
}

#[test]
fn get_orders_descending() {
    let mut repo = seeded(vec![
        person(1, "alice", 30),
        person(2, "bob", 15),
        person(3, "carol", 45),
    ]);

    let by_age: Vec<Person> = repo
        .get(QuerySpec::new().order_by_desc("age"))
        .unwrap();
    let ages: Vec<i64> = by_age.iter().map(|p| p.age).collect();
    assert_eq!(ages, vec![45, 30, 15]);
}

#[test]
fn paging_window_example_scenario() {
    // Twelve matching rows, skip 10 take 5: exactly the 11th and 12th in
    // name order.
    let mut people: Vec<Person> = (1..=12)
        .map(|i| person(i, &format!("name{i:02}"), 20 + i))
        .collect();
    people.push(person(13, "minor", 10));
    let mut repo = seeded(people);

    let page: Vec<Person> = repo
        .get(
            QuerySpec::new()
                .filter(Filter::ge("age", 18))
                .order_by("name")
                .skip(10)
                .take(5),
        )
        .unwrap();
    let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["name11", "name12"]);
}

#[test]
fn get_one_matches_exactly_one() {
    let mut repo = seeded(vec![person(1, "alice", 30), person(2, "bob", 40)]);

    let found: Option<Person> = repo
        .get_one(QuerySpec::new().filter(Filter::eq("name", "alice")))
        .unwrap();
    assert_eq!(found.unwrap().id, 1);
}

#[test]
fn get_one_returns_none_for_no_match() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);
    let found: Option<Person> = repo
        .get_one(QuerySpec::new().filter(Filter::eq("name", "zelda")))
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn get_one_rejects_multiple_matches() {
    let mut repo = seeded(vec![person(1, "alice", 30), person(2, "bob", 30)]);
    let err = repo
        .get_one::<Person>(QuerySpec::new().filter(Filter::eq("age", 30)))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::MultipleResults { entity_type: "people" }
    ));
}

#[test]
fn get_first_never_errors_on_multiple() {
    let mut repo = seeded(vec![person(1, "bob", 30), person(2, "alice", 30)]);
    let first: Option<Person> = repo
        .get_first(
            QuerySpec::new()
                .filter(Filter::eq("age", 30))
                .order_by("name"),
        )
        .unwrap();
    assert_eq!(first.unwrap().name, "alice");
}

#[test]
fn get_by_id_resolves_and_misses() {
    let mut repo = seeded(vec![person(7, "grace", 52)]);

    let found: Option<Person> = repo.get_by_id(&7, TrackingMode::Untracked).unwrap();
    assert_eq!(found.unwrap().name, "grace");

    let missing: Option<Person> = repo.get_by_id(&8, TrackingMode::Untracked).unwrap();
    assert!(missing.is_none());
}

#[test]
fn count_and_exists_are_aggregates() {
    let repo = seeded(vec![
        person(1, "alice", 30),
        person(2, "bob", 15),
        person(3, "carol", 45),
    ]);

    assert_eq!(repo.count::<Person>(Some(Filter::ge("age", 18))).unwrap(), 2);
    assert_eq!(repo.count::<Person>(None).unwrap(), 3);
    assert!(repo.exists::<Person>(Some(Filter::eq("name", "bob"))).unwrap());
    assert!(!repo.exists::<Person>(Some(Filter::eq("name", "zelda"))).unwrap());
}

#[test]
fn reads_default_to_untracked() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);
    let _: Vec<Person> = repo.get(QuerySpec::new()).unwrap();
    assert!(repo.context().is_empty());
}

#[test]
fn tracked_reads_register_unchanged() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);
    let fetched: Vec<Person> = repo.get(QuerySpec::new().tracked()).unwrap();
    assert_eq!(repo.context().len(), 1);
    assert_eq!(repo.context().state_of(&fetched[0]), ChangeState::Unchanged);

    // Nothing staged, so saving is a no-op.
    assert_eq!(repo.save().unwrap().rows_affected, 0);
}

#[test]
fn update_and_save_persists_changes() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);
    let mut alice: Person = repo.get_by_id(&1, TrackingMode::Untracked).unwrap().unwrap();
    alice.age = 31;

    repo.update_and_save(&mut alice).unwrap();
    assert!(alice.modified_at.is_some());

    let reloaded: Person = repo.get_by_id(&1, TrackingMode::Untracked).unwrap().unwrap();
    assert_eq!(reloaded.age, 31);
    assert_eq!(reloaded.modified_at, alice.modified_at);
}

#[test]
fn created_at_survives_updates() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);
    let created = repo
        .get_by_id::<Person>(&1, TrackingMode::Untracked)
        .unwrap()
        .unwrap()
        .created_at;

    let mut alice: Person = repo.get_by_id(&1, TrackingMode::Untracked).unwrap().unwrap();
    alice.age = 31;
    repo.update_and_save(&mut alice).unwrap();

    let reloaded: Person = repo.get_by_id(&1, TrackingMode::Untracked).unwrap().unwrap();
    assert_eq!(reloaded.created_at, created);
}

#[test]
fn delete_by_entity_removes_row() {
    let mut repo = seeded(vec![person(1, "alice", 30), person(2, "bob", 40)]);
    let alice: Person = repo.get_by_id(&1, TrackingMode::Untracked).unwrap().unwrap();

    repo.delete(&alice).unwrap();
    repo.save().unwrap();
    assert_eq!(repo.count::<Person>(None).unwrap(), 1);
}

#[test]
fn delete_by_id_resolves_then_stages() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);

    assert!(repo.delete_by_id::<Person>(&1).unwrap());
    repo.save().unwrap();
    assert_eq!(repo.count::<Person>(None).unwrap(), 0);
}

#[test]
fn delete_by_id_missing_is_not_an_error() {
    let mut repo = seeded(vec![person(1, "alice", 30)]);

    assert!(!repo.delete_by_id::<Person>(&99).unwrap());
    assert!(repo.context().is_empty());
}

#[test]
fn unknown_entity_type_is_a_typed_error() {
    let mut repo = repository();
    let err = repo.get::<Unregistered>(QuerySpec::new()).unwrap_err();
    assert!(matches!(err, RepoError::UnknownEntityType(name) if name == "unregistered"));

    let err = repo.count::<Unregistered>(None).unwrap_err();
    assert!(matches!(err, RepoError::UnknownEntityType(_)));

    let mut ghost = Unregistered { id: 1 };
    let err = repo.create(&mut ghost).unwrap_err();
    assert!(matches!(err, RepoError::UnknownEntityType(_)));
}

#[test]
fn negative_window_is_invalid_argument() {
    let mut repo = repository();
    let err = repo.get::<Person>(QuerySpec::new().skip(-1)).unwrap_err();
    assert!(matches!(err, RepoError::InvalidArgument(_)));
}

fn validating_repository() -> Repository<MemoryEngine> {
    let registry = registry();
    let mut engine = MemoryEngine::new(registry.clone());
    engine.set_validator("people", |row| {
        let mut errors = Vec::new();
        if row["name"].as_str().is_some_and(str::is_empty) {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if row["age"].as_i64().is_some_and(|age| age < 0) {
            errors.push(FieldError::new("age", "must not be negative"));
        }
        errors
    });
    Repository::new(engine, registry)
}

#[test]
fn validation_failure_aggregates_field_errors() {
    let mut repo = validating_repository();
    let mut bad = person(1, "", -4);
    repo.create(&mut bad).unwrap();

    let err = repo.save().unwrap_err();
    let RepoError::Validation(failed) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert_eq!(failed.errors.len(), 2);
    assert!(failed.message.contains("name: must not be empty"));
    assert!(failed.message.contains("age: must not be negative"));
}

#[test]
fn failed_save_preserves_staged_changes_for_retry() {
    let mut repo = validating_repository();
    let mut bad = person(1, "", 30);
    repo.create(&mut bad).unwrap();

    assert!(matches!(repo.save(), Err(RepoError::Validation(_))));
    // The staged change survives the failure...
    assert_eq!(repo.context().len(), 1);
    assert_eq!(repo.context().state_of(&bad), ChangeState::Added);

    // ...so a corrective update followed by a retry succeeds.
    bad.name = "alice".to_string();
    repo.update(&mut bad).unwrap();
    let report = repo.save().unwrap();
    assert_eq!(report.rows_affected, 1);
    assert_eq!(repo.count::<Person>(None).unwrap(), 1);
}
