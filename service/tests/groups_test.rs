//! Group resolution and sequencing

mod helpers;

use graphguard_core::types::{ConstraintAnnotation, GroupDefinition, PropertyDefinition, TypeDefinition};
use graphguard_core::{BuildError, GraphGuardError, ModelDefinition, ObjectGraph, Value};
use graphguard_service::{GroupResolver, ValidationEngine};
use helpers::{DEFAULT, not_null};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;

fn min(value: i64) -> ConstraintAnnotation {
    ConstraintAnnotation::new("Min").with_param("value", value)
}

/// `Car` validates its plate first and its seat count only once the plate
/// is fine; `Basic` and `Extended` form an inheritance pair
fn car_model() -> ModelDefinition {
    ModelDefinition::new("cars")
        .with_group(GroupDefinition::new("Basic"))
        .with_group(GroupDefinition::new("Extended").extending("Basic"))
        .with_group(GroupDefinition::new("Strict"))
        .with_group(GroupDefinition::sequence("Full", ["Basic", "Strict"]))
        .with_type(
            TypeDefinition::class("Car")
                .group_sequence(["Car", "Strict"])
                .property("plate", PropertyDefinition::new("String").constrained(not_null()))
                .property("seats", PropertyDefinition::new("Integer").constrained(min(2).in_groups(["Strict"])))
                .property(
                    "vin",
                    PropertyDefinition::new("String").constrained(not_null().in_groups(["Basic"])),
                )
                .property(
                    "owner",
                    PropertyDefinition::new("Person").cascaded(),
                ),
        )
        .with_type(
            TypeDefinition::class("Person")
                .group_sequence(["Strict", "Person"])
                .property("name", PropertyDefinition::new("String").constrained(not_null()))
                .property("age", PropertyDefinition::new("Integer").constrained(min(18).in_groups(["Strict"]))),
        )
}

#[test]
fn test_redefined_default_sequence_short_circuits() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(car_model())?;
    let mut graph = ObjectGraph::new();
    let car = graph.insert_with("Car", [("seats", 1_i64)]);

    let report = engine.validate(&graph, car, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].constraint().kind(), "NotNull");
    assert_eq!(report.stats().sequences_short_circuited, 1);

    graph.set(car, "plate", "AB-123")?;
    let report = engine.validate(&graph, car, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "seats");
    Ok(())
}

#[test]
fn test_cascaded_objects_run_their_own_default_sequence() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(car_model())?;
    let mut graph = ObjectGraph::new();
    let owner = graph.insert_with("Person", [("age", 12_i64)]);
    let car = graph.insert_with(
        "Car",
        [("plate", Value::from("AB-123")), ("seats", Value::Integer(4)), ("owner", Value::Object(owner))],
    );

    // Person validates Strict before its own Default constraints, so the
    // missing name is never reached.
    let report = engine.validate(&graph, car, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "owner.age");
    assert_eq!(report.stats().sequences_short_circuited, 2);

    let report = engine.validate(&graph, owner, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "age");

    graph.set(owner, "age", 30_i64)?;
    let report = engine.validate(&graph, car, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "owner.name");
    Ok(())
}

#[test]
fn test_cascaded_objects_keep_explicit_groups() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(car_model())?;
    let mut graph = ObjectGraph::new();
    let owner = graph.insert_with("Person", [("age", 12_i64)]);
    let car = graph.insert_with("Car", [("vin", Value::from("WVW")), ("owner", Value::Object(owner))]);

    // Only Default is replaced by a type's sequence.
    let report = engine.validate(&graph, car, &["Strict"])?;
    let paths: Vec<String> = report.violations().iter().map(|v| v.path().to_string()).collect();
    assert_eq!(paths, vec!["owner.age"]);
    assert_eq!(report.stats().sequences_short_circuited, 0);
    Ok(())
}

#[test]
fn test_mutual_references_with_default_sequences_terminate() -> graphguard_core::Result<()> {
    let model = car_model().with_type(
        TypeDefinition::class("Person")
            .group_sequence(["Strict", "Person"])
            .property("name", PropertyDefinition::new("String").constrained(not_null()))
            .property("age", PropertyDefinition::new("Integer").constrained(min(18).in_groups(["Strict"])))
            .property("friend", PropertyDefinition::new("Person").cascaded()),
    );
    let engine = ValidationEngine::new(model)?;
    let mut graph = ObjectGraph::new();
    let a = graph.insert_with("Person", [("age", 30_i64)]);
    let b = graph.insert_with("Person", [("age", Value::Integer(40)), ("friend", Value::Object(a))]);
    graph.set(a, "friend", b)?;

    let report = engine.validate(&graph, a, DEFAULT)?;
    let mut paths: Vec<String> = report.violations().iter().map(|v| v.path().to_string()).collect();
    paths.sort();
    assert_eq!(paths, vec!["friend.name", "name"]);
    Ok(())
}

#[test]
fn test_inherited_groups_are_validated() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(car_model())?;
    let mut graph = ObjectGraph::new();
    let car = graph.insert("Car");

    let report = engine.validate(&graph, car, &["Extended"])?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "vin");

    let report = engine.validate(&graph, car, &["Strict"])?;
    assert!(report.is_valid());
    Ok(())
}

#[test]
fn test_named_sequence_stops_at_first_failing_group() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(car_model())?;
    let mut graph = ObjectGraph::new();
    let car = graph.insert_with("Car", [("seats", 1_i64)]);

    let report = engine.validate(&graph, car, &["Full"])?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "vin");

    graph.set(car, "vin", "WVW")?;
    let report = engine.validate(&graph, car, &["Full"])?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "seats");
    Ok(())
}

#[test]
fn test_invalid_group_definitions() {
    let cyclic = ModelDefinition::new("cyclic")
        .with_group(GroupDefinition::sequence("A", ["B"]))
        .with_group(GroupDefinition::sequence("B", ["A"]));
    assert!(matches!(
        ValidationEngine::new(cyclic),
        Err(GraphGuardError::Build(BuildError::CyclicSequence { .. }))
    ));

    let dangling = ModelDefinition::new("dangling").with_group(GroupDefinition::new("A").extending("Ghost"));
    assert!(matches!(
        ValidationEngine::new(dangling),
        Err(GraphGuardError::Build(BuildError::UnknownGroup(name))) if name == "Ghost"
    ));
}

fn arb_request() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec!["Default", "Basic", "Extended", "Strict", "Full"]),
        0..6,
    )
}

proptest! {
    /// Resolution is deterministic and requesting a group twice changes
    /// nothing
    #[test]
    fn prop_resolution_is_idempotent(request in arb_request(), root in prop::sample::select(vec!["Car", "Person"])) {
        let resolver = GroupResolver::new(&car_model()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let once = resolver.resolve(&request, Some(root)).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let again = resolver.resolve(&request, Some(root)).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&once, &again);

        let doubled: Vec<&str> = request.iter().chain(request.iter()).copied().collect();
        let deduped = resolver.resolve(&doubled, Some(root)).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&once, &deduped);

        let units: HashSet<&str> = once.units().iter().map(|u| u.name()).collect();
        prop_assert_eq!(units.len(), once.len());
    }
}
