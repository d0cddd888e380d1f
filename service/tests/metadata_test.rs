//! Metadata aggregation seen through the engine: hierarchy merging, override
//! checks, composed constraints, executables and custom validators

mod helpers;

use graphguard_core::types::{
    ComposedConstraintDefinition, ConstraintAnnotation, MethodDefinition, ParameterDefinition, PropertyDefinition,
    ReturnValueDefinition, TypeDefinition, TypeUse,
};
use graphguard_core::{
    AccessError, BuildError, ConstraintValidator, ElementKind, GraphGuardError, ModelDefinition, ObjectGraph, Value,
};
use graphguard_service::descriptor::Parameters;
use graphguard_service::validator::ConstraintValidatorFactory;
use graphguard_service::ValidationEngine;
use helpers::{DEFAULT, not_null};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn max(value: i64) -> ConstraintAnnotation {
    ConstraintAnnotation::new("Max").with_param("value", value)
}

fn size(min: i64, max: i64) -> ConstraintAnnotation {
    ConstraintAnnotation::new("Size").with_param("min", min).with_param("max", max)
}

#[test]
fn test_constraints_merge_across_hierarchy() -> graphguard_core::Result<()> {
    let model = ModelDefinition::new("vehicles")
        .with_type(TypeDefinition::interface("Registered").property(
            "plate",
            PropertyDefinition::new("String").constrained(not_null()),
        ))
        .with_type(
            TypeDefinition::class("Vehicle")
                .implements("Registered")
                .property("wheels", PropertyDefinition::new("Integer").constrained(max(18))),
        )
        .with_type(
            TypeDefinition::class("Car")
                .extends("Vehicle")
                .property("plate", PropertyDefinition::new("String").constrained(size(2, 10)))
                .property("wheels", PropertyDefinition::new("Integer").constrained(max(4))),
        );
    let engine = ValidationEngine::new(model)?;

    let descriptor = engine.bean_descriptor("Car")?;
    let plate = descriptor.property("plate").map(|p| p.constraints().kinds().collect::<Vec<_>>());
    assert_eq!(plate, Some(vec!["NotNull", "Size"]));

    let mut graph = ObjectGraph::new();
    let car = graph.insert_with("Car", [("plate", Value::from("X")), ("wheels", Value::Integer(6))]);
    let mut report = engine.validate(&graph, car, DEFAULT)?;
    report.sort();
    let found: Vec<String> = report.violations().iter().map(ToString::to_string).collect();
    assert_eq!(
        found,
        vec![
            "[Size] plate: size must be between 2 and 10",
            "[Max] wheels: must be less than or equal to 4",
        ]
    );
    Ok(())
}

fn diamond(right_limit: i64) -> ModelDefinition {
    let drive = |limit: i64| {
        MethodDefinition::new("drive").parameter(ParameterDefinition::new("speed", "Integer").constrained(max(limit)))
    };
    ModelDefinition::new("diamond")
        .with_type(TypeDefinition::interface("Left").method(drive(100)))
        .with_type(TypeDefinition::interface("Right").method(drive(right_limit)))
        .with_type(
            TypeDefinition::class("Car")
                .implements("Left")
                .implements("Right")
                .method(drive(100)),
        )
}

#[test]
fn test_diamond_override_reports_second_type() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(diamond(200))?;
    match engine.bean_descriptor("Car") {
        Err(GraphGuardError::Build(BuildError::OverrideInconsistency {
            rule,
            method,
            declaring_type,
            conflicting_type,
        })) => {
            assert_eq!(rule, "parameter-constraints-must-match");
            assert_eq!(method, "drive(Integer)");
            assert_eq!(declaring_type, "Car");
            assert_eq!(conflicting_type, "Right");
        }
        other => panic!("expected OverrideInconsistency, got {other:?}"),
    }

    let consistent = ValidationEngine::new(diamond(100))?;
    assert!(consistent.bean_descriptor("Car").is_ok());

    let mut config = graphguard_core::GraphGuardConfig::default();
    config.metadata.check_overrides = false;
    let unchecked = ValidationEngine::builder(diamond(200)).config(config).build()?;
    assert!(unchecked.bean_descriptor("Car").is_ok());
    Ok(())
}

fn plate_model(single: bool) -> ModelDefinition {
    ModelDefinition::new("plates")
        .with_constraint(
            "ValidPlate",
            ComposedConstraintDefinition {
                composed_of: vec![ConstraintAnnotation::new("NotBlank"), size(2, 10)],
                report_as_single_violation: single,
                message: Some("invalid plate".into()),
            },
        )
        .with_type(TypeDefinition::class("Car").property(
            "plate",
            PropertyDefinition::new("String").constrained(ConstraintAnnotation::new("ValidPlate")),
        ))
}

#[test]
fn test_composed_constraint_reported_once() -> graphguard_core::Result<()> {
    let mut graph = ObjectGraph::new();
    let car = graph.insert_with("Car", [("plate", " ")]);

    let single = ValidationEngine::new(plate_model(true))?.validate(&graph, car, DEFAULT)?;
    assert_eq!(single.len(), 1);
    assert_eq!(single.violations()[0].constraint().kind(), "ValidPlate");
    assert_eq!(single.violations()[0].message(), "invalid plate");

    let separate = ValidationEngine::new(plate_model(false))?.validate(&graph, car, DEFAULT)?;
    let kinds: Vec<&str> = separate.violations().iter().map(|v| v.constraint().kind()).collect();
    assert_eq!(kinds, vec!["NotBlank", "Size"]);
    Ok(())
}

fn fleet_model() -> ModelDefinition {
    ModelDefinition::new("fleet")
        .with_type(TypeDefinition::class("Trip").property(
            "destination",
            PropertyDefinition::new("String").constrained(not_null()),
        ))
        .with_type(
            TypeDefinition::class("Car")
                .method(
                    MethodDefinition::new("drive")
                        .parameter(ParameterDefinition::new("speed", "Integer").constrained(max(200)))
                        .parameter(
                            ParameterDefinition::new(
                                "stops",
                                TypeUse::list(TypeUse::named("String").constrained(ConstraintAnnotation::new("NotBlank"))),
                            ),
                        ),
                )
                .method(MethodDefinition::new("plan").returns(ReturnValueDefinition::new("Trip").cascaded().constrained(not_null()))),
        )
}

#[test]
fn test_parameter_validation() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(fleet_model())?;
    let mut graph = ObjectGraph::new();
    let car = graph.insert("Car");

    let args = [Value::Integer(250), Value::List(vec![Value::from("Oslo"), Value::from("")])];
    let mut report = engine.validate_parameters(&graph, car, "drive(Integer,List)", &args, DEFAULT)?;
    report.sort();
    let paths: Vec<String> = report.violations().iter().map(|v| v.path().to_string()).collect();
    assert_eq!(paths, vec!["drive.speed", "drive.stops[1]"]);
    assert_eq!(report.violations()[0].constraint().element_kind(), ElementKind::Parameter);

    assert!(matches!(
        engine.validate_parameters(&graph, car, "drive(Integer,List)", &args[..1], DEFAULT),
        Err(GraphGuardError::Access(AccessError::MissingArgument { index: 1, .. }))
    ));
    assert!(matches!(
        engine.validate_parameters(&graph, car, "fly()", &[], DEFAULT),
        Err(GraphGuardError::Access(AccessError::MissingMethod { .. }))
    ));
    Ok(())
}

#[test]
fn test_return_value_validation_cascades() -> graphguard_core::Result<()> {
    let engine = ValidationEngine::new(fleet_model())?;
    let mut graph = ObjectGraph::new();
    let car = graph.insert("Car");
    let trip = graph.insert("Trip");

    let report = engine.validate_return_value(&graph, car, "plan()", &Value::Object(trip), DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "plan.<return value>.destination");

    let report = engine.validate_return_value(&graph, car, "plan()", &Value::Null, DEFAULT)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path().to_string(), "plan.<return value>");

    let report = engine.validate_return_value(&graph, car, "drive(Integer,List)", &Value::Null, DEFAULT)?;
    assert!(report.is_valid());
    Ok(())
}

/// Even integers only; fails loudly on anything that is not a number
struct EvenFactory;

impl ConstraintValidatorFactory for EvenFactory {
    fn default_message(&self) -> &str {
        "must be even"
    }

    fn create(&self, _kind: &str, _params: &Parameters) -> Result<Arc<dyn ConstraintValidator>, BuildError> {
        Ok(Arc::new(|value: &Value| -> anyhow::Result<bool> {
            match value {
                Value::Null => Ok(true),
                Value::Integer(i) => Ok(i % 2 == 0),
                other => anyhow::bail!("cannot check parity of {}", other.shape()),
            }
        }))
    }
}

#[test]
fn test_custom_validator_and_its_failures() -> graphguard_core::Result<()> {
    let model = ModelDefinition::new("custom").with_type(TypeDefinition::class("Box").property(
        "count",
        PropertyDefinition::new("Integer").constrained(ConstraintAnnotation::new("Even")),
    ));
    let engine = ValidationEngine::builder(model.clone()).validator("Even", EvenFactory).build()?;
    let mut graph = ObjectGraph::new();
    let odd = graph.insert_with("Box", [("count", 3_i64)]);
    let text = graph.insert_with("Box", [("count", "three")]);

    let report = engine.validate(&graph, odd, DEFAULT)?;
    assert_eq!(report.violations()[0].message(), "must be even");

    match engine.validate(&graph, text, DEFAULT) {
        Err(GraphGuardError::Validator(error)) => {
            assert_eq!(error.constraint, "Even");
            assert_eq!(error.path, "count");
            assert!(error.source.to_string().contains("text"));
        }
        other => panic!("expected ValidatorError, got {other:?}"),
    }

    let without = ValidationEngine::new(model)?;
    assert!(matches!(
        without.validate(&graph, odd, DEFAULT),
        Err(GraphGuardError::Build(BuildError::UnknownConstraint(kind))) if kind == "Even"
    ));
    Ok(())
}
