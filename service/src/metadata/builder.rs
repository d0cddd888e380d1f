//! Descriptor building
//!
//! Aggregates the declarations of a type and all of its supertypes into one
//! [`BeanDescriptor`]. Constraints are additive: a subtype adds constraints
//! and cascades, it never removes what a supertype declares.

use super::override_check::{self, MethodOverrideCheck};
use crate::descriptor::{
    BeanDescriptor, CascadingMetaData, ConstraintDescriptor, ConstraintSet,
    ContainerElementDescriptor, ContainerKind, ExecutableDescriptor, ParameterDescriptor,
    PropertyDescriptor, ReturnValueDescriptor,
};
use crate::validator::validators::ValidatorRegistry;
use graphguard_core::config::MetadataConfig;
use graphguard_core::traits::ROOT_TYPE;
use graphguard_core::types::{
    ConstraintAnnotation, MethodDefinition, PropertyDefinition, TypeDefinition, TypeUse,
};
use graphguard_core::{BuildError, DEFAULT_GROUP, ElementKind, ModelDefinition, TypeIntrospector};
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// A declaration site: declaring type plus the declared item
type Declared<'a, T> = (&'a str, &'a T);

/// Builds descriptors from a model
pub(crate) struct DescriptorBuilder<'a> {
    model: &'a ModelDefinition,
    registry: &'a ValidatorRegistry,
    config: &'a MetadataConfig,
    checks: &'a [Box<dyn MethodOverrideCheck>],
}

impl<'a> DescriptorBuilder<'a> {
    pub(crate) fn new(
        model: &'a ModelDefinition,
        registry: &'a ValidatorRegistry,
        config: &'a MetadataConfig,
        checks: &'a [Box<dyn MethodOverrideCheck>],
    ) -> Self {
        Self {
            model,
            registry,
            config,
            checks,
        }
    }

    /// Build the descriptor of `type_name`
    pub(crate) fn build(&self, type_name: &str) -> Result<BeanDescriptor, BuildError> {
        let hierarchy = self.hierarchy(type_name)?;
        trace!(
            type_name,
            hierarchy = ?hierarchy.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "linearized type hierarchy"
        );

        // Root-most declarations first, so merged lists read top-down.
        let ordered: Vec<&TypeDefinition> = hierarchy.iter().rev().copied().collect();

        let mut class_constraints = ConstraintSet::new();
        for definition in &ordered {
            for annotation in &definition.constraints {
                class_constraints.insert(self.constraint(annotation, &definition.name, ElementKind::Bean)?);
            }
        }

        let properties = self.properties(&ordered)?;

        if self.config.check_overrides
            && let Some(definition) = hierarchy.first()
        {
            for method in &definition.methods {
                override_check::check_all(self.model, self.checks, type_name, method)?;
            }
        }
        let executables = self.executables(&ordered)?;

        let default_group_sequence = hierarchy.first().and_then(|t| t.group_sequence.clone());

        Ok(BeanDescriptor::new(
            type_name,
            class_constraints,
            properties,
            executables,
            default_group_sequence,
        ))
    }

    /// `type_name` followed by its supertypes, breadth first, each once
    fn hierarchy(&self, type_name: &str) -> Result<Vec<&'a TypeDefinition>, BuildError> {
        let model = self.model;
        let start = model
            .type_definition(type_name)
            .ok_or_else(|| BuildError::UnknownType(type_name.to_string()))?;

        let mut linearized = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([type_name]);
        let mut queue = VecDeque::from([start]);
        while let Some(definition) = queue.pop_front() {
            linearized.push(definition);
            let parents = model
                .superclass(&definition.name)
                .filter(|s| *s != ROOT_TYPE)
                .into_iter()
                .chain(model.interfaces(&definition.name).iter().map(String::as_str));
            for parent in parents {
                if parent == type_name {
                    return Err(BuildError::CyclicHierarchy(type_name.to_string()));
                }
                if !seen.insert(parent) {
                    continue;
                }
                let parent_definition = model
                    .type_definition(parent)
                    .ok_or_else(|| BuildError::UnknownType(parent.to_string()))?;
                queue.push_back(parent_definition);
            }
        }
        Ok(linearized)
    }

    fn properties(
        &self,
        ordered: &[&'a TypeDefinition],
    ) -> Result<IndexMap<String, PropertyDescriptor>, BuildError> {
        let mut declarations: IndexMap<&str, Vec<Declared<'a, PropertyDefinition>>> = IndexMap::new();
        for definition in ordered {
            for (name, property) in &definition.properties {
                declarations
                    .entry(name.as_str())
                    .or_default()
                    .push((definition.name.as_str(), property));
            }
        }

        let mut properties = IndexMap::with_capacity(declarations.len());
        for (name, declared) in declarations {
            let constraints = self.merged_constraints(
                declared.iter().map(|(d, p)| (*d, p.constraints.as_slice())),
                ElementKind::Property,
            )?;
            let cascade = declared.iter().any(|(_, p)| p.cascade);
            let uses: Vec<Declared<'a, TypeUse>> = declared.iter().map(|(d, p)| (*d, &p.type_use)).collect();
            let cascading = self.cascading(&uses, cascade)?;
            let type_name = uses.last().map_or("", |(_, u)| u.name.as_str());
            properties.insert(
                name.to_string(),
                PropertyDescriptor::new(name, type_name, constraints, cascading),
            );
        }
        Ok(properties)
    }

    fn executables(
        &self,
        ordered: &[&'a TypeDefinition],
    ) -> Result<IndexMap<String, ExecutableDescriptor>, BuildError> {
        let mut declarations: IndexMap<String, Vec<Declared<'a, MethodDefinition>>> = IndexMap::new();
        for definition in ordered {
            for method in &definition.methods {
                declarations
                    .entry(method.signature())
                    .or_default()
                    .push((definition.name.as_str(), method));
            }
        }

        let mut executables = IndexMap::with_capacity(declarations.len());
        for (signature, declared) in declarations {
            let Some(&(_, most_specific)) = declared.last() else {
                continue;
            };

            let mut parameters = Vec::with_capacity(most_specific.parameters.len());
            for (index, parameter) in most_specific.parameters.iter().enumerate() {
                let sites: Vec<_> = declared
                    .iter()
                    .filter_map(|(d, m)| m.parameters.get(index).map(|p| (*d, p)))
                    .collect();
                let constraints = self.merged_constraints(
                    sites.iter().map(|(d, p)| (*d, p.constraints.as_slice())),
                    ElementKind::Parameter,
                )?;
                let uses: Vec<Declared<'a, TypeUse>> = sites.iter().map(|(d, p)| (*d, &p.type_use)).collect();
                let cascading = self.cascading(&uses, sites.iter().any(|(_, p)| p.cascade))?;
                parameters.push(ParameterDescriptor::new(index, &parameter.name, constraints, cascading));
            }

            let return_sites: Vec<_> = declared
                .iter()
                .filter_map(|(d, m)| m.return_value.as_ref().map(|r| (*d, r)))
                .collect();
            let return_value = if return_sites.is_empty() {
                None
            } else {
                let constraints = self.merged_constraints(
                    return_sites.iter().map(|(d, r)| (*d, r.constraints.as_slice())),
                    ElementKind::ReturnValue,
                )?;
                let uses: Vec<Declared<'a, TypeUse>> =
                    return_sites.iter().map(|(d, r)| (*d, &r.type_use)).collect();
                let cascading = self.cascading(&uses, return_sites.iter().any(|(_, r)| r.cascade))?;
                Some(ReturnValueDescriptor::new(constraints, cascading))
            };

            executables.insert(
                signature.clone(),
                ExecutableDescriptor::new(&most_specific.name, signature, parameters, return_value),
            );
        }
        Ok(executables)
    }

    /// Union of constraints over declaration sites; an annotation repeated
    /// verbatim by an override is kept once
    fn merged_constraints<'s>(
        &self,
        sites: impl Iterator<Item = (&'s str, &'s [ConstraintAnnotation])>,
        element_kind: ElementKind,
    ) -> Result<ConstraintSet, BuildError> {
        let mut constraints = ConstraintSet::new();
        let mut seen: Vec<&ConstraintAnnotation> = Vec::new();
        for (declaring, annotations) in sites {
            for annotation in annotations {
                if seen.contains(&annotation) {
                    continue;
                }
                seen.push(annotation);
                constraints.insert(self.constraint(annotation, declaring, element_kind)?);
            }
        }
        Ok(constraints)
    }

    /// Cascading metadata for a type used at several declaration sites
    ///
    /// The most specific site decides the container shape. `cascade` on a
    /// container itself applies to the container's values.
    fn cascading(&self, uses: &[Declared<'a, TypeUse>], cascade: bool) -> Result<CascadingMetaData, BuildError> {
        let Some(&(_, primary)) = uses.last() else {
            return Ok(CascadingMetaData::new(cascade, Vec::new()));
        };

        let Some(kind) = ContainerKind::from_type_name(&primary.name) else {
            if let Some((_, annotated)) = uses.iter().find(|(_, u)| u.args.iter().any(has_annotations)) {
                return Err(BuildError::InvalidTypeUse {
                    type_use: annotated.to_string(),
                    reason: format!("'{}' is not a container; its type arguments cannot be validated", annotated.name),
                });
            }
            return Ok(CascadingMetaData::new(cascade, Vec::new()));
        };

        let parameterized: Vec<Declared<'a, TypeUse>> =
            uses.iter().filter(|(_, u)| !u.args.is_empty()).copied().collect();
        for (_, type_use) in &parameterized {
            if type_use.name != primary.name {
                return Err(BuildError::InvalidTypeUse {
                    type_use: type_use.to_string(),
                    reason: format!("redeclared as '{primary}'"),
                });
            }
            if type_use.args.len() != kind.arity() {
                return Err(BuildError::InvalidTypeUse {
                    type_use: type_use.to_string(),
                    reason: format!("{kind} takes {} type argument(s)", kind.arity()),
                });
            }
        }

        let mut elements = Vec::new();
        for index in 0..kind.arity() {
            let legacy = cascade && index == kind.value_argument();
            let arg_uses: Vec<Declared<'a, TypeUse>> =
                parameterized.iter().map(|(d, u)| (*d, &u.args[index])).collect();

            let constraints = self.merged_constraints(
                arg_uses.iter().map(|(d, u)| (*d, u.constraints.as_slice())),
                ElementKind::ContainerElement,
            )?;
            let arg_cascade = legacy || arg_uses.iter().any(|(_, u)| u.cascade);
            let nested = self.cascading(&arg_uses, arg_cascade)?;
            let type_name = arg_uses.last().map_or(ROOT_TYPE, |(_, u)| u.name.as_str());

            let element = ContainerElementDescriptor::new(kind, index, type_name, constraints, nested);
            if element.is_relevant() {
                elements.push(Arc::new(element));
            }
        }

        Ok(CascadingMetaData::new(false, elements))
    }

    /// Build one constraint declaration
    fn constraint(
        &self,
        annotation: &ConstraintAnnotation,
        declaring: &str,
        element_kind: ElementKind,
    ) -> Result<Arc<ConstraintDescriptor>, BuildError> {
        self.constraint_in(annotation, declaring, element_kind, None, &mut Vec::new())
    }

    fn constraint_in(
        &self,
        annotation: &ConstraintAnnotation,
        declaring: &str,
        element_kind: ElementKind,
        inherited_groups: Option<&[String]>,
        composing: &mut Vec<String>,
    ) -> Result<Arc<ConstraintDescriptor>, BuildError> {
        if composing.contains(&annotation.kind) {
            return Err(BuildError::RecursiveComposition(annotation.kind.clone()));
        }

        let groups: Vec<String> = match inherited_groups {
            Some(groups) => groups.to_vec(),
            None if annotation.groups.is_empty() => vec![DEFAULT_GROUP.to_string()],
            None => annotation.groups.clone(),
        };
        if let Some(unknown) = groups
            .iter()
            .find(|g| g.as_str() != DEFAULT_GROUP && !self.model.groups.contains_key(g.as_str()))
        {
            return Err(BuildError::UnknownGroup(unknown.clone()));
        }

        let composition = self.model.constraints.get(&annotation.kind);
        let factory = self.registry.get(&annotation.kind);
        if composition.is_none() && factory.is_none() {
            return Err(BuildError::UnknownConstraint(annotation.kind.clone()));
        }

        let mut params = factory.map(|f| f.default_params()).unwrap_or_default();
        for (name, value) in &annotation.params {
            params.insert(name.clone(), value.clone());
        }

        let message = annotation
            .message
            .clone()
            .or_else(|| composition.and_then(|c| c.message.clone()))
            .or_else(|| factory.map(|f| f.default_message().to_string()));

        let mut builder = ConstraintDescriptor::builder(&annotation.kind)
            .params(params)
            .groups(groups.clone())
            .declared_on(declaring, element_kind);
        if let Some(message) = message {
            builder = builder.message_template(message);
        }
        if let Some(factory) = factory {
            builder = builder.validator(factory.create(&annotation.kind, &annotation.params)?);
        }
        if let Some(composition) = composition {
            composing.push(annotation.kind.clone());
            for child in &composition.composed_of {
                builder = builder.composed_of(self.constraint_in(
                    child,
                    declaring,
                    element_kind,
                    Some(&groups),
                    composing,
                )?);
            }
            composing.pop();
            builder = builder.report_as_single_violation(composition.report_as_single_violation);
        }

        Ok(Arc::new(builder.build()))
    }
}

fn has_annotations(type_use: &TypeUse) -> bool {
    !type_use.constraints.is_empty() || type_use.cascade || type_use.args.iter().any(has_annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphguard_core::types::{
        ComposedConstraintDefinition, GroupDefinition, ParameterDefinition, ReturnValueDefinition,
    };
    use pretty_assertions::assert_eq;

    fn build(model: &ModelDefinition, type_name: &str) -> Result<BeanDescriptor, BuildError> {
        let registry = ValidatorRegistry::default();
        let config = MetadataConfig::default();
        let checks = override_check::default_checks();
        DescriptorBuilder::new(model, &registry, &config, &checks).build(type_name)
    }

    fn not_null() -> ConstraintAnnotation {
        ConstraintAnnotation::new("NotNull")
    }

    #[test]
    fn test_properties_merge_across_hierarchy() -> Result<(), BuildError> {
        let model = ModelDefinition::new("cars")
            .with_type(
                TypeDefinition::interface("Named")
                    .property("name", PropertyDefinition::new("String").constrained(not_null())),
            )
            .with_type(
                TypeDefinition::class("Vehicle").implements("Named").property(
                    "name",
                    PropertyDefinition::new("String")
                        .constrained(ConstraintAnnotation::new("Size").with_param("min", 2)),
                ),
            )
            .with_type(
                TypeDefinition::class("Car")
                    .extends("Vehicle")
                    .property("owner", PropertyDefinition::new("Person").cascaded()),
            );
        let car = build(&model, "Car")?;
        let name = car.property("name").ok_or(BuildError::UnknownType("name".into()))?;
        assert_eq!(name.constraints().kinds().collect::<Vec<_>>(), vec!["NotNull", "Size"]);
        assert_eq!(name.constraints().get("NotNull")[0].declaring_type(), "Named");
        assert!(car.property("owner").is_some_and(|p| p.cascading().is_cascading()));
        Ok(())
    }

    #[test]
    fn test_unknown_supertype_and_cycles() {
        let model = ModelDefinition::new("broken").with_type(TypeDefinition::class("Car").extends("Ghost"));
        assert_eq!(build(&model, "Car").err(), Some(BuildError::UnknownType("Ghost".into())));
        assert_eq!(build(&model, "Nope").err(), Some(BuildError::UnknownType("Nope".into())));

        let model = ModelDefinition::new("loop")
            .with_type(TypeDefinition::interface("A").implements("B"))
            .with_type(TypeDefinition::interface("B").implements("A"));
        assert_eq!(build(&model, "A").err(), Some(BuildError::CyclicHierarchy("A".into())));
    }

    #[test]
    fn test_map_value_cascade_tree() -> Result<(), BuildError> {
        let model = ModelDefinition::new("parts").with_type(TypeDefinition::class("Car").property(
            "partManufacturers",
            PropertyDefinition::new(TypeUse::map(
                TypeUse::named("String").constrained(not_null()),
                TypeUse::list(TypeUse::named("Manufacturer").cascaded()),
            )),
        ));
        let car = build(&model, "Car")?;
        let cascading = car
            .property("partManufacturers")
            .map(PropertyDescriptor::cascading)
            .ok_or(BuildError::UnknownType("partManufacturers".into()))?;
        assert!(!cascading.is_cascading());
        let key = cascading.container_element(0).ok_or(BuildError::UnknownType("key".into()))?;
        assert_eq!(key.constraints().len(), 1);
        assert!(!key.cascading().is_marked_for_traversal());
        let value = cascading.container_element(1).ok_or(BuildError::UnknownType("value".into()))?;
        let element = value
            .cascading()
            .container_element(0)
            .ok_or(BuildError::UnknownType("element".into()))?;
        assert!(element.cascading().is_cascading());
        assert_eq!(element.type_name(), "Manufacturer");
        Ok(())
    }

    #[test]
    fn test_unannotated_arguments_pruned_and_legacy_cascade() -> Result<(), BuildError> {
        let model = ModelDefinition::new("legacy")
            .with_type(TypeDefinition::class("Garage").property(
                "cars",
                PropertyDefinition::new(TypeUse::map("String", "Car")).cascaded(),
            ))
            .with_type(TypeDefinition::class("Lot").property("cars", PropertyDefinition::new(TypeUse::list("Car"))));
        let garage = build(&model, "Garage")?;
        let cascading = garage
            .property("cars")
            .map(PropertyDescriptor::cascading)
            .ok_or(BuildError::UnknownType("cars".into()))?;
        assert!(cascading.container_element(0).is_none());
        assert!(cascading.container_element(1).is_some_and(|c| c.cascading().is_cascading()));

        let lot = build(&model, "Lot")?;
        assert!(!lot.property("cars").is_some_and(PropertyDescriptor::is_constrained));
        Ok(())
    }

    #[test]
    fn test_invalid_type_uses() {
        let model = ModelDefinition::new("bad").with_type(TypeDefinition::class("Car").property(
            "owner",
            PropertyDefinition::new(TypeUse {
                name: "Person".into(),
                args: vec![TypeUse::named("X").cascaded()],
                ..TypeUse::default()
            }),
        ));
        assert!(matches!(build(&model, "Car"), Err(BuildError::InvalidTypeUse { .. })));

        let model = ModelDefinition::new("bad").with_type(TypeDefinition::class("Car").property(
            "index",
            PropertyDefinition::new(TypeUse {
                name: "Map".into(),
                args: vec![TypeUse::named("X")],
                ..TypeUse::default()
            }),
        ));
        assert!(matches!(build(&model, "Car"), Err(BuildError::InvalidTypeUse { .. })));
    }

    #[test]
    fn test_composition_inherits_groups_and_detects_recursion() -> Result<(), BuildError> {
        let model = ModelDefinition::new("composed")
            .with_group(GroupDefinition::new("Strict"))
            .with_constraint(
                "ValidPlate",
                ComposedConstraintDefinition {
                    composed_of: vec![
                        not_null(),
                        ConstraintAnnotation::new("Size").with_param("min", 2).with_param("max", 14),
                    ],
                    report_as_single_violation: true,
                    message: Some("invalid plate".into()),
                },
            )
            .with_type(TypeDefinition::class("Car").property(
                "plate",
                PropertyDefinition::new("String")
                    .constrained(ConstraintAnnotation::new("ValidPlate").in_groups(["Strict"])),
            ));
        let car = build(&model, "Car")?;
        let plate = &car
            .property("plate")
            .ok_or(BuildError::UnknownType("plate".into()))?
            .constraints()
            .get("ValidPlate")[0];
        assert!(plate.report_as_single_violation());
        assert_eq!(plate.message_template(), "invalid plate");
        assert_eq!(plate.composing_constraints().len(), 2);
        assert!(plate.composing_constraints().iter().all(|c| c.groups() == ["Strict"]));
        assert_eq!(plate.composing_constraints()[1].params()["max"], 14);

        let model = ModelDefinition::new("loop")
            .with_constraint(
                "Ouroboros",
                ComposedConstraintDefinition {
                    composed_of: vec![ConstraintAnnotation::new("Ouroboros")],
                    ..ComposedConstraintDefinition::default()
                },
            )
            .with_type(
                TypeDefinition::class("Car")
                    .property("x", PropertyDefinition::new("String").constrained(ConstraintAnnotation::new("Ouroboros"))),
            );
        assert_eq!(
            build(&model, "Car").err(),
            Some(BuildError::RecursiveComposition("Ouroboros".into()))
        );
        Ok(())
    }

    #[test]
    fn test_unknown_kind_group_and_malformed_params() {
        let with = |annotation: ConstraintAnnotation| {
            ModelDefinition::new("m")
                .with_type(TypeDefinition::class("Car").property("x", PropertyDefinition::new("String").constrained(annotation)))
        };
        assert_eq!(
            build(&with(ConstraintAnnotation::new("Shiny")), "Car").err(),
            Some(BuildError::UnknownConstraint("Shiny".into()))
        );
        assert_eq!(
            build(&with(not_null().in_groups(["Ghost"])), "Car").err(),
            Some(BuildError::UnknownGroup("Ghost".into()))
        );
        assert!(matches!(
            build(&with(ConstraintAnnotation::new("Pattern").with_param("regexp", "(")), "Car"),
            Err(BuildError::MalformedParameter { .. })
        ));
    }

    #[test]
    fn test_executables_merge_and_dedupe() -> Result<(), BuildError> {
        let drive = |cascade: bool| {
            let parameter = ParameterDefinition::new("speed", "Integer").constrained(not_null());
            let rv = ReturnValueDefinition::new("Route");
            MethodDefinition::new("drive")
                .parameter(parameter)
                .returns(if cascade { rv.cascaded() } else { rv })
        };
        let model = ModelDefinition::new("exec")
            .with_type(TypeDefinition::class("Vehicle").method(drive(false)))
            .with_type(TypeDefinition::class("Car").extends("Vehicle").method(drive(true)));
        let car = build(&model, "Car")?;
        let drive = car
            .executable("drive(Integer)")
            .ok_or(BuildError::UnknownType("drive".into()))?;
        assert_eq!(drive.parameters()[0].constraints().len(), 1);
        assert!(drive.return_value().is_some_and(|r| r.cascading().is_cascading()));
        Ok(())
    }

    #[test]
    fn test_default_group_sequence_is_not_inherited() -> Result<(), BuildError> {
        let model = ModelDefinition::new("seq")
            .with_group(GroupDefinition::new("Strict"))
            .with_type(TypeDefinition::class("Vehicle").group_sequence(["Vehicle", "Strict"]))
            .with_type(TypeDefinition::class("Car").extends("Vehicle"));
        assert_eq!(
            build(&model, "Vehicle")?.default_group_sequence(),
            Some(["Vehicle".to_string(), "Strict".to_string()].as_slice())
        );
        assert_eq!(build(&model, "Car")?.default_group_sequence(), None);
        Ok(())
    }
}
