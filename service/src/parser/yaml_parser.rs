//! YAML parser for models

use graphguard_core::error::{GraphGuardError, Result};
use graphguard_core::ModelDefinition;
use std::fs;
use std::path::Path;

use super::ModelParser;

/// `YAML` parser implementation
#[derive(Debug, Default)]
pub struct YamlParser;

impl YamlParser {
    /// Create a new `YAML` parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ModelParser for YamlParser {
    fn parse_str(&self, content: &str) -> Result<ModelDefinition> {
        let mut model: ModelDefinition = serde_yaml::from_str(content).map_err(|e| {
            GraphGuardError::parse_at(
                format!("YAML parsing error: {e}"),
                e.location().map_or_else(
                    || "unknown location".to_string(),
                    |l| format!("line {}, column {}", l.line(), l.column()),
                ),
            )
        })?;
        model.normalize_names();
        Ok(model)
    }

    fn parse_file(&self, path: &Path) -> Result<ModelDefinition> {
        let content = fs::read_to_string(path)?;

        self.parse_str(&content).map_err(|e| match e {
            GraphGuardError::ParseError { message, location } => GraphGuardError::ParseError {
                message: format!("{message} in file {}", path.display()),
                location,
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphguard_core::types::TypeKind;
    use pretty_assertions::assert_eq;

    const FLEET: &str = r"
name: fleet
groups:
  Strict: {}
  Checks:
    sequence: [Default, Strict]
constraints:
  ValidPlate:
    composed_of:
      - kind: NotBlank
      - kind: Size
        params: {min: 2, max: 10}
    report_as_single_violation: true
    message: invalid plate
types:
  Vehicle:
    kind: interface
    methods:
      - name: drive
        parameters:
          - name: speed
            type: Integer
            constraints: [{kind: Max, params: {value: 200}}]
  Car:
    interfaces: [Vehicle]
    properties:
      plate:
        type: String
        constraints: [{kind: ValidPlate}]
      passengers:
        type:
          name: List
          args:
            - {name: Person, cascade: true}
";

    #[test]
    fn test_parse_model() -> Result<()> {
        let model = YamlParser::new().parse_str(FLEET)?;
        assert_eq!(model.name, "fleet");
        assert_eq!(model.groups["Strict"].name, "Strict");
        assert_eq!(
            model.groups["Checks"].sequence.as_deref(),
            Some(&["Default".to_string(), "Strict".to_string()][..])
        );
        assert!(model.constraints["ValidPlate"].report_as_single_violation);

        let vehicle = &model.types["Vehicle"];
        assert_eq!(vehicle.kind, TypeKind::Interface);
        assert_eq!(vehicle.methods[0].signature(), "drive(Integer)");

        let passengers = &model.types["Car"].properties["passengers"];
        assert_eq!(passengers.name, "passengers");
        assert_eq!(passengers.type_use.to_string(), "List<Person>");
        assert!(passengers.type_use.args[0].cascade);
        Ok(())
    }

    #[test]
    fn test_parse_error_location() {
        let result = YamlParser::new().parse_str("types:\n  Car: [unclosed");
        assert!(matches!(
            result,
            Err(GraphGuardError::ParseError { location: Some(_), .. })
        ));
    }
}
