//! JSON parser for models

use graphguard_core::error::{GraphGuardError, Result};
use graphguard_core::ModelDefinition;
use std::fs;
use std::path::Path;

use super::ModelParser;

/// `JSON` parser implementation
#[derive(Debug, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Create a new `JSON` parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ModelParser for JsonParser {
    fn parse_str(&self, content: &str) -> Result<ModelDefinition> {
        let mut model: ModelDefinition = serde_json::from_str(content).map_err(|e| {
            GraphGuardError::parse_at(
                format!("JSON parsing error: {e}"),
                format!("line {}, column {}", e.line(), e.column()),
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
