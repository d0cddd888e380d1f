//! Model parsing
//!
//! Loads [`ModelDefinition`]s and [`ObjectGraph`]s from YAML or JSON.
//! Map-keyed definitions may leave their `name` out; parsed models are
//! normalized so every type, property and group knows its own name.

use graphguard_core::error::{GraphGuardError, Result};
use graphguard_core::{ModelDefinition, ObjectGraph};
use std::path::Path;

pub mod json_parser;
pub mod yaml_parser;

pub use json_parser::JsonParser;
pub use yaml_parser::YamlParser;

/// Trait for model parsers
pub trait ModelParser: Send + Sync {
    /// Parse a model from string content
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the content is malformed
    fn parse_str(&self, content: &str) -> Result<ModelDefinition>;

    /// Parse a model from a file
    ///
    /// # Errors
    ///
    /// Returns an `IoError` if the file cannot be read, or a `ParseError`
    /// naming the file if its content is malformed
    fn parse_file(&self, path: &Path) -> Result<ModelDefinition>;
}

/// Source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `YAML`
    Yaml,
    /// `JSON`
    Json,
}

impl Format {
    /// Detect the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for a missing or unsupported extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GraphGuardError::parse(format!("No file extension found: {}", path.display())))?;

        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(GraphGuardError::parse(format!(
                "Unsupported file format: {extension}"
            ))),
        }
    }
}

/// Main parser that delegates to format-specific parsers
#[derive(Debug, Default)]
pub struct Parser {
    yaml: YamlParser,
    json: JsonParser,
}

impl Parser {
    /// Create a new parser
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a model file, detecting the format from its extension
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for an unsupported extension or malformed
    /// content, or an `IoError` if the file cannot be read
    pub fn parse_file(&self, path: &Path) -> Result<ModelDefinition> {
        tracing::debug!(path = %path.display(), "loading model");
        match Format::from_path(path)? {
            Format::Yaml => self.yaml.parse_file(path),
            Format::Json => self.json.parse_file(path),
        }
    }

    /// Parse a model from a string in the given format
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for malformed content
    pub fn parse_str(&self, content: &str, format: Format) -> Result<ModelDefinition> {
        match format {
            Format::Yaml => self.yaml.parse_str(content),
            Format::Json => self.json.parse_str(content),
        }
    }

    /// Parse an object graph from a string in the given format
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` for malformed content
    pub fn parse_graph_str(&self, content: &str, format: Format) -> Result<ObjectGraph> {
        match format {
            Format::Yaml => serde_yaml::from_str(content)
                .map_err(|e| GraphGuardError::parse(format!("YAML object graph error: {e}"))),
            Format::Json => serde_json::from_str(content)
                .map_err(|e| GraphGuardError::parse(format!("JSON object graph error: {e}"))),
        }
    }

    /// Parse an object graph file, detecting the format from its extension
    ///
    /// # Errors
    ///
    /// As [`Parser::parse_file`]
    pub fn parse_graph_file(&self, path: &Path) -> Result<ObjectGraph> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        self.parse_graph_str(&content, format)
    }
}
