//! Document parsing for JSON and YAML sources
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::error::{SchemaError, SchemaResult};
use serde_json::Value;
use std::path::Path;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> SchemaResult<Self> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            match extension.to_lowercase().as_str() {
                "yaml" | "yml" => Ok(Format::Yaml),
                "json" => Ok(Format::Json),
                _ => Err(SchemaError::unsupported_format(path.to_path_buf())),
            }
        } else {
            Err(SchemaError::unsupported_format(path.to_path_buf()))
        }
    }

    /// Get file extensions for this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
        }
    }
}

/// Parser turning text into a JSON value tree
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl DocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a file, detecting format from its extension
    ///
    /// Files without a recognized extension are tried as JSON, then YAML.
    pub fn parse_file(&self, path: &Path) -> SchemaResult<Value> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::io_error(path.to_path_buf(), e))?;
        let origin = path.display().to_string();

        match Format::from_path(path) {
            Ok(format) => self.parse_content(&content, format, &origin),
            Err(_) => self.parse_with_fallback(&content, &origin),
        }
    }

    /// Parse content with an explicit format
    pub fn parse_content(&self, content: &str, format: Format, origin: &str) -> SchemaResult<Value> {
        match format {
            Format::Yaml => self.parse_yaml(content, origin),
            Format::Json => self.parse_json(content, origin),
        }
    }

    /// Parse YAML content
    pub fn parse_yaml(&self, content: &str, origin: &str) -> SchemaResult<Value> {
        // Parse as YAML first so YAML-specific errors surface as such
        let yaml_value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| SchemaError::yaml_parse_error(origin, e))?;

        serde_json::to_value(yaml_value).map_err(|e| SchemaError::json_parse_error(origin, e))
    }

    /// Parse JSON content
    pub fn parse_json(&self, content: &str, origin: &str) -> SchemaResult<Value> {
        serde_json::from_str(content).map_err(|e| SchemaError::json_parse_error(origin, e))
    }

    /// Try JSON, then YAML; reports the JSON error when both fail
    pub fn parse_with_fallback(&self, content: &str, origin: &str) -> SchemaResult<Value> {
        match self.parse_json(content, origin) {
            Ok(value) => Ok(value),
            Err(json_error) => self.parse_yaml(content, origin).map_err(|_| json_error),
        }
    }
}
