//! Error types for schema loading, compilation and instance loading
//!
//! Validation findings are not errors: they live in
//! [`ValidationResult`](crate::validation::ValidationResult). The types here
//! cover everything that aborts a loader session or an instance load.
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader, compiler and instance operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Fatal errors raised while loading or compiling schemas
#[derive(Error, Debug)]
pub enum SchemaError {
    /// File I/O errors
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON from {origin}: {source}")]
    JsonParse {
        origin: String,
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("Failed to parse YAML from {origin}: {source}")]
    YamlParse {
        origin: String,
        source: serde_yaml::Error,
    },

    /// Unsupported file format
    #[error("Unsupported file format for '{path}'. Expected .yaml, .yml, or .json")]
    UnsupportedFormat { path: PathBuf },

    /// A URI that cannot be parsed or joined against its base
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Two different documents claim the same canonical URI
    #[error("Reference already exists: '{uri}'")]
    DuplicateId { uri: String },

    /// A `$ref` whose target cannot be found
    #[error("Unresolved reference '{reference}' in '{uri}': {reason}")]
    UnresolvedReference {
        reference: String,
        uri: String,
        reason: String,
    },

    /// The retriever failed to fetch a document
    #[error("Failed to fetch '{uri}': {reason}")]
    Fetch { uri: String, reason: String },

    /// A keyword carries a value of the wrong shape
    #[error("Invalid '{keyword}' at '{location}': {reason}")]
    InvalidKeyword {
        keyword: String,
        location: String,
        reason: String,
    },

    /// A `pattern` or `patternProperties` key is not a valid regular expression
    #[error("Invalid regular expression '{pattern}' at '{location}': {source}")]
    InvalidPattern {
        pattern: String,
        location: String,
        source: regex::Error,
    },

    /// A schema document failed validation against its meta-schema
    #[error("Schema '{uri}' does not conform to meta-schema '{meta_schema}':\n{findings}")]
    MetaSchemaViolation {
        uri: String,
        meta_schema: String,
        findings: String,
    },

    /// `$schema` names a draft this library does not implement
    #[error("Unsupported draft '{schema}' declared by '{uri}'")]
    UnsupportedDraft { schema: String, uri: String },

    /// A `$ref` cycle that never reaches a concrete schema
    #[error("Circular reference detected: {chain}")]
    CircularReference { chain: String },

    /// The instance document could not be loaded
    #[error("Failed to load instance: {source}")]
    InstanceLoad { source: Box<SchemaError> },

    /// The compiled graph is inconsistent
    #[error("Malformed schema graph: {reason}")]
    MalformedGraph { reason: String },
}

impl SchemaError {
    /// Create an I/O error with path context
    pub fn io_error(path: PathBuf, error: std::io::Error) -> Self {
        Self::Io {
            path,
            source: error,
        }
    }

    /// Create a JSON parsing error
    pub fn json_parse_error(origin: impl Into<String>, error: serde_json::Error) -> Self {
        Self::JsonParse {
            origin: origin.into(),
            source: error,
        }
    }

    /// Create a YAML parsing error
    pub fn yaml_parse_error(origin: impl Into<String>, error: serde_yaml::Error) -> Self {
        Self::YamlParse {
            origin: origin.into(),
            source: error,
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(path: PathBuf) -> Self {
        Self::UnsupportedFormat { path }
    }

    pub fn invalid_uri(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(uri: impl Into<String>) -> Self {
        Self::DuplicateId { uri: uri.into() }
    }

    /// Create an unresolved reference error
    pub fn unresolved_reference(
        reference: impl Into<String>,
        uri: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch_error(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid keyword error
    pub fn invalid_keyword(
        keyword: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(
        pattern: impl Into<String>,
        location: impl Into<String>,
        error: regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            location: location.into(),
            source: error,
        }
    }

    /// Create a meta-schema violation error from rendered findings
    pub fn meta_schema_violation(
        uri: impl Into<String>,
        meta_schema: impl Into<String>,
        findings: Vec<String>,
    ) -> Self {
        let findings = findings
            .iter()
            .map(|f| format!("  - {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        Self::MetaSchemaViolation {
            uri: uri.into(),
            meta_schema: meta_schema.into(),
            findings,
        }
    }

    pub fn unsupported_draft(schema: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::UnsupportedDraft {
            schema: schema.into(),
            uri: uri.into(),
        }
    }

    /// Create a circular reference error from the locations forming the cycle
    pub fn circular_reference(chain: Vec<String>) -> Self {
        Self::CircularReference {
            chain: chain.join(" -> "),
        }
    }

    /// Wrap a loader failure that happened while reading an instance
    pub fn instance_load(error: SchemaError) -> Self {
        Self::InstanceLoad {
            source: Box::new(error),
        }
    }

    pub fn malformed_graph(reason: impl Into<String>) -> Self {
        Self::MalformedGraph {
            reason: reason.into(),
        }
    }

    /// Get the URI associated with this error, if any
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::InvalidUri { uri, .. } => Some(uri),
            Self::DuplicateId { uri } => Some(uri),
            Self::UnresolvedReference { uri, .. } => Some(uri),
            Self::Fetch { uri, .. } => Some(uri),
            Self::MetaSchemaViolation { uri, .. } => Some(uri),
            Self::UnsupportedDraft { uri, .. } => Some(uri),
            Self::InstanceLoad { source } => source.uri(),
            _ => None,
        }
    }

    /// Check if this error came from loading an instance rather than a schema
    pub fn is_instance_error(&self) -> bool {
        matches!(self, Self::InstanceLoad { .. })
    }
}
