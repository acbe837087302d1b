//! Loaders: where schema and instance documents come from
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::draft::Draft;
use crate::error::{SchemaError, SchemaResult};
use crate::loader::parser::{DocumentParser, Format};
use crate::loader::pool::SchemaPool;
use crate::loader::retriever::{DefaultRetriever, Retrieve};
use serde_json::Value;
use std::path::{Path, PathBuf};
use url::Url;

/// A source of one JSON document
pub trait Loader {
    /// Produce the document
    fn load(&self) -> SchemaResult<Value>;

    /// Canonical URI of the document; relative `$ref`s resolve against it
    fn source_uri(&self) -> Option<Url> {
        None
    }

    /// Short human-readable name for logs and errors
    fn describe(&self) -> String;

    /// True when the loader only names a URI; a loader session resolves it
    /// through its own registry before loading anything
    fn is_reference(&self) -> bool {
        false
    }
}

/// Document given as JSON (or YAML) text
#[derive(Debug, Clone)]
pub struct StringLoader {
    content: String,
    format: Format,
}

impl StringLoader {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            format: Format::Json,
        }
    }

    pub fn yaml(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            format: Format::Yaml,
        }
    }
}

impl Loader for StringLoader {
    fn load(&self) -> SchemaResult<Value> {
        DocumentParser::new().parse_content(&self.content, self.format, "string")
    }

    fn describe(&self) -> String {
        "<string>".to_string()
    }
}

/// Document given as an already-built value
#[derive(Debug, Clone)]
pub struct ValueLoader {
    value: Value,
}

impl ValueLoader {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Loader for ValueLoader {
    fn load(&self) -> SchemaResult<Value> {
        Ok(self.value.clone())
    }

    fn describe(&self) -> String {
        "<value>".to_string()
    }
}

/// Document read from a JSON or YAML file
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn absolute_path(&self) -> Option<PathBuf> {
        match self.path.canonicalize() {
            Ok(path) => Some(path),
            Err(_) if self.path.is_absolute() => Some(self.path.clone()),
            Err(_) => std::env::current_dir().ok().map(|dir| dir.join(&self.path)),
        }
    }
}

impl Loader for FileLoader {
    fn load(&self) -> SchemaResult<Value> {
        DocumentParser::new().parse_file(&self.path)
    }

    fn source_uri(&self) -> Option<Url> {
        self.absolute_path()
            .and_then(|path| Url::from_file_path(path).ok())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Document named by URI
///
/// Inside a loader session the URI is looked up among registered documents
/// first. Standalone, it is served from the embedded meta-schemas or the
/// [`DefaultRetriever`].
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    uri: Url,
}

impl ReferenceLoader {
    /// Relative URIs resolve against `json-schema:///`
    pub fn new(uri: &str) -> SchemaResult<Self> {
        Ok(Self {
            uri: SchemaPool::parse_uri(uri)?,
        })
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

impl Loader for ReferenceLoader {
    fn load(&self) -> SchemaResult<Value> {
        let document = match Draft::from_schema_uri(self.uri.as_str()).and_then(Draft::meta_schema) {
            Some(embedded) => embedded?,
            None => {
                let mut document_uri = self.uri.clone();
                document_uri.set_fragment(None);
                DefaultRetriever::new().retrieve(&document_uri)?
            }
        };

        match self.uri.fragment() {
            Some(fragment) if !fragment.is_empty() => document
                .pointer(fragment)
                .cloned()
                .ok_or_else(|| {
                    SchemaError::unresolved_reference(
                        self.uri.as_str(),
                        self.uri.as_str(),
                        "fragment does not point into the document",
                    )
                }),
            _ => Ok(document),
        }
    }

    fn source_uri(&self) -> Option<Url> {
        Some(self.uri.clone())
    }

    fn describe(&self) -> String {
        self.uri.to_string()
    }

    fn is_reference(&self) -> bool {
        true
    }
}
