//! Fetching documents named by `$ref` URIs that are not registered yet
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::error::{SchemaError, SchemaResult};
use crate::loader::parser::DocumentParser;
use crate::loader::pool::SchemaPool;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Fetches a document by absolute URI
pub trait Retrieve: Send + Sync {
    fn retrieve(&self, uri: &Url) -> SchemaResult<Value>;
}

/// Reads `file://` URIs from disk and, with the `http` feature, fetches
/// `http(s)://` URIs
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetriever {
    parser: DocumentParser,
}

impl DefaultRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "http")]
    fn fetch_http(&self, uri: &Url) -> SchemaResult<Value> {
        tracing::debug!(uri = %uri, "Fetching schema over HTTP");
        let response = reqwest::blocking::get(uri.as_str())
            .and_then(|response| response.error_for_status())
            .map_err(|e| SchemaError::fetch_error(uri.as_str(), e))?;
        response
            .json::<Value>()
            .map_err(|e| SchemaError::fetch_error(uri.as_str(), e))
    }

    #[cfg(not(feature = "http"))]
    fn fetch_http(&self, uri: &Url) -> SchemaResult<Value> {
        Err(SchemaError::fetch_error(
            uri.as_str(),
            "HTTP retrieval is disabled; build with the `http` feature",
        ))
    }
}

impl Retrieve for DefaultRetriever {
    fn retrieve(&self, uri: &Url) -> SchemaResult<Value> {
        match uri.scheme() {
            "file" => {
                let path = uri
                    .to_file_path()
                    .map_err(|_| SchemaError::fetch_error(uri.as_str(), "not a local file path"))?;
                self.parser.parse_file(&path)
            }
            "http" | "https" => self.fetch_http(uri),
            scheme => Err(SchemaError::fetch_error(
                uri.as_str(),
                format!("no retriever for scheme '{}'", scheme),
            )),
        }
    }
}

/// Serves documents from memory, keyed by normalized URI
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    documents: HashMap<String, Value>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and return the retriever
    pub fn with_document(mut self, uri: &str, document: Value) -> SchemaResult<Self> {
        self.insert(uri, document)?;
        Ok(self)
    }

    pub fn insert(&mut self, uri: &str, document: Value) -> SchemaResult<()> {
        let uri = SchemaPool::parse_uri(uri)?;
        self.documents.insert(SchemaPool::normalize(&uri), document);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Retrieve for InMemoryRetriever {
    fn retrieve(&self, uri: &Url) -> SchemaResult<Value> {
        self.documents
            .get(&SchemaPool::normalize(uri))
            .cloned()
            .ok_or_else(|| SchemaError::fetch_error(uri.as_str(), "document not found"))
    }
}
