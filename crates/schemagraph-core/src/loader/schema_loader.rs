//! Loader session: registration, optional meta-schema self-validation and
//! compilation
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::compiler::Compiler;
use crate::draft::{Draft, DraftResolver};
use crate::error::{SchemaError, SchemaResult};
use crate::format::{FormatChecker, FormatRegistry};
use crate::loader::pool::{DocumentId, Location, SchemaPool, DEFAULT_BASE_URI};
use crate::loader::retriever::{DefaultRetriever, Retrieve};
use crate::loader::source::Loader;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Configuration for a loader session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Pick each document's draft from its own `$schema`
    pub auto_detect: bool,
    /// Validate every added or compiled document against its meta-schema
    pub validate: bool,
    /// Draft used when detection is off or a document declares none
    pub default_draft: Draft,
    /// Reject `$schema` URIs that name neither a known draft nor a registered meta-schema
    pub strict_draft: bool,
    /// Unknown `format` names fail validation instead of passing
    pub strict_formats: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            validate: false,
            default_draft: Draft::Hybrid,
            strict_draft: false,
            strict_formats: false,
        }
    }
}

impl LoaderConfig {
    pub fn with_auto_detect(mut self, auto_detect: bool) -> Self {
        self.auto_detect = auto_detect;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_default_draft(mut self, draft: Draft) -> Self {
        self.default_draft = draft;
        self
    }

    pub fn with_strict_draft(mut self, strict: bool) -> Self {
        self.strict_draft = strict;
        self
    }

    pub fn with_strict_formats(mut self, strict: bool) -> Self {
        self.strict_formats = strict;
        self
    }

    pub fn draft_resolver(&self) -> DraftResolver {
        DraftResolver {
            auto_detect: self.auto_detect,
            default_draft: self.default_draft,
            strict: self.strict_draft,
        }
    }
}

/// One loader session
///
/// Documents are registered with [`add_schema`](Self::add_schema) and
/// [`add_schemas`](Self::add_schemas) in any order; `$ref` targets are only
/// looked up when [`compile`](Self::compile) runs. Calls on one session must
/// be serialized, the returned [`Schema`] is free to share.
pub struct SchemaLoader {
    config: LoaderConfig,
    pool: SchemaPool,
    retriever: Arc<dyn Retrieve>,
    formats: FormatRegistry,
    meta_schemas: HashMap<String, Schema>,
}

impl SchemaLoader {
    /// Create a new loader session with default configuration
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new loader session with custom configuration
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            pool: SchemaPool::new(),
            retriever: Arc::new(DefaultRetriever::new()),
            formats: FormatRegistry::default(),
            meta_schemas: HashMap::new(),
        }
    }

    /// Replace the retriever used for `$ref` targets that were never added
    pub fn with_retriever(mut self, retriever: impl Retrieve + 'static) -> Self {
        self.retriever = Arc::new(retriever);
        self
    }

    /// Add or override a `format` checker for schemas compiled from now on
    pub fn register_format(&mut self, name: impl Into<String>, checker: impl FormatChecker + 'static) {
        self.formats.register(name, checker);
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn pool(&self) -> &SchemaPool {
        &self.pool
    }

    /// Register one document under an explicit URI
    pub fn add_schema(&mut self, uri: &str, loader: &dyn Loader) -> SchemaResult<()> {
        let uri = SchemaPool::parse_uri(uri)?;
        let value = loader.load()?;
        self.register(Some(uri), value)?;
        Ok(())
    }

    /// Register documents under their own source URI and `$id`s
    pub fn add_schemas(&mut self, loaders: &[&dyn Loader]) -> SchemaResult<()> {
        for loader in loaders {
            let value = loader.load()?;
            self.register(loader.source_uri(), value)?;
        }
        Ok(())
    }

    /// Compile a root schema against everything registered so far
    ///
    /// A [`ReferenceLoader`](crate::loader::ReferenceLoader) root is looked up
    /// in the session; any other loader is registered first. A failed
    /// compilation leaves the pool as it was before the call.
    pub fn compile(&mut self, loader: &dyn Loader) -> SchemaResult<Schema> {
        let checkpoint = self.pool.checkpoint();
        let compiled = self.compile_root(loader);
        if let Err(e) = &compiled {
            debug!(root = %loader.describe(), error = %e, "Compilation failed, rolling back registrations");
            self.pool.rollback(checkpoint);
        }
        compiled
    }

    fn compile_root(&mut self, loader: &dyn Loader) -> SchemaResult<Schema> {
        let root = if loader.is_reference() {
            let uri = loader
                .source_uri()
                .ok_or_else(|| SchemaError::invalid_uri(loader.describe(), "reference without a URI"))?;
            let resolver = self.config.draft_resolver();
            self.pool.locate(&uri, self.retriever.as_ref(), &resolver)?
        } else {
            let value = loader.load()?;
            Location::root(self.register(loader.source_uri(), value)?)
        };

        info!(root = %loader.describe(), documents = self.pool.len(), "Compiling schema");
        self.compile_location(&root)
    }

    fn register(&mut self, uri: Option<Url>, value: Value) -> SchemaResult<DocumentId> {
        let base = match &uri {
            Some(uri) => uri.clone(),
            None => SchemaPool::parse_uri(DEFAULT_BASE_URI)?,
        };

        self.validate_document(&value, &base)?;
        let draft = self.config.draft_resolver().resolve(&value, &base, &self.pool)?;
        self.pool.register(uri, value, draft)
    }

    fn compile_location(&mut self, root: &Location) -> SchemaResult<Schema> {
        let graph = Compiler::new(
            &mut self.pool,
            self.retriever.as_ref(),
            self.config.draft_resolver(),
            &self.formats,
        )
        .strict_formats(self.config.strict_formats)
        .compile(root)?;
        Ok(Schema::new(graph))
    }

    /// Validate a document against its meta-schema when self-validation is on
    fn validate_document(&mut self, value: &Value, base: &Url) -> SchemaResult<()> {
        if !self.config.validate {
            return Ok(());
        }

        let Some(meta_uri) = self.meta_schema_uri(value, base)? else {
            debug!(uri = %base, "No meta-schema applies, skipping self-validation");
            return Ok(());
        };

        let meta_schema = self.meta_schema(&meta_uri)?;
        let result = meta_schema.validate_value(value)?;
        if result.is_valid() {
            debug!(uri = %base, meta_schema = %meta_uri, "Document conforms to its meta-schema");
            return Ok(());
        }

        Err(SchemaError::meta_schema_violation(
            base.as_str(),
            meta_uri.as_str(),
            result.errors().iter().map(ToString::to_string).collect(),
        ))
    }

    fn meta_schema_uri(&self, value: &Value, base: &Url) -> SchemaResult<Option<Url>> {
        if self.config.auto_detect {
            if let Some(Value::String(declared)) = value.get("$schema") {
                return base
                    .join(declared)
                    .map(Some)
                    .map_err(|e| SchemaError::invalid_uri(declared.as_str(), e));
            }
        }

        self.config
            .default_draft
            .meta_schema_uri()
            .map(SchemaPool::parse_uri)
            .transpose()
    }

    /// Compiled meta-schema for `uri`, compiled once per session
    fn meta_schema(&mut self, uri: &Url) -> SchemaResult<Schema> {
        let key = SchemaPool::normalize(uri);
        if let Some(schema) = self.meta_schemas.get(&key) {
            return Ok(schema.clone());
        }

        let resolver = self.config.draft_resolver();
        let location = self.pool.locate(uri, self.retriever.as_ref(), &resolver)?;
        let schema = self.compile_location(&location)?;
        debug!(meta_schema = %key, nodes = schema.node_count(), "Compiled meta-schema");

        self.meta_schemas.insert(key, schema.clone());
        Ok(schema)
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaLoader")
            .field("config", &self.config)
            .field("documents", &self.pool.len())
            .field("formats", &self.formats)
            .field("meta_schemas", &self.meta_schemas.len())
            .finish()
    }
}
