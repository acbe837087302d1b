//! Compiled schemas
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::compiler::SchemaGraph;
use crate::error::{SchemaError, SchemaResult};
use crate::loader::Loader;
use crate::validation::{ValidationResult, Validator};
use serde_json::Value;
use std::sync::Arc;

/// A compiled schema, immutable and cheap to clone
///
/// Clones share one graph; validation never mutates it, so a `Schema` can be
/// used from many threads at once.
#[derive(Debug, Clone)]
pub struct Schema {
    graph: Arc<SchemaGraph>,
}

impl Schema {
    pub(crate) fn new(graph: SchemaGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    /// Load an instance and validate it
    ///
    /// An `Err` means the instance could not be loaded; findings are in the
    /// returned result.
    pub fn validate(&self, instance: &dyn Loader) -> SchemaResult<ValidationResult> {
        let value = instance.load().map_err(SchemaError::instance_load)?;
        self.validate_value(&value)
    }

    /// Validate an in-memory value
    pub fn validate_value(&self, instance: &Value) -> SchemaResult<ValidationResult> {
        Validator::new(&self.graph).validate(instance)
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate_value(instance)
            .map(|result| result.is_valid())
            .unwrap_or(false)
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }
}
