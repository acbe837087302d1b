//! schemagraph - JSON Schema loading, compilation and validation
//!
//! Schema documents are registered in a loader session, which resolves
//! `$id` scopes and `$ref`s across documents and compiles them into an
//! arena-backed graph. Recursive and mutually recursive schemas become cycles
//! in that graph instead of infinite expansions. Validation walks the graph
//! and an instance together and returns every finding with its path.
//!
//! ## Features
//!
//! - **Drafts**: draft-04, draft-06, draft-07 and a permissive hybrid default,
//!   chosen per document from `$schema`
//! - **References**: absolute, relative and fragment `$ref`s, nested `$id`
//!   scopes and forward references between documents
//! - **Self-validation**: optional validation of every schema against its
//!   meta-schema, including custom meta-schemas registered in the session
//! - **Structured results**: stable error types, dotted paths and JSON
//!   pointers, descriptions and keyword details
//!
//! ## Quick Start
//!
//! ```rust
//! use schemagraph::{SchemaLoader, StringLoader};
//!
//! let mut loader = SchemaLoader::new();
//! let schema = loader.compile(&StringLoader::new(
//!     r#"{"type": "object", "required": ["name"]}"#,
//! ))?;
//!
//! let result = schema.validate(&StringLoader::new(r#"{"id": 7}"#))?;
//! assert!(!result.is_valid());
//! assert_eq!(result.errors()[0].description(), "name is required");
//! # Ok::<(), schemagraph::SchemaError>(())
//! ```
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

pub mod compiler;
pub mod draft;
pub mod error;
pub mod format;
pub mod loader;
pub mod schema;
pub mod validation;

pub use draft::{Draft, DraftResolver};
pub use error::{SchemaError, SchemaResult};
pub use format::{FormatChecker, FormatRegistry};
pub use loader::{
    DefaultRetriever, FileLoader, InMemoryRetriever, Loader, LoaderConfig, ReferenceLoader, Retrieve,
    SchemaLoader, StringLoader, ValueLoader,
};
pub use schema::Schema;
pub use validation::{ErrorKind, ResultError, ValidationResult};

/// Compile a schema in a fresh loader session with default configuration
pub fn compile(schema: &dyn Loader) -> SchemaResult<Schema> {
    SchemaLoader::new().compile(schema)
}

/// Compile `schema` and validate `instance` against it
pub fn validate(schema: &dyn Loader, instance: &dyn Loader) -> SchemaResult<ValidationResult> {
    compile(schema)?.validate(instance)
}
