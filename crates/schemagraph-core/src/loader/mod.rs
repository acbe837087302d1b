//! Schema loading: document sources, the per-session pool and the loader
//! session that ties registration, draft selection and compilation together
//!
//! # Example Usage
//!
//! ```rust
//! use schemagraph::loader::{ReferenceLoader, SchemaLoader, StringLoader};
//!
//! let mut loader = SchemaLoader::new();
//! loader.add_schemas(&[&StringLoader::new(r#"{"$id": "u1", "type": "integer"}"#)])?;
//!
//! let schema = loader.compile(&ReferenceLoader::new("u1")?)?;
//! let result = schema.validate(&StringLoader::new(r#""hello""#))?;
//! assert_eq!(result.errors()[0].error_type(), "invalid_type");
//! # Ok::<(), schemagraph::SchemaError>(())
//! ```
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

pub mod parser;
pub mod pool;
pub mod retriever;
pub mod schema_loader;
pub mod source;

pub use parser::{DocumentParser, Format};
pub use pool::{Location, PoolCheckpoint, RawDocument, SchemaPool, ScopeStack, DEFAULT_BASE_URI};
pub use retriever::{DefaultRetriever, InMemoryRetriever, Retrieve};
pub use schema_loader::{LoaderConfig, SchemaLoader};
pub use source::{FileLoader, Loader, ReferenceLoader, StringLoader, ValueLoader};
