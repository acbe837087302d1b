//! Draft detection and the embedded canonical meta-schemas
//!
//! Every registered document carries its own [`Draft`]; the compiler
//! branches on the draft of the document that owns a node, so a single graph
//! may mix draft-04 and draft-07 documents.
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::error::{SchemaError, SchemaResult};
use crate::loader::pool::SchemaPool;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

const DRAFT4_META_SCHEMA: &str = include_str!("../metaschemas/draft-04.json");
const DRAFT6_META_SCHEMA: &str = include_str!("../metaschemas/draft-06.json");
const DRAFT7_META_SCHEMA: &str = include_str!("../metaschemas/draft-07.json");

/// Keyword semantics a document is compiled under
///
/// Variants are ordered by vocabulary: a later draft understands every
/// keyword an earlier one does. `Hybrid` sits on top and accepts both the
/// boolean and numeric forms of `exclusiveMinimum`/`exclusiveMaximum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Draft {
    #[serde(rename = "draft-04")]
    Draft4,
    #[serde(rename = "draft-06")]
    Draft6,
    #[serde(rename = "draft-07")]
    Draft7,
    Hybrid,
}

impl Default for Draft {
    fn default() -> Self {
        Draft::Hybrid
    }
}

impl Draft {
    /// Map a `$schema` URI to a canonical draft
    pub fn from_schema_uri(uri: &str) -> Option<Self> {
        let trimmed = uri.trim_end_matches('#');
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))?;
        match without_scheme {
            "json-schema.org/draft-04/schema" => Some(Draft::Draft4),
            "json-schema.org/draft-06/schema" => Some(Draft::Draft6),
            "json-schema.org/draft-07/schema" => Some(Draft::Draft7),
            _ => None,
        }
    }

    /// Canonical meta-schema URI; `Hybrid` has none
    pub fn meta_schema_uri(self) -> Option<&'static str> {
        match self {
            Draft::Draft4 => Some("http://json-schema.org/draft-04/schema#"),
            Draft::Draft6 => Some("http://json-schema.org/draft-06/schema#"),
            Draft::Draft7 => Some("http://json-schema.org/draft-07/schema#"),
            Draft::Hybrid => None,
        }
    }

    /// Parse the embedded meta-schema for this draft
    pub fn meta_schema(self) -> Option<SchemaResult<Value>> {
        let source = match self {
            Draft::Draft4 => DRAFT4_META_SCHEMA,
            Draft::Draft6 => DRAFT6_META_SCHEMA,
            Draft::Draft7 => DRAFT7_META_SCHEMA,
            Draft::Hybrid => return None,
        };
        Some(
            serde_json::from_str(source)
                .map_err(|e| SchemaError::json_parse_error(format!("{} meta-schema", self), e)),
        )
    }

    /// Keywords that declare a base URI, in lookup order
    pub fn id_keywords(self) -> &'static [&'static str] {
        match self {
            Draft::Draft4 => &["id"],
            Draft::Draft6 | Draft::Draft7 => &["$id"],
            Draft::Hybrid => &["$id", "id"],
        }
    }

    /// The `$id` declared by a schema object, if any
    pub fn declared_id(self, schema: &Map<String, Value>) -> Option<&str> {
        self.id_keywords()
            .iter()
            .find_map(|keyword| schema.get(*keyword).and_then(Value::as_str))
    }

    /// Boolean schemas, `const`, `contains` and `propertyNames`
    pub fn has_draft6_vocabulary(self) -> bool {
        self >= Draft::Draft6
    }

    /// `if`/`then`/`else`
    pub fn has_conditionals(self) -> bool {
        self >= Draft::Draft7
    }

    pub fn accepts_boolean_exclusive_bounds(self) -> bool {
        matches!(self, Draft::Draft4 | Draft::Hybrid)
    }

    pub fn accepts_numeric_exclusive_bounds(self) -> bool {
        self != Draft::Draft4
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Draft::Draft4 => "draft-04",
            Draft::Draft6 => "draft-06",
            Draft::Draft7 => "draft-07",
            Draft::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Draft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft-04" | "draft04" | "draft4" | "4" => Ok(Draft::Draft4),
            "draft-06" | "draft06" | "draft6" | "6" => Ok(Draft::Draft6),
            "draft-07" | "draft07" | "draft7" | "7" => Ok(Draft::Draft7),
            "hybrid" => Ok(Draft::Hybrid),
            other => Draft::from_schema_uri(other)
                .ok_or_else(|| format!("unknown draft '{}'", other)),
        }
    }
}

/// Picks the draft a document is compiled under
#[derive(Debug, Clone, Copy)]
pub struct DraftResolver {
    pub auto_detect: bool,
    pub default_draft: Draft,
    pub strict: bool,
}

impl DraftResolver {
    /// Resolve the draft for `document`, following custom meta-schemas
    /// registered in `pool` until a canonical draft is reached
    pub fn resolve(&self, document: &Value, base: &Url, pool: &SchemaPool) -> SchemaResult<Draft> {
        if !self.auto_detect {
            return Ok(self.default_draft);
        }

        let mut visited = HashSet::new();
        let mut current = document.clone();
        let mut current_base = base.clone();

        loop {
            let declared = match current.get("$schema") {
                None => return Ok(self.default_draft),
                Some(Value::String(declared)) => declared.clone(),
                Some(_) => {
                    return Err(SchemaError::invalid_keyword(
                        "$schema",
                        current_base.as_str(),
                        "must be a string",
                    ))
                }
            };

            if let Some(draft) = Draft::from_schema_uri(&declared) {
                debug!(schema = %declared, draft = %draft, "Detected draft");
                return Ok(draft);
            }

            let meta_uri = current_base
                .join(&declared)
                .map_err(|e| SchemaError::invalid_uri(declared.as_str(), e))?;
            if !visited.insert(SchemaPool::normalize(&meta_uri)) {
                debug!(schema = %declared, "Meta-schema chain loops, using default draft");
                return Ok(self.default_draft);
            }

            match pool.resolve(&meta_uri).and_then(|loc| pool.value_at(&loc)) {
                Some(meta) => {
                    current = meta.clone();
                    current_base = meta_uri;
                }
                None if self.strict => {
                    return Err(SchemaError::unsupported_draft(declared, base.as_str()))
                }
                None => {
                    debug!(
                        schema = %declared,
                        default = %self.default_draft,
                        "Unknown $schema, using default draft"
                    );
                    return Ok(self.default_draft);
                }
            }
        }
    }
}
