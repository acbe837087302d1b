//! Document registry, `$id` scoping and `$ref` target lookup
//!
//! Registering a document walks it once with a scope stack. Every `$id`
//! becomes an index entry pointing at its location, and every `$ref` is
//! rewritten in place to an absolute URI resolved against the innermost
//! enclosing base. Targets are looked up lazily at compile time, so
//! documents may refer to siblings that have not been added yet.
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::draft::{Draft, DraftResolver};
use crate::error::{SchemaError, SchemaResult};
use crate::loader::retriever::Retrieve;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Base URI given to documents that carry no URI of their own
pub const DEFAULT_BASE_URI: &str = "json-schema:///";

/// Keywords whose values are plain JSON data, never schemas
const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "examples", "$ref"];

/// Keywords whose values map names to schemas
const SCHEMA_MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "definitions", "dependencies"];

pub type DocumentId = usize;

/// A schema position: a document plus a JSON pointer into it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub document: DocumentId,
    pub pointer: String,
}

impl Location {
    pub fn root(document: DocumentId) -> Self {
        Self {
            document,
            pointer: String::new(),
        }
    }

    /// Location of a nested value, escaping each segment
    pub fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Self {
        let mut pointer = self.pointer.clone();
        for segment in segments {
            pointer.push('/');
            pointer.push_str(&escape_pointer_segment(segment));
        }
        Self {
            document: self.document,
            pointer,
        }
    }
}

/// A parsed document, immutable once registered
#[derive(Debug)]
pub struct RawDocument {
    /// Canonical URI: the root `$id` resolved against the load URI
    pub uri: Url,
    /// True for documents registered without a URI
    pub anonymous: bool,
    pub draft: Draft,
    /// Document body with every `$ref` rewritten to an absolute URI
    pub value: Value,
}

impl RawDocument {
    /// Render `uri#pointer` for messages
    pub fn describe(&self, pointer: &str) -> String {
        let mut uri = self.uri.clone();
        uri.set_fragment(None);
        format!("{}#{}", uri, pointer)
    }
}

/// Stack of base URIs used while walking a document
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Url>,
}

impl ScopeStack {
    pub fn new(base: Url) -> Self {
        Self { scopes: vec![base] }
    }

    pub fn push(&mut self, base: Url) {
        self.scopes.push(base);
    }

    /// Pop the innermost scope; the document base is never popped
    pub fn pop(&mut self) -> Option<Url> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn current(&self) -> &Url {
        // The stack always holds the document base
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// Registry of every document known to one loader session
#[derive(Debug, Default)]
pub struct SchemaPool {
    documents: Vec<Arc<RawDocument>>,
    index: HashMap<String, Location>,
    /// Index keys in insertion order, for [`SchemaPool::rollback`]
    indexed: Vec<String>,
    anonymous_count: usize,
}

/// Pool state captured by [`SchemaPool::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCheckpoint {
    documents: usize,
    indexed: usize,
    anonymous_count: usize,
}

impl SchemaPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical string form of a URI: an empty fragment is dropped
    pub fn normalize(uri: &Url) -> String {
        match uri.fragment() {
            Some(fragment) if !fragment.is_empty() => uri.to_string(),
            _ => {
                let mut uri = uri.clone();
                uri.set_fragment(None);
                uri.to_string()
            }
        }
    }

    /// Parse a URI, resolving relative ones against [`DEFAULT_BASE_URI`]
    pub fn parse_uri(uri: &str) -> SchemaResult<Url> {
        let base = Url::parse(DEFAULT_BASE_URI).map_err(|e| SchemaError::invalid_uri(DEFAULT_BASE_URI, e))?;
        base.join(uri).map_err(|e| SchemaError::invalid_uri(uri, e))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, id: DocumentId) -> Option<Arc<RawDocument>> {
        self.documents.get(id).cloned()
    }

    pub fn value_at(&self, location: &Location) -> Option<&Value> {
        self.documents
            .get(location.document)?
            .value
            .pointer(&location.pointer)
    }

    /// Whether the document part of `uri` has been registered
    pub fn contains_document(&self, uri: &Url) -> bool {
        let mut document_uri = uri.clone();
        document_uri.set_fragment(None);
        self.index.contains_key(document_uri.as_str())
    }

    /// Capture the current state so later registrations can be undone
    pub fn checkpoint(&self) -> PoolCheckpoint {
        PoolCheckpoint {
            documents: self.documents.len(),
            indexed: self.indexed.len(),
            anonymous_count: self.anonymous_count,
        }
    }

    /// Forget every document and index entry added since `checkpoint`
    pub fn rollback(&mut self, checkpoint: PoolCheckpoint) {
        if self.indexed.len() > checkpoint.indexed {
            for uri in self.indexed.drain(checkpoint.indexed..) {
                self.index.remove(&uri);
            }
        }
        if self.documents.len() > checkpoint.documents {
            debug!(
                removed = self.documents.len() - checkpoint.documents,
                "Rolled back schema documents"
            );
            self.documents.truncate(checkpoint.documents);
        }
        self.anonymous_count = checkpoint.anonymous_count;
    }

    /// Register a document and index every `$id` it declares
    ///
    /// Registration is atomic: on a duplicate id nothing is indexed.
    /// Registering a document identical to an existing one returns the
    /// existing id, indexing any URIs the new registration adds.
    pub fn register(&mut self, uri: Option<Url>, mut value: Value, draft: Draft) -> SchemaResult<DocumentId> {
        let anonymous = uri.is_none();
        let base = match uri {
            Some(uri) => uri,
            None => self.next_anonymous_uri()?,
        };

        let mut scope = ScopeStack::new(base.clone());
        let mut declarations = vec![(Self::normalize(&base), String::new())];
        walk(&mut value, "", &mut scope, draft, &mut declarations)?;

        let canonical = declarations
            .iter()
            .rev()
            .find(|(_, pointer)| pointer.is_empty())
            .map(|(uri, _)| uri.clone())
            .unwrap_or_else(|| Self::normalize(&base));
        let canonical = Url::parse(&canonical).map_err(|e| SchemaError::invalid_uri(canonical.as_str(), e))?;

        let mut fresh: HashMap<&str, &str> = HashMap::new();
        let mut reused_root = None;
        for (uri, pointer) in &declarations {
            let new_value = value.pointer(pointer);
            if let Some(existing) = self.index.get(uri) {
                if self.value_at(existing) != new_value {
                    return Err(SchemaError::duplicate_id(uri.as_str()));
                }
                if pointer.is_empty() && existing.pointer.is_empty() {
                    reused_root = Some(existing.document);
                }
                continue;
            }
            if let Some(previous) = fresh.insert(uri.as_str(), pointer.as_str()) {
                if previous != pointer.as_str() && value.pointer(previous) != new_value {
                    return Err(SchemaError::duplicate_id(uri.as_str()));
                }
            }
        }

        let id = reused_root.unwrap_or(self.documents.len());
        for (uri, pointer) in declarations {
            if !self.index.contains_key(&uri) {
                self.indexed.push(uri.clone());
                self.index.insert(uri, Location { document: id, pointer });
            }
        }

        if reused_root.is_some() {
            debug!(uri = %canonical, "Document already registered");
            return Ok(id);
        }

        debug!(uri = %canonical, draft = %draft, anonymous, "Registered schema document");
        self.documents.push(Arc::new(RawDocument {
            uri: canonical,
            anonymous,
            draft,
            value,
        }));
        Ok(id)
    }

    /// Find the location a URI refers to among registered documents
    pub fn resolve(&self, reference: &Url) -> Option<Location> {
        if let Some(location) = self.index.get(&Self::normalize(reference)) {
            trace!(reference = %reference, "Resolved reference by id");
            return Some(location.clone());
        }

        let fragment = percent_decode_str(reference.fragment()?).decode_utf8_lossy();
        if !fragment.starts_with('/') {
            return None;
        }

        let mut document_uri = reference.clone();
        document_uri.set_fragment(None);
        let base = self.index.get(document_uri.as_str())?;
        let location = Location {
            document: base.document,
            pointer: format!("{}{}", base.pointer, fragment),
        };

        trace!(reference = %reference, pointer = %location.pointer, "Resolved reference by pointer");
        self.value_at(&location).map(|_| location)
    }

    /// Resolve a reference, fetching its document when it is not known yet
    ///
    /// Embedded meta-schemas are registered under their own draft; anything
    /// else goes through `retriever`.
    pub fn locate(
        &mut self,
        reference: &Url,
        retriever: &dyn Retrieve,
        resolver: &DraftResolver,
    ) -> SchemaResult<Location> {
        if let Some(location) = self.resolve(reference) {
            return Ok(location);
        }

        let mut document_uri = reference.clone();
        document_uri.set_fragment(None);

        if !self.contains_document(&document_uri) {
            let embedded = Draft::from_schema_uri(document_uri.as_str())
                .and_then(|draft| draft.meta_schema().map(|value| (draft, value)));

            let (value, draft) = match embedded {
                Some((draft, value)) => (value?, draft),
                None => {
                    debug!(uri = %document_uri, "Fetching referenced document");
                    let value = retriever.retrieve(&document_uri)?;
                    let draft = resolver.resolve(&value, &document_uri, self)?;
                    (value, draft)
                }
            };

            self.register(Some(document_uri.clone()), value, draft)?;
            if let Some(location) = self.resolve(reference) {
                return Ok(location);
            }
        }

        Err(SchemaError::unresolved_reference(
            reference.as_str(),
            document_uri.as_str(),
            "no schema at this location",
        ))
    }

    fn next_anonymous_uri(&mut self) -> SchemaResult<Url> {
        self.anonymous_count += 1;
        let uri = format!("{}anonymous-{}", DEFAULT_BASE_URI, self.anonymous_count);
        Url::parse(&uri).map_err(|e| SchemaError::invalid_uri(uri.as_str(), e))
    }
}

/// Walk a schema value collecting `$id` declarations and absolutizing `$ref`s
fn walk(
    value: &mut Value,
    pointer: &str,
    scope: &mut ScopeStack,
    draft: Draft,
    declarations: &mut Vec<(String, String)>,
) -> SchemaResult<()> {
    match value {
        Value::Object(map) => {
            let pushed = enter_scope(map, pointer, scope, draft, declarations)?;

            for (key, child) in map.iter_mut() {
                if DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                let child_pointer = format!("{}/{}", pointer, escape_pointer_segment(key));
                if SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) {
                    if let Value::Object(members) = child {
                        for (name, member) in members.iter_mut() {
                            let member_pointer = format!("{}/{}", child_pointer, escape_pointer_segment(name));
                            walk(member, &member_pointer, scope, draft, declarations)?;
                        }
                    }
                } else {
                    walk(child, &child_pointer, scope, draft, declarations)?;
                }
            }

            if pushed {
                scope.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                walk(item, &format!("{}/{}", pointer, index), scope, draft, declarations)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Handle `$ref` and `$id` on one schema object; returns whether a scope was pushed
fn enter_scope(
    map: &mut Map<String, Value>,
    pointer: &str,
    scope: &mut ScopeStack,
    draft: Draft,
    declarations: &mut Vec<(String, String)>,
) -> SchemaResult<bool> {
    // Siblings of `$ref`, including `$id`, do not apply
    if let Some(Value::String(reference)) = map.get_mut("$ref") {
        let resolved = scope
            .current()
            .join(reference)
            .map_err(|e| SchemaError::invalid_uri(reference.as_str(), e))?;
        *reference = resolved.to_string();
        return Ok(false);
    }

    let Some(declared) = draft.declared_id(map) else {
        return Ok(false);
    };

    let resolved = scope
        .current()
        .join(declared)
        .map_err(|e| SchemaError::invalid_uri(declared, e))?;
    trace!(id = %resolved, pointer, depth = scope.depth(), "Entering $id scope");
    declarations.push((SchemaPool::normalize(&resolved), pointer.to_string()));
    scope.push(resolved);
    Ok(true)
}

/// Escape a JSON pointer reference token
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_scope_stack() {
        let mut scope = ScopeStack::new(uri("http://example.com/root.json"));
        assert_eq!(scope.depth(), 1);

        scope.push(uri("http://example.com/nested/"));
        assert_eq!(scope.current().as_str(), "http://example.com/nested/");

        assert!(scope.pop().is_some());
        assert!(scope.pop().is_none());
        assert_eq!(scope.current().as_str(), "http://example.com/root.json");
    }

    #[test]
    fn test_normalize_strips_empty_fragment() {
        assert_eq!(
            SchemaPool::normalize(&uri("HTTP://Example.COM/a.json#")),
            "http://example.com/a.json"
        );
        assert_eq!(
            SchemaPool::normalize(&uri("http://example.com/a.json#foo")),
            "http://example.com/a.json#foo"
        );
    }

    #[test]
    fn test_register_rewrites_refs_against_scope() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        let id = pool.register(
            Some(uri("http://example.com/root.json")),
            json!({
                "$ref": "#/definitions/a",
                "definitions": {
                    "a": {"$ref": "other.json"},
                    "b": {
                        "$id": "nested/",
                        "items": {"$ref": "item.json#/definitions/x"}
                    }
                }
            }),
            Draft::Draft7,
        )?;

        let document = pool.document(id).unwrap();
        assert_eq!(document.value["$ref"], "http://example.com/root.json#/definitions/a");
        assert_eq!(document.value["definitions"]["a"]["$ref"], "http://example.com/other.json");
        assert_eq!(
            document.value["definitions"]["b"]["items"]["$ref"],
            "http://example.com/nested/item.json#/definitions/x"
        );
        Ok(())
    }

    #[test]
    fn test_ref_sibling_id_is_ignored() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(
            Some(uri("http://example.com/root.json")),
            json!({
                "definitions": {
                    "a": {"$id": "ignored.json", "$ref": "target.json"}
                }
            }),
            Draft::Draft7,
        )?;

        assert!(pool.resolve(&uri("http://example.com/ignored.json")).is_none());
        let location = pool.resolve(&uri("http://example.com/root.json#/definitions/a")).unwrap();
        assert_eq!(
            pool.value_at(&location).unwrap()["$ref"],
            "http://example.com/target.json"
        );
        Ok(())
    }

    #[test]
    fn test_resolve_embedded_id_and_pointer() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(
            Some(uri("http://example.com/root.json")),
            json!({
                "definitions": {
                    "sub": {
                        "$id": "sub.json",
                        "definitions": {"leaf": {"type": "integer"}}
                    },
                    "anchor": {"$id": "#named", "type": "string"}
                }
            }),
            Draft::Draft7,
        )?;

        let sub = pool.resolve(&uri("http://example.com/sub.json")).unwrap();
        assert_eq!(sub.pointer, "/definitions/sub");

        let leaf = pool
            .resolve(&uri("http://example.com/sub.json#/definitions/leaf"))
            .unwrap();
        assert_eq!(leaf.pointer, "/definitions/sub/definitions/leaf");

        let named = pool.resolve(&uri("http://example.com/root.json#named")).unwrap();
        assert_eq!(pool.value_at(&named).unwrap()["type"], "string");

        assert!(pool.resolve(&uri("http://example.com/root.json#/missing")).is_none());
        Ok(())
    }

    #[test]
    fn test_draft4_uses_id_keyword() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(
            None,
            json!({"id": "http://example.com/four.json", "$id": "http://example.com/six.json"}),
            Draft::Draft4,
        )?;
        assert!(pool.resolve(&uri("http://example.com/four.json")).is_some());
        assert!(pool.resolve(&uri("http://example.com/six.json")).is_none());
        Ok(())
    }

    #[test]
    fn test_data_keywords_are_not_scanned() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        let id = pool.register(
            None,
            json!({
                "enum": [{"$id": "http://example.com/data.json"}],
                "const": {"$ref": "relative.json"},
                "properties": {"$ref": {"type": "string"}}
            }),
            Draft::Draft7,
        )?;

        assert!(pool.resolve(&uri("http://example.com/data.json")).is_none());
        let document = pool.document(id).unwrap();
        assert_eq!(document.value["const"]["$ref"], "relative.json");
        assert_eq!(document.value["properties"]["$ref"]["type"], "string");
        Ok(())
    }

    #[test]
    fn test_duplicate_id_is_rejected_atomically() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(Some(uri("http://localhost:1234/test4.json")), json!({}), Draft::Hybrid)?;

        let err = pool
            .register(
                None,
                json!({
                    "$id": "http://localhost:1234/test4.json",
                    "definitions": {"extra": {"$id": "http://localhost:1234/extra.json"}}
                }),
                Draft::Hybrid,
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId { .. }));
        assert!(pool.resolve(&uri("http://localhost:1234/extra.json")).is_none());
        assert_eq!(pool.len(), 1);
        Ok(())
    }

    #[test]
    fn test_identical_registration_is_idempotent() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        let schema = json!({"$id": "http://example.com/same.json", "type": "integer"});
        let first = pool.register(None, schema.clone(), Draft::Hybrid)?;
        let second = pool.register(Some(uri("http://example.com/same.json")), schema, Draft::Hybrid)?;
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
        Ok(())
    }

    #[test]
    fn test_identical_registration_indexes_new_uri() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        let schema = json!({
            "$id": "http://example.com/a.json",
            "definitions": {"n": {"type": "number"}}
        });
        let first = pool.register(None, schema.clone(), Draft::Hybrid)?;
        let second = pool.register(Some(uri("http://example.com/alias.json")), schema, Draft::Hybrid)?;
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);

        assert_eq!(pool.resolve(&uri("http://example.com/alias.json")), Some(Location::root(first)));
        let location = pool.resolve(&uri("http://example.com/alias.json#/definitions/n")).unwrap();
        assert_eq!(location.pointer, "/definitions/n");
        Ok(())
    }

    #[test]
    fn test_rollback_forgets_later_registrations() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        let kept = pool.register(None, json!({"$id": "http://example.com/kept.json"}), Draft::Hybrid)?;
        let checkpoint = pool.checkpoint();

        pool.register(
            None,
            json!({"$id": "http://example.com/r.json", "definitions": {"x": {"$id": "x.json"}}}),
            Draft::Hybrid,
        )?;
        pool.register(
            Some(uri("http://example.com/kept-alias.json")),
            json!({"$id": "http://example.com/kept.json"}),
            Draft::Hybrid,
        )?;
        assert_eq!(pool.len(), 2);

        pool.rollback(checkpoint);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.checkpoint(), checkpoint);
        assert!(pool.resolve(&uri("http://example.com/r.json")).is_none());
        assert!(pool.resolve(&uri("http://example.com/x.json")).is_none());
        assert!(pool.resolve(&uri("http://example.com/kept-alias.json")).is_none());
        assert_eq!(pool.resolve(&uri("http://example.com/kept.json")), Some(Location::root(kept)));

        // The same ids can be registered again
        pool.register(None, json!({"$id": "http://example.com/r.json", "type": "string"}), Draft::Hybrid)?;
        Ok(())
    }

    #[test]
    fn test_anonymous_documents_share_default_base() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(None, json!({"$id": "u1", "type": "integer"}), Draft::Hybrid)?;
        let id = pool.register(None, json!({"$ref": "u1"}), Draft::Hybrid)?;

        let document = pool.document(id).unwrap();
        assert!(document.anonymous);
        assert_eq!(document.value["$ref"], "json-schema:///u1");
        assert!(pool.resolve(&uri("json-schema:///u1")).is_some());
        Ok(())
    }

    #[test]
    fn test_percent_encoded_pointer() -> SchemaResult<()> {
        let mut pool = SchemaPool::new();
        pool.register(
            Some(uri("http://example.com/p.json")),
            json!({"definitions": {"a b": {"type": "null"}, "c/d": {"type": "string"}}}),
            Draft::Draft7,
        )?;
        assert!(pool.resolve(&uri("http://example.com/p.json#/definitions/a%20b")).is_some());
        assert!(pool.resolve(&uri("http://example.com/p.json#/definitions/c~1d")).is_some());
        Ok(())
    }

    #[test]
    fn test_location_join_escapes() {
        let location = Location::root(3).join(["properties", "a/b", "~x"]);
        assert_eq!(location.document, 3);
        assert_eq!(location.pointer, "/properties/a~1b/~0x");
    }
}
