//! Compilation of registered documents into an arena-backed schema graph
//!
//! Nodes are addressed by index. A `$ref` becomes a [`NodeKind::Ref`] edge
//! to the node compiled for its target, so two references to one location
//! share a node and recursive schemas become cycles in the arena. Each node
//! is memoized by location before its children are compiled, which is what
//! stops self-references from expanding forever.
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

pub mod keywords;

pub use keywords::{Dependency, Items, JsonType, Keywords, TypeSet};

use crate::draft::{Draft, DraftResolver};
use crate::error::{SchemaError, SchemaResult};
use crate::format::FormatRegistry;
use crate::loader::pool::{Location, RawDocument, SchemaPool};
use crate::loader::retriever::Retrieve;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use url::Url;

pub type NodeId = usize;

/// One compiled (sub)schema
#[derive(Debug)]
pub struct SchemaNode {
    /// Draft of the document this node came from
    pub draft: Draft,
    /// `uri#pointer` of the source location
    pub location: String,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    /// Placeholder while the node's children are being compiled
    Pending,
    Bool(bool),
    Ref(NodeId),
    Keywords(Box<Keywords>),
}

/// Immutable result of a compilation
#[derive(Debug)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    root: NodeId,
    formats: FormatRegistry,
    strict_formats: bool,
}

impl SchemaGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn strict_formats(&self) -> bool {
        self.strict_formats
    }
}

/// Builds a [`SchemaGraph`] from a location in the pool
pub struct Compiler<'a> {
    pool: &'a mut SchemaPool,
    retriever: &'a dyn Retrieve,
    resolver: DraftResolver,
    formats: &'a FormatRegistry,
    strict_formats: bool,
    nodes: Vec<SchemaNode>,
    memo: HashMap<Location, NodeId>,
    warned_formats: HashSet<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(
        pool: &'a mut SchemaPool,
        retriever: &'a dyn Retrieve,
        resolver: DraftResolver,
        formats: &'a FormatRegistry,
    ) -> Self {
        Self {
            pool,
            retriever,
            resolver,
            formats,
            strict_formats: false,
            nodes: Vec::new(),
            memo: HashMap::new(),
            warned_formats: HashSet::new(),
        }
    }

    pub fn strict_formats(mut self, strict: bool) -> Self {
        self.strict_formats = strict;
        self
    }

    /// Compile everything reachable from `root`
    pub fn compile(mut self, root: &Location) -> SchemaResult<SchemaGraph> {
        let root = self.compile_location(root)?;
        self.check_complete()?;
        self.check_cycles()?;

        debug!(nodes = self.nodes.len(), "Compiled schema graph");
        Ok(SchemaGraph {
            nodes: self.nodes,
            root,
            formats: self.formats.clone(),
            strict_formats: self.strict_formats,
        })
    }

    fn compile_location(&mut self, location: &Location) -> SchemaResult<NodeId> {
        if let Some(&id) = self.memo.get(location) {
            return Ok(id);
        }

        let document = self.pool.document(location.document).ok_or_else(|| {
            SchemaError::malformed_graph(format!("document {} is not registered", location.document))
        })?;
        let described = document.describe(&location.pointer);
        let value = document.value.pointer(&location.pointer).ok_or_else(|| {
            SchemaError::unresolved_reference(described.as_str(), document.uri.as_str(), "no schema at this location")
        })?;

        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            draft: document.draft,
            location: described,
            kind: NodeKind::Pending,
        });
        self.memo.insert(location.clone(), id);

        let kind = self.compile_value(value, location, &document)?;
        self.nodes[id].kind = kind;
        Ok(id)
    }

    fn compile_value(&mut self, value: &Value, location: &Location, document: &RawDocument) -> SchemaResult<NodeKind> {
        let map = match value {
            Value::Bool(valid) => {
                if !document.draft.has_draft6_vocabulary() {
                    return Err(SchemaError::invalid_keyword(
                        "schema",
                        document.describe(&location.pointer),
                        "boolean schemas require draft-06 or later",
                    ));
                }
                return Ok(NodeKind::Bool(*valid));
            }
            Value::Object(map) => map,
            _ => {
                return Err(SchemaError::invalid_keyword(
                    "schema",
                    document.describe(&location.pointer),
                    "must be an object or a boolean",
                ))
            }
        };

        if let Some(declared) = map.get("$schema") {
            if !declared.is_string() {
                return Err(SchemaError::invalid_keyword(
                    "$schema",
                    document.describe(&location.pointer),
                    "must be a string",
                ));
            }
        }

        match map.get("$ref") {
            Some(Value::String(reference)) => {
                let target = self.resolve_reference(reference, location, document)?;
                Ok(NodeKind::Ref(target))
            }
            Some(_) => Err(SchemaError::invalid_keyword(
                "$ref",
                document.describe(&location.pointer),
                "must be a string",
            )),
            None => {
                let keywords = self.compile_keywords(map, location, document)?;
                Ok(NodeKind::Keywords(Box::new(keywords)))
            }
        }
    }

    fn resolve_reference(&mut self, reference: &str, location: &Location, document: &RawDocument) -> SchemaResult<NodeId> {
        // `$ref`s were made absolute when the document was registered
        let uri = Url::parse(reference).map_err(|e| SchemaError::invalid_uri(reference, e))?;
        let target = self
            .pool
            .locate(&uri, self.retriever, &self.resolver)
            .map_err(|e| match e {
                SchemaError::UnresolvedReference { reason, .. } => SchemaError::unresolved_reference(
                    reference,
                    document.describe(&location.pointer),
                    reason,
                ),
                other => other,
            })?;
        debug!(reference, "Compiling reference target");
        self.compile_location(&target)
    }

    /// Compile the schema at `location` joined with `segments`
    fn compile_child<'s>(
        &mut self,
        location: &Location,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> SchemaResult<NodeId> {
        self.compile_location(&location.join(segments))
    }

    /// A boolean node with no source location of its own
    fn bool_node(&mut self, valid: bool, draft: Draft, location: String) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            draft,
            location,
            kind: NodeKind::Bool(valid),
        });
        id
    }

    fn check_complete(&self) -> SchemaResult<()> {
        match self.nodes.iter().find(|node| matches!(node.kind, NodeKind::Pending)) {
            Some(node) => Err(SchemaError::malformed_graph(format!(
                "node at '{}' was never compiled",
                node.location
            ))),
            None => Ok(()),
        }
    }

    /// Reject cycles made only of edges that re-validate the same instance
    fn check_cycles(&self) -> SchemaResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            Active,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            // Iterative DFS; each frame holds a node and its remaining edges
            let mut stack: Vec<(NodeId, Vec<NodeId>)> = vec![(start, self.in_place_edges(start))];
            marks[start] = Mark::Active;

            while let Some((node, edges)) = stack.last_mut() {
                let node = *node;
                match edges.pop() {
                    Some(next) => match marks[next] {
                        Mark::Unvisited => {
                            marks[next] = Mark::Active;
                            stack.push((next, self.in_place_edges(next)));
                        }
                        Mark::Active => {
                            let mut chain: Vec<String> = stack
                                .iter()
                                .map(|(id, _)| *id)
                                .skip_while(|id| *id != next)
                                .map(|id| self.nodes[id].location.clone())
                                .collect();
                            chain.push(self.nodes[next].location.clone());
                            return Err(SchemaError::circular_reference(chain));
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Children evaluated against the same instance as `id`
    fn in_place_edges(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id].kind {
            NodeKind::Ref(target) => vec![*target],
            NodeKind::Keywords(keywords) => keywords.in_place_children(),
            NodeKind::Pending | NodeKind::Bool(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::retriever::InMemoryRetriever;

    fn compile_value(value: Value, draft: Draft) -> SchemaResult<SchemaGraph> {
        let mut pool = SchemaPool::new();
        let id = pool.register(None, value, draft)?;
        let retriever = InMemoryRetriever::new();
        let formats = FormatRegistry::default();
        let resolver = DraftResolver {
            auto_detect: true,
            default_draft: Draft::Hybrid,
            strict: false,
        };
        Compiler::new(&mut pool, &retriever, resolver, &formats).compile(&Location::root(id))
    }

    #[test]
    fn test_shared_reference_targets() -> SchemaResult<()> {
        let graph = compile_value(
            serde_json::json!({
                "properties": {
                    "a": {"$ref": "#/definitions/n"},
                    "b": {"$ref": "#/definitions/n"}
                },
                "definitions": {"n": {"type": "number"}}
            }),
            Draft::Draft7,
        )?;

        let root = graph.node(graph.root()).unwrap();
        let NodeKind::Keywords(keywords) = &root.kind else {
            panic!("root should hold keywords");
        };
        let target_of = |name: &str| match &graph.node(keywords.properties[name]).unwrap().kind {
            NodeKind::Ref(target) => *target,
            other => panic!("expected a reference, got {:?}", other),
        };
        assert_eq!(target_of("a"), target_of("b"));
        Ok(())
    }

    #[test]
    fn test_recursive_schema_compiles() -> SchemaResult<()> {
        let graph = compile_value(
            serde_json::json!({
                "type": "object",
                "properties": {"children": {"type": "array", "items": {"$ref": "#"}}}
            }),
            Draft::Draft7,
        )?;
        assert_eq!(graph.len(), 3);
        Ok(())
    }

    #[test]
    fn test_in_place_cycles_are_rejected() {
        let err = compile_value(serde_json::json!({"$ref": "#"}), Draft::Draft7).unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference { .. }));

        let err = compile_value(
            serde_json::json!({
                "definitions": {
                    "a": {"allOf": [{"$ref": "#/definitions/b"}]},
                    "b": {"anyOf": [{"$ref": "#/definitions/a"}]}
                },
                "not": {"$ref": "#/definitions/a"}
            }),
            Draft::Draft7,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/definitions/a"));
    }

    #[test]
    fn test_boolean_schemas_per_draft() {
        assert!(compile_value(Value::Bool(true), Draft::Draft6).is_ok());

        let err = compile_value(Value::Bool(false), Draft::Draft4).unwrap_err();
        assert!(err.to_string().contains("draft-06"));

        // additionalProperties keeps its boolean form everywhere
        assert!(compile_value(serde_json::json!({"additionalProperties": false}), Draft::Draft4).is_ok());
    }

    #[test]
    fn test_non_schema_values_are_rejected() {
        let err = compile_value(serde_json::json!({"items": 3}), Draft::Draft7).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyword { .. }));

        let err = compile_value(serde_json::json!({"$ref": 3}), Draft::Draft7).unwrap_err();
        assert!(err.to_string().contains("'$ref'"));
    }

    #[test]
    fn test_unresolved_pointer() {
        let err = compile_value(serde_json::json!({"$ref": "#/definitions/missing"}), Draft::Draft7).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
    }
}
