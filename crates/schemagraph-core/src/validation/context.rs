//! Position of the instance value being validated
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::loader::pool::escape_pointer_segment;

const ROOT: &str = "(root)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Root,
    Key(&'a str),
    Index(usize),
}

/// A path into the instance, built as a linked list on the stack
#[derive(Debug, Clone, Copy)]
pub struct JsonContext<'a> {
    head: Segment<'a>,
    parent: Option<&'a JsonContext<'a>>,
}

impl<'a> JsonContext<'a> {
    pub fn root() -> Self {
        Self {
            head: Segment::Root,
            parent: None,
        }
    }

    pub fn child(&'a self, key: &'a str) -> JsonContext<'a> {
        JsonContext {
            head: Segment::Key(key),
            parent: Some(self),
        }
    }

    pub fn child_index(&'a self, index: usize) -> JsonContext<'a> {
        JsonContext {
            head: Segment::Index(index),
            parent: Some(self),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Segments from the root down, excluding the root itself
    fn segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(context) = current {
            match context.head {
                Segment::Root => {}
                Segment::Key(key) => segments.push(key.to_string()),
                Segment::Index(index) => segments.push(index.to_string()),
            }
            current = context.parent;
        }
        segments.reverse();
        segments
    }

    /// Full dotted path, `(root).a.0`
    pub fn render(&self) -> String {
        let mut rendered = ROOT.to_string();
        for segment in self.segments() {
            rendered.push('.');
            rendered.push_str(&segment);
        }
        rendered
    }

    /// Dotted path without the root marker, `a.0`; the root itself is `(root)`
    pub fn field(&self) -> String {
        if self.is_root() {
            ROOT.to_string()
        } else {
            self.segments().join(".")
        }
    }

    /// JSON pointer, `/a/0`; the root is the empty pointer
    pub fn pointer(&self) -> String {
        self.segments()
            .iter()
            .map(|segment| format!("/{}", escape_pointer_segment(segment)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context() {
        let root = JsonContext::root();
        assert!(root.is_root());
        assert_eq!(root.render(), "(root)");
        assert_eq!(root.field(), "(root)");
        assert_eq!(root.pointer(), "");
    }

    #[test]
    fn test_nested_context() {
        let root = JsonContext::root();
        let friends = root.child("friends");
        let first = friends.child_index(0);
        let name = first.child("a/b");

        assert_eq!(name.render(), "(root).friends.0.a/b");
        assert_eq!(name.field(), "friends.0.a/b");
        assert_eq!(name.pointer(), "/friends/0/a~1b");
    }
}
