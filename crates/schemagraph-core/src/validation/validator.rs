//! Recursive validation of an instance against a compiled graph
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::compiler::{Dependency, Items, JsonType, Keywords, NodeId, NodeKind, SchemaGraph};
use crate::error::{SchemaError, SchemaResult};
use crate::validation::context::JsonContext;
use crate::validation::equality::{compare_numbers, is_multiple_of, json_equal};
use crate::validation::result::{ErrorDetails, ErrorKind, ResultError, ValidationResult};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// Walks a [`SchemaGraph`] and an instance in lockstep
///
/// Holds no state besides the graph, so one validator may run any number of
/// times and from any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'g> {
    graph: &'g SchemaGraph,
}

impl<'g> Validator<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self { graph }
    }

    /// Validate `instance` against the graph root
    pub fn validate(&self, instance: &Value) -> SchemaResult<ValidationResult> {
        self.validate_at(self.graph.root(), instance, &JsonContext::root())
    }

    /// Validate `instance` against one node, reporting paths under `context`
    pub fn validate_at(&self, id: NodeId, instance: &Value, context: &JsonContext<'_>) -> SchemaResult<ValidationResult> {
        let mut result = ValidationResult::new();
        self.validate_node(id, instance, context, &mut result)?;
        Ok(result)
    }

    fn validate_node(
        &self,
        id: NodeId,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| SchemaError::malformed_graph(format!("node {} does not exist", id)))?;

        match &node.kind {
            NodeKind::Bool(true) => Ok(()),
            NodeKind::Bool(false) => {
                result.add(ResultError::new(ErrorKind::False, context, instance, ErrorDetails::new()));
                Ok(())
            }
            NodeKind::Ref(target) => self.validate_node(*target, instance, context, result),
            NodeKind::Keywords(keywords) => self.validate_keywords(keywords, instance, context, result),
            NodeKind::Pending => Err(SchemaError::malformed_graph(format!(
                "node at '{}' was never compiled",
                node.location
            ))),
        }
    }

    fn is_false(&self, id: NodeId) -> bool {
        matches!(self.graph.node(id).map(|node| &node.kind), Some(NodeKind::Bool(false)))
    }

    fn validate_keywords(
        &self,
        keywords: &Keywords,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        if let Some(types) = &keywords.types {
            if !types.matches(instance) {
                // Nothing else is meaningful for a value of the wrong type
                result.add(error(
                    ErrorKind::InvalidType,
                    context,
                    instance,
                    [
                        ("expected", Value::String(types.to_string())),
                        ("given", Value::String(JsonType::of(instance).as_str().to_string())),
                    ],
                ));
                return Ok(());
            }
        }

        if let Some(expected) = &keywords.const_value {
            if !json_equal(expected, instance) {
                result.add(error(ErrorKind::Const, context, instance, [("allowed", expected.clone())]));
            }
        }

        if let Some(allowed) = &keywords.enum_values {
            if !allowed.iter().any(|value| json_equal(value, instance)) {
                let rendered: Vec<String> = allowed.iter().map(Value::to_string).collect();
                result.add(error(
                    ErrorKind::Enum,
                    context,
                    instance,
                    [("allowed", Value::String(rendered.join(", ")))],
                ));
            }
        }

        self.validate_combinators(keywords, instance, context, result)?;
        self.validate_conditionals(keywords, instance, context, result)?;

        match instance {
            Value::Number(number) => validate_number(keywords, number, instance, context, result),
            Value::String(string) => self.validate_string(keywords, string, instance, context, result),
            Value::Array(items) => self.validate_array(keywords, items, instance, context, result)?,
            Value::Object(object) => self.validate_object(keywords, object, instance, context, result)?,
            Value::Null | Value::Bool(_) => {}
        }
        Ok(())
    }

    fn validate_combinators(
        &self,
        keywords: &Keywords,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        if !keywords.all_of.is_empty() {
            let mut all_valid = true;
            for branch in &keywords.all_of {
                let branch_result = self.validate_at(*branch, instance, context)?;
                if !branch_result.is_valid() {
                    all_valid = false;
                    result.merge(branch_result);
                }
            }
            if !all_valid {
                result.add(error(ErrorKind::NumberAllOf, context, instance, []));
            }
        }

        if !keywords.any_of.is_empty() {
            let mut any_valid = false;
            for branch in &keywords.any_of {
                if self.validate_at(*branch, instance, context)?.is_valid() {
                    any_valid = true;
                    break;
                }
            }
            if !any_valid {
                result.add(error(ErrorKind::NumberAnyOf, context, instance, []));
            }
        }

        if !keywords.one_of.is_empty() {
            let mut matches = 0usize;
            for branch in &keywords.one_of {
                if self.validate_at(*branch, instance, context)?.is_valid() {
                    matches += 1;
                }
            }
            match matches {
                1 => {}
                0 => result.add(error(ErrorKind::NumberOneOf, context, instance, [])),
                _ => result.add(error(
                    ErrorKind::NumberOneOfMultiple,
                    context,
                    instance,
                    [("matches", Value::from(matches))],
                )),
            }
        }

        if let Some(not) = keywords.not {
            if self.validate_at(not, instance, context)?.is_valid() {
                result.add(error(ErrorKind::NumberNot, context, instance, []));
            }
        }
        Ok(())
    }

    fn validate_conditionals(
        &self,
        keywords: &Keywords,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        let Some(condition) = keywords.if_ else {
            return Ok(());
        };

        let (branch, kind) = if self.validate_at(condition, instance, context)?.is_valid() {
            (keywords.then_, ErrorKind::ConditionThen)
        } else {
            (keywords.else_, ErrorKind::ConditionElse)
        };

        if let Some(branch) = branch {
            let branch_result = self.validate_at(branch, instance, context)?;
            if !branch_result.is_valid() {
                result.merge(branch_result);
                result.add(error(kind, context, instance, []));
            }
        }
        Ok(())
    }

    fn validate_string(
        &self,
        keywords: &Keywords,
        string: &str,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) {
        let length = string.chars().count() as u64;
        if let Some(min) = keywords.min_length {
            if length < min {
                result.add(error(ErrorKind::StringGte, context, instance, [("min", Value::from(min))]));
            }
        }
        if let Some(max) = keywords.max_length {
            if length > max {
                result.add(error(ErrorKind::StringLte, context, instance, [("max", Value::from(max))]));
            }
        }

        if let Some(pattern) = &keywords.pattern {
            if !pattern.is_match(string) {
                result.add(error(
                    ErrorKind::Pattern,
                    context,
                    instance,
                    [("pattern", Value::String(pattern.as_str().to_string()))],
                ));
            }
        }

        if let Some(format) = &keywords.format {
            let conforms = match self.graph.formats().get(format) {
                Some(checker) => checker.check(string),
                None => !self.graph.strict_formats(),
            };
            if !conforms {
                result.add(error(
                    ErrorKind::Format,
                    context,
                    instance,
                    [("format", Value::String(format.clone()))],
                ));
            }
        }
    }

    fn validate_array(
        &self,
        keywords: &Keywords,
        items: &[Value],
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        match &keywords.items {
            Some(Items::Uniform(schema)) => {
                for (index, item) in items.iter().enumerate() {
                    self.validate_node(*schema, item, &context.child_index(index), result)?;
                }
            }
            Some(Items::Tuple(schemas)) => {
                for (index, (schema, item)) in schemas.iter().zip(items).enumerate() {
                    self.validate_node(*schema, item, &context.child_index(index), result)?;
                }

                if items.len() > schemas.len() {
                    match keywords.additional_items {
                        Some(additional) if self.is_false(additional) => {
                            result.add(error(ErrorKind::ArrayNoAdditionalItems, context, instance, []));
                        }
                        Some(additional) => {
                            for (index, item) in items.iter().enumerate().skip(schemas.len()) {
                                self.validate_node(additional, item, &context.child_index(index), result)?;
                            }
                        }
                        None => {}
                    }
                }
            }
            None => {}
        }

        let count = items.len() as u64;
        if let Some(min) = keywords.min_items {
            if count < min {
                result.add(error(ErrorKind::ArrayMinItems, context, instance, [("min", Value::from(min))]));
            }
        }
        if let Some(max) = keywords.max_items {
            if count > max {
                result.add(error(ErrorKind::ArrayMaxItems, context, instance, [("max", Value::from(max))]));
            }
        }

        if keywords.unique_items {
            if let Some((i, j)) = first_duplicate(items) {
                result.add(error(
                    ErrorKind::Unique,
                    context,
                    instance,
                    [
                        ("type", Value::String(JsonType::of(&items[i]).as_str().to_string())),
                        ("i", Value::from(i)),
                        ("j", Value::from(j)),
                    ],
                ));
            }
        }

        if let Some(contains) = keywords.contains {
            let mut found = false;
            for (index, item) in items.iter().enumerate() {
                if self.validate_at(contains, item, &context.child_index(index))?.is_valid() {
                    found = true;
                    break;
                }
            }
            if !found {
                result.add(error(ErrorKind::Contains, context, instance, []));
            }
        }
        Ok(())
    }

    fn validate_object(
        &self,
        keywords: &Keywords,
        object: &Map<String, Value>,
        instance: &Value,
        context: &JsonContext<'_>,
        result: &mut ValidationResult,
    ) -> SchemaResult<()> {
        for property in &keywords.required {
            if !object.contains_key(property) {
                result.add(error(
                    ErrorKind::Required,
                    context,
                    instance,
                    [("property", Value::String(property.clone()))],
                ));
            }
        }

        for (name, value) in object {
            let child = context.child(name);
            let mut matched = false;

            if let Some(schema) = keywords.properties.get(name) {
                matched = true;
                self.validate_node(*schema, value, &child, result)?;
            }

            for (pattern, schema) in &keywords.pattern_properties {
                if pattern.is_match(name) {
                    matched = true;
                    self.validate_node(*schema, value, &child, result)?;
                }
            }

            if matched {
                continue;
            }
            match keywords.additional_properties {
                Some(additional) if self.is_false(additional) => {
                    result.add(error(
                        ErrorKind::AdditionalPropertyNotAllowed,
                        context,
                        instance,
                        [("property", Value::String(name.clone()))],
                    ));
                }
                Some(additional) => self.validate_node(additional, value, &child, result)?,
                None => {}
            }
        }

        if let Some(names) = keywords.property_names {
            for name in object.keys() {
                let name_value = Value::String(name.clone());
                if !self.validate_at(names, &name_value, &context.child(name))?.is_valid() {
                    result.add(error(
                        ErrorKind::InvalidPropertyName,
                        context,
                        instance,
                        [("property", name_value)],
                    ));
                }
            }
        }

        let count = object.len() as u64;
        if let Some(min) = keywords.min_properties {
            if count < min {
                result.add(error(ErrorKind::ArrayMinProperties, context, instance, [("min", Value::from(min))]));
            }
        }
        if let Some(max) = keywords.max_properties {
            if count > max {
                result.add(error(ErrorKind::ArrayMaxProperties, context, instance, [("max", Value::from(max))]));
            }
        }

        for (name, dependency) in &keywords.dependencies {
            if !object.contains_key(name) {
                continue;
            }
            match dependency {
                Dependency::Properties(properties) => {
                    for property in properties.iter().filter(|p| !object.contains_key(*p)) {
                        result.add(error(
                            ErrorKind::MissingDependency,
                            context,
                            instance,
                            [("dependency", Value::String(property.clone()))],
                        ));
                    }
                }
                Dependency::Schema(schema) => self.validate_node(*schema, instance, context, result)?,
            }
        }
        Ok(())
    }
}

fn validate_number(
    keywords: &Keywords,
    number: &Number,
    instance: &Value,
    context: &JsonContext<'_>,
    result: &mut ValidationResult,
) {
    if let Some(multiple) = &keywords.multiple_of {
        if !is_multiple_of(number, multiple) {
            result.add(error(
                ErrorKind::MultipleOf,
                context,
                instance,
                [("multiple", Value::Number(multiple.clone()))],
            ));
        }
    }

    let checks = [
        (&keywords.minimum, ErrorKind::NumberGte, "min", Ordering::Less, false),
        (&keywords.exclusive_minimum, ErrorKind::NumberGt, "min", Ordering::Less, true),
        (&keywords.maximum, ErrorKind::NumberLte, "max", Ordering::Greater, false),
        (&keywords.exclusive_maximum, ErrorKind::NumberLt, "max", Ordering::Greater, true),
    ];
    for (bound, kind, name, violating, exclusive) in checks {
        let Some(bound) = bound else {
            continue;
        };
        let ordering = compare_numbers(number, bound);
        if ordering == violating || (exclusive && ordering == Ordering::Equal) {
            result.add(error(kind, context, instance, [(name, Value::Number(bound.clone()))]));
        }
    }
}

fn first_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    for (i, a) in items.iter().enumerate() {
        for (offset, b) in items[i + 1..].iter().enumerate() {
            if json_equal(a, b) {
                return Some((i, i + 1 + offset));
            }
        }
    }
    None
}

fn error<const N: usize>(
    kind: ErrorKind,
    context: &JsonContext<'_>,
    instance: &Value,
    details: [(&str, Value); N],
) -> ResultError {
    let details: ErrorDetails = details
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    ResultError::new(kind, context, instance, details)
}
