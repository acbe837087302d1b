//! Typed keyword constraints and their compilation
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use super::{Compiler, NodeId};
use crate::draft::Draft;
use crate::error::{SchemaError, SchemaResult};
use crate::loader::pool::{Location, RawDocument};
use crate::validation::equality::json_equal;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// JSON instance types as named by the `type` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(JsonType::Null),
            "boolean" => Some(JsonType::Boolean),
            "integer" => Some(JsonType::Integer),
            "number" => Some(JsonType::Number),
            "string" => Some(JsonType::String),
            "array" => Some(JsonType::Array),
            "object" => Some(JsonType::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }

    /// Most specific type of a value; numbers without a fractional part are integers
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonType::Integer,
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => JsonType::Integer,
                _ => JsonType::Number,
            },
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of types a `type` keyword allows, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSet(Vec<JsonType>);

impl TypeSet {
    pub fn new(types: Vec<JsonType>) -> Self {
        Self(types)
    }

    pub fn types(&self) -> &[JsonType] {
        &self.0
    }

    pub fn matches(&self, value: &Value) -> bool {
        let actual = JsonType::of(value);
        self.0.contains(&actual) || (actual == JsonType::Integer && self.0.contains(&JsonType::Number))
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|t| t.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Items {
    /// One schema for every item
    Uniform(NodeId),
    /// One schema per position
    Tuple(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Properties(Vec<String>),
    Schema(NodeId),
}

/// Constraints of one schema object
#[derive(Debug, Default)]
pub struct Keywords {
    pub types: Option<TypeSet>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    pub minimum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub multiple_of: Option<Number>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<Regex>,
    pub format: Option<String>,

    pub items: Option<Items>,
    pub additional_items: Option<NodeId>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub contains: Option<NodeId>,

    pub properties: BTreeMap<String, NodeId>,
    pub pattern_properties: Vec<(Regex, NodeId)>,
    pub additional_properties: Option<NodeId>,
    pub property_names: Option<NodeId>,
    pub required: Vec<String>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub dependencies: BTreeMap<String, Dependency>,

    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub not: Option<NodeId>,
    pub if_: Option<NodeId>,
    pub then_: Option<NodeId>,
    pub else_: Option<NodeId>,
}

impl Keywords {
    /// Subschemas applied to the same instance rather than to a part of it
    pub fn in_place_children(&self) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self
            .all_of
            .iter()
            .chain(&self.any_of)
            .chain(&self.one_of)
            .copied()
            .collect();
        children.extend(self.not);
        children.extend(self.if_);
        children.extend(self.then_);
        children.extend(self.else_);
        children.extend(self.dependencies.values().filter_map(|dependency| match dependency {
            Dependency::Schema(id) => Some(*id),
            Dependency::Properties(_) => None,
        }));
        children
    }
}

/// Position of the schema object being compiled, for error messages
struct Site<'d> {
    document: &'d RawDocument,
    location: &'d Location,
}

impl Site<'_> {
    fn describe(&self) -> String {
        self.document.describe(&self.location.pointer)
    }

    fn invalid(&self, keyword: &str, reason: impl Into<String>) -> SchemaError {
        SchemaError::invalid_keyword(keyword, self.describe(), reason)
    }

    fn number(&self, map: &Map<String, Value>, keyword: &str) -> SchemaResult<Option<Number>> {
        match map.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n.clone())),
            Some(_) => Err(self.invalid(keyword, "must be a number")),
        }
    }

    fn non_negative_integer(&self, map: &Map<String, Value>, keyword: &str) -> SchemaResult<Option<u64>> {
        let Some(value) = map.get(keyword) else {
            return Ok(None);
        };
        if let Some(n) = value.as_u64() {
            return Ok(Some(n));
        }
        match value.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
            _ => Err(self.invalid(keyword, "must be a non-negative integer")),
        }
    }

    fn regex(&self, pattern: &str) -> SchemaResult<Regex> {
        Regex::new(pattern).map_err(|e| SchemaError::invalid_pattern(pattern, self.describe(), e))
    }
}

impl Compiler<'_> {
    pub(super) fn compile_keywords(
        &mut self,
        map: &Map<String, Value>,
        location: &Location,
        document: &RawDocument,
    ) -> SchemaResult<Keywords> {
        let site = Site { document, location };
        let draft = document.draft;
        let mut keywords = Keywords::default();

        keywords.types = compile_types(&site, map)?;
        keywords.enum_values = compile_enum(&site, map, draft)?;
        if draft.has_draft6_vocabulary() {
            keywords.const_value = map.get("const").cloned();
        }

        self.compile_numeric(&site, map, draft, &mut keywords)?;
        self.compile_string(&site, map, &mut keywords)?;
        self.compile_array(&site, map, draft, &mut keywords)?;
        self.compile_object(&site, map, draft, &mut keywords)?;
        self.compile_combinators(&site, map, draft, &mut keywords)?;

        if let Some(definitions) = map.get("definitions") {
            let Value::Object(definitions) = definitions else {
                return Err(site.invalid("definitions", "must be an object"));
            };
            for name in definitions.keys() {
                self.compile_child(location, ["definitions", name.as_str()])?;
            }
        }

        Ok(keywords)
    }

    fn compile_numeric(
        &mut self,
        site: &Site<'_>,
        map: &Map<String, Value>,
        draft: Draft,
        keywords: &mut Keywords,
    ) -> SchemaResult<()> {
        keywords.minimum = site.number(map, "minimum")?;
        keywords.maximum = site.number(map, "maximum")?;

        if let Some(multiple_of) = site.number(map, "multipleOf")? {
            if multiple_of.as_f64().map_or(true, |m| m <= 0.0) {
                return Err(site.invalid("multipleOf", "must be strictly greater than 0"));
            }
            keywords.multiple_of = Some(multiple_of);
        }

        keywords.exclusive_minimum =
            exclusive_bound(site, map, draft, "exclusiveMinimum", "minimum", &mut keywords.minimum)?;
        keywords.exclusive_maximum =
            exclusive_bound(site, map, draft, "exclusiveMaximum", "maximum", &mut keywords.maximum)?;
        Ok(())
    }

    fn compile_string(&mut self, site: &Site<'_>, map: &Map<String, Value>, keywords: &mut Keywords) -> SchemaResult<()> {
        keywords.min_length = site.non_negative_integer(map, "minLength")?;
        keywords.max_length = site.non_negative_integer(map, "maxLength")?;

        match map.get("pattern") {
            None => {}
            Some(Value::String(pattern)) => keywords.pattern = Some(site.regex(pattern)?),
            Some(_) => return Err(site.invalid("pattern", "must be a string")),
        }

        match map.get("format") {
            None => {}
            Some(Value::String(format)) => {
                if !self.formats.contains(format) && !self.strict_formats && self.warned_formats.insert(format.clone()) {
                    warn!(name = %format, location = %site.describe(), "Unknown format, values will not be checked");
                }
                keywords.format = Some(format.clone());
            }
            Some(_) => return Err(site.invalid("format", "must be a string")),
        }
        Ok(())
    }

    fn compile_array(
        &mut self,
        site: &Site<'_>,
        map: &Map<String, Value>,
        draft: Draft,
        keywords: &mut Keywords,
    ) -> SchemaResult<()> {
        let location = site.location;

        keywords.items = match map.get("items") {
            None => None,
            Some(Value::Array(items)) => {
                let mut tuple = Vec::with_capacity(items.len());
                for index in 0..items.len() {
                    tuple.push(self.compile_child(location, ["items", index.to_string().as_str()])?);
                }
                Some(Items::Tuple(tuple))
            }
            Some(Value::Object(_)) | Some(Value::Bool(_)) => Some(Items::Uniform(self.compile_child(location, ["items"])?)),
            Some(_) => return Err(site.invalid("items", "must be a schema or an array of schemas")),
        };
        keywords.additional_items = self.compile_additional(site, map, "additionalItems")?;

        keywords.min_items = site.non_negative_integer(map, "minItems")?;
        keywords.max_items = site.non_negative_integer(map, "maxItems")?;
        keywords.unique_items = match map.get("uniqueItems") {
            None => false,
            Some(Value::Bool(unique)) => *unique,
            Some(_) => return Err(site.invalid("uniqueItems", "must be a boolean")),
        };

        if draft.has_draft6_vocabulary() && map.contains_key("contains") {
            keywords.contains = Some(self.compile_child(location, ["contains"])?);
        }
        Ok(())
    }

    fn compile_object(
        &mut self,
        site: &Site<'_>,
        map: &Map<String, Value>,
        draft: Draft,
        keywords: &mut Keywords,
    ) -> SchemaResult<()> {
        let location = site.location;

        if let Some(properties) = map.get("properties") {
            let Value::Object(properties) = properties else {
                return Err(site.invalid("properties", "must be an object"));
            };
            for name in properties.keys() {
                let id = self.compile_child(location, ["properties", name.as_str()])?;
                keywords.properties.insert(name.clone(), id);
            }
        }

        if let Some(patterns) = map.get("patternProperties") {
            let Value::Object(patterns) = patterns else {
                return Err(site.invalid("patternProperties", "must be an object"));
            };
            for pattern in patterns.keys() {
                let regex = site.regex(pattern)?;
                let id = self.compile_child(location, ["patternProperties", pattern.as_str()])?;
                keywords.pattern_properties.push((regex, id));
            }
        }

        keywords.additional_properties = self.compile_additional(site, map, "additionalProperties")?;

        if draft.has_draft6_vocabulary() && map.contains_key("propertyNames") {
            keywords.property_names = Some(self.compile_child(location, ["propertyNames"])?);
        }

        if let Some(required) = map.get("required") {
            keywords.required = unique_strings(site, "required", required)?;
        }

        keywords.min_properties = site.non_negative_integer(map, "minProperties")?;
        keywords.max_properties = site.non_negative_integer(map, "maxProperties")?;

        if let Some(dependencies) = map.get("dependencies") {
            let Value::Object(dependencies) = dependencies else {
                return Err(site.invalid("dependencies", "must be an object"));
            };
            for (name, dependency) in dependencies {
                let dependency = match dependency {
                    Value::Array(_) => Dependency::Properties(unique_strings(site, "dependencies", dependency)?),
                    Value::Object(_) | Value::Bool(_) => {
                        Dependency::Schema(self.compile_child(location, ["dependencies", name.as_str()])?)
                    }
                    _ => {
                        return Err(site.invalid(
                            "dependencies",
                            format!("'{}' must be a schema or an array of property names", name),
                        ))
                    }
                };
                keywords.dependencies.insert(name.clone(), dependency);
            }
        }
        Ok(())
    }

    fn compile_combinators(
        &mut self,
        site: &Site<'_>,
        map: &Map<String, Value>,
        draft: Draft,
        keywords: &mut Keywords,
    ) -> SchemaResult<()> {
        keywords.all_of = self.compile_schema_list(site, map, "allOf")?;
        keywords.any_of = self.compile_schema_list(site, map, "anyOf")?;
        keywords.one_of = self.compile_schema_list(site, map, "oneOf")?;

        let location = site.location;
        if map.contains_key("not") {
            keywords.not = Some(self.compile_child(location, ["not"])?);
        }

        if draft.has_conditionals() {
            if map.contains_key("if") {
                keywords.if_ = Some(self.compile_child(location, ["if"])?);
            }
            if map.contains_key("then") {
                keywords.then_ = Some(self.compile_child(location, ["then"])?);
            }
            if map.contains_key("else") {
                keywords.else_ = Some(self.compile_child(location, ["else"])?);
            }
        }
        Ok(())
    }

    fn compile_schema_list(&mut self, site: &Site<'_>, map: &Map<String, Value>, keyword: &str) -> SchemaResult<Vec<NodeId>> {
        match map.get(keyword) {
            None => Ok(Vec::new()),
            Some(Value::Array(schemas)) if !schemas.is_empty() => (0..schemas.len())
                .map(|index| self.compile_child(site.location, [keyword, index.to_string().as_str()]))
                .collect(),
            Some(_) => Err(site.invalid(keyword, "must be a non-empty array of schemas")),
        }
    }

    /// `additionalItems`/`additionalProperties`: a schema, or a boolean in every draft
    fn compile_additional(&mut self, site: &Site<'_>, map: &Map<String, Value>, keyword: &str) -> SchemaResult<Option<NodeId>> {
        match map.get(keyword) {
            None => Ok(None),
            Some(Value::Bool(allowed)) => {
                let location = site.document.describe(&site.location.join([keyword]).pointer);
                Ok(Some(self.bool_node(*allowed, site.document.draft, location)))
            }
            Some(_) => self.compile_child(site.location, [keyword]).map(Some),
        }
    }
}

fn compile_types(site: &Site<'_>, map: &Map<String, Value>) -> SchemaResult<Option<TypeSet>> {
    let names: Vec<&Value> = match map.get("type") {
        None => return Ok(None),
        Some(Value::Array(names)) if !names.is_empty() => names.iter().collect(),
        Some(value @ Value::String(_)) => vec![value],
        Some(_) => return Err(site.invalid("type", "must be a type name or a non-empty array of type names")),
    };

    let mut types = Vec::with_capacity(names.len());
    for name in names {
        let json_type = name
            .as_str()
            .and_then(JsonType::from_name)
            .ok_or_else(|| site.invalid("type", format!("unknown type {}", name)))?;
        if types.contains(&json_type) {
            return Err(site.invalid("type", format!("duplicate type '{}'", json_type)));
        }
        types.push(json_type);
    }
    Ok(Some(TypeSet::new(types)))
}

fn compile_enum(site: &Site<'_>, map: &Map<String, Value>, draft: Draft) -> SchemaResult<Option<Vec<Value>>> {
    let values = match map.get("enum") {
        None => return Ok(None),
        Some(Value::Array(values)) => values,
        Some(_) => return Err(site.invalid("enum", "must be an array")),
    };

    // Draft-07 relaxed the enum shape to any array
    if draft < Draft::Draft7 {
        if values.is_empty() {
            return Err(site.invalid("enum", "must not be empty"));
        }
        if has_duplicates(values) {
            return Err(site.invalid("enum", "items must be unique"));
        }
    }
    Ok(Some(values.clone()))
}

fn exclusive_bound(
    site: &Site<'_>,
    map: &Map<String, Value>,
    draft: Draft,
    keyword: &str,
    paired: &str,
    bound: &mut Option<Number>,
) -> SchemaResult<Option<Number>> {
    match map.get(keyword) {
        None => Ok(None),
        Some(Value::Bool(exclusive)) => {
            if !draft.accepts_boolean_exclusive_bounds() {
                return Err(site.invalid(keyword, "must be a number"));
            }
            if bound.is_none() {
                return Err(site.invalid(keyword, format!("requires '{}'", paired)));
            }
            // The paired bound becomes exclusive
            Ok(if *exclusive { bound.take() } else { None })
        }
        Some(Value::Number(n)) => {
            if !draft.accepts_numeric_exclusive_bounds() {
                return Err(site.invalid(keyword, "must be a boolean"));
            }
            Ok(Some(n.clone()))
        }
        Some(_) if draft == Draft::Draft4 => Err(site.invalid(keyword, "must be a boolean")),
        Some(_) => Err(site.invalid(keyword, "must be a number")),
    }
}

fn unique_strings(site: &Site<'_>, keyword: &str, value: &Value) -> SchemaResult<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(site.invalid(keyword, "must be an array of strings"));
    };

    let mut strings: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(site.invalid(keyword, "must be an array of strings"));
        };
        if strings.iter().any(|existing| existing == s) {
            return Err(site.invalid(keyword, format!("duplicate entry '{}'", s)));
        }
        strings.push(s.to_string());
    }
    Ok(strings)
}

fn has_duplicates(values: &[Value]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, a)| values[i + 1..].iter().any(|b| json_equal(a, b)))
}
