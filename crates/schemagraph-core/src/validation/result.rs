//! Structured validation findings
//!
//! Copyright (c) 2025 Specado Team
//! Licensed under the Apache-2.0 license

use crate::validation::context::JsonContext;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Stable error types, one per violated keyword or combinator outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    False,
    Required,
    InvalidType,
    NumberAnyOf,
    NumberOneOf,
    NumberOneOfMultiple,
    NumberAllOf,
    NumberNot,
    MissingDependency,
    Internal,
    Const,
    Enum,
    ArrayNoAdditionalItems,
    ArrayMinItems,
    ArrayMaxItems,
    Unique,
    Contains,
    ArrayMinProperties,
    ArrayMaxProperties,
    AdditionalPropertyNotAllowed,
    InvalidPropertyName,
    StringGte,
    StringLte,
    Pattern,
    MultipleOf,
    NumberGte,
    NumberGt,
    NumberLte,
    NumberLt,
    ConditionThen,
    ConditionElse,
    Format,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::False => "false",
            ErrorKind::Required => "required",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::NumberAnyOf => "number_any_of",
            ErrorKind::NumberOneOf => "number_one_of",
            ErrorKind::NumberOneOfMultiple => "number_one_of_multiple",
            ErrorKind::NumberAllOf => "number_all_of",
            ErrorKind::NumberNot => "number_not",
            ErrorKind::MissingDependency => "missing_dependency",
            ErrorKind::Internal => "internal",
            ErrorKind::Const => "const",
            ErrorKind::Enum => "enum",
            ErrorKind::ArrayNoAdditionalItems => "array_no_additional_items",
            ErrorKind::ArrayMinItems => "array_min_items",
            ErrorKind::ArrayMaxItems => "array_max_items",
            ErrorKind::Unique => "unique",
            ErrorKind::Contains => "contains",
            ErrorKind::ArrayMinProperties => "array_min_properties",
            ErrorKind::ArrayMaxProperties => "array_max_properties",
            ErrorKind::AdditionalPropertyNotAllowed => "additional_property_not_allowed",
            ErrorKind::InvalidPropertyName => "invalid_property_name",
            ErrorKind::StringGte => "string_gte",
            ErrorKind::StringLte => "string_lte",
            ErrorKind::Pattern => "pattern",
            ErrorKind::MultipleOf => "multiple_of",
            ErrorKind::NumberGte => "number_gte",
            ErrorKind::NumberGt => "number_gt",
            ErrorKind::NumberLte => "number_lte",
            ErrorKind::NumberLt => "number_lt",
            ErrorKind::ConditionThen => "condition_then",
            ErrorKind::ConditionElse => "condition_else",
            ErrorKind::Format => "format",
        }
    }

    /// Description template; `{name}` is replaced from the error details
    pub fn template(self) -> &'static str {
        match self {
            ErrorKind::False => "False always fails validation",
            ErrorKind::Required => "{property} is required",
            ErrorKind::InvalidType => "Invalid type. Expected: {expected}, given: {given}",
            ErrorKind::NumberAnyOf => "Must validate at least one schema (anyOf)",
            ErrorKind::NumberOneOf => "Must validate one and only one schema (oneOf)",
            ErrorKind::NumberOneOfMultiple => {
                "Must validate one and only one schema (oneOf), but {matches} schemas matched"
            }
            ErrorKind::NumberAllOf => "Must validate all the schemas (allOf)",
            ErrorKind::NumberNot => "Must not validate the schema (not)",
            ErrorKind::MissingDependency => "Has a dependency on {dependency}",
            ErrorKind::Internal => "Internal Error {error}",
            ErrorKind::Const => "{field} does not match: {allowed}",
            ErrorKind::Enum => "{field} must be one of the following: {allowed}",
            ErrorKind::ArrayNoAdditionalItems => "No additional items allowed on array",
            ErrorKind::ArrayMinItems => "Array must have at least {min} items",
            ErrorKind::ArrayMaxItems => "Array must have at most {max} items",
            ErrorKind::Unique => "{type} items[{i},{j}] must be unique",
            ErrorKind::Contains => "At least one of the items must match",
            ErrorKind::ArrayMinProperties => "Must have at least {min} properties",
            ErrorKind::ArrayMaxProperties => "Must have at most {max} properties",
            ErrorKind::AdditionalPropertyNotAllowed => "Additional property {property} is not allowed",
            ErrorKind::InvalidPropertyName => "Property name of \"{property}\" does not match",
            ErrorKind::StringGte => "String length must be greater than or equal to {min}",
            ErrorKind::StringLte => "String length must be less than or equal to {max}",
            ErrorKind::Pattern => "Does not match pattern '{pattern}'",
            ErrorKind::MultipleOf => "Must be a multiple of {multiple}",
            ErrorKind::NumberGte => "Must be greater than or equal to {min}",
            ErrorKind::NumberGt => "Must be greater than {min}",
            ErrorKind::NumberLte => "Must be less than or equal to {max}",
            ErrorKind::NumberLt => "Must be less than {max}",
            ErrorKind::ConditionThen => "Must validate \"then\" as \"if\" was valid",
            ErrorKind::ConditionElse => "Must validate \"else\" as \"if\" was not valid",
            ErrorKind::Format => "Does not match format '{format}'",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword-specific values attached to a finding
pub type ErrorDetails = BTreeMap<String, Value>;

/// One validation finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultError {
    #[serde(rename = "type")]
    kind: ErrorKind,
    context: String,
    field: String,
    pointer: String,
    description: String,
    details: ErrorDetails,
    value: Value,
}

impl ResultError {
    pub fn new(kind: ErrorKind, context: &JsonContext<'_>, value: &Value, mut details: ErrorDetails) -> Self {
        let field = context.field();
        details
            .entry("field".to_string())
            .or_insert_with(|| Value::String(field.clone()));
        let description = render_template(kind.template(), &details);

        Self {
            kind,
            context: context.render(),
            field,
            pointer: context.pointer(),
            description,
            details,
            value: value.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn error_type(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Full dotted path, `(root).a.0`
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Dotted path without the root marker, `(root)` for the root itself
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// The instance value that failed
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.description)
    }
}

/// Fill `{name}` placeholders; strings are inserted without quotes
fn render_template(template: &str, details: &ErrorDetails) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match details.get(name) {
                    Some(Value::String(s)) => rendered.push_str(s),
                    Some(other) => rendered.push_str(&other.to_string()),
                    None => {
                        rendered.push('{');
                        rendered.push_str(name);
                        rendered.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                rendered.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Ordered findings of one validation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    errors: Vec<ResultError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ResultError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ResultError> {
        self.errors
    }

    pub fn add(&mut self, error: ResultError) {
        self.errors.push(error);
    }

    /// Append another result's findings after this one's
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 2)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "The document is valid");
        }
        write!(f, "The document is not valid. see errors :")?;
        for error in &self.errors {
            write!(f, "\n- {}", error)?;
        }
        Ok(())
    }
}
