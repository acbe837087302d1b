//! Loader session behaviour across documents, drafts and meta-schemas

use schemagraph::{
    Draft, FileLoader, LoaderConfig, ReferenceLoader, SchemaError, SchemaLoader, SchemaResult, StringLoader,
    ValueLoader,
};
use serde_json::json;
use tempfile::tempdir;

fn error_types(result: &schemagraph::ValidationResult) -> Vec<&str> {
    result.errors().iter().map(|e| e.error_type()).collect()
}

#[test]
fn test_reference_to_added_schema() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[&StringLoader::new(
        r#"{"$id": "http://localhost:1234/test1.json", "type": "integer"}"#,
    )])?;

    let schema = loader.compile(&ReferenceLoader::new("http://localhost:1234/test1.json")?)?;
    let result = schema.validate(&StringLoader::new(r#""hello""#))?;
    assert_eq!(error_types(&result), vec!["invalid_type"]);
    Ok(())
}

#[test]
fn test_reference_matches_direct_compilation() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[&StringLoader::new(r#"{"$id": "u1", "type": "integer"}"#)])?;
    let via_reference = loader.compile(&StringLoader::new(r#"{"$ref": "u1"}"#))?;
    let direct = schemagraph::compile(&StringLoader::new(r#"{"type": "integer"}"#))?;

    for instance in [json!("hello"), json!(4), json!(4.5), json!(null)] {
        assert_eq!(
            via_reference.validate_value(&instance)?,
            direct.validate_value(&instance)?,
            "instance {}",
            instance
        );
    }
    Ok(())
}

#[test]
fn test_cross_reference() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schema(
        "http://localhost:1234/test2.json",
        &StringLoader::new(
            r#"{
                "$ref": "http://localhost:1234/test3.json",
                "definitions": {"foo": {"type": "integer"}}
            }"#,
        ),
    )?;
    loader.add_schema(
        "http://localhost:1234/test3.json",
        &StringLoader::new(r#"{"$ref": "http://localhost:1234/test2.json#/definitions/foo"}"#),
    )?;

    let schema = loader.compile(&StringLoader::new(r#"{"$ref": "http://localhost:1234/test2.json"}"#))?;
    let result = schema.validate(&StringLoader::new(r#""hello""#))?;
    assert_eq!(error_types(&result), vec!["invalid_type"]);
    Ok(())
}

#[test]
fn test_double_id_reference() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schema("http://localhost:1234/test4.json", &StringLoader::new("{}"))?;

    let err = loader
        .add_schemas(&[&StringLoader::new(r#"{"$id": "http://localhost:1234/test4.json"}"#)])
        .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateId { .. }));
    assert_eq!(err.uri(), Some("http://localhost:1234/test4.json"));
    Ok(())
}

#[test]
fn test_custom_meta_schema() -> SchemaResult<()> {
    let meta = StringLoader::new(
        r#"{
            "$id": "http://localhost:1234/test5.json",
            "properties": {"multipleOf": false}
        }"#,
    );
    let config = LoaderConfig::default().with_validate(true);

    let mut loader = SchemaLoader::with_config(config.clone());
    loader.add_schemas(&[&meta])?;
    loader.compile(&StringLoader::new(
        r#"{
            "$id": "http://localhost:1234/test6.json",
            "$schema": "http://localhost:1234/test5.json",
            "type": "string"
        }"#,
    ))?;

    let mut loader = SchemaLoader::with_config(config);
    loader.add_schemas(&[&meta])?;
    let err = loader
        .compile(&StringLoader::new(
            r#"{
                "$id": "http://localhost:1234/test7.json",
                "$schema": "http://localhost:1234/test5.json",
                "multipleOf": 5
            }"#,
        ))
        .unwrap_err();
    assert!(matches!(err, SchemaError::MetaSchemaViolation { .. }));
    Ok(())
}

#[test]
fn test_schema_detection() -> SchemaResult<()> {
    let document = r#"{
        "$schema": "http://json-schema.org/draft-04/schema#",
        "exclusiveMinimum": 5
    }"#;

    let err = schemagraph::compile(&StringLoader::new(document)).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidKeyword { .. }));

    let mut loader = SchemaLoader::with_config(LoaderConfig::default().with_auto_detect(false));
    let schema = loader.compile(&StringLoader::new(document))?;
    assert_eq!(error_types(&schema.validate_value(&json!(5))?), vec!["number_gt"]);
    Ok(())
}

#[test]
fn test_forced_default_draft() -> SchemaResult<()> {
    let config = LoaderConfig::default()
        .with_auto_detect(false)
        .with_default_draft(Draft::Draft4);
    let mut loader = SchemaLoader::with_config(config);

    // Declared draft-07, compiled as draft-04: `const` is not a keyword there
    let schema = loader.compile(&ValueLoader::new(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "const": 1
    })))?;
    assert!(schema.validate_value(&json!(2))?.is_valid());
    Ok(())
}

#[test]
fn test_mixed_drafts_in_one_graph() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[&ValueLoader::new(json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "id": "http://example.com/old.json",
        "minimum": 10,
        "exclusiveMinimum": true
    }))])?;

    let schema = loader.compile(&ValueLoader::new(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "properties": {
            "old": {"$ref": "http://example.com/old.json"},
            "new": {"exclusiveMinimum": 10}
        }
    })))?;

    let result = schema.validate_value(&json!({"old": 10, "new": 10}))?;
    assert_eq!(error_types(&result), vec!["number_gt", "number_gt"]);
    Ok(())
}

#[test]
fn test_nested_id_scopes() -> SchemaResult<()> {
    let schema = schemagraph::compile(&ValueLoader::new(json!({
        "$id": "http://example.com/root.json",
        "properties": {
            "a": {"$ref": "item.json"},
            "b": {"$ref": "nested/item.json"}
        },
        "definitions": {
            "top": {"$id": "item.json", "type": "string"},
            "scope": {
                "$id": "nested/",
                "definitions": {
                    "inner": {"$id": "item.json", "type": "integer"}
                }
            }
        }
    })))?;

    assert!(schema.validate_value(&json!({"a": "x", "b": 1}))?.is_valid());
    let result = schema.validate_value(&json!({"a": 1, "b": "x"}))?;
    let fields: Vec<&str> = result.errors().iter().map(|e| e.field()).collect();
    assert_eq!(fields, vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_forward_reference_between_added_documents() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[
        &StringLoader::new(r#"{"$id": "http://example.com/a.json", "items": {"$ref": "b.json"}}"#),
        &StringLoader::new(r#"{"$id": "http://example.com/b.json", "maxLength": 1}"#),
    ])?;

    let schema = loader.compile(&ReferenceLoader::new("http://example.com/a.json")?)?;
    let result = schema.validate_value(&json!(["a", "bb"]))?;
    assert_eq!(error_types(&result), vec!["string_lte"]);
    assert_eq!(result.errors()[0].pointer(), "/1");
    Ok(())
}

#[test]
fn test_file_documents_resolve_relative_refs() -> SchemaResult<()> {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("person.yaml"),
        "type: object\nproperties:\n  address:\n    $ref: address.json#/definitions/address\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("address.json"),
        r#"{"definitions": {"address": {"type": "object", "required": ["city"]}}}"#,
    )
    .unwrap();

    let schema = schemagraph::compile(&FileLoader::new(dir.path().join("person.yaml")))?;
    let result = schema.validate_value(&json!({"address": {}}))?;
    assert_eq!(error_types(&result), vec!["required"]);
    assert_eq!(result.errors()[0].field(), "address");
    Ok(())
}

#[test]
fn test_recursive_schema_validates_deep_instances() -> SchemaResult<()> {
    let schema = schemagraph::compile(&ValueLoader::new(json!({
        "type": "object",
        "properties": {
            "value": {"type": "integer"},
            "next": {"$ref": "#"}
        }
    })))?;

    let instance = json!({"value": 1, "next": {"value": 2, "next": {"value": "three"}}});
    let result = schema.validate_value(&instance)?;
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].context(), "(root).next.next.value");
    Ok(())
}

#[test]
fn test_mutually_recursive_documents() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[
        &StringLoader::new(
            r#"{"$id": "http://example.com/tree.json", "properties": {"children": {"items": {"$ref": "node.json"}}}}"#,
        ),
        &StringLoader::new(
            r#"{"$id": "http://example.com/node.json", "required": ["name"], "allOf": [{"$ref": "tree.json"}]}"#,
        ),
    ])?;

    let schema = loader.compile(&ReferenceLoader::new("http://example.com/tree.json")?)?;
    let result = schema.validate_value(&json!({"children": [{"name": "a", "children": [{}]}]}))?;
    assert_eq!(error_types(&result), vec!["required", "number_all_of"]);
    assert_eq!(result.errors()[0].field(), "children.0.children.0");
    Ok(())
}

#[test]
fn test_in_place_reference_cycle_is_a_compile_error() {
    let mut loader = SchemaLoader::new();
    let err = loader
        .compile(&ValueLoader::new(json!({
            "allOf": [{"$ref": "#/definitions/b"}],
            "definitions": {"b": {"anyOf": [{"$ref": "#"}]}}
        })))
        .unwrap_err();
    assert!(matches!(err, SchemaError::CircularReference { .. }));
}

#[test]
fn test_unresolved_fragment_names_the_reference() {
    let err = schemagraph::compile(&ValueLoader::new(json!({
        "properties": {"a": {"$ref": "#/definitions/missing"}}
    })))
    .unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
    assert!(err.to_string().contains("#/definitions/missing"));
}

#[test]
fn test_strict_draft_rejects_unknown_schema_uri() {
    let mut loader = SchemaLoader::with_config(LoaderConfig::default().with_strict_draft(true));
    let err = loader
        .compile(&ValueLoader::new(json!({"$schema": "http://example.com/unknown#"})))
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnsupportedDraft { .. }));

    let mut lenient = SchemaLoader::new();
    assert!(lenient
        .compile(&ValueLoader::new(json!({"$schema": "http://example.com/unknown#"})))
        .is_ok());
}

#[test]
fn test_strict_formats() -> SchemaResult<()> {
    let schema_json = json!({"format": "made-up"});

    let lenient = schemagraph::compile(&ValueLoader::new(schema_json.clone()))?;
    assert!(lenient.validate_value(&json!("anything"))?.is_valid());

    let mut loader = SchemaLoader::with_config(LoaderConfig::default().with_strict_formats(true));
    let strict = loader.compile(&ValueLoader::new(schema_json))?;
    let result = strict.validate_value(&json!("anything"))?;
    assert_eq!(error_types(&result), vec!["format"]);
    assert!(strict.validate_value(&json!(12))?.is_valid());
    Ok(())
}

#[test]
fn test_meta_validation_of_added_documents() {
    let mut loader = SchemaLoader::with_config(LoaderConfig::default().with_validate(true));
    let err = loader
        .add_schemas(&[&ValueLoader::new(json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "strin"
        }))])
        .unwrap_err();
    assert!(matches!(err, SchemaError::MetaSchemaViolation { .. }));
    // Only the draft-04 meta-schema was registered
    assert_eq!(loader.pool().len(), 1);
}

#[test]
fn test_repeated_validation_is_identical() -> SchemaResult<()> {
    let schema = schemagraph::compile(&ValueLoader::new(json!({
        "properties": {"a": {"oneOf": [{"type": "integer"}, {"minimum": 0}]}},
        "required": ["b"]
    })))?;
    let instance = json!({"a": 4});

    let first = schema.validate_value(&instance)?;
    for _ in 0..5 {
        assert_eq!(schema.validate_value(&instance)?, first);
    }
    assert_eq!(error_types(&first), vec!["required", "number_one_of_multiple"]);
    Ok(())
}

#[test]
fn test_add_schema_under_an_alias_of_a_registered_document() -> SchemaResult<()> {
    let document = json!({
        "$id": "http://example.com/a.json",
        "definitions": {"name": {"type": "string"}},
        "properties": {"name": {"$ref": "#/definitions/name"}}
    });

    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[&ValueLoader::new(document.clone())])?;
    loader.add_schema("http://example.com/alias.json", &ValueLoader::new(document))?;
    assert_eq!(loader.pool().len(), 1);

    let schema = loader.compile(&ReferenceLoader::new("http://example.com/alias.json")?)?;
    let result = schema.validate_value(&json!({"name": 3}))?;
    assert_eq!(error_types(&result), vec!["invalid_type"]);

    let name = loader.compile(&ReferenceLoader::new("http://example.com/alias.json#/definitions/name")?)?;
    assert!(name.is_valid(&json!("ada")));
    Ok(())
}

#[test]
fn test_http_and_https_meta_schema_uris_share_one_document() -> SchemaResult<()> {
    let schema = schemagraph::compile(&ValueLoader::new(json!({
        "properties": {
            "plain": {"$ref": "http://json-schema.org/draft-07/schema#"},
            "secure": {"$ref": "https://json-schema.org/draft-07/schema#"}
        }
    })))?;
    assert!(schema.is_valid(&json!({"plain": {"type": "string"}, "secure": {"minLength": 2}})));
    assert!(!schema.is_valid(&json!({"secure": {"minLength": -1}})));

    let mut loader = SchemaLoader::with_config(LoaderConfig::default().with_validate(true));
    loader.compile(&ValueLoader::new(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "string"
    })))?;
    let secure = loader.compile(&ValueLoader::new(json!({
        "$schema": "https://json-schema.org/draft-07/schema#",
        "type": "integer"
    })))?;
    assert!(secure.is_valid(&json!(4)));
    Ok(())
}

#[test]
fn test_failed_compile_leaves_the_session_unchanged() -> SchemaResult<()> {
    let mut loader = SchemaLoader::new();
    loader.add_schemas(&[&ValueLoader::new(json!({"$id": "http://example.com/base.json", "type": "object"}))])?;

    let err = loader
        .compile(&ValueLoader::new(json!({"$id": "http://example.com/r.json", "pattern": "("})))
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    assert_eq!(loader.pool().len(), 1);

    let err = loader
        .compile(&ValueLoader::new(json!({
            "$id": "http://example.com/r.json",
            "allOf": [{"$ref": "#"}]
        })))
        .unwrap_err();
    assert!(matches!(err, SchemaError::CircularReference { .. }));
    assert_eq!(loader.pool().len(), 1);

    let fixed = loader.compile(&ValueLoader::new(json!({"$id": "http://example.com/r.json", "pattern": "^a"})))?;
    assert!(fixed.is_valid(&json!("abc")));
    assert!(!fixed.is_valid(&json!("xyz")));

    // Documents registered before the failures are still there
    let base = loader.compile(&ReferenceLoader::new("http://example.com/base.json")?)?;
    assert!(!base.is_valid(&json!(1)));
    Ok(())
}
