use std::collections::{BTreeMap, BTreeSet};

use json_thrift::{
    DecodeError, Decoder, FromValue, Record, Schema, SchemaClass, Value, decode, decode_class, field_value,
    struct_value,
};
use ordered_float::OrderedFloat;
use serde_json::json;

fn schema() -> Schema {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/example.schema.json");
    Schema::from_path(path).expect("example schema loads")
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA CLASSES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default, Clone, PartialEq)]
struct SimpleObject {
    id: Option<i32>,
    status: Option<i32>,
    action: Option<i64>,
    valid: Option<bool>,
    msgs: Option<BTreeSet<String>>,
}

impl SimpleObject {
    fn new(id: i32, status: i32, action: i64, valid: bool, msgs: &[&str]) -> Self {
        SimpleObject {
            id: Some(id),
            status: Some(status),
            action: Some(action),
            valid: Some(valid),
            msgs: Some(msgs.iter().map(|m| m.to_string()).collect()),
        }
    }
}

impl SchemaClass for SimpleObject {
    const TYPE_NAME: &'static str = "SimpleObject";

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
        match field {
            "id" => self.id = field_value(Self::TYPE_NAME, field, value)?,
            "status" => self.status = field_value(Self::TYPE_NAME, field, value)?,
            "action" => self.action = field_value(Self::TYPE_NAME, field, value)?,
            "valid" => self.valid = field_value(Self::TYPE_NAME, field, value)?,
            "msgs" => self.msgs = field_value(Self::TYPE_NAME, field, value)?,
            _ => {}
        }
        Ok(())
    }
}

impl FromValue for SimpleObject {
    fn from_value(value: Value) -> Result<Self, json_thrift::class::Mismatch> {
        struct_value(value)
    }
}

#[derive(Debug, Default, PartialEq)]
struct ObjectWrapper {
    nested: Option<SimpleObject>,
    nested_list: Option<Vec<SimpleObject>>,
    mapped_obj: Option<BTreeMap<String, SimpleObject>>,
}

impl SchemaClass for ObjectWrapper {
    const TYPE_NAME: &'static str = "ObjectWrapper";

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
        match field {
            "nested" => self.nested = field_value(Self::TYPE_NAME, field, value)?,
            "nested_list" => self.nested_list = field_value(Self::TYPE_NAME, field, value)?,
            "mapped_obj" => self.mapped_obj = field_value(Self::TYPE_NAME, field, value)?,
            _ => {}
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn parses_simple_field_types() {
    let input = r#"
    {
      "id": 1234,
      "status": 0,
      "action": 666,
      "valid": true,
      "msgs": ["message 1", "message 2"]
    }
    "#;
    let expected = SimpleObject::new(1234, 0, 666, true, &["message 1", "message 2"]);
    assert_eq!(decode_class::<SimpleObject>(input, &schema()).unwrap(), expected);
}

#[test]
fn omits_fields_missing_from_the_schema() {
    let input = r#"
    {
      "id": 1234,
      "not_existing_field": "this field is not part of the schema"
    }
    "#;
    let expected = SimpleObject { id: Some(1234), ..Default::default() };
    assert_eq!(decode_class::<SimpleObject>(input, &schema()).unwrap(), expected);

    let record = decode(input, &schema(), "SimpleObject").unwrap();
    assert_eq!(record, Record::new("SimpleObject").with("id", Value::I32(1234)));
}

#[test]
fn enforces_required_fields() {
    let err = decode_class::<SimpleObject>("{}", &schema()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'id' is required in type SimpleObject, but is absent in JSON "
    );
}

#[test]
fn required_validation_includes_field_path() {
    let input = r#"{ "nested": {} }"#;
    let err = decode_class::<ObjectWrapper>(input, &schema()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'id' is required in type SimpleObject, but is absent in JSON field /nested"
    );
    assert_eq!(err.path(), Some("/nested"));
}

#[test]
fn list_elements_share_the_field_path() {
    let input = json!({ "nested_list": [{"id": 1}, {"status": 2}] });
    let err = decode(&input, &schema(), "ObjectWrapper").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'id' is required in type SimpleObject, but is absent in JSON field /nested_list"
    );
}

#[test]
fn parses_nested_objects() {
    let input = r#"
    {
      "nested": {
        "id": 1234, "status": 0, "action": 666, "valid": true, "msgs": ["primary task"]
      },
      "nested_list": [
        { "id": 1234, "status": 0, "action": 666, "valid": true, "msgs": ["task #1"] },
        { "id": 1234, "status": 0, "action": 666, "valid": true, "msgs": ["task #2"] }
      ],
      "mapped_obj": {
        "key 1": { "id": 1234, "status": 0, "action": 666, "valid": true, "msgs": ["mapped #1"] },
        "key 2": { "id": 1234, "status": 0, "action": 666, "valid": true, "msgs": ["mapped #2"] }
      }
    }
    "#;
    let expected = ObjectWrapper {
        nested: Some(SimpleObject::new(1234, 0, 666, true, &["primary task"])),
        nested_list: Some(vec![
            SimpleObject::new(1234, 0, 666, true, &["task #1"]),
            SimpleObject::new(1234, 0, 666, true, &["task #2"]),
        ]),
        mapped_obj: Some(BTreeMap::from([
            ("key 1".to_string(), SimpleObject::new(1234, 0, 666, true, &["mapped #1"])),
            ("key 2".to_string(), SimpleObject::new(1234, 0, 666, true, &["mapped #2"])),
        ])),
    };
    assert_eq!(decode_class::<ObjectWrapper>(input, &schema()).unwrap(), expected);
}

#[test]
fn coercion_errors_name_the_field_path() {
    let input = json!({ "nested": {"id": "twelve"} });
    let err = decode(&input, &schema(), "ObjectWrapper").unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot coerce JSON \"twelve\" to i32 in field /nested/id: not an integer"
    );
}

#[test]
fn map_keys_collide_last_write_wins() {
    let input = json!({ "by_id": {"1": 1.5, "01": 2.5, "2": "3"} });
    let record = decode(&input, &schema(), "Counters").unwrap();
    let expected = BTreeMap::from([
        (Value::I32(1), Value::Double(OrderedFloat(2.5))),
        (Value::I32(2), Value::Double(OrderedFloat(3.0))),
    ]);
    assert_eq!(record.get("by_id"), Some(&Value::Map(expected)));
}

#[test]
fn sets_collapse_duplicates_after_coercion() {
    let input = json!({ "ids": [1, "1", 1.9, 2], "ratios": [1, "1", 0.5] });
    let record = decode(&input, &schema(), "Counters").unwrap();
    assert_eq!(
        record.get("ids"),
        Some(&Value::Set(BTreeSet::from([Value::I16(1), Value::I16(2)])))
    );
    // lists keep every element, in input order
    assert_eq!(
        record.get("ratios"),
        Some(&Value::List(vec![
            Value::Double(OrderedFloat(1.0)),
            Value::Double(OrderedFloat(1.0)),
            Value::Double(OrderedFloat(0.5)),
        ]))
    );
}

#[test]
fn containers_require_matching_json_shapes() {
    let err = decode(&json!({ "ids": {"a": 1} }), &schema(), "Counters").unwrap_err();
    assert_eq!(err.to_string(), "cannot coerce JSON {\"a\":1} to set in field /ids: expected a JSON array");

    let err = decode(&json!({ "by_id": [1] }), &schema(), "Counters").unwrap_err();
    assert_eq!(err.to_string(), "cannot coerce JSON [1] to map in field /by_id: expected a JSON object");
}

#[test]
fn decoding_twice_yields_equal_independent_trees() {
    let schema = schema();
    let input = json!({ "nested": {"id": 1, "msgs": ["a", "a", "b"]}, "nested_list": [{"id": 2}] });
    let decoder = Decoder::new(&schema);

    let first = decoder.decode(&input, "ObjectWrapper").unwrap();
    let mut second = decoder.decode(&input, "ObjectWrapper").unwrap();
    assert_eq!(first, second);

    second.set("nested", Value::Bool(false));
    assert_ne!(first, second);
    assert_eq!(first, decoder.decode(&input, "ObjectWrapper").unwrap());
}

#[test]
fn decoders_can_be_shared_across_threads() {
    let schema = schema();
    let decoder = Decoder::new(&schema);

    let records: Vec<Record> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let decoder = &decoder;
                scope.spawn(move || {
                    decoder
                        .decode(&json!({ "id": i, "valid": i % 2 }), "SimpleObject")
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.get("id"), Some(&Value::I32(i as i32)));
        assert_eq!(record.get("valid"), Some(&Value::Bool(i % 2 == 1)));
    }
}

#[test]
fn wrong_shapes_surface_as_field_type_errors() {
    #[derive(Debug, Default)]
    struct Strict {
        id: Option<String>,
    }

    impl SchemaClass for Strict {
        const TYPE_NAME: &'static str = "SimpleObject";

        fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
            if field == "id" {
                self.id = field_value(Self::TYPE_NAME, field, value)?;
            }
            Ok(())
        }
    }

    let err = decode_class::<Strict>(r#"{"id": 5}"#, &schema()).unwrap_err();
    assert!(matches!(err, DecodeError::FieldType { ref field, .. } if field == "id"));
}

#[test]
fn nested_class_errors_name_the_inner_field() {
    #[derive(Debug, Default)]
    struct StrictInner {
        id: Option<String>,
    }

    impl SchemaClass for StrictInner {
        const TYPE_NAME: &'static str = "SimpleObject";

        fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
            if field == "id" {
                self.id = field_value(Self::TYPE_NAME, field, value)?;
            }
            Ok(())
        }
    }

    impl FromValue for StrictInner {
        fn from_value(value: Value) -> Result<Self, json_thrift::class::Mismatch> {
            struct_value(value)
        }
    }

    #[derive(Debug, Default)]
    struct StrictOuter {
        nested: Option<StrictInner>,
        nested_list: Option<Vec<StrictInner>>,
    }

    impl SchemaClass for StrictOuter {
        const TYPE_NAME: &'static str = "ObjectWrapper";

        fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
            match field {
                "nested" => self.nested = field_value(Self::TYPE_NAME, field, value)?,
                "nested_list" => self.nested_list = field_value(Self::TYPE_NAME, field, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    let err = decode_class::<StrictOuter>(r#"{"nested": {"id": 5}}"#, &schema()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "field 'nested' of ObjectWrapper could not bind SimpleObject: \
         field 'id' of SimpleObject expects string, but the decoded value is a i32"
    );
    let inner = std::error::Error::source(&err).expect("inner error is kept");
    assert!(inner.to_string().contains("'id'"));

    let err = decode_class::<StrictOuter>(r#"{"nested_list": [{"id": 7}]}"#, &schema()).unwrap_err();
    assert!(matches!(
        &err,
        DecodeError::NestedField { field, source, .. }
            if field == "nested_list" && matches!(source.as_ref(), DecodeError::FieldType { field, .. } if field == "id")
    ));
}
