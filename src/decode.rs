//! Schema-directed decoding.
//!
//! The decoder walks a struct schema in lock-step with a `serde_json::Value`,
//! dispatching on each descriptor's kind. Required fields are checked in
//! declaration order and the first violation aborts the whole call; nothing
//! partial is ever returned.
//!
//! Field paths (`/nested/id`) only grow when entering a struct field. List,
//! set and map elements share the path of the field that holds them.
use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use serde_json::Value as Json;

use crate::descriptor::TypeDescriptor;
use crate::error::{DecodeError, SchemaError};
use crate::schema::Schema;
use crate::ttype::TType;
use crate::value::{Record, Value};

/// Matches `serde_json`'s own recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest struct/container nesting accepted below the root.
    pub max_depth: usize,
    /// Treat `"field": null` as if the field were absent.
    pub null_as_absent: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            null_as_absent: false,
        }
    }
}

/// Either raw JSON text or an already parsed tree.
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    Text(&'a str),
    Value(&'a Json),
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(text: &'a str) -> Self {
        Input::Text(text)
    }
}

impl<'a> From<&'a String> for Input<'a> {
    fn from(text: &'a String) -> Self {
        Input::Text(text)
    }
}

impl<'a> From<&'a Json> for Input<'a> {
    fn from(value: &'a Json) -> Self {
        Input::Value(value)
    }
}

/// Borrows a schema; holds no per-call state, so one decoder can serve many
/// threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'s> {
    schema: &'s Schema,
    options: DecodeOptions,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

impl<'s> Decoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, DecodeOptions::default())
    }

    pub fn with_options(schema: &'s Schema, options: DecodeOptions) -> Self {
        Decoder { schema, options }
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Decode `input` as an instance of the struct named `root`.
    pub fn decode<'a>(&self, input: impl Into<Input<'a>>, root: &str) -> Result<Record, DecodeError> {
        match input.into() {
            Input::Text(text) => {
                let value: Json = serde_json::from_str(text)?;
                self.decode_value(&value, root)
            }
            Input::Value(value) => self.decode_value(value, root),
        }
    }

    pub fn decode_value(&self, value: &Json, root: &str) -> Result<Record, DecodeError> {
        log::debug!("decoding JSON into {root}");
        let root_descriptor = TypeDescriptor::structure(root);
        match self.convert(value, &root_descriptor, "", 0)? {
            Value::Struct(record) => Ok(record),
            // STRUCT descriptors always convert to records
            other => Err(DecodeError::TypeCoercion {
                path: String::new(),
                expected: TType::Struct,
                value: other.ttype().to_string(),
                reason: "root did not decode to a struct",
            }),
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // DISPATCH
    // ————————————————————————————————————————————————————————————————————————

    fn convert(
        &self,
        value: &Json,
        descriptor: &TypeDescriptor,
        path: &str,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        match descriptor.kind {
            TType::Struct => {
                let record = self.convert_struct(value, descriptor.struct_name()?, path, depth)?;
                Ok(Value::Struct(record))
            }
            TType::String => coerce_string(value, path).map(Value::String),
            TType::Byte => to_int(value, TType::Byte, path).map(Value::Byte),
            TType::I16 => to_int(value, TType::I16, path).map(Value::I16),
            TType::I32 => to_int(value, TType::I32, path).map(Value::I32),
            TType::I64 => to_int(value, TType::I64, path).map(Value::I64),
            TType::Double => to_float(value, path).map(|f| Value::Double(OrderedFloat(f))),
            TType::Bool => Ok(Value::Bool(truthy(value))),
            TType::List => {
                let item = descriptor.item()?;
                let items = expect_array(value, TType::List, path)?;
                let depth = self.descend(depth, path)?;
                items
                    .iter()
                    .map(|x| self.convert(x, item, path, depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            TType::Set => {
                let item = descriptor.item()?;
                let items = expect_array(value, TType::Set, path)?;
                let depth = self.descend(depth, path)?;
                items
                    .iter()
                    .map(|x| self.convert(x, item, path, depth))
                    .collect::<Result<BTreeSet<_>, _>>()
                    .map(Value::Set)
            }
            TType::Map => {
                let (key_descriptor, value_descriptor) = descriptor.pair()?;
                let entries = match value {
                    Json::Object(entries) => entries,
                    other => return Err(coercion(other, TType::Map, path, "expected a JSON object")),
                };
                let depth = self.descend(depth, path)?;
                let mut out = BTreeMap::new();
                for (k, v) in entries {
                    let key = self.convert(&Json::String(k.clone()), key_descriptor, path, depth)?;
                    let val = self.convert(v, value_descriptor, path, depth)?;
                    // later entries win when keys collide after coercion
                    out.insert(key, val);
                }
                Ok(Value::Map(out))
            }
        }
    }

    fn descend(&self, depth: usize, path: &str) -> Result<usize, DecodeError> {
        let depth = depth + 1;
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthLimitExceeded {
                limit: self.options.max_depth,
                path: path.to_string(),
            });
        }
        Ok(depth)
    }

    // ————————————————————————————————————————————————————————————————————————
    // STRUCTS
    // ————————————————————————————————————————————————————————————————————————

    fn convert_struct(
        &self,
        value: &Json,
        struct_name: &str,
        path: &str,
        depth: usize,
    ) -> Result<Record, DecodeError> {
        let schema = self.schema.get(struct_name).ok_or_else(|| SchemaError::UnknownStruct {
            name: struct_name.to_string(),
        })?;
        let object = match value {
            Json::Object(object) => object,
            other => return Err(coercion(other, TType::Struct, path, "expected a JSON object")),
        };
        let depth = if path.is_empty() { depth } else { self.descend(depth, path)? };

        let mut record = Record::new(schema.name());
        for (id, field) in schema.fields() {
            let name = field.name.as_deref().ok_or_else(|| SchemaError::UnnamedField {
                struct_name: schema.name().to_string(),
                id,
            })?;

            let present = match object.get(name) {
                Some(Json::Null) if self.options.null_as_absent => None,
                other => other,
            };
            let Some(field_value) = present else {
                if field.required {
                    return Err(DecodeError::MissingRequiredField {
                        field: name.to_string(),
                        type_name: schema.name().to_string(),
                        path: path.to_string(),
                    });
                }
                continue;
            };

            let field_path = format!("{path}/{name}");
            log::trace!("{field_path}: {field}");
            let converted = self.convert(field_value, field, &field_path, depth)?;
            record.set(name, converted);
        }
        Ok(record)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCALAR COERCION
// ————————————————————————————————————————————————————————————————————————————

/// Scalars render as their JSON text; strings pass through unquoted.
fn coerce_string(value: &Json, path: &str) -> Result<String, DecodeError> {
    match value {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        Json::Bool(b) => Ok(b.to_string()),
        Json::Null => Ok("null".to_string()),
        other => Err(coercion(other, TType::String, path, "expected a JSON scalar")),
    }
}

/// Integers pass through, fractions truncate toward zero, strings are parsed
/// as decimal integers and booleans become 0/1. The result must fit `T`.
fn to_int<T: TryFrom<i64>>(value: &Json, kind: TType, path: &str) -> Result<T, DecodeError> {
    let wide = match value {
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if n.is_f64() => {
                let truncated = f.trunc();
                if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                    return Err(coercion(value, kind, path, "out of range"));
                }
                truncated as i64
            }
            _ => return Err(coercion(value, kind, path, "out of range")),
        },
        Json::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| coercion(value, kind, path, "not an integer"))?,
        Json::Bool(b) => i64::from(*b),
        other => return Err(coercion(other, kind, path, "not a number")),
    };
    T::try_from(wide).map_err(|_| coercion(value, kind, path, "out of range"))
}

fn to_float(value: &Json, path: &str) -> Result<f64, DecodeError> {
    match value {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| coercion(value, TType::Double, path, "not representable as a double")),
        Json::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| coercion(value, TType::Double, path, "not a number")),
        Json::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(coercion(other, TType::Double, path, "not a number")),
    }
}

/// null, false, 0, "", [] and {} are false.
fn truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(xs) => !xs.is_empty(),
        Json::Object(m) => !m.is_empty(),
    }
}

fn expect_array<'v>(value: &'v Json, kind: TType, path: &str) -> Result<&'v Vec<Json>, DecodeError> {
    match value {
        Json::Array(items) => Ok(items),
        other => Err(coercion(other, kind, path, "expected a JSON array")),
    }
}

/// Offending values are echoed back, cut short when large.
const MAX_ECHO: usize = 64;

fn coercion(value: &Json, expected: TType, path: &str, reason: &'static str) -> DecodeError {
    let mut echo = value.to_string();
    if echo.chars().count() > MAX_ECHO {
        echo = echo.chars().take(MAX_ECHO).collect::<String>() + "…";
    }
    DecodeError::TypeCoercion {
        path: path.to_string(),
        expected,
        value: echo,
        reason,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVENIENCE
// ————————————————————————————————————————————————————————————————————————————

/// Decode JSON text or a parsed tree with default options.
pub fn decode<'a>(input: impl Into<Input<'a>>, schema: &Schema, root: &str) -> Result<Record, DecodeError> {
    Decoder::new(schema).decode(input, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructSchema;
    use serde_json::json;

    fn scalars() -> Schema {
        Schema::new().with(
            StructSchema::new("Scalars")
                .field(1, TypeDescriptor::scalar(TType::Byte).named("byte"))
                .field(2, TypeDescriptor::scalar(TType::I16).named("i16"))
                .field(3, TypeDescriptor::scalar(TType::I32).named("i32"))
                .field(4, TypeDescriptor::scalar(TType::I64).named("i64"))
                .field(5, TypeDescriptor::scalar(TType::Double).named("double"))
                .field(6, TypeDescriptor::scalar(TType::Bool).named("bool"))
                .field(7, TypeDescriptor::scalar(TType::String).named("string")),
        )
    }

    fn decode_one(field: &str, value: Json) -> Result<Option<Value>, DecodeError> {
        let schema = scalars();
        let mut input = serde_json::Map::new();
        input.insert(field.to_string(), value);
        let record = decode(&Json::Object(input), &schema, "Scalars")?;
        Ok(record.get(field).cloned())
    }

    #[test]
    fn integers_coerce_from_numbers_strings_and_bools() {
        assert_eq!(decode_one("i32", json!(1234)).unwrap(), Some(Value::I32(1234)));
        assert_eq!(decode_one("i32", json!(" 42 ")).unwrap(), Some(Value::I32(42)));
        assert_eq!(decode_one("i64", json!(-7.9)).unwrap(), Some(Value::I64(-7)));
        assert_eq!(decode_one("i16", json!(true)).unwrap(), Some(Value::I16(1)));
        assert_eq!(decode_one("byte", json!(-128)).unwrap(), Some(Value::Byte(-128)));
    }

    #[test]
    fn integers_reject_garbage_and_overflow() {
        let err = decode_one("i32", json!("abc")).unwrap_err();
        assert!(matches!(
            &err,
            DecodeError::TypeCoercion { path, expected: TType::I32, reason: "not an integer", .. } if path == "/i32"
        ));
        assert_eq!(err.to_string(), "cannot coerce JSON \"abc\" to i32 in field /i32: not an integer");

        let err = decode_one("byte", json!(128)).unwrap_err();
        assert!(matches!(err, DecodeError::TypeCoercion { reason: "out of range", .. }));
        let err = decode_one("i64", json!(u64::MAX)).unwrap_err();
        assert!(matches!(err, DecodeError::TypeCoercion { reason: "out of range", .. }));
        assert!(decode_one("i32", json!(null)).is_err());
        assert!(decode_one("i32", json!([1])).is_err());
    }

    #[test]
    fn doubles_and_strings() {
        assert_eq!(decode_one("double", json!(2)).unwrap(), Some(Value::Double(OrderedFloat(2.0))));
        assert_eq!(decode_one("double", json!("1.5e1")).unwrap(), Some(Value::Double(OrderedFloat(15.0))));
        assert!(decode_one("double", json!("many")).is_err());

        assert_eq!(decode_one("string", json!(12)).unwrap(), Some(Value::String("12".into())));
        assert_eq!(decode_one("string", json!(false)).unwrap(), Some(Value::String("false".into())));
        assert_eq!(decode_one("string", json!(null)).unwrap(), Some(Value::String("null".into())));
        assert!(decode_one("string", json!({"a": 1})).is_err());
        assert!(decode_one("string", json!(["a"])).is_err());
    }

    #[test]
    fn bools_follow_truthiness() {
        for (input, expected) in [
            (json!(true), true),
            (json!(0), false),
            (json!(0.5), true),
            (json!(""), false),
            (json!("no"), true),
            (json!([]), false),
            (json!({"k": 1}), true),
            (json!(null), false),
        ] {
            assert_eq!(decode_one("bool", input).unwrap(), Some(Value::Bool(expected)));
        }
    }

    fn tree() -> Schema {
        Schema::new().with(
            StructSchema::new("Node")
                .field(1, TypeDescriptor::scalar(TType::I32).named("value").required(true))
                .field(2, TypeDescriptor::list_of(TypeDescriptor::structure("Node")).named("children")),
        )
    }

    fn chain(levels: usize) -> Json {
        let mut value = json!({"value": 0});
        for i in 1..=levels {
            value = json!({"value": i, "children": [value]});
        }
        value
    }

    #[test]
    fn depth_limit_is_enforced() {
        let schema = tree();
        let options = DecodeOptions { max_depth: 10, ..DecodeOptions::default() };
        let decoder = Decoder::with_options(&schema, options);

        // each level is a list step plus a struct step
        assert!(decoder.decode_value(&chain(5), "Node").is_ok());
        let err = decoder.decode_value(&chain(6), "Node").unwrap_err();
        assert!(matches!(err, DecodeError::DepthLimitExceeded { limit: 10, .. }));
    }

    #[test]
    fn null_as_absent_is_opt_in() {
        let schema = tree();
        let input = json!({"value": 1, "children": null});

        let err = Decoder::new(&schema).decode_value(&input, "Node").unwrap_err();
        assert!(matches!(err, DecodeError::TypeCoercion { expected: TType::List, .. }));

        let lenient = Decoder::with_options(&schema, DecodeOptions { null_as_absent: true, ..Default::default() });
        let record = lenient.decode_value(&input, "Node").unwrap();
        assert!(!record.contains("children"));

        let err = lenient.decode_value(&json!({"value": null}), "Node").unwrap_err();
        assert_eq!(err.to_string(), "Field 'value' is required in type Node, but is absent in JSON ");
    }

    #[test]
    fn text_input_is_parsed_first() {
        let schema = tree();
        let record = decode(r#"{"value": "3"}"#, &schema, "Node").unwrap();
        assert_eq!(record.get("value"), Some(&Value::I32(3)));

        assert!(matches!(decode("{", &schema, "Node"), Err(DecodeError::Parse(_))));
    }

    #[test]
    fn unknown_root_is_a_schema_error() {
        let schema = tree();
        let err = decode(&json!({}), &schema, "Missing").unwrap_err();
        assert!(matches!(err, DecodeError::Schema(SchemaError::UnknownStruct { .. })));
    }

    #[test]
    fn root_must_be_an_object() {
        let schema = tree();
        let err = decode(&json!([1, 2]), &schema, "Node").unwrap_err();
        assert_eq!(err.to_string(), "cannot coerce JSON [1,2] to struct in the root object: expected a JSON object");
    }
}
