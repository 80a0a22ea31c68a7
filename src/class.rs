//! Binding decoded records to hand-written Rust types.
//!
//! A schema class is a `Default` type that knows its schema name and accepts
//! decoded fields one at a time through [`SchemaClass::set_field`]:
//!
//! ```ignore
//! #[derive(Debug, Default, PartialEq)]
//! struct SimpleObject { id: Option<i32>, msgs: Option<BTreeSet<String>> }
//!
//! impl SchemaClass for SimpleObject {
//!     const TYPE_NAME: &'static str = "SimpleObject";
//!     fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError> {
//!         match field {
//!             "id" => self.id = Some(field_value(Self::TYPE_NAME, field, value)?),
//!             "msgs" => self.msgs = Some(field_value(Self::TYPE_NAME, field, value)?),
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//! ```
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use crate::decode::{Decoder, Input};
use crate::error::DecodeError;
use crate::schema::Schema;
use crate::ttype::TType;
use crate::value::{Record, Value};

pub trait SchemaClass: Default {
    /// Name of the struct in the schema.
    const TYPE_NAME: &'static str;

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), DecodeError>;

    /// Build an instance from a decoded record of this type.
    fn from_record(record: Record) -> Result<Self, DecodeError> {
        let mut out = Self::default();
        for (field, value) in record.into_fields() {
            out.set_field(&field, value)?;
        }
        Ok(out)
    }
}

/// Conversion out of a decoded [`Value`]. `Err` carries the expected shape.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Mismatch>;
}

/// A decoded value had a different shape than the Rust type wants.
///
/// `source` is set when the shape matched but a nested schema class
/// rejected one of its own fields.
#[derive(Debug)]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: TType,
    pub source: Option<Box<DecodeError>>,
}

impl Mismatch {
    fn new(expected: &'static str, value: &Value) -> Self {
        Mismatch { expected, found: value.ttype(), source: None }
    }
}

/// Convert a field's value, naming the field when the shape is wrong.
pub fn field_value<T: FromValue>(type_name: &str, field: &str, value: Value) -> Result<T, DecodeError> {
    T::from_value(value).map_err(|mismatch| match mismatch.source {
        Some(source) => DecodeError::NestedField {
            type_name: type_name.to_string(),
            field: field.to_string(),
            expected: mismatch.expected,
            source,
        },
        None => DecodeError::FieldType {
            type_name: type_name.to_string(),
            field: field.to_string(),
            expected: mismatch.expected,
            found: mismatch.found,
        },
    })
}

/// Decode straight into a schema class.
pub fn decode_as<'a, T: SchemaClass>(
    input: impl Into<Input<'a>>,
    decoder: &Decoder<'_>,
) -> Result<T, DecodeError> {
    let record = decoder.decode(input, T::TYPE_NAME)?;
    T::from_record(record)
}

/// [`decode_as`] with default options.
pub fn decode_class<'a, T: SchemaClass>(input: impl Into<Input<'a>>, schema: &Schema) -> Result<T, DecodeError> {
    decode_as(input, &Decoder::new(schema))
}

/// Nested schema-class fields: `struct_value::<Inner>(value)` inside a
/// `FromValue` impl, or directly from `set_field`.
pub fn struct_value<T: SchemaClass>(value: Value) -> Result<T, Mismatch> {
    match value {
        Value::Struct(record) if record.type_name() == T::TYPE_NAME => {
            T::from_record(record).map_err(|err| Mismatch {
                expected: T::TYPE_NAME,
                found: TType::Struct,
                source: Some(Box::new(err)),
            })
        }
        other => Err(Mismatch::new(T::TYPE_NAME, &other)),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCALARS
// ————————————————————————————————————————————————————————————————————————————

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        Ok(value)
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Struct(record) => Ok(record),
            other => Err(Mismatch::new("struct", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(Mismatch::new("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Mismatch::new("string", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Double(f) => Ok(f.into_inner()),
            other => Err(Mismatch::new("double", &other)),
        }
    }
}

/// Integer kinds convert into any Rust integer they fit.
macro_rules! from_integer_value {
    ($($t:ty => $expected:literal),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, Mismatch> {
                value
                    .as_i64()
                    .and_then(|n| <$t>::try_from(n).ok())
                    .ok_or_else(|| Mismatch::new($expected, &value))
            }
        }
    )*};
}

from_integer_value! {
    i8 => "byte",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
}

// ————————————————————————————————————————————————————————————————————————————
// CONTAINERS
// ————————————————————————————————————————————————————————————————————————————

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        T::from_value(value).map(Some)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(Mismatch::new("list", &other)),
        }
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(Mismatch::new("set", &other)),
        }
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Set(items) => items.into_iter().map(T::from_value).collect(),
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(Mismatch::new("set", &other)),
        }
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(Mismatch::new("map", &other)),
        }
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> Result<Self, Mismatch> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(Mismatch::new("map", &other)),
        }
    }
}
