//! Schema-directed decoding of schema-less JSON into Thrift-shaped records.
//!
//! ```ignore
//! let schema = Schema::from_path("example.schema.json")?;
//! let record = Decoder::new(&schema).decode(r#"{"id": 1234}"#, "SimpleObject")?;
//! assert_eq!(record.get("id"), Some(&Value::I32(1234)));
//! ```
pub mod class;
pub mod cli;
pub mod decode;
pub mod descriptor;
pub mod error;
pub mod input;
pub mod jq;
pub mod schema;
pub mod ttype;
pub mod value;

pub use class::{FromValue, SchemaClass, decode_as, decode_class, field_value, struct_value};
pub use decode::{DecodeOptions, Decoder, Input, decode};
pub use descriptor::{Element, TypeDescriptor, decompose};
pub use error::{DecodeError, SchemaError};
pub use schema::{Schema, SchemaDefinition, StructSchema};
pub use ttype::TType;
pub use value::{Record, Value};
