use std::path::PathBuf;

use thiserror::Error;

use crate::ttype::TType;

/// The schema itself is broken. Raised while loading or normalizing
/// descriptors, never because of the data being decoded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Received unknown length of a field definition {arity} in descriptor {descriptor}")]
    MalformedDescriptor { arity: usize, descriptor: String },

    #[error("Unrecognized thrift field type: {0}")]
    UnsupportedType(String),

    #[error("component {position} of field definition {descriptor} must be {expected}")]
    InvalidComponent {
        position: usize,
        expected: &'static str,
        descriptor: String,
    },

    #[error("{kind} descriptor {descriptor} is missing its {expected}")]
    MissingElement {
        kind: TType,
        expected: &'static str,
        descriptor: String,
    },

    #[error("field {id} of struct {struct_name} has no name")]
    UnnamedField { struct_name: String, id: i16 },

    #[error("invalid field id `{id}` in struct {struct_name}")]
    InvalidFieldId { struct_name: String, id: String },

    #[error("struct {name} is not defined in the schema")]
    UnknownStruct { name: String },

    #[error("invalid schema definition at {path}: {message}")]
    Definition { path: String, message: String },

    #[error("failed to read schema file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single decode call failed. The first violation aborts the walk.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Field '{field}' is required in type {type_name}, but is absent in JSON {}", path_suffix(.path))]
    MissingRequiredField {
        field: String,
        type_name: String,
        path: String,
    },

    #[error("cannot coerce JSON {value} to {expected} in {}: {reason}", location(.path))]
    TypeCoercion {
        path: String,
        expected: TType,
        value: String,
        reason: &'static str,
    },

    #[error("nesting deeper than {limit} levels in {}", location(.path))]
    DepthLimitExceeded { limit: usize, path: String },

    #[error("field '{field}' of {type_name} expects {expected}, but the decoded value is a {found}")]
    FieldType {
        type_name: String,
        field: String,
        expected: &'static str,
        found: TType,
    },

    #[error("field '{field}' of {type_name} could not bind {expected}: {source}")]
    NestedField {
        type_name: String,
        field: String,
        expected: &'static str,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Field path the error points at, when it is a data error.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::MissingRequiredField { path, .. }
            | DecodeError::TypeCoercion { path, .. }
            | DecodeError::DepthLimitExceeded { path, .. } => Some(path.as_str()),
            DecodeError::NestedField { source, .. } => source.path(),
            _ => None,
        }
    }
}

fn path_suffix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("field {path}")
    }
}

fn location(path: &str) -> String {
    if path.is_empty() {
        "the root object".to_string()
    } else {
        format!("field {path}")
    }
}
