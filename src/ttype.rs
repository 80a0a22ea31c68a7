//! The closed set of Thrift type kinds a descriptor can declare.
use std::fmt;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TType {
    Bool,
    Byte,
    Double,
    I16,
    I32,
    I64,
    String,
    Struct,
    Map,
    Set,
    List,
}

impl TType {
    pub const ALL: [TType; 11] = [
        TType::Bool,
        TType::Byte,
        TType::Double,
        TType::I16,
        TType::I32,
        TType::I64,
        TType::String,
        TType::Struct,
        TType::Map,
        TType::Set,
        TType::List,
    ];

    /// Thrift wire code.
    pub fn code(self) -> i64 {
        match self {
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::I16 => 6,
            TType::I32 => 8,
            TType::I64 => 10,
            TType::String => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Case-insensitive IDL name, including the `binary` and `i8` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let ttype = match name.to_ascii_lowercase().as_str() {
            "bool" => TType::Bool,
            "byte" | "i8" => TType::Byte,
            "double" => TType::Double,
            "i16" => TType::I16,
            "i32" => TType::I32,
            "i64" => TType::I64,
            "string" | "binary" => TType::String,
            "struct" => TType::Struct,
            "map" => TType::Map,
            "set" => TType::Set,
            "list" => TType::List,
            _ => return None,
        };
        Some(ttype)
    }

    pub fn name(self) -> &'static str {
        match self {
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::Double => "double",
            TType::I16 => "i16",
            TType::I32 => "i32",
            TType::I64 => "i64",
            TType::String => "string",
            TType::Struct => "struct",
            TType::Map => "map",
            TType::Set => "set",
            TType::List => "list",
        }
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for TType {
    type Error = SchemaError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| SchemaError::UnsupportedType(code.to_string()))
    }
}

impl std::str::FromStr for TType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| SchemaError::UnsupportedType(s.to_string()))
    }
}
