//! Struct field specifications and the registry that ties them together.
//!
//! A schema is usually loaded from a definition document:
//!
//! ```json
//! {
//!   "structs": {
//!     "SimpleObject": {
//!       "1": [8, "id", true],
//!       "5": [14, "msgs", 11, false]
//!     }
//!   }
//! }
//! ```
//!
//! Field order is document order; it is also the order in which the decoder
//! validates fields.
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::descriptor::TypeDescriptor;
use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSchema {
    name: String,
    fields: IndexMap<i16, TypeDescriptor>,
}

/// Registry of struct schemas, addressed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    structs: IndexMap<String, StructSchema>,
}

/// On-disk shape of a schema definition document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    pub structs: IndexMap<String, IndexMap<String, Json>>,
}

// ————————————————————————————————————————————————————————————————————————————
// STRUCT SCHEMA
// ————————————————————————————————————————————————————————————————————————————

impl StructSchema {
    pub fn new(name: impl Into<String>) -> Self {
        StructSchema {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, id: i16, descriptor: TypeDescriptor) -> Self {
        self.insert(id, descriptor);
        self
    }

    pub fn insert(&mut self, id: i16, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        self.fields.insert(id, descriptor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, id: i16) -> Option<&TypeDescriptor> {
        self.fields.get(&id)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (i16, &TypeDescriptor)> {
        self.fields.iter().map(|(id, descriptor)| (*id, descriptor))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn from_raw(name: &str, raw_fields: &IndexMap<String, Json>) -> Result<Self, SchemaError> {
        let mut out = StructSchema::new(name);
        for (raw_id, raw) in raw_fields {
            let id = raw_id.trim().parse::<i16>().map_err(|_| SchemaError::InvalidFieldId {
                struct_name: name.to_string(),
                id: raw_id.clone(),
            })?;
            out.insert(id, TypeDescriptor::from_raw(raw)?);
        }
        Ok(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a struct. Call [`Schema::validate`] once all structs are in.
    pub fn insert(&mut self, schema: StructSchema) -> Option<StructSchema> {
        self.structs.insert(schema.name.clone(), schema)
    }

    pub fn with(mut self, schema: StructSchema) -> Self {
        self.insert(schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StructSchema> {
        self.structs.get(name)
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructSchema> {
        self.structs.values()
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Every struct field is named, composite kinds carry their element and
    /// every struct reference resolves.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for schema in self.structs.values() {
            for (id, descriptor) in schema.fields() {
                if descriptor.name.is_none() {
                    return Err(SchemaError::UnnamedField {
                        struct_name: schema.name.clone(),
                        id,
                    });
                }
                let mut refs = Vec::new();
                descriptor.check_shape(&mut refs)?;
                if let Some(unknown) = refs.into_iter().find(|name| !self.structs.contains_key(*name)) {
                    return Err(SchemaError::UnknownStruct { name: unknown.to_string() });
                }
            }
        }
        Ok(())
    }

    pub fn from_definition(definition: &SchemaDefinition) -> Result<Self, SchemaError> {
        let mut schema = Schema::new();
        for (name, raw_fields) in &definition.structs {
            schema.insert(StructSchema::from_raw(name, raw_fields)?);
        }
        schema.validate()?;
        log::debug!("loaded schema with {} structs", schema.len());
        Ok(schema)
    }

    /// Parse a definition document; deserialization errors carry the JSON path.
    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        let de = &mut serde_json::Deserializer::from_str(src);
        let definition: SchemaDefinition = serde_path_to_error::deserialize(de).map_err(|err| {
            SchemaError::Definition {
                path: err.path().to_string(),
                message: err.into_inner().to_string(),
            }
        })?;
        Self::from_definition(&definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&src)
    }
}

/// Thrift-IDL-like listing.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, schema) in self.structs.values().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "struct {} {{", schema.name)?;
            for (id, field) in schema.fields() {
                let requiredness = if field.required { "required" } else { "optional" };
                let name = field.name.as_deref().unwrap_or("_");
                writeln!(f, "  {id}: {requiredness} {field} {name}")?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
