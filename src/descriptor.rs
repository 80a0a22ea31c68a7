//! Type descriptors.
//!
//! A schema definition writes each descriptor in one of four shorthand forms:
//!
//! - bare kind: `8` or `"i32"`
//! - kind + nested: `[15, 11]`, `[12, "SimpleObject"]`
//! - kind + name + required: `[8, "id", true]`
//! - kind + name + nested + required: `[14, "msgs", 11, false]`
//!
//! [`decompose`] splits a shorthand into its parts and
//! [`TypeDescriptor::from_raw`] normalizes it, once, into an explicit record
//! the decoder can match on without re-inspecting shapes.
use std::fmt;

use serde_json::Value as Json;

use crate::error::SchemaError;
use crate::ttype::TType;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: TType,
    /// Set on named struct fields, absent on element/key/value descriptors.
    pub name: Option<String>,
    pub element: Option<Element>,
    pub required: bool,
}

/// What a composite descriptor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// STRUCT: name of a struct in the same schema.
    Struct(String),
    /// LIST / SET element.
    Item(Box<TypeDescriptor>),
    /// MAP key and value.
    Pair(Box<TypeDescriptor>, Box<TypeDescriptor>),
}

/// The four shorthand forms, split apart but not yet interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposed<'a> {
    pub kind: TType,
    pub name: Option<&'a str>,
    pub nested: Option<&'a Json>,
    pub required: Option<bool>,
}

// ————————————————————————————————————————————————————————————————————————————
// DECOMPOSITION
// ————————————————————————————————————————————————————————————————————————————

pub fn decompose(raw: &Json) -> Result<Decomposed<'_>, SchemaError> {
    let parts = match raw {
        Json::Array(parts) => parts,
        bare => {
            return Ok(Decomposed {
                kind: parse_kind(bare, raw)?,
                name: None,
                nested: None,
                required: None,
            });
        }
    };

    let (kind, name, nested, required) = match parts.as_slice() {
        [kind, nested] => (kind, None, Some(nested), None),
        [kind, name, required] => (kind, Some(name), None, Some(required)),
        [kind, name, nested, required] => (kind, Some(name), Some(nested), Some(required)),
        _ => {
            return Err(SchemaError::MalformedDescriptor {
                arity: parts.len(),
                descriptor: raw.to_string(),
            });
        }
    };

    let required_position = parts.len() - 1;
    Ok(Decomposed {
        kind: parse_kind(kind, raw)?,
        name: match name {
            None | Some(Json::Null) => None,
            Some(Json::String(name)) => Some(name.as_str()),
            Some(_) => return Err(invalid(1, "a field name string", raw)),
        },
        nested,
        required: match required {
            None | Some(Json::Null) => None,
            Some(Json::Bool(required)) => Some(*required),
            Some(_) => return Err(invalid(required_position, "a boolean required flag", raw)),
        },
    })
}

fn parse_kind(kind: &Json, raw: &Json) -> Result<TType, SchemaError> {
    match kind {
        Json::Number(n) => match n.as_i64() {
            Some(code) => TType::try_from(code),
            None => Err(SchemaError::UnsupportedType(n.to_string())),
        },
        Json::String(name) => name.parse(),
        _ => Err(invalid(0, "a type code or type name", raw)),
    }
}

fn invalid(position: usize, expected: &'static str, raw: &Json) -> SchemaError {
    SchemaError::InvalidComponent {
        position,
        expected,
        descriptor: raw.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NORMALIZATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDescriptor {
    /// Normalize a shorthand descriptor, recursing into element descriptors.
    ///
    /// The nested component is read according to the kind: a struct name for
    /// STRUCT, an element descriptor for LIST/SET, a `[key, value]` pair for
    /// MAP. Scalars ignore it (enum fields carry their enum's name there).
    pub fn from_raw(raw: &Json) -> Result<Self, SchemaError> {
        let parts = decompose(raw)?;
        let missing = |expected: &'static str| SchemaError::MissingElement {
            kind: parts.kind,
            expected,
            descriptor: raw.to_string(),
        };

        let element = match parts.kind {
            TType::Struct => {
                let name = parts
                    .nested
                    .and_then(Json::as_str)
                    .ok_or_else(|| missing("struct name"))?;
                Some(Element::Struct(name.to_string()))
            }
            TType::List | TType::Set => {
                let item = parts.nested.ok_or_else(|| missing("element descriptor"))?;
                Some(Element::Item(Box::new(Self::from_raw(item)?)))
            }
            TType::Map => {
                let pair = parts
                    .nested
                    .and_then(Json::as_array)
                    .ok_or_else(|| missing("key/value descriptor pair"))?;
                let [key, value] = pair.as_slice() else {
                    return Err(SchemaError::MalformedDescriptor {
                        arity: pair.len(),
                        descriptor: raw.to_string(),
                    });
                };
                Some(Element::Pair(
                    Box::new(Self::from_raw(key)?),
                    Box::new(Self::from_raw(value)?),
                ))
            }
            _ => None,
        };

        Ok(TypeDescriptor {
            kind: parts.kind,
            name: parts.name.map(str::to_owned),
            element,
            required: parts.required.unwrap_or(false),
        })
    }

    // -- programmatic construction --

    pub fn scalar(kind: TType) -> Self {
        TypeDescriptor { kind, name: None, element: None, required: false }
    }

    pub fn structure(struct_name: impl Into<String>) -> Self {
        TypeDescriptor {
            element: Some(Element::Struct(struct_name.into())),
            ..Self::scalar(TType::Struct)
        }
    }

    pub fn list_of(item: TypeDescriptor) -> Self {
        TypeDescriptor {
            element: Some(Element::Item(Box::new(item))),
            ..Self::scalar(TType::List)
        }
    }

    pub fn set_of(item: TypeDescriptor) -> Self {
        TypeDescriptor {
            element: Some(Element::Item(Box::new(item))),
            ..Self::scalar(TType::Set)
        }
    }

    pub fn map_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor {
            element: Some(Element::Pair(Box::new(key), Box::new(value))),
            ..Self::scalar(TType::Map)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    // -- access for the decoder --

    pub(crate) fn struct_name(&self) -> Result<&str, SchemaError> {
        match &self.element {
            Some(Element::Struct(name)) => Ok(name),
            _ => Err(self.missing("struct name")),
        }
    }

    pub(crate) fn item(&self) -> Result<&TypeDescriptor, SchemaError> {
        match &self.element {
            Some(Element::Item(item)) => Ok(item),
            _ => Err(self.missing("element descriptor")),
        }
    }

    pub(crate) fn pair(&self) -> Result<(&TypeDescriptor, &TypeDescriptor), SchemaError> {
        match &self.element {
            Some(Element::Pair(key, value)) => Ok((key, value)),
            _ => Err(self.missing("key/value descriptor pair")),
        }
    }

    fn missing(&self, expected: &'static str) -> SchemaError {
        SchemaError::MissingElement {
            kind: self.kind,
            expected,
            descriptor: self.to_string(),
        }
    }

    /// Check that composite kinds carry the element they need, and collect
    /// every struct name referenced along the way.
    pub(crate) fn check_shape<'a>(&'a self, refs: &mut Vec<&'a str>) -> Result<(), SchemaError> {
        match self.kind {
            TType::Struct => refs.push(self.struct_name()?),
            TType::List | TType::Set => self.item()?.check_shape(refs)?,
            TType::Map => {
                let (key, value) = self.pair()?;
                key.check_shape(refs)?;
                value.check_shape(refs)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Renders the IDL type expression, e.g. `map<string, SimpleObject>`.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.element) {
            (TType::Struct, Some(Element::Struct(name))) => f.write_str(name),
            (TType::List, Some(Element::Item(item))) => write!(f, "list<{item}>"),
            (TType::Set, Some(Element::Item(item))) => write!(f, "set<{item}>"),
            (TType::Map, Some(Element::Pair(key, value))) => write!(f, "map<{key}, {value}>"),
            (kind, _) => write!(f, "{kind}"),
        }
    }
}
