use serde::{Deserialize, Serialize};

use super::{AttrId, TypeId};

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Int,
    Int32,
    Int64,
    UInt,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
    Any,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Int => "Int",
            Primitive::Int32 => "Int32",
            Primitive::Int64 => "Int64",
            Primitive::UInt => "UInt",
            Primitive::UInt32 => "UInt32",
            Primitive::UInt64 => "UInt64",
            Primitive::Float32 => "Float32",
            Primitive::Float64 => "Float64",
            Primitive::String => "String",
            Primitive::Bytes => "Bytes",
            Primitive::Any => "Any",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::Int
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::UInt
                | Primitive::UInt32
                | Primitive::UInt64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Primitive::Float32 | Primitive::Float64)
    }

    /// Whether a JSON literal (default, enum value, example) fits this type.
    pub fn accepts(self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match self {
            Primitive::Any => true,
            Primitive::Boolean => value.is_boolean(),
            Primitive::String | Primitive::Bytes => value.is_string(),
            Primitive::Float32 | Primitive::Float64 => value.is_number(),
            Primitive::UInt | Primitive::UInt32 | Primitive::UInt64 => value.is_u64(),
            _ => matches!(value, Value::Number(n) if n.is_i64() || n.is_u64()),
        }
    }
}

/// The type of an attribute node.
///
/// `Pending` only exists between the registration pass and the finalize pass;
/// a name the finalize pass could not resolve becomes `Dangling` and is
/// reported by the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Primitive(Primitive),
    Array(AttrId),
    Map { key: AttrId, elem: AttrId },
    Object(Object),
    User(TypeId),
    Pending(String),
    Dangling(String),
}

impl DataType {
    pub fn is_object(&self) -> bool {
        matches!(self, DataType::Object(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            DataType::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            DataType::Primitive(p) => Some(*p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub attr: AttrId,
}

/// Declared attributes of an object, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    fields: Vec<Field>,
}

impl Object {
    pub fn get(&self, name: &str) -> Option<AttrId> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.attr)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, attr: AttrId) {
        self.fields.push(Field {
            name: name.into(),
            attr,
        });
    }
}

/// Type argument accepted by the DSL keywords that take a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Primitive(Primitive),
    /// A user or result type, looked up by name in the finalize pass.
    Named(String),
    Array(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
    /// An inline object, filled by the closure of the keyword.
    Object,
}

impl From<Primitive> for TypeSpec {
    fn from(p: Primitive) -> Self {
        TypeSpec::Primitive(p)
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        TypeSpec::Named(name.to_string())
    }
}

impl From<String> for TypeSpec {
    fn from(name: String) -> Self {
        TypeSpec::Named(name)
    }
}

pub fn array_of(elem: impl Into<TypeSpec>) -> TypeSpec {
    TypeSpec::Array(Box::new(elem.into()))
}

pub fn map_of(key: impl Into<TypeSpec>, elem: impl Into<TypeSpec>) -> TypeSpec {
    TypeSpec::Map(Box::new(key.into()), Box::new(elem.into()))
}

pub fn object() -> TypeSpec {
    TypeSpec::Object
}

/// A named, shareable object. `views` is `Some` for result types.
#[derive(Debug, Clone)]
pub struct UserTypeDef {
    pub name: String,
    pub attr: AttrId,
    pub views: Option<Vec<ViewDef>>,
}

impl UserTypeDef {
    pub fn new(name: impl Into<String>, attr: AttrId, result: bool) -> Self {
        Self {
            name: name.into(),
            attr,
            views: result.then(Vec::new),
        }
    }

    pub fn is_result(&self) -> bool {
        self.views.is_some()
    }

    pub fn view(&self, name: &str) -> Option<&ViewDef> {
        self.views.as_ref()?.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDef {
    pub name: String,
    pub fields: Vec<ViewField>,
}

/// An attribute listed by a view, optionally rendered with a sub-view when
/// the attribute is itself a result type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewField {
    pub name: String,
    pub view: Option<String>,
}
