use indexmap::IndexMap;
use uuid::Uuid;

use super::types::{BuiltinType, CollectionKind, TypeName};
use crate::codecs::ByteString;
use crate::decimal::Decimal128;
use crate::time::DateTime;

/// A dynamically typed value.
///
/// Collections remember their kind and application records their type
/// name, which is what the discriminator is derived from on encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(Decimal128),
    String(String),
    DateTime(DateTime),
    Guid(Uuid),
    Binary(ByteString),
    Array(Vec<Value>),
    Document(IndexMap<String, Value>),
    Collection(CollectionKind, Vec<Value>),
    Object(Record),
}

/// An application type carried structurally.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: TypeName,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_name: TypeName) -> Self {
        Record {
            type_name,
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl Value {
    /// The actual type of the value; `None` for null.
    pub fn type_name(&self) -> Option<TypeName> {
        match self {
            Value::Null => None,
            Value::Object(record) => Some(record.type_name.clone()),
            other => other.builtin().map(BuiltinType::type_name),
        }
    }

    pub fn builtin(&self) -> Option<BuiltinType> {
        Some(match self {
            Value::Null | Value::Object(_) => return None,
            Value::Boolean(_) => BuiltinType::Boolean,
            Value::Int32(_) => BuiltinType::Int32,
            Value::Int64(_) => BuiltinType::Int64,
            Value::Double(_) => BuiltinType::Double,
            Value::Decimal128(_) => BuiltinType::Decimal128,
            Value::String(_) => BuiltinType::String,
            Value::DateTime(_) => BuiltinType::DateTime,
            Value::Guid(_) => BuiltinType::Guid,
            Value::Binary(_) => BuiltinType::Binary,
            Value::Array(_) => BuiltinType::Array,
            Value::Document(_) => BuiltinType::Document,
            Value::Collection(kind, _) => BuiltinType::Collection(*kind),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

value_from! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    Decimal128 => Decimal128,
    String => String,
    DateTime => DateTime,
    Uuid => Guid,
    ByteString => Binary,
    Vec<Value> => Array,
    IndexMap<String, Value> => Document,
    Record => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
