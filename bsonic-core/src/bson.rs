//! In-memory document model: the physical values codecs produce and consume.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::decimal::Decimal128;
use crate::error::CodecError;

/// Physical type of a value at the reader/writer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BsonType {
    EndOfDocument,
    Double,
    String,
    Document,
    Array,
    Binary,
    Boolean,
    DateTime,
    Null,
    Int32,
    Int64,
    Decimal128,
    ObjectId,
    Symbol,
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BsonType::EndOfDocument => "EndOfDocument",
            BsonType::Double => "Double",
            BsonType::String => "String",
            BsonType::Document => "Document",
            BsonType::Array => "Array",
            BsonType::Binary => "Binary",
            BsonType::Boolean => "Boolean",
            BsonType::DateTime => "DateTime",
            BsonType::Null => "Null",
            BsonType::Int32 => "Int32",
            BsonType::Int64 => "Int64",
            BsonType::Decimal128 => "Decimal128",
            BsonType::ObjectId => "ObjectId",
            BsonType::Symbol => "Symbol",
        };
        f.write_str(name)
    }
}

/// A 12-byte object identifier, written as 24 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ObjectId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| CodecError::format(format!("'{s}' is not a valid ObjectId")))?;
        Ok(ObjectId(bytes))
    }
}

/// Binary sub-type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinarySubtype {
    Generic,
    Function,
    OldBinary,
    UuidLegacy,
    Uuid,
    Md5,
    Encrypted,
    UserDefined(u8),
}

impl From<BinarySubtype> for u8 {
    fn from(subtype: BinarySubtype) -> u8 {
        match subtype {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::OldBinary => 0x02,
            BinarySubtype::UuidLegacy => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::Encrypted => 0x06,
            BinarySubtype::UserDefined(tag) => tag,
        }
    }
}

impl From<u8> for BinarySubtype {
    fn from(tag: u8) -> Self {
        match tag {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::OldBinary,
            0x03 => BinarySubtype::UuidLegacy,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x06 => BinarySubtype::Encrypted,
            other => BinarySubtype::UserDefined(other),
        }
    }
}

/// A binary blob with its sub-type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: BinarySubtype, bytes: impl Into<Vec<u8>>) -> Self {
        Binary {
            subtype,
            bytes: bytes.into(),
        }
    }

    /// Binary with the generic sub-type.
    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Binary::new(BinarySubtype::Generic, bytes)
    }
}

/// A physical value.
#[derive(Debug, Clone, PartialEq)]
pub enum Bson {
    Double(f64),
    String(String),
    Document(Document),
    Array(Vec<Bson>),
    Binary(Binary),
    Boolean(bool),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Null,
    Int32(i32),
    Int64(i64),
    Decimal128(Decimal128),
    ObjectId(ObjectId),
    /// Deprecated string flavour, still found in older data.
    Symbol(String),
}

impl Bson {
    pub fn bson_type(&self) -> BsonType {
        match self {
            Bson::Double(_) => BsonType::Double,
            Bson::String(_) => BsonType::String,
            Bson::Document(_) => BsonType::Document,
            Bson::Array(_) => BsonType::Array,
            Bson::Binary(_) => BsonType::Binary,
            Bson::Boolean(_) => BsonType::Boolean,
            Bson::DateTime(_) => BsonType::DateTime,
            Bson::Null => BsonType::Null,
            Bson::Int32(_) => BsonType::Int32,
            Bson::Int64(_) => BsonType::Int64,
            Bson::Decimal128(_) => BsonType::Decimal128,
            Bson::ObjectId(_) => BsonType::ObjectId,
            Bson::Symbol(_) => BsonType::Symbol,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Bson]> {
        match self {
            Bson::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Bson {
    fn from(v: bool) -> Self {
        Bson::Boolean(v)
    }
}

impl From<i32> for Bson {
    fn from(v: i32) -> Self {
        Bson::Int32(v)
    }
}

impl From<i64> for Bson {
    fn from(v: i64) -> Self {
        Bson::Int64(v)
    }
}

impl From<f64> for Bson {
    fn from(v: f64) -> Self {
        Bson::Double(v)
    }
}

impl From<&str> for Bson {
    fn from(v: &str) -> Self {
        Bson::String(v.to_string())
    }
}

impl From<String> for Bson {
    fn from(v: String) -> Self {
        Bson::String(v)
    }
}

impl From<Decimal128> for Bson {
    fn from(v: Decimal128) -> Self {
        Bson::Decimal128(v)
    }
}

impl From<ObjectId> for Bson {
    fn from(v: ObjectId) -> Self {
        Bson::ObjectId(v)
    }
}

impl From<Binary> for Bson {
    fn from(v: Binary) -> Self {
        Bson::Binary(v)
    }
}

impl From<Document> for Bson {
    fn from(v: Document) -> Self {
        Bson::Document(v)
    }
}

impl From<Vec<Bson>> for Bson {
    fn from(v: Vec<Bson>) -> Self {
        Bson::Array(v)
    }
}

/// Ordered map of field names to values.
///
/// Equality is order-sensitive: `{a, b}` and `{b, a}` are different documents.
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: IndexMap<String, Bson>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Inserts a field, keeping the original position if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Bson> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Bson> {
        self.fields.shift_remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.fields.iter().eq(other.fields.iter())
    }
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = indexmap::map::IntoIter<String, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Bson>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Builds a [`Document`] from `name => value` pairs.
///
/// ```
/// use bsonic_core::{doc, Bson};
///
/// let d = doc! { "a" => 1i32, "b" => "two" };
/// assert_eq!(d.get("b"), Some(&Bson::String("two".into())));
/// ```
#[macro_export]
macro_rules! doc {
    () => { $crate::Document::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::Document::new();
        $( document.insert($name, $value); )+
        document
    }};
}
