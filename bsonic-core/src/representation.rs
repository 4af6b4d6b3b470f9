//! Representation catalog and the per-codec configuration tuple.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bson::BsonType;
use crate::convert::NumericConverter;
use crate::error::{CodecError, Result};
use crate::guid::GuidRepresentation;
use crate::time::{DateTimeKind, TimeUnit};

/// Physical encoding requested for a logical value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Resolved to the logical type's own default.
    #[default]
    Default,
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal128,
    String,
    Binary,
    DateTime,
    Document,
    Array,
    ObjectId,
    Symbol,
}

impl Representation {
    /// The physical type this representation writes, if it names one.
    pub fn bson_type(self) -> Option<BsonType> {
        match self {
            Representation::Default => None,
            Representation::Boolean => Some(BsonType::Boolean),
            Representation::Int32 => Some(BsonType::Int32),
            Representation::Int64 => Some(BsonType::Int64),
            Representation::Double => Some(BsonType::Double),
            Representation::Decimal128 => Some(BsonType::Decimal128),
            Representation::String => Some(BsonType::String),
            Representation::Binary => Some(BsonType::Binary),
            Representation::DateTime => Some(BsonType::DateTime),
            Representation::Document => Some(BsonType::Document),
            Representation::Array => Some(BsonType::Array),
            Representation::ObjectId => Some(BsonType::ObjectId),
            Representation::Symbol => Some(BsonType::Symbol),
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bson_type() {
            Some(bson_type) => bson_type.fmt(f),
            None => f.write_str("Default"),
        }
    }
}

/// Width and signedness of an integer domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerWidth {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntegerWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntegerWidth::I8 | IntegerWidth::U8 => 8,
            IntegerWidth::I16 | IntegerWidth::U16 => 16,
            IntegerWidth::I32 | IntegerWidth::U32 => 32,
            IntegerWidth::I64 | IntegerWidth::U64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntegerWidth::I8 | IntegerWidth::I16 | IntegerWidth::I32 | IntegerWidth::I64
        )
    }

    pub fn min(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (self.bits() - 1))
        } else {
            0
        }
    }

    pub fn max(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }

    pub fn contains(self, value: i128) -> bool {
        (self.min()..=self.max()).contains(&value)
    }

    /// Reinterprets the low bits of `value` in this width, two's complement.
    pub fn wrap(self, value: i128) -> i128 {
        let bits = self.bits();
        let low = (value as u128) & ((1u128 << bits) - 1);
        if self.is_signed() && low >> (bits - 1) == 1 {
            low as i128 - (1i128 << bits)
        } else {
            low as i128
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegerWidth::I8 => "i8",
            IntegerWidth::U8 => "u8",
            IntegerWidth::I16 => "i16",
            IntegerWidth::U16 => "u16",
            IntegerWidth::I32 => "i32",
            IntegerWidth::U32 => "u32",
            IntegerWidth::I64 => "i64",
            IntegerWidth::U64 => "u64",
        }
    }
}

/// Logical types with a representation catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Boolean,
    Integer(IntegerWidth),
    Char,
    Single,
    Double,
    Decimal,
    DateTime,
    TimeSpan,
    TimeOfDay,
    Guid,
    Bytes,
    BitSet,
    String,
    /// An enumeration backed by an integer of the given width.
    Enum(IntegerWidth),
    Collection,
    Tuple,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Integer(width) => f.write_str(width.name()),
            LogicalType::Enum(width) => write!(f, "enum({})", width.name()),
            other => write!(f, "{other:?}"),
        }
    }
}

pub mod catalog {
    //! Legal representations per logical type. The first entry of each list is the default.

    use super::{IntegerWidth, LogicalType, Representation};
    use crate::error::{CodecError, Result};

    use Representation::*;

    const BOOLEAN: &[Representation] = &[Boolean, Int32, Int64, Double, Decimal128, String];
    const NARROW_INTEGER: &[Representation] = &[Int32, Int64, Double, Decimal128, String];
    const BYTE: &[Representation] = &[Int32, Int64, Double, Decimal128, String, Binary];
    const WIDE_INTEGER: &[Representation] = &[Int64, Int32, Double, Decimal128, String];
    const CHAR: &[Representation] = &[Int32, String];
    const FLOAT: &[Representation] = &[Double, Int32, Int64, Decimal128, String];
    const DECIMAL: &[Representation] = &[Decimal128, Int32, Int64, Double, String];
    const DATE_TIME: &[Representation] = &[DateTime, Int64, String, Document];
    const TIME_SPAN: &[Representation] = &[String, Int32, Int64, Double];
    const TIME_OF_DAY: &[Representation] = &[Int64, Int32, Double, String];
    const GUID: &[Representation] = &[Binary, String];
    const BYTES: &[Representation] = &[Binary, String];
    const STRING: &[Representation] = &[String, ObjectId, Symbol];
    const NARROW_ENUM: &[Representation] = &[Int32, Int64, String];
    const WIDE_ENUM: &[Representation] = &[Int64, Int32, String];
    const ARRAY: &[Representation] = &[Array];

    /// Representations `logical` can be encoded with.
    pub fn allowed(logical: LogicalType) -> &'static [Representation] {
        match logical {
            LogicalType::Boolean => BOOLEAN,
            LogicalType::Integer(IntegerWidth::U8) => BYTE,
            LogicalType::Integer(IntegerWidth::I64 | IntegerWidth::U64) => WIDE_INTEGER,
            LogicalType::Integer(_) => NARROW_INTEGER,
            LogicalType::Char => CHAR,
            LogicalType::Single | LogicalType::Double => FLOAT,
            LogicalType::Decimal => DECIMAL,
            LogicalType::DateTime => DATE_TIME,
            LogicalType::TimeSpan => TIME_SPAN,
            LogicalType::TimeOfDay => TIME_OF_DAY,
            LogicalType::Guid => GUID,
            LogicalType::Bytes | LogicalType::BitSet => BYTES,
            LogicalType::String => STRING,
            LogicalType::Enum(IntegerWidth::I64 | IntegerWidth::U64) => WIDE_ENUM,
            LogicalType::Enum(_) => NARROW_ENUM,
            LogicalType::Collection | LogicalType::Tuple => ARRAY,
        }
    }

    /// Representation used when none is requested.
    pub fn default_for(logical: LogicalType) -> Representation {
        allowed(logical)[0]
    }

    /// Resolves `Default` and rejects representations `logical` does not support.
    pub fn resolve(logical: LogicalType, requested: Representation) -> Result<Representation> {
        if requested == Default {
            return Ok(default_for(logical));
        }
        if allowed(logical).contains(&requested) {
            Ok(requested)
        } else {
            Err(CodecError::argument(
                "representation",
                format!("{requested} is not a valid representation for {logical}"),
            ))
        }
    }
}

/// How a map is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryRepresentation {
    /// `{ key: value, ... }`; keys must encode as strings.
    #[default]
    Document,
    /// `[[key, value], ...]`
    ArrayOfArrays,
    /// `[{ k: key, v: value }, ...]`
    ArrayOfDocuments,
}

/// Configuration a codec is built from.
///
/// Supplied per field by the mapping layer. Equal options build
/// interchangeable codecs, which is what lets the registry cache by them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecOptions {
    pub representation: Representation,
    pub allow_overflow: bool,
    pub allow_truncation: bool,
    pub date_only: bool,
    pub kind: DateTimeKind,
    pub time_unit: TimeUnit,
    pub guid_representation: GuidRepresentation,
    pub dictionary_representation: DictionaryRepresentation,
}

impl CodecOptions {
    pub fn new() -> Self {
        CodecOptions::default()
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_allow_overflow(mut self, allow: bool) -> Self {
        self.allow_overflow = allow;
        self
    }

    pub fn with_allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }

    pub fn with_date_only(mut self, date_only: bool) -> Self {
        self.date_only = date_only;
        self
    }

    pub fn with_kind(mut self, kind: DateTimeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    pub fn with_guid_representation(mut self, guid_representation: GuidRepresentation) -> Self {
        self.guid_representation = guid_representation;
        self
    }

    pub fn with_dictionary_representation(mut self, layout: DictionaryRepresentation) -> Self {
        self.dictionary_representation = layout;
        self
    }

    /// The overflow and truncation policy.
    pub fn converter(&self) -> NumericConverter {
        NumericConverter {
            allow_overflow: self.allow_overflow,
            allow_truncation: self.allow_truncation,
        }
    }

    /// Validates the representation against `logical`, resolving `Default`.
    pub fn resolve_for(&self, logical: LogicalType) -> Result<Representation> {
        catalog::resolve(logical, self.representation)
    }

    /// Options for the elements of a container: everything except the
    /// container's own layout carries over.
    pub fn for_elements(&self) -> CodecOptions {
        CodecOptions {
            dictionary_representation: DictionaryRepresentation::default(),
            ..self.clone()
        }
    }

    /// Options for the elements of a `container`. A representation the
    /// container accepts for itself stops there; any other one is meant for
    /// the elements.
    pub fn for_elements_of(&self, container: LogicalType) -> CodecOptions {
        let representation = if catalog::allowed(container).contains(&self.representation) {
            Representation::Default
        } else {
            self.representation
        };
        CodecOptions {
            representation,
            ..self.for_elements()
        }
    }
}

pub(crate) fn unsupported(logical: LogicalType, representation: Representation) -> CodecError {
    CodecError::argument(
        "representation",
        format!("{representation} is not a valid representation for {logical}"),
    )
}
