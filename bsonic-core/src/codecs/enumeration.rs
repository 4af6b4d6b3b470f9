use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{Codec, RepresentationConfigurable};
use crate::convert::{Numeric, NumericConverter};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::representation::{catalog, unsupported, IntegerWidth, LogicalType, Representation};

/// Symbol table of a field-less enum.
///
/// Usually derived with `#[derive(BsonEnum)]`, which also makes the enum
/// [`BsonCodable`](crate::BsonCodable) through [`EnumCodec`].
pub trait EnumType: Copy + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;
    /// The `#[repr]` integer type.
    const WIDTH: IntegerWidth;
    /// Every variant with its name, in declaration order.
    const SYMBOLS: &'static [(&'static str, Self)];

    fn to_raw(self) -> i128;

    fn from_raw(raw: i128) -> Option<Self> {
        Self::SYMBOLS
            .iter()
            .find(|(_, value)| value.to_raw() == raw)
            .map(|(_, value)| *value)
    }

    fn symbol(self) -> Option<&'static str> {
        Self::SYMBOLS
            .iter()
            .find(|(_, value)| *value == self)
            .map(|(name, _)| *name)
    }

    /// Exact name first, then the first declared symbol equal ignoring case.
    fn from_symbol(name: &str) -> Option<Self> {
        if let Some((_, value)) = Self::SYMBOLS.iter().find(|(symbol, _)| *symbol == name) {
            return Some(*value);
        }
        let folded = name.to_lowercase();
        Self::SYMBOLS
            .iter()
            .find(|(symbol, _)| symbol.to_lowercase() == folded)
            .map(|(_, value)| *value)
    }
}

/// Enums as their integer value or symbol name.
pub struct EnumCodec<E> {
    representation: Representation,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EnumType> EnumCodec<E> {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(EnumCodec {
            representation: catalog::resolve(Self::logical(), representation)?,
            _marker: PhantomData,
        })
    }

    fn logical() -> LogicalType {
        LogicalType::Enum(E::WIDTH)
    }

    fn lookup(raw: i128) -> Result<E> {
        E::from_raw(raw).ok_or_else(|| {
            CodecError::argument(
                "value",
                format!("{raw} is not a defined value of {}", E::NAME),
            )
        })
    }

    fn parse(text: &str) -> Result<E> {
        if let Some(value) = E::from_symbol(text.trim()) {
            return Ok(value);
        }
        match text.trim().parse::<i128>() {
            Ok(raw) => Self::lookup(NumericConverter::STRICT.to_integer(Numeric::Int(raw), E::WIDTH)?),
            Err(_) => Err(CodecError::argument(
                "value",
                format!("requested value '{text}' was not found in {}", E::NAME),
            )),
        }
    }
}

impl<E: EnumType> Default for EnumCodec<E> {
    fn default() -> Self {
        EnumCodec {
            representation: catalog::default_for(Self::logical()),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EnumCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumCodec")
            .field("type", &std::any::type_name::<E>())
            .field("representation", &self.representation)
            .finish()
    }
}

impl<E: EnumType> RepresentationConfigurable for EnumCodec<E> {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(Self::logical(), representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(EnumCodec {
            representation,
            _marker: PhantomData,
        }))
    }
}

impl<E: EnumType> Codec<E> for EnumCodec<E> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &E) -> Result<()> {
        let raw = Numeric::Int(value.to_raw());
        match self.representation {
            Representation::Int32 => writer.write_int32(NumericConverter::STRICT.to_int::<i32>(raw)?),
            Representation::Int64 => writer.write_int64(NumericConverter::STRICT.to_int::<i64>(raw)?),
            Representation::String => match value.symbol() {
                Some(name) => writer.write_string(name),
                None => Err(CodecError::serialization(format!(
                    "{raw} has no symbol in {}",
                    E::NAME
                ))),
            },
            other => Err(unsupported(Self::logical(), other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<E> {
        let source = match reader.current_bson_type()? {
            BsonType::Int32 => Numeric::Int(reader.read_int32()? as i128),
            BsonType::Int64 => Numeric::Int(reader.read_int64()? as i128),
            BsonType::Double => Numeric::Double(reader.read_double()?),
            BsonType::Decimal128 => Numeric::Decimal(reader.read_decimal128()?),
            BsonType::String => return Self::parse(&reader.read_string()?),
            other => return Err(CodecError::unexpected_type(E::NAME, other)),
        };
        Self::lookup(NumericConverter::STRICT.to_integer(source, E::WIDTH)?)
    }
}
