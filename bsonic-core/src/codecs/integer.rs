use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bson::{Binary, BinarySubtype, BsonType};
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::convert::{IntegerTarget, Numeric, NumericConverter};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

/// Codec for every fixed-width integer type.
///
/// Values go through the [`NumericConverter`] in both directions, so a
/// `u32` stored as `Int32` needs `allow_overflow` and comes back bit-exact.
/// `u8` can additionally be stored as a one byte binary.
pub struct IntegerCodec<T> {
    representation: Representation,
    converter: NumericConverter,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IntegerTarget> IntegerCodec<T> {
    pub fn new(representation: Representation, converter: NumericConverter) -> Result<Self> {
        Ok(IntegerCodec {
            representation: catalog::resolve(Self::logical(), representation)?,
            converter,
            _marker: PhantomData,
        })
    }

    pub fn converter(&self) -> NumericConverter {
        self.converter
    }

    fn logical() -> LogicalType {
        LogicalType::Integer(T::WIDTH)
    }

    fn from_numeric(&self, value: Numeric) -> Result<T> {
        self.converter.to_int::<T>(value)
    }
}

impl<T: IntegerTarget> Default for IntegerCodec<T> {
    fn default() -> Self {
        IntegerCodec {
            representation: catalog::default_for(Self::logical()),
            converter: NumericConverter::STRICT,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for IntegerCodec<T> {
    fn clone(&self) -> Self {
        IntegerCodec {
            representation: self.representation,
            converter: self.converter,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for IntegerCodec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.representation == other.representation && self.converter == other.converter
    }
}

impl<T> fmt::Debug for IntegerCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerCodec")
            .field("type", &std::any::type_name::<T>())
            .field("representation", &self.representation)
            .field("converter", &self.converter)
            .finish()
    }
}

impl<T: IntegerTarget> RepresentationConfigurable for IntegerCodec<T> {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(Self::logical(), representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(IntegerCodec {
            representation,
            ..(**self).clone()
        }))
    }
}

impl<T: IntegerTarget> Codec<T> for IntegerCodec<T> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &T) -> Result<()> {
        let source = Numeric::Int(value.to_i128());
        match self.representation {
            Representation::Int32 => writer.write_int32(self.converter.to_int::<i32>(source)?),
            Representation::Int64 => writer.write_int64(self.converter.to_int::<i64>(source)?),
            Representation::Double => writer.write_double(self.converter.to_f64(source)?),
            Representation::Decimal128 => {
                writer.write_decimal128(self.converter.to_decimal(source)?)
            }
            Representation::String => writer.write_string(&value.to_string()),
            Representation::Binary => {
                let byte = self.converter.to_int::<u8>(source)?;
                writer.write_binary(&Binary::generic(vec![byte]))
            }
            other => Err(unsupported(Self::logical(), other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<T> {
        let width = T::WIDTH.name();
        match reader.current_bson_type()? {
            BsonType::Int32 => self.from_numeric(Numeric::Int(reader.read_int32()? as i128)),
            BsonType::Int64 => self.from_numeric(Numeric::Int(reader.read_int64()? as i128)),
            BsonType::Double => self.from_numeric(Numeric::Double(reader.read_double()?)),
            BsonType::Decimal128 => self.from_numeric(Numeric::Decimal(reader.read_decimal128()?)),
            BsonType::String => {
                let text = reader.read_string()?;
                let parsed: i128 = text.trim().parse().map_err(|_| {
                    CodecError::format(format!("'{text}' is not a valid {width}"))
                })?;
                NumericConverter::STRICT.to_int::<T>(Numeric::Int(parsed))
            }
            BsonType::Binary if self.accepts_binary() => {
                let binary = reader.read_binary()?;
                match (binary.subtype, binary.bytes.as_slice()) {
                    (BinarySubtype::Generic | BinarySubtype::OldBinary, [byte]) => {
                        self.from_numeric(Numeric::Int(*byte as i128))
                    }
                    (_, bytes) => Err(CodecError::format(format!(
                        "expected a single generic byte for {width}, found {} bytes",
                        bytes.len()
                    ))),
                }
            }
            other => Err(CodecError::unexpected_type(width, other)),
        }
    }
}

impl<T: IntegerTarget> IntegerCodec<T> {
    fn accepts_binary(&self) -> bool {
        catalog::allowed(Self::logical()).contains(&Representation::Binary)
    }
}

macro_rules! integer_codable {
    ($($ty:ty),* $(,)?) => {$(
        impl BsonCodable for $ty {
            type Codec = IntegerCodec<$ty>;

            fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
                IntegerCodec::new(options.representation, options.converter())
            }
        }
    )*};
}

integer_codable!(i8, u8, i16, u16, i32, u32, i64, u64);
