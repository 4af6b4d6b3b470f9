use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::convert::{Numeric, NumericConverter};
use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

/// Binary floating point types.
pub trait FloatTarget: Copy + fmt::Display + fmt::LowerExp + FromStr + Send + Sync + 'static {
    const LOGICAL: LogicalType;
    const NAME: &'static str;

    fn to_numeric(self) -> Numeric;

    fn from_numeric(converter: &NumericConverter, value: Numeric) -> Result<Self>;

    fn is_nan(self) -> bool;

    fn is_infinite(self) -> bool;

    fn is_sign_negative(self) -> bool;

    /// Whether plain notation would be unreasonably long.
    fn wants_exponent(self) -> bool;
}

impl FloatTarget for f64 {
    const LOGICAL: LogicalType = LogicalType::Double;
    const NAME: &'static str = "f64";

    fn to_numeric(self) -> Numeric {
        Numeric::Double(self)
    }

    fn from_numeric(converter: &NumericConverter, value: Numeric) -> Result<Self> {
        converter.to_f64(value)
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }

    fn is_infinite(self) -> bool {
        f64::is_infinite(self)
    }

    fn is_sign_negative(self) -> bool {
        f64::is_sign_negative(self)
    }

    fn wants_exponent(self) -> bool {
        let magnitude = self.abs();
        magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-5)
    }
}

impl FloatTarget for f32 {
    const LOGICAL: LogicalType = LogicalType::Single;
    const NAME: &'static str = "f32";

    fn to_numeric(self) -> Numeric {
        Numeric::Single(self)
    }

    fn from_numeric(converter: &NumericConverter, value: Numeric) -> Result<Self> {
        converter.to_f32(value)
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }

    fn is_infinite(self) -> bool {
        f32::is_infinite(self)
    }

    fn is_sign_negative(self) -> bool {
        f32::is_sign_negative(self)
    }

    fn wants_exponent(self) -> bool {
        let magnitude = self.abs();
        magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-5)
    }
}

/// Shortest text that parses back to `value`.
fn format_float<T: FloatTarget>(value: T) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value.is_sign_negative() {
            "-Infinity".to_owned()
        } else {
            "Infinity".to_owned()
        }
    } else if value.wants_exponent() {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

/// Codec for `f32` and `f64`.
pub struct FloatCodec<T> {
    representation: Representation,
    converter: NumericConverter,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FloatTarget> FloatCodec<T> {
    pub fn new(representation: Representation, converter: NumericConverter) -> Result<Self> {
        Ok(FloatCodec {
            representation: catalog::resolve(T::LOGICAL, representation)?,
            converter,
            _marker: PhantomData,
        })
    }

    pub fn converter(&self) -> NumericConverter {
        self.converter
    }
}

impl<T: FloatTarget> Default for FloatCodec<T> {
    fn default() -> Self {
        FloatCodec {
            representation: Representation::Double,
            converter: NumericConverter::STRICT,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for FloatCodec<T> {
    fn clone(&self) -> Self {
        FloatCodec {
            representation: self.representation,
            converter: self.converter,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FloatCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatCodec")
            .field("type", &std::any::type_name::<T>())
            .field("representation", &self.representation)
            .field("converter", &self.converter)
            .finish()
    }
}

impl<T: FloatTarget> RepresentationConfigurable for FloatCodec<T> {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(T::LOGICAL, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(FloatCodec {
            representation,
            ..(**self).clone()
        }))
    }
}

impl<T: FloatTarget> Codec<T> for FloatCodec<T> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &T) -> Result<()> {
        let source = value.to_numeric();
        match self.representation {
            Representation::Double => writer.write_double(self.converter.to_f64(source)?),
            Representation::Int32 => writer.write_int32(self.converter.to_int::<i32>(source)?),
            Representation::Int64 => writer.write_int64(self.converter.to_int::<i64>(source)?),
            Representation::Decimal128 => {
                writer.write_decimal128(self.converter.to_decimal(source)?)
            }
            Representation::String => writer.write_string(&format_float(*value)),
            other => Err(unsupported(T::LOGICAL, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<T> {
        let source = match reader.current_bson_type()? {
            BsonType::Double => Numeric::Double(reader.read_double()?),
            BsonType::Int32 => Numeric::Int(reader.read_int32()? as i128),
            BsonType::Int64 => Numeric::Int(reader.read_int64()? as i128),
            BsonType::Decimal128 => Numeric::Decimal(reader.read_decimal128()?),
            BsonType::String => {
                let text = reader.read_string()?;
                return text.trim().parse::<T>().map_err(|_| {
                    CodecError::format(format!("'{text}' is not a valid {}", T::NAME))
                });
            }
            other => return Err(CodecError::unexpected_type(T::NAME, other)),
        };
        T::from_numeric(&self.converter, source)
    }
}

impl BsonCodable for f64 {
    type Codec = FloatCodec<f64>;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        FloatCodec::new(options.representation, options.converter())
    }
}

impl BsonCodable for f32 {
    type Codec = FloatCodec<f32>;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        FloatCodec::new(options.representation, options.converter())
    }
}

/// Decimal values; natively `Decimal128`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecimalCodec {
    representation: Representation,
    converter: NumericConverter,
}

impl DecimalCodec {
    pub fn new(representation: Representation, converter: NumericConverter) -> Result<Self> {
        Ok(DecimalCodec {
            representation: catalog::resolve(LogicalType::Decimal, representation)?,
            converter,
        })
    }
}

impl Default for DecimalCodec {
    fn default() -> Self {
        DecimalCodec {
            representation: Representation::Decimal128,
            converter: NumericConverter::STRICT,
        }
    }
}

impl RepresentationConfigurable for DecimalCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::Decimal, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(DecimalCodec {
            representation,
            converter: self.converter,
        }))
    }
}

impl Codec<Decimal128> for DecimalCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Decimal128) -> Result<()> {
        let source = Numeric::Decimal(*value);
        match self.representation {
            Representation::Decimal128 => writer.write_decimal128(*value),
            Representation::Int32 => writer.write_int32(self.converter.to_int::<i32>(source)?),
            Representation::Int64 => writer.write_int64(self.converter.to_int::<i64>(source)?),
            Representation::Double => writer.write_double(self.converter.to_f64(source)?),
            Representation::String => writer.write_string(&value.to_string()),
            other => Err(unsupported(LogicalType::Decimal, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Decimal128> {
        let source = match reader.current_bson_type()? {
            BsonType::Decimal128 => return reader.read_decimal128(),
            BsonType::String => return reader.read_string()?.trim().parse(),
            BsonType::Int32 => Numeric::Int(reader.read_int32()? as i128),
            BsonType::Int64 => Numeric::Int(reader.read_int64()? as i128),
            BsonType::Double => Numeric::Double(reader.read_double()?),
            other => return Err(CodecError::unexpected_type("Decimal128", other)),
        };
        self.converter.to_decimal(source)
    }
}

impl BsonCodable for Decimal128 {
    type Codec = DecimalCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<DecimalCodec> {
        DecimalCodec::new(options.representation, options.converter())
    }
}
