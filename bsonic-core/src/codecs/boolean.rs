use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

/// Booleans as a native boolean, `0`/`1` in any numeric type, or `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BooleanCodec {
    representation: Representation,
}

impl BooleanCodec {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(BooleanCodec {
            representation: catalog::resolve(LogicalType::Boolean, representation)?,
        })
    }
}

impl Default for BooleanCodec {
    fn default() -> Self {
        BooleanCodec {
            representation: Representation::Boolean,
        }
    }
}

impl RepresentationConfigurable for BooleanCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::Boolean, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(BooleanCodec { representation }))
    }
}

impl Codec<bool> for BooleanCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &bool) -> Result<()> {
        let value = *value;
        match self.representation {
            Representation::Boolean => writer.write_boolean(value),
            Representation::Int32 => writer.write_int32(value as i32),
            Representation::Int64 => writer.write_int64(value as i64),
            Representation::Double => writer.write_double(if value { 1.0 } else { 0.0 }),
            Representation::Decimal128 => writer.write_decimal128(if value {
                Decimal128::ONE
            } else {
                Decimal128::ZERO
            }),
            Representation::String => writer.write_string(if value { "true" } else { "false" }),
            other => Err(unsupported(LogicalType::Boolean, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<bool> {
        match reader.current_bson_type()? {
            BsonType::Boolean => reader.read_boolean(),
            BsonType::Int32 => Ok(reader.read_int32()? != 0),
            BsonType::Int64 => Ok(reader.read_int64()? != 0),
            BsonType::Double => Ok(reader.read_double()? != 0.0),
            BsonType::Decimal128 => Ok(!reader.read_decimal128()?.is_zero()),
            BsonType::String => {
                let text = reader.read_string()?;
                match text.trim() {
                    "true" | "1" => Ok(true),
                    "false" | "0" => Ok(false),
                    _ => Err(CodecError::format(format!(
                        "'{text}' is not a valid Boolean"
                    ))),
                }
            }
            other => Err(CodecError::unexpected_type("Boolean", other)),
        }
    }
}

impl BsonCodable for bool {
    type Codec = BooleanCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<BooleanCodec> {
        BooleanCodec::new(options.representation)
    }
}
