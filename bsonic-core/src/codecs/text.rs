use std::sync::Arc;

use crate::bson::{BsonType, ObjectId};
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

/// Strings, as BSON strings, object ids or symbols.
///
/// The `ObjectId` representation only accepts 24-digit hex text. Every form
/// is read back regardless of the configured one; object ids come back as
/// lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringCodec {
    representation: Representation,
}

impl StringCodec {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(StringCodec {
            representation: catalog::resolve(LogicalType::String, representation)?,
        })
    }
}

impl Default for StringCodec {
    fn default() -> Self {
        StringCodec {
            representation: Representation::String,
        }
    }
}

impl RepresentationConfigurable for StringCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::String, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(StringCodec { representation }))
    }
}

impl Codec<String> for StringCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &String) -> Result<()> {
        match self.representation {
            Representation::String => writer.write_string(value),
            Representation::ObjectId => writer.write_object_id(value.parse::<ObjectId>()?),
            Representation::Symbol => writer.write_symbol(value),
            other => Err(unsupported(LogicalType::String, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<String> {
        match reader.current_bson_type()? {
            BsonType::String => reader.read_string(),
            BsonType::ObjectId => Ok(reader.read_object_id()?.to_string()),
            BsonType::Symbol => reader.read_symbol(),
            other => Err(CodecError::unexpected_type("String", other)),
        }
    }
}

impl BsonCodable for String {
    type Codec = StringCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<StringCodec> {
        StringCodec::new(options.representation)
    }
}

/// Characters, as their code point or a one character string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharCodec {
    representation: Representation,
}

impl CharCodec {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(CharCodec {
            representation: catalog::resolve(LogicalType::Char, representation)?,
        })
    }
}

impl Default for CharCodec {
    fn default() -> Self {
        CharCodec {
            representation: Representation::Int32,
        }
    }
}

impl RepresentationConfigurable for CharCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::Char, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(CharCodec { representation }))
    }
}

impl Codec<char> for CharCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &char) -> Result<()> {
        match self.representation {
            Representation::Int32 => writer.write_int32(*value as u32 as i32),
            Representation::String => writer.write_string(value.encode_utf8(&mut [0; 4])),
            other => Err(unsupported(LogicalType::Char, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<char> {
        match reader.current_bson_type()? {
            BsonType::Int32 => {
                let code = reader.read_int32()?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| CodecError::overflow(format!("{code} is not a valid Char")))
            }
            BsonType::String => {
                let text = reader.read_string()?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(CodecError::format(format!(
                        "expected a single character, found '{text}'"
                    ))),
                }
            }
            other => Err(CodecError::unexpected_type("Char", other)),
        }
    }
}

impl BsonCodable for char {
    type Codec = CharCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<CharCodec> {
        CharCodec::new(options.representation)
    }
}
