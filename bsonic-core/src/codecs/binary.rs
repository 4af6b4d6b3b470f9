use std::sync::Arc;

use crate::bits::BitSet;
use crate::bson::{Binary, BinarySubtype, BsonType};
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

const LENGTH_FIELD: &str = "Length";
const BYTES_FIELD: &str = "Bytes";

/// A byte sequence, distinct from a `Vec<u8>` of small integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteString(pub Vec<u8>);

impl ByteString {
    pub fn new(data: Vec<u8>) -> Self {
        ByteString(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(v: Vec<u8>) -> Self {
        ByteString(v)
    }
}

impl From<&[u8]> for ByteString {
    fn from(v: &[u8]) -> Self {
        ByteString(v.to_vec())
    }
}

fn read_generic_binary(reader: &mut dyn BsonReader, target: &str) -> Result<Vec<u8>> {
    let binary = reader.read_binary()?;
    match binary.subtype {
        BinarySubtype::Generic | BinarySubtype::OldBinary => Ok(binary.bytes),
        other => Err(CodecError::format(format!(
            "cannot decode {target} from binary sub-type {}",
            u8::from(other)
        ))),
    }
}

fn decode_hex(text: &str, target: &str) -> Result<Vec<u8>> {
    hex::decode(text)
        .map_err(|e| CodecError::format(format!("'{text}' is not a valid hex {target}: {e}")))
}

/// Byte strings as generic binary or lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BytesCodec {
    representation: Representation,
}

impl BytesCodec {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(BytesCodec {
            representation: catalog::resolve(LogicalType::Bytes, representation)?,
        })
    }
}

impl Default for BytesCodec {
    fn default() -> Self {
        BytesCodec {
            representation: Representation::Binary,
        }
    }
}

impl RepresentationConfigurable for BytesCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::Bytes, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(BytesCodec { representation }))
    }
}

impl Codec<ByteString> for BytesCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &ByteString) -> Result<()> {
        match self.representation {
            Representation::Binary => writer.write_binary(&Binary::generic(value.as_bytes())),
            Representation::String => writer.write_string(&hex::encode(value.as_bytes())),
            other => Err(unsupported(LogicalType::Bytes, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<ByteString> {
        match reader.current_bson_type()? {
            BsonType::Binary => read_generic_binary(reader, "bytes").map(ByteString),
            BsonType::String => decode_hex(&reader.read_string()?, "bytes").map(ByteString),
            other => Err(CodecError::unexpected_type("bytes", other)),
        }
    }
}

impl BsonCodable for ByteString {
    type Codec = BytesCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<BytesCodec> {
        BytesCodec::new(options.representation)
    }
}

/// Bit sets.
///
/// As binary, whole bytes are written raw; any other length is wrapped as
/// `{ Length, Bytes }` so the bit count survives. As text, one `0`/`1` per bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitSetCodec {
    representation: Representation,
}

impl BitSetCodec {
    pub fn new(representation: Representation) -> Result<Self> {
        Ok(BitSetCodec {
            representation: catalog::resolve(LogicalType::BitSet, representation)?,
        })
    }
}

impl Default for BitSetCodec {
    fn default() -> Self {
        BitSetCodec {
            representation: Representation::Binary,
        }
    }
}

impl RepresentationConfigurable for BitSetCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::BitSet, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(BitSetCodec { representation }))
    }
}

impl Codec<BitSet> for BitSetCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &BitSet) -> Result<()> {
        match self.representation {
            Representation::Binary if value.len() % 8 == 0 => {
                writer.write_binary(&Binary::generic(value.as_bytes()))
            }
            Representation::Binary => {
                let length = i32::try_from(value.len()).map_err(|_| {
                    CodecError::overflow(format!("{} bits do not fit in Int32", value.len()))
                })?;
                writer.write_start_document()?;
                writer.write_name(LENGTH_FIELD)?;
                writer.write_int32(length)?;
                writer.write_name(BYTES_FIELD)?;
                writer.write_binary(&Binary::generic(value.as_bytes()))?;
                writer.write_end_document()
            }
            Representation::String => {
                let text: String = value.iter().map(|bit| if bit { '1' } else { '0' }).collect();
                writer.write_string(&text)
            }
            other => Err(unsupported(LogicalType::BitSet, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<BitSet> {
        match reader.current_bson_type()? {
            BsonType::Binary => read_generic_binary(reader, "BitSet").map(BitSet::from_bytes),
            BsonType::Document => read_sized_bits(reader),
            BsonType::String => {
                let text = reader.read_string()?;
                let bits = text
                    .chars()
                    .map(|c| match c {
                        '0' => Ok(false),
                        '1' => Ok(true),
                        _ => Err(CodecError::format(format!(
                            "'{text}' is not a valid BitSet string"
                        ))),
                    })
                    .collect::<Result<Vec<bool>>>()?;
                Ok(BitSet::from_bools(&bits))
            }
            other => Err(CodecError::unexpected_type("BitSet", other)),
        }
    }
}

fn read_sized_bits(reader: &mut dyn BsonReader) -> Result<BitSet> {
    reader.read_start_document()?;
    let mut length = None;
    let mut bytes = None;
    while reader.read_bson_type()? != BsonType::EndOfDocument {
        let name = reader.read_name()?;
        match name.as_str() {
            LENGTH_FIELD => length = Some(reader.read_int32()?),
            BYTES_FIELD => bytes = Some(read_generic_binary(reader, "BitSet")?),
            _ => {
                return Err(CodecError::format(format!(
                    "unexpected field `{name}` in a BitSet document"
                )));
            }
        }
    }
    reader.read_end_document()?;
    let (Some(length), Some(bytes)) = (length, bytes) else {
        return Err(CodecError::format(format!(
            "a BitSet document requires `{LENGTH_FIELD}` and `{BYTES_FIELD}`"
        )));
    };
    usize::try_from(length)
        .ok()
        .and_then(|length| BitSet::from_bytes_with_len(bytes, length))
        .ok_or_else(|| {
            CodecError::format(format!("{length} bits do not match the stored bytes"))
        })
}

impl BsonCodable for BitSet {
    type Codec = BitSetCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<BitSetCodec> {
        BitSetCodec::new(options.representation)
    }
}
