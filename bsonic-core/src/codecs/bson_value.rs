use crate::bson::{Bson, Document};
use crate::codec::{BsonCodable, Codec};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::CodecOptions;

/// Raw [`Bson`] values, passed through structurally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BsonValueCodec;

impl Codec<Bson> for BsonValueCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Bson) -> Result<()> {
        writer.write_value(value)
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Bson> {
        reader.read_value()
    }

    fn encodes_null(&self) -> bool {
        true
    }
}

impl BsonCodable for Bson {
    type Codec = BsonValueCodec;

    fn build_codec(_registry: &CodecRegistry, _options: &CodecOptions) -> Result<BsonValueCodec> {
        Ok(BsonValueCodec)
    }
}

/// Raw documents; anything other than a document is a format error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DocumentCodec;

impl Codec<Document> for DocumentCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Document) -> Result<()> {
        writer.write_value(&Bson::Document(value.clone()))
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Document> {
        match reader.read_value()? {
            Bson::Document(document) => Ok(document),
            other => Err(CodecError::unexpected_type("Document", other.bson_type())),
        }
    }
}

impl BsonCodable for Document {
    type Codec = DocumentCodec;

    fn build_codec(_registry: &CodecRegistry, _options: &CodecOptions) -> Result<DocumentCodec> {
        Ok(DocumentCodec)
    }
}
