use std::fmt;
use std::sync::Arc;

use crate::bson::{Bson, Document};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter, DocumentReader, DocumentWriter};
use crate::registry::CodecRegistry;
use crate::representation::{CodecOptions, Representation};

/// Encodes values of `T` through a writer and decodes them from a reader.
///
/// Codecs are immutable once built and are shared freely between threads;
/// all per-call state lives in the reader or writer.
pub trait Codec<T>: Send + Sync + fmt::Debug {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &T) -> Result<()>;

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<T>;

    /// Whether a present value can encode as a physical null.
    ///
    /// Nullable wrappers around such codecs write a marker document for the
    /// absent value instead of a null.
    fn encodes_null(&self) -> bool {
        false
    }
}

/// A type with a default codec the registry can build.
pub trait BsonCodable: Sized + Send + Sync + 'static {
    type Codec: Codec<Self> + 'static;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec>;
}

/// Codecs whose physical representation can be reconfigured.
pub trait RepresentationConfigurable: Sized {
    /// The effective representation, never `Default`.
    fn representation(&self) -> Representation;

    /// A codec using `representation`.
    ///
    /// Returns the same instance when the effective representation does not change.
    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>>;
}

/// Encodes a single value into a standalone [`Bson`].
///
/// Nothing is returned unless encoding completed.
pub fn encode_to_bson<T, C>(codec: &C, value: &T) -> Result<Bson>
where
    C: Codec<T> + ?Sized,
{
    let mut writer = DocumentWriter::new();
    codec.encode(&mut writer, value)?;
    writer.into_bson()
}

/// Decodes a single value from a standalone [`Bson`].
pub fn decode_from_bson<T, C>(codec: &C, value: Bson) -> Result<T>
where
    C: Codec<T> + ?Sized,
{
    let mut reader = DocumentReader::new(value);
    codec.decode(&mut reader)
}

/// Encodes `value` as the only field of a document.
pub fn encode_field<T, C>(codec: &C, name: &str, value: &T) -> Result<Document>
where
    C: Codec<T> + ?Sized,
{
    let mut writer = DocumentWriter::new();
    writer.write_start_document()?;
    writer.write_name(name)?;
    codec
        .encode(&mut writer, value)
        .map_err(|e| e.in_field(name))?;
    writer.write_end_document()?;
    match writer.into_bson()? {
        Bson::Document(document) => Ok(document),
        other => Err(CodecError::format(format!(
            "expected a document, built {}",
            other.bson_type()
        ))),
    }
}

/// Decodes the field `name` of `document`.
pub fn decode_field<T, C>(codec: &C, name: &str, document: &Document) -> Result<T>
where
    C: Codec<T> + ?Sized,
{
    let value = document
        .get(name)
        .cloned()
        .ok_or_else(|| CodecError::format(format!("missing field `{name}`")))?;
    decode_from_bson(codec, value).map_err(|e| e.in_field(name))
}
