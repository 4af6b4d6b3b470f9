use std::fmt;
use std::sync::Arc;

use crate::bson::{Bson, BsonType, Document};
use crate::codec::{decode_from_bson, BsonCodable, Codec};
use crate::error::Result;
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::CodecOptions;

/// Field of the document standing in for an absent value.
pub const NULL_MARKER: &str = "_csharpnull";
/// Older spelling of [`NULL_MARKER`], still accepted on decode.
pub const LEGACY_NULL_MARKER: &str = "$csharpnull";

/// Whether `document` is a null marker in either spelling.
pub fn is_null_marker(document: &Document) -> bool {
    document.len() == 1
        && [NULL_MARKER, LEGACY_NULL_MARKER]
            .iter()
            .any(|name| document.get(name) == Some(&Bson::Boolean(true)))
}

/// Optional values.
///
/// `None` is written as BSON null unless the inner codec can itself produce
/// null for a present value, in which case `{ _csharpnull: true }` is written
/// so the two stay distinguishable.
pub struct NullableCodec<T> {
    inner: Arc<dyn Codec<T>>,
}

impl<T> NullableCodec<T> {
    pub fn new(inner: Arc<dyn Codec<T>>) -> Self {
        NullableCodec { inner }
    }

    pub fn inner(&self) -> &Arc<dyn Codec<T>> {
        &self.inner
    }
}

impl<T> Clone for NullableCodec<T> {
    fn clone(&self) -> Self {
        NullableCodec {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for NullableCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullableCodec")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: 'static> Codec<Option<T>> for NullableCodec<T> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Option<T>) -> Result<()> {
        match value {
            Some(value) => self.inner.encode(writer, value),
            None if self.inner.encodes_null() => {
                writer.write_start_document()?;
                writer.write_name(NULL_MARKER)?;
                writer.write_boolean(true)?;
                writer.write_end_document()
            }
            None => writer.write_null(),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Option<T>> {
        if !self.inner.encodes_null() {
            if reader.current_bson_type()? == BsonType::Null {
                reader.read_null()?;
                return Ok(None);
            }
            return self.inner.decode(reader).map(Some);
        }
        match reader.current_bson_type()? {
            BsonType::Document => match reader.read_value()? {
                Bson::Document(document) if is_null_marker(&document) => Ok(None),
                other => decode_from_bson(self.inner.as_ref(), other).map(Some),
            },
            _ => self.inner.decode(reader).map(Some),
        }
    }

    fn encodes_null(&self) -> bool {
        true
    }
}

impl<T: BsonCodable> BsonCodable for Option<T> {
    type Codec = NullableCodec<T>;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        Ok(NullableCodec::new(registry.get_codec::<T>(options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_to_bson;
    use crate::codecs::{BsonValueCodec, IntegerCodec};
    use crate::doc;

    fn optional_bson() -> NullableCodec<Bson> {
        NullableCodec::new(Arc::new(BsonValueCodec) as Arc<dyn Codec<Bson>>)
    }

    #[test]
    fn plain_inner_codecs_use_null() {
        let codec = NullableCodec::new(Arc::new(IntegerCodec::<i32>::default()) as Arc<dyn Codec<i32>>);
        assert_eq!(encode_to_bson(&codec, &None).unwrap(), Bson::Null);
        assert_eq!(encode_to_bson(&codec, &Some(4)).unwrap(), Bson::Int32(4));
        assert_eq!(decode_from_bson(&codec, Bson::Null).unwrap(), None);
        assert_eq!(decode_from_bson(&codec, Bson::Int32(4)).unwrap(), Some(4));
    }

    #[test]
    fn null_capable_inner_codecs_use_the_marker() {
        let codec = optional_bson();
        let absent = encode_to_bson(&codec, &None).unwrap();
        assert_eq!(absent, Bson::Document(doc! { "_csharpnull" => true }));
        assert_eq!(decode_from_bson(&codec, absent).unwrap(), None);

        let present_null = encode_to_bson(&codec, &Some(Bson::Null)).unwrap();
        assert_eq!(present_null, Bson::Null);
        assert_eq!(decode_from_bson(&codec, present_null).unwrap(), Some(Bson::Null));
    }

    #[test]
    fn legacy_marker_still_decodes() {
        let legacy = Bson::Document(doc! { "$csharpnull" => true });
        assert_eq!(decode_from_bson(&optional_bson(), legacy).unwrap(), None);
    }

    #[test]
    fn nested_options_stay_apart() {
        let inner = NullableCodec::new(Arc::new(IntegerCodec::<i32>::default()) as Arc<dyn Codec<i32>>);
        let codec = NullableCodec::new(Arc::new(inner) as Arc<dyn Codec<Option<i32>>>);
        let outer = encode_to_bson(&codec, &None).unwrap();
        assert_eq!(outer, Bson::Document(doc! { "_csharpnull" => true }));
        assert_eq!(decode_from_bson(&codec, outer).unwrap(), None);
        let inner_none = encode_to_bson(&codec, &Some(None)).unwrap();
        assert_eq!(inner_none, Bson::Null);
        assert_eq!(decode_from_bson(&codec, inner_none).unwrap(), Some(None));
    }

    #[test]
    fn other_documents_reach_the_inner_codec() {
        let stored = Bson::Document(doc! { "_csharpnull" => true, "x" => 1i32 });
        assert_eq!(
            decode_from_bson(&optional_bson(), stored.clone()).unwrap(),
            Some(stored)
        );
    }
}
