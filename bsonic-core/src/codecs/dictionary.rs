use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::bson::{Bson, BsonType};
use crate::codec::{decode_from_bson, encode_to_bson, BsonCodable, Codec};
use crate::collections::MapAdapter;
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{CodecOptions, DictionaryRepresentation};

const KEY_FIELD: &str = "k";
const VALUE_FIELD: &str = "v";

/// Maps as a document keyed by the encoded key, or as an array of pairs.
///
/// The document layout only works when every key encodes to a string; any
/// other key fails the whole value before anything is written.
pub struct DictionaryCodec<M: MapAdapter> {
    layout: DictionaryRepresentation,
    key: Arc<dyn Codec<M::Key>>,
    value: Arc<dyn Codec<M::Value>>,
    factory: fn(Vec<(M::Key, M::Value)>) -> M,
}

impl<M: MapAdapter> DictionaryCodec<M> {
    pub fn new(
        layout: DictionaryRepresentation,
        key: Arc<dyn Codec<M::Key>>,
        value: Arc<dyn Codec<M::Value>>,
    ) -> Self {
        DictionaryCodec {
            layout,
            key,
            value,
            factory: M::rebuild,
        }
    }

    /// Builds decoded maps with `factory` instead of [`MapAdapter::rebuild`].
    pub fn with_factory(mut self, factory: fn(Vec<(M::Key, M::Value)>) -> M) -> Self {
        self.factory = factory;
        self
    }

    pub fn layout(&self) -> DictionaryRepresentation {
        self.layout
    }

    /// A codec writing `layout`; the same instance if nothing changes.
    pub fn with_layout(self: &Arc<Self>, layout: DictionaryRepresentation) -> Arc<Self> {
        if layout == self.layout {
            return Arc::clone(self);
        }
        Arc::new(DictionaryCodec {
            layout,
            key: Arc::clone(&self.key),
            value: Arc::clone(&self.value),
            factory: self.factory,
        })
    }

    fn key_name(&self, key: &M::Key) -> Result<String> {
        match encode_to_bson(self.key.as_ref(), key)? {
            Bson::String(name) => Ok(name),
            other => Err(CodecError::serialization(format!(
                "when using DictionaryRepresentation::Document key values must serialize as strings, found {}",
                other.bson_type()
            ))),
        }
    }

    fn encode_document(&self, writer: &mut dyn BsonWriter, map: &M) -> Result<()> {
        let names = map
            .entries()
            .map(|(key, _)| self.key_name(key))
            .collect::<Result<Vec<_>>>()?;
        writer.write_start_document()?;
        for (name, (_, value)) in names.iter().zip(map.entries()) {
            writer.write_name(name)?;
            self.value
                .encode(writer, value)
                .map_err(|e| e.in_field(name))?;
        }
        writer.write_end_document()
    }

    fn encode_pairs(&self, writer: &mut dyn BsonWriter, map: &M) -> Result<()> {
        writer.write_start_array()?;
        for (index, (key, value)) in map.entries().enumerate() {
            self.encode_pair(writer, key, value)
                .map_err(|e| e.in_field(index))?;
        }
        writer.write_end_array()
    }

    fn encode_pair(&self, writer: &mut dyn BsonWriter, key: &M::Key, value: &M::Value) -> Result<()> {
        if self.layout == DictionaryRepresentation::ArrayOfDocuments {
            writer.write_start_document()?;
            writer.write_name(KEY_FIELD)?;
            self.key.encode(writer, key)?;
            writer.write_name(VALUE_FIELD)?;
            self.value.encode(writer, value)?;
            return writer.write_end_document();
        }
        writer.write_start_array()?;
        self.key.encode(writer, key)?;
        self.value.encode(writer, value)?;
        writer.write_end_array()
    }

    fn decode_document(&self, reader: &mut dyn BsonReader) -> Result<Vec<(M::Key, M::Value)>> {
        let mut entries = Vec::new();
        reader.read_start_document()?;
        while reader.read_bson_type()? != BsonType::EndOfDocument {
            let name = reader.read_name()?;
            let key = decode_from_bson(self.key.as_ref(), Bson::String(name.clone()))
                .map_err(|e| e.in_field(&name))?;
            let value = self.value.decode(reader).map_err(|e| e.in_field(&name))?;
            entries.push((key, value));
        }
        reader.read_end_document()?;
        Ok(entries)
    }

    fn decode_pairs(&self, reader: &mut dyn BsonReader) -> Result<Vec<(M::Key, M::Value)>> {
        let mut entries = Vec::new();
        reader.read_start_array()?;
        while reader.read_bson_type()? != BsonType::EndOfDocument {
            let index = entries.len();
            let entry = match reader.current_bson_type()? {
                BsonType::Array => self.decode_array_pair(reader),
                BsonType::Document => self.decode_document_pair(reader),
                other => Err(CodecError::format(format!(
                    "expected a key-value pair, found BsonType {other}"
                ))),
            };
            entries.push(entry.map_err(|e| e.in_field(index))?);
        }
        reader.read_end_array()?;
        Ok(entries)
    }

    fn decode_array_pair(&self, reader: &mut dyn BsonReader) -> Result<(M::Key, M::Value)> {
        reader.read_start_array()?;
        let missing = || CodecError::format("a key-value array must have exactly two elements");
        if reader.read_bson_type()? == BsonType::EndOfDocument {
            return Err(missing());
        }
        let key = self.key.decode(reader)?;
        if reader.read_bson_type()? == BsonType::EndOfDocument {
            return Err(missing());
        }
        let value = self.value.decode(reader)?;
        if reader.read_bson_type()? != BsonType::EndOfDocument {
            return Err(missing());
        }
        reader.read_end_array()?;
        Ok((key, value))
    }

    fn decode_document_pair(&self, reader: &mut dyn BsonReader) -> Result<(M::Key, M::Value)> {
        reader.read_start_document()?;
        let mut key = None;
        let mut value = None;
        while reader.read_bson_type()? != BsonType::EndOfDocument {
            let name = reader.read_name()?;
            match name.as_str() {
                KEY_FIELD => key = Some(self.key.decode(reader).map_err(|e| e.in_field(KEY_FIELD))?),
                VALUE_FIELD => {
                    value = Some(self.value.decode(reader).map_err(|e| e.in_field(VALUE_FIELD))?)
                }
                _ => {
                    return Err(CodecError::format(format!(
                        "unexpected field `{name}` in a key-value document"
                    )));
                }
            }
        }
        reader.read_end_document()?;
        match (key, value) {
            (Some(key), Some(value)) => Ok((key, value)),
            _ => Err(CodecError::format(format!(
                "a key-value document requires `{KEY_FIELD}` and `{VALUE_FIELD}`"
            ))),
        }
    }
}

impl<M: MapAdapter> fmt::Debug for DictionaryCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryCodec")
            .field("type", &std::any::type_name::<M>())
            .field("layout", &self.layout)
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<M: MapAdapter> Codec<M> for DictionaryCodec<M> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &M) -> Result<()> {
        match self.layout {
            DictionaryRepresentation::Document => self.encode_document(writer, value),
            DictionaryRepresentation::ArrayOfArrays | DictionaryRepresentation::ArrayOfDocuments => {
                self.encode_pairs(writer, value)
            }
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<M> {
        let entries = match reader.current_bson_type()? {
            BsonType::Document => self.decode_document(reader)?,
            BsonType::Array => self.decode_pairs(reader)?,
            other => return Err(CodecError::unexpected_type(std::any::type_name::<M>(), other)),
        };
        Ok((self.factory)(entries))
    }
}

/// Keys use default options; values get the member's options.
fn build_dictionary<M>(registry: &CodecRegistry, options: &CodecOptions) -> Result<DictionaryCodec<M>>
where
    M: MapAdapter,
    M::Key: BsonCodable,
    M::Value: BsonCodable,
{
    let key = registry.get_codec::<M::Key>(&CodecOptions::default())?;
    let value = registry.get_codec::<M::Value>(&options.for_elements())?;
    Ok(DictionaryCodec::new(options.dictionary_representation, key, value))
}

impl<K, V> BsonCodable for HashMap<K, V>
where
    K: BsonCodable + Eq + Hash,
    V: BsonCodable,
{
    type Codec = DictionaryCodec<HashMap<K, V>>;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        build_dictionary(registry, options)
    }
}

impl<K, V> BsonCodable for BTreeMap<K, V>
where
    K: BsonCodable + Ord,
    V: BsonCodable,
{
    type Codec = DictionaryCodec<BTreeMap<K, V>>;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        build_dictionary(registry, options)
    }
}

impl<K, V> BsonCodable for IndexMap<K, V>
where
    K: BsonCodable + Eq + Hash,
    V: BsonCodable,
{
    type Codec = DictionaryCodec<IndexMap<K, V>>;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        build_dictionary(registry, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{IntegerCodec, StringCodec};
    use crate::doc;
    use crate::error::ErrorKind;

    fn by_name(layout: DictionaryRepresentation) -> DictionaryCodec<IndexMap<String, i32>> {
        DictionaryCodec::new(
            layout,
            Arc::new(StringCodec::default()),
            Arc::new(IntegerCodec::<i32>::default()),
        )
    }

    fn sample() -> IndexMap<String, i32> {
        [("b".to_string(), 2), ("a".to_string(), 1)].into_iter().collect()
    }

    #[test]
    fn string_keys_become_field_names() {
        let codec = by_name(DictionaryRepresentation::Document);
        let encoded = encode_to_bson(&codec, &sample()).unwrap();
        assert_eq!(encoded, Bson::Document(doc! { "b" => 2i32, "a" => 1i32 }));
        assert_eq!(decode_from_bson(&codec, encoded).unwrap(), sample());
    }

    #[test]
    fn non_string_keys_cannot_be_field_names() {
        let codec: DictionaryCodec<BTreeMap<i32, i32>> = DictionaryCodec::new(
            DictionaryRepresentation::Document,
            Arc::new(IntegerCodec::<i32>::default()),
            Arc::new(IntegerCodec::<i32>::default()),
        );
        let map: BTreeMap<i32, i32> = [(1, 10)].into_iter().collect();
        let err = encode_to_bson(&codec, &map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let pairs = Arc::new(codec).with_layout(DictionaryRepresentation::ArrayOfArrays);
        let encoded = encode_to_bson(pairs.as_ref(), &map).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Array(vec![Bson::Int32(1), Bson::Int32(10)])])
        );
        assert_eq!(decode_from_bson(pairs.as_ref(), encoded).unwrap(), map);
    }

    #[test]
    fn array_of_documents_layout() {
        let codec = by_name(DictionaryRepresentation::ArrayOfDocuments);
        let encoded = encode_to_bson(&codec, &sample()).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![
                Bson::Document(doc! { "k" => "b", "v" => 2i32 }),
                Bson::Document(doc! { "k" => "a", "v" => 1i32 }),
            ])
        );
        assert_eq!(decode_from_bson(&codec, encoded).unwrap(), sample());

        let reversed = Bson::Array(vec![Bson::Document(doc! { "v" => 5i32, "k" => "x" })]);
        let decoded = decode_from_bson(&codec, reversed).unwrap();
        assert_eq!(decoded.get("x"), Some(&5));
    }

    #[test]
    fn malformed_pairs_are_format_errors() {
        let codec = by_name(DictionaryRepresentation::ArrayOfArrays);
        let short = Bson::Array(vec![Bson::Array(vec![Bson::String("a".into())])]);
        assert_eq!(decode_from_bson(&codec, short).unwrap_err().kind(), ErrorKind::Format);
        let err = decode_from_bson(&codec, Bson::Int32(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn value_errors_name_the_key() {
        let codec = by_name(DictionaryRepresentation::Document);
        let bad = Bson::Document(doc! { "a" => "not a number" });
        let err = decode_from_bson(&codec, bad).unwrap_err();
        assert_eq!(err.path(), vec!["a"]);
    }

    #[test]
    fn layout_change_keeps_identity_when_unchanged() {
        let codec = Arc::new(by_name(DictionaryRepresentation::Document));
        assert!(Arc::ptr_eq(&codec, &codec.with_layout(DictionaryRepresentation::Document)));
        let other = codec.with_layout(DictionaryRepresentation::ArrayOfArrays);
        assert_eq!(other.layout(), DictionaryRepresentation::ArrayOfArrays);
    }
}
