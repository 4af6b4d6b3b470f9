use std::collections::{BTreeSet, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::collections::{SequenceAdapter, Stack};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, CodecOptions, LogicalType, Representation};

/// Sequences as arrays, element by element.
///
/// Elements are written in the collection's own enumeration order and the
/// collection is rebuilt through its factory, so a [`Stack`] comes back as
/// the same stack rather than as a list in insertion order.
pub struct CollectionCodec<C: SequenceAdapter> {
    element: Arc<dyn Codec<C::Item>>,
    factory: fn(Vec<C::Item>) -> C,
}

impl<C: SequenceAdapter> CollectionCodec<C> {
    pub fn new(element: Arc<dyn Codec<C::Item>>) -> Self {
        CollectionCodec {
            element,
            factory: C::rebuild,
        }
    }

    /// Builds decoded collections with `factory` instead of [`SequenceAdapter::rebuild`].
    pub fn with_factory(element: Arc<dyn Codec<C::Item>>, factory: fn(Vec<C::Item>) -> C) -> Self {
        CollectionCodec { element, factory }
    }

    pub fn element_codec(&self) -> &Arc<dyn Codec<C::Item>> {
        &self.element
    }
}

impl<C: SequenceAdapter> Clone for CollectionCodec<C> {
    fn clone(&self) -> Self {
        CollectionCodec {
            element: Arc::clone(&self.element),
            factory: self.factory,
        }
    }
}

impl<C: SequenceAdapter> fmt::Debug for CollectionCodec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionCodec")
            .field("type", &std::any::type_name::<C>())
            .field("element", &self.element)
            .finish()
    }
}

impl<C: SequenceAdapter> RepresentationConfigurable for CollectionCodec<C> {
    fn representation(&self) -> Representation {
        Representation::Array
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        catalog::resolve(LogicalType::Collection, representation)?;
        Ok(Arc::clone(self))
    }
}

impl<C: SequenceAdapter> Codec<C> for CollectionCodec<C> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &C) -> Result<()> {
        writer.write_start_array()?;
        for (index, item) in value.elements().enumerate() {
            self.element
                .encode(writer, item)
                .map_err(|e| e.in_field(index))?;
        }
        writer.write_end_array()
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<C> {
        match reader.current_bson_type()? {
            BsonType::Array => {}
            other => return Err(CodecError::unexpected_type(std::any::type_name::<C>(), other)),
        }
        reader.read_start_array()?;
        let mut items = Vec::new();
        while reader.read_bson_type()? != BsonType::EndOfDocument {
            let item = self
                .element
                .decode(reader)
                .map_err(|e| e.in_field(items.len()))?;
            items.push(item);
        }
        reader.read_end_array()?;
        Ok((self.factory)(items))
    }
}

/// `Array` is the collection's own representation; every other option is
/// passed through to the element codec.
fn build_collection<C>(registry: &CodecRegistry, options: &CodecOptions) -> Result<CollectionCodec<C>>
where
    C: SequenceAdapter,
    C::Item: BsonCodable,
{
    let element = registry.get_codec::<C::Item>(&options.for_elements_of(LogicalType::Collection))?;
    Ok(CollectionCodec::new(element))
}

macro_rules! collection_codable {
    ($($collection:ident $(: $($bound:path),+)?);* $(;)?) => {$(
        impl<T> BsonCodable for $collection<T>
        where
            T: BsonCodable $($(+ $bound)+)?,
        {
            type Codec = CollectionCodec<$collection<T>>;

            fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
                build_collection(registry, options)
            }
        }
    )*};
}

collection_codable! {
    Vec;
    VecDeque;
    LinkedList;
    Stack;
    HashSet: Eq, Hash;
    BTreeSet: Ord;
}

impl<T: BsonCodable> BsonCodable for Box<[T]> {
    type Codec = CollectionCodec<Box<[T]>>;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
        build_collection(registry, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Bson;
    use crate::codec::{decode_from_bson, encode_to_bson};
    use crate::codecs::IntegerCodec;
    use crate::convert::NumericConverter;
    use crate::error::ErrorKind;

    fn ints<C: SequenceAdapter<Item = i32>>() -> CollectionCodec<C> {
        CollectionCodec::new(Arc::new(IntegerCodec::<i32>::default()))
    }

    #[test]
    fn stack_keeps_lifo_order() {
        let codec = ints::<Stack<i32>>();
        let mut stack = Stack::new();
        stack.push(1);
        stack.push(2);
        let encoded = encode_to_bson(&codec, &stack).unwrap();
        assert_eq!(encoded, Bson::Array(vec![Bson::Int32(2), Bson::Int32(1)]));
        let mut decoded = decode_from_bson(&codec, encoded).unwrap();
        assert_eq!(decoded.pop(), Some(2));
        assert_eq!(decoded.pop(), Some(1));
    }

    #[test]
    fn queue_and_list_keep_insertion_order() {
        let queue: VecDeque<i32> = [3, 4, 5].into_iter().collect();
        let codec = ints::<VecDeque<i32>>();
        let encoded = encode_to_bson(&codec, &queue).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Int32(3), Bson::Int32(4), Bson::Int32(5)])
        );
        assert_eq!(decode_from_bson(&codec, encoded.clone()).unwrap(), queue);

        let list = decode_from_bson(&ints::<LinkedList<i32>>(), encoded).unwrap();
        assert_eq!(list.into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn sets_round_trip() {
        let set: BTreeSet<i32> = [9, 1, 5].into_iter().collect();
        let codec = ints::<BTreeSet<i32>>();
        let encoded = encode_to_bson(&codec, &set).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Int32(1), Bson::Int32(5), Bson::Int32(9)])
        );
        assert_eq!(decode_from_bson(&codec, encoded).unwrap(), set);
    }

    #[test]
    fn explicit_factory_drives_construction() {
        let codec: CollectionCodec<Vec<i32>> =
            CollectionCodec::with_factory(Arc::new(IntegerCodec::<i32>::default()), |mut items| {
                items.sort_unstable();
                items
            });
        let bson = Bson::Array(vec![Bson::Int32(3), Bson::Int32(1), Bson::Int32(2)]);
        assert_eq!(decode_from_bson(&codec, bson).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn element_errors_carry_their_index() {
        let element = IntegerCodec::<u8>::new(Representation::Int32, NumericConverter::STRICT).unwrap();
        let codec: CollectionCodec<Vec<u8>> = CollectionCodec::new(Arc::new(element));
        let bson = Bson::Array(vec![Bson::Int32(1), Bson::Int32(300)]);
        let err = decode_from_bson(&codec, bson).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(err.path(), vec!["1"]);
    }

    #[test]
    fn array_representation_applies_to_the_collection() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::Array);
        let codec = registry.get_codec::<Vec<i32>>(&options).unwrap();
        let encoded = encode_to_bson(codec.as_ref(), &vec![1, 2]).unwrap();
        assert_eq!(encoded, Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]));
        assert_eq!(decode_from_bson(codec.as_ref(), encoded).unwrap(), vec![1, 2]);

        let strings = CodecOptions::new().with_representation(Representation::String);
        let codec = registry.get_codec::<Vec<i32>>(&strings).unwrap();
        let encoded = encode_to_bson(codec.as_ref(), &vec![3]).unwrap();
        assert_eq!(encoded, Bson::Array(vec![Bson::String("3".into())]));
    }

    #[test]
    fn only_arrays_decode() {
        let err = decode_from_bson(&ints::<Vec<i32>>(), Bson::Int32(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        let codec = Arc::new(ints::<Vec<i32>>());
        assert!(Arc::ptr_eq(&codec, &codec.with_representation(Representation::Array).unwrap()));
        assert!(codec.with_representation(Representation::Document).is_err());
    }
}
