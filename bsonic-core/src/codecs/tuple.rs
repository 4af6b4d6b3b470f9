use std::fmt;
use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, CodecOptions, LogicalType, Representation};

/// A tuple type with one codec per slot.
///
/// Implemented for tuples of one to eight elements. The eighth slot is the
/// rest slot and must itself be a tuple; it is written as a nested array.
pub trait TupleShape: Sized + Send + Sync + 'static {
    type Slots: Clone + fmt::Debug + Send + Sync;
    const ARITY: usize;

    fn build_slots(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Slots>;

    fn encode_slots(slots: &Self::Slots, writer: &mut dyn BsonWriter, value: &Self) -> Result<()>;

    /// Decodes every slot; the caller has already entered the array.
    fn decode_slots(slots: &Self::Slots, reader: &mut dyn BsonReader) -> Result<Self>;

    /// Whether both slot lists hold the same codec instances.
    fn same_slots(a: &Self::Slots, b: &Self::Slots) -> bool;
}

fn advance_to_slot(reader: &mut dyn BsonReader, index: usize, arity: usize) -> Result<()> {
    if reader.read_bson_type()? == BsonType::EndOfDocument {
        return Err(CodecError::format(format!(
            "expected {arity} tuple elements, found {index}"
        )));
    }
    Ok(())
}

macro_rules! tuple_shape {
    ($arity:literal => $($name:ident . $idx:tt),+ $(; rest $rest:ident)?) => {
        impl<$($name: BsonCodable),+> TupleShape for ($($name,)+)
        where
            ($($name,)+): Send $(, $rest: TupleShape)?
        {
            type Slots = ($(Arc<dyn Codec<$name>>,)+);
            const ARITY: usize = $arity;

            fn build_slots(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Slots> {
                let elements = options.for_elements_of(LogicalType::Tuple);
                Ok(($(registry.get_codec::<$name>(&elements)? as Arc<dyn Codec<$name>>,)+))
            }

            fn encode_slots(slots: &Self::Slots, writer: &mut dyn BsonWriter, value: &Self) -> Result<()> {
                $(
                    slots.$idx
                        .encode(writer, &value.$idx)
                        .map_err(|e| e.in_field($idx))?;
                )+
                Ok(())
            }

            fn decode_slots(slots: &Self::Slots, reader: &mut dyn BsonReader) -> Result<Self> {
                Ok(($(
                    {
                        advance_to_slot(reader, $idx, Self::ARITY)?;
                        slots.$idx.decode(reader).map_err(|e| e.in_field($idx))?
                    },
                )+))
            }

            fn same_slots(a: &Self::Slots, b: &Self::Slots) -> bool {
                true $(&& Arc::ptr_eq(&a.$idx, &b.$idx))+
            }
        }

        impl<$($name: BsonCodable),+> BsonCodable for ($($name,)+)
        where
            ($($name,)+): Send $(, $rest: TupleShape)?
        {
            type Codec = TupleCodec<Self>;

            fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<Self::Codec> {
                Ok(TupleCodec::new(Self::build_slots(registry, options)?))
            }
        }
    };
}

tuple_shape!(1 => A.0);
tuple_shape!(2 => A.0, B.1);
tuple_shape!(3 => A.0, B.1, C.2);
tuple_shape!(4 => A.0, B.1, C.2, D.3);
tuple_shape!(5 => A.0, B.1, C.2, D.3, E.4);
tuple_shape!(6 => A.0, B.1, C.2, D.3, E.4, F.5);
tuple_shape!(7 => A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple_shape!(8 => A.0, B.1, C.2, D.3, E.4, F.5, G.6, R.7; rest R);

/// Tuples as fixed-length arrays, one element per slot.
pub struct TupleCodec<T: TupleShape> {
    slots: T::Slots,
}

impl<T: TupleShape> TupleCodec<T> {
    pub fn new(slots: T::Slots) -> Self {
        TupleCodec { slots }
    }

    pub fn slots(&self) -> &T::Slots {
        &self.slots
    }
}

impl<T: TupleShape> Clone for TupleCodec<T> {
    fn clone(&self) -> Self {
        TupleCodec {
            slots: self.slots.clone(),
        }
    }
}

impl<T: TupleShape> PartialEq for TupleCodec<T> {
    fn eq(&self, other: &Self) -> bool {
        T::same_slots(&self.slots, &other.slots)
    }
}

impl<T: TupleShape> fmt::Debug for TupleCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleCodec")
            .field("arity", &T::ARITY)
            .field("slots", &self.slots)
            .finish()
    }
}

impl<T: TupleShape> RepresentationConfigurable for TupleCodec<T> {
    fn representation(&self) -> Representation {
        Representation::Array
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        catalog::resolve(LogicalType::Tuple, representation)?;
        Ok(Arc::clone(self))
    }
}

impl<T: TupleShape> Codec<T> for TupleCodec<T> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &T) -> Result<()> {
        writer.write_start_array()?;
        T::encode_slots(&self.slots, writer, value)?;
        writer.write_end_array()
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<T> {
        match reader.current_bson_type()? {
            BsonType::Array => {}
            other => return Err(CodecError::unexpected_type("tuple", other)),
        }
        reader.read_start_array()?;
        let value = T::decode_slots(&self.slots, reader)?;
        if reader.read_bson_type()? != BsonType::EndOfDocument {
            return Err(CodecError::format(format!(
                "expected {} tuple elements, found more",
                T::ARITY
            )));
        }
        reader.read_end_array()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Bson;
    use crate::codec::{decode_from_bson, encode_to_bson};
    use crate::codecs::{IntegerCodec, StringCodec};
    use crate::error::ErrorKind;

    fn pair() -> TupleCodec<(i32, String)> {
        TupleCodec::new((
            Arc::new(IntegerCodec::<i32>::default()) as Arc<dyn Codec<i32>>,
            Arc::new(StringCodec::default()) as Arc<dyn Codec<String>>,
        ))
    }

    #[test]
    fn slots_encode_in_order() {
        let value = (7, "seven".to_string());
        let encoded = encode_to_bson(&pair(), &value).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::Int32(7), Bson::String("seven".into())])
        );
        assert_eq!(decode_from_bson(&pair(), encoded).unwrap(), value);
    }

    #[test]
    fn arity_mismatch_is_a_format_error() {
        let short = Bson::Array(vec![Bson::Int32(1)]);
        assert_eq!(decode_from_bson(&pair(), short).unwrap_err().kind(), ErrorKind::Format);
        let long = Bson::Array(vec![
            Bson::Int32(1),
            Bson::String("a".into()),
            Bson::Int32(2),
        ]);
        assert_eq!(decode_from_bson(&pair(), long).unwrap_err().kind(), ErrorKind::Format);
        let err = decode_from_bson(&pair(), Bson::String("x".into())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn slot_errors_carry_their_index() {
        let bad = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]);
        let err = decode_from_bson(&pair(), bad).unwrap_err();
        assert_eq!(err.path(), vec!["1"]);
    }

    #[test]
    fn rest_slot_nests() {
        let registry = CodecRegistry::new();
        type Eight = (i32, i32, i32, i32, i32, i32, i32, (i32, String));
        let codec = registry.get_codec::<Eight>(&CodecOptions::default()).unwrap();
        let value: Eight = (1, 2, 3, 4, 5, 6, 7, (8, "h".to_string()));
        let encoded = encode_to_bson(codec.as_ref(), &value).unwrap();
        let mut expected: Vec<Bson> = (1..=7).map(Bson::Int32).collect();
        expected.push(Bson::Array(vec![Bson::Int32(8), Bson::String("h".into())]));
        assert_eq!(encoded, Bson::Array(expected));
        assert_eq!(decode_from_bson(codec.as_ref(), encoded).unwrap(), value);
    }

    #[test]
    fn array_representation_applies_to_the_tuple() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::Array);
        let codec = registry.get_codec::<(i32, i32)>(&options).unwrap();
        let encoded = encode_to_bson(codec.as_ref(), &(1, 2)).unwrap();
        assert_eq!(encoded, Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]));
        let default = registry.get_codec::<(i32, i32)>(&CodecOptions::default()).unwrap();
        assert_eq!(*codec, *default);
    }

    #[test]
    fn other_representations_reach_the_slots() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::String);
        let codec = registry.get_codec::<(i32, i64)>(&options).unwrap();
        let encoded = encode_to_bson(codec.as_ref(), &(1, 2)).unwrap();
        assert_eq!(
            encoded,
            Bson::Array(vec![Bson::String("1".into()), Bson::String("2".into())])
        );
        let options = CodecOptions::new().with_representation(Representation::Document);
        assert!(registry.get_codec::<(i32, i64)>(&options).is_err());
    }

    #[test]
    fn equality_compares_slot_instances() {
        let int: Arc<dyn Codec<i32>> = Arc::new(IntegerCodec::<i32>::default());
        let text: Arc<dyn Codec<String>> = Arc::new(StringCodec::default());
        let a: TupleCodec<(i32, String)> = TupleCodec::new((Arc::clone(&int), Arc::clone(&text)));
        let b: TupleCodec<(i32, String)> = TupleCodec::new((Arc::clone(&int), Arc::clone(&text)));
        assert_eq!(a, b);
        assert_ne!(a, pair());
    }
}
