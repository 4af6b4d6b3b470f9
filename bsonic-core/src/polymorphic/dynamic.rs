use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::types::BuiltinType;
use super::value::Value;
use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec};
use crate::codecs::ByteString;
use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::time::DateTime;

/// A built-in scalar a dynamic slot can be narrowed to.
pub trait DynamicScalar: BsonCodable + Clone {
    const BUILTIN: BuiltinType;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! dynamic_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl DynamicScalar for $ty {
            const BUILTIN: BuiltinType = BuiltinType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    )*};
}

dynamic_scalar! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    Decimal128 => Decimal128,
    String => String,
    DateTime => DateTime,
    Uuid => Guid,
    ByteString => Binary,
}

/// Carries [`Value`]s through the configured codec of one built-in scalar,
/// so a dynamic slot declared as e.g. `Int64` honours its representation.
pub struct ValueAdapter<T> {
    inner: Arc<dyn Codec<T>>,
}

impl<T: DynamicScalar> ValueAdapter<T> {
    pub fn new(inner: Arc<dyn Codec<T>>) -> Self {
        ValueAdapter { inner }
    }
}

impl<T> fmt::Debug for ValueAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueAdapter")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: DynamicScalar> Codec<Value> for ValueAdapter<T> {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Value) -> Result<()> {
        match T::from_value(value) {
            Some(scalar) => self.inner.encode(writer, &scalar),
            None if value.is_null() => writer.write_null(),
            None => Err(CodecError::serialization(format!(
                "a value of type {} cannot be stored as {}",
                value
                    .type_name()
                    .map_or_else(|| "null".to_string(), |name| name.qualified()),
                T::BUILTIN.type_name()
            ))),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Value> {
        if reader.current_bson_type()? == BsonType::Null {
            reader.read_null()?;
            return Ok(Value::Null);
        }
        self.inner.decode(reader).map(T::into_value)
    }

    fn encodes_null(&self) -> bool {
        true
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
    use crate::representation::Representation;

    fn as_string() -> ValueAdapter<i64> {
        let inner = IntegerCodec::<i64>::new(Representation::String, NumericConverter::STRICT).unwrap();
        ValueAdapter::<i64>::new(Arc::new(inner))
    }

    #[test]
    fn narrowed_slots_use_the_scalar_representation() {
        let codec = as_string();
        let encoded = encode_to_bson(&codec, &Value::Int64(42)).unwrap();
        assert_eq!(encoded, Bson::String("42".into()));
        assert_eq!(decode_from_bson(&codec, encoded).unwrap(), Value::Int64(42));
        assert_eq!(decode_from_bson(&codec, Bson::Null).unwrap(), Value::Null);
    }

    #[test]
    fn other_variants_are_rejected() {
        let err = encode_to_bson(&as_string(), &Value::String("42".into())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
