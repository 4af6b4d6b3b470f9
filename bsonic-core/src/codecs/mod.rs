//! Codecs for scalars, enums, collections, maps, tuples and optional values.
//!
//! Every codec is immutable once built. Codecs with a configurable physical
//! form implement [`RepresentationConfigurable`](crate::RepresentationConfigurable).

mod binary;
mod boolean;
mod bson_value;
mod collection;
mod datetime;
mod dictionary;
mod enumeration;
mod float;
mod guid;
mod integer;
mod nullable;
mod text;
mod time_of_day;
mod timespan;
mod tuple;

pub use binary::{BitSetCodec, ByteString, BytesCodec};
pub use boolean::BooleanCodec;
pub use bson_value::{BsonValueCodec, DocumentCodec};
pub use collection::CollectionCodec;
pub use datetime::DateTimeCodec;
pub use dictionary::DictionaryCodec;
pub use enumeration::{EnumCodec, EnumType};
pub use float::{DecimalCodec, FloatCodec, FloatTarget};
pub use guid::GuidCodec;
pub use integer::IntegerCodec;
pub use nullable::{is_null_marker, NullableCodec, LEGACY_NULL_MARKER, NULL_MARKER};
pub use text::{CharCodec, StringCodec};
pub use time_of_day::TimeOfDayCodec;
pub use timespan::TimeSpanCodec;
pub use tuple::{TupleCodec, TupleShape};
