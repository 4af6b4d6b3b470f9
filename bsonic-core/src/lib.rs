//! Bsonic maps typed Rust values to and from BSON.
//!
//! Core concepts:
//! - **Representation**: the BSON type a value is stored as, chosen per field
//!   from a catalog of what each logical type can legally become
//! - **Codec**: encodes one Rust type through a [`BsonWriter`](io::BsonWriter)
//!   and decodes it back through a [`BsonReader`](io::BsonReader)
//! - **Converter**: the numeric engine deciding when a representation change
//!   overflows or truncates
//! - **Registry**: builds and caches one codec per `(type, options)` pair
//! - **Discriminator**: a type tag stored next to values whose actual type the
//!   declared type does not pin down, bounded by an allow-list
//!
//! # Example
//!
//! ```
//! use bsonic_core::{decode_field, encode_field, CodecOptions, CodecRegistry, Representation};
//!
//! let registry = CodecRegistry::new();
//! let options = CodecOptions::new().with_representation(Representation::String);
//! let codec = registry.get_codec::<i64>(&options).unwrap();
//!
//! let document = encode_field(codec.as_ref(), "count", &42i64).unwrap();
//! assert_eq!(document.get("count").and_then(|v| v.as_str()), Some("42"));
//! assert_eq!(decode_field(codec.as_ref(), "count", &document).unwrap(), 42);
//! ```

mod bits;
mod bson;
mod codec;
pub mod codecs;
mod collections;
mod config;
mod convert;
mod decimal;
mod error;
pub mod guid;
pub mod io;
pub mod polymorphic;
mod registry;
mod representation;
mod time;

pub use bits::BitSet;
pub use bson::{Binary, BinarySubtype, Bson, BsonType, Document, ObjectId};
pub use codec::{
    decode_field, decode_from_bson, encode_field, encode_to_bson, BsonCodable, Codec,
    RepresentationConfigurable,
};
pub use collections::{MapAdapter, SequenceAdapter, Stack};
pub use config::{load_config, Config, ConfigError, FieldMappings, RegistrySettings, TypeConfig};
pub use convert::{IntegerTarget, Numeric, NumericConverter};
pub use decimal::Decimal128;
pub use error::{CodecError, Direction, ErrorKind, Result};
pub use guid::{GuidMode, GuidModeGuard, GuidRepresentation};
pub use registry::CodecRegistry;
pub use representation::{
    catalog, CodecOptions, DictionaryRepresentation, IntegerWidth, LogicalType, Representation,
};
pub use time::{DateTime, DateTimeKind, TimeOfDay, TimeSpan, TimeUnit};

#[cfg(feature = "derive")]
pub use bsonic_derive::BsonEnum;
