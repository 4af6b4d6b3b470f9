use std::sync::Arc;

use indexmap::IndexMap;
use log::trace;

use super::allow_list::AllowList;
use super::discriminator::{DiscriminatorRegistry, DISCRIMINATOR_FIELD, VALUE_FIELD};
use super::types::{BuiltinType, NominalType, TypeName};
use super::value::{Record, Value};
use crate::bson::{Binary, BinarySubtype, Bson, Document};
use crate::codec::{decode_from_bson, BsonCodable, Codec};
use crate::codecs::{is_null_marker, ByteString, DateTimeCodec, GuidCodec};
use crate::error::{CodecError, Direction, Result};
use crate::guid::{GuidMode, GuidRepresentation};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{CodecOptions, Representation};

/// Codec for [`Value`]s in a slot of a given nominal type.
///
/// A value whose type the slot cannot recover from the data alone is
/// written as `{ _t: tag, _v: value }`. On decode the wrapper may list its
/// fields in either order; a document without a discriminator in an
/// untyped slot decodes structurally.
///
/// Discriminated types are checked against the allow list in the direction
/// of travel, and a rejected type is never replaced by another.
#[derive(Debug, Clone)]
pub struct ObjectCodec {
    nominal: NominalType,
    discriminators: Arc<DiscriminatorRegistry>,
    allow: AllowList,
    guid: GuidCodec,
    date_time: DateTimeCodec,
}

impl ObjectCodec {
    pub fn new(
        nominal: NominalType,
        discriminators: Arc<DiscriminatorRegistry>,
        allow: AllowList,
        guid_mode: GuidMode,
    ) -> Result<Self> {
        // untyped GUIDs default to the standard layout unless the legacy era supplies one
        let guid_representation = match guid_mode {
            GuidMode::V2 { .. } => GuidRepresentation::Unspecified,
            GuidMode::V3 => GuidRepresentation::Standard,
        };
        Ok(ObjectCodec {
            nominal,
            discriminators,
            allow,
            guid: GuidCodec::new(Representation::Binary, guid_representation, guid_mode)?,
            date_time: DateTimeCodec::default(),
        })
    }

    pub fn nominal(&self) -> &NominalType {
        &self.nominal
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// A codec for slots of `nominal`; the same instance if nothing changes.
    pub fn with_nominal(self: &Arc<Self>, nominal: NominalType) -> Arc<Self> {
        if nominal == self.nominal {
            return Arc::clone(self);
        }
        Arc::new(ObjectCodec {
            nominal,
            ..(**self).clone()
        })
    }

    fn needs_discriminator(&self, value: &Value, actual: &TypeName, nominal: &NominalType) -> bool {
        if self.discriminators.is_always_discriminated(actual) {
            return true;
        }
        match nominal {
            NominalType::Type(declared) => declared != actual,
            NominalType::Any => !value.builtin().is_some_and(BuiltinType::is_self_describing),
        }
    }

    fn encode_value(&self, writer: &mut dyn BsonWriter, value: &Value, nominal: &NominalType) -> Result<()> {
        let Some(actual) = value.type_name() else {
            return writer.write_null();
        };
        if !self.discriminators.is_assignable(&actual, nominal) {
            return Err(CodecError::serialization(format!(
                "a value of type {actual} cannot be stored as {nominal}"
            )));
        }
        if !self.needs_discriminator(value, &actual, nominal) {
            return self.encode_body(writer, value);
        }
        if !self.discriminators.is_known(&actual) {
            return Err(CodecError::serialization(format!(
                "type {actual} is not registered for discriminators"
            )));
        }
        self.allow.check(Direction::Serialize, &actual)?;
        let tag = self.discriminators.tag_for(&actual);
        trace!("writing discriminator '{tag}' for {actual}");
        writer.write_start_document()?;
        writer.write_name(DISCRIMINATOR_FIELD)?;
        writer.write_string(&tag)?;
        writer.write_name(VALUE_FIELD)?;
        self.encode_body(writer, value)
            .map_err(|e| e.in_field(VALUE_FIELD))?;
        writer.write_end_document()
    }

    fn encode_body(&self, writer: &mut dyn BsonWriter, value: &Value) -> Result<()> {
        match value {
            Value::Null => writer.write_null(),
            Value::Boolean(v) => writer.write_boolean(*v),
            Value::Int32(v) => writer.write_int32(*v),
            Value::Int64(v) => writer.write_int64(*v),
            Value::Double(v) => writer.write_double(*v),
            Value::Decimal128(v) => writer.write_decimal128(*v),
            Value::String(v) => writer.write_string(v),
            Value::DateTime(v) => self.date_time.encode(writer, v),
            Value::Guid(v) => writer.write_binary(&self.guid.to_binary(v)?),
            Value::Binary(v) => writer.write_binary(&Binary::generic(v.as_bytes())),
            Value::Array(items) | Value::Collection(_, items) => {
                writer.write_start_array()?;
                for (index, item) in items.iter().enumerate() {
                    self.encode_value(writer, item, &NominalType::Any)
                        .map_err(|e| e.in_field(index))?;
                }
                writer.write_end_array()
            }
            Value::Document(fields) => self.encode_fields(writer, fields),
            Value::Object(record) => self.encode_fields(writer, &record.fields),
        }
    }

    fn encode_fields(&self, writer: &mut dyn BsonWriter, fields: &IndexMap<String, Value>) -> Result<()> {
        if fields.contains_key(DISCRIMINATOR_FIELD) {
            return Err(CodecError::serialization(format!(
                "field `{DISCRIMINATOR_FIELD}` is reserved for discriminators"
            )));
        }
        writer.write_start_document()?;
        for (name, value) in fields {
            writer.write_name(name)?;
            self.encode_value(writer, value, &NominalType::Any)
                .map_err(|e| e.in_field(name))?;
        }
        writer.write_end_document()
    }

    fn decode_value(&self, bson: Bson, nominal: &NominalType) -> Result<Value> {
        let document = match bson {
            Bson::Null => return Ok(Value::Null),
            Bson::Document(document) => document,
            other => {
                return match nominal {
                    NominalType::Any => self.decode_natural(other),
                    NominalType::Type(declared) => self.decode_as(declared, other),
                };
            }
        };
        if is_null_marker(&document) {
            return Ok(Value::Null);
        }
        if document.contains_key(DISCRIMINATOR_FIELD) {
            let (tag, body) = unwrap_discriminated(document)?;
            let actual = self.discriminators.resolve(&tag, nominal)?;
            self.allow.check(Direction::Deserialize, &actual)?;
            return self
                .decode_as(&actual, body)
                .map_err(|e| e.in_field(VALUE_FIELD));
        }
        match nominal {
            NominalType::Any => self.decode_builtin(BuiltinType::Document, Bson::Document(document)),
            NominalType::Type(declared) => self.decode_as(declared, Bson::Document(document)),
        }
    }

    fn decode_natural(&self, bson: Bson) -> Result<Value> {
        let builtin = match &bson {
            Bson::Null => return Ok(Value::Null),
            Bson::Boolean(_) => BuiltinType::Boolean,
            Bson::Int32(_) => BuiltinType::Int32,
            Bson::Int64(_) => BuiltinType::Int64,
            Bson::Double(_) => BuiltinType::Double,
            Bson::Decimal128(_) => BuiltinType::Decimal128,
            Bson::String(_) | Bson::Symbol(_) | Bson::ObjectId(_) => BuiltinType::String,
            Bson::DateTime(_) => BuiltinType::DateTime,
            Bson::Binary(binary)
                if matches!(binary.subtype, BinarySubtype::Uuid | BinarySubtype::UuidLegacy) =>
            {
                BuiltinType::Guid
            }
            Bson::Binary(_) => BuiltinType::Binary,
            Bson::Document(_) => BuiltinType::Document,
            Bson::Array(_) => BuiltinType::Array,
        };
        self.decode_builtin(builtin, bson)
    }

    fn decode_as(&self, declared: &TypeName, bson: Bson) -> Result<Value> {
        if bson == Bson::Null {
            return Ok(Value::Null);
        }
        if let Some(builtin) = BuiltinType::from_type_name(declared) {
            return self.decode_builtin(builtin, bson);
        }
        if !self.discriminators.is_known(declared) {
            return Err(CodecError::serialization(format!(
                "type {declared} is not registered for discriminators"
            )));
        }
        match bson {
            Bson::Document(document) => Ok(Value::Object(Record {
                type_name: declared.clone(),
                fields: self.decode_fields(document)?,
            })),
            other => Err(CodecError::unexpected_type(&declared.qualified(), other.bson_type())),
        }
    }

    fn decode_builtin(&self, builtin: BuiltinType, bson: Bson) -> Result<Value> {
        Ok(match (builtin, bson) {
            (BuiltinType::Boolean, Bson::Boolean(v)) => Value::Boolean(v),
            (BuiltinType::Int32, Bson::Int32(v)) => Value::Int32(v),
            (BuiltinType::Int64, Bson::Int64(v)) => Value::Int64(v),
            (BuiltinType::Double, Bson::Double(v)) => Value::Double(v),
            (BuiltinType::Decimal128, Bson::Decimal128(v)) => Value::Decimal128(v),
            (BuiltinType::String, Bson::String(v) | Bson::Symbol(v)) => Value::String(v),
            (BuiltinType::String, Bson::ObjectId(id)) => Value::String(id.to_string()),
            (BuiltinType::DateTime, bson @ Bson::DateTime(_)) => {
                Value::DateTime(decode_from_bson(&self.date_time, bson)?)
            }
            (BuiltinType::Guid, Bson::Binary(binary)) => Value::Guid(self.guid.from_binary(&binary)?),
            (BuiltinType::Binary, Bson::Binary(binary)) => match binary.subtype {
                BinarySubtype::Generic | BinarySubtype::OldBinary => {
                    Value::Binary(ByteString(binary.bytes))
                }
                other => {
                    return Err(CodecError::format(format!(
                        "cannot decode a dynamic value from binary sub-type {}",
                        u8::from(other)
                    )));
                }
            },
            (BuiltinType::Document, Bson::Document(document)) => {
                Value::Document(self.decode_fields(document)?)
            }
            (BuiltinType::Array, Bson::Array(items)) => Value::Array(self.decode_items(items)?),
            (BuiltinType::Collection(kind), Bson::Array(items)) => {
                Value::Collection(kind, self.decode_items(items)?)
            }
            (builtin, other) => {
                return Err(CodecError::unexpected_type(builtin.name(), other.bson_type()));
            }
        })
    }

    fn decode_fields(&self, document: Document) -> Result<IndexMap<String, Value>> {
        document
            .into_iter()
            .map(|(name, bson)| {
                let value = self
                    .decode_value(bson, &NominalType::Any)
                    .map_err(|e| e.in_field(&name))?;
                Ok((name, value))
            })
            .collect()
    }

    fn decode_items(&self, items: Vec<Bson>) -> Result<Vec<Value>> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, bson)| {
                self.decode_value(bson, &NominalType::Any)
                    .map_err(|e| e.in_field(index))
            })
            .collect()
    }
}

fn unwrap_discriminated(mut document: Document) -> Result<(String, Bson)> {
    let tag = match document.remove(DISCRIMINATOR_FIELD) {
        Some(Bson::String(tag)) => tag,
        Some(other) => {
            return Err(CodecError::format(format!(
                "discriminator `{DISCRIMINATOR_FIELD}` must be a string, found {}",
                other.bson_type()
            )));
        }
        None => return Err(CodecError::format("missing discriminator")),
    };
    let body = document.remove(VALUE_FIELD).ok_or_else(|| {
        CodecError::format(format!(
            "discriminated value '{tag}' is missing its `{VALUE_FIELD}` field"
        ))
    })?;
    if let Some(extra) = document.keys().next() {
        return Err(CodecError::format(format!(
            "unexpected field `{extra}` next to discriminator '{tag}'"
        )));
    }
    Ok((tag, body))
}

impl Codec<Value> for ObjectCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Value) -> Result<()> {
        self.encode_value(writer, value, &self.nominal)
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Value> {
        let bson = reader.read_value()?;
        self.decode_value(bson, &self.nominal)
    }

    fn encodes_null(&self) -> bool {
        true
    }
}

impl BsonCodable for Value {
    type Codec = ObjectCodec;

    fn build_codec(registry: &CodecRegistry, _options: &CodecOptions) -> Result<ObjectCodec> {
        ObjectCodec::new(
            NominalType::Any,
            Arc::clone(registry.discriminators()),
            registry.settings().allowed_types.clone(),
            registry.settings().guid_mode,
        )
    }
}
