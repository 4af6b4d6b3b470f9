use std::sync::Arc;

use uuid::Uuid;

use crate::bson::{Binary, BinarySubtype, BsonType};
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::error::{CodecError, Result};
use crate::guid::{self, GuidMode, GuidRepresentation};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};

/// GUIDs as 16 byte binaries tagged with sub-type 3 or 4, or as hyphenated text.
///
/// Which byte layout is used comes from the codec's [`GuidRepresentation`],
/// falling back to the mode's default in [`GuidMode::V2`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuidCodec {
    representation: Representation,
    guid_representation: GuidRepresentation,
    mode: GuidMode,
}

impl GuidCodec {
    pub fn new(
        representation: Representation,
        guid_representation: GuidRepresentation,
        mode: GuidMode,
    ) -> Result<Self> {
        Ok(GuidCodec {
            representation: catalog::resolve(LogicalType::Guid, representation)?,
            guid_representation,
            mode,
        })
    }

    /// A binary codec with an unspecified layout.
    pub fn with_mode(mode: GuidMode) -> Self {
        GuidCodec {
            representation: Representation::Binary,
            guid_representation: GuidRepresentation::Unspecified,
            mode,
        }
    }

    pub fn guid_representation(&self) -> GuidRepresentation {
        self.guid_representation
    }

    pub fn mode(&self) -> GuidMode {
        self.mode
    }

    /// A codec using `guid_representation`; the same instance if nothing changes.
    pub fn with_guid_representation(self: &Arc<Self>, guid_representation: GuidRepresentation) -> Arc<Self> {
        if guid_representation == self.guid_representation {
            return Arc::clone(self);
        }
        Arc::new(GuidCodec {
            guid_representation,
            ..(**self).clone()
        })
    }

    pub fn to_binary(&self, value: &Uuid) -> Result<Binary> {
        let effective = self.mode.effective(self.guid_representation);
        let bytes = guid::to_bytes(value, effective)?;
        let subtype = effective.subtype().unwrap_or(BinarySubtype::Uuid);
        Ok(Binary::new(subtype, bytes.to_vec()))
    }

    pub fn from_binary(&self, binary: &Binary) -> Result<Uuid> {
        if !matches!(binary.subtype, BinarySubtype::Uuid | BinarySubtype::UuidLegacy) {
            return Err(CodecError::format(format!(
                "expected binary sub-type 3 or 4 for a Guid, found {}",
                u8::from(binary.subtype)
            )));
        }
        if binary.bytes.len() != 16 {
            return Err(CodecError::format(format!(
                "expected 16 bytes for a Guid, found {}",
                binary.bytes.len()
            )));
        }
        let effective = match (self.guid_representation, self.mode) {
            (GuidRepresentation::Unspecified, GuidMode::V2 { .. })
                if binary.subtype == BinarySubtype::Uuid =>
            {
                GuidRepresentation::Standard
            }
            (requested, mode) => mode.effective(requested),
        };
        if let Some(expected) = effective.subtype() {
            if expected != binary.subtype {
                return Err(CodecError::format(format!(
                    "binary sub-type {} does not match GuidRepresentation {effective:?}",
                    u8::from(binary.subtype)
                )));
            }
        }
        guid::from_bytes(&binary.bytes, effective)
    }
}

impl Default for GuidCodec {
    fn default() -> Self {
        GuidCodec::with_mode(GuidMode::default())
    }
}

impl RepresentationConfigurable for GuidCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::Guid, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(GuidCodec {
            representation,
            ..(**self).clone()
        }))
    }
}

impl Codec<Uuid> for GuidCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &Uuid) -> Result<()> {
        match self.representation {
            Representation::Binary => writer.write_binary(&self.to_binary(value)?),
            Representation::String => writer.write_string(&value.hyphenated().to_string()),
            other => Err(unsupported(LogicalType::Guid, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<Uuid> {
        match reader.current_bson_type()? {
            BsonType::Binary => self.from_binary(&reader.read_binary()?),
            BsonType::String => {
                let text = reader.read_string()?;
                Uuid::parse_str(&text)
                    .map_err(|e| CodecError::format(format!("'{text}' is not a valid Guid: {e}")))
            }
            other => Err(CodecError::unexpected_type("Guid", other)),
        }
    }
}

impl BsonCodable for Uuid {
    type Codec = GuidCodec;

    fn build_codec(registry: &CodecRegistry, options: &CodecOptions) -> Result<GuidCodec> {
        GuidCodec::new(
            options.representation,
            options.guid_representation,
            registry.settings().guid_mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Bson;
    use crate::codec::{decode_from_bson, encode_to_bson};
    use crate::error::ErrorKind;

    fn sample() -> Uuid {
        Uuid::parse_str("01020304-0506-0708-090a-0b0c0d0e0f10").unwrap()
    }

    fn codec(guid_representation: GuidRepresentation, mode: GuidMode) -> GuidCodec {
        GuidCodec::new(Representation::Binary, guid_representation, mode).unwrap()
    }

    #[test]
    fn csharp_legacy_layout_uses_subtype_three() {
        let c = codec(GuidRepresentation::CSharpLegacy, GuidMode::V3);
        let encoded = encode_to_bson(&c, &sample()).unwrap();
        assert_eq!(
            encoded,
            Bson::Binary(Binary::new(
                BinarySubtype::UuidLegacy,
                vec![4, 3, 2, 1, 6, 5, 8, 7, 9, 10, 11, 12, 13, 14, 15, 16]
            ))
        );
        assert_eq!(decode_from_bson(&c, encoded).unwrap(), sample());
    }

    #[test]
    fn standard_layout_uses_subtype_four() {
        let c = codec(GuidRepresentation::Standard, GuidMode::V3);
        let encoded = encode_to_bson(&c, &sample()).unwrap();
        assert_eq!(
            encoded,
            Bson::Binary(Binary::new(BinarySubtype::Uuid, sample().as_bytes().to_vec()))
        );
        assert_eq!(decode_from_bson(&c, encoded).unwrap(), sample());
    }

    #[test]
    fn unspecified_in_v3_is_a_serialization_error() {
        let c = GuidCodec::default();
        let err = encode_to_bson(&c, &sample()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        let stored = Bson::Binary(Binary::new(BinarySubtype::Uuid, vec![0; 16]));
        let err = decode_from_bson(&c, stored).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn v2_reads_subtype_four_as_standard() {
        let mode = GuidMode::V2 {
            default_representation: GuidRepresentation::JavaLegacy,
        };
        let c = codec(GuidRepresentation::Unspecified, mode);
        let standard = Bson::Binary(Binary::new(BinarySubtype::Uuid, sample().as_bytes().to_vec()));
        assert_eq!(decode_from_bson(&c, standard).unwrap(), sample());

        let written = encode_to_bson(&c, &sample()).unwrap();
        assert_eq!(
            written,
            Bson::Binary(Binary::new(
                BinarySubtype::UuidLegacy,
                vec![8, 7, 6, 5, 4, 3, 2, 1, 16, 15, 14, 13, 12, 11, 10, 9]
            ))
        );
        assert_eq!(decode_from_bson(&c, written).unwrap(), sample());
    }

    #[test]
    fn mismatched_subtype_is_a_format_error() {
        let c = codec(GuidRepresentation::Standard, GuidMode::V3);
        let legacy = Bson::Binary(Binary::new(BinarySubtype::UuidLegacy, vec![0; 16]));
        assert_eq!(decode_from_bson(&c, legacy).unwrap_err().kind(), ErrorKind::Format);
        let generic = Bson::Binary(Binary::generic(vec![0; 16]));
        assert_eq!(decode_from_bson(&c, generic).unwrap_err().kind(), ErrorKind::Format);
        let short = Bson::Binary(Binary::new(BinarySubtype::Uuid, vec![0; 15]));
        assert_eq!(decode_from_bson(&c, short).unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn string_form_ignores_layout() {
        let c = GuidCodec::new(Representation::String, GuidRepresentation::Unspecified, GuidMode::V3)
            .unwrap();
        let encoded = encode_to_bson(&c, &sample()).unwrap();
        assert_eq!(encoded, Bson::String("01020304-0506-0708-090a-0b0c0d0e0f10".into()));
        assert_eq!(decode_from_bson(&c, encoded).unwrap(), sample());
    }

    #[test]
    fn reconfiguration_returns_same_instance_when_unchanged() {
        let c = Arc::new(codec(GuidRepresentation::Standard, GuidMode::V3));
        assert!(Arc::ptr_eq(&c, &c.with_guid_representation(GuidRepresentation::Standard)));
        let legacy = c.with_guid_representation(GuidRepresentation::PythonLegacy);
        assert!(!Arc::ptr_eq(&c, &legacy));
        assert_eq!(legacy.guid_representation(), GuidRepresentation::PythonLegacy);
        assert!(Arc::ptr_eq(&c, &c.with_representation(Representation::Binary).unwrap()));
    }
}
