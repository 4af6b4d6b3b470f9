//! Legacy GUID byte layouts and the compatibility mode that governs them.
//!
//! A GUID is persisted as 16 bytes plus a binary sub-type: 4 for the standard
//! RFC 4122 layout, 3 for every legacy layout. The legacy layouts differ only
//! in how the 16 bytes are permuted:
//!
//! | representation  | layout relative to RFC 4122 order      |
//! |-----------------|----------------------------------------|
//! | `Standard`      | unchanged                              |
//! | `CSharpLegacy`  | bytes 0..4, 4..6 and 6..8 reversed     |
//! | `JavaLegacy`    | bytes 0..8 and 8..16 reversed          |
//! | `PythonLegacy`  | unchanged                              |
//!
//! Each permutation is its own inverse.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bson::BinarySubtype;
use crate::error::{CodecError, Result};

/// Which byte layout a GUID is stored with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidRepresentation {
    #[default]
    Unspecified,
    Standard,
    CSharpLegacy,
    JavaLegacy,
    PythonLegacy,
}

impl GuidRepresentation {
    /// Binary sub-type this layout is tagged with.
    pub fn subtype(self) -> Option<BinarySubtype> {
        match self {
            GuidRepresentation::Unspecified => None,
            GuidRepresentation::Standard => Some(BinarySubtype::Uuid),
            GuidRepresentation::CSharpLegacy
            | GuidRepresentation::JavaLegacy
            | GuidRepresentation::PythonLegacy => Some(BinarySubtype::UuidLegacy),
        }
    }
}

/// Compatibility era for GUID handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "era", rename_all = "lowercase")]
pub enum GuidMode {
    /// An unspecified per-codec representation falls back to `default_representation`.
    V2 {
        default_representation: GuidRepresentation,
    },
    /// An unspecified representation is an error.
    #[default]
    V3,
}

impl GuidMode {
    /// The representation a codec configured with `requested` actually uses.
    pub fn effective(self, requested: GuidRepresentation) -> GuidRepresentation {
        match (requested, self) {
            (GuidRepresentation::Unspecified, GuidMode::V2 { default_representation }) => {
                default_representation
            }
            (requested, _) => requested,
        }
    }
}

/// Lays out a GUID's bytes for storage.
pub fn to_bytes(guid: &Uuid, representation: GuidRepresentation) -> Result<[u8; 16]> {
    let standard = *guid.as_bytes();
    match representation {
        GuidRepresentation::Unspecified => Err(unspecified("serialize")),
        GuidRepresentation::Standard | GuidRepresentation::PythonLegacy => Ok(standard),
        GuidRepresentation::CSharpLegacy => Ok(guid.to_bytes_le()),
        GuidRepresentation::JavaLegacy => Ok(java_swap(standard)),
    }
}

/// Inverse of [`to_bytes`].
pub fn from_bytes(bytes: &[u8], representation: GuidRepresentation) -> Result<Uuid> {
    let bytes: [u8; 16] = bytes.try_into().map_err(|_| {
        CodecError::format(format!("expected 16 bytes for a Guid, found {}", bytes.len()))
    })?;
    match representation {
        GuidRepresentation::Unspecified => Err(unspecified("deserialize")),
        GuidRepresentation::Standard | GuidRepresentation::PythonLegacy => {
            Ok(Uuid::from_bytes(bytes))
        }
        GuidRepresentation::CSharpLegacy => Ok(Uuid::from_bytes_le(bytes)),
        GuidRepresentation::JavaLegacy => Ok(Uuid::from_bytes(java_swap(bytes))),
    }
}

fn java_swap(mut bytes: [u8; 16]) -> [u8; 16] {
    bytes[0..8].reverse();
    bytes[8..16].reverse();
    bytes
}

fn unspecified(action: &str) -> CodecError {
    CodecError::serialization(format!(
        "cannot {action} a Guid when GuidRepresentation is Unspecified"
    ))
}

static GLOBAL_MODE: RwLock<GuidMode> = RwLock::new(GuidMode::V3);

/// Process-wide GUID mode, for callers that cannot thread a [`GuidMode`] through.
///
/// Codecs never read this themselves; it is only consulted when settings are
/// built with [`RegistrySettings::with_global_guid_mode`](crate::RegistrySettings::with_global_guid_mode).
pub fn global_mode() -> GuidMode {
    match GLOBAL_MODE.read() {
        Ok(mode) => *mode,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Replaces the process-wide mode, returning the previous one.
pub fn set_global_mode(mode: GuidMode) -> GuidMode {
    let mut guard = match GLOBAL_MODE.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *guard, mode)
}

/// Sets the process-wide mode and restores the previous value on drop.
#[must_use = "the previous mode is restored when the guard is dropped"]
pub struct GuidModeGuard {
    previous: GuidMode,
}

impl GuidModeGuard {
    pub fn set(mode: GuidMode) -> Self {
        GuidModeGuard {
            previous: set_global_mode(mode),
        }
    }
}

impl Drop for GuidModeGuard {
    fn drop(&mut self) {
        set_global_mode(self.previous);
    }
}
