//! TOML configuration for registries and per-field codec options.
//!
//! ```toml
//! [registry]
//! guid_mode = { era = "v2", default_representation = "c_sharp_legacy" }
//! allowed_types = { serialize = "all", deserialize = { types = ["app.Cat"] } }
//!
//! [[registry.types]]
//! name = "app.Cat"
//! implements = ["app.Animal"]
//!
//! [fields.price]
//! representation = "decimal128"
//! allow_truncation = true
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CodecError;
use crate::guid::{self, GuidMode};
use crate::polymorphic::{AllowList, DiscriminatorRegistry, TypeName, TypeRegistration};
use crate::representation::CodecOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid type registration: {0}")]
    Registration(#[from] CodecError),
}

/// A type the discriminator registry should know, by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeConfig {
    pub name: String,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub always_discriminated: bool,
}

impl TypeConfig {
    pub fn registration(&self) -> TypeRegistration {
        let registration = self
            .implements
            .iter()
            .fold(TypeRegistration::new(TypeName::parse(&self.name)), |r, family| {
                r.implements(TypeName::parse(family))
            });
        if self.always_discriminated {
            registration.always_discriminated()
        } else {
            registration
        }
    }
}

/// Settings captured by a [`CodecRegistry`](crate::CodecRegistry) when it is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    pub guid_mode: GuidMode,
    pub allowed_types: AllowList,
    pub types: Vec<TypeConfig>,
}

impl RegistrySettings {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Takes the GUID mode from the process-wide setting.
    pub fn with_global_guid_mode(mut self) -> Self {
        self.guid_mode = guid::global_mode();
        self
    }

    pub fn with_guid_mode(mut self, guid_mode: GuidMode) -> Self {
        self.guid_mode = guid_mode;
        self
    }

    pub fn with_allowed_types(mut self, allowed_types: AllowList) -> Self {
        self.allowed_types = allowed_types;
        self
    }

    /// Adds the configured types to `registry`.
    pub fn register_types(&self, registry: &mut DiscriminatorRegistry) -> crate::Result<()> {
        for config in &self.types {
            registry.register(config.registration())?;
        }
        Ok(())
    }
}

/// Codec options per field name, as supplied by the mapping layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMappings(IndexMap<String, CodecOptions>);

impl FieldMappings {
    pub fn new() -> Self {
        FieldMappings::default()
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn insert(&mut self, field: impl Into<String>, options: CodecOptions) -> Option<CodecOptions> {
        self.0.insert(field.into(), options)
    }

    /// Options for `field`, or the defaults when nothing is mapped.
    pub fn options_for(&self, field: &str) -> CodecOptions {
        self.0.get(field).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CodecOptions)> {
        self.0.iter().map(|(name, options)| (name.as_str(), options))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub registry: RegistrySettings,
    pub fields: FieldMappings,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}
