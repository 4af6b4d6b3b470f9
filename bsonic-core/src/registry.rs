use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use uuid::Uuid;

use crate::codec::{BsonCodable, Codec};
use crate::codecs::ByteString;
use crate::config::RegistrySettings;
use crate::decimal::Decimal128;
use crate::error::{CodecError, Result};
use crate::polymorphic::{
    BuiltinType, DiscriminatorRegistry, DynamicScalar, NominalType, ObjectCodec, Value, ValueAdapter,
};
use crate::representation::CodecOptions;
use crate::time::DateTime;

type CacheKey = (TypeId, CodecOptions);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Builds codecs on first use and hands out one canonical instance per
/// `(type, options)` pair.
///
/// Construction happens outside the lock, so two threads asking for the
/// same codec at once may both build one; the first to be stored wins and
/// both callers receive it.
pub struct CodecRegistry {
    settings: RegistrySettings,
    discriminators: Arc<DiscriminatorRegistry>,
    codecs: RwLock<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
    objects: RwLock<HashMap<NominalType, Arc<ObjectCodec>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        CodecRegistry::build(RegistrySettings::default(), DiscriminatorRegistry::new())
    }

    /// A registry whose discriminators are the types listed in `settings`.
    pub fn with_settings(settings: RegistrySettings) -> Result<Self> {
        CodecRegistry::with_discriminators(settings, DiscriminatorRegistry::new())
    }

    /// A registry using `discriminators` plus the types listed in `settings`.
    pub fn with_discriminators(
        settings: RegistrySettings,
        mut discriminators: DiscriminatorRegistry,
    ) -> Result<Self> {
        settings.register_types(&mut discriminators)?;
        Ok(CodecRegistry::build(settings, discriminators))
    }

    fn build(settings: RegistrySettings, discriminators: DiscriminatorRegistry) -> Self {
        CodecRegistry {
            settings,
            discriminators: Arc::new(discriminators),
            codecs: RwLock::new(HashMap::new()),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn discriminators(&self) -> &Arc<DiscriminatorRegistry> {
        &self.discriminators
    }

    /// The codec for `T` configured with `options`.
    pub fn get_codec<T: BsonCodable>(&self, options: &CodecOptions) -> Result<Arc<T::Codec>> {
        self.cached(TypeId::of::<T>(), options, || T::build_codec(self, options))
    }

    /// The codec for dynamic values in slots declared as `nominal`.
    pub fn get_object_codec(&self, nominal: &NominalType) -> Result<Arc<ObjectCodec>> {
        if let Some(codec) = read(&self.objects).get(nominal) {
            return Ok(Arc::clone(codec));
        }
        let built = Arc::new(ObjectCodec::new(
            nominal.clone(),
            Arc::clone(&self.discriminators),
            self.settings.allowed_types.clone(),
            self.settings.guid_mode,
        )?);
        debug!("built object codec for {nominal}");
        let mut objects = write(&self.objects);
        Ok(Arc::clone(objects.entry(nominal.clone()).or_insert(built)))
    }

    /// The codec for a call site that only knows its nominal type at runtime.
    ///
    /// Slots declared as a built-in scalar go through that scalar's codec
    /// configured with `options`; everything else gets an [`ObjectCodec`].
    pub fn get_dynamic_codec(
        &self,
        nominal: &NominalType,
        options: &CodecOptions,
    ) -> Result<Arc<dyn Codec<Value>>> {
        let builtin = match nominal {
            NominalType::Type(name) => BuiltinType::from_type_name(name),
            NominalType::Any => None,
        };
        match builtin {
            Some(BuiltinType::Boolean) => self.value_adapter::<bool>(options),
            Some(BuiltinType::Int32) => self.value_adapter::<i32>(options),
            Some(BuiltinType::Int64) => self.value_adapter::<i64>(options),
            Some(BuiltinType::Double) => self.value_adapter::<f64>(options),
            Some(BuiltinType::Decimal128) => self.value_adapter::<Decimal128>(options),
            Some(BuiltinType::String) => self.value_adapter::<String>(options),
            Some(BuiltinType::DateTime) => self.value_adapter::<DateTime>(options),
            Some(BuiltinType::Guid) => self.value_adapter::<Uuid>(options),
            Some(BuiltinType::Binary) => self.value_adapter::<ByteString>(options),
            _ => {
                let codec: Arc<dyn Codec<Value>> = self.get_object_codec(nominal)?;
                Ok(codec)
            }
        }
    }

    fn value_adapter<T: DynamicScalar>(&self, options: &CodecOptions) -> Result<Arc<dyn Codec<Value>>> {
        let adapter = self.cached(TypeId::of::<ValueAdapter<T>>(), options, || {
            let inner: Arc<dyn Codec<T>> = self.get_codec::<T>(options)?;
            Ok(ValueAdapter::new(inner))
        })?;
        let codec: Arc<dyn Codec<Value>> = adapter;
        Ok(codec)
    }

    fn cached<C, F>(&self, type_id: TypeId, options: &CodecOptions, build: F) -> Result<Arc<C>>
    where
        C: Send + Sync + 'static,
        F: FnOnce() -> Result<C>,
    {
        let key = (type_id, options.clone());
        if let Some(found) = read(&self.codecs).get(&key) {
            return downcast(Arc::clone(found));
        }
        let built: Arc<dyn Any + Send + Sync> = Arc::new(build()?);
        debug!("built {} for {options:?}", type_name::<C>());
        let mut codecs = write(&self.codecs);
        let canonical = Arc::clone(codecs.entry(key).or_insert(built));
        drop(codecs);
        downcast(canonical)
    }
}

fn downcast<C: Send + Sync + 'static>(codec: Arc<dyn Any + Send + Sync>) -> Result<Arc<C>> {
    codec.downcast::<C>().map_err(|_| {
        CodecError::argument(
            "codec",
            format!("cached codec is not a {}", type_name::<C>()),
        )
    })
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("settings", &self.settings)
            .field("discriminators", &self.discriminators)
            .field("cached", &read(&self.codecs).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Bson;
    use crate::codec::{decode_from_bson, encode_to_bson};
    use crate::error::ErrorKind;
    use crate::polymorphic::TypeName;
    use crate::representation::Representation;

    #[test]
    fn equal_options_share_one_instance() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::String);
        let a = registry.get_codec::<i64>(&options).unwrap();
        let b = registry.get_codec::<i64>(&options).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = registry.get_codec::<i64>(&CodecOptions::default()).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn element_codecs_come_from_the_cache() {
        let registry = CodecRegistry::new();
        let list = registry.get_codec::<Vec<i32>>(&CodecOptions::default()).unwrap();
        let element = registry.get_codec::<i32>(&CodecOptions::default()).unwrap();
        let element: Arc<dyn Codec<i32>> = element;
        assert!(Arc::ptr_eq(list.element_codec(), &element));
    }

    #[test]
    fn invalid_options_are_not_cached() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::Binary);
        let err = registry.get_codec::<String>(&options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(read(&registry.codecs).len(), 0);
    }

    #[test]
    fn dynamic_scalar_slots_honour_options() {
        let registry = CodecRegistry::new();
        let options = CodecOptions::new().with_representation(Representation::String);
        let nominal = NominalType::builtin(BuiltinType::Int64);
        let codec = registry.get_dynamic_codec(&nominal, &options).unwrap();
        let encoded = encode_to_bson(codec.as_ref(), &Value::Int64(7)).unwrap();
        assert_eq!(encoded, Bson::String("7".into()));
        assert!(Arc::ptr_eq(&codec, &registry.get_dynamic_codec(&nominal, &options).unwrap()));
    }

    #[test]
    fn other_slots_get_object_codecs() {
        let registry = CodecRegistry::new();
        let codec = registry
            .get_dynamic_codec(&NominalType::Any, &CodecOptions::default())
            .unwrap();
        let value = decode_from_bson(codec.as_ref(), Bson::Int32(3)).unwrap();
        assert_eq!(value, Value::Int32(3));
        let object = registry.get_object_codec(&NominalType::Any).unwrap();
        assert!(Arc::ptr_eq(&object, &registry.get_object_codec(&NominalType::Any).unwrap()));
        let typed = registry
            .get_object_codec(&NominalType::of(TypeName::new("app", "Cat")))
            .unwrap();
        assert!(!Arc::ptr_eq(&object, &typed));
    }
}
