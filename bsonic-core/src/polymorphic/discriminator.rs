use indexmap::IndexMap;
use log::trace;

use super::types::{BuiltinType, NominalType, TypeName};
use crate::error::{CodecError, Result};

/// Field holding the discriminator in a wrapper document.
pub const DISCRIMINATOR_FIELD: &str = "_t";
/// Field holding the wrapped value.
pub const VALUE_FIELD: &str = "_v";

/// An application type known to the discriminator registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRegistration {
    name: TypeName,
    families: Vec<TypeName>,
    always_discriminated: bool,
}

impl TypeRegistration {
    pub fn new(name: TypeName) -> Self {
        TypeRegistration {
            name,
            families: Vec::new(),
            always_discriminated: false,
        }
    }

    /// Declares that values of this type may sit in slots of `family`.
    pub fn implements(mut self, family: TypeName) -> Self {
        if !self.families.contains(&family) {
            self.families.push(family);
        }
        self
    }

    /// Writes the discriminator even where the nominal type already names this type.
    pub fn always_discriminated(mut self) -> Self {
        self.always_discriminated = true;
        self
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn families(&self) -> &[TypeName] {
        &self.families
    }
}

/// Maps types to discriminator tags and back.
///
/// Tags are bare type names unless another known type shares the bare
/// name, in which case the qualified name is written. Built-in types are
/// always known.
#[derive(Debug, Clone, Default)]
pub struct DiscriminatorRegistry {
    types: IndexMap<TypeName, TypeRegistration>,
}

impl DiscriminatorRegistry {
    pub fn new() -> Self {
        DiscriminatorRegistry::default()
    }

    pub fn register(&mut self, registration: TypeRegistration) -> Result<()> {
        if registration.name.is_builtin() || self.types.contains_key(&registration.name) {
            return Err(CodecError::argument(
                "registration",
                format!("type {} is already registered", registration.name),
            ));
        }
        self.types.insert(registration.name.clone(), registration);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, registration: TypeRegistration) -> Result<Self> {
        self.register(registration)?;
        Ok(self)
    }

    pub fn registration(&self, name: &TypeName) -> Option<&TypeRegistration> {
        self.types.get(name)
    }

    pub fn is_known(&self, name: &TypeName) -> bool {
        name.is_builtin() || self.types.contains_key(name)
    }

    pub fn is_always_discriminated(&self, name: &TypeName) -> bool {
        self.types
            .get(name)
            .is_some_and(|registration| registration.always_discriminated)
    }

    /// Whether a value of type `actual` may occupy a slot declared as `nominal`.
    pub fn is_assignable(&self, actual: &TypeName, nominal: &NominalType) -> bool {
        match nominal {
            NominalType::Any => true,
            NominalType::Type(nominal) => {
                actual == nominal
                    || self
                        .types
                        .get(actual)
                        .is_some_and(|registration| registration.families.contains(nominal))
            }
        }
    }

    fn known_names(&self) -> impl Iterator<Item = TypeName> + '_ {
        BuiltinType::all()
            .map(BuiltinType::type_name)
            .chain(self.types.keys().cloned())
    }

    /// The tag written for `name`.
    pub fn tag_for(&self, name: &TypeName) -> String {
        let sharing = self
            .known_names()
            .filter(|known| known.name == name.name)
            .count();
        if sharing > 1 {
            name.qualified()
        } else {
            name.name.clone()
        }
    }

    /// Resolves a tag read from data to a known type assignable to `nominal`.
    ///
    /// Qualified names win; a bare name must match exactly one candidate.
    pub fn resolve(&self, tag: &str, nominal: &NominalType) -> Result<TypeName> {
        let qualified = TypeName::parse(tag);
        if !qualified.namespace.is_empty() && self.is_known(&qualified) {
            if !self.is_assignable(&qualified, nominal) {
                return Err(CodecError::serialization(format!(
                    "discriminator '{tag}' names type {qualified}, which is not assignable to {nominal}"
                )));
            }
            trace!("resolved discriminator '{tag}' to {qualified}");
            return Ok(qualified);
        }

        let mut candidates = self
            .known_names()
            .filter(|known| known.name == tag && self.is_assignable(known, nominal));
        match (candidates.next(), candidates.next()) {
            (Some(found), None) => {
                trace!("resolved discriminator '{tag}' to {found}");
                Ok(found)
            }
            (Some(first), Some(second)) => Err(CodecError::serialization(format!(
                "discriminator '{tag}' is ambiguous between {first} and {second}"
            ))),
            (None, _) => Err(CodecError::serialization(format!(
                "unknown discriminator '{tag}' for {nominal}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn pets() -> DiscriminatorRegistry {
        let animal = TypeName::new("app", "Animal");
        DiscriminatorRegistry::new()
            .with(TypeRegistration::new(TypeName::new("app", "Cat")).implements(animal.clone()))
            .unwrap()
            .with(TypeRegistration::new(TypeName::new("zoo", "Cat")))
            .unwrap()
            .with(TypeRegistration::new(TypeName::new("app", "Dog")).implements(animal))
            .unwrap()
    }

    #[test]
    fn tags_are_bare_unless_ambiguous() {
        let registry = pets();
        assert_eq!(registry.tag_for(&TypeName::new("app", "Dog")), "Dog");
        assert_eq!(registry.tag_for(&TypeName::new("app", "Cat")), "app.Cat");
        assert_eq!(registry.tag_for(&TypeName::builtin("Int64")), "Int64");
    }

    #[test]
    fn bare_tags_are_narrowed_by_the_nominal_type() {
        let registry = pets();
        let animal = NominalType::of(TypeName::new("app", "Animal"));
        assert_eq!(registry.resolve("Cat", &animal).unwrap(), TypeName::new("app", "Cat"));
        let err = registry.resolve("Cat", &NominalType::Any).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert_eq!(
            registry.resolve("zoo.Cat", &NominalType::Any).unwrap(),
            TypeName::new("zoo", "Cat")
        );
    }

    #[test]
    fn unknown_and_unassignable_tags_fail() {
        let registry = pets();
        let animal = NominalType::of(TypeName::new("app", "Animal"));
        assert!(registry.resolve("Horse", &NominalType::Any).is_err());
        assert!(registry.resolve("zoo.Cat", &animal).is_err());
        assert!(registry.resolve("Int32", &animal).is_err());
        assert_eq!(
            registry.resolve("Stack", &NominalType::Any).unwrap(),
            TypeName::builtin("Stack")
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = pets();
        let err = registry
            .register(TypeRegistration::new(TypeName::new("app", "Dog")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(registry.register(TypeRegistration::new(TypeName::builtin("Int32"))).is_err());
    }
}
