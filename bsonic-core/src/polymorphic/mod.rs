//! Dynamic values and the discriminator resolver.
//!
//! A slot whose declared ([`NominalType`]) type does not pin down the actual
//! type of its value stores a discriminator next to the value. Resolving a
//! discriminator back to a type goes through a [`DiscriminatorRegistry`]
//! and is bounded by an [`AllowList`].

mod allow_list;
mod discriminator;
mod dynamic;
mod object;
mod types;
mod value;

pub use allow_list::{AllowList, AllowPolicy};
pub use discriminator::{DiscriminatorRegistry, TypeRegistration, DISCRIMINATOR_FIELD, VALUE_FIELD};
pub use dynamic::{DynamicScalar, ValueAdapter};
pub use object::ObjectCodec;
pub use types::{BuiltinType, CollectionKind, NominalType, TypeName, BUILTIN_NAMESPACE};
pub use value::{Record, Value};
