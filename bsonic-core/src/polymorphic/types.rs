use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace of the types the framework itself knows about.
pub const BUILTIN_NAMESPACE: &str = "bsonic";

/// A namespace-qualified type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        TypeName::new(BUILTIN_NAMESPACE, name)
    }

    /// Parses `namespace.Name`, splitting at the last dot.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((namespace, name)) => TypeName::new(namespace, name),
            None => TypeName::new("", qualified),
        }
    }

    pub fn qualified(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.namespace == BUILTIN_NAMESPACE && BuiltinType::from_name(&self.name).is_some()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        f.write_str(&self.name)
    }
}

/// Sequence kinds a dynamic value can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Queue,
    Stack,
    Set,
    LinkedList,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        CollectionKind::List,
        CollectionKind::Queue,
        CollectionKind::Stack,
        CollectionKind::Set,
        CollectionKind::LinkedList,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::List => "List",
            CollectionKind::Queue => "Queue",
            CollectionKind::Stack => "Stack",
            CollectionKind::Set => "Set",
            CollectionKind::LinkedList => "LinkedList",
        }
    }
}

/// Types with a fixed meaning in every registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal128,
    String,
    DateTime,
    Guid,
    Binary,
    Document,
    Array,
    Collection(CollectionKind),
}

impl BuiltinType {
    const SCALARS: [BuiltinType; 11] = [
        BuiltinType::Boolean,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::Double,
        BuiltinType::Decimal128,
        BuiltinType::String,
        BuiltinType::DateTime,
        BuiltinType::Guid,
        BuiltinType::Binary,
        BuiltinType::Document,
        BuiltinType::Array,
    ];

    pub fn all() -> impl Iterator<Item = BuiltinType> {
        Self::SCALARS
            .into_iter()
            .chain(CollectionKind::ALL.into_iter().map(BuiltinType::Collection))
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Boolean => "Boolean",
            BuiltinType::Int32 => "Int32",
            BuiltinType::Int64 => "Int64",
            BuiltinType::Double => "Double",
            BuiltinType::Decimal128 => "Decimal128",
            BuiltinType::String => "String",
            BuiltinType::DateTime => "DateTime",
            BuiltinType::Guid => "Guid",
            BuiltinType::Binary => "Binary",
            BuiltinType::Document => "Document",
            BuiltinType::Array => "Array",
            BuiltinType::Collection(kind) => kind.name(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().find(|builtin| builtin.name() == name)
    }

    pub fn from_type_name(type_name: &TypeName) -> Option<Self> {
        if type_name.namespace == BUILTIN_NAMESPACE {
            Self::from_name(&type_name.name)
        } else {
            None
        }
    }

    pub fn type_name(self) -> TypeName {
        TypeName::builtin(self.name())
    }

    /// Whether values of this type read back as the same type without a discriminator.
    pub fn is_self_describing(self) -> bool {
        !matches!(self, BuiltinType::Collection(_))
    }
}

/// The statically declared type of a dynamic slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum NominalType {
    /// Any value at all.
    #[default]
    Any,
    Type(TypeName),
}

impl NominalType {
    pub fn of(type_name: TypeName) -> Self {
        NominalType::Type(type_name)
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        NominalType::Type(builtin.type_name())
    }
}

impl fmt::Display for NominalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NominalType::Any => f.write_str("any"),
            NominalType::Type(name) => name.fmt(f),
        }
    }
}
