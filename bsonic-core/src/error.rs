use std::fmt;

use crate::bson::BsonType;

/// Result alias used throughout the crate.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Coarse classification callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value does not fit the target representation.
    Overflow,
    /// The physical encoding does not match what was requested.
    Format,
    /// A value or type is structurally unrepresentable or rejected.
    Serialization,
    /// An invalid configuration or lookup argument.
    Argument,
}

/// Which way a value was travelling when an allow-list rejected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Serialize,
    Deserialize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Serialize => f.write_str("serialized"),
            Direction::Deserialize => f.write_str("deserialized"),
        }
    }
}

/// Error type for encode and decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("overflow: {0}")]
    Overflow(String),
    #[error("truncation: {0}")]
    Truncation(String),
    #[error("format error: {0}")]
    Format(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("type {type_name} is not allowed to be {direction}")]
    Disallowed {
        type_name: String,
        direction: Direction,
    },
    #[error("invalid argument `{parameter}`: {message}")]
    Argument {
        parameter: &'static str,
        message: String,
    },
    #[error("field `{field}`: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    pub fn overflow(message: impl Into<String>) -> Self {
        CodecError::Overflow(message.into())
    }

    pub fn truncation(message: impl Into<String>) -> Self {
        CodecError::Truncation(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        CodecError::Format(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        CodecError::Serialization(message.into())
    }

    pub fn argument(parameter: &'static str, message: impl Into<String>) -> Self {
        CodecError::Argument {
            parameter,
            message: message.into(),
        }
    }

    /// Format error for a physical type the decoder cannot accept.
    pub fn unexpected_type(target: &str, actual: BsonType) -> Self {
        CodecError::Format(format!("cannot decode {target} from BsonType {actual}"))
    }

    /// Wraps the error with the name of the field (or array index) it occurred in.
    pub fn in_field(self, field: impl fmt::Display) -> Self {
        CodecError::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }

    /// Classifies the error, looking through field context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Overflow(_) | CodecError::Truncation(_) => ErrorKind::Overflow,
            CodecError::Format(_) => ErrorKind::Format,
            CodecError::Serialization(_) | CodecError::Disallowed { .. } => {
                ErrorKind::Serialization
            }
            CodecError::Argument { .. } => ErrorKind::Argument,
            CodecError::Field { source, .. } => source.kind(),
        }
    }

    /// The innermost error, without field context.
    pub fn root(&self) -> &CodecError {
        match self {
            CodecError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Dotted path of the fields the error passed through, outermost first.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let CodecError::Field { field, source } = current {
            path.push(field.as_str());
            current = source;
        }
        path
    }
}
