use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Serialize};

use super::types::TypeName;
use crate::error::{CodecError, Direction, Result};

/// Which discriminated types one direction accepts.
///
/// Built-in types are always accepted; the policies differ in what they do
/// with application types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowPolicy {
    #[default]
    BuiltinOnly,
    /// Built-ins plus the listed qualified names.
    Types(BTreeSet<String>),
    All,
}

impl AllowPolicy {
    pub fn types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowPolicy::Types(names.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, type_name: &TypeName) -> bool {
        if type_name.is_builtin() {
            return true;
        }
        match self {
            AllowPolicy::BuiltinOnly => false,
            AllowPolicy::Types(names) => names.contains(&type_name.qualified()),
            AllowPolicy::All => true,
        }
    }
}

/// Separate policies for the two directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllowList {
    pub serialize: AllowPolicy,
    pub deserialize: AllowPolicy,
}

impl AllowList {
    pub fn new(serialize: AllowPolicy, deserialize: AllowPolicy) -> Self {
        AllowList {
            serialize,
            deserialize,
        }
    }

    /// The same policy both ways.
    pub fn symmetric(policy: AllowPolicy) -> Self {
        AllowList::new(policy.clone(), policy)
    }

    pub fn policy(&self, direction: Direction) -> &AllowPolicy {
        match direction {
            Direction::Serialize => &self.serialize,
            Direction::Deserialize => &self.deserialize,
        }
    }

    pub fn check(&self, direction: Direction, type_name: &TypeName) -> Result<()> {
        if self.policy(direction).allows(type_name) {
            return Ok(());
        }
        warn!("rejected type {type_name}: not allowed to be {direction}");
        Err(CodecError::Disallowed {
            type_name: type_name.qualified(),
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_accepts_builtins_only() {
        let allow = AllowList::default();
        assert!(allow.check(Direction::Deserialize, &TypeName::builtin("Stack")).is_ok());
        let err = allow
            .check(Direction::Deserialize, &TypeName::new("app", "Cat"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(matches!(err, CodecError::Disallowed { direction: Direction::Deserialize, .. }));
    }

    #[test]
    fn directions_are_independent() {
        let allow = AllowList::new(AllowPolicy::All, AllowPolicy::types(["app.Cat"]));
        let dog = TypeName::new("app", "Dog");
        assert!(allow.check(Direction::Serialize, &dog).is_ok());
        assert!(allow.check(Direction::Deserialize, &dog).is_err());
        assert!(allow.check(Direction::Deserialize, &TypeName::new("app", "Cat")).is_ok());
    }

    #[test]
    fn policies_read_from_toml() {
        let allow: AllowList = toml::from_str(
            r#"
            serialize = "all"
            deserialize = { types = ["app.Cat"] }
            "#,
        )
        .unwrap();
        assert_eq!(allow.serialize, AllowPolicy::All);
        assert_eq!(allow.deserialize, AllowPolicy::types(["app.Cat"]));
    }
}
