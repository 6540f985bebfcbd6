//! Identifier newtypes with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for identifier types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated member identifier.
    ///
    /// Member IDs are opaque stable identifiers assigned by the chat
    /// platform (e.g., a Discord snowflake rendered as a string). They
    /// must be non-empty; uniqueness is scoped per community at the
    /// storage level.
    MemberId, "member ID"
);

define_string_id!(
    /// A validated community identifier.
    ///
    /// Communities namespace member registrations (e.g., a server or
    /// guild ID). Must be non-empty.
    CommunityId, "community ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_rejects_empty() {
        assert!(MemberId::new("").is_err());
        assert!(MemberId::new("123456").is_ok());
    }

    #[test]
    fn community_id_rejects_empty() {
        assert!(CommunityId::new("").is_err());
        assert!(CommunityId::new("guild-1").is_ok());
    }

    #[test]
    fn member_id_serde_roundtrip() {
        let id = MemberId::new("member-42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"member-42\"");
        let parsed: MemberId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn member_id_serde_rejects_empty() {
        let result: Result<MemberId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn member_id_as_ref() {
        let id = MemberId::new("m-1").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "m-1");
    }

    #[test]
    fn member_ids_order_lexicographically() {
        let a = MemberId::new("alice").unwrap();
        let b = MemberId::new("bob").unwrap();
        assert!(a < b);
    }
}
