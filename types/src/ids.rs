//! Opaque chat-platform identifiers.
//!
//! The chat service hands out numeric ids, but nothing in the gate does
//! arithmetic on them; they are carried around as their decimal rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the group a member asked to join.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

/// Identifier of the member requesting to join.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

macro_rules! opaque_id {
    ($name:ident) => {
        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(n.to_string())
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }
    };
}

opaque_id!(GroupId);
opaque_id!(MemberId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_render_as_decimal() {
        assert_eq!(GroupId::from(-1001234567890i64).as_str(), "-1001234567890");
        assert_eq!(MemberId::from(42u64).to_string(), "42");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&GroupId::from("G1")).unwrap();
        assert_eq!(json, "\"G1\"");
        let back: MemberId = serde_json::from_str("\"M1\"").unwrap();
        assert_eq!(back, MemberId::new("M1"));
    }
}
