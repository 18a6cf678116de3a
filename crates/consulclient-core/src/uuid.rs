//! Strongly-typed UUID wrappers for Consul objects.
//!
//! Prepared queries and sessions are addressed by UUIDs minted by the
//! servers; wrapping them keeps the two from being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Declares a UUID newtype with parsing, display and serde support.
macro_rules! uuid_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new UUID wrapper from a [`Uuid`].
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parses a UUID from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not a valid UUID.
            pub fn parse_str(input: &str) -> Result<Self> {
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|_| Error::InvalidUuid(input.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_type!(QueryId, "Prepared query UUID");
uuid_type!(SessionId, "Session UUID");

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "8f246b77-f3e1-ff88-5b48-8ec93abf3e05";

    #[test]
    fn test_query_id_roundtrip_display() {
        let id = QueryId::parse_str(VALID_UUID).unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
        let parsed: QueryId = VALID_UUID.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_query_id_invalid() {
        let err = QueryId::parse_str("geo-db").unwrap_err();
        assert!(matches!(err, Error::InvalidUuid(_)));
    }

    #[test]
    fn test_session_id_serde_transparent() {
        let id = SessionId::parse_str(VALID_UUID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VALID_UUID}\""));
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_ids_wrap_the_same_uuid_without_mixing_types() {
        let raw = Uuid::parse_str(VALID_UUID).unwrap();
        let query = QueryId::from(raw);
        let session = SessionId::new(raw);
        assert_eq!(query.as_uuid(), session.as_uuid());
    }
}
