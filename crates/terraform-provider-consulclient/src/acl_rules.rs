//! The two encodings of ACL rules.
//!
//! Configurations written as a map are sent to Consul as a JSON document
//! and decoded back into a map on read. Configurations written as a string
//! are sent and stored verbatim. The shape held in state picks the encoding,
//! so a read never flips a resource from one encoding to the other.

use crate::error::{ProviderError, Result};
use serde_json::{Map, Value};

/// ACL rules in one of the two supported encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclRules {
    /// Rules as a map, JSON-encoded on the wire.
    Json(Map<String, Value>),
    /// Rules as an opaque string, sent byte for byte.
    Raw(String),
}

impl Default for AclRules {
    fn default() -> Self {
        Self::Json(Map::new())
    }
}

impl AclRules {
    /// Interpret the `rules` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rules`] for values that are neither a map
    /// nor a string.
    pub fn from_state(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self::Json(map.clone())),
            Some(Value::String(raw)) => Ok(Self::Raw(raw.clone())),
            Some(other) => Err(ProviderError::Rules(format!(
                "expected a map or a string, got {other}"
            ))),
        }
    }

    /// Rules as sent to Consul.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rules`] if the map cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::Json(map) => {
                serde_json::to_string(map).map_err(|e| ProviderError::Rules(e.to_string()))
            }
            Self::Raw(raw) => Ok(raw.clone()),
        }
    }

    /// Decode rules read from Consul into the same encoding as `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rules`] if map-encoded rules come back as
    /// anything other than a JSON object.
    pub fn decode_like(&self, wire: &str) -> Result<Self> {
        match self {
            Self::Raw(_) => Ok(Self::Raw(wire.to_string())),
            Self::Json(_) if wire.trim().is_empty() => Ok(Self::default()),
            Self::Json(_) => match serde_json::from_str::<Value>(wire) {
                Ok(Value::Object(map)) => Ok(Self::Json(map)),
                Ok(other) => Err(ProviderError::Rules(format!(
                    "expected a JSON object, got {other}"
                ))),
                Err(e) => Err(ProviderError::Rules(e.to_string())),
            },
        }
    }

    /// Value for the `rules` attribute.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Json(map) => Value::Object(map.clone()),
            Self::Raw(raw) => Value::String(raw.clone()),
        }
    }
}
