//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors surfaced to the plugin host.
///
/// Consul failures are wrapped with a short message naming the operation,
/// the identifier and the datacenter involved. Nothing is retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A Consul call failed.
    #[error("{context}: {source}")]
    Consul {
        /// What was being attempted.
        context: String,
        /// The underlying client error.
        source: consulclient_core::Error,
    },

    /// Configuration does not satisfy the schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// An attribute could not be decoded into the expected shape.
    #[error("Failed to decode '{attribute}': {message}")]
    Decode {
        /// Attribute name.
        attribute: String,
        /// What went wrong.
        message: String,
    },

    /// The host asked for a resource or data source that is not registered.
    #[error("Unknown {kind} type '{name}'")]
    UnknownType {
        /// `resource` or `data source`.
        kind: &'static str,
        /// Requested type name.
        name: String,
    },

    /// An operation arrived before `configure`.
    #[error("Provider has not been configured")]
    NotConfigured,

    /// A key prefix to be claimed already holds keys.
    #[error("{count} keys already exist under {prefix}; delete them before managing this prefix with Terraform")]
    PrefixInUse {
        /// Number of keys found.
        count: usize,
        /// The prefix.
        prefix: String,
    },

    /// ACL rules are not valid JSON.
    #[error("Invalid ACL rules: {0}")]
    Rules(String),
}

impl ProviderError {
    /// Wrap a Consul error with context.
    pub fn consul(context: impl Into<String>, source: consulclient_core::Error) -> Self {
        Self::Consul {
            context: context.into(),
            source,
        }
    }

    /// Build a decode error for `attribute`.
    pub fn decode(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Whether the wrapped Consul error is a not-found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Consul { source, .. } if source.is_not_found())
    }
}

/// Attach context to Consul results.
pub trait ConsulResultExt<T> {
    /// Wrap the error, building the message lazily.
    fn context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ConsulResultExt<T> for consulclient_core::Result<T> {
    fn context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ProviderError::consul(f(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consulclient_core::Error;

    #[test]
    fn consul_error_keeps_context_and_source() {
        let result: consulclient_core::Result<()> =
            Err(Error::PermissionDenied("ACL not found".into()));
        let err = result
            .context(|| "Failed to read Consul ACL 'abc'".to_string())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to read Consul ACL 'abc': Permission denied: ACL not found"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_detected_through_wrapper() {
        let err = ProviderError::consul("read", Error::NotFound("gone".into()));
        assert!(err.is_not_found());
        assert!(!ProviderError::NotConfigured.is_not_found());
    }
}
