//! Error types for the bridge and its configuration.

use sysbridge_host::{Exception, Value};
use thiserror::Error;

/// Errors raised synchronously by the bridge operations.
///
/// Every variant is raised before any state is changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Wrong number or shape of arguments.
    #[error("{0}")]
    Argument(String),

    /// An argument has the wrong type.
    #[error("{0}")]
    Type(String),

    /// The operation is not valid in the channel's current state.
    #[error("{0}")]
    State(String),

    /// Memory or threads could not be obtained.
    #[error("{0}")]
    Resource(String),
}

impl BridgeError {
    /// Stable machine-readable code, exposed as the exception's `code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Argument(_) => "ERR_ARGUMENT",
            Self::Type(_) => "ERR_TYPE",
            Self::State(_) => "ERR_STATE",
            Self::Resource(_) => "ERR_RESOURCE",
        }
    }

    /// Build the host exception object for this error.
    #[must_use]
    pub fn to_exception(&self) -> Value {
        let message = self.to_string();
        let exception = match self {
            Self::Type(_) => Exception::type_error(&message),
            Self::Argument(_) | Self::State(_) | Self::Resource(_) => Exception::error(&message),
        };
        if let Some(object) = exception.as_object() {
            object.set("code", self.code());
        }
        exception
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while loading bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema.
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// Path of the file, or `<inline>`.
        path: String,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid value for {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_errors_become_type_error_exceptions() {
        let exception = BridgeError::Type("bad".into()).to_exception();
        let object = exception.as_object().unwrap();
        assert_eq!(object.get("name").as_str(), Some("TypeError"));
        assert_eq!(object.get("message").as_str(), Some("bad"));
        assert_eq!(object.get("code").as_str(), Some("ERR_TYPE"));
    }

    #[test]
    fn other_kinds_become_plain_errors_with_codes() {
        for (error, code) in [
            (BridgeError::Argument("a".into()), "ERR_ARGUMENT"),
            (BridgeError::State("s".into()), "ERR_STATE"),
            (BridgeError::Resource("r".into()), "ERR_RESOURCE"),
        ] {
            let exception = error.to_exception();
            let object = exception.as_object().unwrap();
            assert_eq!(object.get("name").as_str(), Some("Error"));
            assert_eq!(object.get("code").as_str(), Some(code));
        }
    }
}
