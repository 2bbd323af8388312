//! Error types for the topology engine
//!
//! [`TopoError`] separates three classes of failure:
//!
//! - **Invariant violations** ([`TopoError::InvariantViolation`]): programming errors
//!   such as an unbalanced transaction stack or a zero-impedance branch found in two
//!   networks that should have been merged. A caller receiving one should discard the
//!   network instance and rebuild it.
//! - **Input errors** ([`TopoError::UnknownElement`]): an id that does not resolve in this
//!   network. Usually recoverable; contingency resolution skips such elements.
//! - **Unsupported operations** ([`TopoError::UnsupportedAction`]): rejected when the
//!   action is built, before any transaction is opened.
//!
//! # Example
//!
//! ```
//! use lfnet_core::{TopoError, TopoResult};
//!
//! fn lookup(id: &str) -> TopoResult<usize> {
//!     Err(TopoError::unknown_branch(id))
//! }
//!
//! assert!(lookup("L1").is_err());
//! ```

use thiserror::Error;

/// Unified error type for topology operations.
#[derive(Error, Debug)]
pub enum TopoError {
    /// Internal consistency failure; the network should be discarded
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// An element id that does not exist in this network
    #[error("Unknown {kind} '{id}'")]
    UnknownElement { kind: &'static str, id: String },

    /// Action kind or target not supported by this network
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Action parameters out of range (e.g. tap position)
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Network construction errors (self-loops, duplicate ids, dangling buses)
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using TopoError.
pub type TopoResult<T> = Result<T, TopoError>;

impl TopoError {
    pub fn invariant(message: impl Into<String>) -> Self {
        TopoError::InvariantViolation(message.into())
    }

    pub fn unknown_bus(id: impl Into<String>) -> Self {
        TopoError::UnknownElement {
            kind: "bus",
            id: id.into(),
        }
    }

    pub fn unknown_branch(id: impl Into<String>) -> Self {
        TopoError::UnknownElement {
            kind: "branch",
            id: id.into(),
        }
    }

    /// True for the error class that requires rebuilding the network.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TopoError::InvariantViolation(_))
    }
}

impl From<anyhow::Error> for TopoError {
    fn from(err: anyhow::Error) -> Self {
        TopoError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for TopoError {
    fn from(err: serde_json::Error) -> Self {
        TopoError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for TopoError {
    fn from(err: toml::de::Error) -> Self {
        TopoError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TopoError::invariant("stack underflow");
        assert!(err.to_string().contains("Invariant violation"));
        assert!(err.to_string().contains("stack underflow"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_element_display() {
        let err = TopoError::unknown_branch("L12");
        assert_eq!(err.to_string(), "Unknown branch 'L12'");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TopoError = io_err.into();
        assert!(matches!(err, TopoError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> TopoResult<()> {
            Err(TopoError::InvalidNetwork("self-loop".into()))
        }

        fn outer() -> TopoResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
