//! Errors raised by the core primitives themselves.

use thiserror::Error;

/// Failure to parse or accept an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The textual form could not be parsed.
    #[error("invalid {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

impl IdError {
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}
