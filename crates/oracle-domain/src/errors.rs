//! Domain errors

use thiserror::Error;

/// Domain-level errors raised while building or interpreting requests.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("malformed notify descriptor: {reason}")]
    MalformedNotify { reason: String },
}
