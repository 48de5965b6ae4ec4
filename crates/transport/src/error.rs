//! Error types for transport construction.

use thiserror::Error;

/// Errors that can occur while building a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("ring capacity must be a power of two >= 2, got {0}")]
    InvalidCapacity(usize),
}
