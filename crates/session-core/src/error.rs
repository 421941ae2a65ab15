//! Error types for session registry operations

use thiserror::Error;

/// Errors raised by the session registry.
///
/// Lookups never fail: a missing session is reported as `None`, not as an
/// error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid argument: {0} must not be absent")]
    InvalidArgument(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
