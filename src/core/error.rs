//! Errors raised by the asset core

use thiserror::Error;

use super::key::Key;

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, AssetError>;

/// Every failure the asset registry and its handles can report.
///
/// All of them are local contract violations: nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("asset key not found: {0}")]
    NotFound(Key),

    #[error("asset key already registered: {0}")]
    DuplicateKey(Key),

    #[error("asset {key} is a {found}, not a {expected}")]
    TypeMismatch {
        key: Key,
        expected: &'static str,
        found: &'static str,
    },

    #[error("asset manager is not initialized")]
    NotInitialized,

    #[error("asset manager is already initialized")]
    AlreadyInitialized,

    #[error("asset manager has been shut down")]
    ShutDown,

    #[error("asset manager has been dropped")]
    ManagerDropped,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}
