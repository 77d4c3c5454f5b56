//! Core types shared by the asset system
//!
//! Keys, configuration and errors

mod config;
mod error;
mod key;

pub use config::{AssetManagerConfig, DuplicatePolicy};
pub use error::{AssetError, Result};
pub use key::Key;
