//! Asset manager configuration
//!
//! Supports loading and saving in RON and JSON, like scenes do.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{AssetError, Result};

/// What `create_asset` does when the key is already registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Fail with [`AssetError::DuplicateKey`] and leave the old entry alone
    #[default]
    Reject,
    /// Tear the old entry down (GPU first, then registry) and insert the new one
    Replace,
}

/// Asset manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManagerConfig {
    /// Duplicate key handling for `create_asset`
    pub duplicate_policy: DuplicatePolicy,
    /// Number of registry slots to reserve up front
    pub initial_capacity: usize,
    /// Warn about entries still referenced by handles when teardown drains them
    pub warn_on_leaked_handles: bool,
}

impl Default for AssetManagerConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            initial_capacity: 64,
            warn_on_leaked_handles: true,
        }
    }
}

impl AssetManagerConfig {
    /// Set the duplicate key policy
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set the registry pre-allocation
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Enable or disable leaked handle warnings at teardown
    #[must_use]
    pub fn with_leak_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_leaked_handles = enabled;
        self
    }

    /// Parse a config from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| AssetError::Config(e.to_string()))
    }

    /// Parse a config from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| AssetError::Config(e.to_string()))
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| AssetError::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| AssetError::Io(e.to_string()))
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AssetError::Io(e.to_string()))?;
        Self::from_ron(&text)
    }

    /// Save the config to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| AssetError::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| AssetError::Io(e.to_string()))
    }

    /// Load a config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AssetError::Io(e.to_string()))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssetManagerConfig::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.warn_on_leaked_handles);
    }

    #[test]
    fn test_builder() {
        let config = AssetManagerConfig::default()
            .with_duplicate_policy(DuplicatePolicy::Replace)
            .with_initial_capacity(8)
            .with_leak_warnings(false);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.initial_capacity, 8);
        assert!(!config.warn_on_leaked_handles);
    }

    #[test]
    fn test_ron_partial_uses_defaults() {
        let config = AssetManagerConfig::from_ron("(duplicate_policy: Replace)").unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = AssetManagerConfig::default().with_initial_capacity(3);
        let text =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(AssetManagerConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AssetManagerConfig::default().with_duplicate_policy(DuplicatePolicy::Replace);
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(AssetManagerConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        let err = AssetManagerConfig::from_ron("(duplicate_policy: Sometimes)").unwrap_err();
        assert!(matches!(err, AssetError::Config(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("asset_config_{}.ron", std::process::id()));
        let config = AssetManagerConfig::default().with_leak_warnings(false);
        config.save_ron(&path).unwrap();
        let loaded = AssetManagerConfig::load_ron(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
