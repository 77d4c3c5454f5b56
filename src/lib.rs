//! Asset ownership and lifetime core of a real-time engine
//!
//! This crate provides:
//! - Hashed asset keys
//! - Counted, typed asset handles
//! - A registry that owns every asset and tears it down together with its
//!   GPU resource
//!
//! Everything here is single-threaded: handles and the manager are `!Send`.

pub mod assets;
pub mod core;
pub mod renderer;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{Asset, AssetContext, AssetHandle, AssetManager, GpuAsset, GpuData};
    pub use crate::core::{AssetError, AssetManagerConfig, DuplicatePolicy, Key};
    pub use crate::renderer::{HeadlessRenderer, RenderBackend};
}
