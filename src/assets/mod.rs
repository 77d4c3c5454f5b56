//! Asset ownership and lifetime management
//!
//! Provides:
//! - The [`Asset`] / [`GpuAsset`] capability pair
//! - Counted, typed asset handles
//! - The [`AssetManager`] registry that owns every asset

mod asset;
mod handle;
mod manager;

pub use asset::{AsAny, Asset, AssetView, GpuAsset, GpuData};
pub use handle::AssetHandle;
pub use manager::{AssetContext, AssetManager, ManagerState};
