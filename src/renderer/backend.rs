//! Renderer collaborator contract

use std::rc::Rc;

use crate::assets::Asset;

/// What the asset manager needs from a renderer.
///
/// The manager calls `destroy_asset` as the first phase of every teardown,
/// before the entry leaves the registry, and from
/// `AssetManager::destroy_all_gpu_assets`.
pub trait RenderBackend {
    /// Create the GPU resource for `asset` and install it in its
    /// [`GpuData`](crate::assets::GpuData) slot
    fn upload_asset(&self, asset: &dyn Asset);

    /// Release the GPU resource of `asset`.
    ///
    /// Must be a no-op for assets that never had one.
    fn destroy_asset(&self, asset: Rc<dyn Asset>);
}
