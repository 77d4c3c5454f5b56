//! Renderer without a device
//!
//! Useful for tools, servers and tests: GPU resources are plain markers
//! and every call is counted.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::backend::RenderBackend;
use crate::assets::{Asset, GpuAsset};

/// Marker resource installed by [`HeadlessRenderer`]
#[derive(Debug)]
pub struct HeadlessGpuAsset {
    label: String,
}

impl GpuAsset for HeadlessGpuAsset {
    fn label(&self) -> &str {
        &self.label
    }
}

/// Call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// `upload_asset` calls
    pub uploads: usize,
    /// `destroy_asset` calls
    pub destroys: usize,
    /// `destroy_asset` calls that actually released a resource
    pub released: usize,
}

/// A [`RenderBackend`] that never touches a GPU
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    stats: Cell<RendererStats>,
    destroyed: RefCell<Vec<&'static str>>,
}

impl HeadlessRenderer {
    /// Create a new headless renderer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> RendererStats {
        self.stats.get()
    }

    /// Type names of every asset passed to `destroy_asset`, in call order
    #[must_use]
    pub fn destroyed(&self) -> Vec<&'static str> {
        self.destroyed.borrow().clone()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn upload_asset(&self, asset: &dyn Asset) {
        let label = asset.asset_type_name().to_owned();
        asset.gpu_data().set(Box::new(HeadlessGpuAsset { label }));

        let mut stats = self.stats.get();
        stats.uploads += 1;
        self.stats.set(stats);
    }

    fn destroy_asset(&self, asset: Rc<dyn Asset>) {
        let mut stats = self.stats.get();
        stats.destroys += 1;
        if let Some(resource) = asset.gpu_data().take() {
            log::debug!("Released GPU resource {}", resource.label());
            stats.released += 1;
        }
        self.stats.set(stats);
        self.destroyed.borrow_mut().push(asset.asset_type_name());
    }
}
