//! Rendering module
//!
//! The asset core does not render anything itself. It talks to a renderer
//! through [`RenderBackend`]; [`HeadlessRenderer`] is a device-less
//! implementation.

mod backend;
mod headless;

pub use backend::RenderBackend;
pub use headless::{HeadlessGpuAsset, HeadlessRenderer, RendererStats};
