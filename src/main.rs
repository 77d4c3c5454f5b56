//! Headless demo of the asset lifetime core
//!
//! Registers a few assets, shares and converts handles, simulates a device
//! loss and finally lets the manager drain whatever is left.
//!
//! Set `ASSET_CONFIG` to a RON file to override the manager config.

use std::rc::Rc;

use asset_core::assets::AsAny;
use asset_core::prelude::*;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex with position and normal
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// A triangle mesh
struct Mesh {
    vertices: Vec<Vertex>,
    gpu: GpuData,
}

impl Mesh {
    fn triangle() -> Self {
        let normal = Vec3::Z;
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(0.0, 0.5, 0.0), normal),
                Vertex::new(Vec3::new(-0.5, -0.5, 0.0), normal),
                Vertex::new(Vec3::new(0.5, -0.5, 0.0), normal),
            ],
            gpu: GpuData::new(),
        }
    }
}

impl Asset for Mesh {
    fn gpu_data(&self) -> &GpuData {
        &self.gpu
    }
}

/// A flat-colored RGBA texture
struct Texture {
    pixels: Vec<[u8; 4]>,
    gpu: GpuData,
}

impl Texture {
    fn solid(size: usize, color: [u8; 4]) -> Self {
        Self {
            pixels: vec![color; size * size],
            gpu: GpuData::new(),
        }
    }
}

impl Asset for Texture {
    fn gpu_data(&self) -> &GpuData {
        &self.gpu
    }
}

/// Stand-in for a device buffer
struct GpuBuffer {
    label: &'static str,
    bytes: Vec<u8>,
}

impl GpuAsset for GpuBuffer {
    fn label(&self) -> &str {
        self.label
    }
}

/// Copies asset data into "device" buffers
struct DemoRenderer;

impl RenderBackend for DemoRenderer {
    fn upload_asset(&self, asset: &dyn Asset) {
        let any = asset.as_any();
        let buffer = if let Some(mesh) = any.downcast_ref::<Mesh>() {
            GpuBuffer {
                label: "vertex buffer",
                bytes: bytemuck::cast_slice(&mesh.vertices).to_vec(),
            }
        } else if let Some(texture) = any.downcast_ref::<Texture>() {
            GpuBuffer {
                label: "texture",
                bytes: bytemuck::cast_slice(&texture.pixels).to_vec(),
            }
        } else {
            log::warn!("No upload path for {}", asset.asset_type_name());
            return;
        };

        log::info!("Uploaded {} ({} bytes)", buffer.label, buffer.bytes.len());
        asset.gpu_data().set(Box::new(buffer));
    }

    fn destroy_asset(&self, asset: Rc<dyn Asset>) {
        if let Some(resource) = asset.gpu_data().take() {
            log::info!("Freed {} of {}", resource.label(), asset.asset_type_name());
        }
    }
}

fn load_config() -> Result<AssetManagerConfig, AssetError> {
    match std::env::var("ASSET_CONFIG") {
        Ok(path) => AssetManagerConfig::load_ron(path),
        Err(_) => Ok(AssetManagerConfig::default()),
    }
}

fn run() -> Result<(), AssetError> {
    let renderer = Rc::new(DemoRenderer);
    let manager = AssetManager::with_config(load_config()?);
    manager.initialize(renderer.clone())?;

    let mesh = manager.create_asset("meshes/triangle", Mesh::triangle())?;
    renderer.upload_asset(mesh.get());

    let shared = mesh.clone();
    log::info!("Triangle has {} handles", shared.use_count());

    let erased: AssetHandle<dyn Asset> = shared.erase();
    let back = erased.cast::<Mesh>()?;
    log::info!(
        "Round trip kept identity: {}, handles: {}",
        back == mesh,
        mesh.use_count()
    );

    let red = Texture::solid(4, [255, 0, 0, 255]);
    let blue = Texture::solid(4, [0, 0, 255, 255]);
    let texture = manager.create_if_not_exists("textures/red", red)?;
    let again = manager.create_if_not_exists("textures/red", blue)?;
    renderer.upload_asset(texture.get());
    log::info!("Second create kept the first texture: {}", texture == again);

    if let Err(e) = manager.get_asset::<Mesh>("meshes/missing") {
        log::info!("Lookup failed as expected: {e}");
    }
    if let Err(e) = manager.get_asset::<Texture>("meshes/triangle") {
        log::info!("Cast failed as expected: {e}");
    }

    // Device loss: everything goes back to the CPU, then comes back.
    manager.destroy_all_gpu_assets()?;
    let restored = manager.restore_gpu_assets()?;
    log::info!("Restored {restored} GPU resources");

    drop((shared, erased, back));
    drop(mesh);
    log::info!(
        "Triangle registered after dropping every handle: {}",
        manager.contains("meshes/triangle")
    );

    // `texture` and `again` are still alive; dropping the manager drains them.
    log::info!("{} asset(s) left before teardown", manager.len());
    drop(manager);
    log::info!("Texture live after teardown: {}", texture.is_live());

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("Asset demo failed: {e}");
        std::process::exit(1);
    }
}
