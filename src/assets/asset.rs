//! Asset capability traits
//!
//! An [`Asset`] is the CPU-side object the registry owns. It may own one
//! [`GpuAsset`], the renderer's resource for it, through a [`GpuData`] slot.

use std::any::{Any, type_name};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Upcasts to `Any`, implemented for every `'static` type.
///
/// Smart pointers are `'static` too, so `Box<dyn GpuAsset>` and
/// `Rc<dyn Asset>` get their own impl. Call `as_any` on the trait object
/// (`&dyn GpuAsset`, `&dyn Asset`), not on the pointer, or the result
/// describes the pointer instead of the resource.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A renderer-side resource paired with one asset.
///
/// The core never looks inside; renderers downcast through `as_any`.
pub trait GpuAsset: AsAny {
    /// Debug label
    fn label(&self) -> &str {
        ""
    }
}

/// Slot through which an asset owns zero or one GPU resource.
///
/// The renderer installs and releases the resource through a shared
/// reference. Dropping the slot drops the resource with it.
#[derive(Default)]
pub struct GpuData {
    slot: RefCell<Option<Box<dyn GpuAsset>>>,
}

impl GpuData {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a GPU resource, returning the one it replaces
    pub fn set(&self, resource: Box<dyn GpuAsset>) -> Option<Box<dyn GpuAsset>> {
        self.slot.replace(Some(resource))
    }

    /// Remove the GPU resource and hand it to the caller
    pub fn take(&self) -> Option<Box<dyn GpuAsset>> {
        self.slot.take()
    }

    /// Drop the GPU resource, if any
    pub fn reset(&self) {
        drop(self.take());
    }

    /// Whether a GPU resource is installed
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Run `f` against the installed resource.
    ///
    /// The slot stays borrowed while `f` runs: calling `set`, `take` or
    /// `reset` on the same slot from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(Option<&dyn GpuAsset>) -> R) -> R {
        let slot: Ref<'_, Option<Box<dyn GpuAsset>>> = self.slot.borrow();
        f(slot.as_deref())
    }
}

impl fmt::Debug for GpuData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|resource| match resource {
            Some(resource) => write!(f, "GpuData({:?})", resource.label()),
            None => f.write_str("GpuData(None)"),
        })
    }
}

/// The logical, CPU-side asset contract.
///
/// # Examples
///
/// ```
/// use asset_core::assets::{Asset, GpuData};
///
/// struct Shader {
///     source: String,
///     gpu: GpuData,
/// }
///
/// impl Asset for Shader {
///     fn gpu_data(&self) -> &GpuData {
///         &self.gpu
///     }
/// }
/// ```
pub trait Asset: AsAny {
    /// The GPU slot owned by this asset
    fn gpu_data(&self) -> &GpuData;

    /// Concrete type name, for diagnostics
    fn asset_type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Types a handle can view an asset as: any sized [`Asset`] or the
/// erased `dyn Asset`.
pub trait AssetView: 'static {
    /// Forget the concrete type
    fn erase(this: Rc<Self>) -> Rc<dyn Asset>;

    /// Recover the view from an erased asset, if the types match
    fn from_erased(asset: Rc<dyn Asset>) -> Option<Rc<Self>>;

    /// Name used in type mismatch errors
    fn view_name() -> &'static str {
        type_name::<Self>()
    }
}

impl<T: Asset> AssetView for T {
    fn erase(this: Rc<Self>) -> Rc<dyn Asset> {
        this
    }

    fn from_erased(asset: Rc<dyn Asset>) -> Option<Rc<Self>> {
        asset.into_any_rc().downcast::<T>().ok()
    }
}

impl AssetView for dyn Asset {
    fn erase(this: Rc<Self>) -> Rc<dyn Asset> {
        this
    }

    fn from_erased(asset: Rc<dyn Asset>) -> Option<Rc<Self>> {
        Some(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffer(&'static str);

    impl GpuAsset for Buffer {
        fn label(&self) -> &str {
            self.0
        }
    }

    #[derive(Default)]
    struct Mesh {
        gpu: GpuData,
    }

    impl Asset for Mesh {
        fn gpu_data(&self) -> &GpuData {
            &self.gpu
        }
    }

    #[derive(Default)]
    struct Texture {
        gpu: GpuData,
    }

    impl Asset for Texture {
        fn gpu_data(&self) -> &GpuData {
            &self.gpu
        }
    }

    #[test]
    fn test_gpu_slot_lifecycle() {
        let gpu = GpuData::new();
        assert!(!gpu.is_resident());

        assert!(gpu.set(Box::new(Buffer("vb"))).is_none());
        assert!(gpu.is_resident());
        assert_eq!(gpu.with(|r| r.map(|r| r.label().to_owned())), Some("vb".into()));

        let old = gpu.set(Box::new(Buffer("vb2"))).unwrap();
        assert_eq!(old.label(), "vb");

        gpu.reset();
        assert!(!gpu.is_resident());
        assert!(gpu.take().is_none());
    }

    #[test]
    fn test_gpu_resource_downcast() {
        let gpu = GpuData::new();
        gpu.set(Box::new(Buffer("ib")));
        let is_buffer = gpu.with(|r| r.is_some_and(|r| r.as_any().is::<Buffer>()));
        assert!(is_buffer);
    }

    #[test]
    fn test_view_roundtrip() {
        let mesh = Rc::new(Mesh::default());
        let erased = <Mesh as AssetView>::erase(Rc::clone(&mesh));
        assert!(erased.asset_type_name().ends_with("Mesh"));

        let back = Mesh::from_erased(Rc::clone(&erased)).unwrap();
        assert!(Rc::ptr_eq(&mesh, &back));
        assert!(Texture::from_erased(erased).is_none());
    }

    #[test]
    fn test_erased_view_accepts_anything() {
        let erased: Rc<dyn Asset> = Rc::new(Texture::default());
        assert!(<dyn Asset as AssetView>::from_erased(erased).is_some());
    }
}
