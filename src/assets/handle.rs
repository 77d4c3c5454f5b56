//! Asset handle implementation
//!
//! Handles are the only way client code reaches a registered asset. Every
//! handle to the same registry entry shares one lineage; when the last of
//! them goes away the lineage tells the manager, which frees the GPU
//! resource and then removes the entry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use super::asset::{Asset, AssetView};
use super::manager::ManagerCore;
use crate::core::{AssetError, Key, Result};

/// Shared counter of one birth, plus what is needed to destroy its entry.
///
/// The strong count of the `Rc<Lineage>` is the handle count.
pub(crate) struct Lineage {
    key: Key,
    id: u64,
    manager: Weak<ManagerCore>,
}

impl Lineage {
    pub(crate) fn new(key: Key, id: u64, manager: Weak<ManagerCore>) -> Self {
        Self { key, id, manager }
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Lineage {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.release_lineage(&self.key, self.id);
        }
    }
}

struct HandleInner<T: AssetView + ?Sized> {
    asset: Rc<T>,
    lineage: Rc<Lineage>,
}

/// A counted reference to a registered asset, viewed as `T`.
///
/// `T` is either a concrete [`Asset`] or `dyn Asset`. Views of different
/// types onto the same entry share a single count.
pub struct AssetHandle<T: AssetView + ?Sized> {
    inner: Option<HandleInner<T>>,
}

impl<T: AssetView + ?Sized> AssetHandle<T> {
    /// A handle that references nothing
    #[must_use]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    pub(crate) fn from_parts(asset: Rc<T>, lineage: Rc<Lineage>) -> Self {
        Self {
            inner: Some(HandleInner { asset, lineage }),
        }
    }

    /// Get a reference to the underlying asset
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty.
    #[must_use]
    #[track_caller]
    pub fn get(&self) -> &T {
        match &self.inner {
            Some(inner) => &inner.asset,
            None => panic!("dereferenced an empty AssetHandle"),
        }
    }

    /// Get a reference to the underlying asset, if any
    #[must_use]
    pub fn try_get(&self) -> Option<&T> {
        self.inner.as_ref().map(|inner| &*inner.asset)
    }

    /// Key of the referenced entry
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.inner.as_ref().map(|inner| &inner.lineage.key)
    }

    /// Number of handles sharing this handle's count, 0 when empty
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| Rc::strong_count(&inner.lineage))
    }

    /// True if the handle references an asset
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    /// True if the handle references nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether the manager still holds the entry this handle was issued for.
    ///
    /// False for empty handles and for handles that outlived a manager
    /// teardown or a replacement of their key.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| {
            let lineage = &inner.lineage;
            lineage
                .manager
                .upgrade()
                .is_some_and(|manager| manager.holds_lineage(&lineage.key, lineage.id))
        })
    }

    /// Whether two handles share the same count
    #[must_use]
    pub fn shares_count_with<V: AssetView + ?Sized>(&self, other: &AssetHandle<V>) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a.lineage, &b.lineage),
            _ => false,
        }
    }

    /// Drop this handle's reference and leave it empty.
    ///
    /// If it was the last reference, the entry is torn down before this
    /// returns. Resetting an empty handle does nothing.
    pub fn reset(&mut self) {
        if let Some(HandleInner { asset, lineage }) = self.inner.take() {
            drop(lineage);
            drop(asset);
        }
    }

    /// View the same asset as `V`, sharing this handle's count.
    ///
    /// An empty handle converts to an empty handle.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::TypeMismatch`] if the asset is not a `V`.
    pub fn cast<V: AssetView + ?Sized>(&self) -> Result<AssetHandle<V>> {
        let Some(inner) = &self.inner else {
            return Ok(AssetHandle::empty());
        };

        let erased = T::erase(Rc::clone(&inner.asset));
        let found = erased.asset_type_name();
        let asset = V::from_erased(erased).ok_or_else(|| AssetError::TypeMismatch {
            key: inner.lineage.key.clone(),
            expected: V::view_name(),
            found,
        })?;

        Ok(AssetHandle::from_parts(asset, Rc::clone(&inner.lineage)))
    }

    /// Reassign this handle from a handle of another view.
    ///
    /// The previous reference is released first, unless both already share
    /// a count.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::TypeMismatch`] if the asset is not a `T`; the
    /// handle is left unchanged in that case.
    pub fn assign_from<V: AssetView + ?Sized>(&mut self, other: &AssetHandle<V>) -> Result<()> {
        let converted = other.cast::<T>()?;
        if !self.shares_count_with(&converted) {
            self.reset();
        }
        *self = converted;
        Ok(())
    }

    /// View the asset as `dyn Asset`
    #[must_use]
    pub fn erase(&self) -> AssetHandle<dyn Asset> {
        match &self.inner {
            Some(inner) => {
                AssetHandle::from_parts(T::erase(Rc::clone(&inner.asset)), Rc::clone(&inner.lineage))
            }
            None => AssetHandle::empty(),
        }
    }

    fn address(&self) -> *const () {
        self.inner
            .as_ref()
            .map_or(std::ptr::null(), |inner| Rc::as_ptr(&inner.asset).cast::<()>())
    }
}

impl<T: Asset> From<AssetHandle<T>> for AssetHandle<dyn Asset> {
    fn from(mut handle: AssetHandle<T>) -> Self {
        match handle.inner.take() {
            Some(HandleInner { asset, lineage }) => {
                let asset: Rc<dyn Asset> = asset;
                AssetHandle::from_parts(asset, lineage)
            }
            None => AssetHandle::empty(),
        }
    }
}

impl<T: AssetView + ?Sized> Default for AssetHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: AssetView + ?Sized> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        match &self.inner {
            Some(inner) => Self::from_parts(Rc::clone(&inner.asset), Rc::clone(&inner.lineage)),
            None => Self::empty(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if !self.shares_count_with(source) {
            self.reset();
        }
        *self = source.clone();
    }
}

impl<T: AssetView + ?Sized> Drop for AssetHandle<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: AssetView + ?Sized, V: AssetView + ?Sized> PartialEq<AssetHandle<V>> for AssetHandle<T> {
    fn eq(&self, other: &AssetHandle<V>) -> bool {
        self.address() == other.address()
    }
}

impl<T: AssetView + ?Sized> Eq for AssetHandle<T> {}

impl<T: AssetView + ?Sized> Hash for AssetHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<T: AssetView + ?Sized> Deref for AssetHandle<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T: AssetView + ?Sized> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("AssetHandle")
                .field("key", &inner.lineage.key)
                .field("view", &T::view_name())
                .field("use_count", &Rc::strong_count(&inner.lineage))
                .finish(),
            None => f.write_str("AssetHandle(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::assets::AssetManager;
    use crate::assets::test_assets::{TestMesh, TestTexture};
    use crate::renderer::HeadlessRenderer;

    fn running_manager() -> (AssetManager, Rc<HeadlessRenderer>) {
        let renderer = Rc::new(HeadlessRenderer::new());
        let manager = AssetManager::new();
        manager.initialize(renderer.clone()).unwrap();
        (manager, renderer)
    }

    #[test]
    fn test_default_is_empty() {
        let handle = AssetHandle::<TestMesh>::default();
        assert!(handle.is_empty());
        assert!(!handle.is_valid());
        assert_eq!(handle.use_count(), 0);
        assert!(handle.key().is_none());
        assert!(handle.try_get().is_none());
        assert!(!handle.is_live());
    }

    #[test]
    #[should_panic(expected = "empty AssetHandle")]
    fn test_deref_empty_panics() {
        let handle = AssetHandle::<TestMesh>::empty();
        let _count = handle.vertex_count;
    }

    #[test]
    fn test_clone_counts() {
        let (manager, _renderer) = running_manager();
        let h1 = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let h2 = h1.clone();
        let h3 = h2.clone();

        assert_eq!(h1.use_count(), 3);
        assert!(h1.shares_count_with(&h3));
        drop(h2);
        assert_eq!(h1.use_count(), 2);
        assert_eq!(h3.get().vertex_count, 3);
    }

    #[test]
    fn test_reset_twice_tears_down_once() {
        let (manager, renderer) = running_manager();
        let mut handle = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();

        handle.reset();
        assert!(handle.is_empty());
        assert_eq!(renderer.stats().destroys, 1);

        handle.reset();
        assert_eq!(renderer.stats().destroys, 1);
        assert!(!manager.contains("mesh1"));
    }

    #[test]
    fn test_clone_from_releases_previous() {
        let (manager, renderer) = running_manager();
        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let mut other = manager.create_asset("mesh2", TestMesh::new(4)).unwrap();

        other.clone_from(&mesh);

        assert!(!manager.contains("mesh2"));
        assert_eq!(renderer.stats().destroys, 1);
        assert_eq!(mesh.use_count(), 2);
        assert_eq!(other, mesh);
    }

    #[test]
    fn test_clone_from_same_lineage_keeps_entry() {
        let (manager, renderer) = running_manager();
        let mut mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let alias = mesh.clone();
        drop(alias);

        let same = mesh.clone();
        mesh.clone_from(&same);
        drop(same);

        assert_eq!(mesh.use_count(), 1);
        assert!(manager.contains("mesh1"));
        assert_eq!(renderer.stats().destroys, 0);
    }

    #[test]
    fn test_erase_and_cast_back_preserves_identity() {
        let (manager, _renderer) = running_manager();
        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();

        let erased = mesh.erase();
        assert_eq!(mesh.use_count(), 2);
        assert!(erased.shares_count_with(&mesh));

        let back = erased.cast::<TestMesh>().unwrap();
        assert!(std::ptr::eq(back.get(), mesh.get()));
        assert_eq!(back, mesh);
        assert_eq!(mesh.use_count(), 3);
    }

    #[test]
    fn test_cast_to_wrong_type_fails() {
        let (manager, _renderer) = running_manager();
        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();

        let err = mesh.cast::<TestTexture>().unwrap_err();
        assert!(matches!(err, AssetError::TypeMismatch { ref key, .. } if key.name() == "mesh1"));
        assert_eq!(mesh.use_count(), 1);
    }

    #[test]
    fn test_cast_empty_gives_empty() {
        let handle = AssetHandle::<dyn Asset>::empty();
        assert!(handle.cast::<TestMesh>().unwrap().is_empty());
    }

    #[test]
    fn test_from_consumes_without_changing_count() {
        let (manager, _renderer) = running_manager();
        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let alias = mesh.clone();

        let erased: AssetHandle<dyn Asset> = alias.into();
        assert_eq!(erased.use_count(), 2);
        assert!(erased.get().asset_type_name().ends_with("TestMesh"));
    }

    #[test]
    fn test_assign_from_other_view() {
        let (manager, renderer) = running_manager();
        let texture = manager.create_asset("tex1", TestTexture::new(16)).unwrap();
        let erased = texture.erase();
        let mut target = manager.create_asset("tex2", TestTexture::new(32)).unwrap();

        target.assign_from(&erased).unwrap();
        assert_eq!(target.get().size, 16);
        assert_eq!(texture.use_count(), 3);
        assert!(!manager.contains("tex2"));
        assert_eq!(renderer.stats().destroys, 1);

        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        assert!(target.assign_from(&mesh).is_err());
        assert_eq!(target.get().size, 16);
    }

    #[test]
    fn test_equality_across_views() {
        let (manager, _renderer) = running_manager();
        let a = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let b = manager.create_asset("mesh2", TestMesh::new(3)).unwrap();

        assert_eq!(a.erase(), a);
        assert_ne!(a, b);
        assert_eq!(AssetHandle::<TestMesh>::empty(), AssetHandle::<TestTexture>::empty());
    }

    #[test]
    fn test_debug_output() {
        let (manager, _renderer) = running_manager();
        let mesh = manager.create_asset("mesh1", TestMesh::new(3)).unwrap();
        let text = format!("{mesh:?}");
        assert!(text.contains("mesh1"));
        assert!(text.contains("use_count: 1"));
        assert_eq!(format!("{:?}", AssetHandle::<TestMesh>::empty()), "AssetHandle(empty)");
    }
}
