//! Asset registry and lifetime management
//!
//! The [`AssetManager`] owns every registered asset. Handles decide *when*
//! an entry goes away; the manager is the only place that actually destroys
//! one, always in two phases: the renderer frees the GPU resource, then the
//! entry leaves the registry.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::asset::{Asset, AssetView};
use super::handle::{AssetHandle, Lineage};
use crate::core::{AssetError, AssetManagerConfig, DuplicatePolicy, Key, Result};
use crate::renderer::RenderBackend;

thread_local! {
    /// The manager registered by the last successful `initialize` on this thread
    static INSTANCE: RefCell<Weak<ManagerCore>> = const { RefCell::new(Weak::new()) };
}

/// Lifecycle of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Constructed, no renderer bound yet
    Uninitialized,
    /// Accepting requests
    Running,
    /// Drained; terminal
    ShutDown,
}

/// One registry slot
struct Entry {
    asset: Rc<dyn Asset>,
    /// Handles currently issued for this entry, if any
    lineage: Weak<Lineage>,
    lineage_id: u64,
}

/// Shared state behind [`AssetManager`] and [`AssetContext`]
pub(crate) struct ManagerCore {
    config: AssetManagerConfig,
    state: Cell<ManagerState>,
    renderer: RefCell<Option<Rc<dyn RenderBackend>>>,
    registry: RefCell<FxHashMap<Key, Entry>>,
    next_lineage: Cell<u64>,
}

impl ManagerCore {
    fn new(config: AssetManagerConfig) -> Self {
        let mut registry = FxHashMap::default();
        registry.reserve(config.initial_capacity);
        Self {
            config,
            state: Cell::new(ManagerState::Uninitialized),
            renderer: RefCell::new(None),
            registry: RefCell::new(registry),
            next_lineage: Cell::new(1),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state.get() {
            ManagerState::Running => Ok(()),
            ManagerState::Uninitialized => Err(AssetError::NotInitialized),
            ManagerState::ShutDown => Err(AssetError::ShutDown),
        }
    }

    fn renderer(&self) -> Option<Rc<dyn RenderBackend>> {
        self.renderer.borrow().clone()
    }

    fn initialize(self: &Rc<Self>, renderer: Rc<dyn RenderBackend>) -> Result<()> {
        match self.state.get() {
            ManagerState::Uninitialized => {}
            ManagerState::Running => return Err(AssetError::AlreadyInitialized),
            ManagerState::ShutDown => return Err(AssetError::ShutDown),
        }

        let other_running = INSTANCE.with(|instance| {
            instance.borrow().upgrade().is_some_and(|other| {
                !Rc::ptr_eq(&other, self) && other.state.get() == ManagerState::Running
            })
        });
        if other_running {
            log::warn!("Refusing to initialize a second asset manager on this thread");
            return Err(AssetError::AlreadyInitialized);
        }

        *self.renderer.borrow_mut() = Some(renderer);
        INSTANCE.with(|instance| *instance.borrow_mut() = Rc::downgrade(self));
        self.state.set(ManagerState::Running);
        log::info!("Asset manager initialized");
        Ok(())
    }

    /// Mint a fresh lineage for `key`
    fn birth(self: &Rc<Self>, key: &Key) -> Rc<Lineage> {
        let id = self.next_lineage.get();
        self.next_lineage.set(id + 1);
        Rc::new(Lineage::new(key.clone(), id, Rc::downgrade(self)))
    }

    fn contains(&self, key: &Key) -> bool {
        self.registry.borrow().contains_key(key)
    }

    fn insert(&self, key: Key, asset: Rc<dyn Asset>, lineage: Option<&Rc<Lineage>>) {
        let entry = Entry {
            asset,
            lineage: lineage.map_or_else(Weak::new, Rc::downgrade),
            lineage_id: lineage.map_or(0, |lineage| lineage.id()),
        };
        self.registry.borrow_mut().insert(key, entry);
    }

    fn create_asset<T: Asset>(self: &Rc<Self>, key: Key, asset: T) -> Result<AssetHandle<T>> {
        self.ensure_running()?;

        if self.contains(&key) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    log::warn!("Asset {key} is already registered");
                    return Err(AssetError::DuplicateKey(key));
                }
                DuplicatePolicy::Replace => {
                    log::debug!("Replacing asset {key}");
                    self.destroy_asset(&key);
                }
            }
        }

        let asset = Rc::new(asset);
        let lineage = self.birth(&key);
        self.insert(key.clone(), Rc::clone(&asset) as Rc<dyn Asset>, Some(&lineage));
        log::debug!("Created asset {key} ({})", type_name::<T>());

        Ok(AssetHandle::from_parts(asset, lineage))
    }

    fn create_if_not_exists<T: Asset>(
        self: &Rc<Self>,
        key: Key,
        asset: T,
    ) -> Result<AssetHandle<T>> {
        self.ensure_running()?;

        if self.contains(&key) {
            log::debug!("Asset {key} already exists, keeping the registered one");
        } else {
            self.insert(key.clone(), Rc::new(asset), None);
            log::debug!("Created asset {key} ({})", type_name::<T>());
        }

        self.get_asset(&key)
    }

    fn get_asset<T: AssetView + ?Sized>(self: &Rc<Self>, key: &Key) -> Result<AssetHandle<T>> {
        self.ensure_running()?;

        let mut registry = self.registry.borrow_mut();
        let Some(entry) = registry.get_mut(key) else {
            return Err(AssetError::NotFound(key.clone()));
        };

        let erased = Rc::clone(&entry.asset);
        let found = erased.asset_type_name();
        let asset = T::from_erased(erased).ok_or_else(|| AssetError::TypeMismatch {
            key: key.clone(),
            expected: T::view_name(),
            found,
        })?;

        let lineage = match entry.lineage.upgrade() {
            Some(lineage) => lineage,
            None => {
                let lineage = self.birth(key);
                entry.lineage = Rc::downgrade(&lineage);
                entry.lineage_id = lineage.id();
                lineage
            }
        };
        drop(registry);

        Ok(AssetHandle::from_parts(asset, lineage))
    }

    /// Two-phase teardown of one entry. The registry is not borrowed while
    /// the renderer runs or while the asset itself is dropped, so assets
    /// holding handles can be destroyed from here.
    pub(crate) fn destroy_asset(&self, key: &Key) {
        let asset = {
            let registry = self.registry.borrow();
            if registry.is_empty() {
                return;
            }
            match registry.get(key) {
                Some(entry) => Rc::clone(&entry.asset),
                None => return,
            }
        };

        if let Some(renderer) = self.renderer() {
            renderer.destroy_asset(Rc::clone(&asset));
        }

        let removed = self.registry.borrow_mut().remove(key);
        log::debug!("Destroyed asset {key}");
        drop(removed);
        drop(asset);
    }

    /// Called when the last handle of a lineage goes away
    pub(crate) fn release_lineage(&self, key: &Key, lineage_id: u64) {
        if self.state.get() != ManagerState::Running {
            log::trace!("Ignoring release of {key}: manager is not running");
            return;
        }
        if !self.holds_lineage(key, lineage_id) {
            log::trace!("Ignoring release of {key}: entry was replaced or already destroyed");
            return;
        }
        self.destroy_asset(key);
    }

    pub(crate) fn holds_lineage(&self, key: &Key, lineage_id: u64) -> bool {
        self.registry
            .borrow()
            .get(key)
            .is_some_and(|entry| entry.lineage_id == lineage_id)
    }

    fn snapshot(&self) -> Vec<Rc<dyn Asset>> {
        self.registry
            .borrow()
            .values()
            .map(|entry| Rc::clone(&entry.asset))
            .collect()
    }

    fn destroy_all_gpu_assets(&self) -> Result<usize> {
        self.ensure_running()?;
        let renderer = self.renderer();
        let assets = self.snapshot();

        for asset in &assets {
            if let Some(renderer) = &renderer {
                renderer.destroy_asset(Rc::clone(asset));
            }
            asset.gpu_data().reset();
        }

        log::info!("Released GPU resources of {} assets", assets.len());
        Ok(assets.len())
    }

    fn restore_gpu_assets(&self) -> Result<usize> {
        self.ensure_running()?;
        let renderer = self.renderer().ok_or(AssetError::NotInitialized)?;

        let mut uploaded = 0;
        for asset in self.snapshot() {
            if !asset.gpu_data().is_resident() {
                renderer.upload_asset(&*asset);
                uploaded += 1;
            }
        }

        log::info!("Re-uploaded {uploaded} assets");
        Ok(uploaded)
    }

    fn shutdown(self: &Rc<Self>) {
        if self.state.get() == ManagerState::ShutDown {
            return;
        }

        let count = self.registry.borrow().len();
        if count > 0 {
            log::info!("Shutting down asset manager, draining {count} assets");
        }

        loop {
            let next = self
                .registry
                .borrow()
                .iter()
                .next()
                .map(|(key, entry)| (key.clone(), entry.lineage.strong_count()));
            let Some((key, holders)) = next else {
                break;
            };

            if holders > 0 && self.config.warn_on_leaked_handles {
                log::warn!("Asset {key} still has {holders} handle(s) at shutdown");
            }
            self.destroy_asset(&key);
        }

        self.registry.borrow_mut().clear();
        self.renderer.borrow_mut().take();
        self.state.set(ManagerState::ShutDown);

        INSTANCE.with(|instance| {
            let mut instance = instance.borrow_mut();
            if instance.upgrade().is_none_or(|current| Rc::ptr_eq(&current, self)) {
                *instance = Weak::new();
            }
        });
        log::info!("Asset manager shut down");
    }
}

/// The single owner of every registered asset.
///
/// Dropping the manager destroys every remaining entry, even if client
/// code still holds handles to some of them.
pub struct AssetManager {
    core: Rc<ManagerCore>,
}

impl AssetManager {
    /// Create a manager with the default config
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AssetManagerConfig::default())
    }

    /// Create a manager with a custom config
    #[must_use]
    pub fn with_config(config: AssetManagerConfig) -> Self {
        Self {
            core: Rc::new(ManagerCore::new(config)),
        }
    }

    /// Bind the renderer and register this manager as the thread's instance.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyInitialized`] if this manager or another
    /// live manager on this thread is already running, and
    /// [`AssetError::ShutDown`] if this manager was shut down.
    pub fn initialize(&self, renderer: Rc<dyn RenderBackend>) -> Result<()> {
        self.core.initialize(renderer)
    }

    /// The running manager registered on this thread
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotInitialized`] if no manager is running.
    pub fn instance() -> Result<AssetContext> {
        INSTANCE.with(|instance| {
            instance
                .borrow()
                .upgrade()
                .filter(|core| core.state.get() == ManagerState::Running)
                .map(|core| AssetContext {
                    core: Rc::downgrade(&core),
                })
                .ok_or(AssetError::NotInitialized)
        })
    }

    /// A non-owning context to pass to code that needs asset access
    #[must_use]
    pub fn context(&self) -> AssetContext {
        AssetContext {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Register `asset` under `key` and return the first handle to it.
    ///
    /// # Errors
    ///
    /// Fails if the manager is not running, or if `key` is taken and the
    /// duplicate policy is [`DuplicatePolicy::Reject`].
    pub fn create_asset<T: Asset>(&self, key: impl Into<Key>, asset: T) -> Result<AssetHandle<T>> {
        self.core.create_asset(key.into(), asset)
    }

    /// Register `asset` unless `key` is taken, then return a handle to
    /// whatever is registered under `key`.
    ///
    /// # Errors
    ///
    /// Fails if the manager is not running, or if the registered asset is
    /// not a `T`.
    pub fn create_if_not_exists<T: Asset>(
        &self,
        key: impl Into<Key>,
        asset: T,
    ) -> Result<AssetHandle<T>> {
        self.core.create_if_not_exists(key.into(), asset)
    }

    /// Get a handle to the asset under `key`
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if nothing is registered under `key`
    /// and [`AssetError::TypeMismatch`] if the asset is not a `T`.
    pub fn get_asset<T: AssetView + ?Sized>(&self, key: impl Into<Key>) -> Result<AssetHandle<T>> {
        self.core.get_asset(&key.into())
    }

    /// Free every GPU resource while keeping all entries registered.
    ///
    /// Returns the number of assets visited.
    ///
    /// # Errors
    ///
    /// Fails if the manager is not running.
    pub fn destroy_all_gpu_assets(&self) -> Result<usize> {
        self.core.destroy_all_gpu_assets()
    }

    /// Upload every asset that has no GPU resource, e.g. after a device loss.
    ///
    /// Returns the number of assets uploaded.
    ///
    /// # Errors
    ///
    /// Fails if the manager is not running.
    pub fn restore_gpu_assets(&self) -> Result<usize> {
        self.core.restore_gpu_assets()
    }

    /// Destroy every entry and release the renderer. Idempotent.
    pub fn shutdown(&self) {
        self.core.shutdown();
    }

    /// Check if `key` is registered
    #[must_use]
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.core.contains(&key.into())
    }

    /// Number of registered assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.registry.borrow().len()
    }

    /// Check if the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.registry.borrow().is_empty()
    }

    /// All registered keys, in no particular order
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.core.registry.borrow().keys().cloned().collect()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.core.state.get()
    }

    /// True while the manager is running
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == ManagerState::Running
    }

    /// The config this manager was built with
    #[must_use]
    pub fn config(&self) -> &AssetManagerConfig {
        &self.core.config
    }
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

/// Cheap, cloneable access to a manager without owning it.
#[derive(Clone, Debug)]
pub struct AssetContext {
    core: Weak<ManagerCore>,
}

impl AssetContext {
    fn core(&self) -> Result<Rc<ManagerCore>> {
        self.core.upgrade().ok_or(AssetError::ManagerDropped)
    }

    /// See [`AssetManager::create_asset`]
    ///
    /// # Errors
    ///
    /// As [`AssetManager::create_asset`], plus [`AssetError::ManagerDropped`].
    pub fn create_asset<T: Asset>(&self, key: impl Into<Key>, asset: T) -> Result<AssetHandle<T>> {
        self.core()?.create_asset(key.into(), asset)
    }

    /// See [`AssetManager::create_if_not_exists`]
    ///
    /// # Errors
    ///
    /// As [`AssetManager::create_if_not_exists`], plus
    /// [`AssetError::ManagerDropped`].
    pub fn create_if_not_exists<T: Asset>(
        &self,
        key: impl Into<Key>,
        asset: T,
    ) -> Result<AssetHandle<T>> {
        self.core()?.create_if_not_exists(key.into(), asset)
    }

    /// See [`AssetManager::get_asset`]
    ///
    /// # Errors
    ///
    /// As [`AssetManager::get_asset`], plus [`AssetError::ManagerDropped`].
    pub fn get_asset<T: AssetView + ?Sized>(&self, key: impl Into<Key>) -> Result<AssetHandle<T>> {
        self.core()?.get_asset(&key.into())
    }

    /// Check if `key` is registered; false once the manager is gone
    #[must_use]
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.contains(&key.into()))
    }

    /// Number of registered assets; 0 once the manager is gone
    #[must_use]
    pub fn len(&self) -> usize {
        self.core
            .upgrade()
            .map_or(0, |core| core.registry.borrow().len())
    }

    /// Check if the registry is empty or the manager is gone
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
