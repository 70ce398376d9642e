use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use crossbeam_channel::{Receiver, Sender};
use lina_serialization::{archive, IStream, OStream};
use log::{error, info, trace, warn};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard,
};

use crate::{
    package, CreateResourceFn, Error, PackageType, ResourceCache, ResourceCacheFactory,
    ResourceId, ResourceIdentifier, ResourceLoadTask, ResourceManagerMode,
    ResourceManagerSettings, ResourceOwner, ResourceSlot, ResourceTag, ResourceType, Result,
    TaskId, TypedResource,
};

/// Extension of metacache files.
pub const METACACHE_EXTENSION: &str = "linametadata";

/// Receives the notifications of a [`ResourceManager`].
///
/// Notifications are emitted from the thread calling
/// [`ResourceManager::poll`], [`ResourceManager::wait_for_all`] or
/// [`ResourceManager::unload_resources`].
pub trait ResourceManagerListener: Send + Sync {
    /// Every resource of `task` is loaded.
    fn on_resource_load_task_completed(&self, _task: &ResourceLoadTask) {}

    /// `resources` are about to be destroyed.
    fn on_resources_pre_unloaded(&self, _resources: &[ResourceIdentifier]) {}

    /// `resource` was destroyed.
    fn on_resource_unloaded(&self, _resource: &ResourceIdentifier) {}

    /// Every resource of the batch was destroyed.
    fn on_resources_unloaded(&self, _resources: &[ResourceIdentifier]) {}
}

/// Application hooks consulted while loading.
pub trait ResourceDelegate: Send + Sync {
    /// Writes preliminary metadata of resource `id` into `out`.
    ///
    /// Returns false when the application has nothing to add. Only consulted
    /// for identifiers with `use_custom_meta` set.
    fn fill_resource_custom_meta(&self, _id: ResourceId, _out: &mut OStream) -> bool {
        false
    }
}

/// Resolves where a project stores the serialized form of a resource.
pub trait ResourceLocator {
    /// Path of the serialized resource `id`.
    fn resource_path(&self, id: ResourceId) -> PathBuf;
}

impl<F> ResourceLocator for F
where
    F: Fn(ResourceId) -> PathBuf,
{
    fn resource_path(&self, id: ResourceId) -> PathBuf {
        self(id)
    }
}

/// Options which can be used to configure the creation of [`ResourceManager`].
pub struct ResourceManagerOptions {
    factories: HashMap<ResourceType, ResourceCacheFactory>,
    settings: ResourceManagerSettings,
    delegate: Option<Arc<dyn ResourceDelegate>>,
}

impl ResourceManagerOptions {
    /// Creates a blank set of options for [`ResourceManager`] configuration.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            settings: ResourceManagerSettings::default(),
            delegate: None,
        }
    }

    /// Uses `settings` instead of the defaults.
    pub fn with_settings(mut self, settings: ResourceManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Installs the application delegate.
    pub fn with_delegate(mut self, delegate: Arc<dyn ResourceDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Enables support of resource type `T`.
    ///
    /// `extensions` lists the source file extensions imported as `T`.
    pub fn register_resource_type<T: TypedResource>(
        mut self,
        package_type: PackageType,
        extensions: &[&str],
    ) -> Self {
        self.factories.insert(
            T::TYPE,
            ResourceCacheFactory::new::<T>(package_type, extensions),
        );
        self
    }

    /// Creates [`ResourceManager`] based on `ResourceManagerOptions`.
    pub fn create(self) -> Result<ResourceManager> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.worker_threads)
            .thread_name(|index| format!("lina-resource-loader-{}", index))
            .build()?;
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();

        Ok(ResourceManager {
            settings: self.settings,
            factories: self.factories,
            caches: HashMap::new(),
            listeners: Vec::new(),
            delegate: self.delegate,
            pool,
            tasks: HashMap::new(),
            completed_tx,
            completed_rx,
            next_task_id: 0,
            app_resources: Vec::new(),
        })
    }
}

enum LoadSource {
    /// Imported from a source file, cached through the metacache.
    SourceFile { path: PathBuf, metacache: PathBuf },
    /// Serialized resource stored by a project.
    ProjectFile(PathBuf),
    /// Record of a package.
    Bytes(Vec<u8>),
    /// Nothing to read, the resource stays default.
    Missing,
}

struct LoadJob {
    slot: ResourceSlot,
    identifier: ResourceIdentifier,
    source: LoadSource,
    create_fn: CreateResourceFn,
    delegate: Option<Arc<dyn ResourceDelegate>>,
}

impl LoadJob {
    fn run(self) {
        let Self {
            slot,
            identifier,
            source,
            create_fn,
            delegate,
        } = self;

        let custom_meta = if identifier.use_custom_meta {
            delegate.and_then(|delegate| {
                let mut meta = OStream::new();
                delegate
                    .fill_resource_custom_meta(identifier.id, &mut meta)
                    .then(|| meta.into_inner())
            })
        } else {
            None
        };

        let mut resource = slot.write();
        if let Some(meta) = &custom_meta {
            resource.set_custom_meta(&mut IStream::from_slice(meta));
        }

        let loaded = match source {
            LoadSource::SourceFile { path, metacache } => {
                if metacache.exists() {
                    archive::read_raw_file(&metacache)
                        .and_then(|bytes| resource.load_from_stream(&mut IStream::new(bytes)))
                } else {
                    let loaded = resource.load_from_file(&path);
                    if loaded.is_ok() {
                        let mut out = OStream::new();
                        resource.save_to_stream(&mut out);
                        if let Err(err) = out
                            .check()
                            .and_then(|()| archive::write_raw_file(&metacache, out.data()))
                        {
                            error!("Failed writing metacache {:?}: {}", metacache, err);
                        }
                    }
                    loaded
                }
            }
            LoadSource::ProjectFile(path) => archive::read_raw_file(&path)
                .and_then(|bytes| resource.load_from_stream(&mut IStream::new(bytes))),
            LoadSource::Bytes(bytes) => resource.load_from_stream(&mut IStream::new(bytes)),
            LoadSource::Missing => Ok(()),
        };

        if let Err(err) = loaded {
            match err {
                lina_serialization::Error::VersionMismatch { .. } => warn!(
                    "Resource {} ({}) uses defaults: {}",
                    identifier.id, identifier.name, err
                ),
                _ => error!(
                    "Failed loading resource {} ({}): {}",
                    identifier.id, identifier.name, err
                ),
            }
            *resource = create_fn(identifier.id, &identifier.name, &identifier.path);
            if let Some(meta) = &custom_meta {
                resource.set_custom_meta(&mut IStream::from_slice(meta));
            }
        }

        resource.upload();
    }
}

/// Registry of all live resources.
///
/// Resources live in one [`ResourceCache`] per registered type and are
/// created, loaded and destroyed explicitly. Loads are grouped in
/// [`ResourceLoadTask`]s whose resources are read in parallel on a worker
/// pool. Completed tasks are reported to listeners by [`Self::poll`] or
/// [`Self::wait_for_all`].
///
/// # Example
///
/// ```
/// # use lina_data_runtime::{test_resource::TestTexture, *};
/// let mut manager = ResourceManagerOptions::new()
///     .register_resource_type::<TestTexture>(PackageType::Resources, &["png"])
///     .create()
///     .unwrap();
///
/// let stone = ResourceIdentifier::new(1_000_001, TestTexture::TYPE, "stone.png", "stone.png");
/// manager.load_resources_from_file(vec![stone], 0).unwrap();
/// manager.wait_for_all();
/// assert!(manager.get_resource::<TestTexture>(1_000_001).is_some());
/// ```
pub struct ResourceManager {
    settings: ResourceManagerSettings,
    factories: HashMap<ResourceType, ResourceCacheFactory>,
    caches: HashMap<ResourceType, ResourceCache>,
    listeners: Vec<Arc<dyn ResourceManagerListener>>,
    delegate: Option<Arc<dyn ResourceDelegate>>,
    pool: rayon::ThreadPool,
    tasks: HashMap<TaskId, ResourceLoadTask>,
    completed_tx: Sender<TaskId>,
    completed_rx: Receiver<TaskId>,
    next_task_id: TaskId,
    app_resources: Vec<ResourceIdentifier>,
}

impl ResourceManager {
    /// Settings the manager was created with.
    pub fn settings(&self) -> &ResourceManagerSettings {
        &self.settings
    }

    /// Switches between file and package loading.
    pub fn set_mode(&mut self, mode: ResourceManagerMode) {
        self.settings.mode = mode;
    }

    /// Registers a listener.
    pub fn add_listener(&mut self, listener: Arc<dyn ResourceManagerListener>) {
        self.listeners.push(listener);
    }

    /// Unregisters a listener added with [`Self::add_listener`].
    pub fn remove_listener(&mut self, listener: &Arc<dyn ResourceManagerListener>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Installs the application delegate.
    pub fn set_delegate(&mut self, delegate: Arc<dyn ResourceDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Returns the cache of `tid`, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if no resource type was registered for `tid`.
    pub fn get_cache(&mut self, tid: ResourceType) -> &mut ResourceCache {
        let factories = &self.factories;
        self.caches.entry(tid).or_insert_with(|| {
            factories
                .get(&tid)
                .unwrap_or_else(|| panic!("no resource type registered for {}", tid))
                .create_cache()
        })
    }

    /// Returns the cache of `tid` if it was created.
    pub fn find_cache(&self, tid: ResourceType) -> Option<&ResourceCache> {
        self.caches.get(&tid)
    }

    /// Returns true if `tid` was registered.
    pub fn is_registered(&self, tid: ResourceType) -> bool {
        self.factories.contains_key(&tid)
    }

    /// Package resources of type `tid` ship in.
    pub fn package_type(&self, tid: ResourceType) -> Result<PackageType> {
        self.factories
            .get(&tid)
            .map(ResourceCacheFactory::package_type)
            .ok_or(Error::UnknownResourceType(tid))
    }

    /// Finds the registered type importing source files with extension `ext`.
    pub fn resource_type_for_extension(&self, ext: &str) -> Option<ResourceType> {
        self.factories
            .values()
            .find(|factory| factory.supports_extension(ext))
            .map(ResourceCacheFactory::resource_type)
    }

    /// Returns the slot of a resource.
    pub fn get_resource_slot(&self, tid: ResourceType, id: ResourceId) -> Option<ResourceSlot> {
        self.find_cache(tid)?.get_resource(id).map(Arc::clone)
    }

    /// Read access to a resource of type `T`.
    pub fn get_resource<T: TypedResource>(
        &self,
        id: ResourceId,
    ) -> Option<MappedRwLockReadGuard<'_, T>> {
        let slot = self.find_cache(T::TYPE)?.get_resource(id)?;
        RwLockReadGuard::try_map(slot.read(), |resource| {
            resource.as_any().downcast_ref::<T>()
        })
        .ok()
    }

    /// Write access to a resource of type `T`.
    pub fn get_resource_mut<T: TypedResource>(
        &self,
        id: ResourceId,
    ) -> Option<MappedRwLockWriteGuard<'_, T>> {
        let slot = self.find_cache(T::TYPE)?.get_resource(id)?;
        RwLockWriteGuard::try_map(slot.write(), |resource| {
            resource.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// Slots of all live resources of type `tid`.
    pub fn get_all_resources(
        &self,
        tid: ResourceType,
        include_user_managed: bool,
    ) -> Vec<ResourceSlot> {
        self.find_cache(tid)
            .map(|cache| cache.all_resources(include_user_managed))
            .unwrap_or_default()
    }

    /// Creates an empty resource owned by user code.
    pub fn create_user_resource<T: TypedResource>(
        &mut self,
        id: ResourceId,
        name: &str,
    ) -> Result<ResourceSlot> {
        self.get_cache(T::TYPE)
            .create_resource(id, name, "", ResourceOwner::UserCode)
            .ok_or(Error::ResourceExists(T::TYPE, id))
    }

    /// Destroys a resource created with [`Self::create_user_resource`].
    pub fn destroy_user_resource(&mut self, tid: ResourceType, id: ResourceId) -> Result<()> {
        self.get_cache(tid).destroy_user_resource(id).map_err(|err| {
            error!("Failed destroying user resource {}: {}", id, err);
            err
        })
    }

    /// Declares the resources the application itself depends on.
    pub fn register_app_resources(
        &mut self,
        resources: impl IntoIterator<Item = ResourceIdentifier>,
    ) {
        for resource in resources {
            if !self.app_resources.contains(&resource) {
                self.app_resources.push(resource);
            }
        }
    }

    /// Application resources tagged [`ResourceTag::Priority`].
    pub fn priority_resources(&self) -> Vec<ResourceIdentifier> {
        self.app_resources_tagged(ResourceTag::Priority)
    }

    /// Application resources tagged [`ResourceTag::Core`].
    pub fn core_resources(&self) -> Vec<ResourceIdentifier> {
        self.app_resources_tagged(ResourceTag::Core)
    }

    /// Returns true if `id` is a priority application resource.
    pub fn is_priority_resource(&self, id: ResourceId) -> bool {
        self.app_resources
            .iter()
            .any(|r| r.id == id && r.tag == ResourceTag::Priority)
    }

    /// Returns true if `id` is a core application resource.
    pub fn is_core_resource(&self, id: ResourceId) -> bool {
        self.app_resources
            .iter()
            .any(|r| r.id == id && r.tag == ResourceTag::Core)
    }

    fn app_resources_tagged(&self, tag: ResourceTag) -> Vec<ResourceIdentifier> {
        self.app_resources
            .iter()
            .filter(|r| r.tag == tag)
            .cloned()
            .collect()
    }

    /// Returns a task id that is not in flight.
    pub fn next_task_id(&mut self) -> TaskId {
        while self.tasks.contains_key(&self.next_task_id) {
            self.next_task_id = self.next_task_id.wrapping_add(1);
        }
        let id = self.next_task_id;
        self.next_task_id = self.next_task_id.wrapping_add(1);
        id
    }

    /// Path of the metacache file of a resource imported from `path`.
    pub fn metacache_path(&self, path: impl AsRef<Path>, id: ResourceId) -> PathBuf {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.settings
            .metacache_folder
            .join(format!("{}_{}.{}", stem, id, METACACHE_EXTENSION))
    }

    /// Loads resources from their source files in parallel.
    ///
    /// Each resource is read from `identifier.path`, or from its metacache if
    /// one exists. A metacache is written after a successful import.
    /// Returns the slots created for the batch.
    pub fn load_resources_from_file(
        &mut self,
        identifiers: Vec<ResourceIdentifier>,
        task_id: TaskId,
    ) -> Result<Vec<ResourceSlot>> {
        self.submit(task_id, identifiers, |manager, identifier| {
            LoadSource::SourceFile {
                path: PathBuf::from(&identifier.path),
                metacache: manager.metacache_path(&identifier.path, identifier.id),
            }
        })
    }

    /// Loads resources serialized by a project.
    ///
    /// In package mode the resources are read from the package files instead.
    pub fn load_resources_from_project(
        &mut self,
        locator: &dyn ResourceLocator,
        identifiers: Vec<ResourceIdentifier>,
        task_id: TaskId,
    ) -> Result<Vec<ResourceSlot>> {
        if self.settings.mode == ResourceManagerMode::Package {
            return self.load_resources_from_package(identifiers, task_id);
        }
        self.submit(task_id, identifiers, |_, identifier| {
            LoadSource::ProjectFile(locator.resource_path(identifier.id))
        })
    }

    /// Loads resources from the package files.
    ///
    /// Identifiers are grouped by the package their type ships in, and each
    /// package is scanned once for the records of its group.
    pub fn load_resources_from_package(
        &mut self,
        identifiers: Vec<ResourceIdentifier>,
        task_id: TaskId,
    ) -> Result<Vec<ResourceSlot>> {
        let mut groups: HashMap<PackageType, HashSet<ResourceId>> = HashMap::new();
        for identifier in &identifiers {
            groups
                .entry(self.package_type(identifier.tid)?)
                .or_default()
                .insert(identifier.id);
        }

        let mut records = HashMap::new();
        for (package_type, wanted) in groups {
            let path = self.settings.package_path(package_type);
            match archive::read_raw_file(path) {
                Ok(bytes) => {
                    let mut input = IStream::new(bytes);
                    for record in package::scan_records(&mut input, package_type, &wanted) {
                        records.insert(record.id, record.data);
                    }
                }
                Err(err) => error!("Failed reading package: {}", err),
            }
        }

        self.submit(task_id, identifiers, |_, identifier| {
            records
                .remove(&identifier.id)
                .map_or(LoadSource::Missing, LoadSource::Bytes)
        })
    }

    /// Loads the resources of `needed` that are not in their cache yet.
    ///
    /// Returns `None` if everything is already loaded.
    pub fn load_missing_resources(
        &mut self,
        locator: &dyn ResourceLocator,
        needed: &[ResourceIdentifier],
        task_id: TaskId,
    ) -> Result<Option<TaskId>> {
        let missing: Vec<ResourceIdentifier> = needed
            .iter()
            .filter(|identifier| {
                !self
                    .find_cache(identifier.tid)
                    .map_or(false, |cache| cache.contains(identifier.id))
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(None);
        }
        self.load_resources_from_project(locator, missing, task_id)?;
        Ok(Some(task_id))
    }

    fn submit(
        &mut self,
        task_id: TaskId,
        identifiers: Vec<ResourceIdentifier>,
        mut source: impl FnMut(&Self, &ResourceIdentifier) -> LoadSource,
    ) -> Result<Vec<ResourceSlot>> {
        if self.tasks.contains_key(&task_id) {
            return Err(Error::TaskInFlight(task_id));
        }
        for identifier in &identifiers {
            if !self.is_registered(identifier.tid) {
                return Err(Error::UnknownResourceType(identifier.tid));
            }
        }

        let mut seen = HashSet::new();
        let mut scheduled = Vec::new();
        let mut jobs = Vec::new();
        for identifier in identifiers {
            if !seen.insert(identifier.clone()) {
                continue;
            }
            let cache = self.get_cache(identifier.tid);
            let create_fn = cache.create_fn();
            let slot = match cache.create_resource(
                identifier.id,
                &identifier.name,
                &identifier.path,
                ResourceOwner::ResourceManager,
            ) {
                Some(slot) => slot,
                None => continue,
            };
            jobs.push(LoadJob {
                slot: Arc::clone(&slot),
                source: source(self, &identifier),
                identifier: identifier.clone(),
                create_fn,
                delegate: self.delegate.clone(),
            });
            scheduled.push(identifier);
        }

        trace!(
            "Submitting load task {} with {} resources",
            task_id,
            scheduled.len()
        );
        let slots = jobs.iter().map(|job| Arc::clone(&job.slot)).collect();
        let task = ResourceLoadTask::new(task_id, scheduled);
        let completion = task.completion();
        let completed_tx = self.completed_tx.clone();
        self.tasks.insert(task_id, task);

        self.pool.spawn(move || {
            rayon::scope(|scope| {
                for job in jobs {
                    scope.spawn(move |_| job.run());
                }
            });
            completion.finish();
            if completed_tx.send(task_id).is_err() {
                trace!("Resource manager dropped before task {} completed", task_id);
            }
        });

        Ok(slots)
    }

    /// Returns true if task `task_id` is not outstanding anymore.
    ///
    /// A task stays outstanding until its completion was dispatched by
    /// [`Self::poll`] or [`Self::wait_for_all`].
    pub fn is_load_task_complete(&self, task_id: TaskId) -> bool {
        !self.tasks.contains_key(&task_id)
    }

    /// Number of outstanding load tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Dispatches the tasks that completed since the last call.
    ///
    /// Never blocks. Returns the ids of the dispatched tasks.
    pub fn poll(&mut self) -> Vec<TaskId> {
        while self.completed_rx.try_recv().is_ok() {}

        let mut completed: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|task| task.is_completed())
            .map(ResourceLoadTask::id)
            .collect();
        completed.sort_unstable();

        for task_id in &completed {
            if let Some(task) = self.tasks.remove(task_id) {
                self.dispatch_load_task_event(task);
            }
        }
        completed
    }

    /// Blocks until every outstanding task completed and was dispatched.
    pub fn wait_for_all(&mut self) -> Vec<TaskId> {
        let mut completed = Vec::new();
        loop {
            completed.extend(self.poll());
            if self.tasks.is_empty() {
                break;
            }
            if self.completed_rx.recv().is_err() {
                break;
            }
        }
        self.next_task_id = 0;
        completed
    }

    fn dispatch_load_task_event(&mut self, task: ResourceLoadTask) {
        for identifier in task.identifiers() {
            if let Some(slot) = self
                .find_cache(identifier.tid)
                .and_then(|cache| cache.get_resource(identifier.id))
            {
                slot.write().batch_loaded();
            }
        }

        info!(
            "Load task {} complete: {} resources in {:.3} seconds",
            task.id(),
            task.identifiers().len(),
            task.duration().unwrap_or_default().as_secs_f32()
        );
        for listener in &self.listeners {
            listener.on_resource_load_task_completed(&task);
        }
    }

    /// Destroys resources created by the manager.
    pub fn unload_resources(&mut self, identifiers: &[ResourceIdentifier]) {
        for listener in &self.listeners {
            listener.on_resources_pre_unloaded(identifiers);
        }

        for identifier in identifiers {
            match self.get_cache(identifier.tid).destroy_resource(identifier.id) {
                Ok(()) => {
                    for listener in &self.listeners {
                        listener.on_resource_unloaded(identifier);
                    }
                }
                Err(err) => error!("Failed unloading resource {}: {}", identifier.id, err),
            }
        }

        for listener in &self.listeners {
            listener.on_resources_unloaded(identifiers);
        }
    }

    /// Creates a resource and loads it from `identifier.path` on the
    /// calling thread.
    pub fn open_resource(&mut self, identifier: &ResourceIdentifier) -> Result<ResourceSlot> {
        let cache = self.get_cache(identifier.tid);
        let create_fn = cache.create_fn();
        let slot = cache
            .create_resource(
                identifier.id,
                &identifier.name,
                &identifier.path,
                ResourceOwner::ResourceManager,
            )
            .ok_or(Error::ResourceExists(identifier.tid, identifier.id))?;

        {
            let mut resource = slot.write();
            if let Err(err) = resource.load_from_file(Path::new(&identifier.path)) {
                warn!(
                    "Opened resource {} ({}) with defaults: {}",
                    identifier.id, identifier.name, err
                );
                *resource = create_fn(identifier.id, &identifier.name, &identifier.path);
            }
            resource.upload();
        }
        Ok(slot)
    }

    /// Destroys a resource opened with [`Self::open_resource`], saving it
    /// to its file first if `save` is set.
    pub fn close_resource(&mut self, tid: ResourceType, id: ResourceId, save: bool) -> Result<()> {
        if save {
            self.save_resource(tid, id)?;
        }
        self.get_cache(tid).destroy_resource(id)
    }

    /// Serializes a resource to its file.
    pub fn save_resource(&self, tid: ResourceType, id: ResourceId) -> Result<()> {
        let slot = self
            .get_resource_slot(tid, id)
            .ok_or(Error::ResourceNotFound(tid, id))?;
        let resource = slot.read();
        let mut out = OStream::new();
        resource.save_to_stream(&mut out);
        out.check()?;
        archive::write_raw_file(resource.path(), out.data())?;
        Ok(())
    }

    /// Serializes a resource to its file and refreshes its metacache.
    pub fn resave_resource(&self, tid: ResourceType, id: ResourceId) -> Result<()> {
        let slot = self
            .get_resource_slot(tid, id)
            .ok_or(Error::ResourceNotFound(tid, id))?;
        let resource = slot.read();
        let mut out = OStream::new();
        resource.save_to_stream(&mut out);
        out.check()?;
        archive::write_raw_file(resource.path(), out.data())?;
        archive::write_raw_file(self.metacache_path(resource.path(), id), out.data())?;
        Ok(())
    }
}
