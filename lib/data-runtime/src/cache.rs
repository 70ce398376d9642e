use std::{collections::HashMap, sync::Arc};

use log::{trace, warn};
use parking_lot::RwLock;

use crate::{
    resource::create_boxed, CreateResourceFn, Error, PackageType, Resource, ResourceId,
    ResourceOwner, ResourceType, Result, TypedResource,
};

/// Shared storage of one live resource.
///
/// Load jobs write into the slot from worker threads while the cache keeps
/// ownership of it.
pub type ResourceSlot = Arc<RwLock<Box<dyn Resource>>>;

/// Static description of a registered resource type.
#[derive(Clone)]
pub struct ResourceCacheFactory {
    resource_type: ResourceType,
    typename: &'static str,
    package_type: PackageType,
    extensions: Vec<String>,
    create_fn: CreateResourceFn,
}

impl ResourceCacheFactory {
    /// Describes `T`, shipped in `package_type` and imported from files with
    /// one of `extensions`.
    pub fn new<T: TypedResource>(package_type: PackageType, extensions: &[&str]) -> Self {
        Self {
            resource_type: T::TYPE,
            typename: T::TYPENAME,
            package_type,
            extensions: extensions.iter().map(|ext| ext.to_lowercase()).collect(),
            create_fn: create_boxed::<T>,
        }
    }

    /// Type id of the registered type.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Package the resources of this type ship in.
    pub fn package_type(&self) -> PackageType {
        self.package_type
    }

    /// Returns true if source files with extension `ext` import as this type.
    pub fn supports_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }

    pub(crate) fn create_cache(&self) -> ResourceCache {
        ResourceCache {
            factory: self.clone(),
            resources: HashMap::new(),
        }
    }
}

struct CachedResource {
    slot: ResourceSlot,
    owner: ResourceOwner,
}

/// Pool of live resources of one type.
pub struct ResourceCache {
    factory: ResourceCacheFactory,
    resources: HashMap<ResourceId, CachedResource>,
}

impl ResourceCache {
    /// Type of the cached resources.
    pub fn resource_type(&self) -> ResourceType {
        self.factory.resource_type
    }

    /// Name of the cached resource type.
    pub fn typename(&self) -> &'static str {
        self.factory.typename
    }

    /// Package the resources of this type ship in.
    pub fn package_type(&self) -> PackageType {
        self.factory.package_type
    }

    /// Returns true if source files with extension `ext` import as this type.
    pub fn supports_extension(&self, ext: &str) -> bool {
        self.factory.supports_extension(ext)
    }

    /// Creates an empty resource shell.
    ///
    /// Returns `None` if a resource with this id already exists.
    pub fn create_resource(
        &mut self,
        id: ResourceId,
        name: &str,
        path: &str,
        owner: ResourceOwner,
    ) -> Option<ResourceSlot> {
        if self.resources.contains_key(&id) {
            warn!(
                "{} {} ({}) already exists, not creating it again",
                self.factory.typename, id, name
            );
            return None;
        }
        let slot = Arc::new(RwLock::new(self.create_shell(id, name, path)));
        self.resources.insert(
            id,
            CachedResource {
                slot: Arc::clone(&slot),
                owner,
            },
        );
        trace!("Created {} {} ({})", self.factory.typename, id, name);
        Some(slot)
    }

    pub(crate) fn create_fn(&self) -> CreateResourceFn {
        self.factory.create_fn
    }

    /// Creates a detached, default resource of this type.
    pub fn create_shell(&self, id: ResourceId, name: &str, path: &str) -> Box<dyn Resource> {
        (self.factory.create_fn)(id, name, path)
    }

    /// Destroys a resource created by the manager.
    pub fn destroy_resource(&mut self, id: ResourceId) -> Result<()> {
        self.destroy(id, ResourceOwner::ResourceManager)
    }

    /// Destroys a resource created by user code.
    pub fn destroy_user_resource(&mut self, id: ResourceId) -> Result<()> {
        self.destroy(id, ResourceOwner::UserCode)
    }

    fn destroy(&mut self, id: ResourceId, owner: ResourceOwner) -> Result<()> {
        match self.resources.get(&id) {
            None => Err(Error::ResourceNotFound(self.factory.resource_type, id)),
            Some(cached) if cached.owner != owner => Err(Error::OwnershipMismatch(id)),
            Some(_) => {
                self.resources.remove(&id);
                trace!("Destroyed {} {}", self.factory.typename, id);
                Ok(())
            }
        }
    }

    /// Returns the slot of a resource.
    pub fn get_resource(&self, id: ResourceId) -> Option<&ResourceSlot> {
        self.resources.get(&id).map(|cached| &cached.slot)
    }

    /// Returns who owns a resource.
    pub fn owner(&self, id: ResourceId) -> Option<ResourceOwner> {
        self.resources.get(&id).map(|cached| cached.owner)
    }

    /// Returns true if the resource is in the cache.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Slots of all cached resources, optionally including user managed ones.
    pub fn all_resources(&self, include_user_managed: bool) -> Vec<ResourceSlot> {
        self.resources
            .values()
            .filter(|cached| include_user_managed || cached.owner == ResourceOwner::ResourceManager)
            .map(|cached| Arc::clone(&cached.slot))
            .collect()
    }

    /// Number of cached resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
