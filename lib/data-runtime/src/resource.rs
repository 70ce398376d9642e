use std::{any::Any, collections::HashSet, path::Path};

use lina_serialization::{archive, IStream, OStream};

use crate::{ResourceId, ResourceType};

/// Types implementing `Resource` are engine assets that persist themselves
/// through the binary stream codec.
///
/// A resource is created empty by its type's factory, then populated by one
/// of the load paths of the [`ResourceManager`](crate::ResourceManager):
/// a source file, a project relative stream, or a package record.
///
/// Implementations write their own version tag at the start of
/// [`Resource::save_to_stream`], and must leave the resource in its default
/// state when [`Resource::load_from_stream`] meets another version.
pub trait Resource: Any + Send + Sync {
    /// Id of the resource, unique within a project.
    fn id(&self) -> ResourceId;

    /// Type id of the resource.
    fn resource_type(&self) -> ResourceType;

    /// Display name.
    fn name(&self) -> &str;

    /// Path of the file backing the resource, empty for generated resources.
    fn path(&self) -> &str;

    /// Writes the versioned representation of the resource.
    fn save_to_stream(&self, out: &mut OStream);

    /// Reads the representation written by [`Resource::save_to_stream`].
    fn load_from_stream(&mut self, input: &mut IStream) -> lina_serialization::Result<()>;

    /// Loads the resource from a file on disk.
    ///
    /// By default the whole file is read and handed to
    /// [`Resource::load_from_stream`]. Resources imported from foreign source
    /// formats override this.
    fn load_from_file(&mut self, path: &Path) -> lina_serialization::Result<()> {
        let bytes = archive::read_raw_file(path)?;
        self.load_from_stream(&mut IStream::new(bytes))
    }

    /// Receives custom preliminary metadata prepared by the application's
    /// resource delegate, before the resource is loaded.
    fn set_custom_meta(&mut self, _meta: &mut IStream) {
        // by default, do nothing
    }

    /// Hands the loaded data to the collaborators that need it, e.g. GPU uploads.
    fn upload(&mut self) {
        // by default, do nothing
    }

    /// Called once every resource of the load task it belongs to is loaded.
    fn batch_loaded(&mut self) {
        // by default, do nothing
    }

    /// Ids of the resources this resource references directly.
    fn resource_dependencies(&self) -> HashSet<ResourceId> {
        HashSet::new()
    }

    /// Cast to &dyn Any type.
    fn as_any(&self) -> &dyn Any;

    /// Cast to &mut dyn Any type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A resource with a statically known type id, which can be registered on
/// [`ResourceManagerOptions`](crate::ResourceManagerOptions).
pub trait TypedResource: Resource + Sized {
    /// Type id of the resource type.
    const TYPE: ResourceType;

    /// Name of the resource type, used in logs.
    const TYPENAME: &'static str;

    /// Creates an empty resource ready to be loaded.
    fn create(id: ResourceId, name: &str, path: &str) -> Self;
}

/// Factory of type-erased resource shells.
pub type CreateResourceFn = fn(ResourceId, &str, &str) -> Box<dyn Resource>;

pub(crate) fn create_boxed<T: TypedResource>(
    id: ResourceId,
    name: &str,
    path: &str,
) -> Box<dyn Resource> {
    Box::new(T::create(id, name, path))
}
