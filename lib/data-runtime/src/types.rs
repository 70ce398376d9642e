use core::fmt;
use std::hash::{Hash, Hasher};

use lina_serialization::{IStream, OStream, Result, StreamRead, StreamWrite};

/// A unique id of a resource.
///
/// Ids below [`RESOURCE_ID_CUSTOM_SPACE`] are reserved for engine resources
/// with hard-coded ids, ids above it are issued by the project.
pub type ResourceId = u64;

/// First id issued for project resources.
pub const RESOURCE_ID_CUSTOM_SPACE: ResourceId = 1_000_000;

/// First id of the range reserved for editor owned resources.
pub const RESOURCE_ID_ENGINE_SPACE: ResourceId = 1 << 62;

/// Reserved id terminating the record list of a package file.
pub const RESOURCE_ID_EOF: ResourceId = ResourceId::MAX;

/// Type id of a resource.
///
/// Computed from the type name with a crc32 so that it is stable across builds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceType(u32);

impl ResourceType {
    const CRC32_ALGO: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);

    /// Creates a new type id from series of bytes.
    ///
    /// It is recommended to use this method to define a public constant
    /// which can be used to identify a resource type.
    pub const fn new(v: &[u8]) -> Self {
        Self(Self::CRC32_ALGO.checksum(v))
    }

    /// Creates a type id from a raw value, as returned by [`Self::raw`].
    ///
    /// Any value is accepted, including 0.
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    /// Returns the raw value of the type id.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:#010x}", self.0))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StreamWrite for ResourceType {
    fn write_to(&self, out: &mut OStream) {
        self.0.write_to(out);
    }
}

impl StreamRead for ResourceType {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(Self(input.read()?))
    }
}

/// Package file a resource type is shipped in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PackageType {
    /// `LinaPackage0.linapkg`, which starts with the serialized project.
    Project,
    /// `LinaPackage1.linapkg`, which holds resource records only.
    Resources,
}

impl Default for PackageType {
    fn default() -> Self {
        Self::Resources
    }
}

/// Who destroys a cached resource.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ResourceOwner {
    /// Loaded and unloaded by the resource manager.
    ResourceManager,
    /// Created and destroyed explicitly by user code.
    UserCode,
}

/// Loading priority of an application resource.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ResourceTag {
    /// Loaded on demand.
    Default,
    /// Loaded before anything else, e.g. resources required by a splash screen.
    Priority,
    /// Loaded right after the priority resources, before the first frame.
    Core,
}

impl Default for ResourceTag {
    fn default() -> Self {
        Self::Default
    }
}

/// Everything needed to create and load a resource.
///
/// Two identifiers are the same load request when their id, name and type
/// match; the path, metadata flag and tag do not take part in comparisons.
#[derive(Clone, Debug, Default)]
pub struct ResourceIdentifier {
    /// Id of the resource.
    pub id: ResourceId,
    /// Type of the resource.
    pub tid: ResourceType,
    /// Display name, usually the file name.
    pub name: String,
    /// Path of the file the resource is loaded from in file mode.
    pub path: String,
    /// Ask the resource delegate for custom metadata before loading.
    pub use_custom_meta: bool,
    /// Application loading priority.
    pub tag: ResourceTag,
}

impl ResourceIdentifier {
    /// Creates an identifier with default metadata flag and tag.
    pub fn new(
        id: ResourceId,
        tid: ResourceType,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tid,
            name: name.into(),
            path: path.into(),
            use_custom_meta: false,
            tag: ResourceTag::Default,
        }
    }

    /// Sets the application tag.
    #[must_use]
    pub fn with_tag(mut self, tag: ResourceTag) -> Self {
        self.tag = tag;
        self
    }

    /// Requests custom metadata from the delegate before loading.
    #[must_use]
    pub fn with_custom_meta(mut self) -> Self {
        self.use_custom_meta = true;
        self
    }
}

impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.tid == other.tid
    }
}

impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
        self.tid.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const TEXTURE: ResourceType = ResourceType::new(b"Texture");
    const SHADER: ResourceType = ResourceType::new(b"Shader");

    #[test]
    fn type_ids_are_stable() {
        assert_eq!(TEXTURE, ResourceType::new(b"Texture"));
        assert_ne!(TEXTURE, SHADER);
        assert_eq!(ResourceType::from_raw(TEXTURE.raw()), TEXTURE);
        assert_eq!(ResourceType::from_raw(0).raw(), 0);
        assert_eq!(ResourceType::from_raw(0), ResourceType::default());
    }

    #[test]
    fn identifier_equality_ignores_path_and_flags() {
        let a = ResourceIdentifier::new(42, TEXTURE, "stone.png", "Resources/stone.png");
        let b = ResourceIdentifier::new(42, TEXTURE, "stone.png", "Other/stone.png")
            .with_custom_meta()
            .with_tag(ResourceTag::Core);
        let renamed = ResourceIdentifier::new(42, TEXTURE, "rock.png", "Resources/stone.png");
        let retyped = ResourceIdentifier::new(42, SHADER, "stone.png", "Resources/stone.png");

        let set: HashSet<_> = [a, b, renamed, retyped].into_iter().collect();
        assert_eq!(set.len(), 3);
    }
}
