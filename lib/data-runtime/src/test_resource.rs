//! Resource types used to test the resource pipeline.
//!
//! [`TestTexture`] imports raw bytes from source files and reacts to custom
//! metadata, [`TestMaterial`] and [`TestWorld`] reference other resources so
//! that dependency closures can be exercised.

use std::{any::Any, collections::HashSet, path::Path};

use lina_serialization::{archive, IStream, OStream};

use crate::{Resource, ResourceId, ResourceType, TypedResource};

macro_rules! impl_resource_header {
    () => {
        fn id(&self) -> ResourceId {
            self.id
        }

        fn resource_type(&self) -> ResourceType {
            <Self as TypedResource>::TYPE
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn path(&self) -> &str {
            &self.path
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

/// Texture-like resource holding raw pixel bytes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestTexture {
    /// Id of the resource.
    pub id: ResourceId,
    /// Name of the resource.
    pub name: String,
    /// Backing file.
    pub path: String,
    /// Pixel payload.
    pub pixels: Vec<u8>,
    /// Set from custom metadata before loading.
    pub srgb: bool,
    /// Number of `upload` calls.
    pub upload_count: u32,
    /// Set once the load task of the texture completed.
    pub batch_loaded: bool,
}

impl TestTexture {
    /// Current serialization version.
    pub const VERSION: u32 = 2;
}

impl Resource for TestTexture {
    impl_resource_header!();

    fn save_to_stream(&self, out: &mut OStream) {
        out.write(&Self::VERSION).write(&self.pixels);
    }

    fn load_from_stream(&mut self, input: &mut IStream) -> lina_serialization::Result<()> {
        input.read_version(Self::VERSION)?;
        self.pixels = input.read()?;
        Ok(())
    }

    /// Source images are imported byte for byte, anything else is a
    /// serialized texture.
    fn load_from_file(&mut self, path: &Path) -> lina_serialization::Result<()> {
        let bytes = archive::read_raw_file(path)?;
        if path.extension().map_or(false, |ext| ext == "png") {
            self.pixels = bytes;
            Ok(())
        } else {
            self.load_from_stream(&mut IStream::new(bytes))
        }
    }

    fn set_custom_meta(&mut self, meta: &mut IStream) {
        self.srgb = meta.read().unwrap_or(false);
    }

    fn upload(&mut self) {
        self.upload_count += 1;
    }

    fn batch_loaded(&mut self) {
        self.batch_loaded = true;
    }
}

impl TypedResource for TestTexture {
    const TYPE: ResourceType = ResourceType::new(b"TestTexture");
    const TYPENAME: &'static str = "TestTexture";

    fn create(id: ResourceId, name: &str, path: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            path: path.to_owned(),
            ..Self::default()
        }
    }
}

/// Material-like resource referencing a shader and textures.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestMaterial {
    /// Id of the resource.
    pub id: ResourceId,
    /// Name of the resource.
    pub name: String,
    /// Backing file.
    pub path: String,
    /// Referenced shader.
    pub shader: ResourceId,
    /// Referenced textures.
    pub textures: Vec<ResourceId>,
}

impl TestMaterial {
    /// Current serialization version.
    pub const VERSION: u32 = 1;
}

impl Resource for TestMaterial {
    impl_resource_header!();

    fn save_to_stream(&self, out: &mut OStream) {
        out.write(&Self::VERSION)
            .write(&self.shader)
            .write(&self.textures);
    }

    fn load_from_stream(&mut self, input: &mut IStream) -> lina_serialization::Result<()> {
        input.read_version(Self::VERSION)?;
        self.shader = input.read()?;
        self.textures = input.read()?;
        Ok(())
    }

    fn resource_dependencies(&self) -> HashSet<ResourceId> {
        std::iter::once(self.shader)
            .chain(self.textures.iter().copied())
            .filter(|id| *id != 0)
            .collect()
    }
}

impl TypedResource for TestMaterial {
    const TYPE: ResourceType = ResourceType::new(b"TestMaterial");
    const TYPENAME: &'static str = "TestMaterial";

    fn create(id: ResourceId, name: &str, path: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            path: path.to_owned(),
            ..Self::default()
        }
    }
}

/// World-like resource listing the resources its entities use.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestWorld {
    /// Id of the resource.
    pub id: ResourceId,
    /// Name of the resource.
    pub name: String,
    /// Backing file.
    pub path: String,
    /// Directly used resources.
    pub resources: Vec<ResourceId>,
}

impl TestWorld {
    /// Current serialization version.
    pub const VERSION: u32 = 1;
}

impl Resource for TestWorld {
    impl_resource_header!();

    fn save_to_stream(&self, out: &mut OStream) {
        out.write(&Self::VERSION).write(&self.resources);
    }

    fn load_from_stream(&mut self, input: &mut IStream) -> lina_serialization::Result<()> {
        input.read_version(Self::VERSION)?;
        self.resources = input.read()?;
        Ok(())
    }

    fn resource_dependencies(&self) -> HashSet<ResourceId> {
        self.resources.iter().copied().collect()
    }
}

impl TypedResource for TestWorld {
    const TYPE: ResourceType = ResourceType::new(b"TestWorld");
    const TYPENAME: &'static str = "TestWorld";

    fn create(id: ResourceId, name: &str, path: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            path: path.to_owned(),
            ..Self::default()
        }
    }
}

/// Serializes a resource the way it is stored in a project.
pub fn to_resource_bytes(resource: &dyn Resource) -> Vec<u8> {
    let mut out = OStream::new();
    resource.save_to_stream(&mut out);
    out.into_inner()
}
