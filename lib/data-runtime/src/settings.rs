use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{Error, PackageType, Result};

/// Name of the settings file looked up next to the running executable.
pub const DEFAULT_CONFIG_FILENAME: &str = "linaresources.toml";

/// Where resources are read from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceManagerMode {
    /// Individual files, as in the editor.
    File,
    /// Package files, as in shipped builds.
    Package,
}

impl Default for ResourceManagerMode {
    fn default() -> Self {
        Self::File
    }
}

/// Configuration of a [`ResourceManager`](crate::ResourceManager).
///
/// Read from the `[resource_manager]` section of a toml document:
///
/// ```toml
/// [resource_manager]
/// mode = "package"
/// worker_threads = 4
/// package_1_path = "Data/LinaPackage1.linapkg"
/// ```
///
/// Missing keys keep their default value.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(default)]
pub struct ResourceManagerSettings {
    /// Folder of the engine resources, relative to the working directory.
    pub resources_folder: PathBuf,
    /// Folder receiving metacache files of resources loaded from source files.
    pub metacache_folder: PathBuf,
    /// Package holding the serialized project.
    pub package_0_path: PathBuf,
    /// Package holding the resource records.
    pub package_1_path: PathBuf,
    /// Number of loader threads, 0 for one per logical core.
    pub worker_threads: usize,
    /// Where resources are read from.
    pub mode: ResourceManagerMode,
}

impl Default for ResourceManagerSettings {
    fn default() -> Self {
        Self {
            resources_folder: PathBuf::from("Resources/"),
            metacache_folder: PathBuf::from("Resources/Metacache/"),
            package_0_path: PathBuf::from(crate::PACKAGE_0_FILENAME),
            package_1_path: PathBuf::from(crate::PACKAGE_1_FILENAME),
            worker_threads: 0,
            mode: ResourceManagerMode::File,
        }
    }
}

#[derive(Deserialize, Default)]
struct SettingsDocument {
    #[serde(default)]
    resource_manager: ResourceManagerSettings,
}

impl ResourceManagerSettings {
    /// Parses settings from a toml document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let document: SettingsDocument = toml::from_str(toml)?;
        Ok(document.resource_manager)
    }

    /// Reads settings from a toml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml = fs::read_to_string(path).map_err(|e| Error::Io(path.to_owned(), e))?;
        Self::from_toml_str(&toml)
    }

    /// Reads settings from a toml file, falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|err| {
            log::warn!(
                "Failed to read resource settings {:?}: {}",
                path.as_ref(),
                err
            );
            Self::default()
        })
    }

    /// Path of the package file resources of `package_type` ship in.
    pub fn package_path(&self, package_type: PackageType) -> &Path {
        match package_type {
            PackageType::Project => &self.package_0_path,
            PackageType::Resources => &self.package_1_path,
        }
    }
}
