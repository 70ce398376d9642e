use std::{collections::HashSet, fs};

use lina_data_runtime::ResourceId;
use log::{info, warn};

use crate::{resource::RESOURCE_EXTENSION, Error, ProjectData, Result};

/// What [`ProjectData::verify_project_resources`] cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Resources whose directory was removed because their file is missing.
    pub removed_directories: Vec<ResourceId>,
    /// Resource files deleted because no directory refers to them.
    pub deleted_files: Vec<ResourceId>,
}

impl VerifyReport {
    /// Returns `true` if the project was already consistent.
    pub fn is_clean(&self) -> bool {
        self.removed_directories.is_empty() && self.deleted_files.is_empty()
    }
}

fn parse_resource_file_name(name: &str) -> Option<ResourceId> {
    name.strip_prefix("Resource_")?
        .strip_suffix(RESOURCE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

impl ProjectData {
    /// Reconciles the directory tree with the resource cache.
    ///
    /// Resource directories whose file is missing are removed from the tree,
    /// and resource files no directory refers to are deleted. Other files of
    /// the cache are left alone. The project is not saved.
    pub fn verify_project_resources(&mut self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        let dangling: Vec<_> = self
            .directories()
            .descendants(self.root())
            .into_iter()
            .filter_map(|key| {
                let node = self.directory(key)?;
                (!node.is_folder && !self.resource_path(node.resource_id).exists())
                    .then(|| (key, node.resource_id))
            })
            .collect();
        for (key, id) in dangling {
            warn!("Resource {} has no file, removing its directory", id);
            self.destroy_resource_directory(key);
            report.removed_directories.push(id);
        }

        let referenced: HashSet<ResourceId> = self
            .resource_identifiers()
            .into_iter()
            .map(|identifier| identifier.id)
            .collect();

        let cache_dir = self.resource_cache_dir();
        if cache_dir.is_dir() {
            let entries = fs::read_dir(&cache_dir).map_err(|e| Error::Io(cache_dir.clone(), e))?;
            for entry in entries {
                let path = entry.map_err(|e| Error::Io(cache_dir.clone(), e))?.path();
                let id = match path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(parse_resource_file_name)
                {
                    Some(id) => id,
                    None => continue,
                };
                if !referenced.contains(&id) {
                    fs::remove_file(&path).map_err(|e| Error::Io(path.clone(), e))?;
                    report.deleted_files.push(id);
                }
            }
        }
        report.deleted_files.sort_unstable();

        if !report.is_clean() {
            info!(
                "Verified project {}: removed {} directories, deleted {} files",
                self.name(),
                report.removed_directories.len(),
                report.deleted_files.len()
            );
        }
        Ok(report)
    }
}
