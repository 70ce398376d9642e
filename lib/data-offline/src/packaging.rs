//! Packaging of a project into the package files read by shipped builds.
//!
//! Only the worlds listed in [`PackagingSettings::world_ids_to_pack`] and the
//! resources they depend on, transitively, are packed. Each resource is
//! written once, in discovery order, to the package of its type (see
//! [`lina_data_runtime::package`]).

use std::{
    collections::{HashSet, VecDeque},
    path::Path,
};

use lina_data_runtime::{
    package, PackageType, ResourceId, ResourceIdentifier, ResourceManager, PACKAGE_0_FILENAME,
    PACKAGE_1_FILENAME,
};
use lina_serialization::{archive, IStream, OStream};
use log::{info, warn};

use crate::{ProjectData, Result};

/// Project settings driving [`package_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagingSettings {
    /// Worlds shipped with the build.
    pub world_ids_to_pack: Vec<ResourceId>,
    /// Name of the shipped executable.
    pub executable_name: String,
}

impl PackagingSettings {
    /// Writes the settings to a project stream.
    pub fn save_to_stream(&self, out: &mut OStream) {
        out.write(&self.world_ids_to_pack)
            .write(&self.executable_name);
    }

    /// Reads settings written by [`Self::save_to_stream`].
    pub fn load_from_stream(input: &mut IStream) -> lina_serialization::Result<Self> {
        Ok(Self {
            world_ids_to_pack: input.read()?,
            executable_name: input.read()?,
        })
    }
}

/// Outcome of [`package_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// Packed resources, in the order they were written.
    pub packed: Vec<ResourceId>,
    /// Resources that were referenced but could not be packed.
    pub skipped: Vec<ResourceId>,
}

/// Writes `LinaPackage0.linapkg` and `LinaPackage1.linapkg` to `out_dir`.
///
/// Package 0 starts with the serialized project and holds the records of
/// [`PackageType::Project`] resources, package 1 holds every other record.
/// Resources loaded in `manager` are packed as they are in memory, unsaved
/// edits included. The others are opened from the project's resource cache
/// and closed again without saving. Resources that are not in the project
/// tree, have no file or have an unregistered type are skipped and logged.
///
/// A record and the dependencies followed from it always come from the same
/// resource object.
pub fn package_project(
    project: &ProjectData,
    manager: &mut ResourceManager,
    out_dir: impl AsRef<Path>,
) -> Result<PackageReport> {
    let out_dir = out_dir.as_ref();
    let mut report = PackageReport::default();

    let mut package_0 = OStream::new();
    package::write_project_header(&mut package_0, &archive::to_bytes(project)?)?;
    let mut package_1 = OStream::new();

    let mut visited = HashSet::new();
    let mut queue: VecDeque<ResourceId> = project
        .packaging_settings()
        .world_ids_to_pack
        .iter()
        .copied()
        .collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }

        let identifier = match project
            .find_resource_directory(id)
            .and_then(|dir| project.resource_identifier(dir))
        {
            Some(identifier) => identifier,
            None => {
                warn!("Resource {} is not part of the project, skipped", id);
                report.skipped.push(id);
                continue;
            }
        };

        let package_type = match manager.package_type(identifier.tid) {
            Ok(package_type) => package_type,
            Err(err) => {
                warn!("Resource {} ({}) skipped: {}", id, identifier.name, err);
                report.skipped.push(id);
                continue;
            }
        };

        if manager.get_resource_slot(identifier.tid, id).is_none()
            && !Path::new(&identifier.path).is_file()
        {
            warn!(
                "Resource {} ({}) skipped: no file at {}",
                id, identifier.name, identifier.path
            );
            report.skipped.push(id);
            continue;
        }

        let (data, dependencies) = resource_record(manager, &identifier)?;
        let mut dependencies: Vec<_> = dependencies.into_iter().collect();
        dependencies.sort_unstable();
        queue.extend(dependencies);

        match package_type {
            PackageType::Project => package::write_record(&mut package_0, id, &data)?,
            PackageType::Resources => package::write_record(&mut package_1, id, &data)?,
        }
        report.packed.push(id);
    }

    package::write_sentinel(&mut package_0);
    package::write_sentinel(&mut package_1);
    archive::write_raw_file(out_dir.join(PACKAGE_0_FILENAME), package_0.data())?;
    archive::write_raw_file(out_dir.join(PACKAGE_1_FILENAME), package_1.data())?;

    info!(
        "Packaged project {} to {:?}: {} resources, {} skipped",
        project.name(),
        out_dir,
        report.packed.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Serializes a resource and collects its direct dependencies.
fn resource_record(
    manager: &mut ResourceManager,
    identifier: &ResourceIdentifier,
) -> Result<(Vec<u8>, HashSet<ResourceId>)> {
    let (slot, opened) = match manager.get_resource_slot(identifier.tid, identifier.id) {
        Some(slot) => (slot, false),
        None => (manager.open_resource(identifier)?, true),
    };

    let record = {
        let resource = slot.read();
        let mut out = OStream::new();
        resource.save_to_stream(&mut out);
        out.finish()
            .map(|data| (data, resource.resource_dependencies()))
    };

    if opened {
        manager.close_resource(identifier.tid, identifier.id, false)?;
    }
    Ok(record?)
}
