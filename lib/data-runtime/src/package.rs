//! Package files consumed by shipped builds.
//!
//! ```markdown
//! LinaPackage0.linapkg
//! | u32 payload size | serialized project | records... | u64 RESOURCE_ID_EOF |
//!
//! LinaPackage1.linapkg
//! | records... | u64 RESOURCE_ID_EOF |
//!
//! record
//! | u64 resource id | u32 size | size bytes of the serialized resource |
//! ```
//!
//! There is no delimiter between records other than their declared size.

use std::{collections::HashSet, path::Path};

use lina_serialization::{archive, length_prefix, IStream, OStream};
use log::{error, warn};

use crate::{PackageType, ResourceId, Result, RESOURCE_ID_EOF};

/// File name of the package holding the serialized project.
pub const PACKAGE_0_FILENAME: &str = "LinaPackage0.linapkg";

/// File name of the package holding the resource records.
pub const PACKAGE_1_FILENAME: &str = "LinaPackage1.linapkg";

/// One serialized resource found in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Id of the resource.
    pub id: ResourceId,
    /// Serialized resource, as written by `Resource::save_to_stream`.
    pub data: Vec<u8>,
}

/// Writes one resource record.
///
/// Fails if the record does not fit its `u32` size.
pub fn write_record(out: &mut OStream, id: ResourceId, data: &[u8]) -> Result<()> {
    let size = length_prefix(data.len())?;
    out.write(&id).write(&size).write_raw(data);
    Ok(())
}

/// Writes the record list terminator.
pub fn write_sentinel(out: &mut OStream) {
    out.write(&RESOURCE_ID_EOF);
}

/// Writes the project header of package 0.
pub fn write_project_header(out: &mut OStream, project: &[u8]) -> Result<()> {
    let size = length_prefix(project.len())?;
    out.write(&size).write_raw(project);
    Ok(())
}

/// Reads the serialized project out of a package 0 file.
pub fn read_project_payload(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut input = IStream::new(archive::read_raw_file(path)?);
    let size: u32 = input.read()?;
    Ok(input.read_raw(size as usize)?.to_vec())
}

/// Collects the records of `wanted` resources from a package.
///
/// The scan stops at the sentinel, once every wanted record was found, or at
/// the first truncated record.
pub fn scan_records(
    input: &mut IStream,
    package_type: PackageType,
    wanted: &HashSet<ResourceId>,
) -> Vec<PackageRecord> {
    let mut found = Vec::new();
    if package_type == PackageType::Project {
        if let Err(err) = input
            .read::<u32>()
            .and_then(|size| input.skip_by(size as usize))
        {
            error!("Package header is truncated: {}", err);
            return found;
        }
    }

    while found.len() < wanted.len() {
        let id: ResourceId = match input.read() {
            Ok(id) => id,
            Err(err) => {
                error!("Package ended without a sentinel: {}", err);
                break;
            }
        };
        if id == RESOURCE_ID_EOF {
            break;
        }

        let size: u32 = match input.read() {
            Ok(size) => size,
            Err(err) => {
                error!("Package record {} is truncated: {}", id, err);
                break;
            }
        };

        if wanted.contains(&id) {
            match input.read_raw(size as usize) {
                Ok(data) => found.push(PackageRecord {
                    id,
                    data: data.to_vec(),
                }),
                Err(err) => {
                    error!("Package record {} is truncated: {}", id, err);
                    break;
                }
            }
        } else if let Err(err) = input.skip_by(size as usize) {
            error!("Package record {} is truncated: {}", id, err);
            break;
        }
    }

    if found.len() < wanted.len() {
        warn!(
            "{} requested resources are missing from the package",
            wanted.len() - found.len()
        );
    }
    found
}
