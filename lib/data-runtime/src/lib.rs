//! Runtime resource management of the Lina data pipeline.
//!
//! This crate owns the live [`Resource`] objects of an application. Each
//! registered resource type gets a [`ResourceCache`]; the
//! [`ResourceManager`] turns sets of [`ResourceIdentifier`]s into loaded
//! resources and reports completed batches to its listeners.
//!
//! ## Loading
//!
//! Resources are loaded in batches, a [`ResourceLoadTask`] per request:
//! - Duplicate identifiers (same id, name and type) are collapsed.
//! - An empty resource shell is created in its cache for every identifier,
//!   before anything is read.
//! - One job per resource runs on the loader pool. Each job asks the
//!   [`ResourceDelegate`] for custom metadata when requested, then reads the
//!   resource from its source:
//!     - a source file, through a metacache (`load_resources_from_file`),
//!     - a file stored by a project (`load_resources_from_project`),
//!     - a record of a package file (`load_resources_from_package`).
//! - Once every job finished, [`ResourceManager::poll`] calls
//!   [`Resource::batch_loaded`] on each resource of the batch and notifies
//!   the listeners once.
//!
//! A resource whose file is missing, truncated or written with another
//! version stays default constructed. The failure is logged and the batch
//! still completes.
//!
//! ## Package files
//!
//! Shipped builds read resources from two package files, see [`package`].

// crate-specific lint exceptions:
#![warn(missing_docs)]

mod cache;
pub use cache::*;

mod errors;
pub use errors::{Error, Result};

mod load_task;
pub use load_task::*;

pub mod package;
pub use package::{PACKAGE_0_FILENAME, PACKAGE_1_FILENAME};

mod resource;
pub use resource::*;

mod resource_manager;
pub use resource_manager::*;

mod settings;
pub use settings::*;

mod types;
pub use types::*;

#[cfg(any(test, feature = "test-resources"))]
pub mod test_resource;
