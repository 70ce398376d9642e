//! Offline management of Lina projects.
//!
//! A [`ProjectData`] is the editor-side view of a project: a tree of
//! [`ResourceDirectory`] nodes mirroring the folders and resources shown to
//! the user, backed by one serialized file per resource in the project's
//! resource cache. The [`packaging`] module turns a project into the package
//! files loaded by shipped builds through
//! [`lina_data_runtime::ResourceManager`].

// crate-specific lint exceptions:
#![warn(missing_docs)]

mod errors;
pub use errors::{Error, Result};

pub mod packaging;

mod resource;
pub use resource::*;
