use std::path::PathBuf;

use thiserror::Error;

use lina_serialization::LoadResult;

/// Error returned by the offline data crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream or file codec failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] lina_serialization::Error),
    /// Resource manager failure.
    #[error("resource manager error: {0}")]
    Runtime(#[from] lina_data_runtime::Error),
    /// IO error on a project or package file.
    #[error("IO on '{0}' failed with {1}")]
    Io(PathBuf, #[source] std::io::Error),
    /// The project file could not be loaded.
    #[error("failed loading project '{0}': {1:?}")]
    Load(PathBuf, LoadResult),
    /// The directory cannot hold children.
    #[error("directory '{0}' is not a folder")]
    NotAFolder(String),
}

/// A result type that can be used with the offline data crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
