use std::path::PathBuf;

use thiserror::Error;

use crate::{ResourceId, ResourceType};

/// Error returned by the resource manager.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream or file codec failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] lina_serialization::Error),
    /// IO error on a resource, metacache or package file.
    #[error("IO on '{0}' failed with {1}")]
    Io(PathBuf, #[source] std::io::Error),
    /// No factory was registered for the type.
    #[error("unknown resource type {0}")]
    UnknownResourceType(ResourceType),
    /// The resource is not in its cache.
    #[error("resource {1} of type {0} not found")]
    ResourceNotFound(ResourceType, ResourceId),
    /// The resource is already in its cache.
    #[error("resource {1} of type {0} already exists")]
    ResourceExists(ResourceType, ResourceId),
    /// A manager-owned resource was destroyed through the user path or the opposite.
    #[error("resource {0} is not owned by the caller")]
    OwnershipMismatch(ResourceId),
    /// A load task with this id is still running.
    #[error("load task {0} is still in flight")]
    TaskInFlight(u32),
    /// Settings could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A result type that can be used with the runtime data crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
