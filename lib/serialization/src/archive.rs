//! Versioned file envelope.
//!
//! A serialized file starts with the `u32` version of the object it holds,
//! followed by the object's own stream. Loading a file whose version differs
//! from [`Versioned::VERSION`] leaves the target object in its default state.
//!
//! ```markdown
//! |--- u32 version ---|--- object payload ---|
//! ```
//!
//! The archive variants store the same envelope inside an lz4 frame.

use std::{fs, path::Path};

use log::{error, warn};

use crate::{compression, Error, IStream, OStream, Result};

/// An object persisted with a version tag.
pub trait Versioned {
    /// Current on-disk version of the object's payload.
    const VERSION: u32;

    /// Writes the payload, excluding the version tag.
    fn save_to_stream(&self, out: &mut OStream);

    /// Reads the payload written by [`Self::save_to_stream`].
    fn load_from_stream(&mut self, input: &mut IStream) -> Result<()>;
}

/// Outcome of loading a versioned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    /// The object was populated from the file.
    Ok,
    /// The file does not exist or cannot be read.
    NotFound,
    /// The file was written with another version of the object.
    VersionMismatch {
        /// Version the object expects.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },
    /// The payload is truncated or corrupted.
    Malformed,
}

impl LoadResult {
    /// Returns true if the object was populated.
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Writes the version tag followed by the object's payload.
pub fn write_versioned<T: Versioned>(obj: &T, out: &mut OStream) {
    out.write(&T::VERSION);
    obj.save_to_stream(out);
}

/// Serializes an object into a standalone envelope.
pub fn to_bytes<T: Versioned>(obj: &T) -> Result<Vec<u8>> {
    let mut out = OStream::new();
    write_versioned(obj, &mut out);
    out.finish()
}

/// Reads the version tag and, if it matches, the object's payload.
///
/// On anything but [`LoadResult::Ok`] the object is reset to its default.
pub fn read_versioned<T: Versioned + Default>(input: &mut IStream, obj: &mut T) -> LoadResult {
    let found = match input.read::<u32>() {
        Ok(version) => version,
        Err(_) => {
            *obj = T::default();
            return LoadResult::Malformed;
        }
    };

    if found != T::VERSION {
        warn!(
            "Version mismatch: expected {}, found {}. Using defaults.",
            T::VERSION,
            found
        );
        *obj = T::default();
        return LoadResult::VersionMismatch {
            expected: T::VERSION,
            found,
        };
    }

    match obj.load_from_stream(input) {
        Ok(()) => LoadResult::Ok,
        Err(err) => {
            error!("Malformed payload: {}", err);
            *obj = T::default();
            LoadResult::Malformed
        }
    }
}

/// Deserializes an envelope produced by [`to_bytes`].
pub fn from_bytes<T: Versioned + Default>(bytes: Vec<u8>, obj: &mut T) -> LoadResult {
    read_versioned(&mut IStream::new(bytes), obj)
}

/// Writes raw bytes to `path`, replacing any previous file.
///
/// Missing parent directories are created.
pub fn write_raw_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path).map_err(|e| Error::Io(path.to_owned(), e))?;
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::Io(parent.to_owned(), e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| Error::Io(path.to_owned(), e))
}

/// Reads the whole file at `path`.
pub fn read_raw_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Io(path.to_owned(), e))
}

/// Saves an object into a versioned file.
pub fn save_to_file<T: Versioned>(path: impl AsRef<Path>, obj: &T) -> Result<()> {
    write_raw_file(path, &to_bytes(obj)?)
}

/// Loads an object from a versioned file.
pub fn load_from_file<T: Versioned + Default>(path: impl AsRef<Path>, obj: &mut T) -> LoadResult {
    match read_raw_file(path) {
        Ok(bytes) => from_bytes(bytes, obj),
        Err(err) => {
            error!("Failed to open file for loading: {}", err);
            *obj = T::default();
            LoadResult::NotFound
        }
    }
}

/// Saves an object into an lz4 compressed versioned file.
pub fn save_archive_to_file<T: Versioned>(path: impl AsRef<Path>, obj: &T) -> Result<()> {
    let compressed = compression::compress(&to_bytes(obj)?)?;
    write_raw_file(path, &compressed)
}

/// Loads an object from a file written by [`save_archive_to_file`].
pub fn load_archive_from_file<T: Versioned + Default>(
    path: impl AsRef<Path>,
    obj: &mut T,
) -> LoadResult {
    let compressed = match read_raw_file(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("Failed to open archive for loading: {}", err);
            *obj = T::default();
            return LoadResult::NotFound;
        }
    };
    match compression::decompress(&compressed) {
        Ok(bytes) => from_bytes(bytes, obj),
        Err(err) => {
            error!("Failed to decompress archive: {}", err);
            *obj = T::default();
            LoadResult::Malformed
        }
    }
}
