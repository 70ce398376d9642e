use std::path::PathBuf;

use thiserror::Error;

/// An error type for the serialization crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of stream: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("invalid utf-8 string in stream: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("length {0} does not fit in a u32 prefix")]
    LengthOverflow(usize),
    #[error("IO on '{0}' failed with {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("lz4 compression failed: {0}")]
    Compression(#[source] std::io::Error),
}

/// A result type that can be used with the serialization crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
