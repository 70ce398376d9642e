//! Binary serialization layer of the Lina resource pipeline.
//!
//! Every persisted engine object (resources, project data, package headers)
//! goes through the types of this crate:
//!
//! * [`OStream`] / [`IStream`]: little-endian in-memory streams.
//! * [`Versioned`]: objects prefixed by a `u32` version tag when saved.
//!   Loading an object of another version yields a default-constructed object
//!   and a [`LoadResult::VersionMismatch`].
//! * [`archive`]: file helpers, with an lz4 compressed variant.
//! * [`StringId`]: 64 bit string hashes.
//!
//! ## Stream layout
//!
//! ```markdown
//! | u8/u16/u32/u64, i*, f32/f64 | little-endian                  |
//! | bool                        | one byte, 0 or 1               |
//! | usize                       | u32                            |
//! | String                      | u32 byte length, utf-8 bytes   |
//! | Vec<T>                      | u32 element count, elements    |
//! ```

// crate-specific lint exceptions:
#![warn(missing_docs)]

pub mod archive;
pub use archive::{LoadResult, Versioned};

pub mod compression;

mod errors;
pub use errors::{Error, Result};

mod stream;
pub use stream::*;

mod string_id;
pub use string_id::StringId;
