//! Hashed string identifiers.
//!
//! A [`StringId`] is a 64 bit hash of a string. It is used wherever a string
//! only needs to be compared, like the modification stamp stored with each
//! resource directory.
//!
//! ```
//! # use lina_serialization::{sid, StringId};
//! let sid = sid!("Resources/Models");
//! assert_eq!(sid, StringId::compute_new("Resources/Models"));
//! ```

use std::fmt;

use crate::{IStream, OStream, Result, StreamRead, StreamWrite};

const CRC64_ALGO: crc::Crc<u64> = crc::Crc::<u64>::new(&crc::CRC_64_ECMA_182);

/// Hashed string representation.
#[derive(Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct StringId(u64);

impl StringId {
    /// Creates a `StringId` from a raw integer value.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Hashes `name` at runtime.
    ///
    /// `sid!` should be preferred for literals as it hashes at compile time.
    pub const fn compute_new(name: &str) -> Self {
        Self(CRC64_ALGO.checksum(name.as_bytes()))
    }

    /// Raw hash value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringId").field(&self.0).finish()
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StreamWrite for StringId {
    fn write_to(&self, out: &mut OStream) {
        self.0.write_to(out);
    }
}

impl StreamRead for StringId {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(Self(input.read()?))
    }
}

/// Computes `StringId` value at compile time.
#[macro_export]
macro_rules! sid {
    ($s:expr) => {{
        const SID: $crate::StringId = $crate::StringId::compute_new($s);
        SID
    }};
}

#[cfg(test)]
mod tests {
    use super::StringId;

    #[test]
    fn basic() {
        // CRC-64/ECMA-182 check value
        let raw = StringId::from_raw(0x6C40_DF5F_0B49_7347);
        assert_eq!(raw, sid!("123456789"));
        assert_eq!(raw, StringId::compute_new("123456789"));
    }

    #[test]
    fn distinct_strings() {
        assert_ne!(sid!("Textures"), sid!("textures"));
        assert_eq!(StringId::default().raw(), 0);
    }
}
