//! In-memory binary streams.
//!
//! [`OStream`] accumulates little-endian encoded values into a growable
//! buffer, [`IStream`] reads them back through a bounds-checked cursor.
//! Values are written through the [`StreamWrite`] trait and read through
//! [`StreamRead`], which are implemented for the primitive types, `String`,
//! and `Vec<T>`.
//!
//! Platform sized integers (`usize`) are always encoded as `u32`, and strings
//! and vectors are prefixed with their `u32` length. A length that does not
//! fit is recorded by the [`OStream`] and reported by [`OStream::check`] and
//! [`OStream::finish`].

use byteorder::{ByteOrder, LittleEndian};

use crate::{Error, Result};

/// A value that can be written into an [`OStream`].
pub trait StreamWrite {
    /// Appends the encoded representation of `self` to `out`.
    fn write_to(&self, out: &mut OStream);
}

/// A value that can be read from an [`IStream`].
pub trait StreamRead: Sized {
    /// Decodes one value from the current position of `input`.
    fn read_from(input: &mut IStream) -> Result<Self>;
}

/// Converts a length to its `u32` stream prefix.
pub fn length_prefix(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::LengthOverflow(len))
}

/// Growable output buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OStream {
    data: Vec<u8>,
    overflow: Option<usize>,
}

impl OStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stream with pre-allocated storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            overflow: None,
        }
    }

    /// Writes a value and returns the stream for chaining.
    pub fn write<T: StreamWrite + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.write_to(self);
        self
    }

    /// Appends raw bytes without any length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops everything past `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Written bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the stream and returns its buffer.
    ///
    /// Use [`Self::finish`] when the bytes leave the process.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Fails if a written length did not fit its `u32` prefix.
    pub fn check(&self) -> Result<()> {
        match self.overflow {
            Some(len) => Err(Error::LengthOverflow(len)),
            None => Ok(()),
        }
    }

    /// Consumes the stream and returns its buffer if every length fit.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.check()?;
        Ok(self.data)
    }
}

/// Read cursor over an owned buffer.
#[derive(Debug, Default, Clone)]
pub struct IStream {
    data: Vec<u8>,
    index: usize,
}

impl IStream {
    /// Creates a stream positioned at the start of `data`.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, index: 0 }
    }

    /// Creates a stream over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    /// Reads one value.
    pub fn read<T: StreamRead>(&mut self) -> Result<T> {
        T::read_from(self)
    }

    /// Reads `len` raw bytes and advances past them.
    pub fn read_raw(&mut self, len: usize) -> Result<&[u8]> {
        self.check_available(len)?;
        let start = self.index;
        self.index += len;
        Ok(&self.data[start..self.index])
    }

    /// Reads a `u32` version tag and checks it against `expected`.
    pub fn read_version(&mut self, expected: u32) -> Result<()> {
        let found: u32 = self.read()?;
        if found != expected {
            return Err(Error::VersionMismatch { expected, found });
        }
        Ok(())
    }

    /// Advances the cursor by `len` bytes without decoding them.
    pub fn skip_by(&mut self, len: usize) -> Result<()> {
        self.check_available(len)?;
        self.index += len;
        Ok(())
    }

    /// Moves the cursor to an absolute offset, clamped to the buffer size.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.data.len());
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Total size of the underlying buffer.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Returns true once the cursor reached the end of the buffer.
    pub fn is_completed(&self) -> bool {
        self.index >= self.data.len()
    }

    /// Unread part of the buffer.
    pub fn data_current(&self) -> &[u8] {
        &self.data[self.index..]
    }

    /// Consumes the stream and returns its buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn check_available(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::UnexpectedEof {
                offset: self.index,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

impl From<Vec<u8>> for IStream {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<OStream> for IStream {
    fn from(stream: OStream) -> Self {
        Self::new(stream.into_inner())
    }
}

macro_rules! impl_stream_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl StreamWrite for $ty {
            fn write_to(&self, out: &mut OStream) {
                let mut buf = [0_u8; std::mem::size_of::<$ty>()];
                LittleEndian::$write(&mut buf, *self);
                out.write_raw(&buf);
            }
        }

        impl StreamRead for $ty {
            fn read_from(input: &mut IStream) -> Result<Self> {
                let bytes = input.read_raw(std::mem::size_of::<$ty>())?;
                Ok(LittleEndian::$read(bytes))
            }
        }
    };
}

impl_stream_primitive!(u16, write_u16, read_u16);
impl_stream_primitive!(u32, write_u32, read_u32);
impl_stream_primitive!(u64, write_u64, read_u64);
impl_stream_primitive!(i16, write_i16, read_i16);
impl_stream_primitive!(i32, write_i32, read_i32);
impl_stream_primitive!(i64, write_i64, read_i64);
impl_stream_primitive!(f32, write_f32, read_f32);
impl_stream_primitive!(f64, write_f64, read_f64);

impl StreamWrite for u8 {
    fn write_to(&self, out: &mut OStream) {
        out.write_raw(&[*self]);
    }
}

impl StreamRead for u8 {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(input.read_raw(1)?[0])
    }
}

impl StreamWrite for i8 {
    fn write_to(&self, out: &mut OStream) {
        out.write_raw(&self.to_le_bytes());
    }
}

impl StreamRead for i8 {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(input.read_raw(1)?[0] as Self)
    }
}

impl StreamWrite for bool {
    fn write_to(&self, out: &mut OStream) {
        u8::from(*self).write_to(out);
    }
}

impl StreamRead for bool {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(u8::read_from(input)? != 0)
    }
}

impl StreamWrite for usize {
    fn write_to(&self, out: &mut OStream) {
        match length_prefix(*self) {
            Ok(len) => len.write_to(out),
            Err(_) => {
                out.overflow.get_or_insert(*self);
                u32::MAX.write_to(out);
            }
        }
    }
}

impl StreamRead for usize {
    fn read_from(input: &mut IStream) -> Result<Self> {
        Ok(u32::read_from(input)? as Self)
    }
}

impl StreamWrite for str {
    fn write_to(&self, out: &mut OStream) {
        self.len().write_to(out);
        out.write_raw(self.as_bytes());
    }
}

impl StreamWrite for String {
    fn write_to(&self, out: &mut OStream) {
        self.as_str().write_to(out);
    }
}

impl StreamRead for String {
    fn read_from(input: &mut IStream) -> Result<Self> {
        let len = usize::read_from(input)?;
        let bytes = input.read_raw(len)?.to_vec();
        Ok(Self::from_utf8(bytes)?)
    }
}

impl<T: StreamWrite> StreamWrite for [T] {
    fn write_to(&self, out: &mut OStream) {
        self.len().write_to(out);
        for item in self {
            item.write_to(out);
        }
    }
}

impl<T: StreamWrite> StreamWrite for Vec<T> {
    fn write_to(&self, out: &mut OStream) {
        self.as_slice().write_to(out);
    }
}

impl<T: StreamRead> StreamRead for Vec<T> {
    fn read_from(input: &mut IStream) -> Result<Self> {
        let len = usize::read_from(input)?;
        // a corrupted length must not trigger a huge allocation up front
        let mut items = Self::with_capacity(len.min(input.remaining()));
        for _ in 0..len {
            items.push(T::read_from(input)?);
        }
        Ok(items)
    }
}
