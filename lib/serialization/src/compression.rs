use std::io::{Read, Write};

use crate::{Error, Result};

/// Compresses `src` into an lz4 frame.
pub fn compress(src: &[u8]) -> Result<Vec<u8>> {
    let mut compressed = Vec::with_capacity(src.len() / 2);
    let mut encoder = lz4::EncoderBuilder::new()
        .level(10)
        .build(&mut compressed)
        .map_err(Error::Compression)?;
    encoder.write_all(src).map_err(Error::Compression)?;
    let (_writer, res) = encoder.finish();
    res.map_err(Error::Compression)?;
    Ok(compressed)
}

/// Decompresses an lz4 frame produced by [`compress`].
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    let mut decoder = lz4::Decoder::new(compressed).map_err(Error::Compression)?;
    decoder
        .read_to_end(&mut decompressed)
        .map_err(Error::Compression)?;
    let (_reader, res) = decoder.finish();
    res.map_err(Error::Compression)?;
    Ok(decompressed)
}
