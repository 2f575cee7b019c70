////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! QFS, the Maxis flavour of RefPack, used for compressed package entries.
//!
//! Both directions work on whole buffers. The stream based functions only
//! read everything into memory before handing off to the buffer ones.

pub mod compression;
pub mod control;
pub mod decompression;
pub mod header;
pub(crate) mod match_length;

use std::io::{Read, Write};

pub use compression::compress_with;
pub use decompression::decompress;

use crate::DbpfResult;

/// Largest payload that can be compressed. The 3 byte length field of the
/// stream header can't describe anything bigger.
pub const MAX_INPUT_LENGTH: usize = 16 * 1024 * 1024;

/// Default number of candidate positions searched per input position
pub const QFS_MAXITER: usize = 20;

/// Tunables for the compressor. Higher iteration counts find longer matches
/// at the cost of speed; the output format is unaffected.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CompressionOptions {
    /// how many earlier positions sharing a 3 byte prefix are tried
    pub max_iterations: usize,
}

impl CompressionOptions {
    pub const FAST: Self = Self::new(4);
    pub const BEST: Self = Self::new(255);

    #[must_use]
    pub const fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self::new(QFS_MAXITER)
    }
}

/// Compress with the default options. See [compress_with].
///
/// # Errors
/// - [DbpfError::FileTooLarge](crate::DbpfError::FileTooLarge): input is
///   larger than 16 MiB
#[inline]
pub fn compress(input: &[u8]) -> DbpfResult<Vec<u8>> {
    compress_with(input, &CompressionOptions::default())
}

/// Compress `length` bytes from a reader into a writer.
///
/// Like [compress_with], writes the input unchanged when compression would
/// not make it smaller.
///
/// # Errors
/// - [DbpfError::FileTooLarge](crate::DbpfError::FileTooLarge): `length` is
///   larger than 16 MiB
/// - [DbpfError::Io](crate::DbpfError::Io): generic IO error when reading or
///   writing
pub fn compress_stream(
    length: usize,
    reader: &mut impl Read,
    writer: &mut impl Write,
    options: &CompressionOptions,
) -> DbpfResult<()> {
    if length > MAX_INPUT_LENGTH {
        return Err(crate::DbpfError::FileTooLarge(length));
    }
    let mut buf = vec![0; length];
    reader.read_exact(&mut buf)?;
    let out = compress_with(&buf, options)?;
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(())
}

/// Decompress a whole stream from a reader into a writer.
///
/// # Errors
/// Same as [decompress], plus [DbpfError::Io](crate::DbpfError::Io) for
/// reader or writer failures
pub fn decompress_stream(
    reader: &mut impl Read,
    writer: &mut impl Write,
    decompressed_size: usize,
) -> DbpfResult<()> {
    let mut buf = vec![];
    reader.read_to_end(&mut buf)?;
    let out = decompress(&buf, decompressed_size)?;
    writer.write_all(&out)?;
    writer.flush()?;
    Ok(())
}
