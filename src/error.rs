////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::fmt::{Display, Formatter};

use onlyerror::Error as DeriveError;

use crate::entry::EntryKey;

/// Reasons a QFS stream failed its integrity checks while being decoded.
#[derive(DeriveError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A literal or back-reference copy would write past the end of the
    /// output buffer. Either the stream is corrupt or the decompressed size
    /// handed to the decoder is wrong.
    ///
    /// ### Fields
    /// - usize: end position the copy needed
    /// - usize: size of the output buffer
    #[error("Copy needs output up to `{0}` but the buffer holds `{1}` bytes")]
    OutputOverrun(usize, usize),
    /// A back-reference pointed before the start of the output.
    ///
    /// ### Fields
    /// - usize: current output position
    /// - usize: offset requested
    #[error("Offset went past start of buffer: position `{0}`, offset `{1}`")]
    NegativePosition(usize, usize),
    /// The compressed stream ended in the middle of a control block.
    ///
    /// ### Fields
    /// - usize: input position the control block needed
    /// - usize: length of the compressed input
    #[error("Compressed input ended early: needed `{0}` bytes, have `{1}`")]
    InputExhausted(usize, usize),
    /// The requested decompressed size is larger than any QFS stream can
    /// produce.
    ///
    /// ### Fields
    /// - usize: requested size
    /// - usize: largest size allowed
    #[error("Decompressed size `{0}` exceeds the maximum of `{1}` bytes")]
    SizeLimit(usize, usize),
}

/// Possible errors returned when reading, writing, compressing or
/// decompressing packages
#[derive(Debug)]
pub enum Error {
    /// The two magic bytes of a QFS stream header were not `10 FB`. The data
    /// is most likely not compressed at all.
    ///
    /// ### Fields
    /// - u16: what was read instead of the magic, little endian
    InvalidMagicHeader(u16),
    /// A control block addressed bytes outside of the input or output buffer
    /// during decompression.
    ArrayTooSmall { position: usize, error: DecodeError },
    /// Payload can't be represented in the 3 byte length field of a QFS header
    ///
    /// ### Fields
    /// - usize: size of the rejected payload
    FileTooLarge(usize),
    /// No entry in the index carries this key
    EntryNotFound(EntryKey),
    /// The entry has neither data of its own nor a package to read it from
    InvalidRequest(EntryKey),
    /// The package does not start with `DBPF`
    BadMagic([u8; 4]),
    /// A region referenced by the index lies outside of the package bytes
    OutOfBounds {
        offset: u64,
        length: u64,
        available: usize,
    },
    /// Generic IO Error wrapper
    Io(std::io::Error),
}

impl Error {
    /// Whether this error came from decoding a QFS stream. These are the
    /// failures a caller may want to recover from by falling back to the raw
    /// bytes of an entry.
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Error::InvalidMagicHeader(_) | Error::ArrayTooSmall { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidMagicHeader(magic) => {
                write!(
                    f,
                    "Expected QFS magic `0xFB10` at offset 4, but got `{magic:#06X}`"
                )
            }
            Error::ArrayTooSmall { position, error } => {
                write!(
                    f,
                    "Array too small while decoding control block at position `{position}`: \
                     {error}"
                )
            }
            Error::FileTooLarge(size) => {
                write!(
                    f,
                    "File too large to compress: {} MiB (max 16 MiB)",
                    size / 1024 / 1024
                )
            }
            Error::EntryNotFound(key) => write!(f, "Entry not found: {key}"),
            Error::InvalidRequest(key) => {
                write!(
                    f,
                    "Missing file location or data for entry: {key}"
                )
            }
            Error::BadMagic(magic) => {
                write!(f, "Not a DBPF package, header starts with `{magic:02X?}`")
            }
            Error::OutOfBounds {
                offset,
                length,
                available,
            } => {
                write!(
                    f,
                    "Region of `{length}` bytes at offset `{offset}` lies outside of the \
                     `{available}` byte package"
                )
            }
            Error::Io(err) => write!(f, "IO Error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ArrayTooSmall { error, .. } => Some(error),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Wrapper for Result specified to [Error]
pub type Result<T> = std::result::Result<T, Error>;
