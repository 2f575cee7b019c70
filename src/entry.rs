////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! A single resource inside a package.
//!
//! Entries read from a package start out as nothing more than a location in
//! the package bytes. The stored bytes are sliced out on first use, and for
//! compressed entries the decoded bytes are cached so that repeated reads
//! don't pay for decompression again. [Entry::clear_cache] drops the decoded
//! copy when memory matters more.
//!
//! The `compress` flag is the only in-memory record of whether an entry is
//! compressed. The directory written into a package is rebuilt from it on
//! every save.

use std::fmt::{Debug, Display, Formatter};

use bytes::Bytes;
use tracing::{debug, trace, warn};

#[cfg(test)]
use test_strategy::Arbitrary;

use crate::qfs::{self, CompressionOptions};
use crate::{types, DbpfError, DbpfResult};

/// Identity of an entry. `resource_id` is only stored on disk for index
/// version 7.2 and later, and is 0 otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct EntryKey {
    pub type_id: u32,
    pub group_id: u32,
    pub instance_id: u32,
    pub resource_id: u32,
}

impl EntryKey {
    #[must_use]
    pub const fn new(type_id: u32, group_id: u32, instance_id: u32, resource_id: u32) -> Self {
        Self {
            type_id,
            group_id,
            instance_id,
            resource_id,
        }
    }

    /// Whether this is the key of a compressed-files directory
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.type_id == types::DIRECTORY
    }
}

impl Display for EntryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Type ID {:#x}, Group ID {:#x}, Instance ID {:#x}, Resource ID {:#x}",
            self.type_id, self.group_id, self.instance_id, self.resource_id
        )
    }
}

#[derive(Clone)]
pub struct Entry {
    pub key: EntryKey,
    /// offset of the stored bytes in the package
    pub file_location: u32,
    /// length of the stored bytes in the package
    pub file_size: u32,
    pub decompressed_size: u32,
    /// Whether this entry should be compressed in the written package
    pub compress: bool,
    modified: bool,
    /// bytes as they are (or will be) stored in the package
    stored: Option<Bytes>,
    stored_compressed: bool,
    decoded: Option<Bytes>,
    /// whole package this entry was read from
    source: Option<Bytes>,
}

impl Debug for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("file_location", &self.file_location)
            .field("file_size", &self.file_size)
            .field("decompressed_size", &self.decompressed_size)
            .field("compress", &self.compress)
            .field("modified", &self.modified)
            .field("loaded", &self.stored.is_some())
            .field("cached", &self.decoded.is_some())
            .finish()
    }
}

/// Compress `data` and prove the result decodes back to it. `None` whenever
/// storing the data uncompressed is the better or only option.
fn compress_verified(data: &[u8], options: &CompressionOptions) -> Option<Vec<u8>> {
    let compressed = match qfs::compress_with(data, options) {
        Ok(compressed) => compressed,
        Err(error) => {
            debug!("Compression not possible: {error}");
            return None;
        }
    };

    if compressed.len() >= data.len() {
        trace!("{} bytes did not shrink under compression", data.len());
        return None;
    }

    match qfs::decompress(&compressed, data.len()) {
        Ok(decompressed) if decompressed == data => Some(compressed),
        Ok(_) => {
            warn!("Compressed output did not decode back to its input, storing uncompressed");
            None
        }
        Err(error) => {
            warn!("Compressed output failed to decode ({error}), storing uncompressed");
            None
        }
    }
}

impl Entry {
    /// Create an entry holding `data`. With `compress` set the data is
    /// compressed right away, falling back to uncompressed storage when that
    /// doesn't work out.
    #[must_use]
    pub fn new(key: EntryKey, data: impl Into<Bytes>, compress: bool) -> Self {
        Self::with_options(key, data, compress, &CompressionOptions::default())
    }

    #[must_use]
    pub fn with_options(
        key: EntryKey,
        data: impl Into<Bytes>,
        compress: bool,
        options: &CompressionOptions,
    ) -> Self {
        let mut entry = Self::unloaded(key, 0, 0, None);
        entry.compress = compress;
        entry.set_data_with(data, options);
        entry
    }

    /// An entry whose bytes still sit at `file_location` inside `source`
    pub(crate) fn unloaded(
        key: EntryKey,
        file_location: u32,
        file_size: u32,
        source: Option<Bytes>,
    ) -> Self {
        Self {
            key,
            file_location,
            file_size,
            decompressed_size: file_size,
            compress: false,
            modified: false,
            stored: None,
            stored_compressed: false,
            decoded: None,
            source,
        }
    }

    /// An entry whose bytes are stored verbatim, such as a directory
    pub(crate) fn stored_as_is(key: EntryKey, stored: Bytes) -> Self {
        let mut entry = Self::unloaded(key, 0, stored.len() as u32, None);
        entry.stored = Some(stored);
        entry
    }

    /// Flag the stored bytes as QFS compressed, decoding to
    /// `decompressed_size` bytes
    pub(crate) fn mark_compressed(&mut self, decompressed_size: u32) {
        self.compress = true;
        self.stored_compressed = true;
        self.decompressed_size = decompressed_size;
    }

    /// Whether the data was replaced since the package was read
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Whether the bytes held right now are QFS compressed. Can differ from
    /// `compress` until the next save or [Entry::set_data].
    #[must_use]
    pub fn is_stored_compressed(&self) -> bool {
        self.stored_compressed
    }

    /// Slice the stored bytes out of the package, if that hasn't happened yet
    fn populate(&mut self) -> DbpfResult<()> {
        if self.stored.is_some() {
            return Ok(());
        }

        let Some(source) = &self.source else {
            return Err(DbpfError::InvalidRequest(self.key));
        };

        let start = self.file_location as usize;
        let end = start + self.file_size as usize;
        if end > source.len() {
            return Err(DbpfError::OutOfBounds {
                offset: u64::from(self.file_location),
                length: u64::from(self.file_size),
                available: source.len(),
            });
        }

        trace!(
            "Reading {} bytes at {:#x} for {}",
            self.file_size,
            self.file_location,
            self.key
        );
        self.stored = Some(source.slice(start..end));
        Ok(())
    }

    fn stored_bytes(&self) -> &[u8] {
        self.stored.as_deref().unwrap_or_default()
    }

    /// Make sure the decoded bytes are available
    fn decode(&mut self) -> DbpfResult<()> {
        self.populate()?;
        if self.stored_compressed && self.decoded.is_none() {
            let decoded = qfs::decompress(self.stored_bytes(), self.decompressed_size as usize)?;
            self.decoded = Some(decoded.into());
        }
        Ok(())
    }

    fn decoded_bytes(&self) -> &[u8] {
        if self.stored_compressed {
            self.decoded.as_deref().unwrap_or_default()
        } else {
            self.stored_bytes()
        }
    }

    /// Bytes as stored in the package, compressed or not
    ///
    /// # Errors
    /// - [DbpfError::InvalidRequest]: the entry has no data and no package
    /// - [DbpfError::OutOfBounds]: the location points outside of the package
    pub fn raw(&mut self) -> DbpfResult<&[u8]> {
        self.populate()?;
        Ok(self.stored_bytes())
    }

    /// The contents of this entry, decompressed if necessary. The decoded
    /// bytes are cached until [Entry::clear_cache] or [Entry::set_data].
    ///
    /// # Errors
    /// - [DbpfError::InvalidMagicHeader]: flagged compressed, but the stored
    ///   bytes aren't a QFS stream
    /// - [DbpfError::ArrayTooSmall]: the QFS stream is corrupt or doesn't fit
    ///   the recorded decompressed size
    /// - Same as [Entry::raw]
    pub fn data(&mut self) -> DbpfResult<&[u8]> {
        self.decode()?;
        Ok(self.decoded_bytes())
    }

    /// Like [Entry::data], but falls back to the stored bytes when they can't
    /// be decoded. When the stored bytes turn out not to be compressed at all
    /// the entry is corrected to uncompressed.
    ///
    /// # Errors
    /// Same as [Entry::raw]
    pub fn data_safe(&mut self) -> DbpfResult<&[u8]> {
        match self.decode() {
            Ok(()) => Ok(self.decoded_bytes()),
            Err(DbpfError::InvalidMagicHeader(magic)) => {
                warn!(
                    "{} is flagged compressed but has no QFS magic ({magic:#06X}), treating as \
                     uncompressed",
                    self.key
                );
                self.compress = false;
                self.stored_compressed = false;
                self.decompressed_size = self.stored_bytes().len() as u32;
                Ok(self.stored_bytes())
            }
            Err(error) if error.is_decode_failure() => {
                warn!("{} failed to decode ({error}), returning stored bytes", self.key);
                Ok(self.stored_bytes())
            }
            Err(error) => Err(error),
        }
    }

    /// Replace the contents with the default compression options. See
    /// [Entry::set_data_with].
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.set_data_with(data, &CompressionOptions::default());
    }

    /// Replace the contents of this entry.
    ///
    /// With `compress` set the data is compressed and verified by decoding it
    /// again. If compression fails, doesn't shrink the data or doesn't
    /// round-trip, the data is stored uncompressed and `compress` is cleared.
    pub fn set_data_with(&mut self, data: impl Into<Bytes>, options: &CompressionOptions) {
        let data: Bytes = data.into();
        self.decompressed_size = data.len() as u32;
        self.decoded = None;
        self.modified = true;

        if self.compress {
            if let Some(compressed) = compress_verified(&data, options) {
                trace!(
                    "{}: compressed {} bytes to {}",
                    self.key,
                    data.len(),
                    compressed.len()
                );
                self.stored = Some(compressed.into());
                self.stored_compressed = true;
                self.decoded = Some(data);
                return;
            }
            debug!("{}: storing uncompressed", self.key);
            self.compress = false;
        }

        self.stored = Some(data);
        self.stored_compressed = false;
    }

    /// Drop the cached decoded bytes
    pub fn clear_cache(&mut self) {
        self.decoded = None;
    }

    /// Bring the stored bytes in line with `compress` before writing, and
    /// return them
    pub(crate) fn prepare_for_write(
        &mut self,
        options: &CompressionOptions,
    ) -> DbpfResult<&[u8]> {
        self.populate()?;
        if self.compress != self.stored_compressed {
            let data = Bytes::copy_from_slice(self.data()?);
            let modified = self.modified;
            self.set_data_with(data, options);
            self.modified = modified;
        }
        Ok(self.stored_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const REPEATING: &[u8] = b"AAABBBCCCAAAAAABBBCCCDDDAAABBBABABAB";
    const INCOMPRESSIBLE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()";

    fn key() -> EntryKey {
        EntryKey::new(types::UI_DATA, 1, 2, 0)
    }

    /// a package image holding `stored` at offset 96
    fn backed(stored: &[u8], compressed_size: Option<u32>) -> Entry {
        let mut source = vec![0u8; 96];
        source.extend_from_slice(stored);
        let mut entry =
            Entry::unloaded(key(), 96, stored.len() as u32, Some(Bytes::from(source)));
        if let Some(size) = compressed_size {
            entry.mark_compressed(size);
        }
        entry
    }

    #[test]
    fn compressible_data_is_stored_compressed() {
        let mut entry = Entry::new(key(), REPEATING, true);
        assert!(entry.compress);
        assert!(entry.is_stored_compressed());
        assert!(entry.raw().unwrap().len() < REPEATING.len());
        assert_eq!(entry.decompressed_size as usize, REPEATING.len());
        assert_eq!(entry.data().unwrap(), REPEATING);
        assert!(entry.is_modified());
    }

    #[test]
    fn incompressible_data_degrades() {
        let mut entry = Entry::new(key(), INCOMPRESSIBLE, true);
        assert!(!entry.compress);
        assert!(!entry.is_stored_compressed());
        assert_eq!(entry.raw().unwrap(), INCOMPRESSIBLE);
        assert_eq!(entry.data().unwrap(), INCOMPRESSIBLE);
    }

    #[test]
    fn lazy_read_from_source() {
        let mut entry = backed(b"Hello World!", None);
        assert!(!entry.is_modified());
        assert_eq!(entry.data().unwrap(), b"Hello World!");
        assert_eq!(entry.raw().unwrap(), b"Hello World!");
    }

    #[test]
    fn compressed_read_is_cached() {
        let compressed = qfs::compress(REPEATING).unwrap();
        let mut entry = backed(&compressed, Some(REPEATING.len() as u32));
        assert_eq!(entry.data().unwrap(), REPEATING);
        let first = entry.data().unwrap().as_ptr();
        let second = entry.data().unwrap().as_ptr();
        assert_eq!(first, second);

        entry.clear_cache();
        assert!(entry.decoded.is_none());
        assert_eq!(entry.data().unwrap(), REPEATING);
    }

    #[test]
    fn corrupt_stream_propagates() {
        let mut compressed = qfs::compress(REPEATING).unwrap();
        compressed[4] = 0;
        let mut entry = backed(&compressed, Some(REPEATING.len() as u32));
        assert!(matches!(
            entry.data(),
            Err(DbpfError::InvalidMagicHeader(_))
        ));
    }

    #[test]
    fn data_safe_corrects_misflagged_entry() {
        let mut entry = backed(b"plain bytes, not qfs", Some(100));
        assert_eq!(entry.data_safe().unwrap(), b"plain bytes, not qfs");
        assert!(!entry.compress);
        assert!(!entry.is_stored_compressed());
        assert_eq!(entry.data().unwrap(), b"plain bytes, not qfs");
    }

    #[test]
    fn data_safe_returns_raw_on_wrong_size() {
        let compressed = qfs::compress(REPEATING).unwrap();
        let mut entry = backed(&compressed, Some(4));
        assert_eq!(entry.data_safe().unwrap(), &compressed[..]);
        assert!(entry.compress);
    }

    #[test]
    fn unbacked_entry_is_invalid_request() {
        let mut entry = Entry::unloaded(key(), 0, 10, None);
        assert!(matches!(entry.data(), Err(DbpfError::InvalidRequest(k)) if k == key()));
    }

    #[test]
    fn out_of_bounds_location() {
        let mut entry = Entry::unloaded(key(), 90, 20, Some(Bytes::from(vec![0u8; 100])));
        assert!(matches!(entry.raw(), Err(DbpfError::OutOfBounds { .. })));
    }

    #[test]
    fn prepare_for_write_follows_flag() {
        let mut entry = backed(REPEATING, None);
        entry.compress = true;
        let stored = entry.prepare_for_write(&CompressionOptions::default()).unwrap().to_vec();
        assert!(stored.len() < REPEATING.len());
        assert!(entry.is_stored_compressed());
        assert!(!entry.is_modified());

        entry.compress = false;
        let stored = entry.prepare_for_write(&CompressionOptions::default()).unwrap();
        assert_eq!(stored, REPEATING);
    }

    #[test]
    fn key_display() {
        assert_eq!(
            EntryKey::new(types::IMAGE, 0x10, 0x20, 0).to_string(),
            "Type ID 0x856ddbac, Group ID 0x10, Instance ID 0x20, Resource ID 0x0"
        );
    }
}
