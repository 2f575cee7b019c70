////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Reading and writing whole packages.
//!
//! A package on disk is laid out as
//!
//! ```text
//! preamble (96 bytes) | entry payloads... | index records
//! ```
//!
//! Writing always rebuilds the payload area, the compressed-files directory
//! and the index from the entries in memory; nothing of the source layout is
//! carried over besides the versions in the header.

use std::fs::OpenOptions;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::directory::{Directory, DirectoryRecord};
use crate::entry::{Entry, EntryKey};
use crate::header::{self, Header};
use crate::qfs::CompressionOptions;
use crate::{index, types, DbpfError, DbpfResult};

/// Group and instance a freshly generated directory gets when the package
/// didn't have one before. These are the ones The Sims 2 uses.
const DIRECTORY_GROUP: u32 = 0xE86B_1EEF;
const DIRECTORY_INSTANCE: u32 = 0x286B_1F03;

/// An in-memory DBPF package
#[derive(Debug, Clone)]
pub struct Dbpf {
    header: Header,
    entries: Vec<Entry>,
    options: CompressionOptions,
}

impl Default for Dbpf {
    fn default() -> Self {
        Self::new()
    }
}

impl Dbpf {
    /// An empty package with default versions
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: Header::parse(&[0; 32]),
            entries: vec![],
            options: CompressionOptions::default(),
        }
    }

    /// Parse a package held in memory. Entry payloads are not touched until
    /// they are read.
    ///
    /// # Errors
    /// - [DbpfError::BadMagic]: `bytes` doesn't start with `DBPF`
    /// - [DbpfError::OutOfBounds]: the index or the directory entry points
    ///   outside of `bytes`
    pub fn from_bytes(bytes: impl Into<Bytes>) -> DbpfResult<Self> {
        let source: Bytes = bytes.into();

        let mut magic = [0u8; 4];
        let available = source.len().min(magic.len());
        magic[..available].copy_from_slice(&source[..available]);
        if magic != header::MAGIC {
            return Err(DbpfError::BadMagic(magic));
        }

        let header = Header::parse(&source);
        let entries = index::parse(&source, &header)?;
        debug!(
            "Read package v{} with index v{}: {} entries",
            header.version,
            header.index_version,
            entries.len()
        );

        Ok(Self {
            header,
            entries,
            options: CompressionOptions::default(),
        })
    }

    /// Read a whole package from `reader`. See [Dbpf::from_bytes].
    ///
    /// # Errors
    /// Same as [Dbpf::from_bytes], plus [DbpfError::Io] when reading fails
    pub fn from_reader(reader: &mut impl Read) -> DbpfResult<Self> {
        let mut buf = vec![];
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(buf)
    }

    /// Read the package at `path`. The file is read once, and closed again
    /// before this returns.
    ///
    /// # Errors
    /// Same as [Dbpf::from_reader]
    pub fn open(path: impl AsRef<Path>) -> DbpfResult<Self> {
        let path = path.as_ref();
        debug!("Opening {}", path.display());
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Use `options` for entries compressed by this package
    #[must_use]
    pub fn with_options(mut self, options: CompressionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_options(&mut self, options: CompressionOptions) {
        self.options = options;
    }

    #[must_use]
    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Entry count, index offset and index size are overwritten on every
    /// write; only the versions are worth changing here.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// All entries in index order
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// # Errors
    /// - [DbpfError::EntryNotFound]: no entry has this key
    pub fn get_entry(&self, key: &EntryKey) -> DbpfResult<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.key == *key)
            .ok_or(DbpfError::EntryNotFound(*key))
    }

    /// # Errors
    /// - [DbpfError::EntryNotFound]: no entry has this key
    pub fn get_entry_mut(&mut self, key: &EntryKey) -> DbpfResult<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.key == *key)
            .ok_or(DbpfError::EntryNotFound(*key))
    }

    /// Append a new entry. With `compress` set the data is compressed right
    /// away with the options of this package, and stored uncompressed if that
    /// doesn't pay off.
    pub fn add_entry(
        &mut self,
        key: EntryKey,
        data: impl Into<Bytes>,
        compress: bool,
    ) -> &mut Entry {
        let entry = Entry::with_options(key, data, compress, &self.options);
        trace!("Adding {key} ({} bytes)", entry.decompressed_size);
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Append a new entry holding the contents of the file at `path`
    ///
    /// # Errors
    /// - [DbpfError::Io]: the file can't be read
    pub fn add_entry_from_file(
        &mut self,
        key: EntryKey,
        path: impl AsRef<Path>,
        compress: bool,
    ) -> DbpfResult<&mut Entry> {
        let data = std::fs::read(path)?;
        Ok(self.add_entry(key, data, compress))
    }

    /// Take the first entry with this key out of the package
    ///
    /// # Errors
    /// - [DbpfError::EntryNotFound]: no entry has this key
    pub fn remove_entry(&mut self, key: &EntryKey) -> DbpfResult<Entry> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.key == *key)
            .ok_or(DbpfError::EntryNotFound(*key))?;
        Ok(self.entries.remove(position))
    }

    /// Serialize the package into `writer`.
    ///
    /// Every entry is loaded and brought in line with its `compress` flag
    /// before the first byte is written. Any directory entry is replaced by a
    /// fresh one listing exactly the entries that end up compressed, or
    /// dropped if there are none. Locations and sizes of all entries, and the
    /// index fields of the header, are updated to the written layout.
    ///
    /// # Errors
    /// - [DbpfError::InvalidRequest] / [DbpfError::OutOfBounds]: an entry has
    ///   no readable data
    /// - decode errors of an entry that is stored compressed but no longer
    ///   flagged for compression
    /// - [DbpfError::Io]: the writer failed
    pub fn write_to<W: Write + Seek>(&mut self, writer: &mut W) -> DbpfResult<()> {
        let has_resource_id = self.header.has_resource_id();

        // entries are only dropped once all of them are ready
        let mut directory = Directory::new();
        for entry in &mut self.entries {
            if entry.key.is_directory() {
                continue;
            }
            entry.prepare_for_write(&self.options)?;
            if entry.compress {
                directory.add_record(DirectoryRecord {
                    key: entry.key,
                    decompressed_size: entry.decompressed_size,
                });
            }
        }

        let mut directory_key =
            EntryKey::new(types::DIRECTORY, DIRECTORY_GROUP, DIRECTORY_INSTANCE, 0);
        if let Some(previous) = self.entries.iter().find(|entry| entry.key.is_directory()) {
            directory_key = previous.key;
        }
        if !has_resource_id {
            directory_key.resource_id = 0;
        }
        self.entries.retain(|entry| !entry.key.is_directory());
        if !directory.is_empty() {
            debug!("Directory lists {} compressed entries", directory.len());
            self.entries.push(Entry::stored_as_is(
                directory_key,
                directory.to_bytes(has_resource_id).into(),
            ));
        }

        let base = writer.stream_position()?;
        writer.write_all(&[0; header::LENGTH])?;
        let mut position = header::LENGTH as u32;

        for entry in &mut self.entries {
            let stored = entry.raw()?;
            let size = stored.len() as u32;
            writer.write_all(stored)?;
            trace!("Wrote {} ({size} bytes) at {position:#x}", entry.key);
            entry.file_location = position;
            entry.file_size = size;
            position += size;
        }

        let mut index_bytes =
            Vec::with_capacity(self.entries.len() * index::record_length(has_resource_id));
        index::write(&self.entries, &mut index_bytes, has_resource_id)?;
        writer.write_all(&index_bytes)?;

        self.header.index_entry_count = self.entries.len() as u32;
        self.header.index_start_offset = position;
        self.header.index_size = index_bytes.len() as u32;

        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(base))?;
        writer.write_all(&self.header.to_bytes())?;
        writer.seek(SeekFrom::Start(end))?;
        writer.flush()?;

        debug!(
            "Wrote {} entries, {} bytes",
            self.entries.len(),
            end - base
        );
        Ok(())
    }

    /// Serialize the package into a new buffer. See [Dbpf::write_to].
    ///
    /// # Errors
    /// Same as [Dbpf::write_to]
    pub fn to_bytes(&mut self) -> DbpfResult<Vec<u8>> {
        let mut cursor = Cursor::new(vec![]);
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the package to `path`, replacing whatever is there.
    ///
    /// The package is serialized in memory and written to a temporary file
    /// next to `path`, which then replaces the destination. Until that last
    /// step the destination is never touched, so any failure leaves it as it
    /// was. A destination that exists but can't be written to fails before
    /// anything is serialized.
    ///
    /// # Errors
    /// Same as [Dbpf::write_to]
    pub fn save(&mut self, path: impl AsRef<Path>) -> DbpfResult<()> {
        let path = path.as_ref();
        if path.exists() {
            OpenOptions::new().write(true).open(path)?;
        }
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(directory)?;

        let bytes = self.to_bytes()?;
        file.write_all(&bytes)?;
        file.flush()?;
        file.persist(path).map_err(|error| error.error)?;

        debug!("Saved {}", path.display());
        Ok(())
    }
}
