////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The compressed-files directory.
//!
//! A package lists the entries it stores compressed, with their decompressed
//! sizes, inside an ordinary entry of type [DIRECTORY](crate::types::DIRECTORY).
//! Each record is `type, group, instance, [resource,] decompressed size`, all
//! little endian `u32`, with the resource identifier present from index
//! version 7.2 on.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use tracing::warn;

use crate::entry::EntryKey;

/// Width of a record without resource identifier
pub const RECORD_LENGTH: usize = 16;
/// Width of a record with resource identifier
pub const RECORD_LENGTH_RESOURCE: usize = 20;

#[must_use]
pub fn record_length(has_resource_id: bool) -> usize {
    if has_resource_id {
        RECORD_LENGTH_RESOURCE
    } else {
        RECORD_LENGTH
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub key: EntryKey,
    pub decompressed_size: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Directory {
    records: Vec<DirectoryRecord>,
    lookup: HashMap<EntryKey, usize>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse directory records from the stored bytes of a directory entry.
    ///
    /// The record count is the byte length divided by the record width;
    /// trailing bytes that don't make up a whole record are ignored.
    #[must_use]
    pub fn parse(bytes: &[u8], has_resource_id: bool) -> Self {
        let width = record_length(has_resource_id);
        let count = bytes.len() / width;
        if bytes.len() % width != 0 {
            warn!(
                "Directory of {} bytes is not a multiple of {width}, ignoring the tail",
                bytes.len()
            );
        }

        let mut directory = Self::new();
        let mut reader = Cursor::new(bytes);
        let mut read_record = || -> std::io::Result<DirectoryRecord> {
            let type_id = reader.read_u32::<LittleEndian>()?;
            let group_id = reader.read_u32::<LittleEndian>()?;
            let instance_id = reader.read_u32::<LittleEndian>()?;
            let resource_id = if has_resource_id {
                reader.read_u32::<LittleEndian>()?
            } else {
                0
            };
            Ok(DirectoryRecord {
                key: EntryKey::new(type_id, group_id, instance_id, resource_id),
                decompressed_size: reader.read_u32::<LittleEndian>()?,
            })
        };

        for _ in 0..count {
            // count was derived from the length, so whole records are there
            let Ok(record) = read_record() else { break };
            directory.add_record(record);
        }
        directory
    }

    /// Add a record. A later record for the same key shadows earlier ones in
    /// [Directory::lookup].
    pub fn add_record(&mut self, record: DirectoryRecord) {
        self.lookup.insert(record.key, self.records.len());
        self.records.push(record);
    }

    #[must_use]
    pub fn lookup(&self, key: &EntryKey) -> Option<&DirectoryRecord> {
        self.lookup.get(key).map(|&index| &self.records[index])
    }

    #[must_use]
    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records, in insertion order
    ///
    /// # Errors
    /// Any error of the writer
    pub fn write(&self, writer: &mut impl Write, has_resource_id: bool) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes(has_resource_id))
    }

    #[must_use]
    pub fn to_bytes(&self, has_resource_id: bool) -> Vec<u8> {
        let width = record_length(has_resource_id);
        let mut out = vec![0u8; self.records.len() * width];
        for (record, chunk) in self.records.iter().zip(out.chunks_exact_mut(width)) {
            let key = &record.key;
            let fields = [
                key.type_id,
                key.group_id,
                key.instance_id,
                key.resource_id,
                record.decompressed_size,
            ];
            if has_resource_id {
                LittleEndian::write_u32_into(&fields, chunk);
            } else {
                LittleEndian::write_u32_into(&fields[..3], &mut chunk[..12]);
                LittleEndian::write_u32(&mut chunk[12..], record.decompressed_size);
            }
        }
        out
    }
}
