////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The primary index: one record per entry, in payload order.
//!
//! Records are `type, group, instance, [resource,] location, size`, all little
//! endian `u32`. The resource identifier is only present from index version
//! 7.2 on.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::directory::Directory;
use crate::entry::{Entry, EntryKey};
use crate::header::Header;
use crate::{DbpfError, DbpfResult};

/// Width of a record without resource identifier
pub const RECORD_LENGTH: usize = 20;
/// Width of a record with resource identifier
pub const RECORD_LENGTH_RESOURCE: usize = 24;

#[must_use]
pub fn record_length(has_resource_id: bool) -> usize {
    if has_resource_id {
        RECORD_LENGTH_RESOURCE
    } else {
        RECORD_LENGTH
    }
}

/// Read the index described by `header` out of the package bytes in `source`.
///
/// Entries come back unloaded, pointing into `source`. If the index holds a
/// directory entry, every entry listed in it is flagged compressed with the
/// decompressed size from its record.
///
/// # Errors
/// - [DbpfError::OutOfBounds]: the index or the directory entry lies outside
///   of `source`
pub fn parse(source: &Bytes, header: &Header) -> DbpfResult<Vec<Entry>> {
    let has_resource_id = header.has_resource_id();
    let count = header.index_entry_count as usize;
    let start = header.index_start_offset as usize;
    let length = count * record_length(has_resource_id);

    if start + length > source.len() {
        return Err(DbpfError::OutOfBounds {
            offset: u64::from(header.index_start_offset),
            length: length as u64,
            available: source.len(),
        });
    }

    let mut reader = Cursor::new(&source[start..start + length]);
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let type_id = reader.read_u32::<LittleEndian>()?;
        let group_id = reader.read_u32::<LittleEndian>()?;
        let instance_id = reader.read_u32::<LittleEndian>()?;
        let resource_id = if has_resource_id {
            reader.read_u32::<LittleEndian>()?
        } else {
            0
        };
        let file_location = reader.read_u32::<LittleEndian>()?;
        let file_size = reader.read_u32::<LittleEndian>()?;

        let key = EntryKey::new(type_id, group_id, instance_id, resource_id);
        trace!("Index record {key}: {file_size} bytes at {file_location:#x}");
        entries.push(Entry::unloaded(
            key,
            file_location,
            file_size,
            Some(source.clone()),
        ));
    }

    if let Some(position) = entries.iter().position(|entry| entry.key.is_directory()) {
        let directory = Directory::parse(entries[position].raw()?, has_resource_id);
        debug!("Directory lists {} compressed entries", directory.len());

        for (index, entry) in entries.iter_mut().enumerate() {
            if index == position {
                continue;
            }
            if let Some(record) = directory.lookup(&entry.key) {
                entry.mark_compressed(record.decompressed_size);
            }
        }
    }

    Ok(entries)
}

/// Write one record per entry using its current location and size
///
/// # Errors
/// Any error of the writer
pub fn write<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    writer: &mut impl Write,
    has_resource_id: bool,
) -> std::io::Result<()> {
    for entry in entries {
        writer.write_u32::<LittleEndian>(entry.key.type_id)?;
        writer.write_u32::<LittleEndian>(entry.key.group_id)?;
        writer.write_u32::<LittleEndian>(entry.key.instance_id)?;
        if has_resource_id {
            writer.write_u32::<LittleEndian>(entry.key.resource_id)?;
        }
        writer.write_u32::<LittleEndian>(entry.file_location)?;
        writer.write_u32::<LittleEndian>(entry.file_size)?;
    }
    Ok(())
}
