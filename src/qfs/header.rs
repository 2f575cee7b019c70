////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The 9 byte header in front of every QFS stream stored in a package.
//!
//! | Offset | Size | Endian | Field                                      |
//! |--------|------|--------|--------------------------------------------|
//! | 0      | 4    | Little | compressed length, header included         |
//! | 4      | 2    | Little | magic, `0xFB10` (`10 FB` in the stream)    |
//! | 6      | 3    | Big    | decompressed length                        |

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

#[cfg(test)]
use test_strategy::Arbitrary;

use crate::{DbpfError, DbpfResult};

/// Magic number of a QFS stream, read little endian from offset 4.
pub const MAGIC: u16 = 0xFB10;

/// Length of the encoded header
pub const LENGTH: usize = 9;

/// Largest value the 3 byte decompressed length can hold
pub const MAX_LENGTH_FIELD: u32 = 0x00FF_FFFF;

/// Decoded stream header
#[derive(Eq, PartialEq, Debug, Default, Copy, Clone)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct Header {
    pub compressed_length: u32,
    pub decompressed_length: u32,
}

impl Header {
    /// # Errors
    /// - [DbpfError::InvalidMagicHeader]: bytes 4 and 5 are not the QFS magic
    /// - [DbpfError::Io]: the reader ran dry before 9 bytes were read
    pub fn read(reader: &mut impl Read) -> DbpfResult<Header> {
        let compressed_length = reader.read_u32::<LittleEndian>()?;
        let magic = reader.read_u16::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(DbpfError::InvalidMagicHeader(magic));
        }
        //Inexplicably this three byte number is stored Big Endian
        let decompressed_length = reader.read_u24::<BigEndian>()?;
        Ok(Header {
            compressed_length,
            decompressed_length,
        })
    }

    /// Only the low 24 bits of `decompressed_length` are written.
    ///
    /// # Errors
    /// - [DbpfError::Io]: generic IO error while writing
    pub fn write(self, writer: &mut impl Write) -> DbpfResult<()> {
        writer.write_u32::<LittleEndian>(self.compressed_length)?;
        writer.write_u16::<LittleEndian>(MAGIC)?;
        writer.write_u24::<BigEndian>(self.decompressed_length & MAX_LENGTH_FIELD)?;
        Ok(())
    }
}
