////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! The 96 byte preamble of a package.
//!
//! | Offset | Field                      |
//! |--------|----------------------------|
//! | 0      | magic `DBPF`               |
//! | 4      | major version              |
//! | 8      | minor version              |
//! | 32     | index major version        |
//! | 36     | index entry count          |
//! | 40     | index start offset         |
//! | 44     | index size in bytes        |
//! | 60     | index minor version        |
//!
//! All fields are little endian `u32`. Everything else is left zeroed.

use std::fmt::{Display, Formatter};

use byteorder::{ByteOrder, LittleEndian};

#[cfg(test)]
use test_strategy::Arbitrary;

/// Magic at the start of every package
pub const MAGIC: [u8; 4] = *b"DBPF";

/// Length of the preamble; entry data starts right after it
pub const LENGTH: usize = 96;

const MAJOR_VERSION: usize = 4;
const MINOR_VERSION: usize = 8;
const INDEX_MAJOR_VERSION: usize = 32;
const INDEX_ENTRY_COUNT: usize = 36;
const INDEX_START_OFFSET: usize = 40;
const INDEX_SIZE: usize = 44;
const INDEX_MINOR_VERSION: usize = 60;

/// A `major.minor` version pair
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Index layout that added a resource identifier to every record
    pub const RESOURCE_ID: Version = Version::new(7, 2);

    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version read as a decimal number, `7` and `1` giving `7.1`
    #[must_use]
    pub fn as_decimal(self) -> f64 {
        self.to_string().parse().unwrap_or_default()
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(Arbitrary))]
pub struct Header {
    pub version: Version,
    pub index_version: Version,
    pub index_entry_count: u32,
    pub index_start_offset: u32,
    pub index_size: u32,
}

impl Default for Header {
    /// Version 1.1 with a 7.1 index, the layout of The Sims 2 base game
    fn default() -> Self {
        Self {
            version: Version::new(1, 1),
            index_version: Version::new(7, 1),
            index_entry_count: 0,
            index_start_offset: 0,
            index_size: 0,
        }
    }
}

impl Header {
    /// Read the header fields from the start of `bytes`.
    ///
    /// Bytes missing past the end of a short buffer read as zero, and a zero
    /// major version is taken to mean a brand new package, which gets the
    /// default versions. Nothing is validated here; a garbage buffer simply
    /// produces garbage versions.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        let mut buf = [0u8; LENGTH];
        let available = bytes.len().min(LENGTH);
        buf[..available].copy_from_slice(&bytes[..available]);

        let field = |offset: usize| LittleEndian::read_u32(&buf[offset..offset + 4]);

        let mut header = Self {
            version: Version::new(field(MAJOR_VERSION), field(MINOR_VERSION)),
            index_version: Version::new(field(INDEX_MAJOR_VERSION), field(INDEX_MINOR_VERSION)),
            index_entry_count: field(INDEX_ENTRY_COUNT),
            index_start_offset: field(INDEX_START_OFFSET),
            index_size: field(INDEX_SIZE),
        };

        if header.version.major == 0 {
            let defaults = Self::default();
            header.version = defaults.version;
            header.index_version = defaults.index_version;
        }

        header
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; LENGTH] {
        let mut buf = [0u8; LENGTH];
        buf[..4].copy_from_slice(&MAGIC);

        let mut put = |offset: usize, value: u32| {
            LittleEndian::write_u32(&mut buf[offset..offset + 4], value);
        };
        put(MAJOR_VERSION, self.version.major);
        put(MINOR_VERSION, self.version.minor);
        put(INDEX_MAJOR_VERSION, self.index_version.major);
        put(INDEX_ENTRY_COUNT, self.index_entry_count);
        put(INDEX_START_OFFSET, self.index_start_offset);
        put(INDEX_SIZE, self.index_size);
        put(INDEX_MINOR_VERSION, self.index_version.minor);

        buf
    }

    /// Whether index and directory records carry a resource identifier
    #[must_use]
    pub fn has_resource_id(&self) -> bool {
        self.index_version >= Version::RESOURCE_ID
    }
}
