////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! control codes utilized by compression and decompression

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

/// minimum value of the literal length in a literal command
pub const LITERAL_MIN: u8 = 4;

/// maximum value of the literal length in a literal command
pub const LITERAL_MAX: u8 = 112;

/// maximum value of the literal length in a non-literal command
pub const COPY_LITERAL_MAX: u8 = 3;

/// maximum offset distance for a short command
pub const SHORT_OFFSET_MAX: u32 = 1_024;

/// minimum length for a short command
pub const SHORT_LENGTH_MIN: u16 = 3;

/// maximum length for a short command
pub const SHORT_LENGTH_MAX: u16 = 10;

/// maximum offset distance for a medium command
pub const MEDIUM_OFFSET_MAX: u32 = 16_384;

/// minimum length for a medium command
pub const MEDIUM_LENGTH_MIN: u16 = 4;

/// maximum length for a medium command
pub const MEDIUM_LENGTH_MAX: u16 = 67;

/// maximum offset distance for a long command
pub const LONG_OFFSET_MAX: u32 = 131_072;

/// minimum length for a long command
pub const LONG_LENGTH_MIN: u16 = 5;

/// maximum length for a long command
pub const LONG_LENGTH_MAX: u16 = 1_028;

/// A decoded control code.
///
/// The first byte of a control block selects its shape by value range. Every
/// shape except the literal run carries 0 to 3 literal bytes that are copied
/// before the back-reference is resolved.
///
/// ## Key for layout
/// - `0` or `1`: header
/// - `P`: Offset (stored minus one)
/// - `L`: Length
/// - `B`: Literal bytes length
/// - `-`: Nibble Separator
/// - `:`: Byte Separator
///
/// | Command | First byte | Literal      | Length        | Offset          | Layout                                    |
/// |---------|------------|--------------|---------------|-----------------|-------------------------------------------|
/// | Short   | `0..=127`  | (0..=3)      | (3..=10) +3   | (1..=1024) +1   | `0PPL-LLBB:PPPP-PPPP`                     |
/// | Medium  | `128..=191`| (0..=3)      | (4..=67) +4   | (1..=16384) +1  | `10LL-LLLL:BBPP-PPPP:PPPP-PPPP`           |
/// | Long    | `192..=223`| (0..=3)      | (5..=1028) +5 | (1..=131072) +1 | `110P-LLBB:PPPP-PPPP:PPPP-PPPP:LLLL-LLLL` |
/// | Literal | `224..=251`| (4..=112) +4 | 0             | 0               | `111B-BBBB`                               |
/// | Stop    | `252..=255`| (0..=3)      | 0             | 0               | `1111-11BB`                               |
///
/// Literal runs store `(length - 4) >> 2`, so only multiples of 4 fit. The
/// cap is 112 rather than 128 because `0xFC` and up already mean stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Short { offset: u32, length: u16, literal: u8 },
    Medium { offset: u32, length: u16, literal: u8 },
    Long { offset: u32, length: u16, literal: u8 },
    Literal(u8),
    Stop(u8),
}

impl Command {
    /// Create a back-reference command using the smallest shape able to
    /// encode `offset` and `length`.
    ///
    /// # Panics
    /// Panics if the offset, length or literal count can't be encoded by any
    /// shape
    #[must_use]
    pub fn new(offset: u32, length: u16, literal: u8) -> Self {
        assert!(
            literal <= COPY_LITERAL_MAX,
            "Literal length must be less than or equal to {COPY_LITERAL_MAX} for commands \
             ({literal})"
        );
        assert!(
            offset >= 1 && offset <= LONG_OFFSET_MAX && length <= LONG_LENGTH_MAX,
            "Invalid offset or length (Maximum offset {LONG_OFFSET_MAX}, got {offset}) \
             (Maximum length {LONG_LENGTH_MAX}, got {length})"
        );

        if length <= SHORT_LENGTH_MAX && offset <= SHORT_OFFSET_MAX {
            assert!(
                length >= SHORT_LENGTH_MIN,
                "Length must be at least {SHORT_LENGTH_MIN} (Length: {length})"
            );
            Self::Short {
                offset,
                length,
                literal,
            }
        } else if length <= MEDIUM_LENGTH_MAX && offset <= MEDIUM_OFFSET_MAX {
            assert!(
                length >= MEDIUM_LENGTH_MIN,
                "Length must be at least {MEDIUM_LENGTH_MIN} for medium commands \
                 (Length: {length}) (Offset: {offset})"
            );
            Self::Medium {
                offset,
                length,
                literal,
            }
        } else {
            assert!(
                length >= LONG_LENGTH_MIN,
                "Length must be at least {LONG_LENGTH_MIN} for long commands \
                 (Length: {length}) (Offset: {offset})"
            );
            Self::Long {
                offset,
                length,
                literal,
            }
        }
    }

    /// Creates a new literal run of `length` bytes
    /// # Panics
    /// Panics if the length is out of range or not a multiple of 4
    #[must_use]
    pub fn new_literal(length: u8) -> Self {
        assert!(
            (LITERAL_MIN..=LITERAL_MAX).contains(&length) && length % 4 == 0,
            "Literal length must be a multiple of 4 between {LITERAL_MIN} and {LITERAL_MAX} \
             (got {length})"
        );
        Self::Literal(length)
    }

    /// Creates a new stopcode carrying `literal` trailing bytes
    /// # Panics
    /// Panics if more than 3 literal bytes are requested
    #[must_use]
    pub fn new_stop(literal: u8) -> Self {
        assert!(
            literal <= COPY_LITERAL_MAX,
            "Stopcode recieved too long of a literal length (max {COPY_LITERAL_MAX}, got \
             {literal})"
        );
        Self::Stop(literal)
    }

    /// Number of literal bytes that follow the command in the stream
    #[must_use]
    pub fn num_of_literal(self) -> usize {
        match self {
            Command::Short { literal, .. }
            | Command::Medium { literal, .. }
            | Command::Long { literal, .. }
            | Command::Literal(literal)
            | Command::Stop(literal) => literal as usize,
        }
    }

    /// `(offset, length)` of a back-reference, `None` for literal runs and
    /// stopcodes
    #[must_use]
    pub fn offset_copy(self) -> Option<(usize, usize)> {
        match self {
            Command::Short { offset, length, .. }
            | Command::Medium { offset, length, .. }
            | Command::Long { offset, length, .. } => Some((offset as usize, length as usize)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_stop(self) -> bool {
        matches!(self, Command::Stop(_))
    }

    /// Size of the encoded command, literal bytes excluded
    #[must_use]
    pub fn encoded_len(self) -> usize {
        match self {
            Command::Short { .. } => 2,
            Command::Medium { .. } => 3,
            Command::Long { .. } => 4,
            Command::Literal(_) | Command::Stop(_) => 1,
        }
    }

    /// Reads and decodes a command from a reader.
    /// # Errors
    /// Returns an IO error if the reader ends inside the command
    pub fn read(reader: &mut impl Read) -> std::io::Result<Self> {
        let first = reader.read_u8()?;
        let byte1 = first as u32;

        match first {
            0x00..=0x7F => {
                let byte2 = u32::from(reader.read_u8()?);
                Ok(Self::Short {
                    offset: (((byte1 & 0b0110_0000) << 3) | byte2) + 1,
                    length: (((byte1 & 0b0001_1100) >> 2) + 3) as u16,
                    literal: first & 0b0000_0011,
                })
            }
            0x80..=0xBF => {
                let byte2 = u32::from(reader.read_u8()?);
                let byte3 = u32::from(reader.read_u8()?);
                Ok(Self::Medium {
                    offset: (((byte2 & 0b0011_1111) << 8) | byte3) + 1,
                    length: ((byte1 & 0b0011_1111) + 4) as u16,
                    literal: ((byte2 & 0b1100_0000) >> 6) as u8,
                })
            }
            0xC0..=0xDF => {
                let byte2 = u32::from(reader.read_u8()?);
                let byte3 = u32::from(reader.read_u8()?);
                let byte4 = u32::from(reader.read_u8()?);
                Ok(Self::Long {
                    offset: (((byte1 & 0b0001_0000) << 12) | (byte2 << 8) | byte3) + 1,
                    length: ((((byte1 & 0b0000_1100) << 6) | byte4) + 5) as u16,
                    literal: first & 0b0000_0011,
                })
            }
            0xE0..=0xFB => Ok(Self::Literal(((first & 0b0001_1111) << 2) + 4)),
            0xFC..=0xFF => Ok(Self::Stop(first & 0b0000_0011)),
        }
    }

    /// Encodes and writes a command to a writer
    ///
    /// # Errors
    /// Generic IO error occurred while attempting to write data
    pub fn write(self, writer: &mut impl Write) -> std::io::Result<()> {
        match self {
            Command::Short {
                offset,
                length,
                literal,
            } => {
                let length_adjusted = u32::from(length - 3);
                let offset_adjusted = offset - 1;

                writer.write_u8(
                    ((offset_adjusted & 0b0000_0011_0000_0000) >> 3) as u8
                        | ((length_adjusted & 0b0000_0111) << 2) as u8
                        | literal & 0b0000_0011,
                )?;
                writer.write_u8((offset_adjusted & 0b1111_1111) as u8)
            }
            Command::Medium {
                offset,
                length,
                literal,
            } => {
                let length_adjusted = u32::from(length - 4);
                let offset_adjusted = offset - 1;

                writer.write_u8((0b1000_0000 | length_adjusted & 0b0011_1111) as u8)?;
                writer.write_u8(((literal & 0b0000_0011) << 6) | (offset_adjusted >> 8) as u8)?;
                writer.write_u8((offset_adjusted & 0b1111_1111) as u8)
            }
            Command::Long {
                offset,
                length,
                literal,
            } => {
                let length_adjusted = u32::from(length - 5);
                let offset_adjusted = offset - 1;

                writer.write_u8(
                    0b1100_0000u8
                        | ((offset_adjusted >> 12) & 0b0001_0000) as u8
                        | ((length_adjusted >> 6) & 0b0000_1100) as u8
                        | literal & 0b0000_0011,
                )?;
                writer.write_u8(((offset_adjusted >> 8) & 0b1111_1111) as u8)?;
                writer.write_u8((offset_adjusted & 0b1111_1111) as u8)?;
                writer.write_u8((length_adjusted & 0b1111_1111) as u8)
            }
            Command::Literal(literal) => {
                writer.write_u8(0b1110_0000 | (((literal - 4) >> 2) & 0b0001_1111))
            }
            Command::Stop(literal) => writer.write_u8(0b1111_1100 | (literal & 0b0000_0011)),
        }
    }
}
