////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Decompression parsing and algorithms.
//!
//! The header is checked for the QFS magic, then the stream is read as a
//! sequence of control blocks: a command followed by its literal bytes.
//! Literal bytes are always written before the back-reference of the same
//! block is resolved.
//!
//! Back-references are run length encoded: the length may be longer than the
//! offset, in which case the bytes inside the lookback window repeat until the
//! length is fulfilled. Given the output `DEADBEEF` and a back-reference with
//! offset 4 and length 16, the output becomes `DEADBEEFBEEFBEEFBEEFBEEF`.
//!
//! The output buffer is sized by the caller rather than by the stream header.
//! Packages record the decompressed size in their directory, and a stream
//! that tries to write outside of that buffer is treated as corrupt.
use std::io::Cursor;

use crate::error::DecodeError;
use crate::qfs::control::Command;
use crate::qfs::header::{self, Header};
use crate::qfs::MAX_INPUT_LENGTH;
use crate::{DbpfError, DbpfResult};

/// Takes the last `offset` items of the buffer and repeatedly copies them
/// to `position` until `length` items have been copied.
///
/// If this function errors no data will have been copied
///
/// # Returns
/// the new position of the buffer after the copy
#[inline(always)]
pub(crate) fn rle_decode_fixed<T: Copy>(
    buffer: &mut [T],
    mut position: usize,
    mut offset: usize,
    mut length: usize,
) -> Result<usize, DecodeError> {
    if offset == 0 || offset > position {
        return Err(DecodeError::NegativePosition(position, offset));
    }
    if position + length > buffer.len() {
        return Err(DecodeError::OutputOverrun(position + length, buffer.len()));
    }

    let copy_fragment_start = position - offset;

    while length > offset {
        buffer.copy_within(copy_fragment_start..position, position);
        length -= offset;
        position += offset;
        offset *= 2;
    }

    buffer.copy_within(
        copy_fragment_start..(copy_fragment_start + length),
        position,
    );
    position += length;

    Ok(position)
}

/// Copy `length` literal bytes from `input` at `input_pos` into `buffer` at
/// `position`
///
/// # Returns
/// the new `(input_pos, position)` after the copy
#[inline(always)]
fn copy_literal(
    buffer: &mut [u8],
    input: &[u8],
    input_pos: usize,
    position: usize,
    length: usize,
) -> Result<(usize, usize), DecodeError> {
    if input_pos + length > input.len() {
        return Err(DecodeError::InputExhausted(input_pos + length, input.len()));
    }
    if position + length > buffer.len() {
        return Err(DecodeError::OutputOverrun(position + length, buffer.len()));
    }
    buffer[position..position + length].copy_from_slice(&input[input_pos..input_pos + length]);
    Ok((input_pos + length, position + length))
}

/// Decompress a QFS stream into a buffer of exactly `decompressed_size` bytes.
///
/// Decoding stops at the first stopcode or when the input runs out. Output
/// not reached by the stream stays zeroed.
///
/// # Errors
/// - [DbpfError::InvalidMagicHeader]: the stream does not carry the QFS magic,
///   likely meaning the data isn't compressed
/// - [DbpfError::ArrayTooSmall]: a control block reached outside of the input
///   or the output buffer; the stream is corrupt or `decompressed_size` is
///   wrong. Also raised before decoding when `decompressed_size` is larger
///   than 16 MiB
pub fn decompress(input: &[u8], decompressed_size: usize) -> DbpfResult<Vec<u8>> {
    let mut reader = Cursor::new(input);
    Header::read(&mut reader).map_err(|error| match error {
        DbpfError::Io(_) => DbpfError::ArrayTooSmall {
            position: 0,
            error: DecodeError::InputExhausted(header::LENGTH, input.len()),
        },
        other => other,
    })?;

    if decompressed_size > MAX_INPUT_LENGTH {
        return Err(DbpfError::ArrayTooSmall {
            position: 0,
            error: DecodeError::SizeLimit(decompressed_size, MAX_INPUT_LENGTH),
        });
    }

    let mut buffer = vec![0u8; decompressed_size];
    let mut position = 0usize;
    let mut input_pos = header::LENGTH;

    while input_pos < input.len() {
        reader.set_position(input_pos as u64);
        let command = Command::read(&mut reader).map_err(|_| DbpfError::ArrayTooSmall {
            position,
            error: DecodeError::InputExhausted(input_pos + 1, input.len()),
        })?;
        input_pos = reader.position() as usize;

        let wrap = move |error| DbpfError::ArrayTooSmall { position, error };

        (input_pos, position) =
            copy_literal(&mut buffer, input, input_pos, position, command.num_of_literal())
                .map_err(wrap)?;

        if let Some((offset, length)) = command.offset_copy() {
            position = rle_decode_fixed(&mut buffer, position, offset, length).map_err(wrap)?;
        }

        if command.is_stop() {
            break;
        }
    }

    Ok(buffer)
}
