////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

use std::cmp::min;
use std::mem::size_of;

const USIZE_BYTES: usize = size_of::<usize>();

/// index of the first differing byte between two words, if any
#[inline(always)]
fn compare_block(src: &[u8], cmp: &[u8]) -> Option<usize> {
    let mut src_word = [0u8; USIZE_BYTES];
    let mut cmp_word = [0u8; USIZE_BYTES];
    src_word.copy_from_slice(src);
    cmp_word.copy_from_slice(cmp);

    let xor = usize::from_le_bytes(src_word) ^ usize::from_le_bytes(cmp_word);

    if xor == 0 {
        None
    } else {
        Some((xor.trailing_zeros() / 8) as usize)
    }
}

/// find the length of common bytes between `source` and an earlier
/// `matched_pos` in the same buffer, capped at `max_len`.
///
/// `skip` is the number of leading bytes already known to match.
#[inline]
pub fn match_length(
    buffer: &[u8],
    source: usize,
    matched_pos: usize,
    max_len: usize,
    skip: usize,
) -> usize {
    debug_assert!(matched_pos < source);

    let end = min(source + max_len, buffer.len());
    if source + skip >= end {
        return end.saturating_sub(source);
    }

    let source_slice = &buffer[source + skip..end];
    let match_slice = &buffer[matched_pos + skip..];

    let source_chunks = source_slice.chunks_exact(USIZE_BYTES);
    let remainder = source_chunks.remainder();

    let mut num = skip;
    for (src, cmp) in source_chunks.zip(match_slice.chunks_exact(USIZE_BYTES)) {
        if let Some(found) = compare_block(src, cmp) {
            return num + found;
        }
        num += USIZE_BYTES;
    }

    num + remainder
        .iter()
        .zip(&match_slice[num - skip..])
        .take_while(|(a, b)| a == b)
        .count()
}
