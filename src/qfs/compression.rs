////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Compression scheme is lz77 with a hash chain over 3 byte prefixes.
//!
//! Every input position is entered into the chain under the 3 bytes starting
//! there. At each position not already covered by a match, up to
//! [CompressionOptions::max_iterations] of the most recent earlier positions
//! with the same prefix are tried and the longest run wins.
//!
//! Matches that cost more to encode than the literals they replace are
//! dropped:
//! - length 3 further back than 1024 bytes
//! - length 4 further back than 16384 bytes
//!
//! Pending literals are written before each back-reference in runs of a
//! multiple of 4 (up to 112), and the 0 to 3 left over ride along in the
//! back-reference command itself. The stream ends with a stopcode carrying the
//! final 0 to 3 bytes.
use std::cmp::min;
use std::collections::HashMap;
use std::io::Write;

use tracing::trace;

use crate::qfs::control::{
    Command,
    COPY_LITERAL_MAX,
    LITERAL_MAX,
    LONG_LENGTH_MAX,
    LONG_OFFSET_MAX,
    MEDIUM_OFFSET_MAX,
    SHORT_OFFSET_MAX,
};
use crate::qfs::header::{self, Header};
use crate::qfs::match_length::match_length;
use crate::qfs::{CompressionOptions, MAX_INPUT_LENGTH};
use crate::{DbpfError, DbpfResult};

// only LONG_OFFSET_MAX positions have to be kept, but modulo by a power of
// two is cheaper
const HASH_CHAIN_MODULO: usize = 1 << 18;

const NO_POSITION: u32 = u32::MAX;

fn prefix(input_buf: &[u8]) -> [u8; 3] {
    [input_buf[0], input_buf[1], input_buf[2]]
}

/// Maps each 3 byte prefix to the last position it was seen at, and each
/// position to the previous one sharing its prefix.
struct HashChain {
    heads: HashMap<[u8; 3], u32>,
    links: Vec<u32>,
}

impl HashChain {
    fn new(bytes: usize) -> Self {
        Self {
            heads: HashMap::new(),
            links: vec![NO_POSITION; min(bytes, HASH_CHAIN_MODULO)],
        }
    }

    /// Record `position` and return the previous position with this prefix
    fn insert(&mut self, prefix: [u8; 3], position: u32) -> Option<u32> {
        let previous = self.heads.insert(prefix, position);
        self.links[position as usize % HASH_CHAIN_MODULO] = previous.unwrap_or(NO_POSITION);
        previous
    }

    /// Walk earlier positions, most recent first, while they stay inside the
    /// back-reference window of `origin`
    fn candidates(&self, first: Option<u32>, origin: u32) -> Candidates<'_> {
        Candidates {
            chain: self,
            origin,
            next: first,
        }
    }
}

struct Candidates<'a> {
    chain: &'a HashChain,
    origin: u32,
    next: Option<u32>,
}

impl Iterator for Candidates<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.next.filter(|&pos| self.origin - pos < LONG_OFFSET_MAX)?;
        let link = self.chain.links[position as usize % HASH_CHAIN_MODULO];
        self.next = (link != NO_POSITION).then_some(link);
        Some(position)
    }
}

/// A back-reference only pays off once it is cheaper than the literals
fn is_worthwhile(length: usize, offset: usize) -> bool {
    match length {
        0..=2 => false,
        3 => offset <= SHORT_OFFSET_MAX as usize,
        4 => offset <= MEDIUM_OFFSET_MAX as usize,
        _ => true,
    }
}

/// Writes pending literals in runs of multiples of 4 until fewer than 4 are
/// left, returning the new start of the pending literals
fn write_literal_runs(
    input: &[u8],
    mut anchor: usize,
    until: usize,
    writer: &mut impl Write,
) -> std::io::Result<usize> {
    while until - anchor > COPY_LITERAL_MAX as usize {
        let run = min((until - anchor) & !0b11, LITERAL_MAX as usize);
        Command::new_literal(run as u8).write(writer)?;
        writer.write_all(&input[anchor..anchor + run])?;
        anchor += run;
    }
    Ok(anchor)
}

/// Encodes `input` into control blocks, without header
pub(crate) fn encode(
    input: &[u8],
    options: &CompressionOptions,
    writer: &mut impl Write,
) -> std::io::Result<()> {
    let mut chain = HashChain::new(input.len());
    // first byte not yet written out
    let mut anchor = 0;
    let mut position = 0;

    while position + 3 <= input.len() {
        let found = chain.insert(prefix(&input[position..]), position as u32);
        if position < anchor {
            position += 1;
            continue;
        }

        let mut best_length = 0;
        let mut best_offset = 0;
        for candidate in chain
            .candidates(found, position as u32)
            .take(options.max_iterations)
        {
            let candidate = candidate as usize;
            let length = match_length(input, position, candidate, LONG_LENGTH_MAX as usize, 0);
            if length > best_length {
                best_length = length;
                best_offset = position - candidate;
            }
        }

        if is_worthwhile(best_length, best_offset) {
            anchor = write_literal_runs(input, anchor, position, writer)?;
            let literal = position - anchor;
            Command::new(best_offset as u32, best_length as u16, literal as u8).write(writer)?;
            writer.write_all(&input[anchor..position])?;
            anchor = position + best_length;
        }
        position += 1;
    }

    anchor = write_literal_runs(input, anchor, input.len(), writer)?;
    Command::new_stop((input.len() - anchor) as u8).write(writer)?;
    writer.write_all(&input[anchor..])?;
    Ok(())
}

/// Compress `input` into a QFS stream, header included.
///
/// When the stream would come out larger than `input`, `input` is returned
/// unchanged and no header is added. Callers should compare lengths to find
/// out whether compression happened.
///
/// # Errors
/// - [DbpfError::FileTooLarge]: input is larger than 16 MiB
pub fn compress_with(input: &[u8], options: &CompressionOptions) -> DbpfResult<Vec<u8>> {
    if input.len() > MAX_INPUT_LENGTH {
        return Err(DbpfError::FileTooLarge(input.len()));
    }

    let mut out = Vec::with_capacity(input.len() / 2 + header::LENGTH);
    out.resize(header::LENGTH, 0);
    encode(input, options, &mut out)?;

    if out.len() > input.len() {
        trace!(
            "QFS output of {} bytes is larger than the {} byte input, keeping input",
            out.len(),
            input.len()
        );
        return Ok(input.to_vec());
    }

    let header = Header {
        compressed_length: out.len() as u32,
        decompressed_length: input.len() as u32,
    };
    header.write(&mut &mut out[..header::LENGTH])?;

    trace!("QFS: {} bytes -> {} bytes", input.len(), out.len());
    Ok(out)
}
