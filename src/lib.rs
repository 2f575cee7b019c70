////////////////////////////////////////////////////////////////////////////////
// This Source Code Form is subject to the terms of the Mozilla Public         /
// License, v. 2.0. If a copy of the MPL was not distributed with this         /
// file, You can obtain one at https://mozilla.org/MPL/2.0/.                   /
//                                                                             /
////////////////////////////////////////////////////////////////////////////////

//! Reading and writing DBPF packages as used by The Sims 2, including the QFS
//! compression their entries are stored with.
//!
//! ```no_run
//! use dbpf::{types, Dbpf, EntryKey};
//!
//! # fn main() -> dbpf::DbpfResult<()> {
//! let mut package = Dbpf::open("ui.package")?;
//! let key = EntryKey::new(types::UI_DATA, 0xA99D_8A11, 0x8000_0001, 0);
//! let entry = package.get_entry_mut(&key)?;
//! let mut script = entry.data()?.to_vec();
//! script.extend_from_slice(b"\r\n");
//! entry.set_data(script);
//! package.save("ui_patched.package")?;
//! # Ok(())
//! # }
//! ```
//!
//! Entry payloads are read lazily and decompressed on first access; the
//! decoded bytes are cached on the entry. On save, every entry flagged
//! `compress` is compressed and verified, and the compressed-files directory
//! is regenerated from those flags.

#![warn(clippy::pedantic, clippy::cargo)]
// Due to the high amount of byte conversions, sometimes intentional lossy conversions are necessary.
#![allow(clippy::cast_possible_truncation)]
// Default::default() is more idiomatic imo
#![allow(clippy::default_trait_access)]
// too many lines is a dumb metric
#![allow(clippy::too_many_lines)]
// [Error] is re-exported under a prefixed name
#![allow(clippy::module_name_repetitions)]

pub mod directory;
pub mod entry;
mod error;
pub mod header;
pub mod index;
pub mod package;
pub mod qfs;
pub mod types;

pub use crate::directory::{Directory, DirectoryRecord};
pub use crate::entry::{Entry, EntryKey};
pub use crate::error::{DecodeError, Error as DbpfError, Result as DbpfResult};
pub use crate::header::{Header, Version};
pub use crate::package::Dbpf;
pub use crate::qfs::CompressionOptions;
