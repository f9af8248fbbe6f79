//! ZIP container writing.
//!
//! This module produces the ZIP envelope of a WACZ archive. Every entry is
//! written with the STORED method; WACZ readers seek into stored WARC files
//! by offset.
//!
//! ## Architecture
//!
//! - [`structures`]: Header records (Local File Header, Central Directory, EOCD, ZIP64)
//!   and their little-endian serialization
//! - [`writer`]: [`ZipWriter`], which streams entries into any seekable async sink
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - ZIP64 extensions for entries, offsets and entry counts past the classic limits
//! - UTF-8 file names
//!
//! ## Limitations
//!
//! - No compression, encryption or multi-disk output
//! - The sink must be seekable (CRC-32 is patched into each Local File Header)

mod structures;
mod writer;

pub use structures::*;
pub use writer::{EntryDigest, ZipWriter};
