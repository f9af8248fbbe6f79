//! Two-tier ("ZipNum") shared index.
//!
//! The sorted CDXJ lines are cut into shards of [`SHARED_INDEX_LIMIT`] lines.
//! Each shard becomes its own gzip member in `index.cdx.gz`; `index.idx`
//! holds one line per shard with the shard's first key and its location in
//! the blob, so a reader can binary search the small table and inflate a
//! single member.

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::debug;

use crate::indexer::sort_key;
use crate::io::sha256_bytes;

/// Lines per shard
pub const SHARED_INDEX_LIMIT: usize = 3000;

/// File name of the shard blob inside `indexes/`
pub const CDX_BLOB_NAME: &str = "index.cdx.gz";

pub const CDX_BLOB_PATH: &str = "indexes/index.cdx.gz";
pub const IDX_PATH: &str = "indexes/index.idx";

/// First line of the lookup table
pub const IDX_META_LINE: &str = "!meta 0 {\"format\": \"cdxj-gzip-1.0\", \"filename\": \"index.cdx.gz\"}\n";

/// Location of one shard inside the blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardLocation {
    pub offset: u64,
    pub length: u64,
    pub digest: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct SharedIndex {
    /// Concatenated gzip members
    pub blob: Vec<u8>,
    /// Lookup table, meta line first
    pub lookup: String,
    pub shards: Vec<ShardLocation>,
}

/// Shard sorted index lines, `limit` lines per shard.
///
/// Every line lands in exactly one shard; the last shard may be short.
pub fn build_shared_index(lines: &[String], limit: usize) -> Result<SharedIndex> {
    let limit = limit.max(1);
    let mut index = SharedIndex {
        lookup: IDX_META_LINE.to_string(),
        ..Default::default()
    };

    for chunk in lines.chunks(limit) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for line in chunk {
            encoder.write_all(line.as_bytes())?;
        }
        let member = encoder.finish()?;

        let location = ShardLocation {
            offset: index.blob.len() as u64,
            length: member.len() as u64,
            digest: sha256_bytes(&member),
            filename: CDX_BLOB_NAME.to_string(),
        };

        // Chunks are never empty
        let first_key = sort_key(&chunk[0]);
        index.lookup.push_str(&format!(
            "{} {}\n",
            first_key,
            serde_json::to_string(&location)?
        ));

        index.blob.extend_from_slice(&member);
        index.shards.push(location);
    }

    debug!(
        lines = lines.len(),
        shards = index.shards.len(),
        bytes = index.blob.len(),
        "built shared index"
    );
    Ok(index)
}
