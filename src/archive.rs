//! Archive assembly and the resource ledger.
//!
//! [`ArchiveAssembler`] owns the output ZIP. Anything that should be listed in
//! `datapackage.json` goes through [`ArchiveAssembler::add_file`], which
//! streams the content in and records its digest and size in the same pass.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncSeek, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::io::ByteSource;
use crate::zipfile::{EntryDigest, ZipWriter};

/// One file stored in the archive, as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Base name of `path`
    pub name: String,
    /// Path inside the archive
    pub path: String,
    /// `sha256:<hex>` of the stored bytes
    pub hash: String,
    pub bytes: u64,
}

pub struct ArchiveAssembler<W> {
    zip: ZipWriter<W>,
    resources: Vec<ResourceEntry>,
}

impl ArchiveAssembler<tokio::fs::File> {
    /// Create (or truncate) the output file
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("cannot create {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: AsyncWrite + AsyncSeek + Unpin> ArchiveAssembler<W> {
    pub fn new(inner: W) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            resources: Vec::new(),
        }
    }

    /// Store `source` at `path` and record it in the ledger.
    ///
    /// Files are streamed from disk; their digest is computed while copying.
    pub async fn add_file(&mut self, source: ByteSource, path: &str) -> Result<ResourceEntry> {
        let EntryDigest { hash, bytes } = self.write(source, path).await?;

        let entry = ResourceEntry {
            name: base_name(path).to_string(),
            path: path.to_string(),
            hash,
            bytes,
        };
        debug!(path, bytes, "added resource");
        self.resources.push(entry.clone());
        Ok(entry)
    }

    /// Store `data` at `path` without recording it in the ledger
    pub async fn add_untracked(&mut self, data: &[u8], path: &str) -> Result<EntryDigest> {
        self.zip.write_bytes(path, data).await
    }

    /// Ledger of every tracked file written so far, in write order
    pub fn resources(&self) -> &[ResourceEntry] {
        &self.resources
    }

    /// Write the ZIP trailer and wait until the sink is flushed and closed
    pub async fn finalize(self) -> Result<W> {
        let mut inner = self.zip.finish().await?;
        inner.shutdown().await?;
        Ok(inner)
    }

    async fn write(&mut self, source: ByteSource, path: &str) -> Result<EntryDigest> {
        match source {
            ByteSource::Bytes(bytes) => self.zip.write_bytes(path, &bytes).await,
            ByteSource::Path(file_path) => {
                let file = tokio::fs::File::open(&file_path)
                    .await
                    .with_context(|| format!("cannot open {}", file_path.display()))?;
                let size = file.metadata().await?.len();
                self.zip
                    .write_entry(path, size, file)
                    .await
                    .with_context(|| format!("cannot store {} as {}", file_path.display(), path))
            }
        }
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
