//! Streaming store-only ZIP writer.
//!
//! ## Writing Strategy
//!
//! Each entry is written in one pass:
//! 1. A Local File Header with the final size and a zeroed CRC-32
//! 2. The entry data, streamed in chunks while CRC-32 and SHA-256 are computed
//! 3. A seek back to patch the CRC-32 into the Local File Header
//!
//! The Central Directory and End of Central Directory records are written
//! by [`ZipWriter::finish`]. Because sizes are known up front, no data
//! descriptors are needed, which keeps the output readable by streaming
//! unzip tools.

use flate2::Crc;
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::io::{CHUNK_SIZE, ContentDigest};
use anyhow::{Result, bail};

use super::structures::*;

/// Digest and size of an entry, as computed while it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDigest {
    pub hash: String,
    pub bytes: u64,
}

/// Store-only ZIP writer over any seekable async sink.
///
/// The writer assumes it owns the sink from offset 0. Entries must be
/// written one at a time from a single task.
pub struct ZipWriter<W> {
    inner: W,
    /// Current write offset in the sink
    position: u64,
    /// Central Directory records, in write order
    entries: Vec<CentralDirectoryHeader>,
}

impl<W: AsyncWrite + AsyncSeek + Unpin> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            entries: Vec::new(),
        }
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write one entry of exactly `size` bytes read from `data`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names, on I/O errors, or when `data` yields
    /// a different number of bytes than announced.
    pub async fn write_entry<R>(&mut self, file_name: &str, size: u64, mut data: R) -> Result<EntryDigest>
    where
        R: AsyncRead + Unpin,
    {
        if self.entries.iter().any(|e| e.file_name == file_name) {
            bail!("Duplicate entry name: {}", file_name);
        }

        let lfh_offset = self.position;
        let header = LocalFileHeader {
            file_name: file_name.to_string(),
            modified: DosDateTime::now(),
            crc32: 0,
            size,
        };
        let header_bytes = header.to_bytes()?;
        self.inner.write_all(&header_bytes).await?;
        self.position += header_bytes.len() as u64;

        // Stream data through CRC-32 and SHA-256
        let mut crc = Crc::new();
        let mut digest = ContentDigest::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = data.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            crc.update(&buf[..n]);
            digest.update(&buf[..n]);
            self.inner.write_all(&buf[..n]).await?;
            self.position += n as u64;
        }

        if digest.bytes() != size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                file_name,
                size,
                digest.bytes()
            );
        }

        // Patch the CRC-32 now that it is known, then return to the end
        let crc32 = crc.sum();
        self.inner
            .seek(SeekFrom::Start(lfh_offset + LFH_CRC_OFFSET))
            .await?;
        self.inner.write_all(&crc32.to_le_bytes()).await?;
        self.inner.seek(SeekFrom::Start(self.position)).await?;

        trace!(file_name, size, crc32, "wrote zip entry");

        self.entries.push(CentralDirectoryHeader {
            file_name: header.file_name,
            modified: header.modified,
            crc32,
            size,
            lfh_offset,
        });

        let (hash, bytes) = digest.finish();
        Ok(EntryDigest { hash, bytes })
    }

    /// Write an in-memory entry
    pub async fn write_bytes(&mut self, file_name: &str, data: &[u8]) -> Result<EntryDigest> {
        self.write_entry(file_name, data.len() as u64, data).await
    }

    /// Write the Central Directory and end records, flush, and hand back the sink
    pub async fn finish(mut self) -> Result<W> {
        let cd_offset = self.position;
        for entry in &self.entries {
            let bytes = entry.to_bytes()?;
            self.inner.write_all(&bytes).await?;
            self.position += bytes.len() as u64;
        }
        let cd_size = self.position - cd_offset;

        let eocd = EndOfCentralDirectory {
            total_entries: self.entries.len() as u64,
            cd_size,
            cd_offset,
        };

        let needs_zip64 = eocd.is_zip64() || self.entries.iter().any(|e| e.needs_zip64());
        if needs_zip64 {
            let eocd64_offset = self.position;
            let eocd64 = Zip64EOCD {
                total_entries: eocd.total_entries,
                cd_size,
                cd_offset,
            };
            let bytes = eocd64.to_bytes()?;
            self.inner.write_all(&bytes).await?;
            self.position += bytes.len() as u64;

            let bytes = Zip64EOCDLocator { eocd64_offset }.to_bytes()?;
            self.inner.write_all(&bytes).await?;
            self.position += bytes.len() as u64;
        }

        let bytes = eocd.to_bytes()?;
        self.inner.write_all(&bytes).await?;
        self.position += bytes.len() as u64;

        self.inner.flush().await?;
        trace!(entries = self.entries.len(), size = self.position, "finished zip");

        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[tokio::test]
    async fn entries_round_trip_through_a_zip_reader() -> Result<()> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let hello = writer.write_bytes("hello.txt", b"HELLO WORLD").await?;
        writer.write_bytes("indexes/index.idx", b"!meta 0 {}\n").await?;
        assert_eq!(writer.len(), 2);
        let cursor = writer.finish().await?;

        assert_eq!(hello.bytes, 11);
        assert_eq!(hello.hash, crate::io::sha256_bytes(b"HELLO WORLD"));

        let mut archive = ::zip::ZipArchive::new(Cursor::new(cursor.into_inner()))?;
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_name("hello.txt")?;
        assert_eq!(entry.compression(), ::zip::CompressionMethod::Stored);
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        assert_eq!(content, "HELLO WORLD");
        Ok(())
    }

    #[tokio::test]
    async fn empty_entry_is_allowed() -> Result<()> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let digest = writer.write_bytes("indexes/index.cdx.gz", b"").await?;
        assert_eq!(digest.bytes, 0);
        let cursor = writer.finish().await?;

        let mut archive = ::zip::ZipArchive::new(Cursor::new(cursor.into_inner()))?;
        assert_eq!(archive.by_name("indexes/index.cdx.gz")?.size(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn size_mismatch_is_rejected() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let result = writer.write_entry("short.bin", 10, &b"abc"[..]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() -> Result<()> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.write_bytes("a.txt", b"1").await?;
        assert!(writer.write_bytes("a.txt", b"2").await.is_err());
        Ok(())
    }
}
