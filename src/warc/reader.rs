//! Sequential WARC record reader.
//!
//! ## Layouts
//!
//! - Plain `.warc`: records follow each other, separated by two CRLFs.
//! - `.warc.gz`: one gzip member per record. Record offsets and lengths
//!   then refer to the compressed member, which is what replay tools seek to.
//!
//! The layout is detected from the first two bytes (gzip magic), not the
//! file extension.

use flate2::bufread::GzDecoder;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::warn;

use super::record::WarcRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Byte-counting wrapper, so record boundaries can be reported
pub(crate) struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.position += amt as u64;
    }
}

/// Reader yielding [`WarcRecord`]s from a plain or record-gzipped WARC stream
pub struct WarcReader<R> {
    inner: CountingReader<R>,
    gzipped: bool,
    /// Extra records found inside a single gzip member
    pending: VecDeque<WarcRecord>,
}

impl WarcReader<BufReader<File>> {
    /// Open a capture file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut inner = CountingReader::new(reader);
        let gzipped = inner.fill_buf()?.starts_with(&GZIP_MAGIC);
        Ok(Self {
            inner,
            gzipped,
            pending: VecDeque::new(),
        })
    }

    pub fn is_gzipped(&self) -> bool {
        self.gzipped
    }

    /// Read the next record, or `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<WarcRecord>> {
        if let Some(record) = self.pending.pop_front() {
            return Ok(Some(record));
        }

        if self.gzipped {
            self.next_gzip_member()
        } else {
            let Some(raw) = read_raw_record(&mut self.inner)? else {
                return Ok(None);
            };
            let (start, end) = (raw.start, raw.end);
            Ok(Some(raw.into_record(start, end - start)))
        }
    }

    fn next_gzip_member(&mut self) -> Result<Option<WarcRecord>> {
        if self.inner.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let start = self.inner.position();
        let mut member = Vec::new();
        GzDecoder::new(&mut self.inner)
            .read_to_end(&mut member)
            .with_context(|| format!("invalid gzip member at offset {start}"))?;
        let length = self.inner.position() - start;

        let mut cursor = CountingReader::new(Cursor::new(member));
        let mut records = VecDeque::new();
        while let Some(raw) = read_raw_record(&mut cursor)? {
            records.push_back(raw.into_record(start, length));
        }

        if records.len() > 1 {
            warn!(
                offset = start,
                records = records.len(),
                "gzip member holds several records; they share one offset and length"
            );
        }

        let Some(first) = records.pop_front() else {
            bail!("Empty gzip member at offset {}", start);
        };
        self.pending = records;
        Ok(Some(first))
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<WarcRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

struct RawRecord {
    version: String,
    headers: Vec<(String, String)>,
    block: Vec<u8>,
    start: u64,
    end: u64,
}

impl RawRecord {
    fn into_record(self, offset: u64, length: u64) -> WarcRecord {
        WarcRecord {
            version: self.version,
            headers: self.headers,
            block: self.block,
            offset,
            length,
        }
    }
}

fn read_raw_record<R: BufRead>(src: &mut CountingReader<R>) -> Result<Option<RawRecord>> {
    let mut line = Vec::new();

    // Skip blank lines left between records
    let (start, version) = loop {
        let start = src.position();
        line.clear();
        if src.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&line).trim().to_string();
        if text.is_empty() {
            continue;
        }
        if !text.starts_with("WARC/") {
            bail!("Invalid WARC record at offset {}: expected version line", start);
        }
        break (start, text);
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    loop {
        line.clear();
        if src.read_until(b'\n', &mut line)? == 0 {
            bail!("Truncated WARC headers at offset {}", start);
        }
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim_end_matches(|c| c == '\r' || c == '\n');
        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with(|c: char| c == ' ' || c == '\t') {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(trimmed.trim());
            }
            continue;
        }
        let (name, value) = trimmed
            .split_once(':')
            .with_context(|| format!("malformed WARC header line: {trimmed:?}"))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let content_length: u64 = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, value)| value.parse())
        .transpose()
        .context("invalid Content-Length")?
        .with_context(|| format!("missing Content-Length in record at offset {start}"))?;

    let mut block = Vec::new();
    src.by_ref()
        .take(content_length)
        .read_to_end(&mut block)?;
    if (block.len() as u64) != content_length {
        bail!("Truncated WARC block at offset {}", start);
    }

    // Record trailer: two CRLFs (tolerate bare LFs)
    for _ in 0..2 {
        let buf = src.fill_buf()?;
        if buf.starts_with(b"\r\n") {
            src.consume(2);
        } else if buf.starts_with(b"\n") {
            src.consume(1);
        }
    }

    Ok(Some(RawRecord {
        version,
        headers,
        block,
        start,
        end: src.position(),
    }))
}
