//! Record indexing.
//!
//! One capture file at a time is turned into CDXJ lines and, optionally,
//! page entries. [`pool::index_all`] fans this out over a bounded set of
//! blocking workers.

mod cdxj;
mod pool;

pub use cdxj::{INDEXABLE_TYPES, WARC_FIELDS_MIME, cdxj_line, is_indexable, sort_key, warc_timestamp};
pub use pool::{default_concurrency, index_all};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::pages::PageEntry;
use crate::warc::{WarcReader, WarcRecord, extract_title};

/// Which outputs to produce while reading a capture file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPlan {
    pub entries: bool,
    pub pages: bool,
}

impl IndexPlan {
    pub fn is_noop(&self) -> bool {
        !self.entries && !self.pages
    }
}

/// Everything extracted from one capture file
#[derive(Debug, Default)]
pub struct IndexedFile {
    pub entries: Vec<String>,
    pub pages: Vec<PageEntry>,
}

/// Read a capture file and index its records.
///
/// Fails if the file cannot be opened or a record cannot be parsed. A page
/// whose body cannot be decoded is left out without failing the file.
pub fn index_file(path: &Path, plan: IndexPlan) -> Result<IndexedFile> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("no file name in {}", path.display()))?;

    let mut reader = WarcReader::open(path)?;
    let mut out = IndexedFile::default();

    while let Some(record) = reader.next_record()? {
        if plan.entries {
            if let Some(line) = cdxj_line(&record, &filename)? {
                out.entries.push(line);
            }
        }

        if plan.pages && is_page_candidate(&record) {
            match page_from_record(&record) {
                Ok(Some(page)) => out.pages.push(page),
                Ok(None) => {}
                Err(e) => {
                    warn!(file = %filename, offset = record.offset, "pages: skipping record");
                    trace!("page extraction failed: {:#}", e);
                }
            }
        }
    }

    debug!(
        file = %filename,
        entries = out.entries.len(),
        pages = out.pages.len(),
        gzipped = reader.is_gzipped(),
        "indexed capture file"
    );
    Ok(out)
}

/// Successful HTML response with a target URI and a capture date
pub fn is_page_candidate(record: &WarcRecord) -> bool {
    let is_response = record
        .record_type()
        .map(|t| t.eq_ignore_ascii_case("response"))
        .unwrap_or(false);
    if !is_response || record.target_uri().is_none() || record.date().is_none() {
        return false;
    }

    let Some(http) = record.http() else {
        return false;
    };
    let ok_status = http.status.map(|s| s <= 299).unwrap_or(false);
    let is_html = http
        .header("Content-Type")
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false);

    ok_status && is_html
}

/// Page entry for a candidate record; the title comes from the decoded body
pub fn page_from_record(record: &WarcRecord) -> Result<Option<PageEntry>> {
    let (Some(url), Some(ts)) = (record.target_uri(), record.date()) else {
        return Ok(None);
    };
    let Some(http) = record.http() else {
        return Ok(None);
    };

    let body = http.decoded_body()?;
    Ok(Some(PageEntry::new(url, extract_title(&body), ts)))
}

/// Non-empty lines of every `.cdx` / `.cdxj` file in a directory, files in name order
pub async fn read_cdxj_dir(dir: &Path) -> Result<Vec<String>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot read index directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        let is_index = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("cdx") || ext.eq_ignore_ascii_case("cdxj"))
            .unwrap_or(false);
        if is_index && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut lines = Vec::new();
    for path in files {
        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        let before = lines.len();
        lines.extend(
            contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| format!("{line}\n")),
        );
        debug!(file = %path.display(), lines = lines.len() - before, "read index file");
    }

    Ok(lines)
}
