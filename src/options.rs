//! Pipeline configuration.
//!
//! [`WaczOptions`] is what a caller fills in; [`WaczOptions::validate`] turns
//! it into an immutable [`WaczConfig`] or a configuration error.

use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::error::{WaczError, WaczResult};
use crate::indexer::default_concurrency;
use crate::manifest::{iso_timestamp, normalize_timestamp};
use crate::signing::DEFAULT_SIGNING_TIMEOUT;

pub const DEFAULT_OUTPUT: &str = "archive.wacz";

#[derive(Debug, Clone)]
pub struct WaczOptions {
    /// Capture files, already glob-expanded. Entries not ending in `.warc` or
    /// `.warc.gz` are ignored.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Detect pages from HTML responses
    pub detect_pages: bool,
    /// Build the index from the capture files
    pub index_from_warcs: bool,
    /// Directory of `.jsonl` page lists copied as-is (disables page detection)
    pub pages_dir: Option<PathBuf>,
    /// Directory of `.cdx` / `.cdxj` files to use as the index (disables indexing)
    pub cdxj_dir: Option<PathBuf>,
    /// Main page URL
    pub url: Option<String>,
    /// Main page date
    pub ts: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub signing_url: Option<String>,
    pub signing_token: Option<String>,
    /// Extra JSON object stored under `extras` in `datapackage.json`
    pub datapackage_extras: Option<serde_json::Value>,
    /// Indexing workers; defaults to the available parallelism
    pub concurrency: Option<usize>,
    pub signing_timeout: Duration,
}

impl Default for WaczOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            detect_pages: true,
            index_from_warcs: true,
            pages_dir: None,
            cdxj_dir: None,
            url: None,
            ts: None,
            title: None,
            description: None,
            signing_url: None,
            signing_token: None,
            datapackage_extras: None,
            concurrency: None,
            signing_timeout: DEFAULT_SIGNING_TIMEOUT,
        }
    }
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct WaczConfig {
    pub warcs: Vec<PathBuf>,
    pub output: PathBuf,
    pub detect_pages: bool,
    pub index_from_warcs: bool,
    pub pages_dir: Option<PathBuf>,
    pub cdxj_dir: Option<PathBuf>,
    pub url: Option<String>,
    /// ISO-8601, millisecond precision, `Z` suffix
    pub ts: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub signing_url: Option<String>,
    pub signing_token: Option<String>,
    pub datapackage_extras: Option<serde_json::Value>,
    pub concurrency: usize,
    pub signing_timeout: Duration,
}

impl WaczOptions {
    /// Check every option.
    ///
    /// The only side effect is removing a pre-existing file at `output`.
    pub fn validate(self) -> WaczResult<WaczConfig> {
        let warcs = select_warcs(&self.inputs)?;

        let output = self.output;
        let is_wacz = output
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase().ends_with(".wacz"))
            .unwrap_or(false);
        if !is_wacz {
            return Err(WaczError::config(format!(
                "output must be a path ending with .wacz, got {}",
                output.display()
            )));
        }

        let pages_dir = self.pages_dir.map(check_dir).transpose()?;
        let cdxj_dir = self.cdxj_dir.map(check_dir).transpose()?;

        let url = self.url.as_deref().map(|u| check_url("url", u)).transpose()?;
        let signing_url = self
            .signing_url
            .as_deref()
            .map(|u| check_url("signing_url", u))
            .transpose()?;
        let signing_token = signing_url.as_ref().and(self.signing_token);

        let ts = match self.ts.as_deref() {
            Some(ts) => normalize_timestamp(ts)
                .map_err(|e| WaczError::config(format!("ts must be an ISO-8601 timestamp, got {ts:?}")).with_source(e))?,
            None => iso_timestamp(Utc::now()),
        };

        if let Some(extras) = &self.datapackage_extras {
            if !extras.is_object() {
                return Err(WaczError::config("datapackage extras must be a JSON object"));
            }
        }

        let concurrency = match self.concurrency {
            Some(0) => return Err(WaczError::config("concurrency must be at least 1")),
            Some(n) => n,
            None => default_concurrency(),
        };

        remove_existing_output(&output)?;

        let config = WaczConfig {
            detect_pages: self.detect_pages && pages_dir.is_none(),
            index_from_warcs: self.index_from_warcs && cdxj_dir.is_none(),
            warcs,
            output,
            pages_dir,
            cdxj_dir,
            url,
            ts,
            title: trimmed(self.title),
            description: trimmed(self.description),
            signing_url,
            signing_token,
            datapackage_extras: self.datapackage_extras,
            concurrency,
            signing_timeout: self.signing_timeout,
        };
        debug!(
            warcs = config.warcs.len(),
            output = %config.output.display(),
            detect_pages = config.detect_pages,
            index_from_warcs = config.index_from_warcs,
            signing = config.signing_url.is_some(),
            "validated options"
        );
        Ok(config)
    }
}

fn select_warcs(inputs: &[PathBuf]) -> WaczResult<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(WaczError::config("no input file given"));
    }

    let mut warcs = Vec::new();
    let mut names = HashSet::new();
    for path in inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let lower = name.to_lowercase();
        if !lower.ends_with(".warc") && !lower.ends_with(".warc.gz") {
            trace!(file = %path.display(), "ignoring non-WARC input");
            continue;
        }
        if !path.is_file() {
            return Err(WaczError::config(format!("{} is not a readable file", path.display())));
        }
        if !names.insert(name.clone()) {
            return Err(WaczError::config(format!(
                "two inputs share the file name {name}; archive entries would collide"
            )));
        }
        warcs.push(path.clone());
    }

    if warcs.is_empty() {
        return Err(WaczError::config("no .warc or .warc.gz file found in inputs"));
    }
    Ok(warcs)
}

fn check_dir(dir: PathBuf) -> WaczResult<PathBuf> {
    if !dir.is_dir() {
        return Err(WaczError::config(format!("{} is not a directory", dir.display())));
    }
    Ok(dir)
}

fn check_url(option: &str, value: &str) -> WaczResult<String> {
    Url::parse(value.trim())
        .map(|url| url.to_string())
        .map_err(|e| WaczError::config(format!("{option} must be an absolute URL, got {value:?}")).with_source(e))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn remove_existing_output(output: &Path) -> WaczResult<()> {
    match std::fs::remove_file(output) {
        Ok(()) => {
            debug!(output = %output.display(), "removed existing output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WaczError::config(format!(
            "cannot replace existing output {}",
            output.display()
        ))
        .with_source(e)),
    }
}
