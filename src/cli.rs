use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::trace;

use crate::options::{DEFAULT_OUTPUT, WaczOptions};

#[derive(Parser, Debug)]
#[command(name = "wacz")]
#[command(version)]
#[command(about = "Bundle WARC files into a WACZ web archive", long_about = None)]
#[command(after_help = "Examples:\n  \
  wacz create -f \"collections/*.warc.gz\" -o crawl.wacz\n  \
  wacz create -f crawl.warc --url https://example.com/ --title \"Example\"\n  \
  wacz create -f crawl.warc -p pages/ --cdxj indexes/   reuse existing pages and index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a .wacz file out of one or more .warc or .warc.gz files
    Create(CreateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to .warc / .warc.gz file(s); quote globs
    #[arg(short = 'f', long = "file", value_name = "PATH", required = true, num_args = 1..)]
    pub file: Vec<String>,

    /// Path to the output .wacz file
    #[arg(short = 'o', long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Directory of pages JSONL files to copy as-is instead of detecting pages
    #[arg(short = 'p', long, value_name = "DIR")]
    pub pages: Option<PathBuf>,

    /// Main page URL in datapackage.json
    #[arg(long)]
    pub url: Option<String>,

    /// Main page date in datapackage.json
    #[arg(long)]
    pub ts: Option<String>,

    /// Collection title
    #[arg(long)]
    pub title: Option<String>,

    /// Collection description
    #[arg(long)]
    pub desc: Option<String>,

    /// URL of an authsign-compatible signing server
    #[arg(long, value_name = "URL")]
    pub signing_url: Option<String>,

    /// Authentication token for the signing server
    #[arg(long, value_name = "TOKEN")]
    pub signing_token: Option<String>,

    /// Directory of CDXJ indexes to use instead of reindexing the WARC files
    #[arg(long, value_name = "DIR", requires = "pages")]
    pub cdxj: Option<PathBuf>,

    /// Log verbosity (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Number of indexing workers (default: available parallelism)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl CreateArgs {
    /// Expand `--file` globs. Patterns matching nothing are kept as literal
    /// paths so validation can report them.
    pub fn expand_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut inputs = Vec::new();
        for pattern in &self.file {
            let before = inputs.len();
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                match entry {
                    Ok(path) => inputs.push(path),
                    Err(e) => trace!("glob entry skipped: {}", e),
                }
            }
            if inputs.len() == before {
                inputs.push(PathBuf::from(pattern));
            }
        }
        Ok(inputs)
    }

    pub fn to_options(&self) -> Result<WaczOptions> {
        Ok(WaczOptions {
            inputs: self.expand_inputs()?,
            output: self.output.clone(),
            pages_dir: self.pages.clone(),
            cdxj_dir: self.cdxj.clone(),
            url: self.url.clone(),
            ts: self.ts.clone(),
            title: self.title.clone(),
            description: self.desc.clone(),
            signing_url: self.signing_url.clone(),
            signing_token: self.signing_token.clone(),
            concurrency: self.jobs,
            ..Default::default()
        })
    }
}
