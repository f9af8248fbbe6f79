//! # wacz
//!
//! Bundle WARC web captures into a WACZ web archive.
//!
//! A WACZ file is a ZIP container holding the original capture files, a
//! sorted and sharded CDXJ index, a page list and a `datapackage.json`
//! manifest whose digest can be signed by a remote signing service.
//!
//! ## Features
//!
//! - Parallel indexing of `.warc` and `.warc.gz` files
//! - ZipNum shared index (`indexes/index.cdx.gz` + `indexes/index.idx`)
//! - Page detection from HTML responses, or pages copied from a directory
//! - Streaming store-only ZIP writer with ZIP64 support
//! - Optional manifest signing with envelope validation
//!
//! ## Example
//!
//! ```no_run
//! use wacz::{Wacz, WaczOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut wacz = Wacz::new(WaczOptions {
//!         inputs: vec!["crawl.warc.gz".into()],
//!         output: "crawl.wacz".into(),
//!         title: Some("My crawl".to_string()),
//!         ..Default::default()
//!     })?;
//!
//!     let summary = wacz.process().await?;
//!     println!("{} pages, {} index entries", summary.pages, summary.entries);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod collector;
pub mod error;
pub mod indexer;
pub mod io;
pub mod manifest;
pub mod options;
pub mod pages;
pub mod shared_index;
pub mod signing;
pub mod warc;
mod wacz;
pub mod zipfile;

pub use archive::{ArchiveAssembler, ResourceEntry};
pub use cli::Cli;
pub use collector::Collector;
pub use error::{ErrorKind, Stage, WaczError, WaczResult};
pub use io::ByteSource;
pub use options::{WaczConfig, WaczOptions};
pub use pages::PageEntry;
pub use signing::{HttpSigner, SignatureEnvelope, Signer};
pub use wacz::{ProcessSummary, Wacz};
