//! WARC capture parsing.
//!
//! Just enough of the WARC format to index captures: sequential record
//! reading (plain or per-record gzip), HTTP message heads inside records,
//! `<title>` extraction for page detection, and SURT sort keys.

mod html;
mod reader;
mod record;
mod surt;

pub use html::extract_title;
pub use reader::WarcReader;
pub use record::{HttpMessage, WarcRecord, strip_mime_params};
pub use surt::surt_key;
