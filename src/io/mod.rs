mod digest;

pub use digest::{CHUNK_SIZE, ContentDigest, DIGEST_ALGORITHM, sha256_bytes};

use std::path::{Path, PathBuf};

/// Content to be placed in the archive: either a file on disk or bytes in memory
#[derive(Debug, Clone)]
pub enum ByteSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        ByteSource::Path(path)
    }
}

impl From<&Path> for ByteSource {
    fn from(path: &Path) -> Self {
        ByteSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::Bytes(bytes)
    }
}

impl From<String> for ByteSource {
    fn from(text: String) -> Self {
        ByteSource::Bytes(text.into_bytes())
    }
}

impl From<&str> for ByteSource {
    fn from(text: &str) -> Self {
        ByteSource::Bytes(text.as_bytes().to_vec())
    }
}
