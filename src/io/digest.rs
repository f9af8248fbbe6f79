use sha2::{Digest, Sha256};

/// Algorithm tag prefixed to every digest string
pub const DIGEST_ALGORITHM: &str = "sha256";

/// Read size used when streaming files through a hasher
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Incremental SHA-256 plus byte count.
///
/// Fed chunk by chunk so large inputs never have to be held in memory.
#[derive(Default, Clone)]
pub struct ContentDigest {
    hasher: Sha256,
    bytes: u64,
}

impl ContentDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Consume the hasher, returning `("sha256:<hex>", byte count)`
    pub fn finish(self) -> (String, u64) {
        let hex = hex::encode(self.hasher.finalize());
        (format!("{DIGEST_ALGORITHM}:{hex}"), self.bytes)
    }
}

/// Digest of an in-memory buffer, as `sha256:<hex>`
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut digest = ContentDigest::new();
    digest.update(data);
    digest.finish().0
}
