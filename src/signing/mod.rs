//! Manifest signing.
//!
//! Signing is a pluggable capability: the pipeline only sees [`Signer`].
//! [`HttpSigner`] talks to a remote signing service; tests plug in fakes.

mod envelope;
mod http;

pub use envelope::{
    SignatureEnvelope, check_base64, check_domain_name, check_iso8601, check_pem_chain,
    check_sha256_with_prefix,
};
pub use http::{DEFAULT_SIGNING_TIMEOUT, HttpSigner};

use anyhow::Result;
use async_trait::async_trait;

/// Obtains a signature over a manifest digest
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `hash` (`sha256:<hex>` of `datapackage.json`) at `created`,
    /// the manifest's own creation timestamp.
    ///
    /// Implementations return an already validated envelope.
    async fn sign(&self, hash: &str, created: &str) -> Result<SignatureEnvelope>;
}
