use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{SignatureEnvelope, Signer};
use anyhow::{Context, Result, bail};

pub const DEFAULT_SIGNING_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SignRequest<'a> {
    hash: &'a str,
    created: &'a str,
}

/// Remote signing service reached over HTTP
pub struct HttpSigner {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpSigner {
    /// Create a signer for `url`.
    ///
    /// `token` is sent verbatim as the `Authorization` header.
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl Signer for HttpSigner {
    async fn sign(&self, hash: &str, created: &str) -> Result<SignatureEnvelope> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&SignRequest { hash, created });
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("signing request to {} failed", self.url))?;

        if resp.status() != reqwest::StatusCode::OK {
            bail!("Signing server responded with status: {}", resp.status());
        }

        let body = resp.bytes().await?;
        debug!(url = %self.url, bytes = body.len(), "received signature");
        SignatureEnvelope::from_json(&body)
    }
}
