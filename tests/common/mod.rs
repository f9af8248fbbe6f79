//! Shared fixtures: synthetic WARC files and helpers to read archives back.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use wacz::{SignatureEnvelope, Signer};

/// DER `SEQUENCE { INTEGER 1 }` wrapped as PEM
pub const TINY_CERT: &str = "-----BEGIN CERTIFICATE-----\nMAMCAQE=\n-----END CERTIFICATE-----\n";

pub const CAPTURE_DATE: &str = "2024-03-07T07:07:34Z";

fn record(record_type: &str, uri: &str, content_type: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "WARC/1.1\r\nWARC-Type: {record_type}\r\nWARC-Record-ID: <urn:uuid:{}>\r\nWARC-Target-URI: {uri}\r\nWARC-Date: {CAPTURE_DATE}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
        uuid::Uuid::new_v4(),
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// `response` record carrying an HTML page
pub fn html_response(uri: &str, title: &str) -> Vec<u8> {
    let body = format!("<!doctype html><html><head><title>{title}</title></head><body>hi</body></html>");
    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    record("response", uri, "application/http; msgtype=response", http.as_bytes())
}

/// `response` record with a non-HTML body
pub fn asset_response(uri: &str, mime: &str, body: &str) -> Vec<u8> {
    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {mime}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    record("response", uri, "application/http; msgtype=response", http.as_bytes())
}

/// `response` record with a chunked HTML body announcing `chunk_size` (hex)
pub fn chunked_html_response(uri: &str, chunk_size: &str, body: &str) -> Vec<u8> {
    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\n{chunk_size}\r\n{body}\r\n0\r\n\r\n"
    );
    record("response", uri, "application/http; msgtype=response", http.as_bytes())
}

pub fn request(uri: &str) -> Vec<u8> {
    let http = "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    record("request", uri, "application/http; msgtype=request", http.as_bytes())
}

pub fn warcinfo() -> Vec<u8> {
    let mut out = format!(
        "WARC/1.1\r\nWARC-Type: warcinfo\r\nWARC-Date: {CAPTURE_DATE}\r\nContent-Type: application/warc-fields\r\nContent-Length: 16\r\n\r\n"
    )
    .into_bytes();
    out.extend_from_slice(b"software: tests\n\r\n\r\n");
    out
}

/// Plain WARC: records back to back
pub fn write_warc(path: &Path, records: &[Vec<u8>]) -> Result<PathBuf> {
    let mut file = File::create(path)?;
    for record in records {
        file.write_all(record)?;
    }
    Ok(path.to_path_buf())
}

/// `.warc.gz`: one gzip member per record
pub fn write_warc_gz(path: &Path, records: &[Vec<u8>]) -> Result<PathBuf> {
    let mut file = File::create(path)?;
    for record in records {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(record)?;
        file.write_all(&gz.finish()?)?;
    }
    Ok(path.to_path_buf())
}

pub struct Archive {
    zip: zip::ZipArchive<File>,
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            zip: zip::ZipArchive::new(File::open(path)?)?,
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    pub fn bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(name)?;
        assert_eq!(entry.compression(), zip::CompressionMethod::Stored, "{name} must be stored");
        let mut out = Vec::new();
        entry.read_to_end(&mut out)?;
        Ok(out)
    }

    pub fn text(&mut self, name: &str) -> Result<String> {
        Ok(String::from_utf8(self.bytes(name)?)?)
    }

    pub fn json(&mut self, name: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.bytes(name)?)?)
    }

    /// All index lines, shards inflated and concatenated
    pub fn index_lines(&mut self) -> Result<Vec<String>> {
        let blob = self.bytes("indexes/index.cdx.gz")?;
        let mut text = String::new();
        MultiGzDecoder::new(&blob[..]).read_to_string(&mut text)?;
        Ok(text.lines().map(str::to_string).collect())
    }
}

/// Signer that accepts everything and remembers what it was asked to sign
#[derive(Default)]
pub struct FakeSigner {
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Signer for FakeSigner {
    async fn sign(&self, hash: &str, created: &str) -> Result<SignatureEnvelope> {
        self.calls.lock().push((hash.to_string(), created.to_string()));
        Ok(signature_envelope(hash, created))
    }
}

/// Signer whose service is down
pub struct FailingSigner;

#[async_trait]
impl Signer for FailingSigner {
    async fn sign(&self, _hash: &str, _created: &str) -> Result<SignatureEnvelope> {
        anyhow::bail!("connection refused")
    }
}

pub fn signature_envelope(hash: &str, created: &str) -> SignatureEnvelope {
    SignatureEnvelope {
        hash: hash.to_string(),
        created: created.to_string(),
        signature: "c2lnbmF0dXJl".to_string(),
        domain: "signer.example.com".to_string(),
        domain_cert: TINY_CERT.to_string(),
        time_signature: None,
        timestamp_cert: None,
        software: Some("fake-signer".to_string()),
        version: None,
        extra: Default::default(),
    }
}
