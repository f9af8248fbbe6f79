use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Serialize;

use crate::io::sha256_bytes;
use crate::warc::{WarcRecord, strip_mime_params, surt_key};

/// MIME type of WARC-internal metadata blocks; never indexed
pub const WARC_FIELDS_MIME: &str = "application/warc-fields";

/// Record types that get an index line
pub const INDEXABLE_TYPES: [&str; 4] = ["response", "revisit", "resource", "metadata"];

/// JSON block of a CDXJ line. Field order is part of the format.
#[derive(Serialize)]
struct CdxjFields<'a> {
    url: &'a str,
    mime: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    digest: String,
    length: u64,
    offset: u64,
    filename: &'a str,
}

pub fn is_indexable(record: &WarcRecord) -> bool {
    record
        .record_type()
        .map(|t| INDEXABLE_TYPES.iter().any(|known| known.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

/// Build the CDXJ line (newline-terminated) for a record.
///
/// Returns `None` for records that are not indexable, have no target URI or
/// date, or carry WARC metadata fields.
pub fn cdxj_line(record: &WarcRecord, filename: &str) -> Result<Option<String>> {
    if !is_indexable(record) {
        return Ok(None);
    }
    let (Some(url), Some(date)) = (record.target_uri(), record.date()) else {
        return Ok(None);
    };

    let record_type = record.record_type().unwrap_or_default().to_ascii_lowercase();
    let http = match record_type.as_str() {
        "response" | "revisit" => record.http(),
        _ => None,
    };

    let mime = if record_type == "revisit" {
        "warc/revisit".to_string()
    } else if let Some(http) = &http {
        http.mime().unwrap_or_else(|| "unk".to_string())
    } else {
        record
            .content_type()
            .map(strip_mime_params)
            .unwrap_or_else(|| "unk".to_string())
    };

    if mime == WARC_FIELDS_MIME {
        return Ok(None);
    }

    let digest = match record.header("WARC-Payload-Digest") {
        Some(digest) => digest.to_string(),
        None => {
            let payload = http.as_ref().map(|h| h.body).unwrap_or(&record.block[..]);
            sha256_bytes(payload)
        }
    };

    let fields = CdxjFields {
        url,
        mime: &mime,
        status: http.as_ref().and_then(|h| h.status),
        digest,
        length: record.length,
        offset: record.offset,
        filename,
    };

    Ok(Some(format!(
        "{} {} {}\n",
        surt_key(url),
        warc_timestamp(date)?,
        serde_json::to_string(&fields)?
    )))
}

/// `WARC-Date` as a 14-digit `YYYYMMDDhhmmss` timestamp
pub fn warc_timestamp(date: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(date.trim())
        .with_context(|| format!("invalid WARC-Date: {date:?}"))?;
    Ok(parsed.format("%Y%m%d%H%M%S").to_string())
}

/// First field of an index line
pub fn sort_key(line: &str) -> &str {
    line.split(' ').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: &str, content_type: &str, block: &[u8]) -> WarcRecord {
        WarcRecord {
            version: "WARC/1.1".to_string(),
            headers: vec![
                ("WARC-Type".to_string(), record_type.to_string()),
                ("WARC-Target-URI".to_string(), "https://webrecorder.net/".to_string()),
                ("WARC-Date".to_string(), "2024-03-07T07:07:34Z".to_string()),
                ("Content-Type".to_string(), content_type.to_string()),
            ],
            block: block.to_vec(),
            offset: 120,
            length: 3941,
        }
    }

    #[test]
    fn response_line_has_expected_shape() -> Result<()> {
        let rec = record(
            "response",
            "application/http; msgtype=response",
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<html></html>",
        );
        let line = cdxj_line(&rec, "rec.warc.gz")?.unwrap();

        let expected_digest = sha256_bytes(b"<html></html>");
        assert_eq!(
            line,
            format!(
                "net,webrecorder)/ 20240307070734 {{\"url\":\"https://webrecorder.net/\",\"mime\":\"text/html\",\"status\":200,\"digest\":\"{expected_digest}\",\"length\":3941,\"offset\":120,\"filename\":\"rec.warc.gz\"}}\n"
            )
        );
        Ok(())
    }

    #[test]
    fn payload_digest_header_is_preferred() -> Result<()> {
        let mut rec = record("resource", "text/plain", b"hello");
        rec.headers
            .push(("WARC-Payload-Digest".to_string(), "sha1:ABCDEF".to_string()));
        let line = cdxj_line(&rec, "a.warc")?.unwrap();
        assert!(line.contains(r#""digest":"sha1:ABCDEF""#));
        assert!(line.contains(r#""mime":"text/plain""#));
        assert!(!line.contains("status"));
        Ok(())
    }

    #[test]
    fn revisit_mime_is_fixed() -> Result<()> {
        let rec = record(
            "revisit",
            "application/http; msgtype=response",
            b"HTTP/1.1 304 Not Modified\r\n\r\n",
        );
        let line = cdxj_line(&rec, "a.warc")?.unwrap();
        assert!(line.contains(r#""mime":"warc/revisit","status":304"#));
        Ok(())
    }

    #[test]
    fn non_indexable_records_are_skipped() -> Result<()> {
        assert!(cdxj_line(&record("request", "application/http", b""), "a.warc")?.is_none());
        assert!(cdxj_line(&record("warcinfo", "application/warc-fields", b""), "a.warc")?.is_none());
        Ok(())
    }

    #[test]
    fn warc_fields_metadata_is_discarded() -> Result<()> {
        let rec = record("metadata", "application/warc-fields", b"outlink: x");
        assert!(cdxj_line(&rec, "a.warc")?.is_none());
        Ok(())
    }

    #[test]
    fn timestamp_is_fourteen_digits() -> Result<()> {
        assert_eq!(warc_timestamp("2023-02-22T16:19:54Z")?, "20230222161954");
        assert_eq!(warc_timestamp("2023-02-22T16:19:54.123456Z")?, "20230222161954");
        assert!(warc_timestamp("yesterday").is_err());
        Ok(())
    }

    #[test]
    fn sort_key_is_first_field() {
        assert_eq!(sort_key("com,example)/ 2023 {}"), "com,example)/");
    }
}
