//! `datapackage.json` and `datapackage-digest.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::archive::ResourceEntry;
use crate::signing::SignatureEnvelope;

pub const DATAPACKAGE_PATH: &str = "datapackage.json";
pub const DATAPACKAGE_DIGEST_PATH: &str = "datapackage-digest.json";

pub const PROFILE: &str = "data-package";
pub const WACZ_VERSION: &str = "1.1.1";
pub const DEFAULT_TITLE: &str = "WACZ";

/// `software` field of every manifest this crate writes
pub fn software_name() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Millisecond-precision UTC timestamp with a `Z` suffix
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 / ISO-8601 timestamp and render it with [`iso_timestamp`]
pub fn normalize_timestamp(value: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .with_context(|| format!("{value:?} is not an ISO-8601 timestamp"))?;
    Ok(iso_timestamp(parsed.with_timezone(&Utc)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapackage {
    pub profile: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: String,
    pub wacz_version: String,
    pub software: String,
    pub resources: Vec<ResourceEntry>,
    #[serde(rename = "mainPageUrl", default, skip_serializing_if = "Option::is_none")]
    pub main_page_url: Option<String>,
    #[serde(rename = "mainPageDate", default, skip_serializing_if = "Option::is_none")]
    pub main_page_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<serde_json::Value>,
}

impl Datapackage {
    /// Manifest over a ledger snapshot, stamped with `created`
    pub fn new(resources: Vec<ResourceEntry>, created: DateTime<Utc>) -> Self {
        Self {
            profile: PROFILE.to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: None,
            created: iso_timestamp(created),
            wacz_version: WACZ_VERSION.to_string(),
            software: software_name(),
            resources,
            main_page_url: None,
            main_page_date: None,
            extras: None,
        }
    }

    /// Pretty-printed JSON, as stored in the archive
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapackageDigest {
    pub path: String,
    pub hash: String,
    #[serde(rename = "signedData", default, skip_serializing_if = "Option::is_none")]
    pub signed_data: Option<SignatureEnvelope>,
}

impl DatapackageDigest {
    pub fn new(hash: impl Into<String>, signed_data: Option<SignatureEnvelope>) -> Self {
        Self {
            path: DATAPACKAGE_PATH.to_string(),
            hash: hash.into(),
            signed_data,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn resource() -> ResourceEntry {
        ResourceEntry {
            name: "pages.jsonl".to_string(),
            path: "pages/pages.jsonl".to_string(),
            hash: format!("sha256:{}", "0".repeat(64)),
            bytes: 66,
        }
    }

    #[test]
    fn timestamps_have_millis_and_z() -> Result<()> {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 7, 7, 34).unwrap();
        assert_eq!(iso_timestamp(at), "2024-03-07T07:07:34.000Z");
        assert_eq!(normalize_timestamp("2024-03-07T09:07:34+02:00")?, "2024-03-07T07:07:34.000Z");
        assert!(normalize_timestamp("March 7th").is_err());
        Ok(())
    }

    #[test]
    fn optional_fields_are_omitted() -> Result<()> {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 7, 7, 34).unwrap();
        let json: serde_json::Value = serde_json::from_str(&Datapackage::new(vec![resource()], at).to_json()?)?;

        assert_eq!(json["profile"], PROFILE);
        assert_eq!(json["title"], DEFAULT_TITLE);
        assert_eq!(json["wacz_version"], WACZ_VERSION);
        assert_eq!(json["created"], "2024-03-07T07:07:34.000Z");
        assert!(json["software"].as_str().unwrap().starts_with("wacz "));
        assert_eq!(json["resources"][0]["path"], "pages/pages.jsonl");
        for absent in ["description", "mainPageUrl", "mainPageDate", "extras"] {
            assert!(json.get(absent).is_none(), "{absent} should be omitted");
        }
        Ok(())
    }

    #[test]
    fn main_page_fields_use_camel_case() -> Result<()> {
        let mut package = Datapackage::new(Vec::new(), Utc::now());
        package.main_page_url = Some("https://example.com/".to_string());
        package.main_page_date = Some("2024-03-07T07:07:34.000Z".to_string());
        package.extras = Some(serde_json::json!({ "source": "test" }));

        let json: serde_json::Value = serde_json::from_str(&package.to_json()?)?;
        assert_eq!(json["mainPageUrl"], "https://example.com/");
        assert_eq!(json["mainPageDate"], "2024-03-07T07:07:34.000Z");
        assert_eq!(json["extras"]["source"], "test");
        Ok(())
    }

    #[test]
    fn unsigned_digest_has_no_signed_data() -> Result<()> {
        let digest = DatapackageDigest::new("sha256:abc", None);
        let json: serde_json::Value = serde_json::from_str(&digest.to_json()?)?;
        assert_eq!(json["path"], DATAPACKAGE_PATH);
        assert!(json.get("signedData").is_none());
        Ok(())
    }
}
