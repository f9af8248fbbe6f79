//! Page list (`pages/pages.jsonl`) entries and rendering.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// First line of every generated `pages.jsonl`
pub const PAGES_HEADER: &str = r#"{"format": "json-pages-1.0", "id": "pages", "title": "All Pages"}"#;

/// In-archive path of the generated page list
pub const PAGES_PATH: &str = "pages/pages.jsonl";

/// One detected (or seeded) page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub id: String,
    pub url: String,
    pub title: String,
    pub ts: String,
}

impl PageEntry {
    /// New page with a fresh random id; an absent or empty title falls back to the URL
    pub fn new(url: impl Into<String>, title: Option<String>, ts: impl Into<String>) -> Self {
        let url = url.into();
        let title = title.filter(|t| !t.is_empty()).unwrap_or_else(|| url.clone());
        Self {
            id: new_page_id(),
            url,
            title,
            ts: ts.into(),
        }
    }
}

/// Random opaque id: UUID v4 as 32 hex characters
pub fn new_page_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Render pages as JSON lines, header first
pub fn render_pages_jsonl(pages: &[PageEntry]) -> Result<String> {
    let mut out = String::with_capacity(PAGES_HEADER.len() + 1 + pages.len() * 128);
    out.push_str(PAGES_HEADER);
    out.push('\n');
    for page in pages {
        out.push_str(&serde_json::to_string(page)?);
        out.push('\n');
    }
    Ok(out)
}

/// Check that every non-blank line of a pages file is valid JSON
pub fn is_valid_pages_file(contents: &str) -> bool {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .all(|line| serde_json::from_str::<serde_json::Value>(line).is_ok())
}

/// `.jsonl` files of a pages directory that can be copied into the archive as-is.
///
/// Files with another extension, or holding invalid JSON lines, are skipped
/// with a warning. Results are sorted by file name.
pub async fn collect_pages_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot read pages directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }

        let is_jsonl = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
            .unwrap_or(false);
        if !is_jsonl {
            warn!(file = %path.display(), "pages: skipping file, not a .jsonl file");
            continue;
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        if !is_valid_pages_file(&contents) {
            warn!(file = %path.display(), "pages: skipping file, not valid JSONL");
            continue;
        }

        debug!(file = %path.display(), "pages: using provided file");
        files.push(path);
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_url() {
        let page = PageEntry::new("https://example.com/", None, "2023-02-22T16:19:54Z");
        assert_eq!(page.title, "https://example.com/");

        let page = PageEntry::new("https://example.com/", Some(String::new()), "ts");
        assert_eq!(page.title, "https://example.com/");
    }

    #[test]
    fn ids_are_32_hex_chars_and_unique() {
        let a = new_page_id();
        let b = new_page_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn rendering_starts_with_header() -> Result<()> {
        let pages = vec![PageEntry {
            id: "abc".to_string(),
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            ts: "2023-02-22T16:19:54Z".to_string(),
        }];
        let jsonl = render_pages_jsonl(&pages)?;
        let lines: Vec<_> = jsonl.lines().collect();

        assert_eq!(lines[0], PAGES_HEADER);
        assert_eq!(
            lines[1],
            r#"{"id":"abc","url":"https://example.com/","title":"Example","ts":"2023-02-22T16:19:54Z"}"#
        );
        assert!(jsonl.ends_with('\n'));
        Ok(())
    }

    #[test]
    fn empty_page_list_is_header_only() -> Result<()> {
        assert_eq!(render_pages_jsonl(&[])?, format!("{PAGES_HEADER}\n"));
        Ok(())
    }

    #[tokio::test]
    async fn pages_dir_skips_invalid_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("pages.jsonl"), format!("{PAGES_HEADER}\n{{\"url\":\"a\"}}\n"))?;
        std::fs::write(dir.path().join("extraPages.jsonl"), format!("{PAGES_HEADER}\n"))?;
        std::fs::write(dir.path().join("invalid.jsonl"), "{not json\n")?;
        std::fs::write(dir.path().join("invalid.txt"), format!("{PAGES_HEADER}\n"))?;

        let files = collect_pages_files(dir.path()).await?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["extraPages.jsonl", "pages.jsonl"]);
        Ok(())
    }
}
