use regex::Regex;
use std::sync::LazyLock;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").expect("title pattern is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Text of the first `<title>` element of an HTML document.
///
/// Returns `None` when there is no title or it is blank.
pub fn extract_title(html: &[u8]) -> Option<String> {
    let html = String::from_utf8_lossy(html);
    let raw = TITLE_RE.captures(&html)?.get(1)?.as_str();

    let title = WHITESPACE_RE.replace_all(&decode_entities(raw), " ").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
