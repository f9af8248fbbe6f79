use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::io::Read;

/// One WARC record, fully read into memory.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    /// Version line, e.g. `WARC/1.1`
    pub version: String,
    /// Named fields in file order
    pub headers: Vec<(String, String)>,
    /// Record block (`Content-Length` bytes)
    pub block: Vec<u8>,
    /// Offset of the record in the file as stored (gzip member start for `.warc.gz`)
    pub offset: u64,
    /// Length of the record in the file as stored
    pub length: u64,
}

impl WarcRecord {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `WARC-Type`
    pub fn record_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    /// `WARC-Target-URI`, with WARC/1.0 angle brackets stripped
    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
            .map(|uri| uri.trim_start_matches('<').trim_end_matches('>'))
            .filter(|uri| !uri.is_empty())
    }

    /// `WARC-Date`
    pub fn date(&self) -> Option<&str> {
        self.header("WARC-Date").filter(|date| !date.is_empty())
    }

    /// Record-level `Content-Type`
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Parsed HTTP message, for records whose block is an HTTP request or response
    pub fn http(&self) -> Option<HttpMessage<'_>> {
        let declared = self
            .content_type()
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/http"))
            .unwrap_or(false);

        if !declared && !self.block.starts_with(b"HTTP/") {
            return None;
        }

        HttpMessage::parse(&self.block)
    }
}

/// HTTP message carried inside a WARC record block
#[derive(Debug, Clone)]
pub struct HttpMessage<'a> {
    /// Status code, `None` for requests
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    /// Entity body as stored (possibly chunked and/or content-encoded)
    pub body: &'a [u8],
}

impl<'a> HttpMessage<'a> {
    pub fn parse(block: &'a [u8]) -> Option<Self> {
        let (head_len, body_start) = find_header_end(block)?;
        let head = String::from_utf8_lossy(&block[..head_len]);
        let mut lines = head.lines();

        let start_line = lines.next()?.trim();
        let status = if start_line.starts_with("HTTP/") {
            Some(start_line.split_whitespace().nth(1)?.parse().ok()?)
        } else {
            None
        };

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in lines {
            if line.starts_with(|c: char| c == ' ' || c == '\t') {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Some(Self {
            status,
            headers,
            body: &block[body_start..],
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `Content-Type` without parameters, lower-cased
    pub fn mime(&self) -> Option<String> {
        self.header("Content-Type").map(strip_mime_params)
    }

    /// Body with transfer and content encodings removed
    pub fn decoded_body(&self) -> Result<Cow<'a, [u8]>> {
        let mut body: Cow<'a, [u8]> = Cow::Borrowed(self.body);

        let chunked = self
            .header("Transfer-Encoding")
            .map(|te| te.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        if chunked {
            body = Cow::Owned(dechunk(&body)?);
        }

        let encoding = self
            .header("Content-Encoding")
            .map(|ce| ce.trim().to_ascii_lowercase());
        match encoding.as_deref() {
            None | Some("") | Some("identity") => {}
            Some("gzip") | Some("x-gzip") => {
                let mut out = Vec::new();
                MultiGzDecoder::new(&body[..])
                    .read_to_end(&mut out)
                    .context("cannot gunzip HTTP body")?;
                body = Cow::Owned(out);
            }
            Some("deflate") => {
                let mut out = Vec::new();
                flate2::read::ZlibDecoder::new(&body[..])
                    .read_to_end(&mut out)
                    .context("cannot inflate HTTP body")?;
                body = Cow::Owned(out);
            }
            Some(other) => bail!("Unsupported content encoding: {}", other),
        }

        Ok(body)
    }
}

/// Lower-case a MIME type and drop anything after `;`
pub fn strip_mime_params(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn find_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Returns (length of header section, offset of body)
fn find_header_end(block: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = block.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((pos, pos + 4));
    }
    if let Some(pos) = block.windows(2).position(|w| w == b"\n\n") {
        return Some((pos, pos + 2));
    }
    // Headers only (e.g. revisit records cut after the head)
    if block.starts_with(b"HTTP/") {
        return Some((block.len(), block.len()));
    }
    None
}

fn dechunk(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;

    loop {
        let line_end = data[pos..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|i| pos + i)
            .context("truncated chunk size line")?;

        let size_line = std::str::from_utf8(&data[pos..line_end])?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("invalid chunk size: {size_hex:?}"))?;
        pos = line_end + 2;

        if size == 0 {
            break;
        }
        let Some(end) = pos.checked_add(size).filter(|end| *end <= data.len()) else {
            bail!("Chunk of {} bytes overruns body", size);
        };
        out.extend_from_slice(&data[pos..end]);
        pos = end + 2;
        if pos >= data.len() {
            break;
        }
    }

    Ok(out)
}
