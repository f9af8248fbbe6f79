use url::Url;

/// Sort-friendly URL key (SURT): `com,example)/path?query`.
///
/// Host labels are reversed so captures of one site sort together; a
/// leading `www.` is dropped and query arguments are sorted. Inputs that
/// are not hierarchical URLs fall back to their lower-cased form.
pub fn surt_key(uri: &str) -> String {
    let Ok(url) = Url::parse(uri) else {
        return uri.to_lowercase();
    };
    let Some(host) = url.host_str() else {
        return uri.to_lowercase();
    };

    let host = host.to_lowercase();
    let host = strip_www(&host);
    let mut key: String = host.split('.').rev().collect::<Vec<_>>().join(",");

    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    key.push(')');
    key.push_str(url.path());

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        let mut args: Vec<&str> = query.split('&').collect();
        args.sort_unstable();
        key.push('?');
        key.push_str(&args.join("&"));
    }

    key.to_lowercase()
}

/// Drop `www.`, `www2.`, ... prefixes
fn strip_www(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix("www") {
        let digits = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        if let Some(rest) = digits.strip_prefix('.') {
            if !rest.is_empty() {
                return rest;
            }
        }
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverses_host_and_keeps_path() {
        assert_eq!(surt_key("https://webrecorder.net/"), "net,webrecorder)/");
        assert_eq!(
            surt_key("https://webrecorder.net/assets/favicon.ico"),
            "net,webrecorder)/assets/favicon.ico"
        );
    }

    #[test]
    fn drops_www_and_scheme() {
        assert_eq!(surt_key("http://www.Example.com/A"), "com,example)/a");
        assert_eq!(surt_key("https://www2.example.com/"), "com,example)/");
        assert_eq!(surt_key("https://wwwexample.com/"), "com,wwwexample)/");
    }

    #[test]
    fn sorts_query_and_keeps_port() {
        assert_eq!(
            surt_key("http://example.com:8080/search?b=2&a=1"),
            "com,example:8080)/search?a=1&b=2"
        );
    }

    #[test]
    fn non_hierarchical_uri_falls_back() {
        assert_eq!(surt_key("urn:pageinfo:Example"), "urn:pageinfo:example");
    }
}
