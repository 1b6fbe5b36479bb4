use url::Url;

/// Extracts the hostname from a URL
///
/// The port is not part of the result, and the url crate already lowercases
/// domain hosts. Returns None for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use hostgraph::url::extract_host;
///
/// let url = Url::parse("https://Example.com:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Parses a URL string and extracts its hostname in one step
pub fn host_of(url_str: &str) -> Option<String> {
    Url::parse(url_str).ok().as_ref().and_then(extract_host)
}
