use crate::UrlError;
use url::Url;

/// Schemes the crawler is willing to follow
const CRAWLABLE_SCHEMES: &[&str] = &["http", "https"];

/// Normalizes the root URL of a new crawl request
///
/// # Normalization Steps
///
/// 1. Default the scheme to `http` when the input has none (`example.com/a`)
/// 2. Parse the URL; reject if malformed
/// 3. Reject schemes other than http/https
/// 4. Remove the fragment
///
/// # Examples
///
/// ```
/// use hostgraph::url::normalize_root_url;
///
/// let url = normalize_root_url("example.com/docs#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs");
/// ```
pub fn normalize_root_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    check_scheme(&url)?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url_str.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves one raw href against the page it was found on
///
/// Absolute and relative links are both accepted. The fragment is stripped
/// and only http/https results are returned.
///
/// # Examples
///
/// ```
/// use hostgraph::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("http://example.com/about").unwrap();
/// assert_eq!(
///     resolve_link("index.html", &base).unwrap().as_str(),
///     "http://example.com/index.html"
/// );
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Result<Url, UrlError> {
    let mut url = base_url
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    check_scheme(&url)?;
    url.set_fragment(None);
    Ok(url)
}

/// Resolves a batch of raw hrefs, dropping the ones that cannot be crawled
///
/// Document order is preserved and duplicates are kept; collapsing them is
/// the job of the page graph and the per-request seen bookkeeping.
pub fn normalize_links<S: AsRef<str>>(hrefs: &[S], base_url: &Url) -> Vec<String> {
    hrefs
        .iter()
        .filter_map(|href| match resolve_link(href.as_ref(), base_url) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::debug!("Skipping link on {}: {}", base_url, e);
                None
            }
        })
        .collect()
}

fn check_scheme(url: &Url) -> Result<(), UrlError> {
    if CRAWLABLE_SCHEMES.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )))
    }
}
