//! HTML parser for extracting outbound links
//!
//! Only anchor-like elements are considered: `<a href>` and `<area href>`.
//! Raw hrefs are returned in document order; resolving and filtering them is
//! left to [`crate::url::normalize_links`].

use crate::url::normalize_links;
use scraper::{Html, Selector};
use url::Url;

const LINK_SELECTOR: &str = "a[href], area[href]";

/// Extracts the raw `href` value of every anchor-like element
///
/// Elements are visited in document order. An element carrying several
/// `href` attributes contributes only the first one (the HTML parser keeps
/// the first occurrence of a duplicated attribute).
///
/// # Example
///
/// ```
/// use hostgraph::crawler::extract_hrefs;
///
/// let html = r#"<a href="/a">A</a><map><area href="/b"></map>"#;
/// assert_eq!(extract_hrefs(html), vec!["/a", "/b"]);
/// ```
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse(LINK_SELECTOR) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Extracts the crawlable absolute links of a page
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - The URL the page was fetched from, used to resolve relative links
///
/// # Returns
///
/// Absolute http/https URLs without fragments, in document order, duplicates kept
pub fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let hrefs = extract_hrefs(html);
    normalize_links(&hrefs, page_url)
}
