// src/crawl/assets.rs
// =============================================================================
// Finds the assets a page depends on.
//
// We use the `scraper` crate to parse the page and pick out:
// - <link href="...">    stylesheets, icons, preloads
// - <script src="...">   scripts
// - <img src="...">      images
// - <source src="...">   media sources
//
// Every reference is resolved against the page URL (the `url` crate does the
// same joining a browser does), fragments are dropped, and only http/https
// URLs are kept. Duplicates are removed, first occurrence wins.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

const ASSET_SELECTORS: [(&str, &str); 4] = [
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("img[src]", "src"),
    ("source[src]", "src"),
];

/// Extracts asset URLs from a page, in document order.
pub fn extract_assets(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selectors: Vec<(Selector, &str)> = ASSET_SELECTORS
        .iter()
        .filter_map(|(css, attr)| Some((Selector::parse(css).ok()?, *attr)))
        .collect();

    // Walk the document once so the result keeps document order across
    // all asset kinds
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        for (selector, attr) in &selectors {
            if !selector.matches(&element) {
                continue;
            }
            let resolved = element.value().attr(attr).and_then(|href| resolve_url(page_url, href));
            if let Some(url) = resolved {
                if seen.insert(url.clone()) {
                    assets.push(url);
                }
            }
        }
    }

    assets
}

// Resolves a possibly-relative reference against the page URL.
//
// base = "https://example.com/shop/"
//   "app.js"                -> https://example.com/shop/app.js
//   "/css/site.css"         -> https://example.com/css/site.css
//   "//cdn.example.net/x"   -> https://cdn.example.net/x
//   "data:image/png;..."    -> None (not http)
fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Same host as the page (scheme and port may differ)
pub fn is_same_host(asset: &Url, page: &Url) -> bool {
    match (asset.host_str(), page.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/shop/").unwrap()
    }

    fn extract(html: &str) -> Vec<String> {
        extract_assets(html, &base()).iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_extracts_all_kinds_in_order() {
        let html = r#"
            <html><head>
              <link rel="stylesheet" href="/css/site.css">
              <script src="app.js"></script>
            </head><body>
              <img src="//cdn.example.net/logo.png">
              <video><source src="intro.mp4"></video>
              <a href="/not-an-asset">link</a>
            </body></html>
        "#;

        assert_eq!(
            extract(html),
            vec![
                "https://example.com/css/site.css",
                "https://example.com/shop/app.js",
                "https://cdn.example.net/logo.png",
                "https://example.com/shop/intro.mp4",
            ]
        );
    }

    #[test]
    fn test_dedup_and_fragments() {
        let html = r##"
            <img src="/a.png#top"><img src="/a.png"><script src="/a.png"></script>
            <img src="#"><img src="data:image/png;base64,AAAA"><img src="">
        "##;
        assert_eq!(extract(html), vec!["https://example.com/a.png"]);
    }

    #[test]
    fn test_same_host() {
        let page = base();
        assert!(is_same_host(&Url::parse("http://EXAMPLE.com/x.js").unwrap(), &page));
        assert!(!is_same_host(&Url::parse("https://cdn.example.com/x.js").unwrap(), &page));
    }
}
