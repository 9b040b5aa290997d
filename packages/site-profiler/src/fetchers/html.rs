//! Best-effort HTML parsing for link discovery.
//!
//! Regex-based on purpose: the input is untrusted, frequently malformed
//! HTML, and a tag that fails to match is simply skipped rather than
//! failing the fetch that produced it.

/// An `<a href>` occurrence before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    /// The href attribute value, verbatim.
    pub href: String,

    /// Visible anchor text with nested markup stripped and whitespace
    /// collapsed; empty for image-only anchors.
    pub anchor_text: String,
}

/// Extract anchor targets and their text from an HTML document.
///
/// Tags without an href, or too mangled for the pattern, are skipped.
/// Document order is preserved; the crawler relies on that for
/// deterministic frontier insertion.
pub fn extract_links(html: &str) -> Vec<RawLink> {
    let link_pattern =
        regex::Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^<>]*>(.*?)</a>"#).unwrap();

    link_pattern
        .captures_iter(html)
        .filter_map(|cap| {
            let href = cap.get(1)?.as_str().trim().to_string();
            if href.is_empty() {
                return None;
            }
            let anchor_text = clean_anchor(cap.get(2).map(|m| m.as_str()).unwrap_or(""));
            Some(RawLink { href, anchor_text })
        })
        .collect()
}

/// Extract the document title, if present.
pub fn extract_title(html: &str) -> Option<String> {
    let title_pattern = regex::Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    title_pattern
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| clean_anchor(m.as_str()))
        .filter(|t| !t.is_empty())
}

/// Strip nested tags, decode common entities, collapse whitespace.
fn clean_anchor(fragment: &str) -> String {
    let tag_pattern = regex::Regex::new(r"<[^>]+>").unwrap();
    let text = tag_pattern.replace_all(fragment, " ");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
