//! Content extraction - raw HTML to cleaned visible text.

use tracing::debug;

use crate::types::{ExtractedText, PageRecord};

/// Clean a fetched page down to its visible text.
///
/// Strips non-content markup (scripts, styles, templates, SVG, comments,
/// and the nav/header/footer/aside landmarks), decodes common entities,
/// collapses whitespace, and truncates to `page_char_cap` characters.
///
/// Returns `None` when the record's fetch failed or nothing survives
/// cleaning; callers count those but exclude them from synthesis input.
pub fn extract(record: &PageRecord, page_char_cap: usize) -> Option<ExtractedText> {
    let html = record.outcome.html()?;

    let text = clean_html(html);
    if text.is_empty() {
        debug!(url = %record.url, "Page empty after cleaning");
        return None;
    }

    let truncated: String = text.chars().take(page_char_cap).collect();
    Some(ExtractedText::new(&record.url, truncated))
}

/// Strip markup from an HTML document, keeping visible text only.
fn clean_html(html: &str) -> String {
    let mut text = html.to_string();

    // Remove entire non-content blocks, contents included.
    for tag in ["script", "style", "noscript", "template", "svg"] {
        let block = regex::Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).unwrap();
        text = block.replace_all(&text, " ").to_string();
    }

    // Remove structural landmarks that never carry identity text.
    for tag in ["nav", "header", "footer", "aside"] {
        let block = regex::Regex::new(&format!(r"(?is)<{tag}[\s>].*?</{tag}\s*>")).unwrap();
        text = block.replace_all(&text, " ").to_string();
    }

    let comments = regex::Regex::new(r"(?s)<!--.*?-->").unwrap();
    text = comments.replace_all(&text, " ").to_string();

    // Block-level closers become separators so words don't fuse.
    let breaks = regex::Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>|</tr>|</h[1-6]>").unwrap();
    text = breaks.replace_all(&text, "\n").to_string();

    let tags = regex::Regex::new(r"<[^>]+>").unwrap();
    text = tags.replace_all(&text, " ").to_string();

    text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
