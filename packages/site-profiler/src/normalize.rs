//! URL canonicalization for frontier deduplication.

use url::Url;

/// File extensions that never carry profile text; links to them are dropped
/// at discovery time (images, archives, stylesheets, scripts, fonts).
const BINARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "zip", "tar", "gz", "tgz", "rar",
    "7z", "css", "js", "mjs", "woff", "woff2", "ttf", "otf", "eot",
];

/// Canonicalize an href found on `base_url`.
///
/// Resolves relative, absolute, and protocol-relative hrefs; strips the
/// fragment and any default port; lower-cases the host; trims the trailing
/// slash everywhere but the root path. Returns `None` for anything that is
/// not a fetchable HTTP(S) document: other schemes (`mailto:`, `tel:`,
/// `javascript:`), binary assets by extension, and malformed input.
///
/// Total and idempotent: never panics, and feeding a returned URL back in
/// (against any base) yields the same string.
pub fn normalize(base_url: &str, raw_href: &str) -> Option<String> {
    let href = raw_href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(base_url).ok()?;
    let resolved = base.join(href).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    let host = resolved.host_str()?.to_ascii_lowercase();

    if has_binary_extension(resolved.path()) {
        return None;
    }

    let mut path = resolved.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }

    // `Url` already drops default ports (80/443) during parsing.
    let mut out = format!("{}://{}", resolved.scheme(), host);
    if let Some(port) = resolved.port() {
        out.push_str(&format!(":{}", port));
    }
    out.push_str(&path);
    if let Some(query) = resolved.query() {
        if !query.is_empty() {
            out.push('?');
            out.push_str(query);
        }
    }

    Some(out)
}

/// Whether a URL belongs to the crawl domain.
///
/// Exact host match against the seed domain, case-insensitive. Subdomains
/// are treated as off-domain, matching the single-site crawl bound.
pub fn is_same_domain(url: &str, domain: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(domain)))
        .unwrap_or(false)
}

fn has_binary_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
