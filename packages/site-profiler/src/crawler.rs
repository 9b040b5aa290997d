//! Bounded breadth-first crawl over one domain.
//!
//! The crawler owns the frontier and visited set for a single run. Pages at
//! the same depth are fetched concurrently under a semaphore, then merged
//! back in discovery order so traversal (and everything downstream of it)
//! is deterministic regardless of fetch completion timing.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ProfileError, Result};
use crate::fetchers::html;
use crate::normalize::{is_same_domain, normalize};
use crate::traits::fetcher::Fetcher;
use crate::types::{DiscoveredLink, PageRecord, PipelineConfig, SeedTarget};

/// Fetch attempts for the root page before the run is declared dead.
const ROOT_ATTEMPTS: usize = 3;

/// Base delay between root retries; doubles per attempt.
const ROOT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Hosts whose links are harvested as social-media profiles.
const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
];

/// Contact details harvested from hrefs during link discovery.
///
/// `mailto:`/`tel:` targets and social-profile links never survive text
/// cleaning (they live in attributes, not visible text), so the crawler
/// collects them as it parses each page.
#[derive(Debug, Default, Clone)]
pub struct ContactHints {
    /// Addresses from `mailto:` hrefs, lower-cased, deduplicated.
    pub emails: Vec<String>,

    /// Numbers from `tel:` hrefs, deduplicated.
    pub phones: Vec<String>,

    /// Off-domain links to known social hosts, deduplicated.
    pub social_links: Vec<String>,
}

impl ContactHints {
    fn add_email(&mut self, raw: &str) {
        // Drop ?subject=... style suffixes.
        let address = raw.split('?').next().unwrap_or("").trim().to_ascii_lowercase();
        if address.contains('@') && !self.emails.contains(&address) {
            self.emails.push(address);
        }
    }

    fn add_phone(&mut self, raw: &str) {
        let number = raw.trim().to_string();
        if !number.is_empty() && !self.phones.contains(&number) {
            self.phones.push(number);
        }
    }

    fn add_social(&mut self, url: &str) {
        if !self.social_links.contains(&url.to_string()) {
            self.social_links.push(url.to_string());
        }
    }
}

/// Whether a URL points at a known social-media host.
fn is_social_host(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| {
            SOCIAL_HOSTS
                .iter()
                .any(|s| host == *s || host.ends_with(&format!(".{s}")))
        })
        .unwrap_or(false)
}

/// Everything the crawl stage hands to ranking and extraction.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// One record per fetch attempt, in traversal order. The root is
    /// always first.
    pub records: Vec<PageRecord>,

    /// Distinct on-domain links discovered, in discovery order. Carries
    /// the anchor-text hints the ranker feeds to the model.
    pub links: Vec<DiscoveredLink>,

    /// Contact details harvested from hrefs along the way.
    pub hints: ContactHints,

    /// Crawl domain, re-derived from the root's post-redirect URL.
    pub domain: String,

    /// Normalized root URL after redirects.
    pub root_url: String,
}

impl CrawlOutcome {
    /// Number of records whose fetch failed.
    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_error()).count()
    }
}

/// Crawl `seed` breadth-first within its domain, depth, page, and time
/// bounds.
///
/// Interior fetch failures are recorded and skipped; only an unreachable
/// root (after [`ROOT_ATTEMPTS`] tries) or cancellation before any data
/// fails the run. On cancellation or an exhausted time budget mid-crawl,
/// the partial outcome is returned for the later stages to work with.
pub async fn crawl<F: Fetcher>(
    seed: &SeedTarget,
    config: &PipelineConfig,
    fetcher: &F,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Result<CrawlOutcome> {
    if cancel.is_cancelled() {
        return Err(ProfileError::Cancelled);
    }

    let requested_root =
        normalize(&seed.root_url, &seed.root_url).unwrap_or_else(|| seed.root_url.clone());

    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier: VecDeque<DiscoveredLink> = VecDeque::new();
    let mut records: Vec<PageRecord> = Vec::new();
    let mut links: Vec<DiscoveredLink> = Vec::new();
    let mut discovered: HashSet<String> = HashSet::new();
    let mut hints = ContactHints::default();

    // Root fetch with its own retry budget; everything else gets one shot.
    let root_page = fetch_root(fetcher, &requested_root, cancel).await?;

    // The crawl follows the root's redirect target: a seed of acme.org
    // whose site lives at www.acme.org must not discard every link.
    let root_url =
        normalize(&root_page.final_url, &root_page.final_url).unwrap_or(requested_root.clone());
    let domain = url::Url::parse(&root_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_else(|| seed.domain.clone());
    if domain != seed.domain {
        info!(original = %seed.domain, resolved = %domain, "Crawl domain resolved after redirect");
    }

    visited.insert(requested_root.clone());
    visited.insert(root_url.clone());

    let title = html::extract_title(&root_page.html);
    discover_into(
        &root_page.html,
        &root_page.final_url,
        &root_url,
        1,
        seed.max_depth,
        &domain,
        &visited,
        &mut discovered,
        &mut links,
        &mut frontier,
        &mut hints,
    );
    records.push(PageRecord::fetched(&root_url, 0, root_page.html).with_title(title));

    let semaphore = Arc::new(Semaphore::new(config.fetch_concurrency));

    while !frontier.is_empty() && records.len() < seed.max_pages {
        if cancel.is_cancelled() {
            debug!("Crawl cancelled; returning partial results");
            break;
        }
        if Instant::now() >= deadline {
            info!(pages = records.len(), "Time budget exhausted; stopping crawl");
            break;
        }

        // One wave = the frontier entries of the current depth, capped by
        // the remaining page budget. Frontier order is discovery order.
        let wave_depth = frontier.front().map(|l| l.depth).unwrap_or(0);
        let mut batch: Vec<DiscoveredLink> = Vec::new();
        while let Some(front) = frontier.front() {
            if front.depth != wave_depth || records.len() + batch.len() >= seed.max_pages {
                break;
            }
            let Some(entry) = frontier.pop_front() else {
                break;
            };
            if visited.contains(&entry.url) {
                continue;
            }
            visited.insert(entry.url.clone());
            batch.push(entry);
        }
        if batch.is_empty() {
            continue;
        }

        if !config.politeness_delay.is_zero() {
            tokio::time::sleep(config.politeness_delay).await;
        }

        debug!(depth = wave_depth, pages = batch.len(), "Fetching frontier wave");

        let fetches = batch.iter().map(|entry| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                fetcher.fetch(&entry.url).await
            }
        });

        // join_all preserves input order, which keeps the merge of
        // concurrently fetched results deterministic.
        let results = tokio::select! {
            results = join_all(fetches) => results,
            _ = cancel.cancelled() => {
                debug!("Crawl cancelled mid-wave; returning partial results");
                break;
            }
        };

        for (entry, result) in batch.into_iter().zip(results) {
            match result {
                Ok(page) => {
                    let title = html::extract_title(&page.html);
                    discover_into(
                        &page.html,
                        &page.final_url,
                        &entry.url,
                        entry.depth + 1,
                        seed.max_depth,
                        &domain,
                        &visited,
                        &mut discovered,
                        &mut links,
                        &mut frontier,
                        &mut hints,
                    );
                    records.push(
                        PageRecord::fetched(&entry.url, entry.depth, page.html).with_title(title),
                    );
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "Page fetch failed");
                    records.push(PageRecord::failed(&entry.url, entry.depth, e.to_string()));
                }
            }
        }
    }

    info!(
        pages_fetched = records.len(),
        pages_discovered = links.len(),
        errors = records.iter().filter(|r| r.outcome.is_error()).count(),
        "Crawl complete"
    );

    Ok(CrawlOutcome {
        records,
        links,
        hints,
        domain,
        root_url,
    })
}

/// Fetch the root page, retrying with doubling delays.
async fn fetch_root<F: Fetcher>(
    fetcher: &F,
    root_url: &str,
    cancel: &CancellationToken,
) -> Result<crate::traits::fetcher::FetchedPage> {
    let mut delay = ROOT_RETRY_DELAY;
    let mut last_error = None;

    for attempt in 1..=ROOT_ATTEMPTS {
        if cancel.is_cancelled() {
            return Err(ProfileError::Cancelled);
        }
        match fetcher.fetch(root_url).await {
            Ok(page) => return Ok(page),
            Err(e) => {
                warn!(url = %root_url, attempt, error = %e, "Root fetch failed");
                last_error = Some(e);
                if attempt < ROOT_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    Err(ProfileError::RootUnreachable {
        url: root_url.to_string(),
        source: last_error.expect("at least one attempt"),
    })
}

/// Parse a fetched body, harvest contact hints, and enqueue usable links.
///
/// Links are normalized, restricted to the crawl domain, deduplicated
/// against everything already discovered, and enqueued at `depth` unless
/// that exceeds `max_depth`. Document order is preserved. `mailto:`/`tel:`
/// targets and social-host links are collected as hints instead of being
/// dropped outright.
#[allow(clippy::too_many_arguments)]
fn discover_into(
    page_html: &str,
    base_url: &str,
    source_url: &str,
    depth: usize,
    max_depth: usize,
    domain: &str,
    visited: &HashSet<String>,
    discovered: &mut HashSet<String>,
    links: &mut Vec<DiscoveredLink>,
    frontier: &mut VecDeque<DiscoveredLink>,
    hints: &mut ContactHints,
) {
    for raw in html::extract_links(page_html) {
        if let Some(address) = raw.href.strip_prefix("mailto:") {
            hints.add_email(address);
            continue;
        }
        if let Some(number) = raw.href.strip_prefix("tel:") {
            hints.add_phone(number);
            continue;
        }

        let Some(url) = normalize(base_url, &raw.href) else {
            continue;
        };
        if !is_same_domain(&url, domain) {
            if is_social_host(&url) {
                hints.add_social(&url);
            }
            continue;
        }
        if depth > max_depth || discovered.contains(&url) {
            continue;
        }
        discovered.insert(url.clone());

        let link = DiscoveredLink {
            url: url.clone(),
            source_url: source_url.to_string(),
            anchor_text: raw.anchor_text,
            depth,
        };
        links.push(link.clone());

        if !visited.contains(&url) {
            frontier.push_back(link);
        }
    }
}
