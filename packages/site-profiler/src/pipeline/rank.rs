//! Relevance ranking - model-assisted selection of the pages to read.

use std::collections::HashSet;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::crawler::CrawlOutcome;
use crate::pipeline::prompts::{
    format_corrective_prompt, format_rank_manifest_line, format_rank_prompt, RANK_SYSTEM_PROMPT,
};
use crate::pipeline::{call_with_retry, strip_code_fences};
use crate::traits::ai::LanguageModel;
use crate::types::{PipelineConfig, RankedPage};

/// Path keywords the heuristic fallback scores against.
const RANK_KEYWORDS: &[&str] = &["about", "contact", "service"];

/// Paths treated as the site's home page for backfilling.
const HOME_PATHS: &[&str] = &["/", "/home", "/index", "/index.html", "/home.html"];

/// One selectable page: successfully fetched, with its discovery hints.
#[derive(Debug)]
struct Candidate {
    url: String,
    path: String,
    anchor: String,
    title: String,
    depth: usize,
    /// Traversal position, the final tie-break.
    index: usize,
}

/// The model's expected reply shape.
#[derive(Debug, Deserialize)]
struct RankItem {
    url: String,
    #[serde(default)]
    reason: String,
}

/// Select up to `config.top_k_pages` pages worth extracting.
///
/// Asks the model to pick from a manifest of every successfully fetched
/// page; URLs the model invents are discarded, the list is truncated to K,
/// and the root/home page is backfilled when the model underfills. If the
/// call fails after its retry budget, or its output survives neither parse
/// nor one corrective retry, a keyword heuristic over the paths takes over.
/// Never fails: the result is always a subset of the fetched pages.
pub async fn rank<M: LanguageModel>(
    outcome: &CrawlOutcome,
    config: &PipelineConfig,
    model: &M,
    cancel: &CancellationToken,
) -> Vec<RankedPage> {
    let candidates = build_candidates(outcome);
    let k = config.top_k_pages;

    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }
    if candidates.len() == 1 {
        return vec![RankedPage {
            url: candidates[0].url.clone(),
            rank: 0,
            reason: "only fetched page".to_string(),
        }];
    }

    let manifest = candidates
        .iter()
        .map(|c| format_rank_manifest_line(&c.url, &c.path, &c.anchor, &c.title, c.depth))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format_rank_prompt(&manifest, k);

    let mut selected = match call_with_retry(
        model,
        RANK_SYSTEM_PROMPT,
        &user,
        config.model_attempts,
        cancel,
    )
    .await
    {
        Ok(response) => match parse_selection(&response, &candidates) {
            Ok(items) => Some(items),
            Err(parse_error) => {
                // One corrective retry carrying the parse error.
                debug!(error = %parse_error, "Ranking response unusable; corrective retry");
                let corrective = format_corrective_prompt(&user, &parse_error);
                match call_with_retry(
                    model,
                    RANK_SYSTEM_PROMPT,
                    &corrective,
                    config.model_attempts,
                    cancel,
                )
                .await
                {
                    Ok(response) => parse_selection(&response, &candidates).ok(),
                    Err(_) => None,
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "Ranking model call failed");
            None
        }
    }
    .unwrap_or_default();

    if selected.is_empty() {
        warn!("Falling back to keyword heuristic for page selection");
        selected = heuristic_selection(&candidates, k);
    } else {
        selected.truncate(k);
        backfill_home(&mut selected, &candidates, k);
    }

    selected
        .into_iter()
        .enumerate()
        .map(|(rank, (url, reason))| RankedPage { url, rank, reason })
        .collect()
}

/// Successfully fetched pages in traversal order, joined with the anchor
/// text they were discovered under. The root is always first.
fn build_candidates(outcome: &CrawlOutcome) -> Vec<Candidate> {
    outcome
        .records
        .iter()
        .filter(|r| !r.outcome.is_error())
        .enumerate()
        .map(|(index, record)| {
            let anchor = outcome
                .links
                .iter()
                .find(|l| l.url == record.url)
                .map(|l| l.anchor_text.clone())
                .unwrap_or_default();
            Candidate {
                path: Url::parse(&record.url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|_| "/".to_string()),
                url: record.url.clone(),
                anchor,
                title: record.title.clone().unwrap_or_default(),
                depth: record.depth,
                index,
            }
        })
        .collect()
}

/// Parse and validate the model's reply against the candidate set.
///
/// Returns the surviving `(url, reason)` pairs in model order, or the parse
/// problem to feed the corrective retry. A reply that parses but contains
/// no candidate URL counts as unusable.
fn parse_selection(
    response: &str,
    candidates: &[Candidate],
) -> Result<Vec<(String, String)>, String> {
    let json = strip_code_fences(response);
    let items: Vec<RankItem> =
        serde_json::from_str(json).map_err(|e| format!("expected a JSON array of {{url, reason}}: {e}"))?;

    let known: HashSet<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    for item in items {
        if !known.contains(item.url.as_str()) {
            debug!(url = %item.url, "Discarding URL invented by the model");
            continue;
        }
        if seen.insert(item.url.clone()) {
            valid.push((item.url, item.reason));
        }
    }

    if valid.is_empty() {
        return Err("no returned URL matched the candidate set".to_string());
    }
    Ok(valid)
}

/// Backfill the root and any home-looking page when the model underfills K.
fn backfill_home(selected: &mut Vec<(String, String)>, candidates: &[Candidate], k: usize) {
    let chosen: HashSet<String> = selected.iter().map(|(url, _)| url.clone()).collect();
    for candidate in candidates {
        if selected.len() >= k {
            break;
        }
        let is_home = candidate.index == 0 || HOME_PATHS.contains(&candidate.path.as_str());
        if is_home && !chosen.contains(&candidate.url) {
            selected.push((candidate.url.clone(), "landing page".to_string()));
        }
    }
}

/// Deterministic selection when the model is unavailable: the root page
/// plus up to K-1 pages whose path matches the keyword list, ranked by
/// match count, then shallower depth, then discovery order.
fn heuristic_selection(candidates: &[Candidate], k: usize) -> Vec<(String, String)> {
    let mut selected = vec![(
        candidates[0].url.clone(),
        "landing page".to_string(),
    )];

    let mut scored: Vec<(usize, &Candidate)> = candidates[1..]
        .iter()
        .map(|c| (keyword_score(&c.path), c))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(a.1.depth.cmp(&b.1.depth))
            .then(a.1.index.cmp(&b.1.index))
    });

    for (_, candidate) in scored.into_iter().take(k.saturating_sub(1)) {
        selected.push((
            candidate.url.clone(),
            format!("path matches keyword: {}", candidate.path),
        ));
    }
    selected
}

fn keyword_score(path: &str) -> usize {
    let path = path.to_ascii_lowercase();
    RANK_KEYWORDS.iter().filter(|kw| path.contains(*kw)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ContactHints, CrawlOutcome};
    use crate::testing::MockModel;
    use crate::types::{DiscoveredLink, PageRecord};

    fn outcome_with(paths: &[&str]) -> CrawlOutcome {
        let base = "https://acme.test";
        let mut records = vec![PageRecord::fetched(format!("{base}/"), 0, "home")];
        let mut links = Vec::new();
        for path in paths {
            let url = format!("{base}{path}");
            records.push(PageRecord::fetched(&url, 1, "content"));
            links.push(DiscoveredLink {
                url,
                source_url: format!("{base}/"),
                anchor_text: path.trim_start_matches('/').to_string(),
                depth: 1,
            });
        }
        CrawlOutcome {
            records,
            links,
            hints: ContactHints::default(),
            domain: "acme.test".to_string(),
            root_url: format!("{base}/"),
        }
    }

    fn config_with_k(k: usize) -> PipelineConfig {
        PipelineConfig::default().with_top_k(k).with_model_attempts(1)
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_model_order_and_backfills_root() {
        let outcome = outcome_with(&["/about", "/contact", "/blog", "/careers"]);
        let model = MockModel::new().with_reply(
            r#"[
                {"url": "https://acme.test/contact", "reason": "contact details"},
                {"url": "https://acme.test/about", "reason": "company story"}
            ]"#,
        );

        let selection = rank(&outcome, &config_with_k(3), &model, &CancellationToken::new()).await;

        let urls: Vec<_> = selection.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.test/contact",
                "https://acme.test/about",
                "https://acme.test/",
            ]
        );
        assert_eq!(selection[0].rank, 0);
        assert_eq!(selection[2].reason, "landing page");
    }

    #[tokio::test(start_paused = true)]
    async fn discards_invented_urls() {
        let outcome = outcome_with(&["/about"]);
        let model = MockModel::new().with_reply(
            r#"[
                {"url": "https://acme.test/pricing", "reason": "made up"},
                {"url": "https://acme.test/about", "reason": "real"}
            ]"#,
        );

        let selection = rank(&outcome, &config_with_k(2), &model, &CancellationToken::new()).await;

        let urls: Vec<_> = selection.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://acme.test/about", "https://acme.test/"]);
    }

    #[tokio::test(start_paused = true)]
    async fn truncates_to_k() {
        let outcome = outcome_with(&["/a", "/b", "/c"]);
        let model = MockModel::new().with_reply(
            r#"[
                {"url": "https://acme.test/a", "reason": "1"},
                {"url": "https://acme.test/b", "reason": "2"},
                {"url": "https://acme.test/c", "reason": "3"},
                {"url": "https://acme.test/", "reason": "4"}
            ]"#,
        );

        let selection = rank(&outcome, &config_with_k(2), &model, &CancellationToken::new()).await;
        assert_eq!(selection.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_fenced_json() {
        let outcome = outcome_with(&["/about"]);
        let model = MockModel::new().with_reply(
            "```json\n[{\"url\": \"https://acme.test/about\", \"reason\": \"r\"}]\n```",
        );

        let selection = rank(&outcome, &config_with_k(1), &model, &CancellationToken::new()).await;
        assert_eq!(selection[0].url, "https://acme.test/about");
    }

    #[tokio::test(start_paused = true)]
    async fn corrective_retry_recovers_from_garbage() {
        let outcome = outcome_with(&["/about"]);
        let model = MockModel::new()
            .with_reply("here are my thoughts, not json")
            .with_reply(r#"[{"url": "https://acme.test/about", "reason": "fixed"}]"#);

        let selection = rank(&outcome, &config_with_k(1), &model, &CancellationToken::new()).await;

        assert_eq!(selection[0].url, "https://acme.test/about");
        assert_eq!(model.call_count(), 2);
        // The corrective prompt must carry the parse complaint.
        let (_, user) = &model.calls()[1];
        assert!(user.contains("could not be parsed"));
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_keyword_heuristic() {
        let outcome = outcome_with(&["/blog", "/about-us", "/contact", "/products"]);
        // Empty script: every call times out.
        let model = MockModel::new();

        let selection = rank(&outcome, &config_with_k(3), &model, &CancellationToken::new()).await;

        let urls: Vec<_> = selection.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.test/",
                "https://acme.test/about-us",
                "https://acme.test/contact",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn heuristic_prefers_match_count_then_depth_then_order() {
        let base = "https://acme.test";
        let mut outcome = outcome_with(&["/contact"]);
        // A deeper page that matches two keywords outranks a shallow single
        // match; equal scores fall back to discovery order.
        outcome.records.push(PageRecord::fetched(
            format!("{base}/about/contact"),
            2,
            "x",
        ));
        outcome.records.push(PageRecord::fetched(format!("{base}/services"), 1, "x"));
        let model = MockModel::new();

        let selection = rank(&outcome, &config_with_k(4), &model, &CancellationToken::new()).await;

        let urls: Vec<_> = selection.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.test/",
                "https://acme.test/about/contact",
                "https://acme.test/contact",
                "https://acme.test/services",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn selection_is_subset_of_candidates() {
        let outcome = outcome_with(&["/about", "/contact"]);
        let model = MockModel::new().with_reply("[]");

        let selection = rank(&outcome, &config_with_k(5), &model, &CancellationToken::new()).await;

        let known: Vec<_> = outcome.records.iter().map(|r| r.url.as_str()).collect();
        assert!(!selection.is_empty());
        assert!(selection.len() <= 5);
        for page in &selection {
            assert!(known.contains(&page.url.as_str()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_candidate_needs_no_model() {
        let outcome = outcome_with(&[]);
        let model = MockModel::new();

        let selection = rank(&outcome, &config_with_k(6), &model, &CancellationToken::new()).await;

        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].url, "https://acme.test/");
        assert_eq!(model.call_count(), 0);
    }
}
