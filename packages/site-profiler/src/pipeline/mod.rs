//! The profiling pipeline - the core of the library.
//!
//! Sequences crawl → page ranking → text extraction → profile synthesis
//! under one wall-clock budget, and assembles the final report. Every
//! model-dependent stage carries a deterministic fallback, so the pipeline
//! emits a schema-valid profile for every run that got past the root page.

pub mod extract;
pub mod prompts;
pub mod rank;
pub mod synthesize;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::crawler::crawl;
use crate::error::{ModelError, ModelResult, Result};
use crate::traits::ai::LanguageModel;
use crate::traits::fetcher::Fetcher;
use crate::types::{PageRecord, PipelineConfig, ProfileReport, RunMetadata, SeedTarget};

/// Base delay between retries of transport-level model failures; doubles
/// per attempt.
const MODEL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Run the full pipeline for one seed and return the report.
///
/// Fails only on an unreachable root or cancellation before any page data
/// exists; every other failure mode degrades to a best-effort but
/// schema-valid [`ProfileReport`].
pub async fn run_profile<F: Fetcher, M: LanguageModel>(
    seed: &SeedTarget,
    config: &PipelineConfig,
    fetcher: &F,
    model: &M,
    cancel: &CancellationToken,
) -> Result<ProfileReport> {
    let started_at = Utc::now();
    let deadline = Instant::now() + config.time_budget;

    info!(root = %seed.root_url, max_pages = seed.max_pages, max_depth = seed.max_depth, "Profiling run starting");

    let outcome = crawl(seed, config, fetcher, cancel, deadline).await?;

    let selection = rank::rank(&outcome, config, model, cancel).await;
    info!(selected = selection.len(), "Page selection complete");

    let by_url: HashMap<&str, &PageRecord> = outcome
        .records
        .iter()
        .map(|r| (r.url.as_str(), r))
        .collect();

    let mut texts = Vec::new();
    let mut empty_extractions = 0usize;
    for selected in &selection {
        let Some(record) = by_url.get(selected.url.as_str()).copied() else {
            continue;
        };
        match extract::extract(record, config.page_char_cap) {
            Some(text) => texts.push(text),
            None => {
                warn!(url = %selected.url, "Selected page yielded no text");
                empty_extractions += 1;
            }
        }
    }

    let company_hint = seed
        .company_hint
        .clone()
        .unwrap_or_else(|| domain_label(&outcome.domain));

    let synthesis = synthesize::synthesize(
        &texts,
        &company_hint,
        &outcome.root_url,
        &outcome.hints,
        config,
        model,
        cancel,
    )
    .await;

    let metadata = RunMetadata {
        total_pages_discovered: outcome.links.len(),
        pages_fetched: outcome.records.len(),
        pages_selected: selection.len(),
        pages_with_errors: outcome.error_count() + empty_extractions,
        low_confidence_fields: synthesis.low_confidence_fields,
        model_used: model.model_name().to_string(),
        started_at,
        finished_at: Utc::now(),
    };

    info!(
        pages_fetched = metadata.pages_fetched,
        pages_selected = metadata.pages_selected,
        errors = metadata.pages_with_errors,
        "Profiling run complete"
    );

    Ok(ProfileReport {
        business_data: synthesis.profile,
        extraction_metadata: metadata,
    })
}

/// Fallback company hint when the caller supplied none: the first label of
/// the crawl domain ("www.acme-widgets.com" → "acme-widgets").
fn domain_label(domain: &str) -> String {
    domain
        .strip_prefix("www.")
        .unwrap_or(domain)
        .split('.')
        .next()
        .unwrap_or(domain)
        .to_string()
}

/// Call the model, retrying transport-level failures with exponential
/// backoff up to `attempts` tries.
///
/// Contract violations in response text are not retried here; the caller
/// owns its corrective-retry-then-fallback policy for those.
pub(crate) async fn call_with_retry<M: LanguageModel + ?Sized>(
    model: &M,
    system: &str,
    user: &str,
    attempts: usize,
    cancel: &CancellationToken,
) -> ModelResult<String> {
    let attempts = attempts.max(1);
    let mut delay = MODEL_RETRY_DELAY;
    let mut last_error = None;

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled);
        }
        match model.complete(system, user).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(attempt, error = %e, "Model call failed; retrying");
                last_error = Some(e);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(ModelError::Timeout))
}

/// Strip a markdown code fence the model may have wrapped its JSON in.
pub(crate) fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, MockReply};

    #[test]
    fn domain_label_strips_www_and_tld() {
        assert_eq!(domain_label("www.acme-widgets.com"), "acme-widgets");
        assert_eq!(domain_label("acme.co.uk"), "acme");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_failures_then_succeeds() {
        let model = MockModel::new()
            .with_failure(MockReply::Timeout)
            .with_failure(MockReply::Api(503))
            .with_reply("ok");

        let result = call_with_retry(&model, "s", "u", 3, &CancellationToken::new()).await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempt_cap() {
        let model = MockModel::new();

        let result = call_with_retry(&model, "s", "u", 3, &CancellationToken::new()).await;
        assert!(matches!(result, Err(ModelError::Timeout)));
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let model = MockModel::new().with_failure(MockReply::Api(401));

        let result = call_with_retry(&model, "s", "u", 3, &CancellationToken::new()).await;
        assert!(matches!(result, Err(ModelError::Api { status: 401, .. })));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_short_circuits() {
        let model = MockModel::new().with_reply("never used");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = call_with_retry(&model, "s", "u", 3, &cancel).await;
        assert!(matches!(result, Err(ModelError::Cancelled)));
        assert_eq!(model.call_count(), 0);
    }
}
