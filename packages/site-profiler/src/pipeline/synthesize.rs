//! Profile synthesis - consolidate extracted text into one validated
//! business record.

use std::collections::BTreeSet;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::crawler::ContactHints;
use crate::pipeline::prompts::{
    format_corrective_prompt, format_synthesize_prompt, SYNTHESIZE_SYSTEM_PROMPT,
};
use crate::pipeline::{call_with_retry, strip_code_fences};
use crate::traits::ai::LanguageModel;
use crate::types::{BusinessProfile, ExtractedText, PipelineConfig};

/// Result of the synthesis stage.
#[derive(Debug)]
pub struct SynthesisOutcome {
    /// Always schema-complete, even when every model call failed.
    pub profile: BusinessProfile,

    /// `"<field>:<value>"` entries for model-claimed contact details the
    /// corpus could not corroborate.
    pub low_confidence_fields: Vec<String>,

    /// Whether the regex-only fallback produced the profile.
    pub used_fallback: bool,
}

/// Synthesize a business profile from the selected pages' text.
///
/// The model is asked for the profile JSON verbatim; a response that fails
/// to parse gets one corrective retry carrying the parse error. The
/// validated result is coerced field-by-field (singletons to sets, missing
/// to empty), enriched with href-harvested contact hints, and its
/// emails/phones are cross-checked against a regex pass over the same
/// corpus - unverified values are kept but flagged. When both model calls
/// fail, the profile is assembled purely from the regex pass and hints.
pub async fn synthesize<M: LanguageModel>(
    texts: &[ExtractedText],
    company_hint: &str,
    root_url: &str,
    hints: &ContactHints,
    config: &PipelineConfig,
    model: &M,
    cancel: &CancellationToken,
) -> SynthesisOutcome {
    let corpus = build_corpus(texts, config.total_char_cap);
    let evidence = Evidence::scan(&corpus, hints);

    if texts.is_empty() {
        debug!("No extracted text; synthesizing from harvested evidence only");
        return fallback_outcome(company_hint, root_url, &evidence);
    }

    let user = format_synthesize_prompt(texts, company_hint, config.total_char_cap);

    let parsed = match call_with_retry(
        model,
        SYNTHESIZE_SYSTEM_PROMPT,
        &user,
        config.model_attempts,
        cancel,
    )
    .await
    {
        Ok(response) => match parse_profile(&response) {
            Ok(profile) => Some(profile),
            Err(parse_error) => {
                debug!(error = %parse_error, "Synthesis response unusable; corrective retry");
                let corrective = format_corrective_prompt(&user, &parse_error);
                match call_with_retry(
                    model,
                    SYNTHESIZE_SYSTEM_PROMPT,
                    &corrective,
                    config.model_attempts,
                    cancel,
                )
                .await
                {
                    Ok(response) => parse_profile(&response).ok(),
                    Err(_) => None,
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "Synthesis model call failed");
            None
        }
    };

    let Some(mut profile) = parsed else {
        warn!("Falling back to regex-assembled profile");
        return fallback_outcome(company_hint, root_url, &evidence);
    };

    if profile.company_name.trim().is_empty() {
        profile.company_name = company_hint.to_string();
    }
    if profile.company_main_url.trim().is_empty() {
        profile.company_main_url = root_url.to_string();
    }
    for email in &hints.emails {
        profile.add_email(email);
    }
    for phone in &hints.phones {
        profile.add_phone(phone);
    }
    for link in &hints.social_links {
        profile.add_social_link(link);
    }

    let low_confidence_fields = cross_validate(&profile, &evidence);

    SynthesisOutcome {
        profile,
        low_confidence_fields,
        used_fallback: false,
    }
}

/// The concatenated text the model reads, rebuilt for the regex pass.
fn build_corpus(texts: &[ExtractedText], total_char_cap: usize) -> String {
    let mut corpus = String::new();
    for text in texts {
        if corpus.len() >= total_char_cap {
            break;
        }
        let remaining = total_char_cap - corpus.len();
        corpus.extend(text.text.chars().take(remaining));
        corpus.push('\n');
    }
    corpus
}

/// Regex hits over the corpus, unioned with the href-harvested hints.
struct Evidence {
    emails: BTreeSet<String>,
    phones: Vec<String>,
    phone_digits: BTreeSet<String>,
    social_links: Vec<String>,
}

impl Evidence {
    fn scan(corpus: &str, hints: &ContactHints) -> Self {
        let email_pattern =
            regex::Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
        let phone_pattern = regex::Regex::new(r"\+?\d[\d\-\s().]{6,}\d").unwrap();
        let social_pattern = regex::Regex::new(
            r#"https?://(?:www\.)?(?:facebook|instagram|twitter|x|linkedin|youtube|tiktok|pinterest)\.com/[^\s"'<>]+"#,
        )
        .unwrap();

        let mut emails: BTreeSet<String> = email_pattern
            .find_iter(corpus)
            .map(|m| m.as_str().to_ascii_lowercase())
            .collect();
        for email in &hints.emails {
            emails.insert(email.to_ascii_lowercase());
        }

        let mut phones: Vec<String> = Vec::new();
        let mut phone_digits = BTreeSet::new();
        for m in phone_pattern.find_iter(corpus) {
            let number = m.as_str().trim().to_string();
            let digits = digits_of(&number);
            if digits.len() >= 7 && phone_digits.insert(digits) {
                phones.push(number);
            }
        }
        for phone in &hints.phones {
            let digits = digits_of(phone);
            if digits.len() >= 7 && phone_digits.insert(digits) {
                phones.push(phone.clone());
            }
        }

        let mut social_links: Vec<String> = social_pattern
            .find_iter(corpus)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .collect();
        for link in &hints.social_links {
            if !social_links.contains(link) {
                social_links.push(link.clone());
            }
        }

        Self {
            emails,
            phones,
            phone_digits,
            social_links,
        }
    }

    fn verifies_email(&self, email: &str) -> bool {
        self.emails.contains(&email.to_ascii_lowercase())
    }

    /// A claimed number is corroborated when its digits match a hit up to
    /// a country-code prefix on either side.
    fn verifies_phone(&self, phone: &str) -> bool {
        let claimed = digits_of(phone);
        if claimed.len() < 7 {
            return false;
        }
        self.phone_digits
            .iter()
            .any(|hit| hit.ends_with(&claimed) || claimed.ends_with(hit.as_str()))
    }
}

fn digits_of(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse the model's reply into a profile, coercing lenient shapes.
///
/// The reply must be a JSON object; each expected field is coerced
/// (string → singleton container, missing/null → empty) so the result is
/// always schema-complete. The error string feeds the corrective retry.
fn parse_profile(response: &str) -> Result<BusinessProfile, String> {
    let json = strip_code_fences(response);
    let value: Value =
        serde_json::from_str(json).map_err(|e| format!("expected a JSON object: {e}"))?;
    let object = value
        .as_object()
        .ok_or_else(|| "expected a JSON object at the top level".to_string())?;

    let mut profile = BusinessProfile {
        company_name: string_field(object.get("company_name")),
        company_main_url: string_field(object.get("company_main_url")),
        summary: string_field(object.get("summary")),
        ..Default::default()
    };
    for email in string_list_field(object.get("emails")) {
        profile.add_email(&email);
    }
    for phone in string_list_field(object.get("contact_numbers")) {
        profile.add_phone(&phone);
    }
    for link in string_list_field(object.get("social_media_links")) {
        profile.add_social_link(&link);
    }

    Ok(profile)
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Coerce a field to a list of strings: arrays keep their string entries,
/// a bare string becomes a singleton, everything else is empty.
fn string_list_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.to_string()],
        _ => Vec::new(),
    }
}

/// Flag model-claimed contact details the evidence cannot corroborate.
fn cross_validate(profile: &BusinessProfile, evidence: &Evidence) -> Vec<String> {
    let mut flags = Vec::new();
    for email in &profile.emails {
        if !evidence.verifies_email(email) {
            flags.push(format!("emails:{email}"));
        }
    }
    for phone in &profile.contact_numbers {
        if !evidence.verifies_phone(phone) {
            flags.push(format!("contact_numbers:{phone}"));
        }
    }
    flags
}

/// Best-effort profile when the model is unavailable: everything the regex
/// pass and href harvesting produced, the hint as the name, no summary.
fn fallback_outcome(company_hint: &str, root_url: &str, evidence: &Evidence) -> SynthesisOutcome {
    let mut profile = BusinessProfile::empty(company_hint, root_url);
    for email in &evidence.emails {
        profile.add_email(email);
    }
    for phone in &evidence.phones {
        profile.add_phone(phone);
    }
    for link in &evidence.social_links {
        profile.add_social_link(link);
    }

    SynthesisOutcome {
        profile,
        low_confidence_fields: Vec::new(),
        used_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    const ROOT: &str = "https://acme.test/";

    fn texts(pages: &[&str]) -> Vec<ExtractedText> {
        pages
            .iter()
            .enumerate()
            .map(|(i, content)| {
                ExtractedText::new(format!("https://acme.test/p{i}"), content.to_string())
            })
            .collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_model_attempts(1)
    }

    async fn run<M: LanguageModel>(
        model: &M,
        pages: &[&str],
        hints: &ContactHints,
    ) -> SynthesisOutcome {
        synthesize(
            &texts(pages),
            "Acme",
            ROOT,
            hints,
            &config(),
            model,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn valid_response_produces_verified_profile() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme Widgets Ltd",
                "company_main_url": "https://acme.test/",
                "emails": ["Sales@Acme.test"],
                "contact_numbers": ["+1 555-123-4567"],
                "social_media_links": ["https://facebook.com/acme"],
                "summary": "Acme makes widgets."
            }"#,
        );

        let outcome = run(
            &model,
            &["Reach us at sales@acme.test or +1 555-123-4567."],
            &ContactHints::default(),
        )
        .await;

        assert!(!outcome.used_fallback);
        assert_eq!(outcome.profile.company_name, "Acme Widgets Ltd");
        assert!(outcome.profile.emails.contains("sales@acme.test"));
        assert!(outcome
            .profile
            .contact_numbers
            .contains("+1 555-123-4567"));
        assert!(outcome.low_confidence_fields.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn coerces_singletons_and_missing_fields() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": "info@acme.test",
                "summary": ""
            }"#,
        );

        let outcome = run(&model, &["info@acme.test"], &ContactHints::default()).await;

        assert_eq!(outcome.profile.emails.len(), 1);
        assert!(outcome.profile.contact_numbers.is_empty());
        assert!(outcome.profile.social_media_links.is_empty());
        assert_eq!(outcome.profile.summary, "");
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_claims_are_kept_but_flagged() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": ["ghost@acme.test"],
                "contact_numbers": ["+9 999 999 9999"],
                "social_media_links": [],
                "summary": "s"
            }"#,
        );

        let outcome = run(&model, &["no contact details here"], &ContactHints::default()).await;

        assert!(outcome.profile.emails.contains("ghost@acme.test"));
        assert!(outcome
            .low_confidence_fields
            .contains(&"emails:ghost@acme.test".to_string()));
        assert!(outcome
            .low_confidence_fields
            .iter()
            .any(|f| f.starts_with("contact_numbers:")));
    }

    #[tokio::test(start_paused = true)]
    async fn normalized_phone_forms_verify_across_country_code() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": [],
                "contact_numbers": ["+1 (555) 123-4567"],
                "social_media_links": [],
                "summary": "s"
            }"#,
        );

        // Corpus carries the number without the country code.
        let outcome = run(&model, &["Call 555 123 4567 today"], &ContactHints::default()).await;

        assert!(outcome.low_confidence_fields.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn corrective_retry_carries_parse_error() {
        let model = MockModel::new().with_reply("sure! here is the profile you asked for").with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": [],
                "contact_numbers": [],
                "social_media_links": [],
                "summary": "fixed"
            }"#,
        );

        let outcome = run(&model, &["text"], &ContactHints::default()).await;

        assert!(!outcome.used_fallback);
        assert_eq!(outcome.profile.summary, "fixed");
        assert_eq!(model.call_count(), 2);
        let (_, corrective_user) = &model.calls()[1];
        assert!(corrective_user.contains("could not be parsed"));
    }

    #[tokio::test(start_paused = true)]
    async fn double_failure_falls_back_to_regex_profile() {
        // Empty script: both the original and the corrective call fail.
        let model = MockModel::new();

        let outcome = run(
            &model,
            &["Write to INFO@acme.test or call +1 555-123-4567. Also info@acme.test."],
            &ContactHints::default(),
        )
        .await;

        assert!(outcome.used_fallback);
        assert_eq!(outcome.profile.company_name, "Acme");
        assert_eq!(outcome.profile.company_main_url, ROOT);
        assert_eq!(outcome.profile.emails.len(), 1);
        assert!(outcome.profile.emails.contains("info@acme.test"));
        assert!(!outcome.profile.contact_numbers.is_empty());
        assert_eq!(outcome.profile.summary, "");
    }

    #[tokio::test(start_paused = true)]
    async fn href_hints_enrich_the_model_profile() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": [],
                "contact_numbers": [],
                "social_media_links": [],
                "summary": "s"
            }"#,
        );
        let mut hints = ContactHints::default();
        hints.emails.push("hello@acme.test".to_string());
        hints.social_links.push("https://www.instagram.com/acme".to_string());

        let outcome = run(&model, &["text"], &hints).await;

        assert!(outcome.profile.emails.contains("hello@acme.test"));
        assert!(outcome
            .profile
            .social_media_links
            .contains("https://www.instagram.com/acme"));
        // Harvested values count as evidence, so they are not flagged.
        assert!(outcome.low_confidence_fields.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_text_skips_the_model_entirely() {
        let model = MockModel::new().with_reply("should never be consumed");
        let mut hints = ContactHints::default();
        hints.phones.push("+1 555 000 1111".to_string());

        let outcome = run(&model, &[], &hints).await;

        assert!(outcome.used_fallback);
        assert_eq!(model.call_count(), 0);
        assert!(outcome.profile.contact_numbers.contains("+1 555 000 1111"));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_emails_across_pages_collapse() {
        let model = MockModel::new().with_reply(
            r#"{
                "company_name": "Acme",
                "company_main_url": "https://acme.test/",
                "emails": ["info@acme.test", "INFO@ACME.TEST"],
                "contact_numbers": [],
                "social_media_links": [],
                "summary": "s"
            }"#,
        );

        let outcome = run(
            &model,
            &["Contact info@acme.test", "Contact INFO@ACME.TEST"],
            &ContactHints::default(),
        )
        .await;

        assert_eq!(outcome.profile.emails.len(), 1);
        assert!(outcome.profile.emails.contains("info@acme.test"));
    }
}
