//! LLM prompts for page ranking and profile synthesis.
//!
//! Every prompt declares an explicit output contract; the callers validate
//! responses against it and never trust model output directly.

use crate::types::ExtractedText;

/// System prompt for the page-relevance ranking call.
pub const RANK_SYSTEM_PROMPT: &str = r#"You select which pages of a business website are worth reading to build a business profile.

Prefer pages likely to state business identity: about, contact, services, team, the landing page.

Output a JSON array, nothing else:
[
    {"url": "https://...", "reason": "one line why this page matters"}
]

Rules:
- Choose ONLY from the candidate URLs given. Never invent or modify a URL.
- Return at most the requested number of entries, most relevant first."#;

/// System prompt for the profile-synthesis call.
pub const SYNTHESIZE_SYSTEM_PROMPT: &str = r#"You consolidate text from a business's web pages into one structured record.

Output a single JSON object, nothing else, exactly this shape:
{
    "company_name": "official business name",
    "company_main_url": "main website URL",
    "emails": ["contact email addresses"],
    "contact_numbers": ["phone numbers"],
    "social_media_links": ["social media profile URLs"],
    "summary": "2-4 sentence description of what the business does"
}

Rules:
- Only state what the pages support. Use "" or [] when the pages are silent.
- Every field must be present."#;

/// Build the user message for the ranking call.
///
/// `manifest` lines carry path, anchor text, and depth per candidate; the
/// root page is always among them.
pub fn format_rank_prompt(manifest: &str, k: usize) -> String {
    format!(
        "Select the {k} pages most likely to contain business-identity information.\n\n\
         Candidate pages:\n{manifest}"
    )
}

/// One manifest line per candidate page.
pub fn format_rank_manifest_line(
    url: &str,
    path: &str,
    anchor: &str,
    title: &str,
    depth: usize,
) -> String {
    let anchor = if anchor.is_empty() { "-" } else { anchor };
    let title = if title.is_empty() { "-" } else { title };
    format!("{url} | path: {path} | anchor: \"{anchor}\" | title: \"{title}\" | depth: {depth}")
}

/// Build the user message for the synthesis call.
pub fn format_synthesize_prompt(
    texts: &[ExtractedText],
    company_hint: &str,
    total_char_cap: usize,
) -> String {
    let mut corpus = String::new();
    for text in texts {
        if corpus.len() >= total_char_cap {
            break;
        }
        let remaining = total_char_cap - corpus.len();
        let chunk: String = text.text.chars().take(remaining).collect();
        corpus.push_str(&format!("== {} ==\n{}\n\n", text.url, chunk));
    }

    format!(
        "Business name hint: {company_hint}\n\n\
         Page texts, most relevant first:\n\n{corpus}"
    )
}

/// Follow-up user message after a response that failed to parse.
pub fn format_corrective_prompt(original_user: &str, parse_error: &str) -> String {
    format!(
        "Your previous response could not be parsed: {parse_error}\n\n\
         Respond again with ONLY the JSON described in the instructions, \
         no prose and no code fences.\n\n{original_user}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_line_shape() {
        let line = format_rank_manifest_line(
            "https://acme.test/about",
            "/about",
            "About Us",
            "About | Acme",
            1,
        );
        assert_eq!(
            line,
            "https://acme.test/about | path: /about | anchor: \"About Us\" | title: \"About | Acme\" | depth: 1"
        );
        let blank = format_rank_manifest_line("https://acme.test/", "/", "", "", 0);
        assert!(blank.contains("anchor: \"-\""));
        assert!(blank.contains("title: \"-\""));
    }

    #[test]
    fn synthesize_prompt_respects_total_cap() {
        let texts = vec![
            ExtractedText::new("https://acme.test/a", "x".repeat(100)),
            ExtractedText::new("https://acme.test/b", "y".repeat(100)),
        ];
        let prompt = format_synthesize_prompt(&texts, "Acme", 150);
        assert!(prompt.contains("https://acme.test/a"));
        assert!(prompt.contains("https://acme.test/b"));
        // The second page is cut down to the remaining budget.
        let y_count = prompt.matches('y').count();
        assert!(y_count > 0 && y_count < 100, "expected second page truncated, got {y_count} chars");
    }

    #[test]
    fn corrective_prompt_carries_error() {
        let prompt = format_corrective_prompt("original", "expected value at line 1");
        assert!(prompt.contains("expected value at line 1"));
        assert!(prompt.contains("original"));
    }
}
