//! The terminal artifacts of a run: the business profile and its metadata.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured business record synthesized from the selected pages.
///
/// Always schema-complete: absent values are empty strings or empty sets,
/// never missing fields. Sets keep the serialized arrays sorted and
/// deduplicated; emails are lower-cased before insertion so deduplication
/// is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub company_name: String,

    pub company_main_url: String,

    pub emails: BTreeSet<String>,

    pub contact_numbers: BTreeSet<String>,

    pub social_media_links: BTreeSet<String>,

    pub summary: String,
}

impl BusinessProfile {
    /// An empty profile anchored to the site being profiled.
    pub fn empty(company_name: impl Into<String>, main_url: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            company_main_url: main_url.into(),
            ..Default::default()
        }
    }

    /// Insert an email, lower-cased.
    pub fn add_email(&mut self, email: &str) {
        let email = email.trim().to_ascii_lowercase();
        if !email.is_empty() {
            self.emails.insert(email);
        }
    }

    /// Insert a phone number, trimmed.
    pub fn add_phone(&mut self, phone: &str) {
        let phone = phone.trim().to_string();
        if !phone.is_empty() {
            self.contact_numbers.insert(phone);
        }
    }

    /// Insert a social-media link, trimmed.
    pub fn add_social_link(&mut self, link: &str) {
        let link = link.trim().to_string();
        if !link.is_empty() {
            self.social_media_links.insert(link);
        }
    }
}

/// Counters and provenance for one run. Never mutated after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub total_pages_discovered: usize,

    pub pages_fetched: usize,

    pub pages_selected: usize,

    pub pages_with_errors: usize,

    /// `"<field>:<value>"` entries for model-claimed contact details the
    /// regex pass could not corroborate.
    pub low_confidence_fields: Vec<String>,

    pub model_used: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

/// The full output handed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub business_data: BusinessProfile,

    pub extraction_metadata: RunMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_dedup_is_case_insensitive() {
        let mut profile = BusinessProfile::default();
        profile.add_email("Info@Example.com");
        profile.add_email("info@example.com");
        profile.add_email("  INFO@EXAMPLE.COM ");
        assert_eq!(profile.emails.len(), 1);
        assert!(profile.emails.contains("info@example.com"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut profile = BusinessProfile::default();
        profile.add_email("   ");
        profile.add_phone("");
        profile.add_social_link(" ");
        assert!(profile.emails.is_empty());
        assert!(profile.contact_numbers.is_empty());
        assert!(profile.social_media_links.is_empty());
    }

    #[test]
    fn report_serializes_with_contract_field_names() {
        let report = ProfileReport {
            business_data: BusinessProfile::empty("Acme", "https://acme.test"),
            extraction_metadata: RunMetadata {
                total_pages_discovered: 5,
                pages_fetched: 4,
                pages_selected: 3,
                pages_with_errors: 1,
                low_confidence_fields: vec![],
                model_used: "gpt-4o-mini".to_string(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["business_data"]["company_name"].is_string());
        assert!(json["business_data"]["contact_numbers"].is_array());
        assert!(json["business_data"]["social_media_links"].is_array());
        assert!(json["extraction_metadata"]["total_pages_discovered"].is_number());
        assert!(json["extraction_metadata"]["model_used"].is_string());
    }
}
