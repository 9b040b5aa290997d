//! Bounded site crawling and LLM-driven business profile synthesis.
//!
//! Given a business website (already resolved from its map listing), this
//! library crawls a bounded subset of the site, asks a language model which
//! pages are worth reading, extracts their visible text, and synthesizes a
//! validated [`BusinessProfile`] with run metadata attached.
//!
//! # Design
//!
//! - The two external effects - page fetches and model calls - sit behind
//!   the [`Fetcher`] and [`LanguageModel`] capability traits, each with its
//!   own timeout and failure policy.
//! - The crawl makes deterministic, bounded progress: breadth-first within
//!   one domain, capped by depth, page count, and a wall-clock budget, with
//!   same-depth fetches run concurrently and re-merged in discovery order.
//! - Model output is never trusted: ranking and synthesis validate every
//!   response against an explicit contract, retry correctively once, and
//!   fall back to deterministic heuristics. A run that got past the root
//!   page always produces a schema-valid profile.
//!
//! # Usage
//!
//! ```rust,ignore
//! use site_profiler::{run_profile, HttpFetcher, OpenAiModel, PipelineConfig, SeedTarget};
//! use tokio_util::sync::CancellationToken;
//!
//! let seed = SeedTarget::new("https://www.example.com/")?.with_company_hint("Example Co");
//! let config = PipelineConfig::default();
//! let fetcher = HttpFetcher::new(config.fetch_timeout, seed.page_byte_cap);
//! let model = OpenAiModel::from_env()?;
//!
//! let report = run_profile(&seed, &config, &fetcher, &model, &CancellationToken::new()).await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - capability traits ([`Fetcher`], [`LanguageModel`])
//! - [`types`] - seed, page, and profile types
//! - [`normalize`] - URL canonicalization
//! - [`crawler`] - bounded breadth-first crawl
//! - [`pipeline`] - ranking, extraction, synthesis, orchestration
//! - [`fetchers`] - HTTP fetcher and shared HTML parsing
//! - [`ai`] - OpenAI-compatible model client
//! - [`testing`] - mocks for pipeline tests

pub mod ai;
pub mod crawler;
pub mod error;
pub mod fetchers;
pub mod normalize;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use ai::OpenAiModel;
pub use crawler::{crawl, ContactHints, CrawlOutcome};
pub use error::{FetchError, ModelError, ProfileError, Result};
pub use fetchers::HttpFetcher;
pub use normalize::normalize;
pub use pipeline::run_profile;
pub use traits::{FetchedPage, Fetcher, LanguageModel};
pub use types::{
    BusinessProfile, DiscoveredLink, ExtractedText, PageRecord, PipelineConfig, ProfileReport,
    RankedPage, RunMetadata, SeedTarget,
};
