//! Data types shared across the pipeline.

pub mod page;
pub mod profile;
pub mod seed;

pub use page::{DiscoveredLink, ExtractedText, FetchOutcome, PageRecord, RankedPage};
pub use profile::{BusinessProfile, ProfileReport, RunMetadata};
pub use seed::{PipelineConfig, SeedTarget};
