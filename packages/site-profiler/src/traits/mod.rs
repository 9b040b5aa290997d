//! Capability traits at the pipeline's external seams.

pub mod ai;
pub mod fetcher;

pub use ai::LanguageModel;
pub use fetcher::{FetchedPage, Fetcher};
