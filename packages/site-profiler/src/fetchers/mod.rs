//! Fetcher implementations and shared HTML parsing.
//!
//! - `HttpFetcher` - plain reqwest transport with timeout and byte cap
//! - `html` - best-effort link, anchor-text, and title extraction used on
//!   every fetched body regardless of transport

pub mod html;
pub mod http;

pub use http::HttpFetcher;
