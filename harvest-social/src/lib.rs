//! Social network adapters for the harvest pipeline.
//!
//! Each submodule bundles an API client over `harvest-http`, typed response models, a
//! [`harvest_pipeline::Fetcher`] that turns one search call into a page of records, and
//! the [`harvest_pipeline::Flattener`]s that map those records onto CSV columns.
//!
//! - [`bluesky`]: public `app.bsky.feed.searchPosts`, plus `getPostThread` as the detail
//!   lookup for parent/quote/reply enrichment
//! - [`twitter`]: X API v2 recent (or full-archive) search
pub mod bluesky;
mod lenient;
pub mod twitter;
