//! X (Twitter) API v2 search adapter.
//!
//! Requires an app bearer token. Recent search covers the last seven days; the
//! full-archive endpoint needs an account tier that grants it.
pub mod client;
pub mod flatten;
pub mod source;
pub mod types;

pub use client::TwitterApi;
pub use flatten::{TweetFlattener, tweet_schema};
pub use source::TwitterSearch;
