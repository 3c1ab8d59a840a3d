//! Bluesky public AppView adapter.
//!
//! Search goes through `app.bsky.feed.searchPosts` (no auth needed on the public host).
//! The thread variant additionally resolves parents, quotes and replies through
//! `app.bsky.feed.getPostThread`.
pub mod client;
pub mod flatten;
pub mod source;
pub mod types;

pub use client::{BlueskyApi, SearchParams};
pub use flatten::{PostFlattener, ThreadFlattener, post_schema, thread_schema};
pub use source::{BlueskySearch, PostDetail};
