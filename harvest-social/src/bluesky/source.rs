use crate::bluesky::client::{BlueskyApi, SearchParams};
use crate::bluesky::types::{PostView, ThreadNode, ThreadViewPost};
use anyhow::{Context, Result};
use async_trait::async_trait;
use harvest_pipeline::{Fetcher, Page, SearchWindow};

/// `searchPosts` as a paginated source: the response cursor is the continuation.
#[derive(Clone)]
pub struct BlueskySearch {
    api: BlueskyApi,
    params: SearchParams,
}

impl BlueskySearch {
    pub fn new(api: BlueskyApi, params: SearchParams) -> Self {
        Self { api, params }
    }

    pub fn api(&self) -> &BlueskyApi {
        &self.api
    }
}

#[async_trait]
impl Fetcher for BlueskySearch {
    type Record = PostView;

    async fn fetch(
        &self,
        query: &str,
        window: &SearchWindow,
        cursor: Option<&str>,
    ) -> Result<Page<PostView>> {
        let since = window.start_rfc3339().context("formatting window start")?;
        let until = window.end_rfc3339().context("formatting window end")?;
        let resp = self
            .api
            .search_posts(query, &self.params, &since, &until, cursor)
            .await?;
        Ok(Page::new(resp.posts, resp.cursor))
    }
}

/// Lookup of a single post with its thread context.
///
/// `Ok(None)` means the post is gone, blocked or otherwise not viewable.
#[async_trait]
pub trait PostDetail: Send + Sync {
    async fn post_thread(
        &self,
        uri: &str,
        depth: u32,
        parent_height: u32,
    ) -> Result<Option<ThreadViewPost>>;
}

#[async_trait]
impl PostDetail for BlueskyApi {
    async fn post_thread(
        &self,
        uri: &str,
        depth: u32,
        parent_height: u32,
    ) -> Result<Option<ThreadViewPost>> {
        let resp = self.get_post_thread(uri, depth, parent_height).await?;
        Ok(match resp.thread {
            ThreadNode::Post(node) => Some(*node),
            ThreadNode::NotFound { .. } | ThreadNode::Blocked { .. } | ThreadNode::Other => None,
        })
    }
}
