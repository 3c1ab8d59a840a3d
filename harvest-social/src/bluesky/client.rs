//! Thin wrapper over the public Bluesky AppView XRPC endpoints.
use crate::bluesky::types::{GetPostThreadResponse, SearchPostsResponse};
use anyhow::{Context, Result};
use harvest_http::{HttpClient, RequestOpts};
use std::borrow::Cow;

const SEARCH_POSTS: &str = "xrpc/app.bsky.feed.searchPosts";
const GET_POST_THREAD: &str = "xrpc/app.bsky.feed.getPostThread";

/// Fixed search parameters of one job.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub sort: String,
    pub lang: Option<String>,
    pub limit: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            sort: "latest".into(),
            lang: Some("en".into()),
            limit: 100,
        }
    }
}

#[derive(Clone)]
pub struct BlueskyApi {
    http: HttpClient,
}

impl BlueskyApi {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .with_context(|| format!("invalid bluesky endpoint `{endpoint}`"))?;
        Ok(Self { http })
    }

    pub fn endpoint(&self) -> &str {
        self.http.base().as_str()
    }

    /// One `searchPosts` call. `since`/`until` are RFC 3339 timestamps.
    pub async fn search_posts(
        &self,
        query: &str,
        params: &SearchParams,
        since: &str,
        until: &str,
        cursor: Option<&str>,
    ) -> Result<SearchPostsResponse> {
        let mut pairs: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", query.into()),
            ("sort", params.sort.as_str().into()),
            ("since", since.into()),
            ("until", until.into()),
            ("limit", params.limit.clamp(1, 100).to_string().into()),
        ];
        if let Some(lang) = params.lang.as_deref().filter(|l| !l.is_empty()) {
            pairs.push(("lang", lang.into()));
        }
        if let Some(cursor) = cursor {
            pairs.push(("cursor", cursor.into()));
        }

        let resp: SearchPostsResponse = self
            .http
            .get_json(
                SEARCH_POSTS,
                RequestOpts {
                    query: Some(pairs),
                    ..Default::default()
                },
            )
            .await
            .context("bluesky searchPosts")?;

        tracing::debug!(
            target: "bluesky",
            posts = resp.posts.len(),
            hits_total = ?resp.hits_total,
            has_cursor = resp.cursor.is_some(),
            "bluesky.search.page"
        );
        Ok(resp)
    }

    /// `getPostThread` for `uri`, with `depth` levels of replies and `parent_height` ancestors.
    pub async fn get_post_thread(
        &self,
        uri: &str,
        depth: u32,
        parent_height: u32,
    ) -> Result<GetPostThreadResponse> {
        let pairs: Vec<(&str, Cow<'_, str>)> = vec![
            ("uri", uri.into()),
            ("depth", depth.to_string().into()),
            ("parentHeight", parent_height.to_string().into()),
        ];
        self.http
            .get_json(
                GET_POST_THREAD,
                RequestOpts {
                    query: Some(pairs),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("bluesky getPostThread {uri}"))
    }
}
