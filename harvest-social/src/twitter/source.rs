use crate::twitter::client::TwitterApi;
use crate::twitter::types::TweetRecord;
use anyhow::Result;
use async_trait::async_trait;
use harvest_pipeline::{Fetcher, Page, SearchWindow};
use time::OffsetDateTime;

/// X search as a paginated source: `meta.next_token` is the continuation.
#[derive(Clone)]
pub struct TwitterSearch {
    api: TwitterApi,
    max_results: u32,
}

impl TwitterSearch {
    pub fn new(api: TwitterApi, max_results: u32) -> Self {
        Self { api, max_results }
    }
}

#[async_trait]
impl Fetcher for TwitterSearch {
    type Record = TweetRecord;

    async fn fetch(
        &self,
        query: &str,
        window: &SearchWindow,
        cursor: Option<&str>,
    ) -> Result<Page<TweetRecord>> {
        let Some((start, end)) =
            self.api
                .searchable(window.start(), window.end(), OffsetDateTime::now_utc())
        else {
            tracing::info!(
                target: "twitter",
                %window,
                archive = self.api.is_archive(),
                "twitter.window.out_of_reach"
            );
            return Ok(Page::empty());
        };

        let resp = self
            .api
            .search(query, start, end, self.max_results, cursor)
            .await?;
        let (records, next) = resp.into_records();
        Ok(Page::new(records, next))
    }
}
