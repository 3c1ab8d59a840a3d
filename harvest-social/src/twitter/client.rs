//! Wrapper around the X API v2 search endpoints.
//!
//! Shapes request parameters and auth before delegating to the shared HTTP client.
//! Pagination is driven by the caller through `next_token`.
use crate::twitter::types::SearchResponse;
use anyhow::{Context, Result};
use harvest_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const RECENT: &str = "2/tweets/search/recent";
const ARCHIVE: &str = "2/tweets/search/all";
const TWEET_FIELDS: &str = "created_at,public_metrics,entities";
const USER_FIELDS: &str = "id,username,name";
const EXPANSIONS: &str = "author_id";

/// `end_time` must trail the current time by at least 10 s; keep some slack.
const END_SLACK: Duration = Duration::seconds(20);
/// Recent search only reaches back seven days.
const RECENT_REACH: Duration = Duration::days(7);

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    bearer: String,
    archive: bool,
}

impl TwitterApi {
    pub fn new(endpoint: &str, bearer_token: String, archive: bool) -> Result<Self> {
        let http = HttpClient::new(endpoint)
            .with_context(|| format!("invalid twitter endpoint `{endpoint}`"))?;
        Ok(Self {
            http,
            bearer: bearer_token,
            archive,
        })
    }

    pub fn is_archive(&self) -> bool {
        self.archive
    }

    /// Clip `[start, end)` to what the selected endpoint accepts at `now`.
    ///
    /// Returns `None` when nothing of the interval is searchable.
    pub fn searchable(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Option<(OffsetDateTime, OffsetDateTime)> {
        let end = end.min(now - END_SLACK);
        let start = if self.archive {
            start
        } else {
            start.max(now - RECENT_REACH + Duration::minutes(1))
        };
        (start < end).then_some((start, end))
    }

    pub async fn search(
        &self,
        query: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<SearchResponse> {
        let max_results = max_results.clamp(10, 100);

        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("query", query.into()),
            ("max_results", max_results.to_string().into()),
            ("tweet.fields", TWEET_FIELDS.into()),
            ("user.fields", USER_FIELDS.into()),
            ("expansions", EXPANSIONS.into()),
            ("start_time", start.format(&Rfc3339)?.into()),
            ("end_time", end.format(&Rfc3339)?.into()),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token.into()));
        }

        let path = if self.archive { ARCHIVE } else { RECENT };
        let resp: SearchResponse = self
            .http
            .get_json(
                path,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.bearer)),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .context("twitter search")?;

        if let Some(problems) = resp.errors.as_ref().filter(|p| !p.is_empty()) {
            tracing::warn!(
                target: "twitter",
                count = problems.len(),
                first = ?problems[0].detail.as_deref().or(problems[0].title.as_deref()),
                "twitter.search.partial_errors"
            );
        }
        tracing::debug!(
            target: "twitter",
            result_count = ?resp.meta.as_ref().and_then(|m| m.result_count),
            has_next = resp.meta.as_ref().is_some_and(|m| m.next_token.is_some()),
            "twitter.search.page"
        );
        Ok(resp)
    }
}
