//! Response models for X API v2 search.
//!
//! A `null` or mistyped field falls back like a missing one; a tweet or user that is not
//! an object at all is dropped with a warning, never the whole page.
use crate::lenient::{members, optional, or_default};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "members")]
    pub data: Vec<Tweet>,
    #[serde(default, deserialize_with = "optional")]
    pub includes: Option<Includes>,
    #[serde(default, deserialize_with = "optional")]
    pub meta: Option<Meta>,
    /// Partial errors that come back alongside a 200.
    #[serde(default, deserialize_with = "optional")]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Meta {
    #[serde(default, deserialize_with = "optional")]
    pub result_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub newest_id: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub oldest_id: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiProblem {
    #[serde(default, deserialize_with = "optional")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Includes {
    #[serde(default, deserialize_with = "members")]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default, deserialize_with = "or_default")]
    pub id: String,
    #[serde(default, deserialize_with = "or_default")]
    pub username: String,
    #[serde(default, deserialize_with = "optional")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tweet {
    #[serde(default, deserialize_with = "or_default")]
    pub id: String,
    #[serde(default, deserialize_with = "or_default")]
    pub text: String,

    #[serde(default, deserialize_with = "optional")]
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub created_at: Option<String>,

    #[serde(default, deserialize_with = "optional")]
    pub public_metrics: Option<PublicMetrics>,
    #[serde(default, deserialize_with = "optional")]
    pub entities: Option<Entities>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublicMetrics {
    #[serde(default, deserialize_with = "optional")]
    pub like_count: Option<u64>,
    #[serde(default, alias = "repost_count", deserialize_with = "optional")]
    pub retweet_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub reply_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub quote_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Entities {
    #[serde(default, deserialize_with = "members")]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UrlEntity {
    #[serde(default, deserialize_with = "optional")]
    pub expanded_url: Option<String>,
}

/// A tweet joined with its author from `includes.users`.
#[derive(Debug, Clone)]
pub struct TweetRecord {
    pub tweet: Tweet,
    pub author: Option<User>,
}

impl SearchResponse {
    /// Pair every tweet with its expanded author, keeping response order.
    pub fn into_records(self) -> (Vec<TweetRecord>, Option<String>) {
        let users = self.includes.map(|i| i.users).unwrap_or_default();
        let records = self
            .data
            .into_iter()
            .map(|tweet| {
                let author = tweet
                    .author_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .and_then(|id| users.iter().find(|u| u.id == id))
                    .cloned();
                TweetRecord { tweet, author }
            })
            .collect();
        (records, self.meta.and_then(|m| m.next_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_authors_and_keeps_order() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "data": [
                { "id": "2", "text": "second", "author_id": "u1" },
                { "id": "1", "text": "first", "author_id": "ghost" }
            ],
            "includes": { "users": [ { "id": "u1", "username": "alice", "name": "Alice" } ] },
            "meta": { "result_count": 2, "next_token": "n1" }
        }))
        .unwrap();

        let (records, next) = resp.into_records();
        assert_eq!(next.as_deref(), Some("n1"));
        assert_eq!(records[0].tweet.id, "2");
        assert_eq!(records[0].author.as_ref().unwrap().username, "alice");
        assert!(records[1].author.is_none());
    }

    #[test]
    fn malformed_tweets_and_users_do_not_sink_the_page() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "data": [
                { "id": "1", "text": "good", "author_id": "u1" },
                { "id": "2", "text": null, "author_id": "u2", "public_metrics": { "like_count": "lots" } },
                { "id": 3, "text": ["not", "text"], "created_at": 17 },
                "garbage"
            ],
            "includes": { "users": [
                { "id": "u1", "username": "alice" },
                { "id": "u2", "username": null, "name": "Bob" },
                { "id": "" }
            ] },
            "meta": { "result_count": 4, "next_token": null }
        }))
        .unwrap();

        let (records, next) = resp.into_records();
        assert!(next.is_none());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].author.as_ref().unwrap().username, "alice");
        assert_eq!(records[1].tweet.text, "");
        assert_eq!(records[1].author.as_ref().unwrap().name.as_deref(), Some("Bob"));
        assert!(records[1].tweet.public_metrics.as_ref().unwrap().like_count.is_none());
        assert_eq!(records[2].tweet.id, "");
        assert!(records[2].tweet.created_at.is_none());
        assert!(records[2].author.is_none());
    }

    #[test]
    fn zero_result_page_has_no_data() {
        let resp: SearchResponse =
            serde_json::from_value(json!({ "meta": { "result_count": 0 } })).unwrap();
        let (records, next) = resp.into_records();
        assert!(records.is_empty());
        assert!(next.is_none());
    }
}
