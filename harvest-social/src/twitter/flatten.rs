use crate::twitter::types::TweetRecord;
use async_trait::async_trait;
use harvest_pipeline::{FlatRow, Flattener, Schema};

pub const LINK_SEPARATOR: &str = "; ";

/// `User ID, Handle, Display Name, CreatedAt, Text, Article Links, ReplyCount,
/// RepostCount, LikeCount, QuoteCount, IndexedAt`
pub fn tweet_schema() -> Schema {
    Schema::new()
        .text("User ID")
        .text("Handle")
        .text("Display Name")
        .text("CreatedAt")
        .text("Text")
        .text("Article Links")
        .count("ReplyCount")
        .count("RepostCount")
        .count("LikeCount")
        .count("QuoteCount")
        .text("IndexedAt")
}

/// Every expanded link of the tweet, in entity order.
pub fn article_links(record: &TweetRecord) -> String {
    record
        .tweet
        .entities
        .as_ref()
        .map(|e| {
            e.urls
                .iter()
                .filter_map(|u| u.expanded_url.as_deref())
                .filter(|u| !u.is_empty())
                .collect::<Vec<_>>()
                .join(LINK_SEPARATOR)
        })
        .unwrap_or_default()
}

pub struct TweetFlattener {
    schema: Schema,
}

impl TweetFlattener {
    pub fn new() -> Self {
        Self {
            schema: tweet_schema(),
        }
    }
}

impl Default for TweetFlattener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Flattener<TweetRecord> for TweetFlattener {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn flatten(&self, record: &TweetRecord) -> FlatRow {
        let tweet = &record.tweet;
        let metrics = tweet.public_metrics.clone().unwrap_or_default();
        let author = record.author.as_ref();

        let mut row = self.schema.empty_row();
        // The API has no separate index time; IndexedAt repeats created_at.
        row.set(
            "User ID",
            author.map(|a| a.id.clone()).or(tweet.author_id.clone()),
        )
        .set("Handle", author.map(|a| a.username.as_str()))
        .set("Display Name", author.and_then(|a| a.name.clone()))
        .set("CreatedAt", tweet.created_at.clone())
        .set("Text", tweet.text.as_str())
        .set("Article Links", article_links(record))
        .set("ReplyCount", metrics.reply_count.unwrap_or(0))
        .set("RepostCount", metrics.retweet_count.unwrap_or(0))
        .set("LikeCount", metrics.like_count.unwrap_or(0))
        .set("QuoteCount", metrics.quote_count.unwrap_or(0))
        .set("IndexedAt", tweet.created_at.clone());
        row
    }
}
