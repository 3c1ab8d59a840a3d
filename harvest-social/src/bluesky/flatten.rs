//! Bluesky post and thread rows.
use crate::bluesky::source::PostDetail;
use crate::bluesky::types::{
    EmbedView, EmbeddedRecord, External, PostView, RecordEmbed, ThreadViewPost, ViewRecord,
};
use async_trait::async_trait;
use harvest_pipeline::row::reply_column;
use harvest_pipeline::{FlatRow, Flattener, Pacer, Schema};
use std::time::Duration;
use tokio::sync::Mutex;

const POST_COLLECTION: &str = "/app.bsky.feed.post/";

/// `DID, Handle, Display Name, CreatedAt, Text, Article Title, Article Link, ReplyCount,
/// RepostCount, LikeCount, QuoteCount, IndexedAt`
pub fn post_schema() -> Schema {
    Schema::new()
        .text("DID")
        .text("Handle")
        .text("Display Name")
        .text("CreatedAt")
        .text("Text")
        .text("Article Title")
        .text("Article Link")
        .count("ReplyCount")
        .count("RepostCount")
        .count("LikeCount")
        .count("QuoteCount")
        .text("IndexedAt")
}

/// Post columns, then the post URI, the parent and the quoted post, then `slots` reply slots.
pub fn thread_schema(slots: usize) -> Schema {
    post_schema()
        .text("URI")
        .text("Parent URI")
        .text("Parent Handle")
        .text("Parent Text")
        .text("Parent CreatedAt")
        .text("Quoted URI")
        .text("Quoted Handle")
        .text("Quoted Text")
        .text("Quoted CreatedAt")
        .reply_slots(slots)
}

/// Link card of a post: the hydrated view wins, the raw record embed is the fallback.
fn article(post: &PostView) -> Option<&External> {
    let from_view = match &post.embed {
        Some(EmbedView::External { external }) => Some(external),
        Some(EmbedView::RecordWithMedia { media, .. }) => match media.as_ref() {
            EmbedView::External { external } => Some(external),
            _ => None,
        },
        _ => None,
    };
    from_view.or_else(|| match &post.record.embed {
        Some(RecordEmbed::External { external }) => Some(external),
        Some(RecordEmbed::RecordWithMedia { media, .. }) => match media.as_ref() {
            RecordEmbed::External { external } => Some(external),
            _ => None,
        },
        _ => None,
    })
}

/// Fill the twelve post columns of `row` from `post`.
pub fn fill_post_columns(row: &mut FlatRow, post: &PostView) {
    let article = article(post);
    row.set("DID", post.author.did.as_str())
        .set("Handle", post.author.handle.as_str())
        .set("Display Name", post.author.display_name.clone())
        .set("CreatedAt", post.record.created_at.clone())
        .set("Text", post.record.text.clone())
        .set("Article Title", article.and_then(|a| a.title.clone()))
        .set("Article Link", article.and_then(|a| a.uri.clone()))
        .set("ReplyCount", post.reply_count.unwrap_or(0))
        .set("RepostCount", post.repost_count.unwrap_or(0))
        .set("LikeCount", post.like_count.unwrap_or(0))
        .set("QuoteCount", post.quote_count.unwrap_or(0))
        .set("IndexedAt", post.indexed_at.clone());
}

/// Plain search rows, one per post.
pub struct PostFlattener {
    schema: Schema,
}

impl PostFlattener {
    pub fn new() -> Self {
        Self {
            schema: post_schema(),
        }
    }
}

impl Default for PostFlattener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Flattener<PostView> for PostFlattener {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn flatten(&self, post: &PostView) -> FlatRow {
        let mut row = self.schema.empty_row();
        fill_post_columns(&mut row, post);
        row
    }
}

/// Where the quoted post of a search result stands.
enum Quote<'a> {
    None,
    Resolved(&'a ViewRecord),
    /// Not hydrated by the search view; a thread lookup may still find it.
    Unresolved(&'a str),
    /// Blocked or detached by its author; a lookup would be refused the same way.
    Unavailable(&'a str),
}

fn quote(post: &PostView) -> Quote<'_> {
    let embedded = match &post.embed {
        Some(EmbedView::Record { record }) => Some(record),
        Some(EmbedView::RecordWithMedia { record, .. }) => Some(&record.record),
        _ => None,
    };
    match embedded {
        Some(EmbeddedRecord::ViewRecord(view)) => return Quote::Resolved(view.as_ref()),
        Some(EmbeddedRecord::NotFound { uri }) if !uri.is_empty() => {
            return Quote::Unresolved(uri.as_str());
        }
        Some(EmbeddedRecord::Blocked { uri } | EmbeddedRecord::Detached { uri })
            if !uri.is_empty() =>
        {
            return Quote::Unavailable(uri.as_str());
        }
        _ => {}
    }
    match &post.record.embed {
        Some(RecordEmbed::Record { record }) if !record.uri.is_empty() => {
            Quote::Unresolved(&record.uri)
        }
        Some(RecordEmbed::RecordWithMedia { record, .. }) if !record.record.uri.is_empty() => {
            Quote::Unresolved(&record.record.uri)
        }
        _ => Quote::None,
    }
}

/// Post rows enriched with the parent, the quoted post and up to `slots` direct replies.
///
/// A post that is neither a reply nor replied to costs no extra request. Otherwise one
/// `getPostThread` lookup resolves parent and replies; a quote the search view did not
/// hydrate costs one more. Lookups share a pacer and degrade to empty columns on failure.
pub struct ThreadFlattener<D> {
    detail: D,
    schema: Schema,
    slots: usize,
    pacer: Mutex<Pacer>,
}

impl<D: PostDetail> ThreadFlattener<D> {
    pub fn new(detail: D, slots: usize, detail_delay: Duration) -> Self {
        Self {
            detail,
            schema: thread_schema(slots),
            slots,
            pacer: Mutex::new(Pacer::new(detail_delay)),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    async fn lookup(&self, uri: &str, depth: u32, parent_height: u32) -> Option<ThreadViewPost> {
        self.pacer.lock().await.ready().await;
        match self.detail.post_thread(uri, depth, parent_height).await {
            Ok(Some(node)) => Some(node),
            Ok(None) => {
                tracing::debug!(target: "bluesky", %uri, "bluesky.detail.unavailable");
                None
            }
            Err(e) => {
                tracing::warn!(
                    target: "bluesky",
                    %uri,
                    error = %format!("{e:#}"),
                    "bluesky.detail.failed"
                );
                None
            }
        }
    }

    fn fill_thread(&self, row: &mut FlatRow, thread: &ThreadViewPost) {
        if let Some(parent) = thread.parent.as_ref().and_then(|p| p.as_post()) {
            row.set("Parent URI", parent.uri.as_str())
                .set("Parent Handle", parent.author.handle.as_str())
                .set("Parent Text", parent.record.text.clone())
                .set("Parent CreatedAt", parent.record.created_at.clone());
        }

        let replies = thread.replies.iter().filter_map(|node| node.as_post());
        for (idx, reply) in replies.take(self.slots).enumerate() {
            let slot = idx + 1;
            row.set(reply_column(slot, "Handle"), reply.author.handle.as_str())
                .set(
                    reply_column(slot, "Display Name"),
                    reply.author.display_name.clone(),
                )
                .set(
                    reply_column(slot, "CreatedAt"),
                    reply.record.created_at.clone(),
                )
                .set(reply_column(slot, "Text"), reply.record.text.clone())
                .set(
                    reply_column(slot, "LikeCount"),
                    reply.like_count.unwrap_or(0),
                );
        }
    }
}

#[async_trait]
impl<D: PostDetail> Flattener<PostView> for ThreadFlattener<D> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn flatten(&self, post: &PostView) -> FlatRow {
        let mut row = self.schema.empty_row();
        fill_post_columns(&mut row, post);
        row.set("URI", post.uri.as_str());

        if let Some(reply) = &post.record.reply {
            row.set("Parent URI", reply.parent.uri.as_str());
        }

        let has_thread = post.record.reply.is_some() || post.reply_count.unwrap_or(0) > 0;
        if has_thread && !post.uri.is_empty() {
            let depth = u32::from(self.slots > 0);
            if let Some(thread) = self.lookup(&post.uri, depth, 1).await {
                self.fill_thread(&mut row, &thread);
            }
        }

        match quote(post) {
            Quote::Resolved(view) => {
                row.set("Quoted URI", view.uri.as_str())
                    .set("Quoted Handle", view.author.handle.as_str())
                    .set("Quoted Text", view.value.text.clone())
                    .set("Quoted CreatedAt", view.value.created_at.clone());
            }
            Quote::Unresolved(uri) => {
                row.set("Quoted URI", uri);
                if uri.contains(POST_COLLECTION) {
                    if let Some(quoted) = self.lookup(uri, 0, 0).await {
                        row.set("Quoted Handle", quoted.post.author.handle.as_str())
                            .set("Quoted Text", quoted.post.record.text.clone())
                            .set("Quoted CreatedAt", quoted.post.record.created_at.clone());
                    }
                }
            }
            Quote::Unavailable(uri) => {
                row.set("Quoted URI", uri);
            }
            Quote::None => {}
        }

        row
    }
}
