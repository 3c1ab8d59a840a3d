//! Response models for the Bluesky AppView (`app.bsky.feed.*`).
//!
//! Everything the flatteners read is optional or defaulted, and a `null` or mistyped
//! field falls back the same way a missing one does. Union-typed members (embeds, thread
//! nodes) decode to `Other` on an unknown `$type`; a list member that is not a record at
//! all is dropped with a warning instead of failing the whole page.
use crate::lenient::{members, optional, or_default};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchPostsResponse {
    #[serde(default, deserialize_with = "members")]
    pub posts: Vec<PostView>,
    #[serde(default, deserialize_with = "optional")]
    pub cursor: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub hits_total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(default, deserialize_with = "or_default")]
    pub uri: String,
    #[serde(default, deserialize_with = "optional")]
    pub cid: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub author: ProfileViewBasic,
    #[serde(default, deserialize_with = "or_default")]
    pub record: PostRecord,
    #[serde(default, deserialize_with = "optional")]
    pub embed: Option<EmbedView>,
    #[serde(default, deserialize_with = "optional")]
    pub reply_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub repost_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub like_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub quote_count: Option<u64>,
    #[serde(default, deserialize_with = "optional")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    #[serde(default, deserialize_with = "or_default")]
    pub did: String,
    #[serde(default, deserialize_with = "or_default")]
    pub handle: String,
    #[serde(default, deserialize_with = "optional")]
    pub display_name: Option<String>,
}

/// The `app.bsky.feed.post` record as written by the author.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default, deserialize_with = "optional")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub reply: Option<ReplyRef>,
    #[serde(default, deserialize_with = "optional")]
    pub embed: Option<RecordEmbed>,
    #[serde(default, deserialize_with = "optional")]
    pub langs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplyRef {
    #[serde(default, deserialize_with = "or_default")]
    pub root: StrongRef,
    #[serde(default, deserialize_with = "or_default")]
    pub parent: StrongRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StrongRef {
    #[serde(default, deserialize_with = "or_default")]
    pub uri: String,
    #[serde(default, deserialize_with = "optional")]
    pub cid: Option<String>,
}

/// Link card, identical in the record (`app.bsky.embed.external`) and the view.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct External {
    #[serde(default, deserialize_with = "optional")]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    pub description: Option<String>,
}

/// Hydrated embed attached to a post view.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "$type")]
pub enum EmbedView {
    #[serde(rename = "app.bsky.embed.external#view")]
    External {
        #[serde(default, deserialize_with = "or_default")]
        external: External,
    },
    #[serde(rename = "app.bsky.embed.record#view")]
    Record {
        #[serde(default, deserialize_with = "or_default")]
        record: EmbeddedRecord,
    },
    #[serde(rename = "app.bsky.embed.recordWithMedia#view")]
    RecordWithMedia {
        #[serde(default, deserialize_with = "or_default")]
        record: RecordViewWrapper,
        #[serde(default, deserialize_with = "or_default")]
        media: Box<EmbedView>,
    },
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordViewWrapper {
    #[serde(default, deserialize_with = "or_default")]
    pub record: EmbeddedRecord,
}

/// Quoted record as hydrated by the AppView.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "$type")]
pub enum EmbeddedRecord {
    #[serde(rename = "app.bsky.embed.record#viewRecord")]
    ViewRecord(Box<ViewRecord>),
    #[serde(rename = "app.bsky.embed.record#viewNotFound")]
    NotFound {
        #[serde(default, deserialize_with = "or_default")]
        uri: String,
    },
    #[serde(rename = "app.bsky.embed.record#viewBlocked")]
    Blocked {
        #[serde(default, deserialize_with = "or_default")]
        uri: String,
    },
    #[serde(rename = "app.bsky.embed.record#viewDetached")]
    Detached {
        #[serde(default, deserialize_with = "or_default")]
        uri: String,
    },
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    #[serde(default, deserialize_with = "or_default")]
    pub uri: String,
    #[serde(default, deserialize_with = "or_default")]
    pub author: ProfileViewBasic,
    /// The quoted record body; not necessarily a post (lists and feeds can be quoted too).
    #[serde(default, deserialize_with = "or_default")]
    pub value: PostRecord,
    #[serde(default, deserialize_with = "optional")]
    pub indexed_at: Option<String>,
}

/// Embed as stored in the record, before hydration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "$type")]
pub enum RecordEmbed {
    #[serde(rename = "app.bsky.embed.external")]
    External {
        #[serde(default, deserialize_with = "or_default")]
        external: External,
    },
    #[serde(rename = "app.bsky.embed.record")]
    Record {
        #[serde(default, deserialize_with = "or_default")]
        record: StrongRef,
    },
    #[serde(rename = "app.bsky.embed.recordWithMedia")]
    RecordWithMedia {
        #[serde(default, deserialize_with = "or_default")]
        record: RecordRefWrapper,
        #[serde(default, deserialize_with = "or_default")]
        media: Box<RecordEmbed>,
    },
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordRefWrapper {
    #[serde(default, deserialize_with = "or_default")]
    pub record: StrongRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPostThreadResponse {
    pub thread: ThreadNode,
}

/// One node of `app.bsky.feed.getPostThread`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(Box<ThreadViewPost>),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound {
        #[serde(default, deserialize_with = "or_default")]
        uri: String,
    },
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked {
        #[serde(default, deserialize_with = "or_default")]
        uri: String,
    },
    #[default]
    #[serde(other)]
    Other,
}

impl ThreadNode {
    pub fn as_post(&self) -> Option<&PostView> {
        match self {
            ThreadNode::Post(node) => Some(&node.post),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadViewPost {
    #[serde(default, deserialize_with = "or_default")]
    pub post: PostView,
    #[serde(default, deserialize_with = "optional")]
    pub parent: Option<ThreadNode>,
    #[serde(default, deserialize_with = "members")]
    pub replies: Vec<ThreadNode>,
}
