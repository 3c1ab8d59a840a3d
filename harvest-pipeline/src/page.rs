use crate::row::{FlatRow, Schema};
use crate::window::SearchWindow;
use anyhow::Result;

/// One response worth of records plus the token for the next call, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub continuation: Option<String>,
}

impl<R> Page<R> {
    /// Blank tokens are treated as "no further page".
    pub fn new(records: Vec<R>, continuation: Option<String>) -> Self {
        let continuation = continuation.filter(|token| !token.trim().is_empty());
        Self {
            records,
            continuation,
        }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            continuation: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Issues one search request per call.
///
/// `cursor` is `None` for the first page of a window, otherwise a continuation returned
/// by an earlier call for the same window. Transport and status failures are returned as
/// errors; the driver decides how to degrade them.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    type Record: Send;

    async fn fetch(
        &self,
        query: &str,
        window: &SearchWindow,
        cursor: Option<&str>,
    ) -> Result<Page<Self::Record>>;
}

/// Maps one raw record onto a row of a fixed schema.
///
/// Implementations never fail: absent fields and unresolvable references become empty
/// cells, so every returned row carries every column of [`Flattener::schema`].
#[async_trait::async_trait]
pub trait Flattener<R>: Send + Sync {
    fn schema(&self) -> &Schema;

    async fn flatten(&self, record: &R) -> FlatRow;
}
