use anyhow::{Result, anyhow};
use harvest_pipeline::{
    CsvSink, Driver, Fetcher, FlatRow, Flattener, Page, RunSettings, Schema, SearchWindow,
    WindowOutcome,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use time::macros::date;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Post {
    id: u32,
    text: Option<String>,
}

/// Replays a script of responses per call and records every call.
struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Page<Post>>>>,
    calls: Mutex<Vec<(SearchWindow, Option<String>, Instant)>>,
}

impl ScriptedFetcher {
    fn new(script: Vec<Result<Page<Post>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(SearchWindow, Option<String>, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl<'a> Fetcher for &'a ScriptedFetcher {
    type Record = Post;

    async fn fetch(
        &self,
        _query: &str,
        window: &SearchWindow,
        cursor: Option<&str>,
    ) -> Result<Page<Post>> {
        self.calls
            .lock()
            .unwrap()
            .push((*window, cursor.map(str::to_string), Instant::now()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::empty()))
    }
}

struct PostFlattener {
    schema: Schema,
}

impl PostFlattener {
    fn new() -> Self {
        Self {
            schema: Schema::new().count("ID").text("Text"),
        }
    }
}

#[async_trait::async_trait]
impl Flattener<Post> for PostFlattener {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn flatten(&self, record: &Post) -> FlatRow {
        let mut row = self.schema.empty_row();
        row.set("ID", u64::from(record.id))
            .set("Text", record.text.clone());
        row
    }
}

fn posts(ids: std::ops::RangeInclusive<u32>) -> Vec<Post> {
    ids.map(|id| Post {
        id,
        text: (id % 2 == 0).then(|| format!("post {id}")),
    })
    .collect()
}

fn page(ids: std::ops::RangeInclusive<u32>, cursor: Option<&str>) -> Result<Page<Post>> {
    Ok(Page::new(posts(ids), cursor.map(str::to_string)))
}

fn settings(days: u32, delay: Duration) -> RunSettings {
    let start = date!(2024 - 12 - 04);
    let end = start.next_day().unwrap();
    let end = (1..days).fold(end, |d, _| d.next_day().unwrap());
    RunSettings {
        query: "UnitedHealthcare".into(),
        windows: SearchWindow::daily(start, end, 1).unwrap(),
        delay,
    }
}

fn ids(rows: &[FlatRow]) -> Vec<String> {
    rows.iter().map(|r| r.value("ID")).collect()
}

#[tokio::test(start_paused = true)]
async fn accumulates_pages_in_fetch_order_across_windows() {
    // Window 1: two pages, the second without a continuation.
    // Window 2: one page with a cursor, then an empty page.
    let fetcher = ScriptedFetcher::new(vec![
        page(1..=3, Some("c1")),
        page(4..=5, None),
        page(6..=8, Some("c2")),
        page(1..=0, Some("ignored")),
    ]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(2, Duration::ZERO));

    let report = driver.run().await;

    assert_eq!(report.rows.len(), 3 + 2 + 3);
    assert_eq!(ids(&report.rows), ["1", "2", "3", "4", "5", "6", "7", "8"]);
    assert_eq!(report.windows.len(), 2);
    assert_eq!(report.windows[0].pages, 2);
    assert_eq!(report.windows[1].pages, 1);
    assert_eq!(report.failed_windows(), 0);

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].1, None);
    assert_eq!(calls[1].1.as_deref(), Some("c1"));
    // Cursor state never leaks into the next window.
    assert_eq!(calls[2].1, None);
    assert_eq!(calls[3].1.as_deref(), Some("c2"));
    assert_eq!(calls[2].0, driver.settings().windows[1]);

    let tmp = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(tmp.path().join("out.csv"));
    assert_eq!(sink.write(&report.rows, driver.schema()).unwrap(), 8);
    assert_eq!(sink.read(driver.schema()).unwrap(), report.rows);
}

#[tokio::test(start_paused = true)]
async fn empty_page_ends_the_window_even_with_a_cursor() {
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(Vec::new(), Some("still-has-cursor".into()))),
        page(1..=2, Some("never-used")),
    ]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(1, Duration::ZERO));

    let report = driver.run().await;

    assert!(report.rows.is_empty());
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(report.windows[0].outcome, WindowOutcome::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn repeated_cursor_does_not_loop_forever() {
    let fetcher = ScriptedFetcher::new(vec![
        page(1..=1, Some("same")),
        page(2..=2, Some("same")),
        page(3..=3, Some("same")),
    ]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(1, Duration::ZERO));

    let report = driver.run().await;

    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(ids(&report.rows), ["1", "2"]);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_degrades_to_exhaustion_and_is_reported() {
    let fetcher = ScriptedFetcher::new(vec![
        page(1..=2, Some("c1")),
        Err(anyhow!("server returned error 503")),
        page(3..=4, None),
    ]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(2, Duration::ZERO));

    let report = driver.run().await;

    assert_eq!(ids(&report.rows), ["1", "2", "3", "4"]);
    assert_eq!(report.failed_windows(), 1);
    assert_eq!(report.exhausted_windows(), 1);
    match &report.windows[0].outcome {
        WindowOutcome::Failed(msg) => assert!(msg.contains("503")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fetches_within_a_window_respect_the_delay() {
    let delay = Duration::from_secs(5);
    let fetcher = ScriptedFetcher::new(vec![
        page(1..=1, Some("a")),
        page(2..=2, Some("b")),
        page(3..=3, None),
        page(4..=4, Some("c")),
        page(5..=5, None),
    ]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(2, delay));

    driver.run().await;

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 5);
    for pair in calls.windows(2) {
        let (w0, _, t0) = &pair[0];
        let (w1, _, t1) = &pair[1];
        if w0 == w1 {
            assert!(
                t1.duration_since(*t0) >= delay,
                "calls in {w0} only {:?} apart",
                t1.duration_since(*t0)
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn every_row_carries_every_schema_column() {
    let fetcher = ScriptedFetcher::new(vec![page(1..=3, None)]);
    let driver = Driver::new(&fetcher, PostFlattener::new(), settings(1, Duration::ZERO));

    let report = driver.run().await;

    for row in &report.rows {
        assert!(row.conforms_to(driver.schema()));
    }
    // Odd ids have no text: the column is present but empty.
    assert!(report.rows[0].get("Text").unwrap().is_empty());
}
