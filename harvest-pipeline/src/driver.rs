//! Window-by-window pagination loop.
//!
//! Per window the driver runs `FETCHING(cursor) -> ACCUMULATED -> FETCHING(next) | DONE`:
//! an empty page, a missing continuation, a repeated continuation or a failed fetch ends
//! the window. Fetch failures never abort the run; they are logged and reported as
//! [`WindowOutcome::Failed`] so a summary can tell them apart from real exhaustion.
use crate::pacer::Pacer;
use crate::page::{Fetcher, Flattener};
use crate::row::{FlatRow, Schema};
use crate::window::SearchWindow;
use std::time::Duration;

/// Everything a run needs besides the adapters.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query: String,
    pub windows: Vec<SearchWindow>,
    /// Minimum spacing between two fetches in the same window.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    /// The source ran out of records or continuation tokens.
    Exhausted,
    /// A fetch failed; rows gathered before the failure are kept.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct WindowReport {
    pub window: SearchWindow,
    pub pages: usize,
    pub records: usize,
    pub outcome: WindowOutcome,
}

/// Rows in fetch order plus one report per window.
#[derive(Debug, Default)]
pub struct RunReport {
    pub rows: Vec<FlatRow>,
    pub windows: Vec<WindowReport>,
}

impl RunReport {
    pub fn failed_windows(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| matches!(w.outcome, WindowOutcome::Failed(_)))
            .count()
    }

    pub fn exhausted_windows(&self) -> usize {
        self.windows.len() - self.failed_windows()
    }

    pub fn pages(&self) -> usize {
        self.windows.iter().map(|w| w.pages).sum()
    }
}

pub struct Driver<F, L> {
    fetcher: F,
    flattener: L,
    settings: RunSettings,
}

impl<F, L> Driver<F, L>
where
    F: Fetcher,
    F::Record: Sync,
    L: Flattener<F::Record>,
{
    pub fn new(fetcher: F, flattener: L, settings: RunSettings) -> Self {
        Self {
            fetcher,
            flattener,
            settings,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.flattener.schema()
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Walk every window in order and accumulate the flattened rows.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        let mut pacer = Pacer::new(self.settings.delay);

        for window in &self.settings.windows {
            pacer.reset();
            let window_report = self.run_window(window, &mut pacer, &mut report.rows).await;
            report.windows.push(window_report);
        }

        tracing::info!(
            target: "pipeline",
            query = %self.settings.query,
            windows = report.windows.len(),
            failed_windows = report.failed_windows(),
            pages = report.pages(),
            rows = report.rows.len(),
            "pipeline.run.done"
        );
        report
    }

    async fn run_window(
        &self,
        window: &SearchWindow,
        pacer: &mut Pacer,
        rows: &mut Vec<FlatRow>,
    ) -> WindowReport {
        tracing::info!(target: "pipeline", %window, "pipeline.window.start");

        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut records = 0usize;

        let outcome = loop {
            pacer.ready().await;

            let page = match self
                .fetcher
                .fetch(&self.settings.query, window, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        target: "pipeline",
                        %window,
                        pages,
                        error = %format!("{e:#}"),
                        "pipeline.fetch.failed"
                    );
                    break WindowOutcome::Failed(format!("{e:#}"));
                }
            };

            if page.is_empty() {
                tracing::info!(target: "pipeline", %window, pages, "pipeline.window.no_more_records");
                break WindowOutcome::Exhausted;
            }

            pages += 1;
            records += page.records.len();
            for record in &page.records {
                rows.push(self.flattener.flatten(record).await);
            }

            tracing::info!(
                target: "pipeline",
                %window,
                page = pages,
                fetched = page.records.len(),
                total = rows.len(),
                has_more = page.continuation.is_some(),
                "pipeline.page"
            );

            match page.continuation {
                None => break WindowOutcome::Exhausted,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(target: "pipeline", %window, cursor = %next, "pipeline.cursor.repeated");
                    break WindowOutcome::Exhausted;
                }
                Some(next) => cursor = Some(next),
            }
        };

        tracing::info!(
            target: "pipeline",
            %window,
            pages,
            records,
            failed = matches!(outcome, WindowOutcome::Failed(_)),
            "pipeline.window.done"
        );

        WindowReport {
            window: *window,
            pages,
            records,
            outcome,
        }
    }
}
