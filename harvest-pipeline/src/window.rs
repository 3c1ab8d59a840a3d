use harvest_common::{HarvestError, Result};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime, Time};

/// Half-open UTC interval `[start, end)` that one pagination loop covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl SearchWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if start >= end {
            return Err(HarvestError::Window(format!(
                "start {start} is not before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// `start` as RFC 3339, e.g. `2024-12-04T00:00:00Z`.
    pub fn start_rfc3339(&self) -> std::result::Result<String, time::error::Format> {
        self.start.format(&Rfc3339)
    }

    pub fn end_rfc3339(&self) -> std::result::Result<String, time::error::Format> {
        self.end.format(&Rfc3339)
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Cut `[start, end)` into consecutive windows of `step`; the last one is clipped to `end`.
    ///
    /// ```
    /// use harvest_pipeline::SearchWindow;
    /// use time::macros::datetime;
    /// use time::Duration;
    ///
    /// let windows = SearchWindow::partition(
    ///     datetime!(2024-12-04 00:00 UTC),
    ///     datetime!(2024-12-06 12:00 UTC),
    ///     Duration::days(1),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(windows.len(), 3);
    /// assert_eq!(windows[2].start(), datetime!(2024-12-06 00:00 UTC));
    /// assert_eq!(windows[2].end(), datetime!(2024-12-06 12:00 UTC));
    /// ```
    pub fn partition(
        start: OffsetDateTime,
        end: OffsetDateTime,
        step: Duration,
    ) -> Result<Vec<Self>> {
        if !step.is_positive() {
            return Err(HarvestError::Window(format!(
                "window size must be positive, got {step}"
            )));
        }
        if start >= end {
            return Err(HarvestError::Window(format!(
                "range start {start} is not before end {end}"
            )));
        }

        let mut windows = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let next = cursor
                .checked_add(step)
                .map_or(end, |candidate| candidate.min(end));
            windows.push(Self {
                start: cursor,
                end: next,
            });
            cursor = next;
        }
        Ok(windows)
    }

    /// Day-sized windows from midnight UTC of `start` up to midnight UTC of `end` (exclusive).
    pub fn daily(start: Date, end: Date, days_per_window: u32) -> Result<Vec<Self>> {
        Self::partition(
            midnight_utc(start),
            midnight_utc(end),
            Duration::days(i64::from(days_per_window)),
        )
    }
}

fn midnight_utc(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_rfc3339(), self.end_rfc3339()) {
            (Ok(s), Ok(e)) => write!(f, "[{s}, {e})"),
            _ => write!(f, "[{}, {})", self.start, self.end),
        }
    }
}
