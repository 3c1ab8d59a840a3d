//! Paginated fetch-and-flatten pipeline.
//!
//! A job is a [`Driver`] wired to one [`Fetcher`] and one [`Flattener`]. The driver walks
//! a list of [`SearchWindow`]s, pages through each window until the source stops
//! returning records or a continuation token, flattens every record into a
//! [`FlatRow`], and hands the accumulated rows to a [`CsvSink`] at the end.
//!
//! Source adapters live in `harvest-social`; this crate knows nothing about any API.
pub mod driver;
pub mod pacer;
pub mod page;
pub mod row;
pub mod sink;
pub mod window;

pub use driver::{Driver, RunReport, RunSettings, WindowOutcome, WindowReport};
pub use pacer::Pacer;
pub use page::{Fetcher, Flattener, Page};
pub use row::{Cell, Column, ColumnKind, FlatRow, Schema};
pub use sink::CsvSink;
pub use window::SearchWindow;
