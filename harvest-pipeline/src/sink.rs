use crate::row::{Cell, FlatRow, Schema};
use harvest_common::{HarvestError, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Writes a result set as CSV with the schema's header, and reads it back.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

fn sink_error(context: &str, err: csv::Error) -> HarvestError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => HarvestError::Io(io),
            other => HarvestError::Sink(format!("{context}: {other:?}")),
        }
    } else {
        HarvestError::Sink(format!("{context}: {err}"))
    }
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create (or truncate) the file and write `rows`. Returns the number of data rows.
    pub fn write(&self, rows: &[FlatRow], schema: &Schema) -> Result<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let written = Self::write_to(file, rows, schema)?;
        tracing::info!(
            target: "sink",
            path = %self.path.display(),
            rows = written,
            columns = schema.len(),
            "sink.csv.written"
        );
        Ok(written)
    }

    /// Header row first, then one record per row in order; absent columns are empty fields.
    pub fn write_to<W: Write>(writer: W, rows: &[FlatRow], schema: &Schema) -> Result<usize> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(schema.names())
            .map_err(|e| sink_error("writing header", e))?;

        for (idx, row) in rows.iter().enumerate() {
            let record = schema.columns().iter().map(|c| row.value(&c.name));
            out.write_record(record)
                .map_err(|e| sink_error(&format!("writing row {idx}"), e))?;
        }
        out.flush()?;
        Ok(rows.len())
    }

    pub fn read(&self, schema: &Schema) -> Result<Vec<FlatRow>> {
        let file = File::open(&self.path)?;
        Self::read_from(file, schema)
    }

    /// Parse a file produced by [`CsvSink::write_to`] with the same schema.
    pub fn read_from<R: Read>(reader: R, schema: &Schema) -> Result<Vec<FlatRow>> {
        let mut input = csv::Reader::from_reader(reader);

        let header = input
            .headers()
            .map_err(|e| sink_error("reading header", e))?
            .clone();
        let expected = schema.names();
        if header.iter().ne(expected.iter().copied()) {
            return Err(HarvestError::Sink(format!(
                "header mismatch: expected {} columns starting {:?}, found {} columns starting {:?}",
                expected.len(),
                expected.first(),
                header.len(),
                header.get(0)
            )));
        }

        let mut rows = Vec::new();
        for (idx, record) in input.records().enumerate() {
            let record = record.map_err(|e| sink_error(&format!("reading row {idx}"), e))?;
            let mut row = FlatRow::new();
            for (column, raw) in schema.columns().iter().zip(record.iter()) {
                let cell = Cell::parse(raw, column.kind).map_err(|e| {
                    HarvestError::Sink(format!("row {idx}, column `{}`: {e}", column.name))
                })?;
                row.set(column.name.clone(), cell);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .text("Handle")
            .text("Text")
            .count("LikeCount")
            .reply_slots(2)
    }

    fn sample_rows(schema: &Schema) -> Vec<FlatRow> {
        let mut a = schema.empty_row();
        a.set("Handle", "alice.bsky.social")
            .set("Text", "multi\nline, with \"quotes\"")
            .set("LikeCount", 7u64)
            .set("Reply1 Handle", "bob.bsky.social")
            .set("Reply1 LikeCount", 0u64);
        let mut b = schema.empty_row();
        b.set("Handle", "carol").set("LikeCount", 0u64);
        vec![a, b]
    }

    #[test]
    fn writes_header_then_rows_in_order() {
        let schema = schema();
        let mut buf = Vec::new();
        let n = CsvSink::write_to(&mut buf, &sample_rows(&schema), &schema).unwrap();
        assert_eq!(n, 2);

        let text = String::from_utf8(buf).unwrap();
        let first_line = text.lines().next().unwrap();
        assert!(first_line.starts_with("Handle,Text,LikeCount,Reply1 Handle,Reply1 Display Name"));
        assert!(first_line.ends_with("Reply2 Text,Reply2 LikeCount"));
    }

    #[test]
    fn missing_columns_are_written_empty() {
        let schema = schema();
        let mut sparse = FlatRow::new();
        sparse.set("Text", "only text");

        let mut buf = Vec::new();
        CsvSink::write_to(&mut buf, &[sparse], &schema).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let data = text.lines().nth(1).unwrap();
        assert_eq!(data, format!(",only text{}", ",".repeat(schema.len() - 2)));
    }

    #[test]
    fn round_trips_through_a_file() {
        let schema = schema();
        let rows = sample_rows(&schema);
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path().join("nested/dir/out.csv"));

        sink.write(&rows, &schema).unwrap();
        let back = sink.read(&schema).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn empty_result_set_still_has_a_header() {
        let schema = schema();
        let mut buf = Vec::new();
        CsvSink::write_to(&mut buf, &[], &schema).unwrap();
        let back = CsvSink::read_from(buf.as_slice(), &schema).unwrap();
        assert!(back.is_empty());
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn rejects_a_foreign_header() {
        let schema = schema();
        let err = CsvSink::read_from("DID,Handle\nx,y\n".as_bytes(), &schema).unwrap_err();
        assert!(matches!(err, HarvestError::Sink(msg) if msg.contains("header mismatch")));
    }
}
