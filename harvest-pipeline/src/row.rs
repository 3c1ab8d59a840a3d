//! Column schemas and the flat rows that conform to them.
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered, pre-declared column list. Column order is the CSV header order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

/// Fields contributed by each reply slot, in header order.
pub const REPLY_SLOT_FIELDS: [(&str, ColumnKind); 5] = [
    ("Handle", ColumnKind::Text),
    ("Display Name", ColumnKind::Text),
    ("CreatedAt", ColumnKind::Text),
    ("Text", ColumnKind::Text),
    ("LikeCount", ColumnKind::Count),
];

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>) -> Self {
        self.push(name.into(), ColumnKind::Text);
        self
    }

    pub fn count(mut self, name: impl Into<String>) -> Self {
        self.push(name.into(), ColumnKind::Count);
        self
    }

    /// Append `slots` groups of [`REPLY_SLOT_FIELDS`] named `Reply{i} <field>`, i from 1.
    ///
    /// ```
    /// use harvest_pipeline::Schema;
    ///
    /// let schema = Schema::new().text("Text").reply_slots(2);
    /// assert_eq!(schema.len(), 11);
    /// assert_eq!(schema.names().last().unwrap(), &"Reply2 LikeCount");
    /// ```
    pub fn reply_slots(mut self, slots: usize) -> Self {
        for slot in 1..=slots {
            for (field, kind) in REPLY_SLOT_FIELDS {
                self.push(reply_column(slot, field), kind);
            }
        }
        self
    }

    fn push(&mut self, name: String, kind: ColumnKind) {
        debug_assert!(
            self.column(&name).is_none(),
            "duplicate column `{name}` in schema"
        );
        self.columns.push(Column { name, kind });
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// A row holding every column of this schema, all [`Cell::Empty`].
    pub fn empty_row(&self) -> FlatRow {
        let mut row = FlatRow::new();
        for column in &self.columns {
            row.cells.insert(column.name.clone(), Cell::Empty);
        }
        row
    }
}

/// Column name of `field` in reply slot `slot` (1-based).
pub fn reply_column(slot: usize, field: &str) -> String {
    format!("Reply{slot} {field}")
}

/// One scalar value. Empty strings are always normalized to [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Count(u64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    /// Inverse of [`Cell::to_string`] for a column of `kind`.
    pub fn parse(raw: &str, kind: ColumnKind) -> Result<Self, std::num::ParseIntError> {
        if raw.is_empty() {
            return Ok(Cell::Empty);
        }
        match kind {
            ColumnKind::Text => Ok(Cell::Text(raw.to_string())),
            ColumnKind::Count => raw.trim().parse().map(Cell::Count),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Count(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Count(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Column name → value. Use [`Schema::empty_row`] to start a row with every column present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatRow {
    cells: BTreeMap<String, Cell>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Cell>) -> &mut Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Rendered value of `column`; missing columns render as the empty string.
    pub fn value(&self, column: &str) -> String {
        self.get(column).map(Cell::to_string).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// True when every schema column is present in this row.
    pub fn conforms_to(&self, schema: &Schema) -> bool {
        schema.columns().iter().all(|c| self.cells.contains_key(&c.name))
    }
}
