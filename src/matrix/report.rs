//! Result table formatting: fixed-width text and a JSON document.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::aggregator::{Collection, StopReason};
use super::order::AxisOrder;
use super::{ConfigurationKey, OrderingError, ResultEntry, ResultTable};

pub const DEFAULT_COLUMN_WIDTH: usize = 23;
pub const DEFAULT_OUTDATED_MARKER: &str = "<outdated>";

/// Row (axis-1) and column (axis-2) order for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
}

impl TableLayout {
    pub fn of(table: &ResultTable, rows: &AxisOrder, columns: &AxisOrder) -> Result<Self, OrderingError> {
        Ok(Self {
            rows: rows.sort(table.axis1_values())?,
            columns: columns.sort(table.axis2_values())?,
        })
    }
}

/// Fixed-width text table: one row per axis-1 value, one column per axis-2
/// value. Cells without a result render blank.
pub struct TableRenderer {
    pub column_width: usize,
    pub outdated_marker: String,
    pub rows: AxisOrder,
    pub columns: AxisOrder,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
            outdated_marker: DEFAULT_OUTDATED_MARKER.to_string(),
            rows: AxisOrder::Lexicographic,
            columns: AxisOrder::Lexicographic,
        }
    }
}

impl TableRenderer {
    pub fn layout(&self, table: &ResultTable) -> Result<TableLayout, OrderingError> {
        TableLayout::of(table, &self.rows, &self.columns)
    }

    /// Header of column names, then one line per row. Cells with no result
    /// are left blank.
    pub fn render(&self, table: &ResultTable) -> Result<String, OrderingError> {
        let layout = self.layout(table)?;
        let width = self.column_width;

        let mut out = self.pad("");
        for column in &layout.columns {
            out.push_str(&self.pad(column));
        }
        out.push('\n');

        for row in &layout.rows {
            out.push_str(&self.pad(row));
            for column in &layout.columns {
                let cell = table
                    .get(&ConfigurationKey::new(row.as_str(), column.as_str()))
                    .map(|e| e.display(&self.outdated_marker))
                    .unwrap_or("");
                out.push_str(&format!("{:<width$}", cell, width = width));
            }
            out.push('\n');
        }

        Ok(out)
    }

    fn pad(&self, text: &str) -> String {
        format!("{:<width$}", text, width = self.column_width)
    }
}

#[derive(Debug, Serialize)]
pub struct CellReport {
    pub axis1: String,
    pub axis2: String,
    pub status: Option<String>,
    pub outdated: bool,
}

/// Machine-readable report of one collection.
#[derive(Debug, Serialize)]
pub struct MatrixReport {
    pub report_id: uuid::Uuid,
    pub job: String,
    pub generated_at: DateTime<Utc>,
    pub window_start: Option<DateTime<Tz>>,
    pub stop: StopReason,
    pub complete: bool,
    pub expected_cells: usize,
    pub new_results: usize,
    pub records_examined: usize,
    pub builds_scanned: usize,
    pub axis1: Vec<String>,
    pub axis2: Vec<String>,
    pub cells: Vec<CellReport>,
}

impl MatrixReport {
    pub fn new(
        job: &str,
        generated_at: DateTime<Utc>,
        window_start: Option<DateTime<Tz>>,
        collection: &Collection,
        layout: TableLayout,
    ) -> Self {
        let mut cells = Vec::new();
        for row in &layout.rows {
            for column in &layout.columns {
                let key = ConfigurationKey::new(row.as_str(), column.as_str());
                if let Some(entry) = collection.table.get(&key) {
                    cells.push(CellReport {
                        axis1: key.axis1,
                        axis2: key.axis2,
                        status: match entry {
                            ResultEntry::Status(s) => Some(s.clone()),
                            ResultEntry::Outdated => None,
                        },
                        outdated: matches!(entry, ResultEntry::Outdated),
                    });
                }
            }
        }

        Self {
            report_id: uuid::Uuid::new_v4(),
            job: job.to_string(),
            generated_at,
            window_start,
            stop: collection.stop,
            complete: collection.is_complete(),
            expected_cells: collection.expected_cells,
            new_results: collection.new_results,
            records_examined: collection.records_examined,
            builds_scanned: collection.builds_scanned,
            axis1: layout.rows,
            axis2: layout.columns,
            cells,
        }
    }
}
