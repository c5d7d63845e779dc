//! CSV import options and results
//!
//! Per-row problems never abort a batch: incomplete rows are counted as
//! skipped, invalid rows are reported in `errors`. A header failure is the
//! single top-level error (row 0).

use serde::{Deserialize, Serialize};

/// Knobs for one import run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportOptions {
    /// Also create a note evidence item per row from "Compliance Evidence"
    #[serde(default)]
    pub create_evidence_notes: bool,
    /// Import only the first N data rows
    #[serde(default)]
    pub limit: Option<usize>,
    /// Run the whole batch, report counts, then roll back
    #[serde(default)]
    pub dry_run: bool,
}

/// Error attached to one CSV line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    /// File line number (header = 1); 0 for whole-file errors
    pub row: usize,
    pub error: String,
}

/// Import completion result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub created: usize,
    /// Existing indicators where at least one field changed
    pub updated: usize,
    /// Existing indicators matched by key with nothing to change
    pub unchanged: usize,
    /// Rows missing Section, Standard or Indicator
    pub skipped: usize,
    pub evidence_notes_created: usize,
    pub errors: Vec<ImportRowError>,
    pub dry_run: bool,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result carrying only a whole-file error
    pub fn file_error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![ImportRowError {
                row: 0,
                error: message.into(),
            }],
            ..Self::default()
        }
    }

    pub fn row_error(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(ImportRowError {
            row,
            error: message.into(),
        });
    }

    pub fn total_rows_processed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.errors_on_rows()
    }

    fn errors_on_rows(&self) -> usize {
        self.errors.iter().filter(|e| e.row > 0).count()
    }

    /// True when the header (or the file itself) was rejected
    pub fn is_file_error(&self) -> bool {
        self.errors.iter().any(|e| e.row == 0)
    }
}
