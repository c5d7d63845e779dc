//! Idempotent CSV Reconciliation
//!
//! Upserts checklist rows into a project's indicators. Each row is matched by
//! its idempotency key, so importing the same file twice changes nothing and
//! overlapping files only touch what differs.
//!
//! **Merge rules for existing indicators:** a field is overwritten only when
//! the incoming cell is non-empty and differs from the stored value. Empty
//! cells never blank out stored data.
//!
//! The whole batch runs in one transaction: a storage failure on any row
//! rolls back every earlier row of the batch.

use accredify_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::models::indicator::identity_length_error;
use crate::models::{Evidence, Frequency, ImportOptions, ImportResult, Indicator, DEFAULT_SCORE};
use crate::services::csv_source::parse_csv;
use crate::services::indicator_key::derive_key;
use crate::utils::begin_monitored;

pub const COL_SECTION: &str = "Section";
pub const COL_STANDARD: &str = "Standard";
pub const COL_INDICATOR: &str = "Indicator";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_EVIDENCE_REQUIRED: &str = "Evidence Required";
pub const COL_RESPONSIBLE_PERSON: &str = "Responsible Person";
pub const COL_FREQUENCY: &str = "Frequency";
pub const COL_ASSIGNED_TO: &str = "Assigned to";
pub const COL_COMPLIANCE_EVIDENCE: &str = "Compliance Evidence";
pub const COL_SCORE: &str = "Score";

pub const REQUIRED_HEADERS: [&str; 3] = [COL_SECTION, COL_STANDARD, COL_INDICATOR];

pub const OPTIONAL_HEADERS: [&str; 7] = [
    COL_DESCRIPTION,
    COL_EVIDENCE_REQUIRED,
    COL_RESPONSIBLE_PERSON,
    COL_FREQUENCY,
    COL_ASSIGNED_TO,
    COL_COMPLIANCE_EVIDENCE,
    COL_SCORE,
];

/// File name given to notes created from the "Compliance Evidence" column
pub const EVIDENCE_NOTE_FILE_NAME: &str = "Imported evidence note";

/// Score cell after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreCell {
    Missing,
    Malformed,
    Value(i64),
}

impl ScoreCell {
    /// Integers as-is, decimals truncated ("12.0" -> 12)
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return ScoreCell::Missing;
        }
        if let Ok(value) = raw.parse::<i64>() {
            return ScoreCell::Value(value);
        }
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => {
                ScoreCell::Value(value.trunc() as i64)
            }
            _ => ScoreCell::Malformed,
        }
    }

    fn value(self) -> Option<i64> {
        match self {
            ScoreCell::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// One CSV row mapped onto indicator fields
#[derive(Debug, Clone)]
struct IncomingRow {
    section: String,
    standard: String,
    indicator: String,
    description: Option<String>,
    score: ScoreCell,
    responsible_person: Option<String>,
    frequency: Option<Frequency>,
    assignee: Option<String>,
    notes: Option<String>,
    compliance_evidence: Option<String>,
}

fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> &'a str {
    row.get(column).map(|v| v.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Description cell with "Evidence Required: ..." appended
fn combined_description(description: &str, evidence_required: &str) -> Option<String> {
    match (description.is_empty(), evidence_required.is_empty()) {
        (true, true) => None,
        (false, true) => Some(description.to_string()),
        (true, false) => Some(format!("Evidence Required: {}", evidence_required)),
        (false, false) => Some(format!(
            "{}\n\nEvidence Required: {}",
            description, evidence_required
        )),
    }
}

impl IncomingRow {
    fn from_cells(row: &HashMap<String, String>, options: &ImportOptions) -> Self {
        let compliance_evidence = non_empty(cell(row, COL_COMPLIANCE_EVIDENCE));

        // Without note mode the evidence text is kept on the indicator itself
        let notes = match (&compliance_evidence, options.create_evidence_notes) {
            (Some(text), false) => Some(format!("Compliance Evidence: {}", text)),
            _ => None,
        };

        Self {
            section: cell(row, COL_SECTION).to_string(),
            standard: cell(row, COL_STANDARD).to_string(),
            indicator: cell(row, COL_INDICATOR).to_string(),
            description: combined_description(
                cell(row, COL_DESCRIPTION),
                cell(row, COL_EVIDENCE_REQUIRED),
            ),
            score: ScoreCell::parse(cell(row, COL_SCORE)),
            responsible_person: non_empty(cell(row, COL_RESPONSIBLE_PERSON)),
            frequency: Frequency::canonicalize(cell(row, COL_FREQUENCY)),
            assignee: non_empty(cell(row, COL_ASSIGNED_TO)),
            notes,
            compliance_evidence,
        }
    }

    fn is_complete(&self) -> bool {
        !self.section.is_empty() && !self.standard.is_empty() && !self.indicator.is_empty()
    }

    /// Column-length problem, if any
    fn length_error(&self) -> Option<String> {
        identity_length_error(&self.section, &self.standard, &self.indicator)
    }

    fn into_indicator(self, project_id: Uuid, key: String) -> Indicator {
        let mut indicator = Indicator::new(project_id, self.section, self.standard, self.indicator);
        indicator.description = self.description.unwrap_or_default();
        indicator.score = self.score.value().unwrap_or(DEFAULT_SCORE);
        indicator.responsible_person = self.responsible_person;
        indicator.frequency = self.frequency;
        indicator.assignee = self.assignee;
        indicator.notes = self.notes;
        indicator.indicator_key = Some(key);
        indicator
    }

    /// Apply the merge rules to `existing`; true if anything changed
    fn merge_into(&self, existing: &mut Indicator) -> bool {
        fn merge_text(target: &mut Option<String>, incoming: &Option<String>) -> bool {
            match incoming {
                Some(value) if target.as_deref() != Some(value.as_str()) => {
                    *target = Some(value.clone());
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;

        if let Some(description) = &self.description {
            if existing.description != *description {
                existing.description = description.clone();
                changed = true;
            }
        }

        // Malformed and missing scores leave the stored score alone
        if let Some(score) = self.score.value() {
            if existing.score != score {
                existing.score = score;
                changed = true;
            }
        }

        if let Some(frequency) = self.frequency {
            if existing.frequency != Some(frequency) {
                existing.frequency = Some(frequency);
                changed = true;
            }
        }

        changed |= merge_text(&mut existing.responsible_person, &self.responsible_person);
        changed |= merge_text(&mut existing.assignee, &self.assignee);
        changed |= merge_text(&mut existing.notes, &self.notes);

        changed
    }
}

/// Names of required columns absent from `headers`
fn missing_headers(headers: &[String]) -> Vec<&'static str> {
    REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h.trim() == *required))
        .collect()
}

/// Upserts checklist rows into a project
pub struct CsvReconciler {
    db: SqlitePool,
}

impl CsvReconciler {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Parse CSV text and import its rows
    pub async fn import_csv(
        &self,
        project_id: Uuid,
        csv_text: &str,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let table = match parse_csv(csv_text) {
            Ok(table) => table,
            Err(Error::Validation(message)) => {
                tracing::warn!(project_id = %project_id, error = %message, "CSV could not be parsed");
                let mut result = ImportResult::file_error(message);
                result.dry_run = options.dry_run;
                return Ok(result);
            }
            Err(e) => return Err(e),
        };

        self.import_rows(project_id, &table.headers, &table.rows, options).await
    }

    /// Import already-parsed rows
    ///
    /// Header problems come back as a result with one row-0 error and no
    /// rows processed. Storage failures are returned as errors after the
    /// batch has been rolled back.
    pub async fn import_rows(
        &self,
        project_id: Uuid,
        headers: &[String],
        rows: &[HashMap<String, String>],
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut result = ImportResult {
            dry_run: options.dry_run,
            ..ImportResult::new()
        };

        let missing = missing_headers(headers);
        if !missing.is_empty() {
            let message = format!("Missing required columns: {}", missing.join(", "));
            tracing::warn!(project_id = %project_id, error = %message, "CSV header rejected");
            result.row_error(0, message);
            return Ok(result);
        }

        let limit = options.limit.unwrap_or(rows.len());

        tracing::info!(
            project_id = %project_id,
            rows = rows.len().min(limit),
            create_evidence_notes = options.create_evidence_notes,
            dry_run = options.dry_run,
            "Starting checklist import"
        );

        let mut tx = begin_monitored(&self.db, "csv_reconciler::import_rows").await?;

        db::projects::require(tx.conn()?, project_id).await?;

        for (index, row) in rows.iter().take(limit).enumerate() {
            // Header is line 1
            let line = index + 2;
            let data_row = index + 1;

            let incoming = IncomingRow::from_cells(row, options);

            if !incoming.is_complete() {
                tracing::debug!(line, "Skipping row without section/standard/indicator");
                result.skipped += 1;
                continue;
            }

            if let Some(message) = incoming.length_error() {
                tracing::warn!(line, error = %message, "Rejected CSV row");
                result.row_error(line, message);
                continue;
            }

            let key = derive_key(&project_id, &incoming.section, &incoming.standard, &incoming.indicator);

            let existing = db::indicators::find_by_key(tx.conn()?, &key).await?;

            let indicator_id = match existing {
                Some(mut existing) => {
                    if incoming.merge_into(&mut existing) {
                        db::indicators::update(tx.conn()?, &existing).await?;
                        result.updated += 1;
                        tracing::debug!(line, indicator_id = %existing.id, "Updated indicator");
                    } else {
                        result.unchanged += 1;
                    }
                    existing.id
                }
                None => {
                    let mut indicator = incoming.clone().into_indicator(project_id, key);
                    db::indicators::insert(tx.conn()?, &mut indicator).await?;
                    result.created += 1;
                    tracing::debug!(line, indicator_id = %indicator.id, "Created indicator");
                    indicator.id
                }
            };

            if options.create_evidence_notes {
                if let Some(text) = &incoming.compliance_evidence {
                    let content = format!("Imported compliance evidence (row {}):\n{}", data_row, text);
                    if !db::evidence::note_exists(tx.conn()?, indicator_id, &content).await? {
                        let note = Evidence::note(indicator_id, EVIDENCE_NOTE_FILE_NAME, content);
                        db::evidence::insert(tx.conn()?, &note).await?;
                        result.evidence_notes_created += 1;
                    }
                }
            }
        }

        if options.dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        tracing::info!(
            project_id = %project_id,
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            skipped = result.skipped,
            errors = result.errors.len(),
            evidence_notes_created = result.evidence_notes_created,
            dry_run = options.dry_run,
            "Checklist import finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> HashMap<String, String> {
        cells.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_score_parsing() {
        assert_eq!(ScoreCell::parse(""), ScoreCell::Missing);
        assert_eq!(ScoreCell::parse(" 20 "), ScoreCell::Value(20));
        assert_eq!(ScoreCell::parse("12.0"), ScoreCell::Value(12));
        assert_eq!(ScoreCell::parse("7.9"), ScoreCell::Value(7));
        assert_eq!(ScoreCell::parse("ten"), ScoreCell::Malformed);
        assert_eq!(ScoreCell::parse("NaN"), ScoreCell::Malformed);
    }

    #[test]
    fn test_description_combination() {
        assert_eq!(combined_description("", ""), None);
        assert_eq!(combined_description("Policy", "").as_deref(), Some("Policy"));
        assert_eq!(
            combined_description("", "Signed copy").as_deref(),
            Some("Evidence Required: Signed copy")
        );
        assert_eq!(
            combined_description("Policy", "Signed copy").as_deref(),
            Some("Policy\n\nEvidence Required: Signed copy")
        );
    }

    #[test]
    fn test_missing_headers_reported_by_name() {
        let headers = vec!["Section".to_string(), " Indicator ".to_string(), "Score".to_string()];
        assert_eq!(missing_headers(&headers), vec!["Standard"]);
    }

    #[test]
    fn test_compliance_evidence_goes_to_notes_without_note_mode() {
        let cells = row(&[
            ("Section", "Safety"),
            ("Standard", "S1"),
            ("Indicator", "Fire drill"),
            ("Compliance Evidence", "Drill log 2024"),
        ]);

        let plain = IncomingRow::from_cells(&cells, &ImportOptions::default());
        assert_eq!(plain.notes.as_deref(), Some("Compliance Evidence: Drill log 2024"));

        let note_mode = ImportOptions {
            create_evidence_notes: true,
            ..ImportOptions::default()
        };
        let with_notes = IncomingRow::from_cells(&cells, &note_mode);
        assert!(with_notes.notes.is_none());
        assert_eq!(with_notes.compliance_evidence.as_deref(), Some("Drill log 2024"));
    }

    #[test]
    fn test_merge_ignores_empty_and_malformed_cells() {
        let project_id = Uuid::new_v4();
        let mut existing = Indicator::new(project_id, "Safety", "S1", "Fire drill");
        existing.score = 20;
        existing.description = "Policy".to_string();
        existing.assignee = Some("Dana".to_string());
        existing.frequency = Some(Frequency::Monthly);

        let incoming = IncomingRow::from_cells(
            &row(&[
                ("Section", "Safety"),
                ("Standard", "S1"),
                ("Indicator", "Fire drill"),
                ("Score", "lots"),
                ("Frequency", "every so often"),
            ]),
            &ImportOptions::default(),
        );

        assert!(!incoming.merge_into(&mut existing));
        assert_eq!(existing.score, 20);
        assert_eq!(existing.description, "Policy");
        assert_eq!(existing.assignee.as_deref(), Some("Dana"));
        assert_eq!(existing.frequency, Some(Frequency::Monthly));
    }

    #[test]
    fn test_merge_overwrites_differing_values() {
        let mut existing = Indicator::new(Uuid::new_v4(), "Safety", "S1", "Fire drill");

        let incoming = IncomingRow::from_cells(
            &row(&[
                ("Section", "Safety"),
                ("Standard", "S1"),
                ("Indicator", "Fire drill"),
                ("Score", "25"),
                ("Responsible Person", "Safety officer"),
                ("Frequency", "QUARTERLY"),
            ]),
            &ImportOptions::default(),
        );

        assert!(incoming.merge_into(&mut existing));
        assert_eq!(existing.score, 25);
        assert_eq!(existing.responsible_person.as_deref(), Some("Safety officer"));
        assert_eq!(existing.frequency, Some(Frequency::Quarterly));
        assert!(!incoming.merge_into(&mut existing), "second merge is a no-op");
    }

    #[test]
    fn test_length_limits() {
        let long_indicator = "x".repeat(501);
        let incoming = IncomingRow::from_cells(
            &row(&[("Section", "A"), ("Standard", "B"), ("Indicator", &long_indicator)]),
            &ImportOptions::default(),
        );
        assert!(incoming.length_error().unwrap().contains("Indicator"));

        let ok_indicator = "x".repeat(500);
        let incoming = IncomingRow::from_cells(
            &row(&[("Section", "A"), ("Standard", "B"), ("Indicator", &ok_indicator)]),
            &ImportOptions::default(),
        );
        assert!(incoming.length_error().is_none());
    }
}
