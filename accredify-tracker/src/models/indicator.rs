//! Indicator model
//!
//! An indicator is one checklist item mapped to a section/standard of an
//! accreditation framework. Its `indicator_key` is the idempotency anchor for
//! CSV imports: once set it never changes.

use accredify_common::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::indicator_key::derive_key;

/// Score given to indicators when none (or garbage) is supplied
pub const DEFAULT_SCORE: i64 = 10;

pub const MAX_SECTION_LEN: usize = 255;
pub const MAX_STANDARD_LEN: usize = 255;
pub const MAX_INDICATOR_LEN: usize = 500;

/// Compliance status of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComplianceStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Compliant")]
    Compliant,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::NotStarted => "Not Started",
            ComplianceStatus::InProgress => "In Progress",
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::NonCompliant => "Non-Compliant",
            ComplianceStatus::NotApplicable => "Not Applicable",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "Not Started" => Ok(ComplianceStatus::NotStarted),
            "In Progress" => Ok(ComplianceStatus::InProgress),
            "Compliant" => Ok(ComplianceStatus::Compliant),
            "Non-Compliant" => Ok(ComplianceStatus::NonCompliant),
            "Not Applicable" => Ok(ComplianceStatus::NotApplicable),
            other => Err(Error::Internal(format!("Invalid compliance status in database: {}", other))),
        }
    }
}

/// How often a recurring indicator must be re-evidenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "One-time")]
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneTime => "One-time",
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Annually => "Annually",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "One-time" => Ok(Frequency::OneTime),
            "Daily" => Ok(Frequency::Daily),
            "Weekly" => Ok(Frequency::Weekly),
            "Monthly" => Ok(Frequency::Monthly),
            "Quarterly" => Ok(Frequency::Quarterly),
            "Annually" => Ok(Frequency::Annually),
            other => Err(Error::Internal(format!("Invalid frequency in database: {}", other))),
        }
    }

    /// Map free-text spreadsheet values onto a frequency
    ///
    /// Case-insensitive, whitespace runs collapse to one space. Unknown text
    /// yields `None` rather than an error.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        let key = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match key.as_str() {
            "one time" | "one-time" | "onetime" => Some(Frequency::OneTime),
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "quarterly" => Some(Frequency::Quarterly),
            "annually" | "annual" | "yearly" => Some(Frequency::Annually),
            _ => None,
        }
    }
}

/// Which completeness rule applies to an indicator's evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorEvidenceType {
    /// Needs an accepted note/document with content
    #[default]
    Text,
    /// Needs an accepted item linked to a stored file
    File,
    /// Needs accepted evidence for the recurring cycle
    Frequency,
}

impl IndicatorEvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorEvidenceType::Text => "text",
            IndicatorEvidenceType::File => "file",
            IndicatorEvidenceType::Frequency => "frequency",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "text" => Ok(IndicatorEvidenceType::Text),
            "file" => Ok(IndicatorEvidenceType::File),
            "frequency" => Ok(IndicatorEvidenceType::Frequency),
            other => Err(Error::Internal(format!("Invalid evidence type in database: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    #[default]
    OneTime,
    Recurring,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::OneTime => "one_time",
            ScheduleType::Recurring => "recurring",
        }
    }

    pub fn from_db(raw: &str) -> Result<Self> {
        match raw {
            "one_time" => Ok(ScheduleType::OneTime),
            "recurring" => Ok(ScheduleType::Recurring),
            other => Err(Error::Internal(format!("Invalid schedule type in database: {}", other))),
        }
    }
}

/// Compliance checklist item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: Uuid,
    pub project_id: Uuid,
    pub section: String,
    pub standard: String,
    /// Indicator text as written in the checklist
    pub indicator: String,
    pub description: String,
    pub score: i64,
    pub responsible_person: Option<String>,
    pub assignee: Option<String>,
    pub frequency: Option<Frequency>,
    pub status: ComplianceStatus,
    pub notes: Option<String>,
    /// Last time the indicator was marked compliant
    pub last_updated: Option<DateTime<Utc>>,
    pub evidence_type: IndicatorEvidenceType,
    pub schedule_type: ScheduleType,
    pub next_due_date: Option<NaiveDate>,
    /// Deterministic import key; filled on first persist when absent
    pub indicator_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Indicator {
    /// New indicator with default score/status and no key yet
    pub fn new(
        project_id: Uuid,
        section: impl Into<String>,
        standard: impl Into<String>,
        indicator: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            section: section.into(),
            standard: standard.into(),
            indicator: indicator.into(),
            description: String::new(),
            score: DEFAULT_SCORE,
            responsible_person: None,
            assignee: None,
            frequency: None,
            status: ComplianceStatus::default(),
            notes: None,
            last_updated: None,
            evidence_type: IndicatorEvidenceType::default(),
            schedule_type: ScheduleType::default(),
            next_due_date: None,
            indicator_key: None,
            created_at: Utc::now(),
        }
    }

    /// Key this indicator would get from its identifying fields
    pub fn computed_key(&self) -> String {
        derive_key(&self.project_id, &self.section, &self.standard, &self.indicator)
    }

    /// Fill `indicator_key` if it has never been set; an existing key is kept
    pub fn ensure_key(&mut self) -> &str {
        if self.indicator_key.is_none() {
            self.indicator_key = Some(self.computed_key());
        }
        self.indicator_key.as_deref().unwrap_or_default()
    }

    pub fn is_recurring(&self) -> bool {
        self.schedule_type == ScheduleType::Recurring
    }
}

/// Length problem in the identifying fields, if any
pub fn identity_length_error(section: &str, standard: &str, indicator: &str) -> Option<String> {
    let too_long = |value: &str, max: usize| value.chars().count() > max;

    if too_long(section, MAX_SECTION_LEN) {
        Some(format!("Section exceeds {} characters", MAX_SECTION_LEN))
    } else if too_long(standard, MAX_STANDARD_LEN) {
        Some(format!("Standard exceeds {} characters", MAX_STANDARD_LEN))
    } else if too_long(indicator, MAX_INDICATOR_LEN) {
        Some(format!("Indicator exceeds {} characters", MAX_INDICATOR_LEN))
    } else {
        None
    }
}

/// Request body for creating one indicator directly
#[derive(Debug, Clone, Deserialize)]
pub struct NewIndicator {
    pub section: String,
    pub standard: String,
    pub indicator: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub responsible_person: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub evidence_type: IndicatorEvidenceType,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl NewIndicator {
    /// Section, standard and indicator text are required and length-bounded
    pub fn validate(&self) -> Result<()> {
        if self.section.trim().is_empty()
            || self.standard.trim().is_empty()
            || self.indicator.trim().is_empty()
        {
            return Err(Error::Validation(
                "Section, standard and indicator are required".to_string(),
            ));
        }
        match identity_length_error(self.section.trim(), self.standard.trim(), self.indicator.trim()) {
            Some(message) => Err(Error::Validation(message)),
            None => Ok(()),
        }
    }

    /// Unsaved indicator without a key; the key is filled on insert
    pub fn into_indicator(self, project_id: Uuid) -> Indicator {
        let mut indicator = Indicator::new(
            project_id,
            self.section.trim(),
            self.standard.trim(),
            self.indicator.trim(),
        );
        indicator.description = self.description;
        indicator.score = self.score.unwrap_or(DEFAULT_SCORE);
        indicator.responsible_person = self.responsible_person;
        indicator.assignee = self.assignee;
        indicator.frequency = self.frequency;
        indicator.notes = self.notes;
        indicator.evidence_type = self.evidence_type;
        indicator.schedule_type = self.schedule_type;
        indicator.next_due_date = self.next_due_date;
        indicator
    }
}

/// Partial edit of an indicator
///
/// Identifying fields are not editable here. `Compliant` cannot be set
/// directly; completion goes through the evidence gate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorPatch {
    pub status: Option<ComplianceStatus>,
    pub evidence_type: Option<IndicatorEvidenceType>,
    pub schedule_type: Option<ScheduleType>,
    pub frequency: Option<Frequency>,
    pub next_due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub score: Option<i64>,
    pub responsible_person: Option<String>,
    pub assignee: Option<String>,
    pub notes: Option<String>,
}

impl IndicatorPatch {
    pub fn validate(&self) -> Result<()> {
        if self.status == Some(ComplianceStatus::Compliant) {
            return Err(Error::Validation(
                "Compliant status is set by completing the indicator".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply every present field; true if anything changed
    pub fn apply_to(&self, indicator: &mut Indicator) -> bool {
        fn set<T: PartialEq + Clone>(target: &mut T, incoming: &Option<T>) -> bool {
            match incoming {
                Some(value) if target != value => {
                    *target = value.clone();
                    true
                }
                _ => false,
            }
        }
        fn set_opt<T: PartialEq + Clone>(target: &mut Option<T>, incoming: &Option<T>) -> bool {
            match incoming {
                Some(value) if target.as_ref() != Some(value) => {
                    *target = Some(value.clone());
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;
        changed |= set(&mut indicator.status, &self.status);
        changed |= set(&mut indicator.evidence_type, &self.evidence_type);
        changed |= set(&mut indicator.schedule_type, &self.schedule_type);
        changed |= set(&mut indicator.description, &self.description);
        changed |= set(&mut indicator.score, &self.score);
        changed |= set_opt(&mut indicator.frequency, &self.frequency);
        changed |= set_opt(&mut indicator.next_due_date, &self.next_due_date);
        changed |= set_opt(&mut indicator.responsible_person, &self.responsible_person);
        changed |= set_opt(&mut indicator.assignee, &self.assignee);
        changed |= set_opt(&mut indicator.notes, &self.notes);
        changed
    }
}
