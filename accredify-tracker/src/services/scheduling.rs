//! Due-date scheduling for recurring indicators

use chrono::{Days, Months, NaiveDate};

use crate::models::Frequency;

/// Computes the next due date after a completion
pub trait DueDateScheduler: Send + Sync {
    /// `None` for one-time work; otherwise a date strictly after `from`
    fn next_due_date(&self, frequency: Frequency, from: NaiveDate) -> Option<NaiveDate>;
}

/// Plain calendar arithmetic
///
/// Month steps clamp to the last day of shorter months (Jan 31 + 1 month =
/// Feb 28/29).
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarScheduler;

impl DueDateScheduler for CalendarScheduler {
    fn next_due_date(&self, frequency: Frequency, from: NaiveDate) -> Option<NaiveDate> {
        match frequency {
            Frequency::OneTime => None,
            Frequency::Daily => from.checked_add_days(Days::new(1)),
            Frequency::Weekly => from.checked_add_days(Days::new(7)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
            Frequency::Quarterly => from.checked_add_months(Months::new(3)),
            Frequency::Annually => from.checked_add_months(Months::new(12)),
        }
    }
}
