//! Core services
//!
//! Leaves first: key derivation and CSV parsing feed the reconciler; the
//! evaluator feeds the completion gate; the review workflow mutates the
//! evidence the evaluator reads.

pub mod completion_gate;
pub mod csv_reconciler;
pub mod csv_source;
pub mod enrichment;
pub mod evidence_evaluator;
pub mod indicator_catalog;
pub mod indicator_key;
pub mod review_workflow;
pub mod scheduling;

pub use completion_gate::{can_complete, mark_compliant, CompletionOutcome};
pub use csv_reconciler::CsvReconciler;
pub use csv_source::{parse_csv, CsvTable};
pub use enrichment::{
    EnrichmentError, FallbackEnricher, HttpEnricher, IndicatorSketch, OfflineEnricher, TextEnricher,
};
pub use evidence_evaluator::evaluate;
pub use indicator_key::derive_key;
pub use scheduling::{CalendarScheduler, DueDateScheduler};
