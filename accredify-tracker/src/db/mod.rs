//! Repository layer
//!
//! Free async functions over `&mut SqliteConnection`, so the same call works
//! on a pooled connection or inside a transaction. UUIDs and timestamps are
//! stored as text.

pub mod evidence;
pub mod indicators;
pub mod projects;

use accredify_common::{Error, Result};
use uuid::Uuid;

/// Parse a UUID column value
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Invalid UUID in database '{}': {}", raw, e)))
}
