//! Indicator idempotency keys
//!
//! A key identifies one logical checklist row across repeated imports:
//! SHA-256 over `"{project}:{section}:{standard}:{indicator}"`, hex encoded.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the idempotency key for an indicator row
///
/// Pure and total: empty inputs still yield a valid 64-char key. Callers are
/// expected to reject empty required fields before getting here.
pub fn derive_key(project_id: &Uuid, section: &str, standard: &str, indicator: &str) -> String {
    let material = format!("{}:{}:{}:{}", project_id, section, standard, indicator);

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}
