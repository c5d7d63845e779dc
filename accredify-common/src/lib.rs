//! # AccrediFy Common Library
//!
//! Shared code for the AccrediFy compliance tracker:
//! - Error taxonomy used by every service
//! - Configuration loading and root folder resolution
//! - Database initialization (schema creation, pragmas)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
