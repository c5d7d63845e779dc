//! Utility modules for accredify-tracker

pub mod pool_monitor;

pub use pool_monitor::{begin_monitored, MonitoredTransaction};
