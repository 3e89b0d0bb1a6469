//! # Utilities
//!
//! Cross-cutting support: logging setup and engine counters.

pub mod logging;
pub mod metrics;
