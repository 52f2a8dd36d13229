//! Utility functions for string formatting and device description.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{device_type, format_date, format_optional, truncate_string};
