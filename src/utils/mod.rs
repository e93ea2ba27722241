//! Shared utility functions.
//!
//! - `format`: Human-readable formatting (sizes, counts, durations)

mod format;

pub use format::{format_duration, format_number, format_size, truncate_string};
