//! Date/time format inference and validation.
//!
//! Two halves: [`format`] derives format strings from raw samples, and
//! [`descriptor`] turns a format string into a cached validator.

pub mod descriptor;
pub mod format;

pub use descriptor::{DateTimeFormat, DateTimeValue, ParseFailure};
pub use format::{determine_format_string, DateTimeDetector};
