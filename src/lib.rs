//! field-nose: streaming field-type profiler
//!
//! Analyzes a stream of textual values - typically one column of a tabular
//! source - and infers its semantic type (boolean, integer, floating point,
//! date/time family, or text), a regular-expression shape, value extremes,
//! cardinality and outlier sets, a confidence score, and logical-type tags
//! such as ZIP code, US state, country, month abbreviation, email, or URL.
//! Designed to sit in-line with ingestion: training a sample is a handful
//! of character-class comparisons, and the heavier determination work runs
//! once per stream when the sample window fills.
//!
//! # Quick Start
//!
//! ```
//! use field_nose::Profiler;
//!
//! let mut profiler = Profiler::new("BirthDate");
//! for sample in ["22-01-2010", "12-01-2019", "02-01-1996", "14-01-2000"] {
//!     profiler.train(Some(sample));
//! }
//!
//! let result = profiler.result();
//! assert_eq!(result.pattern(), "\\d{2}-\\d{2}-\\d{4}");
//! assert_eq!(result.format_string(), Some("dd-MM-yyyy"));
//! ```
//!
//! # Date/Time handling
//!
//! Formats are inferred per sample (`yyyy-MM-dd'T'HH:mm:ssxxx`,
//! `MM/dd/yyyy HH:mm:ss z`, ...) and validated by a lock-step walker,
//! not a general-purpose date library. Ambiguous day/month orderings
//! surface as `?` placeholders and can be forced either way - see
//! [`ResolutionMode`].

mod config;
pub mod dates;
mod error;
mod locale;
mod numeric;
mod patterns;
mod profiler;
mod reference;
mod result;
mod shapes;
mod semantic;

// Public API
pub use config::ResolutionMode;
pub use error::{ProfilerError, Result};
pub use locale::Locale;
pub use profiler::{Profiler, MAX_CARDINALITY_DEFAULT, MAX_OUTLIERS_DEFAULT, SAMPLE_DEFAULT};
pub use result::ProfileResult;
pub use semantic::{Qualifier, SemanticType};

// For advanced usage: direct access to the format machinery
pub use dates::{determine_format_string, DateTimeDetector, DateTimeFormat, ParseFailure};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api() {
        let _profiler = Profiler::new("column");
        let _mode = ResolutionMode::DayFirst;
        let _locale = Locale::en_us();
        let _type = SemanticType::Long;
        let _qualifier = Qualifier::Zip;
        assert_eq!(SAMPLE_DEFAULT, 20);
        assert_eq!(MAX_CARDINALITY_DEFAULT, 500);
        assert_eq!(MAX_OUTLIERS_DEFAULT, 50);
    }

    #[test]
    fn test_quick_profile() {
        let mut profiler = Profiler::new("age");
        for sample in ["12", "62", "21", "37"] {
            profiler.train(Some(sample));
        }
        let result = profiler.result();
        assert_eq!(result.semantic_type(), SemanticType::Long);
        assert_eq!(result.sample_count(), 4);
    }
}
