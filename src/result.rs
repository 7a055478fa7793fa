use std::fmt;

use foldhash::HashMap;

use crate::semantic::{Qualifier, SemanticType};

/// The outcome of an analysis: a read-only snapshot of everything inferred
/// about the stream so far. Produced by [`crate::Profiler::result`]; safe
/// to hold across further training.
#[derive(Debug, Clone)]
pub struct ProfileResult {
    pub(crate) name: String,
    pub(crate) semantic_type: SemanticType,
    pub(crate) type_qualifier: Option<Qualifier>,
    pub(crate) pattern: String,
    pub(crate) format_string: Option<String>,
    pub(crate) sample_count: u64,
    pub(crate) match_count: u64,
    pub(crate) null_count: u64,
    pub(crate) blank_count: u64,
    pub(crate) leading_zero_count: u64,
    pub(crate) confidence: f64,
    pub(crate) min_value: Option<String>,
    pub(crate) max_value: Option<String>,
    pub(crate) sum: Option<String>,
    pub(crate) min_raw_length: usize,
    pub(crate) max_raw_length: usize,
    pub(crate) cardinality: HashMap<String, u64>,
    pub(crate) outliers: HashMap<String, u64>,
    pub(crate) is_key: bool,
}

impl ProfileResult {
    /// Name of the profiled stream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inferred semantic type.
    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    /// The qualifier refining the semantic type, if any.
    pub fn type_qualifier(&self) -> Option<Qualifier> {
        self.type_qualifier
    }

    /// The shape / regular expression the samples conform to.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The date/time format string, for temporal types.
    pub fn format_string(&self) -> Option<&str> {
        self.format_string.as_deref()
    }

    /// Total samples observed, including nulls and blanks.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Samples that validated against the inferred type.
    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn blank_count(&self) -> u64 {
        self.blank_count
    }

    /// Count of integer samples carrying a leading zero.
    pub fn leading_zero_count(&self) -> u64 {
        self.leading_zero_count
    }

    /// Quality signal in [0, 1]: match_count over real samples.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Minimum observed value, rendered via the inferred format for dates
    /// and as numeric text otherwise. None when statistics are disabled.
    pub fn min_value(&self) -> Option<&str> {
        self.min_value.as_deref()
    }

    /// Maximum observed value; see [`Self::min_value`].
    pub fn max_value(&self) -> Option<&str> {
        self.max_value.as_deref()
    }

    /// Sum of the samples, for numeric types.
    pub fn sum(&self) -> Option<&str> {
        self.sum.as_deref()
    }

    pub fn min_raw_length(&self) -> usize {
        self.min_raw_length
    }

    pub fn max_raw_length(&self) -> usize {
        self.max_raw_length
    }

    /// Distinct valid values and their counts (raw keys, capped).
    pub fn cardinality(&self) -> &HashMap<String, u64> {
        &self.cardinality
    }

    /// Distinct invalid values and their counts (capped).
    pub fn outliers(&self) -> &HashMap<String, u64> {
        &self.outliers
    }

    /// Sum of the outlier counts.
    pub fn outlier_count(&self) -> u64 {
        self.outliers.values().sum()
    }

    /// Whether the stream looks like a unique key for its source.
    pub fn is_key(&self) -> bool {
        self.is_key
    }
}

impl fmt::Display for ProfileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: type={}{}, pattern={}, samples={}, matches={}, nulls={}, blanks={}, \
             cardinality={}, outliers={}, confidence={:.2}",
            self.name,
            self.semantic_type,
            self.type_qualifier
                .map(|q| format!("({q})"))
                .unwrap_or_default(),
            self.pattern,
            self.sample_count,
            self.match_count,
            self.null_count,
            self.blank_count,
            self.cardinality.len(),
            self.outliers.len(),
            self.confidence,
        )?;
        if let (Some(min), Some(max)) = (&self.min_value, &self.max_value) {
            write!(f, ", min={min}, max={max}")?;
        }
        if let Some(format) = &self.format_string {
            write!(f, ", format={format}")?;
        }
        if self.is_key {
            write!(f, ", key-candidate")?;
        }
        Ok(())
    }
}
