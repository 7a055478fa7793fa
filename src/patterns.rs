//! The immutable pattern registry and syntax checks.
//!
//! Structural patterns are keyed by their shape string and map an L0/L1/L2
//! shape to a semantic type. Logical types are keyed by (type, qualifier)
//! and provide the pattern reported once a reference-set test succeeds.

use std::sync::LazyLock;

use foldhash::{HashMap, HashMapExt};
use regex::Regex;

use crate::numeric::{
    DOUBLE_EXPONENT_PATTERN, DOUBLE_PATTERN, LONG_PATTERN, SIGNED_DOUBLE_EXPONENT_PATTERN,
    SIGNED_DOUBLE_PATTERN, SIGNED_LONG_PATTERN,
};
use crate::semantic::{Qualifier, SemanticType};

/// Pattern for a run of letters of any length.
pub const ALPHA_PATTERN: &str = "\\p{Alpha}+";
/// Pattern for a run of letters and digits of any length.
pub const ALNUM_PATTERN: &str = "\\p{Alnum}+";
/// The most general pattern: anything non-empty.
pub const ANY_PATTERN: &str = ".+";

/// Description of one registered pattern.
#[derive(Debug, Clone)]
pub struct PatternInfo {
    /// The shape / regular expression reported for this pattern.
    pub pattern: String,
    /// Base semantic type.
    pub semantic_type: SemanticType,
    /// Optional refinement.
    pub qualifier: Option<Qualifier>,
    /// Minimum trimmed length for a valid sample, if bounded.
    pub min_length: Option<usize>,
    /// Maximum trimmed length for a valid sample, if bounded.
    pub max_length: Option<usize>,
    /// More general pattern substituted at shape level 1, when defined.
    pub general_pattern: Option<String>,
    /// Date/time format string, for temporal patterns.
    pub format: Option<String>,
}

impl PatternInfo {
    pub fn new(pattern: impl Into<String>, semantic_type: SemanticType) -> Self {
        PatternInfo {
            pattern: pattern.into(),
            semantic_type,
            qualifier: None,
            min_length: None,
            max_length: None,
            general_pattern: None,
            format: None,
        }
    }

    fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    fn bounded(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    /// Is the base type of this pattern numeric?
    pub fn is_numeric(&self) -> bool {
        self.semantic_type.is_numeric()
    }
}

/// The registry of known patterns.
#[derive(Debug)]
pub struct PatternRegistry {
    structural: HashMap<&'static str, PatternInfo>,
    logical: HashMap<(SemanticType, Qualifier), PatternInfo>,
}

static REGISTRY: LazyLock<PatternRegistry> = LazyLock::new(|| {
    let mut structural = HashMap::new();
    let mut add = |pattern: &'static str, info: PatternInfo| {
        structural.insert(pattern, info);
    };

    add(
        "(?i)true|false",
        PatternInfo::new("(?i)true|false", SemanticType::Boolean).bounded(4, 5),
    );
    add(
        "(?i)yes|no",
        PatternInfo::new("(?i)yes|no", SemanticType::Boolean).bounded(2, 3),
    );
    add("[0|1]", PatternInfo::new("[0|1]", SemanticType::Boolean));

    add(
        "\\p{Alpha}{2}",
        PatternInfo::new("\\p{Alpha}{2}", SemanticType::String).bounded(2, 2),
    );
    add(
        "\\p{Alpha}{3}",
        PatternInfo::new("\\p{Alpha}{3}", SemanticType::String).bounded(3, 3),
    );
    add(ALPHA_PATTERN, PatternInfo::new(ALPHA_PATTERN, SemanticType::String));
    add(ALNUM_PATTERN, PatternInfo::new(ALNUM_PATTERN, SemanticType::String));
    add(ANY_PATTERN, PatternInfo::new(ANY_PATTERN, SemanticType::String));

    add(LONG_PATTERN, PatternInfo::new(LONG_PATTERN, SemanticType::Long));
    add(
        SIGNED_LONG_PATTERN,
        PatternInfo::new(SIGNED_LONG_PATTERN, SemanticType::Long).qualified(Qualifier::Signed),
    );
    add(DOUBLE_PATTERN, PatternInfo::new(DOUBLE_PATTERN, SemanticType::Double));
    add(
        SIGNED_DOUBLE_PATTERN,
        PatternInfo::new(SIGNED_DOUBLE_PATTERN, SemanticType::Double).qualified(Qualifier::Signed),
    );
    add(
        DOUBLE_EXPONENT_PATTERN,
        PatternInfo::new(DOUBLE_EXPONENT_PATTERN, SemanticType::Double),
    );
    add(
        SIGNED_DOUBLE_EXPONENT_PATTERN,
        PatternInfo::new(SIGNED_DOUBLE_EXPONENT_PATTERN, SemanticType::Double)
            .qualified(Qualifier::Signed),
    );

    let mut logical = HashMap::new();
    let mut add_logical = |semantic_type: SemanticType, qualifier: Qualifier, pattern: &str| {
        logical.insert(
            (semantic_type, qualifier),
            PatternInfo::new(pattern, semantic_type).qualified(qualifier),
        );
    };

    add_logical(SemanticType::String, Qualifier::Null, "[NULL]");
    add_logical(SemanticType::String, Qualifier::Blank, "[ ]*");
    add_logical(SemanticType::String, Qualifier::BlankOrNull, "[NULL]|[ ]*");
    add_logical(SemanticType::Long, Qualifier::Zip, "\\d{5}");
    add_logical(SemanticType::String, Qualifier::NaState, "\\p{Alpha}{2}");
    add_logical(SemanticType::String, Qualifier::UsState, "\\p{Alpha}{2}");
    add_logical(SemanticType::String, Qualifier::CaProvince, "\\p{Alpha}{2}");
    add_logical(SemanticType::String, Qualifier::Country, ".+");
    add_logical(SemanticType::String, Qualifier::MonthAbbr, "\\p{Alpha}{3}");
    add_logical(SemanticType::String, Qualifier::Gender, "(?i)(F|M|FEMALE|MALE)");
    add_logical(SemanticType::String, Qualifier::Email, ".+");
    add_logical(SemanticType::String, Qualifier::Url, ".+");
    add_logical(SemanticType::String, Qualifier::Address, ".+");

    PatternRegistry { structural, logical }
});

impl PatternRegistry {
    /// The process-wide registry.
    pub fn get() -> &'static PatternRegistry {
        &REGISTRY
    }

    /// Look up a structural pattern by its shape string.
    pub fn structural(&self, pattern: &str) -> Option<&PatternInfo> {
        self.structural.get(pattern)
    }

    /// Look up a logical type by its (type, qualifier) key.
    pub fn logical(&self, semantic_type: SemanticType, qualifier: Qualifier) -> Option<&PatternInfo> {
        self.logical.get(&(semantic_type, qualifier))
    }
}

/// Email syntax. Deliberately pragmatic: a local part, an `@`, and a dotted
/// domain. The profiler needs a stable 90% vote, not RFC 5321 fidelity.
static EMAIL_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email pattern")
});

/// URL syntax: scheme://non-space-remainder.
static URL_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?|ftp)://[^\s/$.?#].[^\s]*$").expect("Invalid URL pattern")
});

/// Validate an email address, or a `,`/`;`-separated list of them.
pub fn is_valid_email(input: &str) -> bool {
    // Address lists commonly use ';' as the separator instead of ','
    let normalized = input.replace(';', ",");
    let mut seen = false;
    for part in normalized.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return false;
        }
        if !EMAIL_SYNTAX.is_match(part) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Validate a URL.
pub fn is_valid_url(input: &str) -> bool {
    URL_SYNTAX.is_match(input.trim())
}
