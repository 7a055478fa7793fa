use std::fmt;

/// Semantic type inferred for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SemanticType {
    /// Boolean value (true/false or yes/no pairs).
    Boolean,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point number.
    Double,
    /// Calendar date without a time component.
    LocalDate,
    /// Wall-clock time without a date component.
    LocalTime,
    /// Date with time, no zone information.
    LocalDateTime,
    /// Date with time and a named time zone.
    ZonedDateTime,
    /// Date with time and a numeric UTC offset.
    OffsetDateTime,
    /// Text value (fallback type).
    #[default]
    String,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Boolean => "Boolean",
            SemanticType::Long => "Long",
            SemanticType::Double => "Double",
            SemanticType::LocalDate => "Date",
            SemanticType::LocalTime => "Time",
            SemanticType::LocalDateTime => "DateTime",
            SemanticType::ZonedDateTime => "ZonedDateTime",
            SemanticType::OffsetDateTime => "OffsetDateTime",
            SemanticType::String => "String",
        };
        write!(f, "{name}")
    }
}

impl SemanticType {
    /// Returns true if this type is numeric.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Long | SemanticType::Double)
    }

    /// Returns true if this type is a date, time, or datetime variant.
    #[inline]
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SemanticType::LocalDate
                | SemanticType::LocalTime
                | SemanticType::LocalDateTime
                | SemanticType::ZonedDateTime
                | SemanticType::OffsetDateTime
        )
    }
}

/// Refinement of a base semantic type.
///
/// Logical types (ZIP, US_STATE, ...) are determined by membership in a
/// reference set or a syntactic check; the remainder qualify the value
/// space (SIGNED) or describe degenerate streams (NULL, BLANK).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Signed,
    Zip,
    UsState,
    CaProvince,
    NaState,
    Country,
    MonthAbbr,
    Gender,
    Email,
    Url,
    Address,
    Null,
    Blank,
    BlankOrNull,
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Qualifier::Signed => "SIGNED",
            Qualifier::Zip => "ZIP",
            Qualifier::UsState => "US_STATE",
            Qualifier::CaProvince => "CA_PROVINCE",
            Qualifier::NaState => "NA_STATE",
            Qualifier::Country => "COUNTRY",
            Qualifier::MonthAbbr => "MONTHABBR",
            Qualifier::Gender => "GENDER",
            Qualifier::Email => "EMAIL",
            Qualifier::Url => "URL",
            Qualifier::Address => "ADDRESS",
            Qualifier::Null => "NULL",
            Qualifier::Blank => "BLANK",
            Qualifier::BlankOrNull => "BLANKORNULL",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(SemanticType::LocalDate.to_string(), "Date");
        assert_eq!(SemanticType::OffsetDateTime.to_string(), "OffsetDateTime");
        assert_eq!(Qualifier::Zip.to_string(), "ZIP");
        assert_eq!(Qualifier::BlankOrNull.to_string(), "BLANKORNULL");
    }

    #[test]
    fn test_classification() {
        assert!(SemanticType::Long.is_numeric());
        assert!(SemanticType::Double.is_numeric());
        assert!(!SemanticType::Boolean.is_numeric());
        assert!(SemanticType::ZonedDateTime.is_temporal());
        assert!(!SemanticType::String.is_temporal());
    }
}
