/// Resolution strategy for ambiguous day/month ordering.
///
/// A date such as `2/12/98` does not reveal which field is the day and
/// which the month; the format detector emits `?` placeholders for the
/// undecided positions. The resolution mode controls whether and how the
/// placeholders are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Assume the day precedes the month (e.g. 31/12/2023).
    DayFirst,
    /// Assume the month precedes the day (e.g. 12/31/2023).
    MonthFirst,
    /// Resolve according to the configured locale's convention.
    #[default]
    Auto,
    /// Leave placeholders in the derived format.
    None,
}

impl ResolutionMode {
    /// Resolve to a concrete day-first flag, or None to keep placeholders.
    pub fn day_first(&self, locale_day_first: bool) -> Option<bool> {
        match self {
            ResolutionMode::DayFirst => Some(true),
            ResolutionMode::MonthFirst => Some(false),
            ResolutionMode::Auto => Some(locale_day_first),
            ResolutionMode::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_first_resolution() {
        assert_eq!(ResolutionMode::DayFirst.day_first(false), Some(true));
        assert_eq!(ResolutionMode::MonthFirst.day_first(true), Some(false));
        assert_eq!(ResolutionMode::Auto.day_first(true), Some(true));
        assert_eq!(ResolutionMode::Auto.day_first(false), Some(false));
        assert_eq!(ResolutionMode::None.day_first(true), None);
    }
}
