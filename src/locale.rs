//! Locale knowledge consumed by the profiler.
//!
//! Only the slivers of locale data the analysis actually needs are carried:
//! the numeric punctuation symbols, the short month names used by `MMM`
//! formats, and the day-first convention for ambiguous dates. Anything
//! richer (full number formats, long month names, eras) is out of scope.

/// Numeric symbols and calendar names for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    /// BCP 47 style tag, e.g. "en-US".
    pub tag: &'static str,
    /// Decimal separator, e.g. '.' for en-US.
    pub decimal_separator: char,
    /// Grouping (thousands) separator, e.g. ',' for en-US.
    pub grouping_separator: char,
    /// Minus sign.
    pub minus_sign: char,
    /// Short month names, January first.
    pub short_months: [&'static str; 12],
    /// Whether ambiguous dates read day-first in this locale.
    pub day_first: bool,
}

const MONTHS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTHS_DE: [&str; 12] = [
    "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
];

const MONTHS_FR: [&str; 12] = [
    "janv", "févr", "mars", "avr", "mai", "juin", "juil", "août", "sept", "oct", "nov", "déc",
];

impl Default for Locale {
    fn default() -> Self {
        Locale::en_us()
    }
}

impl Locale {
    /// United States English (the default).
    pub const fn en_us() -> Self {
        Locale {
            tag: "en-US",
            decimal_separator: '.',
            grouping_separator: ',',
            minus_sign: '-',
            short_months: MONTHS_EN,
            day_first: false,
        }
    }

    /// British English. Same symbols as en-US, day-first dates.
    pub const fn en_gb() -> Self {
        Locale {
            tag: "en-GB",
            day_first: true,
            ..Locale::en_us()
        }
    }

    /// German.
    pub const fn de_de() -> Self {
        Locale {
            tag: "de-DE",
            decimal_separator: ',',
            grouping_separator: '.',
            minus_sign: '-',
            short_months: MONTHS_DE,
            day_first: true,
        }
    }

    /// French.
    pub const fn fr_fr() -> Self {
        Locale {
            tag: "fr-FR",
            decimal_separator: ',',
            grouping_separator: ' ',
            minus_sign: '-',
            short_months: MONTHS_FR,
            day_first: true,
        }
    }

    /// One-based month number for a short month name, case-insensitive.
    pub fn month_abbreviation_offset(&self, name: &str) -> Option<u32> {
        self.short_months
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .map(|i| i as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_abbreviation_offset() {
        let locale = Locale::en_us();
        assert_eq!(locale.month_abbreviation_offset("Jan"), Some(1));
        assert_eq!(locale.month_abbreviation_offset("DEC"), Some(12));
        assert_eq!(locale.month_abbreviation_offset("jun"), Some(6));
        assert_eq!(locale.month_abbreviation_offset("Jam"), None);
        assert_eq!(locale.month_abbreviation_offset(""), None);
    }

    #[test]
    fn test_locale_symbols() {
        assert_eq!(Locale::en_us().decimal_separator, '.');
        assert_eq!(Locale::de_de().decimal_separator, ',');
        assert_eq!(Locale::de_de().grouping_separator, '.');
        assert!(!Locale::en_us().day_first);
        assert!(Locale::en_gb().day_first);
    }
}
