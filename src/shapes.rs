//! Character classification and shape compression.
//!
//! Every trimmed sample is folded into three increasingly general shape
//! strings. Level 0 keeps exact run lengths (`\d{4}-\d{2}-\d{2}`), level 1
//! collapses them (`\d+-\d+-\d+`) or substitutes a registered general
//! pattern, and level 2 is the broadest plausible shape. Numeric samples
//! short-circuit levels 1 and 2 to their lattice patterns.

use crate::locale::Locale;
use crate::numeric::NumericShape;
use crate::patterns::{PatternRegistry, ALPHA_PATTERN, ANY_PATTERN};

/// Coarse class of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Digit,
    Alpha,
    DecimalSeparator,
    GroupingSeparator,
    Minus,
    Other(char),
}

/// Map one character to its class under the given locale symbols.
pub fn classify(ch: char, locale: &Locale) -> CharClass {
    if ch == locale.minus_sign {
        CharClass::Minus
    } else if ch.is_ascii_digit() {
        CharClass::Digit
    } else if ch == locale.decimal_separator {
        CharClass::DecimalSeparator
    } else if ch == locale.grouping_separator {
        CharClass::GroupingSeparator
    } else if ch.is_alphabetic() {
        CharClass::Alpha
    } else {
        CharClass::Other(ch)
    }
}

/// Everything the profiler learns from one sample in a single pass.
#[derive(Debug, Clone)]
pub struct SampleFacts {
    /// Exact run-length shape.
    pub level0: String,
    /// Collapsed / generalized shape.
    pub level1: String,
    /// Most general shape.
    pub level2: String,
    /// Count of ASCII digits.
    pub digits: usize,
    /// Count of alphabetic characters.
    pub alphas: usize,
    /// Count of '@' characters.
    pub at_signs: usize,
    /// Count of ',' characters (including separator roles).
    pub commas: usize,
    /// Count of ';' characters.
    pub semicolons: usize,
    /// The numeric lattice point, when the sample is numeric.
    pub numeric_shape: Option<NumericShape>,
}

/// Fold a trimmed, non-empty sample into its shape triple and facts.
pub fn analyze(trimmed: &str, locale: &Locale) -> SampleFacts {
    let mut classes: Vec<char> = Vec::with_capacity(trimmed.len());
    let mut digits = 0usize;
    let mut alphas = 0usize;
    let mut at_signs = 0usize;
    let mut commas = 0usize;
    let mut semicolons = 0usize;

    for (i, ch) in trimmed.chars().enumerate() {
        match classify(ch, locale) {
            // A leading minus marks the sample signed and stays out of the shape
            CharClass::Minus if i == 0 => {}
            CharClass::Minus | CharClass::Other(_) => {
                match ch {
                    '@' => at_signs += 1,
                    ',' => commas += 1,
                    ';' => semicolons += 1,
                    _ => {}
                }
                classes.push(ch);
            }
            CharClass::Digit => {
                classes.push('d');
                digits += 1;
            }
            CharClass::DecimalSeparator => {
                classes.push('D');
                if locale.decimal_separator == ',' {
                    commas += 1;
                }
            }
            CharClass::GroupingSeparator => {
                classes.push('G');
                if locale.grouping_separator == ',' {
                    commas += 1;
                }
            }
            CharClass::Alpha => {
                classes.push('a');
                alphas += 1;
            }
        }
    }

    let level0 = if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        "(?i)true|false".to_string()
    } else if trimmed.eq_ignore_ascii_case("yes") || trimmed.eq_ignore_ascii_case("no") {
        "(?i)yes|no".to_string()
    } else {
        compress_runs(&classes)
    };

    let numeric_shape = classify_numeric(trimmed, locale);

    let (level1, level2) = if let Some(shape) = numeric_shape {
        (
            shape.pattern().to_string(),
            shape.signed_form().pattern().to_string(),
        )
    } else {
        let level1 = match PatternRegistry::get()
            .structural(&level0)
            .and_then(|info| info.general_pattern.clone())
        {
            Some(general) => general,
            None => collapse_counts(&level0),
        };

        let char_count = classes.len();
        let level2 = if digits > 0 && alphas > 0 && digits + alphas == char_count {
            format!("\\p{{Alnum}}{{{char_count}}}")
        } else if alphas > 0 {
            ALPHA_PATTERN.to_string()
        } else {
            ANY_PATTERN.to_string()
        };
        (level1, level2)
    };

    SampleFacts {
        level0,
        level1,
        level2,
        digits,
        alphas,
        at_signs,
        commas,
        semicolons,
        numeric_shape,
    }
}

/// Collapse runs of `d`/`a` classes into counted character classes; other
/// classes are copied through verbatim.
fn compress_runs(classes: &[char]) -> String {
    let mut out = String::with_capacity(classes.len() + 8);
    let mut i = 0;
    while i < classes.len() {
        let ch = classes[i];
        let mut run = 1;
        while i + run < classes.len() && classes[i + run] == ch {
            run += 1;
        }
        match ch {
            'd' => {
                out.push_str("\\d{");
                out.push_str(&run.to_string());
                out.push('}');
            }
            'a' => {
                out.push_str("\\p{Alpha}{");
                out.push_str(&run.to_string());
                out.push('}');
            }
            _ => {
                for _ in 0..run {
                    out.push(ch);
                }
            }
        }
        i += run;
    }
    out
}

/// Replace every `{n}` run count with `+`, e.g. `\d{4}-\d{2}` to `\d+-\d+`.
/// Named-class braces like `\p{Alpha}` start with a letter and pass through.
fn collapse_counts(shape: &str) -> String {
    let chars: Vec<char> = shape.chars().collect();
    let mut out = String::with_capacity(shape.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            while i < chars.len() && chars[i] != '}' {
                i += 1;
            }
            i += 1;
            out.push('+');
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Is this sample numeric, and which lattice point does it occupy?
///
/// Accepts `[minus] digits [grouped digits]* [dsep digits] [e[+-]digits]`
/// and the bare-fraction form `.5`. Grouping separators are only legal in
/// the integer part. A lone exponent with no mantissa digits is not
/// numeric.
pub fn classify_numeric(trimmed: &str, locale: &Locale) -> Option<NumericShape> {
    let mut chars = trimmed.chars().peekable();
    let mut signed = false;
    let mut decimal = false;
    let mut exponent = false;
    let mut digits_seen = 0usize;
    let mut exponent_digits = 0usize;

    if chars.peek() == Some(&locale.minus_sign) {
        signed = true;
        chars.next();
    }

    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            chars.next();
            if exponent {
                exponent_digits += 1;
            } else {
                digits_seen += 1;
            }
        } else if ch == locale.decimal_separator && !decimal && !exponent {
            decimal = true;
            chars.next();
        } else if ch == locale.grouping_separator && !decimal && !exponent && digits_seen > 0 {
            chars.next();
        } else if (ch == 'e' || ch == 'E') && digits_seen > 0 && !exponent {
            exponent = true;
            chars.next();
            if let Some(&sign) = chars.peek() {
                if sign == '+' || sign == '-' {
                    chars.next();
                }
            }
        } else {
            return None;
        }
    }

    if digits_seen == 0 || (exponent && exponent_digits == 0) {
        return None;
    }

    Some(NumericShape {
        signed,
        decimal: decimal || exponent,
        exponent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(input: &str) -> SampleFacts {
        analyze(input, &Locale::en_us())
    }

    #[test]
    fn test_level0_run_lengths() {
        assert_eq!(facts("2010-01-22").level0, "\\d{4}-\\d{2}-\\d{2}");
        assert_eq!(facts("hello").level0, "\\p{Alpha}{5}");
        assert_eq!(facts("hello world").level0, "\\p{Alpha}{5} \\p{Alpha}{5}");
        assert_eq!(facts("AB12").level0, "\\p{Alpha}{2}\\d{2}");
    }

    #[test]
    fn test_boolean_special_cases() {
        assert_eq!(facts("true").level0, "(?i)true|false");
        assert_eq!(facts("FALSE").level0, "(?i)true|false");
        assert_eq!(facts("Yes").level0, "(?i)yes|no");
        assert_eq!(facts("no").level0, "(?i)yes|no");
    }

    #[test]
    fn test_numeric_levels() {
        let long = facts("12345");
        assert_eq!(long.level1, "\\d+");
        assert_eq!(long.level2, "-?\\d+");
        assert_eq!(long.numeric_shape, Some(NumericShape::LONG));

        let signed = facts("-123");
        assert_eq!(signed.level1, "-?\\d+");
        assert_eq!(signed.numeric_shape, Some(NumericShape::SIGNED_LONG));

        let double = facts("3.14");
        assert_eq!(double.level1, "\\.\\d+|\\d+(\\.\\d+)?");
        assert_eq!(double.numeric_shape, Some(NumericShape::DOUBLE));

        let fraction = facts(".5");
        assert_eq!(fraction.numeric_shape, Some(NumericShape::DOUBLE));

        let exp = facts("1.5e10");
        assert_eq!(exp.numeric_shape, Some(NumericShape::DOUBLE_EXPONENT));
        assert_eq!(
            facts("-2E-5").numeric_shape,
            Some(NumericShape::SIGNED_DOUBLE_EXPONENT)
        );
    }

    #[test]
    fn test_grouped_digits_stay_numeric() {
        // The shape walk treats grouping separators as numeric texture;
        // actual validation happens later at parse time
        let grouped = facts("1,234");
        assert_eq!(grouped.level0, "\\d{1}G\\d{3}");
        assert_eq!(grouped.numeric_shape, Some(NumericShape::LONG));
    }

    #[test]
    fn test_not_numeric() {
        assert_eq!(facts("12a4").numeric_shape, None);
        assert_eq!(facts("1.2.3").numeric_shape, None);
        assert_eq!(facts("e10").numeric_shape, None);
        assert_eq!(facts("1e").numeric_shape, None);
        assert_eq!(facts("--1").numeric_shape, None);
    }

    #[test]
    fn test_level1_collapse() {
        assert_eq!(facts("2010-01-22").level1, "\\d+-\\d+-\\d+");
        assert_eq!(facts("hello world").level1, "\\p{Alpha}+ \\p{Alpha}+");
    }

    #[test]
    fn test_level2_ladder() {
        assert_eq!(facts("AB12").level2, "\\p{Alnum}{4}");
        assert_eq!(facts("hello").level2, "\\p{Alpha}+");
        assert_eq!(facts("hello world").level2, "\\p{Alpha}+");
        assert_eq!(facts("2010-01-22").level2, ".+");
        assert_eq!(facts("12345").level2, "-?\\d+");
    }

    #[test]
    fn test_email_facts() {
        let email = facts("fred@flintstone.com");
        assert_eq!(email.at_signs, 1);
        assert_eq!(email.commas, 0);
        let list = facts("fred@a.com, barney@b.com");
        assert_eq!(list.at_signs, 2);
        assert_eq!(list.commas, 1);
    }
}
