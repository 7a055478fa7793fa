//! Per-sample date/time format inference.
//!
//! `determine_format_string` inspects a single textual sample and, when it
//! is structurally a date, a time, or a combination, derives the format
//! pattern that describes it. Ambiguous day/month positions surface as `?`
//! placeholders unless a resolution preference is supplied. The companion
//! [`DateTimeDetector`] accumulates per-sample formats over a window and
//! merges them into a single descriptor, letting one unambiguous sample
//! resolve a window of ambiguous ones.

use foldhash::{HashMap, HashMapExt};

use crate::dates::descriptor::DateTimeFormat;
use crate::locale::Locale;
use crate::reference::ReferenceData;

/// Maximum day per month; February is leap-agnostic at 29.
const MONTH_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Digits { value: u32, width: usize },
    Alpha(String),
    Sep(char),
}

/// Split a trimmed sample into digit runs, letter runs, and separators.
/// Any character outside the date/time repertoire rejects the sample.
fn tokenize(trimmed: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = trimmed.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            let mut value: u64 = 0;
            let mut width = 0usize;
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                value = value * 10 + (d as u64 - '0' as u64);
                width += 1;
                if width > 8 {
                    return None;
                }
                chars.next();
            }
            tokens.push(Token::Digits {
                value: value as u32,
                width,
            });
        } else if ch.is_ascii_alphabetic() {
            let mut word = String::new();
            while let Some(&a) = chars.peek() {
                if !a.is_ascii_alphabetic() {
                    break;
                }
                word.push(a);
                chars.next();
            }
            tokens.push(Token::Alpha(word));
        } else if matches!(ch, ' ' | ':' | '/' | '-' | '+') {
            tokens.push(Token::Sep(ch));
            chars.next();
        } else {
            return None;
        }
    }

    Some(tokens)
}

/// Derive the format string for one sample, or None when the sample is not
/// a recognizable date/time. Total on arbitrary input: never panics.
pub fn determine_format_string(
    input: &str,
    day_first: Option<bool>,
    locale: &Locale,
) -> Option<String> {
    let trimmed = input.trim();
    let length = trimmed.chars().count();
    if !(4..=45).contains(&length) {
        return None;
    }

    let tokens = tokenize(trimmed)?;
    let format = derive_format(&tokens, locale)?;

    if let Some(first) = day_first {
        if format.contains('?') {
            let mut descriptor = DateTimeFormat::from_format(&format)?;
            descriptor.force_resolve(first);
            return Some(descriptor.format_string().to_string());
        }
    }
    Some(format)
}

fn derive_format(tokens: &[Token], locale: &Locale) -> Option<String> {
    // Locate the time block: the digit run before the first ':' through
    // the last colon-joined digit run
    let first_colon = tokens.iter().position(|t| *t == Token::Sep(':'));

    match first_colon {
        None => {
            // Date only, nothing may trail it
            derive_date(tokens, locale)
        }
        Some(ci) => {
            if ci == 0 {
                return None;
            }
            let time_start = ci - 1;
            let (time_format, time_end) = derive_time(tokens, time_start)?;

            if time_start == 0 {
                // Time first: either bare, time + date, or time + zone/offset
                if time_end == tokens.len() {
                    return Some(time_format);
                }
                if tokens.get(time_end) == Some(&Token::Sep(' ')) {
                    if let Some(zone) = derive_timezone(&tokens[time_end..]) {
                        return Some(format!("{time_format}{zone}"));
                    }
                    let date_format = derive_date(&tokens[time_end + 1..], locale)?;
                    return Some(format!("{time_format} {date_format}"));
                }
                if let Some(offset) = derive_timezone(&tokens[time_end..]) {
                    return Some(format!("{time_format}{offset}"));
                }
                return None;
            }

            // Date first, then a single space or a literal T, then the time
            let (date_format, separator) = match tokens.get(time_start - 1) {
                Some(Token::Sep(' ')) => (derive_date(&tokens[..time_start - 1], locale)?, " "),
                Some(Token::Alpha(word)) if word == "T" => {
                    (derive_date(&tokens[..time_start - 1], locale)?, "'T'")
                }
                _ => return None,
            };

            let timezone = if time_end == tokens.len() {
                String::new()
            } else {
                derive_timezone(&tokens[time_end..])?
            };

            Some(format!("{date_format}{separator}{time_format}{timezone}"))
        }
    }
}

/// Parse `D:DD` or `D:DD:DD` starting at `start`; returns the format and
/// the index just past the time block.
fn derive_time(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let (hour, hour_width) = digits(tokens.get(start)?)?;
    if hour_width > 2 || hour > 23 {
        return None;
    }

    if tokens.get(start + 1) != Some(&Token::Sep(':')) {
        return None;
    }
    let (minute, minute_width) = digits(tokens.get(start + 2)?)?;
    if minute_width != 2 || minute > 59 {
        return None;
    }

    let hours = if hour_width == 1 { "H" } else { "HH" };
    let mut end = start + 3;
    let mut format = format!("{hours}:mm");

    if tokens.get(end) == Some(&Token::Sep(':')) {
        let (second, second_width) = digits(tokens.get(end + 1)?)?;
        if second_width != 2 || second > 59 {
            return None;
        }
        format.push_str(":ss");
        end += 2;
        // A third colon means this never was a time
        if tokens.get(end) == Some(&Token::Sep(':')) {
            return None;
        }
    }

    Some((format, end))
}

/// Parse a trailing timezone: ` z` for a named zone, or an `x` form for a
/// numeric offset. The block must consume every remaining token.
fn derive_timezone(tokens: &[Token]) -> Option<String> {
    match tokens {
        [Token::Sep(' '), Token::Alpha(name)] => {
            if ReferenceData::get().is_zone_name(name) {
                Some(" z".to_string())
            } else {
                None
            }
        }
        [Token::Sep(sign), rest @ ..] if *sign == '+' || *sign == '-' => {
            let format = match rest {
                [Token::Digits { value, width: 2 }] => {
                    if *value > 18 {
                        return None;
                    }
                    "x"
                }
                [Token::Digits { value, width: 4 }] => {
                    if value / 100 > 18 || value % 100 > 59 {
                        return None;
                    }
                    "xx"
                }
                [Token::Digits { value, width: 6 }] => {
                    if value / 10_000 > 18 || value / 100 % 100 > 59 || value % 100 > 59 {
                        return None;
                    }
                    "xxxx"
                }
                [Token::Digits {
                    value: hour,
                    width: 2,
                }, Token::Sep(':'), Token::Digits {
                    value: minute,
                    width: 2,
                }] => {
                    if *hour > 18 || *minute > 59 {
                        return None;
                    }
                    "xxx"
                }
                [Token::Digits {
                    value: hour,
                    width: 2,
                }, Token::Sep(':'), Token::Digits {
                    value: minute,
                    width: 2,
                }, Token::Sep(':'), Token::Digits {
                    value: second,
                    width: 2,
                }] => {
                    if *hour > 18 || *minute > 59 || *second > 59 {
                        return None;
                    }
                    "xxxxx"
                }
                _ => return None,
            };
            Some(format.to_string())
        }
        _ => None,
    }
}

fn digits(token: &Token) -> Option<(u32, usize)> {
    match token {
        Token::Digits { value, width } => Some((*value, *width)),
        _ => None,
    }
}

/// Is (month, day) a date that can exist in some year?
fn plausible(month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && day >= 1 && day <= MONTH_DAYS[(month - 1) as usize]
}

/// Repeat a format letter to a field width.
fn letters(ch: char, width: usize) -> String {
    ch.to_string().repeat(width)
}

/// Derive the format for a pure date: three digit fields with a single
/// consistent separator, or day / month-abbreviation / year.
fn derive_date(tokens: &[Token], locale: &Locale) -> Option<String> {
    let [f0, Token::Sep(s0), f1, Token::Sep(s1), f2] = tokens else {
        return None;
    };
    if s0 != s1 || !matches!(*s0, '/' | '-' | ' ') {
        return None;
    }
    let sep = *s0;

    // Month-abbreviation form: d MMM y
    if let Token::Alpha(word) = f1 {
        let (day, day_width) = digits(f0)?;
        let (year, year_width) = digits(f2)?;
        if day_width > 2 || !matches!(year_width, 2 | 4) {
            return None;
        }
        if year_width == 4 && year == 0 {
            return None;
        }
        let month = locale.month_abbreviation_offset(word)?;
        if !plausible(month, day) {
            return None;
        }
        return Some(format!(
            "{}{sep}MMM{sep}{}",
            letters('d', day_width),
            letters('y', year_width)
        ));
    }

    let (v0, w0) = digits(f0)?;
    let (v1, w1) = digits(f1)?;
    let (v2, w2) = digits(f2)?;
    for w in [w0, w1, w2] {
        if !matches!(w, 1 | 2 | 4) {
            return None;
        }
    }
    if w1 == 4 || (w0 == 4 && w2 == 4) {
        return None;
    }

    let date = |a: String, b: String, c: String| format!("{a}{sep}{b}{sep}{c}");

    if w0 == 4 {
        // Four-digit year leads: year month day
        if v0 == 0 || !plausible(v1, v2) {
            return None;
        }
        return Some(date(
            "yyyy".to_string(),
            letters('M', w1),
            letters('d', w2),
        ));
    }

    if w2 == 4 {
        // Four-digit year trails; magnitude disambiguates the front two
        if v2 == 0 || v0 == 0 || v1 == 0 {
            return None;
        }
        return match (v0 > 12, v1 > 12) {
            (true, true) => None,
            (true, false) => {
                if !plausible(v1, v0) {
                    return None;
                }
                Some(date(letters('d', w0), letters('M', w1), "yyyy".to_string()))
            }
            (false, true) => {
                if !plausible(v0, v1) {
                    return None;
                }
                Some(date(letters('M', w0), letters('d', w1), "yyyy".to_string()))
            }
            (false, false) => Some(date(
                letters('?', w0),
                letters('?', w1),
                "yyyy".to_string(),
            )),
        };
    }

    // All fields are one or two digits; find the year
    if v1 > 31 {
        return None;
    }

    if v0 > 31 {
        // Year leads
        if v2 > 31 || !plausible(v1, v2) {
            return None;
        }
        return Some(date(letters('y', w0), letters('M', w1), letters('d', w2)));
    }

    if v2 > 31 {
        // Year trails
        if v0 == 0 || v1 == 0 {
            return None;
        }
        return match (v0 > 12, v1 > 12) {
            (true, true) => None,
            (true, false) => {
                if !plausible(v1, v0) {
                    return None;
                }
                Some(date(letters('d', w0), letters('M', w1), letters('y', w2)))
            }
            (false, true) => {
                if !plausible(v0, v1) {
                    return None;
                }
                Some(date(letters('M', w0), letters('d', w1), letters('y', w2)))
            }
            (false, false) => Some(date(letters('?', w0), letters('?', w1), letters('y', w2))),
        };
    }

    if v1 > 12 {
        // The middle field can be neither month nor year, so it is the
        // day; the year is assumed to trail
        if v0 == 0 || v0 > 12 || v2 == 0 || w2 == 1 || !plausible(v0, v1) {
            return None;
        }
        return Some(date(letters('M', w0), letters('d', w1), letters('y', w2)));
    }

    if v0 > 12 || v2 > 12 {
        // An outer field in 13..=31 could be a day or a two-digit year;
        // the year position is unknowable from this sample alone
        if w0 != 2 && w2 != 2 {
            return None;
        }
        if v1 == 0 {
            return None;
        }
        return Some(date(letters('?', w0), letters('?', w1), letters('?', w2)));
    }

    // Everything reads as a month or a day; assume the year trails
    if v0 == 0 || v1 == 0 || w2 == 1 {
        return None;
    }
    Some(date(letters('?', w0), letters('?', w1), letters('y', w2)))
}

/// Accumulates per-sample formats across a window and merges them.
#[derive(Debug)]
pub struct DateTimeDetector {
    day_first: Option<bool>,
    locale: Locale,
    /// Format -> count, in first-seen order.
    formats: Vec<(String, u32)>,
    index: HashMap<String, usize>,
    invalid: u32,
}

impl DateTimeDetector {
    pub fn new(day_first: Option<bool>, locale: Locale) -> Self {
        DateTimeDetector {
            day_first,
            locale,
            formats: Vec::new(),
            index: HashMap::new(),
            invalid: 0,
        }
    }

    /// Digest one sample; returns whether it yielded a format.
    pub fn train(&mut self, sample: &str) -> bool {
        match determine_format_string(sample, self.day_first, &self.locale) {
            Some(format) => {
                match self.index.get(&format) {
                    Some(&at) => self.formats[at].1 += 1,
                    None => {
                        self.index.insert(format.clone(), self.formats.len());
                        self.formats.push((format, 1));
                    }
                }
                true
            }
            None => {
                self.invalid += 1;
                false
            }
        }
    }

    /// The merged descriptor for everything trained so far.
    ///
    /// Formats are ranked by (count desc, first seen asc); the best format
    /// absorbs every compatible runner-up, so a single resolved sample can
    /// disambiguate a window of placeholder formats.
    pub fn result(&self) -> Option<DateTimeFormat> {
        let mut ranked: Vec<(usize, &str, u32)> = self
            .formats
            .iter()
            .enumerate()
            .map(|(at, (format, count))| (at, format.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

        let mut merged: Option<DateTimeFormat> = None;
        for (_, format, _) in &ranked {
            let Some(descriptor) = DateTimeFormat::from_format(format) else {
                continue;
            };
            merged = Some(match merged {
                None => descriptor,
                Some(best) => best.merge_refine(&descriptor).unwrap_or(best),
            });
        }

        let mut best = merged?;
        if let Some(first) = self.day_first {
            if best.format_string().contains('?') {
                best.force_resolve(first);
            }
        }
        Some(best)
    }

    /// Count of samples that produced no format.
    pub fn invalid_count(&self) -> u32 {
        self.invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intuit(input: &str) -> Option<String> {
        determine_format_string(input, None, &Locale::en_us())
    }

    #[test]
    fn test_time_only() {
        assert_eq!(intuit("9:57").as_deref(), Some("H:mm"));
        assert_eq!(intuit("12:57").as_deref(), Some("HH:mm"));
        assert_eq!(intuit("8:57:02").as_deref(), Some("H:mm:ss"));
        assert_eq!(intuit("12:57:02").as_deref(), Some("HH:mm:ss"));
        assert_eq!(intuit(":57:02"), None);
        assert_eq!(intuit("123:02"), None);
        assert_eq!(intuit("12:023"), None);
        assert_eq!(intuit("12:0"), None);
        assert_eq!(intuit("12:02:1"), None);
        assert_eq!(intuit("12:02:12:14"), None);
        assert_eq!(intuit("12::02"), None);
    }

    #[test]
    fn test_date_only() {
        assert_eq!(intuit("2/12/98").as_deref(), Some("?/??/yy"));
        assert_eq!(intuit("2/2/02").as_deref(), Some("?/?/yy"));
        assert_eq!(intuit("2/31/02"), None);
        assert_eq!(intuit("31/02/02").as_deref(), Some("??/??/??"));
        assert_eq!(intuit("14/12/98").as_deref(), Some("dd/MM/yy"));
        assert_eq!(intuit("12/14/98").as_deref(), Some("MM/dd/yy"));
        assert_eq!(intuit("12/12/2012").as_deref(), Some("??/??/yyyy"));
        assert_eq!(intuit("20/12/2012").as_deref(), Some("dd/MM/yyyy"));
        assert_eq!(intuit("2012/12/12").as_deref(), Some("yyyy/MM/dd"));
        assert_eq!(intuit("2012-12-12").as_deref(), Some("yyyy-MM-dd"));
        assert_eq!(intuit("20120-12-12"), None);
        assert_eq!(intuit("12/02-99"), None);
    }

    #[test]
    fn test_resolution() {
        assert_eq!(
            determine_format_string("2/12/98", Some(true), &Locale::en_us()).as_deref(),
            Some("d/MM/yy")
        );
        assert_eq!(
            determine_format_string("2/12/98", Some(false), &Locale::en_us()).as_deref(),
            Some("M/dd/yy")
        );
    }

    #[test]
    fn test_date_time() {
        assert_eq!(intuit("  2/12/98 9:57    ").as_deref(), Some("?/??/yy H:mm"));
        assert_eq!(intuit("2/13/98 9:57").as_deref(), Some("M/dd/yy H:mm"));
        assert_eq!(intuit("9:57 2/12/98").as_deref(), Some("H:mm ?/??/yy"));
        assert_eq!(
            intuit("2004-01-01T00:00:00+05:00").as_deref(),
            Some("yyyy-MM-dd'T'HH:mm:ssxxx")
        );
        assert_eq!(
            intuit("01/30/2012 10:59:48 GMT").as_deref(),
            Some("MM/dd/yyyy HH:mm:ss z")
        );
        assert_eq!(intuit("2/12/98 :57"), None);
        assert_eq!(intuit("2/12/98 9:5"), None);
    }

    #[test]
    fn test_month_abbreviations() {
        assert_eq!(intuit("2-Jan-2017").as_deref(), Some("d-MMM-yyyy"));
        assert_eq!(intuit("12-May-14").as_deref(), Some("dd-MMM-yy"));
        assert_eq!(intuit("21 Jan 2017").as_deref(), Some("dd MMM yyyy"));
        assert_eq!(intuit("8 Dec 1993").as_deref(), Some("d MMM yyyy"));
        assert_eq!(intuit("21-Jam-2017"), None);
    }

    #[test]
    fn test_bogus_input() {
        let bogus = [
            "21/12/99:", "18:46:", "4:38  39", "3124/08/", "890/65 1/", "7/87/33", " 89:50",
            "18:52 56:", "18/94/06", "0463 5 71", "50 9:22", "95/06/88", "0-27-98", "08/56 22/",
            "31-0-99", "0/7:6/11 //61", "8:73/4/13 15", "14/23/3367", " 00/21/79", "22-23-00",
            "0/20/2361", "0/2/52 9:50 4 ", "1:57:11  1/4/98", "2015-8-17T", "4/01/41 3:43 T450",
            "37/8/005 5:05", "0/6/95", "0000 7 1", "2000-12-12T12:45-72", "2000-12-12T12:45-112",
            "2000-12-12 12:45 AGT", "0\u{fe}\u{fe}\u{fe}\u{fe}\u{fe}",
        ];
        for input in bogus {
            assert_eq!(intuit(input), None, "input {input:?}");
        }
    }

    #[test]
    fn test_detector_merging() {
        // One resolved sample disambiguates twenty ambiguous ones
        let mut detector = DateTimeDetector::new(None, Locale::en_us());
        detector.train("12/12/12");
        detector.train("12/12/32");
        detector.train("02/22/02");
        for _ in 0..20 {
            detector.train("02/02/99");
        }
        detector.train("02/O2/99");

        let result = detector.result().unwrap();
        assert_eq!(result.format_string(), "MM/dd/yy");
        assert_eq!(detector.invalid_count(), 1);
    }

    #[test]
    fn test_detector_width_relaxation() {
        let mut detector = DateTimeDetector::new(None, Locale::en_us());
        detector.train("12:57");
        detector.train("13:45");
        detector.train("8:03");
        assert_eq!(detector.result().unwrap().format_string(), "H:mm");

        let mut detector = DateTimeDetector::new(None, Locale::en_us());
        detector.train("1-Jan-14");
        detector.train("10-Jan-14");
        assert_eq!(detector.result().unwrap().format_string(), "d-MMM-yy");
    }

    #[test]
    fn test_detector_year_first() {
        let mut detector = DateTimeDetector::new(None, Locale::en_us());
        for sample in ["98/03/13", "03/03/13", "34/03/13", "46/03/13", "59/03/13", "09/03/31", "10/03/13"] {
            detector.train(sample);
        }
        assert_eq!(detector.result().unwrap().format_string(), "yy/MM/dd");
    }

    #[test]
    fn test_detector_empty() {
        let detector = DateTimeDetector::new(None, Locale::en_us());
        assert!(detector.result().is_none());

        let mut detector = DateTimeDetector::new(None, Locale::en_us());
        detector.train("certainly not a date");
        assert!(detector.result().is_none());
    }

    #[test]
    fn test_detector_is_total_on_noise() {
        // Deterministic structured noise standing in for the original's
        // unbounded fuzz harness: every input either yields a format that
        // re-validates its own sample, or yields nothing - never a panic
        let fragments = ["2000-12-12", "12:45", "T", ":", "/", "-", "+", " ", "GMT", "99", "0", "5"];
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..2_000 {
            let mut input = String::new();
            for _ in 0..6 {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                input.push_str(fragments[(state >> 33) as usize % fragments.len()]);
            }
            if let Some(format) = intuit(&input) {
                let descriptor = DateTimeFormat::from_format(&format).expect("derived format must parse");
                assert!(
                    descriptor.is_valid(input.trim(), &Locale::en_us()),
                    "format {format} does not round-trip {input:?}"
                );
            }
        }
    }
}
