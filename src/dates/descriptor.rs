//! Cached date/time format descriptors and the lock-step validator.
//!
//! A [`DateTimeFormat`] is built once from a format string such as
//! `yyyy-MM-dd'T'HH:mm:ssxxx` and then validates any number of samples
//! without a general-purpose date library: the format and the input are
//! walked in lock-step, each format token consuming exactly the characters
//! it predicts. Failures carry a reason string and the offset within the
//! input; the reason strings are an external contract (the tracker matches
//! two of them byte-for-byte to drive format repair) and must not change.

use std::sync::{LazyLock, RwLock};

use foldhash::{HashMap, HashMapExt};

use crate::locale::Locale;
use crate::reference::ReferenceData;
use crate::semantic::SemanticType;

/// Outcome of a failed sample validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Human-readable reason; stable across releases.
    pub reason: String,
    /// Character offset within the input where the walk failed.
    pub offset: usize,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, offset: usize) -> Self {
        ParseFailure {
            reason: reason.into(),
            offset,
        }
    }
}

/// The civil fields captured by a successful parse, comparable so the
/// tracker can maintain extremes without re-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeValue {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    /// Seconds east of UTC from an explicit offset component.
    pub offset_seconds: i64,
    /// Date fields in input order, for formats with unresolved positions.
    date_fields: [i64; 3],
    /// Which positional field held the year, when the format knows.
    year_position: Option<usize>,
}

impl DateTimeValue {
    /// Total order consistent within one format.
    ///
    /// Fully resolved values compare as instants (civil time minus offset);
    /// a known year with ambiguous day/month compares year-major then by
    /// field position; fully ambiguous values compare by field position.
    pub fn sort_key(&self) -> i128 {
        let time = self.hour * 10_000 + self.minute * 100 + self.second;
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => {
                let days = days_from_civil(y, m, d);
                (days as i128) * 86_400
                    + (self.hour * 3_600 + self.minute * 60 + self.second) as i128
                    - self.offset_seconds as i128
            }
            (Some(y), _, _) => {
                let mut rest = [0i64; 2];
                let mut n = 0;
                for (idx, &field) in self.date_fields.iter().enumerate() {
                    if Some(idx) != self.year_position && n < 2 {
                        rest[n] = field;
                        n += 1;
                    }
                }
                (((y * 100 + rest[0]) * 100 + rest[1]) as i128) * 1_000_000 + time as i128
            }
            _ => {
                let [a, b, c] = self.date_fields;
                ((((a * 100 + b) * 100 + c) as i128) * 1_000_000) + time as i128
            }
        }
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian civil date.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// A parsed, cached date/time format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeFormat {
    format_string: String,
    date_elements: i32,
    time_elements: i32,
    hour_length: i32,
    date_field_lengths: [i32; 3],
    time_first: Option<bool>,
    date_time_separator: char,
    year_offset: i32,
    month_offset: i32,
    day_offset: i32,
    date_separator: Option<char>,
    time_zone: String,
    day_first: Option<bool>,
}

static CACHE: LazyLock<RwLock<HashMap<String, DateTimeFormat>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

impl DateTimeFormat {
    /// Build (or fetch from the process-wide cache) the descriptor for a
    /// format string. Returns None for malformed formats, e.g. a single
    /// `m`/`s` or more than five `x`s.
    pub fn from_format(format: &str) -> Option<DateTimeFormat> {
        if let Some(hit) = CACHE
            .read()
            .expect("format descriptor cache poisoned")
            .get(format)
        {
            return Some(hit.clone());
        }

        let built = Self::build(format)?;
        CACHE
            .write()
            .expect("format descriptor cache poisoned")
            .entry(format.to_string())
            .or_insert_with(|| built.clone());
        Some(built)
    }

    fn build(format: &str) -> Option<DateTimeFormat> {
        let chars: Vec<char> = format.chars().collect();
        let len = chars.len();

        let mut date_elements = 0i32;
        let mut time_elements = 0i32;
        let mut hour_length = -1i32;
        let mut date_field_lengths = [-1i32; 3];
        let mut time_first: Option<bool> = None;
        let mut date_time_separator = ' ';
        let mut year_offset = -1i32;
        let mut month_offset = -1i32;
        let mut day_offset = -1i32;
        let mut date_separator: Option<char> = None;
        let mut time_zone = String::new();

        let mut i = 0usize;
        while i < len {
            let ch = chars[i];
            match ch {
                '?' => {
                    if date_elements == 3 {
                        return None;
                    }
                    date_elements += 1;
                    let width = if i + 1 < len && chars[i + 1] == '?' {
                        i += 1;
                        2
                    } else {
                        1
                    };
                    date_field_lengths[(date_elements - 1) as usize] = width;
                    if date_elements == 1 {
                        date_separator = chars.get(i + 1).copied();
                    }
                }
                'M' => {
                    if date_elements == 3 {
                        return None;
                    }
                    month_offset = date_elements;
                    date_elements += 1;
                    let width = if i + 1 < len && chars[i + 1] == 'M' {
                        i += 1;
                        if i + 1 < len && chars[i + 1] == 'M' {
                            i += 1;
                            3
                        } else {
                            2
                        }
                    } else {
                        1
                    };
                    date_field_lengths[(date_elements - 1) as usize] = width;
                    if date_elements == 1 {
                        date_separator = chars.get(i + 1).copied();
                    }
                }
                'd' => {
                    if date_elements == 3 {
                        return None;
                    }
                    day_offset = date_elements;
                    date_elements += 1;
                    let width = if i + 1 < len && chars[i + 1] == 'd' {
                        i += 1;
                        2
                    } else {
                        1
                    };
                    date_field_lengths[(date_elements - 1) as usize] = width;
                    if date_elements == 1 {
                        date_separator = chars.get(i + 1).copied();
                    }
                }
                'H' => {
                    time_first = Some(date_elements == 0);
                    time_elements += 1;
                    hour_length = if i + 1 < len && chars[i + 1] == 'H' {
                        i += 1;
                        2
                    } else {
                        1
                    };
                }
                'm' | 's' => {
                    time_elements += 1;
                    if i + 1 >= len || chars[i + 1] != ch {
                        return None;
                    }
                    i += 1;
                }
                'y' => {
                    if date_elements == 3 {
                        return None;
                    }
                    year_offset = date_elements;
                    date_elements += 1;
                    let mut run = 1;
                    while i + 1 < len && chars[i + 1] == 'y' {
                        run += 1;
                        i += 1;
                    }
                    // 'y' and 'yy' both consume two digits; four or more is a full year
                    let width = if run >= 4 { 4 } else { 2 };
                    date_field_lengths[(date_elements - 1) as usize] = width;
                    if date_elements == 1 {
                        date_separator = chars.get(i + 1).copied();
                    }
                }
                'x' => {
                    let mut count = 1;
                    while i + 1 < len && chars[i + 1] == 'x' {
                        count += 1;
                        i += 1;
                    }
                    if count > 5 {
                        return None;
                    }
                    time_zone = "x".repeat(count);
                }
                'z' => {
                    time_zone = " z".to_string();
                }
                'T' => {
                    date_time_separator = 'T';
                }
                _ => {}
            }
            i += 1;
        }

        if date_elements == 0 {
            date_elements = -1;
        }
        if time_elements == 0 {
            time_elements = -1;
        }
        if date_elements == -1 && time_elements == -1 {
            return None;
        }

        Some(DateTimeFormat {
            format_string: format.to_string(),
            date_elements,
            time_elements,
            hour_length,
            date_field_lengths,
            time_first,
            date_time_separator,
            year_offset,
            month_offset,
            day_offset,
            date_separator,
            time_zone,
            day_first: None,
        })
    }

    /// The semantic type this format describes.
    pub fn semantic_type(&self) -> SemanticType {
        if self.time_elements == -1 {
            SemanticType::LocalDate
        } else if self.date_elements == -1 {
            SemanticType::LocalTime
        } else if self.time_zone.is_empty() {
            SemanticType::LocalDateTime
        } else if self.time_zone.contains('z') {
            SemanticType::ZonedDateTime
        } else {
            SemanticType::OffsetDateTime
        }
    }

    /// The canonical format string, honoring any forced resolution.
    pub fn format_string(&self) -> &str {
        &self.format_string
    }

    /// Resolve `?` placeholders to day-first or month-first field order.
    pub fn force_resolve(&mut self, day_first: bool) {
        self.day_first = Some(day_first);
        self.format_string = self.reassemble();
    }

    fn as_date(&self, field_chars: [char; 3]) -> String {
        let mut out = String::new();
        for (f, &ch) in field_chars.iter().enumerate() {
            let field_len = self.date_field_lengths[f];
            if field_len <= 0 {
                continue;
            }
            if !out.is_empty() {
                if let Some(sep) = self.date_separator {
                    out.push(sep);
                }
            }
            for _ in 0..field_len {
                out.push(ch);
            }
        }
        out
    }

    /// Reassemble the canonical format string from the descriptor fields.
    fn reassemble(&self) -> String {
        let hours = if self.hour_length == 1 { "H" } else { "HH" };
        let time_answer = if self.time_elements <= 0 {
            String::new()
        } else {
            format!(
                "{hours}{}",
                if self.time_elements == 2 { ":mm" } else { ":mm:ss" }
            )
        };

        let date_answer = if self.date_elements <= 0 {
            String::new()
        } else if self.year_offset == -1 {
            if self.day_offset != -1 {
                self.as_date(['M', 'd', 'y'])
            } else {
                match self.day_first {
                    Some(true) => self.as_date(['d', 'M', 'y']),
                    Some(false) => self.as_date(['M', 'd', 'y']),
                    None => self.as_date(['?', '?', '?']),
                }
            }
        } else if self.year_offset == 0 {
            if self.day_offset == 1 {
                self.as_date(['y', 'd', 'M'])
            } else if self.day_offset != -1 {
                self.as_date(['y', 'M', 'd'])
            } else {
                self.as_date(['y', '?', '?'])
            }
        } else {
            // Year in the final position
            if self.day_offset == 0 {
                self.as_date(['d', 'M', 'y'])
            } else if self.day_offset != -1 {
                self.as_date(['M', 'd', 'y'])
            } else {
                match self.day_first {
                    Some(true) => self.as_date(['d', 'M', 'y']),
                    Some(false) => self.as_date(['M', 'd', 'y']),
                    None => self.as_date(['?', '?', 'y']),
                }
            }
        };

        if self.time_elements == -1 {
            return format!("{date_answer}{}", self.time_zone);
        }
        if self.date_elements == -1 {
            return format!("{time_answer}{}", self.time_zone);
        }

        let separator = if self.date_time_separator == ' ' {
            " "
        } else {
            "'T'"
        };
        if self.time_first == Some(true) {
            format!("{time_answer}{separator}{date_answer}{}", self.time_zone)
        } else {
            format!("{date_answer}{separator}{time_answer}{}", self.time_zone)
        }
    }

    /// Fold another observation of the same stream into this descriptor.
    ///
    /// A candidate refines the receiver when it describes the same
    /// structure: placeholder fields adopt resolved day/month/year
    /// positions, and mixed single/double widths (`H`/`HH`, `d`/`dd`,
    /// `M`/`MM`) relax to the single-letter form. Returns None when the
    /// two formats are structurally incompatible (different separators,
    /// element counts, year width, timezone, or conflicting resolutions).
    pub fn merge_refine(&self, other: &DateTimeFormat) -> Option<DateTimeFormat> {
        if self.date_elements != other.date_elements
            || self.time_elements != other.time_elements
            || self.date_separator != other.date_separator
            || self.date_time_separator != other.date_time_separator
            || self.time_zone != other.time_zone
            || self.time_first != other.time_first
        {
            return None;
        }

        let mut merged = self.clone();

        if merged.hour_length != -1 && other.hour_length != -1 {
            merged.hour_length = merged.hour_length.min(other.hour_length);
        }

        if self.date_elements > 0 {
            if self.year_offset != -1 && other.year_offset != -1 {
                if self.year_offset != other.year_offset {
                    return None;
                }
                let p = self.year_offset as usize;
                if self.date_field_lengths[p] != other.date_field_lengths[p] {
                    return None;
                }
            }
            if self.day_offset != -1 && other.day_offset != -1 && self.day_offset != other.day_offset
            {
                return None;
            }
            if self.month_offset != -1
                && other.month_offset != -1
                && self.month_offset != other.month_offset
            {
                return None;
            }

            for p in 0..3 {
                let a = merged.date_field_lengths[p];
                let b = other.date_field_lengths[p];
                if a <= 0 || b <= 0 {
                    if a != b {
                        return None;
                    }
                    continue;
                }
                // Month abbreviations and 4-digit years never relax
                if (a == 3) != (b == 3) || ((a == 4 || b == 4) && a != b) {
                    return None;
                }
                merged.date_field_lengths[p] = a.min(b);
            }

            if merged.year_offset == -1 && other.year_offset != -1 {
                merged.year_offset = other.year_offset;
            }
            if merged.day_offset == -1 && other.day_offset != -1 {
                merged.day_offset = other.day_offset;
            }
            if merged.month_offset == -1 && other.month_offset != -1 {
                merged.month_offset = other.month_offset;
            }
        }

        merged.format_string = merged.reassemble();
        Some(merged)
    }

    /// Synthesize a regular expression matching this format.
    pub fn regexp(&self) -> String {
        let chars: Vec<char> = self.format_string.chars().collect();
        let len = chars.len();
        let mut out = String::new();
        let mut i = 0usize;
        while i < len {
            let ch = chars[i];
            match ch {
                'y' | 'H' | 'd' | '?' | 'M' | 'm' | 's' => {
                    let mut run = 1;
                    while i + run < len && chars[i + run] == ch {
                        run += 1;
                    }
                    i += run;
                    match (ch, run) {
                        ('M', 3) => out.push_str("\\p{Alpha}{3}"),
                        ('m' | 's', _) => out.push_str("\\d{2}"),
                        (_, 1) => out.push_str("\\d{1,2}"),
                        (_, n) => {
                            out.push_str("\\d{");
                            out.push_str(&n.to_string());
                            out.push('}');
                        }
                    }
                }
                'x' => {
                    let mut run = 1;
                    while i + run < len && chars[i + run] == 'x' {
                        run += 1;
                    }
                    i += run;
                    out.push_str(match run {
                        1 => "[-+]\\d{2}",
                        2 => "[-+]\\d{4}",
                        3 => "[-+]\\d{2}:\\d{2}",
                        4 => "[-+]\\d{6}",
                        _ => "[-+]\\d{2}:\\d{2}:\\d{2}",
                    });
                }
                'z' => {
                    out.push_str("[A-Z]+");
                    i += 1;
                }
                '\'' => {
                    // Quoted literal, e.g. 'T'
                    i += 1;
                    while i < len && chars[i] != '\'' {
                        out.push(chars[i]);
                        i += 1;
                    }
                    i += 1;
                }
                other => {
                    out.push(other);
                    i += 1;
                }
            }
        }
        out
    }

    /// Validate a sample against this format.
    pub fn is_valid(&self, input: &str, locale: &Locale) -> bool {
        self.parse(input, locale).is_ok()
    }

    /// Walk the format and the input in lock-step, returning the captured
    /// civil fields or the first failure.
    pub fn parse(&self, input: &str, locale: &Locale) -> Result<DateTimeValue, ParseFailure> {
        let fmt: Vec<char> = self.format_string.chars().collect();
        let inp: Vec<char> = input.chars().collect();
        let fmt_len = fmt.len();
        let inp_len = inp.len();

        let mut value = DateTimeValue::default();
        let mut date_idx = 0usize;
        let mut time_idx = 0usize;
        let mut upto = 0usize;

        let record_date = |value: &mut DateTimeValue, date_idx: &mut usize, v: i64| {
            if *date_idx < 3 {
                value.date_fields[*date_idx] = v;
            }
            *date_idx += 1;
        };
        let record_time = |value: &mut DateTimeValue, time_idx: &mut usize, v: i64| {
            match *time_idx {
                0 => value.hour = v,
                1 => value.minute = v,
                _ => value.second = v,
            }
            *time_idx += 1;
        };

        let mut i = 0usize;
        while i < fmt_len {
            let ch = fmt[i];
            match ch {
                'M' => {
                    if i + 1 < fmt_len && fmt[i + 1] == 'M' {
                        i += 1;
                        if i + 1 < fmt_len && fmt[i + 1] == 'M' {
                            i += 1;
                            // Month abbreviation
                            if upto + 3 > inp_len {
                                return Err(ParseFailure::new("Month Abbreviation not complete", upto));
                            }
                            let abbreviation: String = inp[upto..upto + 3].iter().collect();
                            match locale.month_abbreviation_offset(&abbreviation) {
                                Some(month) => {
                                    value.month = Some(month as i64);
                                    record_date(&mut value, &mut date_idx, month as i64);
                                }
                                None => {
                                    return Err(ParseFailure::new("Month Abbreviation incorrect", upto));
                                }
                            }
                            upto += 3;
                        } else {
                            let v = self.digits_day_month(&inp, &mut upto, false, true)?;
                            value.month = Some(v);
                            record_date(&mut value, &mut date_idx, v);
                        }
                    } else {
                        let v = self.digits_day_month(&inp, &mut upto, false, false)?;
                        value.month = Some(v);
                        record_date(&mut value, &mut date_idx, v);
                    }
                }
                'd' => {
                    let two = i + 1 < fmt_len && fmt[i + 1] == 'd';
                    if two {
                        i += 1;
                    }
                    let v = self.digits_day_month(&inp, &mut upto, true, two)?;
                    value.day = Some(v);
                    record_date(&mut value, &mut date_idx, v);
                }
                'H' | '?' => {
                    let two = i + 1 < fmt_len && fmt[i + 1] == ch;
                    let v = if two {
                        i += 1;
                        digits_exact(&inp, &mut upto, 2)?
                    } else {
                        digits_1_or_2(&inp, &mut upto)?
                    };
                    if ch == 'H' {
                        record_time(&mut value, &mut time_idx, v);
                    } else {
                        record_date(&mut value, &mut date_idx, v);
                    }
                }
                'm' | 's' => {
                    i += 1;
                    let v = digits_exact(&inp, &mut upto, 2)?;
                    record_time(&mut value, &mut time_idx, v);
                }
                'y' => {
                    let mut run = 1;
                    while i + 1 < fmt_len && fmt[i + 1] == 'y' {
                        run += 1;
                        i += 1;
                    }
                    let v = if run >= 4 {
                        digits_block(&inp, &mut upto, 4)?
                    } else {
                        digits_exact(&inp, &mut upto, 2)?
                    };
                    value.year = Some(v);
                    value.year_position = Some(date_idx);
                    record_date(&mut value, &mut date_idx, v);
                }
                'x' => {
                    let mut count = 1usize;
                    while i + 1 < fmt_len && fmt[i + 1] == 'x' {
                        count += 1;
                        i += 1;
                    }
                    value.offset_seconds = parse_zone_offset(&inp, &mut upto, count)?;
                }
                'z' => {
                    let zone: String = inp[upto.min(inp_len)..].iter().collect();
                    if !ReferenceData::get().is_zone_name(&zone) {
                        return Err(ParseFailure::new(
                            format!("Expecting time zone - bad time zone: {zone}"),
                            upto,
                        ));
                    }
                    upto = inp_len;
                }
                '\'' => {
                    i += 1;
                    let literal = fmt[i];
                    if i + 1 >= fmt_len || fmt[i + 1] != '\'' {
                        return Err(ParseFailure::new("Unterminated quote in format String", upto));
                    }
                    i += 1;
                    constant_char(&inp, &mut upto, literal)?;
                }
                literal => {
                    constant_char(&inp, &mut upto, literal)?;
                }
            }
            i += 1;
        }

        if upto != inp_len {
            return Err(ParseFailure::new(
                "Expecting end of input, extraneous input found",
                upto,
            ));
        }

        Ok(value)
    }

    /// Day or month field: 1-2 digits (or exactly 2), range-checked.
    fn digits_day_month(
        &self,
        inp: &[char],
        upto: &mut usize,
        is_day: bool,
        two: bool,
    ) -> Result<i64, ParseFailure> {
        if *upto == inp.len() {
            return Err(ParseFailure::new("Expecting digit, end of input", *upto));
        }
        let ch = inp[*upto];
        if !ch.is_ascii_digit() {
            return Err(ParseFailure::new("Expecting digit", *upto));
        }
        let mut v = (ch as i64) - ('0' as i64);
        *upto += 1;

        if two && *upto < inp.len() && self.date_separator == Some(inp[*upto]) {
            let reason = if is_day {
                "Insufficient digits in input (d)"
            } else {
                "Insufficient digits in input (M)"
            };
            return Err(ParseFailure::new(reason, *upto));
        }
        if two && (*upto == inp.len() || !inp[*upto].is_ascii_digit()) {
            return Err(ParseFailure::new("Expecting digit", *upto));
        }
        if *upto < inp.len() && inp[*upto].is_ascii_digit() {
            v = 10 * v + ((inp[*upto] as i64) - ('0' as i64));
            let limit = if is_day { 31 } else { 12 };
            if v > limit {
                return Err(ParseFailure::new("Value too large for day/month", *upto));
            }
            *upto += 1;
        }
        if v == 0 {
            return Err(ParseFailure::new("0 value illegal for day/month", *upto));
        }
        Ok(v)
    }
}

/// One or two digits, no range check.
fn digits_1_or_2(inp: &[char], upto: &mut usize) -> Result<i64, ParseFailure> {
    if *upto == inp.len() {
        return Err(ParseFailure::new("Expecting digit, end of input", *upto));
    }
    if !inp[*upto].is_ascii_digit() {
        return Err(ParseFailure::new("Expecting digit", *upto));
    }
    let mut v = (inp[*upto] as i64) - ('0' as i64);
    *upto += 1;
    if *upto != inp.len() && inp[*upto].is_ascii_digit() {
        v = 10 * v + ((inp[*upto] as i64) - ('0' as i64));
        *upto += 1;
    }
    Ok(v)
}

/// Exactly `count` digits, checked one position at a time.
fn digits_exact(inp: &[char], upto: &mut usize, count: usize) -> Result<i64, ParseFailure> {
    let mut v = 0i64;
    for _ in 0..count {
        if *upto == inp.len() {
            return Err(ParseFailure::new("Expecting digit, end of input", *upto));
        }
        if !inp[*upto].is_ascii_digit() {
            return Err(ParseFailure::new("Expecting digit", *upto));
        }
        v = 10 * v + ((inp[*upto] as i64) - ('0' as i64));
        *upto += 1;
    }
    Ok(v)
}

/// A block of digits with a single up-front length check (year fields).
fn digits_block(inp: &[char], upto: &mut usize, count: usize) -> Result<i64, ParseFailure> {
    if *upto + count > inp.len() {
        return Err(ParseFailure::new("Expecting digit, end of input", *upto));
    }
    let mut v = 0i64;
    for _ in 0..count {
        if !inp[*upto].is_ascii_digit() {
            return Err(ParseFailure::new("Expecting digit", *upto));
        }
        v = 10 * v + ((inp[*upto] as i64) - ('0' as i64));
        *upto += 1;
    }
    Ok(v)
}

fn constant_char(inp: &[char], upto: &mut usize, expected: char) -> Result<(), ParseFailure> {
    if *upto == inp.len() {
        return Err(ParseFailure::new(
            "Expecting constant char, end of input",
            *upto,
        ));
    }
    if inp[*upto] != expected {
        return Err(ParseFailure::new("Expecting constant char", *upto));
    }
    *upto += 1;
    Ok(())
}

/// An ISO-8601 numeric offset: sign plus the positional template for the
/// given `x` count. The offset must extend to the end of the input.
fn parse_zone_offset(inp: &[char], upto: &mut usize, count: usize) -> Result<i64, ParseFailure> {
    // Template length (excluding the sign), and digit positions within it
    const LENGTHS: [usize; 6] = [0, 2, 4, 5, 6, 8];
    const TEMPLATES: [&str; 6] = ["", "00", "0000", "00:00", "000000", "00:00:00"];
    const MINUTE_AT: [i32; 6] = [-1, -1, 2, 3, 2, 3];
    const SECOND_AT: [i32; 6] = [-1, -1, -1, -1, 4, 6];

    if count == 0 || count > 5 {
        return Err(ParseFailure::new(
            "Expecting time zone offset, bad time zone offset",
            *upto,
        ));
    }
    let token_len = LENGTHS[count];
    if inp.len() - *upto < token_len + 1 {
        return Err(ParseFailure::new(
            "Expecting time zone offset, end of input",
            *upto,
        ));
    }

    let direction = inp[*upto];
    let rest = &inp[*upto + 1..];
    let template: Vec<char> = TEMPLATES[count].chars().collect();
    let shape_matches = rest.len() == template.len()
        && rest
            .iter()
            .zip(template.iter())
            .all(|(&c, &t)| if t == '0' { c.is_ascii_digit() } else { c == t });
    if (direction != '-' && direction != '+') || !shape_matches {
        return Err(ParseFailure::new(
            "Expecting time zone offset, bad time zone offset",
            *upto,
        ));
    }

    let two = |at: usize| -> i64 {
        let a = (rest[at] as i64) - ('0' as i64);
        let b = (rest[at + 1] as i64) - ('0' as i64);
        a * 10 + b
    };

    let hour = two(0);
    if hour > 18 {
        return Err(ParseFailure::new(
            "Expecting time zone offset, invalid hour offset",
            *upto + 1,
        ));
    }
    let mut total = hour * 3_600;

    if MINUTE_AT[count] != -1 {
        let at = MINUTE_AT[count] as usize;
        let minute = two(at);
        if minute > 59 {
            return Err(ParseFailure::new(
                "Expecting time zone offset, invalid minute offset",
                *upto + 1 + at,
            ));
        }
        total += minute * 60;
    }

    if SECOND_AT[count] != -1 {
        let at = SECOND_AT[count] as usize;
        let second = two(at);
        if second > 59 {
            return Err(ParseFailure::new(
                "Expecting time zone offset, invalid minute offset",
                *upto + 1 + at,
            ));
        }
        total += second;
    }

    *upto += token_len + 1;
    Ok(if direction == '-' { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale() -> Locale {
        Locale::en_us()
    }

    #[test]
    fn test_from_format_rejects_malformed() {
        assert!(DateTimeFormat::from_format("yyyy-MM-ddTHH:m:ssx").is_none());
        assert!(DateTimeFormat::from_format("yyyy-MM-ddTHH:mm:sx").is_none());
        assert!(DateTimeFormat::from_format("").is_none());
        assert!(DateTimeFormat::from_format("HH:mm:ssxxxxxx").is_none());
    }

    #[test]
    fn test_semantic_types() {
        let date = DateTimeFormat::from_format("yyyy-MM-dd").unwrap();
        assert_eq!(date.semantic_type(), SemanticType::LocalDate);

        let time = DateTimeFormat::from_format("H:mm").unwrap();
        assert_eq!(time.semantic_type(), SemanticType::LocalTime);

        let datetime = DateTimeFormat::from_format("yyyy/MM/dd HH:mm").unwrap();
        assert_eq!(datetime.semantic_type(), SemanticType::LocalDateTime);

        let offset = DateTimeFormat::from_format("yyyy-MM-dd'T'HH:mm:ssxxx").unwrap();
        assert_eq!(offset.semantic_type(), SemanticType::OffsetDateTime);

        let zoned = DateTimeFormat::from_format("MM/dd/yyyy HH:mm:ss z").unwrap();
        assert_eq!(zoned.semantic_type(), SemanticType::ZonedDateTime);
    }

    #[test]
    fn test_regexp_synthesis() {
        let date = DateTimeFormat::from_format("dd-MM-yyyy").unwrap();
        assert_eq!(date.regexp(), "\\d{2}-\\d{2}-\\d{4}");

        let offset = DateTimeFormat::from_format("yyyy-MM-dd'T'HH:mm:ssxx").unwrap();
        assert_eq!(
            offset.regexp(),
            "\\d{4}-\\d{2}-\\d{2}T\\d{2}:\\d{2}:\\d{2}[-+]\\d{4}"
        );

        let abbreviated = DateTimeFormat::from_format("d MMM yyyy").unwrap();
        assert_eq!(abbreviated.regexp(), "\\d{1,2} \\p{Alpha}{3} \\d{4}");

        let ambiguous = DateTimeFormat::from_format("?/??/yy").unwrap();
        assert_eq!(ambiguous.regexp(), "\\d{1,2}/\\d{2}/\\d{2}");
    }

    #[test]
    fn test_parse_reports_reason_and_offset() {
        let result = DateTimeFormat::from_format("yyyy/MM/dd HH:mm").unwrap();

        let cases: [(&str, &str, usize); 9] = [
            ("2018/01/31 05:O5", "Expecting digit", 14),
            ("2018/01/31 05:5", "Expecting digit, end of input", 15),
            ("2018/12/24 09:", "Expecting digit, end of input", 14),
            ("2018/1/24 09:00", "Insufficient digits in input (M)", 6),
            ("2018/11/4 09:00", "Expecting digit", 9),
            ("2018/11/O4 09:00", "Expecting digit", 8),
            ("2018/00/24 05:59", "0 value illegal for day/month", 7),
            ("2018/13/24 05:59", "Value too large for day/month", 6),
            ("2018/01/32 05:59", "Value too large for day/month", 9),
        ];
        for (input, reason, offset) in cases {
            let failure = result.parse(input, &locale()).unwrap_err();
            assert_eq!(failure.reason, reason, "input {input}");
            assert_eq!(failure.offset, offset, "input {input}");
        }

        let failure = result
            .parse("2018/01/00 05:59", &locale())
            .unwrap_err();
        assert_eq!(failure.reason, "0 value illegal for day/month");
        assert_eq!(failure.offset, 10);
    }

    #[test]
    fn test_offset_validation() {
        let result = DateTimeFormat::from_format("yyyy-MM-dd'T'HH:mm:ssxxx").unwrap();
        assert!(result.is_valid("2004-01-01T00:00:00+05:00", &locale()));
        assert!(result.is_valid("2012-03-04T19:22:10+08:00", &locale()));
        assert!(!result.is_valid("2012-03-04T19:22:10+08:0", &locale()));
        assert!(!result.is_valid("2012-03-04T19:22:10+?08:00", &locale()));
        assert!(!result.is_valid("2012-03-04T19:22:10+19:00", &locale()));
        assert!(!result.is_valid("2012-03-04T19:22:10+08:61", &locale()));

        let seconds = DateTimeFormat::from_format("yyyy-MM-dd'T'HH:mm:ssxxxxx").unwrap();
        assert!(seconds.is_valid("2004-01-01T00:00:00+05:00:00", &locale()));
        assert!(!seconds.is_valid("2012-03-04T19:22:10+08:00:0", &locale()));
        assert!(!seconds.is_valid("2012-03-04T19:22:10+O8:00:00", &locale()));
    }

    #[test]
    fn test_zone_validation() {
        let result = DateTimeFormat::from_format("MM/dd/yyyy HH:mm:ss z").unwrap();
        assert!(result.is_valid("01/26/2012 10:42:23 GMT", &locale()));
        assert!(!result.is_valid("01/26/2012 10:42:23 GM", &locale()));
        assert!(!result.is_valid("01/26/2012 10:42:23 GMZ", &locale()));

        let failure = result.parse("01/26/2012 10:42:23 BAD", &locale()).unwrap_err();
        assert_eq!(failure.reason, "Expecting time zone - bad time zone: BAD");
        assert_eq!(failure.offset, 20);
    }

    #[test]
    fn test_month_abbreviation() {
        let result = DateTimeFormat::from_format("d MMM yyyy").unwrap();
        assert!(result.is_valid("20 Jun 2017", &locale()));
        assert!(result.is_valid("1 Jun 2017", &locale()));
        assert!(!result.is_valid("20 0c", &locale()));
        assert!(!result.is_valid("", &locale()));
        assert!(!result.is_valid("1", &locale()));
        assert!(!result.is_valid("20 0ct 2018", &locale()));
        assert!(!result.is_valid("32 Oct 2018", &locale()));
        assert!(!result.is_valid("32 Och 2018", &locale()));
        assert!(!result.is_valid("31 Oct 201", &locale()));
    }

    #[test]
    fn test_force_resolve() {
        let mut result = DateTimeFormat::from_format("??/??/??").unwrap();
        assert_eq!(result.format_string(), "??/??/??");

        result.force_resolve(true);
        assert_eq!(result.format_string(), "dd/MM/yy");
        assert!(result.is_valid("31/12/12", &locale()));
        assert!(!result.is_valid("12/31/12", &locale()));
        assert!(!result.is_valid("2012/12/12", &locale()));

        result.force_resolve(false);
        assert_eq!(result.format_string(), "MM/dd/yy");
        assert!(!result.is_valid("31/12/12", &locale()));
        assert!(result.is_valid("12/31/12", &locale()));
    }

    #[test]
    fn test_year_only_formats() {
        let year = DateTimeFormat::from_format("yyyy").unwrap();
        assert_eq!(year.semantic_type(), SemanticType::LocalDate);
        assert!(year.is_valid("1984", &locale()));
        assert!(!year.is_valid("84", &locale()));

        let compact = DateTimeFormat::from_format("yyyyMMdd").unwrap();
        assert!(compact.is_valid("19991231", &locale()));
        assert!(!compact.is_valid("19991331", &locale()));
    }

    #[test]
    fn test_captured_values_order() {
        let result = DateTimeFormat::from_format("yyyy-MM-dd'T'HH:mm:ssxxx").unwrap();
        let early = result.parse("2004-01-01T00:00:00+05:00", &locale()).unwrap();
        let late = result.parse("2004-01-01T00:00:00-05:00", &locale()).unwrap();
        // Identical civil time, but +05:00 is the earlier instant
        assert!(early.sort_key() < late.sort_key());

        let date = DateTimeFormat::from_format("yyyy-MM-dd").unwrap();
        let a = date.parse("2016-02-29", &locale()).unwrap();
        let b = date.parse("2016-03-01", &locale()).unwrap();
        assert!(a.sort_key() < b.sort_key());
    }

    #[test]
    fn test_cache_is_idempotent() {
        let first = DateTimeFormat::from_format("H:mm:ss").unwrap();
        let second = DateTimeFormat::from_format("H:mm:ss").unwrap();
        assert_eq!(first, second);
    }
}
