//! The streaming type profiler.
//!
//! Samples are trained one at a time. The first window of real samples is
//! kept verbatim together with its three shape sequences; once the window
//! overflows, the frequency evidence is fused into a type determination and
//! every subsequent sample streams through the tracker. Reflection points
//! revisit the determination when the accumulated evidence disagrees.

use foldhash::{HashMap, HashMapExt};
use log::{debug, error, warn};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::ResolutionMode;
use crate::dates::{determine_format_string, DateTimeDetector, DateTimeFormat};
use crate::error::{ProfilerError, Result};
use crate::locale::Locale;
use crate::numeric::{
    NumericShape, DOUBLE_PATTERN, LONG_PATTERN, SIGNED_DOUBLE_PATTERN, SIGNED_LONG_PATTERN,
};
use crate::patterns::{self, PatternInfo, PatternRegistry, ALNUM_PATTERN, ALPHA_PATTERN, ANY_PATTERN};
use crate::reference::ReferenceData;
use crate::result::ProfileResult;
use crate::semantic::{Qualifier, SemanticType};
use crate::shapes;

/// Default number of samples collected before a type determination.
pub const SAMPLE_DEFAULT: usize = 20;
/// Default maximum number of distinct valid values tracked.
pub const MAX_CARDINALITY_DEFAULT: usize = 500;
/// Default maximum number of distinct invalid values tracked.
pub const MAX_OUTLIERS_DEFAULT: usize = 50;

const REFLECTION_SAMPLES_DEFAULT: u64 = 30;
const MIN_SAMPLES_FOR_KEY: u64 = 1000;

/// Streaming profiler for one column of textual values.
///
/// # Example
///
/// ```
/// use field_nose::Profiler;
///
/// let mut profiler = Profiler::new("age");
/// for sample in ["12", "62", "21", "37"] {
///     profiler.train(Some(sample));
/// }
/// let result = profiler.result();
/// assert_eq!(result.semantic_type().to_string(), "Long");
/// ```
#[derive(Debug)]
pub struct Profiler {
    name: String,
    resolution: ResolutionMode,
    locale: Locale,
    sample_size: usize,
    reflection_samples: u64,
    max_cardinality: usize,
    max_outliers: usize,
    collect_statistics: bool,
    training_started: bool,

    sample_count: u64,
    null_count: u64,
    blank_count: u64,
    match_count: u64,

    window: Vec<String>,
    level0: Vec<String>,
    level1: Vec<String>,
    level2: Vec<String>,

    possible_date_time: usize,
    possible_emails: usize,
    possible_zips: usize,
    possible_urls: usize,
    possible_addresses: usize,

    match_pattern: Option<PatternInfo>,
    date_format: Option<DateTimeFormat>,

    cardinality: HashMap<String, u64>,
    outliers: HashMap<String, u64>,

    total_longs: u64,
    total_leading_zeros: u64,
    negative_longs: u64,
    negative_doubles: u64,

    min_long: Option<i64>,
    max_long: Option<i64>,
    sum_long: i128,
    min_double: Option<f64>,
    max_double: Option<f64>,
    sum_double: Decimal,
    min_string: Option<String>,
    max_string: Option<String>,
    min_boolean: Option<String>,
    max_boolean: Option<String>,
    min_temporal: Option<(i128, String)>,
    max_temporal: Option<(i128, String)>,

    min_raw_length: Option<usize>,
    max_raw_length: Option<usize>,
    min_trimmed_length: Option<usize>,
    max_trimmed_length: Option<usize>,
}

impl Profiler {
    /// Create a profiler for the named stream with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_resolution(name, ResolutionMode::default())
    }

    /// Create a profiler with an explicit day/month resolution strategy.
    pub fn with_resolution(name: impl Into<String>, resolution: ResolutionMode) -> Self {
        Profiler {
            name: name.into(),
            resolution,
            locale: Locale::default(),
            sample_size: SAMPLE_DEFAULT,
            reflection_samples: REFLECTION_SAMPLES_DEFAULT,
            max_cardinality: MAX_CARDINALITY_DEFAULT,
            max_outliers: MAX_OUTLIERS_DEFAULT,
            collect_statistics: true,
            training_started: false,
            sample_count: 0,
            null_count: 0,
            blank_count: 0,
            match_count: 0,
            window: Vec::new(),
            level0: Vec::new(),
            level1: Vec::new(),
            level2: Vec::new(),
            possible_date_time: 0,
            possible_emails: 0,
            possible_zips: 0,
            possible_urls: 0,
            possible_addresses: 0,
            match_pattern: None,
            date_format: None,
            cardinality: HashMap::new(),
            outliers: HashMap::new(),
            total_longs: 0,
            total_leading_zeros: 0,
            negative_longs: 0,
            negative_doubles: 0,
            min_long: None,
            max_long: None,
            sum_long: 0,
            min_double: None,
            max_double: None,
            sum_double: Decimal::ZERO,
            min_string: None,
            max_string: None,
            min_boolean: None,
            max_boolean: None,
            min_temporal: None,
            max_temporal: None,
            min_raw_length: None,
            max_raw_length: None,
            min_trimmed_length: None,
            max_trimmed_length: None,
        }
    }

    fn ensure_not_started(&self, option: &'static str) -> Result<()> {
        if self.training_started {
            Err(ProfilerError::TrainingStarted(option))
        } else {
            Ok(())
        }
    }

    /// Set the detection window size. Must be called before training.
    pub fn set_sample_size(&mut self, samples: usize) -> Result<()> {
        self.ensure_not_started("sample size")?;
        if samples < SAMPLE_DEFAULT {
            return Err(ProfilerError::SampleSizeTooSmall(SAMPLE_DEFAULT));
        }
        self.sample_size = samples;
        self.reflection_samples = if samples as u64 > REFLECTION_SAMPLES_DEFAULT {
            samples as u64 + 1
        } else {
            REFLECTION_SAMPLES_DEFAULT
        };
        Ok(())
    }

    /// Set the cardinality cap. Must be called before training.
    pub fn set_max_cardinality(&mut self, cardinality: usize) -> Result<()> {
        self.ensure_not_started("maximum cardinality")?;
        self.max_cardinality = cardinality;
        Ok(())
    }

    /// Set the outlier cap. Must be called before training.
    pub fn set_max_outliers(&mut self, outliers: usize) -> Result<()> {
        self.ensure_not_started("maximum outliers")?;
        self.max_outliers = outliers;
        Ok(())
    }

    /// Enable or disable min/max/sum tracking. Must precede training.
    pub fn set_collect_statistics(&mut self, collect: bool) -> Result<()> {
        self.ensure_not_started("statistics collection")?;
        self.collect_statistics = collect;
        Ok(())
    }

    /// Change the locale. Must be called before training.
    pub fn set_locale(&mut self, locale: Locale) -> Result<()> {
        self.ensure_not_started("locale")?;
        self.locale = locale;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    pub fn max_outliers(&self) -> usize {
        self.max_outliers
    }

    fn day_first(&self) -> Option<bool> {
        self.resolution.day_first(self.locale.day_first)
    }

    fn real_samples(&self) -> u64 {
        self.sample_count - (self.null_count + self.blank_count)
    }

    fn type_known(&self) -> bool {
        self.match_pattern.is_some()
    }

    /// Core entry point: digest one sample (`None` is the null sample).
    /// Returns whether a type has been locked in.
    pub fn train(&mut self, sample: Option<&str>) -> bool {
        self.training_started = true;
        self.sample_count += 1;

        let Some(raw) = sample else {
            self.null_count += 1;
            return self.type_known();
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.blank_count += 1;
            self.track_length(raw);
            return self.type_known();
        }

        self.track_sample(raw);
        if self.type_known() {
            return true;
        }

        // Still undetermined: grow the window and its shape sequences
        self.window.push(raw.to_string());
        let facts = shapes::analyze(trimmed, &self.locale);

        if determine_format_string(trimmed, self.day_first(), &self.locale).is_some() {
            self.possible_date_time += 1;
        }
        if facts.at_signs >= 1
            && (facts.at_signs - 1 == facts.commas || facts.at_signs - 1 == facts.semicolons)
        {
            self.possible_emails += 1;
        }
        if trimmed.chars().count() == 5 && facts.digits == 5 {
            self.possible_zips += 1;
        }
        if trimmed.contains("://") {
            self.possible_urls += 1;
        }
        if ReferenceData::get().ends_with_address_marker(trimmed) {
            self.possible_addresses += 1;
        }

        self.level0.push(facts.level0);
        self.level1.push(facts.level1);
        self.level2.push(facts.level2);

        self.type_known()
    }

    fn track_length(&mut self, raw: &str) {
        let length = raw.chars().count();
        if length != 0 && self.min_raw_length.is_none_or(|min| length < min) {
            self.min_raw_length = Some(length);
        }
        if self.max_raw_length.is_none_or(|max| length > max) {
            self.max_raw_length = Some(length);
        }
    }

    fn note_trimmed_length(&mut self, length: usize) {
        if self.min_trimmed_length.is_none_or(|min| length < min) {
            self.min_trimmed_length = Some(length);
        }
        if self.max_trimmed_length.is_none_or(|max| length > max) {
            self.max_trimmed_length = Some(length);
        }
    }

    fn match_summary(&self) -> Option<(SemanticType, Option<Qualifier>, Option<usize>, Option<usize>)> {
        self.match_pattern
            .as_ref()
            .map(|info| (info.semantic_type, info.qualifier, info.min_length, info.max_length))
    }

    /// Track one sample against the (possibly just-determined) type.
    fn track_sample(&mut self, raw: &str) {
        self.track_length(raw);

        if self.match_pattern.is_none() && self.real_samples() > self.sample_size as u64 {
            self.determine_type();
        }
        let Some((semantic_type, qualifier, min_length, max_length)) = self.match_summary() else {
            return;
        };

        let real = self.real_samples();
        match semantic_type {
            SemanticType::Boolean => {
                if self.track_boolean(raw) {
                    self.record_match(raw);
                } else {
                    self.record_outlier(raw);
                }
            }
            SemanticType::Long => {
                if self.track_long(raw, true, qualifier) {
                    self.record_match(raw);
                } else {
                    self.record_outlier(raw);
                    if real == self.reflection_samples
                        && qualifier == Some(Qualifier::Zip)
                        && (self.match_count as f64) < 0.9 * real as f64
                    {
                        self.backout_zip(real);
                    }
                }
            }
            SemanticType::Double => {
                if self.track_double(raw) {
                    self.record_match(raw);
                } else {
                    self.record_outlier(raw);
                }
            }
            SemanticType::String => {
                if self.track_string(raw, qualifier, min_length, max_length) {
                    self.record_match(raw);
                } else {
                    self.record_outlier(raw);
                    if real == self.reflection_samples {
                        let confidence = ratio(self.match_count, real);
                        match qualifier {
                            Some(Qualifier::Email | Qualifier::Url) if confidence < 0.95 => {
                                self.backout_to_any(real);
                            }
                            Some(Qualifier::Address) if confidence < 0.9 => {
                                self.backout_to_any(real);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => match self.date_format.take() {
                Some(format) => {
                    let (format, ok) = self.track_temporal(format, raw);
                    self.date_format = Some(format);
                    if ok {
                        self.record_match(raw);
                    } else {
                        self.record_outlier(raw);
                    }
                }
                None => {
                    error!(
                        "{}: no format descriptor for temporal type, treating sample as outlier",
                        self.name
                    );
                    self.record_outlier(raw);
                }
            },
        }
    }

    fn record_match(&mut self, raw: &str) {
        self.match_count += 1;
        match self.cardinality.get_mut(raw) {
            Some(count) => *count += 1,
            None => {
                if self.cardinality.len() < self.max_cardinality {
                    self.cardinality.insert(raw.to_string(), 1);
                }
            }
        }
    }

    fn record_outlier(&mut self, raw: &str) {
        match self.outliers.get_mut(raw) {
            Some(count) => *count += 1,
            None => {
                if self.outliers.len() < self.max_outliers {
                    self.outliers.insert(raw.to_string(), 1);
                    // Saturating the outlier map is a signal, not just a cap
                    if self.outliers.len() == self.max_outliers {
                        let real = self.real_samples();
                        self.conditional_backout(real);
                    }
                }
            }
        }
    }

    fn track_boolean(&mut self, raw: &str) -> bool {
        let lowered = raw.trim().to_lowercase();
        let is_true = lowered == "true" || lowered == "yes";
        let is_false = lowered == "false" || lowered == "no";
        if !is_true && !is_false {
            return false;
        }
        // Canonical order: false < true, no < yes
        if is_false {
            self.min_boolean = Some(lowered.clone());
            if self.max_boolean.is_none() {
                self.max_boolean = Some(lowered);
            }
        } else {
            self.max_boolean = Some(lowered.clone());
            if self.min_boolean.is_none() {
                self.min_boolean = Some(lowered);
            }
        }
        true
    }

    fn track_long(&mut self, raw: &str, register: bool, qualifier: Option<Qualifier>) -> bool {
        let input = raw.trim();
        let Ok(value) = input.parse::<i64>() else {
            return false;
        };

        if register {
            self.total_longs += 1;
            if input.starts_with('0') {
                self.total_leading_zeros += 1;
            }
            if value < 0 {
                self.negative_longs += 1;
            }
        }

        let digits = if value < 0 {
            input.chars().count() - 1
        } else {
            input.chars().count()
        };
        self.note_trimmed_length(digits);

        if self.collect_statistics {
            if self.min_long.is_none_or(|min| value < min) {
                self.min_long = Some(value);
            }
            if self.max_long.is_none_or(|max| value > max) {
                self.max_long = Some(value);
            }
            self.sum_long += value as i128;
        }

        if qualifier == Some(Qualifier::Zip) {
            return ReferenceData::get().is_zip(input);
        }
        true
    }

    fn track_double(&mut self, raw: &str) -> bool {
        let Ok(value) = raw.trim().parse::<f64>() else {
            return false;
        };
        if value < 0.0 {
            self.negative_doubles += 1;
        }
        // NaN and the infinities are valid doubles but never extremes
        if !value.is_finite() {
            return true;
        }
        if self.collect_statistics {
            if self.min_double.is_none_or(|min| value < min) {
                self.min_double = Some(value);
            }
            if self.max_double.is_none_or(|max| value > max) {
                self.max_double = Some(value);
            }
            if let Some(decimal) = Decimal::from_f64(value) {
                self.sum_double += decimal;
            }
        }
        true
    }

    fn track_string(
        &mut self,
        raw: &str,
        qualifier: Option<Qualifier>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> bool {
        match qualifier {
            Some(Qualifier::Email) => return patterns::is_valid_email(raw.trim()),
            Some(Qualifier::Url) => return patterns::is_valid_url(raw),
            Some(Qualifier::Address) => return ReferenceData::get().is_address(raw),
            _ => {}
        }

        let length = raw.trim().chars().count();
        if min_length.is_some_and(|min| length < min) {
            return false;
        }
        if max_length.is_some_and(|max| length > max) {
            return false;
        }

        self.note_trimmed_length(length);
        if self.collect_statistics {
            if self.min_string.as_deref().is_none_or(|min| raw < min) {
                self.min_string = Some(raw.to_string());
            }
            if self.max_string.as_deref().is_none_or(|max| raw > max) {
                self.max_string = Some(raw.to_string());
            }
        }
        true
    }

    fn note_temporal(&mut self, key: i128, trimmed: &str) {
        if !self.collect_statistics {
            return;
        }
        if self.min_temporal.as_ref().is_none_or(|(min, _)| key < *min) {
            self.min_temporal = Some((key, trimmed.to_string()));
        }
        if self.max_temporal.as_ref().is_none_or(|(max, _)| key > *max) {
            self.max_temporal = Some((key, trimmed.to_string()));
        }
    }

    /// Validate a temporal sample, attempting one format repair when the
    /// failure is an insufficient-digits condition (e.g. a `dd` format
    /// meeting a single-digit day: the duplicate letter is deleted and the
    /// narrower format adopted).
    fn track_temporal(&mut self, format: DateTimeFormat, raw: &str) -> (DateTimeFormat, bool) {
        let trimmed = raw.trim();
        let failure = match format.parse(trimmed, &self.locale) {
            Ok(value) => {
                self.note_temporal(value.sort_key(), trimmed);
                return (format, true);
            }
            Err(failure) => failure,
        };

        let expected = match failure.reason.as_str() {
            "Insufficient digits in input (d)" => 'd',
            "Insufficient digits in input (M)" => 'M',
            _ => return (format, false),
        };

        let format_chars: Vec<char> = format.format_string().chars().collect();
        if format_chars.get(failure.offset) != Some(&expected) {
            return (format, false);
        }
        let repaired: String = format_chars
            .iter()
            .enumerate()
            .filter(|(at, _)| *at != failure.offset)
            .map(|(_, ch)| *ch)
            .collect();

        let Some(new_format) = DateTimeFormat::from_format(&repaired) else {
            return (format, false);
        };
        let Ok(value) = new_format.parse(trimmed, &self.locale) else {
            return (format, false);
        };

        debug!(
            "{}: repaired date format {} -> {}",
            self.name,
            format.format_string(),
            repaired
        );
        if let Some(info) = &mut self.match_pattern {
            info.pattern = new_format.regexp();
            info.format = Some(repaired);
        }
        self.note_temporal(value.sort_key(), trimmed);
        (new_format, true)
    }

    /// Frequency-rank the shapes at one level; at levels 1 and 2 numeric
    /// runners-up fuse through the promotion lattice and a leading string
    /// pattern absorbs the runner-up count.
    fn best_shape(&self, level: usize) -> Option<(String, u64)> {
        let sequence = match level {
            0 => &self.level0,
            1 => &self.level1,
            _ => &self.level2,
        };
        if sequence.is_empty() {
            return None;
        }

        let mut order: Vec<(String, u64)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for shape in sequence {
            match index.get(shape.as_str()) {
                Some(&at) => order[at].1 += 1,
                None => {
                    index.insert(shape, order.len());
                    order.push((shape.clone(), 1));
                }
            }
        }
        let mut ranked: Vec<usize> = (0..order.len()).collect();
        ranked.sort_by(|&a, &b| order[b].1.cmp(&order[a].1).then(a.cmp(&b)));

        let top = &order[ranked[0]];
        if level == 0 {
            return Some(top.clone());
        }

        // Fuse the numeric patterns among the top three
        let mut fused: Option<(NumericShape, u64)> = None;
        for &at in ranked.iter().take(3) {
            if let Some(shape) = NumericShape::from_pattern(&order[at].0) {
                fused = Some(match fused {
                    None => (shape, order[at].1),
                    Some((acc, count)) => (acc.promote(shape), count + order[at].1),
                });
            }
        }
        if let Some((shape, count)) = fused {
            if NumericShape::from_pattern(&top.0).is_some() {
                return Some((shape.pattern().to_string(), count));
            }
        }

        // A leading recognized string pattern absorbs the runner-up
        let registry = PatternRegistry::get();
        if ranked.len() > 1 {
            let second = &order[ranked[1]];
            let top_is_string = registry
                .structural(&top.0)
                .is_some_and(|info| info.semantic_type == SemanticType::String);
            if top_is_string && registry.structural(&second.0).is_some() {
                return Some((top.0.clone(), top.1 + second.1));
            }
        }

        Some(top.clone())
    }

    /// Fuse the level evidence into a type and replay the window.
    fn determine_type(&mut self) {
        let registry = PatternRegistry::get();

        if self.window.is_empty() {
            self.match_pattern = Some(
                registry
                    .structural(ALPHA_PATTERN)
                    .cloned()
                    .unwrap_or_else(|| PatternInfo::new(ALPHA_PATTERN, SemanticType::String)),
            );
            return;
        }

        let Some((mut best_pattern, mut best_count)) = self.best_shape(0) else {
            return;
        };
        let mut info = registry.structural(&best_pattern).cloned();

        if let Some((pattern1, count1)) = self.best_shape(1) {
            if info.is_none() || count1 > best_count {
                best_pattern = pattern1;
                best_count = count1;
                info = registry.structural(&best_pattern).cloned();
            }
        }
        if let Some((pattern2, count2)) = self.best_shape(2) {
            let info2 = registry.structural(&pattern2).cloned();
            let take = match &info {
                None => true,
                Some(current) => {
                    (pattern2 == best_pattern && count2 > best_count)
                        || (pattern2 != best_pattern
                            && info2
                                .as_ref()
                                .is_some_and(|i| i.semantic_type == current.semantic_type)
                            && count2 > best_count)
                        || (pattern2 != best_pattern
                            && count2 > best_count + (self.sample_size as u64) / 10)
                }
            };
            if take {
                best_pattern = pattern2;
                info = info2;
            }
        }

        let mut chosen =
            info.unwrap_or_else(|| PatternInfo::new(best_pattern.clone(), SemanticType::String));

        // Overrides: a window that is uniformly plausible as a date/time,
        // email, URL, ZIP, or address trumps the shape vote
        let window_len = self.window.len();
        let reference = ReferenceData::get();
        self.date_format = None;

        if self.possible_date_time == window_len {
            let mut detector = DateTimeDetector::new(self.day_first(), self.locale.clone());
            for sample in &self.window {
                detector.train(sample);
            }
            match detector.result() {
                Some(format) => {
                    let mut date_info = PatternInfo::new(format.regexp(), format.semantic_type());
                    date_info.format = Some(format.format_string().to_string());
                    chosen = date_info;
                    self.date_format = Some(format);
                }
                None => warn!(
                    "{}: every windowed sample looked temporal but no format emerged",
                    self.name
                ),
            }
        }
        if self.possible_emails == window_len {
            let valid = self
                .window
                .iter()
                .filter(|s| patterns::is_valid_email(s.trim()))
                .count();
            if valid * 10 >= window_len * 9 {
                if let Some(email) = registry.logical(SemanticType::String, Qualifier::Email) {
                    chosen = email.clone();
                    self.date_format = None;
                }
            }
        }
        if self.possible_urls == window_len {
            let valid = self
                .window
                .iter()
                .filter(|s| patterns::is_valid_url(s))
                .count();
            if valid * 10 >= window_len * 9 {
                if let Some(url) = registry.logical(SemanticType::String, Qualifier::Url) {
                    chosen = url.clone();
                    self.date_format = None;
                }
            }
        }
        if self.possible_zips == window_len {
            let valid = self.window.iter().filter(|s| reference.is_zip(s)).count();
            if valid * 10 >= window_len * 9 {
                if let Some(zip) = registry.logical(SemanticType::Long, Qualifier::Zip) {
                    chosen = zip.clone();
                    self.date_format = None;
                }
            }
        }
        if self.possible_addresses == window_len {
            let valid = self.window.iter().filter(|s| reference.is_address(s)).count();
            if valid * 10 >= window_len * 9 {
                if let Some(address) = registry.logical(SemanticType::String, Qualifier::Address) {
                    chosen = address.clone();
                    self.date_format = None;
                }
            }
        }

        debug!(
            "{}: determined type {} with pattern {}",
            self.name, chosen.semantic_type, chosen.pattern
        );
        self.match_pattern = Some(chosen);

        // Replay the window through the tracker with the now-known type
        let replay = self.window.clone();
        for sample in &replay {
            self.track_sample(sample);
        }
    }

    fn add_to_cardinality(&mut self, key: String, count: u64) {
        match self.cardinality.get_mut(&key) {
            Some(existing) => *existing += count,
            None => {
                if self.cardinality.len() < self.max_cardinality {
                    self.cardinality.insert(key, count);
                }
            }
        }
    }

    fn note_string_extremes(&mut self, raw: &str) {
        self.note_trimmed_length(raw.trim().chars().count());
        if !self.collect_statistics {
            return;
        }
        if self.min_string.as_deref().is_none_or(|min| raw < min) {
            self.min_string = Some(raw.to_string());
        }
        if self.max_string.as_deref().is_none_or(|max| raw > max) {
            self.max_string = Some(raw.to_string());
        }
    }

    /// Abandon the current determination for the most permissive string
    /// shape, folding every outlier back into the cardinality set.
    fn backout_to_any(&mut self, real: u64) {
        debug!("{}: backing out to generic text", self.name);
        self.match_pattern = Some(
            PatternRegistry::get()
                .structural(ANY_PATTERN)
                .cloned()
                .unwrap_or_else(|| PatternInfo::new(ANY_PATTERN, SemanticType::String)),
        );
        self.date_format = None;
        self.match_count = real;

        let moved: Vec<(String, u64)> = self.outliers.drain().collect();
        for (key, count) in moved {
            self.note_string_extremes(&key);
            self.add_to_cardinality(key, count);
        }
    }

    /// A ZIP hypothesis that fell apart: keep Long when almost everything
    /// parsed as an integer, otherwise fall all the way back to text.
    fn backout_zip(&mut self, real: u64) {
        if (self.total_longs as f64) > 0.95 * real as f64 {
            debug!("{}: retracting ZIP to Long", self.name);
            self.match_pattern = Some(
                PatternRegistry::get()
                    .structural(LONG_PATTERN)
                    .cloned()
                    .unwrap_or_else(|| PatternInfo::new(LONG_PATTERN, SemanticType::Long)),
            );
            self.match_count = self.total_longs;

            let migratable: Vec<String> = self
                .outliers
                .keys()
                .filter(|key| key.trim().parse::<i64>().is_ok())
                .cloned()
                .collect();
            for key in migratable {
                if let Some(count) = self.outliers.remove(&key) {
                    self.add_to_cardinality(key, count);
                }
            }
        } else {
            self.backout_to_any(real);
        }
    }

    /// The outlier map saturated (or finalization found it full): decide
    /// whether the outliers reveal a more permissive type.
    fn conditional_backout(&mut self, real: u64) {
        if self.outliers.is_empty() {
            return;
        }
        let Some(info) = self.match_pattern.clone() else {
            return;
        };
        if matches!(
            info.qualifier,
            Some(Qualifier::Null | Qualifier::Blank | Qualifier::BlankOrNull)
        ) {
            return;
        }
        let registry = PatternRegistry::get();

        // Integer stream whose outliers are all floating point
        let all_double = self
            .outliers
            .keys()
            .all(|key| key.trim().parse::<f64>().is_ok());
        if info.semantic_type == SemanticType::Long && all_double {
            let signed = self.negative_longs > 0
                || self
                    .outliers
                    .keys()
                    .any(|key| key.trim().starts_with(self.locale.minus_sign));
            let pattern = if signed {
                SIGNED_DOUBLE_PATTERN
            } else {
                DOUBLE_PATTERN
            };
            debug!(
                "{}: outliers all parse as floating point, reclassifying as Double",
                self.name
            );
            self.match_pattern = Some(
                registry
                    .structural(pattern)
                    .cloned()
                    .unwrap_or_else(|| PatternInfo::new(pattern, SemanticType::Double)),
            );
            if self.collect_statistics {
                if let Some(min) = self.min_long {
                    let min = min as f64;
                    if self.min_double.is_none_or(|current| min < current) {
                        self.min_double = Some(min);
                    }
                }
                if let Some(max) = self.max_long {
                    let max = max as f64;
                    if self.max_double.is_none_or(|current| max > current) {
                        self.max_double = Some(max);
                    }
                }
                self.sum_double += Decimal::try_from_i128_with_scale(self.sum_long, 0)
                    .unwrap_or(Decimal::ZERO);
                self.sum_long = 0;
            }
            let moved: Vec<(String, u64)> = self.outliers.drain().collect();
            for (key, count) in moved {
                if self.collect_statistics {
                    if let Ok(value) = key.trim().parse::<f64>() {
                        if value.is_finite() {
                            if self.min_double.is_none_or(|min| value < min) {
                                self.min_double = Some(value);
                            }
                            if self.max_double.is_none_or(|max| value > max) {
                                self.max_double = Some(value);
                            }
                            if let Some(decimal) = Decimal::from_f64(value) {
                                self.sum_double += decimal * Decimal::from(count);
                            }
                        }
                    }
                }
                self.match_count += count;
                self.add_to_cardinality(key, count);
            }
            return;
        }

        // Letters-and-digits outliers against an alphabetic or integer
        // hypothesis: widen to alphanumeric
        let alnum_outliers = self.outliers.keys().all(|key| {
            let trimmed = key.trim();
            !trimmed.is_empty() && trimmed.chars().all(char::is_alphanumeric)
        });
        let promotable = info.pattern.starts_with("\\p{Alpha}")
            || info.semantic_type == SemanticType::Long;
        if alnum_outliers && promotable {
            debug!("{}: promoting {} to alphanumeric", self.name, info.pattern);
            self.match_pattern = Some(
                registry
                    .structural(ALNUM_PATTERN)
                    .cloned()
                    .unwrap_or_else(|| PatternInfo::new(ALNUM_PATTERN, SemanticType::String)),
            );
            let moved: Vec<(String, u64)> = self.outliers.drain().collect();
            for (key, count) in moved {
                self.note_string_extremes(&key);
                self.match_count += count;
                self.add_to_cardinality(key, count);
            }
            return;
        }

        self.backout_to_any(real);
    }

    fn check_states(&mut self) -> bool {
        let reference = ReferenceData::get();
        let mut us_count = 0u64;
        let mut ca_count = 0u64;
        let mut misses = 0u64;
        let mut new_outliers: Vec<(String, u64)> = Vec::new();

        for (key, count) in &self.cardinality {
            if reference.is_us_state(key) {
                us_count += count;
            } else if reference.is_ca_province(key) {
                ca_count += count;
            } else {
                misses += 1;
                new_outliers.push((key.clone(), *count));
            }
        }
        if misses >= 3 {
            return false;
        }
        let qualifier = match (us_count > 0, ca_count > 0) {
            (true, true) => Qualifier::NaState,
            (true, false) => Qualifier::UsState,
            (false, true) => Qualifier::CaProvince,
            (false, false) => return false,
        };

        self.adopt_logical_type(qualifier, us_count + ca_count, new_outliers);
        true
    }

    /// Uniform-length set test (month abbreviations): tolerates at most 5%
    /// misses by count and fewer than 4 distinct miss groups. Existing
    /// outliers count against the budget.
    fn check_uniform_set(
        &mut self,
        is_member: &dyn Fn(&str) -> bool,
        qualifier: Qualifier,
        real: u64,
    ) -> bool {
        let mut misses = 0u64;
        let mut miss_count: u64 = self.outliers.values().sum();
        misses += self.outliers.len() as u64;
        if miss_count * 20 > real {
            return false;
        }

        let mut valid = 0u64;
        let mut new_outliers: Vec<(String, u64)> = Vec::new();
        for (key, count) in &self.cardinality {
            if is_member(key) {
                valid += count;
            } else {
                misses += 1;
                miss_count += count;
                new_outliers.push((key.clone(), *count));
                if miss_count * 20 > real {
                    return false;
                }
            }
        }
        if miss_count * 20 > real || misses >= 4 || valid == 0 {
            return false;
        }

        self.adopt_logical_type(qualifier, valid, new_outliers);
        true
    }

    /// Variable-length set test (gender, country): tolerates up to 40%
    /// misses by count and at most sqrt(set size) miss groups.
    fn check_variable_set(
        &mut self,
        is_member: &dyn Fn(&str) -> bool,
        qualifier: Qualifier,
        set_len: usize,
        real: u64,
    ) -> bool {
        let mut valid = 0u64;
        let mut misses = 0u64;
        let mut miss_count = 0u64;
        let mut new_outliers: Vec<(String, u64)> = Vec::new();

        for (key, count) in &self.cardinality {
            if is_member(key) {
                valid += count;
            } else {
                misses += 1;
                miss_count += count;
                new_outliers.push((key.clone(), *count));
                if miss_count as f64 / real as f64 > 0.40 {
                    return false;
                }
            }
        }
        if miss_count as f64 / real as f64 > 0.40
            || misses as f64 > (set_len as f64).sqrt()
            || valid == 0
        {
            return false;
        }

        self.adopt_logical_type(qualifier, valid, new_outliers);
        true
    }

    fn adopt_logical_type(
        &mut self,
        qualifier: Qualifier,
        valid: u64,
        new_outliers: Vec<(String, u64)>,
    ) {
        debug!("{}: logical type {}", self.name, qualifier);
        if let Some(info) = PatternRegistry::get().logical(SemanticType::String, qualifier) {
            self.match_pattern = Some(info.clone());
        }
        self.match_count = valid;
        for (key, count) in new_outliers {
            self.cardinality.remove(&key);
            match self.outliers.get_mut(&key) {
                Some(existing) => *existing += count,
                None => {
                    if self.outliers.len() < self.max_outliers {
                        self.outliers.insert(key, count);
                    }
                }
            }
        }
    }

    fn finalize_long_pattern(&mut self) {
        if let (Some(min), Some(max)) = (self.min_trimmed_length, self.max_trimmed_length) {
            let pattern = if min == max {
                format!("\\d{{{min}}}")
            } else {
                format!("\\d{{{min},{max}}}")
            };
            let mut info = PatternInfo::new(pattern, SemanticType::Long);
            info.min_length = Some(min);
            info.max_length = Some(max);
            self.match_pattern = Some(info);
        }
    }

    fn reflect_double(&mut self) {
        let Some(info) = self.match_pattern.clone() else {
            return;
        };
        if info.semantic_type == SemanticType::Double
            && info.qualifier.is_none()
            && info.pattern == DOUBLE_PATTERN
            && self.negative_doubles > 0
        {
            if let Some(signed) = PatternRegistry::get().structural(SIGNED_DOUBLE_PATTERN) {
                self.match_pattern = Some(signed.clone());
            }
        }
    }

    fn reflect_long(&mut self, real: u64) {
        let Some(info) = self.match_pattern.clone() else {
            return;
        };
        if info.semantic_type != SemanticType::Long {
            return;
        }

        if info.qualifier.is_none() && info.pattern == LONG_PATTERN && self.negative_longs > 0 {
            if let Some(signed) = PatternRegistry::get().structural(SIGNED_LONG_PATTERN) {
                self.match_pattern = Some(signed.clone());
            }
            return;
        }
        if info.pattern != LONG_PATTERN {
            return;
        }

        if let (Some(min_long), Some(max_long)) = (self.min_long, self.max_long) {
            if self.cardinality.len() == 2 && min_long == 0 && max_long == 1 {
                // A boolean in integer clothing
                if let Some(boolean) = PatternRegistry::get().structural("[0|1]") {
                    self.match_pattern = Some(boolean.clone());
                }
                self.min_boolean = Some("0".to_string());
                self.max_boolean = Some("1".to_string());
                return;
            }

            let name = self.name.to_lowercase();
            let datish =
                name.contains("date") || name.contains("year") || self.cardinality.len() > 10;
            if datish && min_long >= 1801 && max_long <= 2029 {
                debug!("{}: integers in year range, reclassifying as Date", self.name);
                let mut date = PatternInfo::new("\\d{4}", SemanticType::LocalDate);
                date.format = Some("yyyy".to_string());
                self.match_pattern = Some(date);
                return;
            }
            if datish && min_long >= 19_000_101 && max_long <= 20_400_100 {
                debug!(
                    "{}: integers in compact-date range, reclassifying as Date",
                    self.name
                );
                let mut date = PatternInfo::new("\\d{8}", SemanticType::LocalDate);
                date.format = Some("yyyyMMdd".to_string());
                self.match_pattern = Some(date);
                return;
            }
        }

        if real > self.reflection_samples && ratio(self.match_count, real) < 0.9 {
            // Thought it was an integer stream, but it does not feel like one
            self.backout_to_any(real);
            return;
        }
        self.finalize_long_pattern();
    }

    fn reflect_string(&mut self, real: u64) {
        let Some(info) = self.match_pattern.clone() else {
            return;
        };
        if info.semantic_type != SemanticType::String || info.qualifier.is_some() {
            return;
        }

        // Fixed-length hypothesis that stopped fitting
        if let (Some(min), Some(max)) = (info.min_length, info.max_length) {
            if min == max
                && real > self.reflection_samples
                && ratio(self.match_count, real) < 0.95
            {
                self.backout_to_any(real);
                return;
            }
        }

        let reference = ReferenceData::get();
        let mut identified = false;
        if real > self.reflection_samples && self.cardinality.len() > 1 {
            let unique_upper = {
                let mut keys: Vec<String> = self
                    .cardinality
                    .keys()
                    .map(|key| key.trim().to_uppercase())
                    .collect();
                keys.sort();
                keys.dedup();
                keys.len()
            };

            if info.pattern == "\\p{Alpha}{3}" && unique_upper <= 12 + 2 {
                let months: Vec<String> = self
                    .locale
                    .short_months
                    .iter()
                    .map(|month| month.to_uppercase())
                    .collect();
                identified = self.check_uniform_set(
                    &|key| months.iter().any(|month| month == &key.trim().to_uppercase()),
                    Qualifier::MonthAbbr,
                    real,
                );
            }

            if !identified
                && info.pattern == "\\p{Alpha}{2}"
                && self.cardinality.len()
                    < reference.us_state_count() + reference.ca_province_count() + 5
            {
                let name = self.name.to_lowercase();
                if name.contains("state")
                    || name.contains("province")
                    || self.cardinality.len() > 5
                {
                    identified = self.check_states();
                }
            }

            if !identified && self.cardinality.len() <= reference.gender_count() {
                identified = self.check_variable_set(
                    &|key| reference.is_gender(key),
                    Qualifier::Gender,
                    reference.gender_count(),
                    real,
                );
            }
            if !identified && self.cardinality.len() <= reference.country_count() {
                identified = self.check_variable_set(
                    &|key| reference.is_country(key),
                    Qualifier::Country,
                    reference.country_count(),
                    real,
                );
            }
        }
        if identified {
            return;
        }

        // Length finalization for the open-ended shapes
        let Some(info) = self.match_pattern.clone() else {
            return;
        };
        if info.pattern == ALPHA_PATTERN || info.pattern == ALNUM_PATTERN {
            if let (Some(min), Some(max)) = (self.min_trimmed_length, self.max_trimmed_length) {
                let base = if info.pattern == ALPHA_PATTERN {
                    "\\p{Alpha}"
                } else {
                    "\\p{Alnum}"
                };
                let pattern = if min == max {
                    format!("{base}{{{min}}}")
                } else {
                    format!("{base}{{{min},{max}}}")
                };
                let mut bounded = PatternInfo::new(pattern, SemanticType::String);
                bounded.min_length = Some(min);
                bounded.max_length = Some(max);
                self.match_pattern = Some(bounded);
            }
        } else if info.pattern == ANY_PATTERN {
            if let (Some(min), Some(max)) = (self.min_raw_length, self.max_raw_length) {
                let pattern = if min == max {
                    format!(".{{{min}}}")
                } else {
                    format!(".{{{min},{max}}}")
                };
                let mut bounded = PatternInfo::new(pattern, SemanticType::String);
                bounded.min_length = Some(min);
                bounded.max_length = Some(max);
                self.match_pattern = Some(bounded);
            }
        }
    }

    fn render_extremes(
        &self,
        info: &PatternInfo,
    ) -> (Option<String>, Option<String>, Option<String>) {
        if !self.collect_statistics {
            return (None, None, None);
        }
        match info.semantic_type {
            SemanticType::Boolean => (self.min_boolean.clone(), self.max_boolean.clone(), None),
            SemanticType::Long => (
                self.min_long.map(|v| v.to_string()),
                self.max_long.map(|v| v.to_string()),
                Some(self.sum_long.to_string()),
            ),
            SemanticType::Double => (
                self.min_double.map(|v| v.to_string()),
                self.max_double.map(|v| v.to_string()),
                Some(self.sum_double.to_string()),
            ),
            SemanticType::String => match info.qualifier {
                Some(Qualifier::Null) => (None, None, None),
                Some(Qualifier::Blank | Qualifier::BlankOrNull) => {
                    let min = " ".repeat(self.min_raw_length.unwrap_or(0));
                    let max = " ".repeat(self.max_raw_length.unwrap_or(0));
                    (Some(min), Some(max), None)
                }
                _ => (self.min_string.clone(), self.max_string.clone(), None),
            },
            _ => {
                if let (Some((_, min)), Some((_, max))) = (&self.min_temporal, &self.max_temporal) {
                    (Some(min.clone()), Some(max.clone()), None)
                } else {
                    // Reclassified integer stream (yyyy / yyyyMMdd)
                    (
                        self.min_long.map(|v| v.to_string()),
                        self.max_long.map(|v| v.to_string()),
                        None,
                    )
                }
            }
        }
    }

    /// Determine the result of the training so far. May be called at any
    /// point; reflections run but training may continue afterwards.
    pub fn result(&mut self) -> ProfileResult {
        if self.match_pattern.is_none() {
            self.determine_type();
        }

        let real = self.real_samples();
        let degenerate = self.sample_count > 0 && real == 0;

        if degenerate {
            let qualifier = if self.null_count == self.sample_count {
                Qualifier::Null
            } else if self.blank_count == self.sample_count {
                Qualifier::Blank
            } else {
                Qualifier::BlankOrNull
            };
            if let Some(info) = PatternRegistry::get().logical(SemanticType::String, qualifier) {
                self.match_pattern = Some(info.clone());
            }
            self.match_count = self.sample_count;
        } else if self.sample_count > 0 {
            if self
                .match_pattern
                .as_ref()
                .is_some_and(|info| info.qualifier == Some(Qualifier::Zip))
            {
                let confidence = ratio(self.match_count, real);
                if (real > self.reflection_samples && confidence < 0.9)
                    || self.cardinality.len() < 5
                {
                    self.backout_zip(real);
                }
            }

            self.reflect_long(real);
            self.reflect_double();
            self.reflect_string(real);

            if self.max_outliers > 0 && self.outliers.len() >= self.max_outliers {
                self.conditional_backout(real);
                self.reflect_string(real);
            }
        }

        let info = self
            .match_pattern
            .clone()
            .unwrap_or_else(|| PatternInfo::new(ANY_PATTERN, SemanticType::String));

        let confidence = if degenerate {
            if self.sample_count >= 10 {
                1.0
            } else {
                0.0
            }
        } else if real == 0 {
            0.0
        } else {
            ratio(self.match_count, real)
        };

        let (min_raw, max_raw) = if info.qualifier == Some(Qualifier::Null) {
            (0, 0)
        } else {
            (
                self.min_raw_length.unwrap_or(0),
                self.max_raw_length.unwrap_or(0),
            )
        };

        let is_key = self.sample_count > MIN_SAMPLES_FOR_KEY
            && self.max_cardinality as u64 >= MIN_SAMPLES_FOR_KEY / 2
            && self.cardinality.len() >= self.max_cardinality
            && self.blank_count == 0
            && self.null_count == 0
            && info.qualifier.is_none()
            && (info.semantic_type == SemanticType::Long
                || (info.semantic_type == SemanticType::String
                    && min_raw == max_raw
                    && min_raw < 32))
            && self.cardinality.values().all(|&count| count == 1);

        let (min_value, max_value, sum) = self.render_extremes(&info);

        ProfileResult {
            name: self.name.clone(),
            semantic_type: info.semantic_type,
            type_qualifier: info.qualifier,
            pattern: info.pattern.clone(),
            format_string: info.format.clone(),
            sample_count: self.sample_count,
            match_count: self.match_count,
            null_count: self.null_count,
            blank_count: self.blank_count,
            leading_zero_count: self.total_leading_zeros,
            confidence,
            min_value,
            max_value,
            sum,
            min_raw_length: min_raw,
            max_raw_length: max_raw,
            cardinality: self.cardinality.clone(),
            outliers: self.outliers.clone(),
            is_key,
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_locked_after_training() {
        let mut profiler = Profiler::new("locked");
        profiler.train(Some("hello"));
        assert!(matches!(
            profiler.set_sample_size(25),
            Err(ProfilerError::TrainingStarted(_))
        ));
        assert!(matches!(
            profiler.set_max_cardinality(100),
            Err(ProfilerError::TrainingStarted(_))
        ));
        assert!(matches!(
            profiler.set_max_outliers(10),
            Err(ProfilerError::TrainingStarted(_))
        ));
        assert!(matches!(
            profiler.set_locale(Locale::en_gb()),
            Err(ProfilerError::TrainingStarted(_))
        ));
    }

    #[test]
    fn test_sample_size_minimum() {
        let mut profiler = Profiler::new("size");
        assert!(matches!(
            profiler.set_sample_size(10),
            Err(ProfilerError::SampleSizeTooSmall(_))
        ));
        assert!(profiler.set_sample_size(40).is_ok());
        assert_eq!(profiler.sample_size(), 40);
    }

    #[test]
    fn test_lock_position() {
        let mut profiler = Profiler::new("lock");
        let mut locked_at = None;
        for i in 0..30 {
            if profiler.train(Some(&i.to_string())) && locked_at.is_none() {
                locked_at = Some(i);
            }
        }
        // The window holds sample_size entries; the next real sample locks
        assert_eq!(locked_at, Some(20));
    }

    #[test]
    fn test_empty_profiler_result() {
        let mut profiler = Profiler::new("empty");
        let result = profiler.result();
        assert_eq!(result.sample_count(), 0);
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_statistics_can_be_disabled() {
        let mut profiler = Profiler::new("nostats");
        profiler.set_collect_statistics(false).unwrap();
        for i in 0..25 {
            profiler.train(Some(&i.to_string()));
        }
        let result = profiler.result();
        assert_eq!(result.semantic_type(), SemanticType::Long);
        assert_eq!(result.min_value(), None);
        assert_eq!(result.max_value(), None);
        assert_eq!(result.sum(), None);
    }
}
