//! Reference data sets used for logical-type detection.
//!
//! Each set is plain UTF-8 text embedded at build time, one entry per line,
//! loaded exactly once and then read-only. Lookups normalize with trim +
//! uppercase so the raw sample casing never matters.

use std::sync::LazyLock;

use foldhash::{HashSet, HashSetExt};

/// The known gender markers. Small enough to live in code.
const GENDERS: [&str; 4] = ["F", "M", "FEMALE", "MALE"];

/// All reference sets, loaded once per process.
#[derive(Debug)]
pub struct ReferenceData {
    zips: HashSet<&'static str>,
    us_states: HashSet<&'static str>,
    ca_provinces: HashSet<&'static str>,
    countries: HashSet<&'static str>,
    address_markers: HashSet<&'static str>,
    zone_names: HashSet<&'static str>,
    genders: HashSet<&'static str>,
}

static REFERENCE: LazyLock<ReferenceData> = LazyLock::new(|| {
    let mut genders = HashSet::with_capacity(GENDERS.len());
    for gender in GENDERS {
        genders.insert(gender);
    }
    ReferenceData {
        zips: load(include_str!("../data/us_zips.csv")),
        us_states: load(include_str!("../data/us_states.csv")),
        ca_provinces: load(include_str!("../data/ca_provinces.csv")),
        countries: load(include_str!("../data/countries.csv")),
        address_markers: load(include_str!("../data/address_markers.csv")),
        zone_names: load(include_str!("../data/zone_names.csv")),
        genders,
    }
});

fn load(raw: &'static str) -> HashSet<&'static str> {
    let mut set = HashSet::with_capacity(raw.lines().count());
    for line in raw.lines() {
        let line = line.trim();
        if !line.is_empty() {
            set.insert(line);
        }
    }
    set
}

impl ReferenceData {
    /// The process-wide reference data.
    pub fn get() -> &'static ReferenceData {
        &REFERENCE
    }

    fn normalized(value: &str) -> String {
        value.trim().to_uppercase()
    }

    /// Is this a known US ZIP code? Exact form, no normalization: a ZIP
    /// with lowercase letters in it was never a ZIP to begin with.
    pub fn is_zip(&self, value: &str) -> bool {
        self.zips.contains(value.trim())
    }

    pub fn is_us_state(&self, value: &str) -> bool {
        self.us_states.contains(Self::normalized(value).as_str())
    }

    pub fn is_ca_province(&self, value: &str) -> bool {
        self.ca_provinces.contains(Self::normalized(value).as_str())
    }

    pub fn is_country(&self, value: &str) -> bool {
        self.countries.contains(Self::normalized(value).as_str())
    }

    pub fn is_address_marker(&self, value: &str) -> bool {
        self.address_markers.contains(Self::normalized(value).as_str())
    }

    /// Named timezones are matched exactly: zone names are uppercase by
    /// convention and `gmt` is not a zone.
    pub fn is_zone_name(&self, value: &str) -> bool {
        self.zone_names.contains(value)
    }

    pub fn is_gender(&self, value: &str) -> bool {
        self.genders.contains(Self::normalized(value).as_str())
    }

    pub fn zip_count(&self) -> usize {
        self.zips.len()
    }

    pub fn us_state_count(&self) -> usize {
        self.us_states.len()
    }

    pub fn ca_province_count(&self) -> usize {
        self.ca_provinces.len()
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn gender_count(&self) -> usize {
        self.genders.len()
    }

    /// Does the final space-delimited token mark a street address?
    pub fn ends_with_address_marker(&self, value: &str) -> bool {
        match value.trim().rsplit(' ').next() {
            Some(last) if last.len() < value.trim().len() => self.is_address_marker(last),
            _ => false,
        }
    }

    /// Full address check: either the last word is a marker, or the value
    /// starts with a house number and contains a marker among its inner
    /// words (e.g. "25 S. Hawthorne St. Apt 7").
    pub fn is_address(&self, value: &str) -> bool {
        let trimmed = value.trim();
        if trimmed.len() > 60 {
            return false;
        }

        if self.ends_with_address_marker(trimmed) {
            return true;
        }

        if !trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return false;
        }

        let words: Vec<&str> = trimmed.split(' ').collect();
        if words.len() < 4 {
            return false;
        }
        words[1..words.len() - 1]
            .iter()
            .any(|w| self.is_address_marker(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_lookup() {
        let reference = ReferenceData::get();
        assert!(reference.is_zip("01770"));
        assert!(reference.is_zip(" 10044 "));
        assert!(!reference.is_zip("99999"));
        assert!(!reference.is_zip("1770"));
    }

    #[test]
    fn test_state_lookup_normalizes() {
        let reference = ReferenceData::get();
        assert!(reference.is_us_state("MA"));
        assert!(reference.is_us_state("ma"));
        assert!(reference.is_us_state(" Tx "));
        assert!(!reference.is_us_state("ZZ"));
        assert!(reference.is_ca_province("ON"));
        assert!(!reference.is_ca_province("MA"));
    }

    #[test]
    fn test_country_lookup() {
        let reference = ReferenceData::get();
        assert!(reference.is_country("France"));
        assert!(reference.is_country("UNITED STATES"));
        assert!(!reference.is_country("Atlantis"));
    }

    #[test]
    fn test_zone_names_are_case_sensitive() {
        let reference = ReferenceData::get();
        assert!(reference.is_zone_name("GMT"));
        assert!(reference.is_zone_name("UTC"));
        assert!(!reference.is_zone_name("gmt"));
        assert!(!reference.is_zone_name("AGT"));
    }

    #[test]
    fn test_address_detection() {
        let reference = ReferenceData::get();
        assert!(reference.is_address("9885 Princeton Court"));
        assert!(reference.is_address("11 San Pablo Rd."));
        assert!(reference.is_address("25 S. Hawthorne St."));
        assert!(reference.is_address("8412 North Mulberry Dr."));
        assert!(!reference.is_address("hello world"));
        assert!(!reference.is_address("Street"));
    }

    #[test]
    fn test_gender_lookup() {
        let reference = ReferenceData::get();
        assert!(reference.is_gender("m"));
        assert!(reference.is_gender("Female"));
        assert!(!reference.is_gender("x"));
    }
}
