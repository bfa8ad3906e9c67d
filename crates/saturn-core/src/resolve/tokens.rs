//! Parsing of the values encoded in library directory and file names.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TEMPERATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9])(-?\d+)(?:deg|°|c(?:[^a-z]|$))").expect("valid regex")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])(\d{4})[-_]?(\d{2})[-_]?(\d{2})(?:[^0-9]|$)").expect("valid regex")
});

static BIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bin[_-]?(\d+)").expect("valid regex"));

static NXN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z])(\d+)x(\d+)(?:[^0-9a-z]|$)").expect("valid regex")
});

static EXPOSURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z.])(\d+(?:\.\d+)?)\s*(?:secs?|s)(?:[^0-9a-z]|$)")
        .expect("valid regex")
});

/// Temperature in °C encoded in a temperature-pack name (`-10degC`, `T-10C`).
pub fn parse_temperature(name: &str) -> Option<i32> {
    TEMPERATURE_RE
        .captures(name)
        .and_then(|c| c[1].parse().ok())
}

/// Date encoded in a date-pack name (`2023-01-01`, `2023_01_01`, `20230101`).
pub fn parse_date(name: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(name)?;
    let y = caps[1].parse().ok()?;
    let m = caps[2].parse().ok()?;
    let d = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Binning factor encoded in a file name (`bin2`, `2x2`).
pub fn parse_binning(name: &str) -> Option<u32> {
    if let Some(c) = BIN_RE.captures(name) {
        return c[1].parse().ok();
    }
    NXN_RE.captures(name).and_then(|c| c[1].parse().ok())
}

/// Exposure in seconds encoded in a file name (`300s`, `0.5sec`).
pub fn parse_exposure(name: &str) -> Option<f64> {
    EXPOSURE_RE
        .captures(name)
        .and_then(|c| c[1].parse().ok())
}

/// Name split into `_`, `-`, `.` and whitespace separated tokens.
pub fn name_tokens(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// Filter name aliases: canonical name → accepted spellings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterAliases(pub BTreeMap<String, Vec<String>>);

impl Default for FilterAliases {
    fn default() -> Self {
        let table: [(&str, &[&str]); 7] = [
            ("L", &["Lum", "Luminance", "Clear"]),
            ("R", &["Red"]),
            ("G", &["Green"]),
            ("B", &["Blue"]),
            ("Ha", &["Halpha", "H"]),
            ("OIII", &["O3", "O"]),
            ("SII", &["S2", "S"]),
        ];
        Self(
            table
                .iter()
                .map(|(canon, aliases)| {
                    (
                        canon.to_string(),
                        aliases.iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

impl FilterAliases {
    /// Canonical spelling of `filter`, or `filter` itself when unknown.
    pub fn normalize<'a>(&'a self, filter: &'a str) -> &'a str {
        let filter = filter.trim();
        for (canon, aliases) in &self.0 {
            if canon.eq_ignore_ascii_case(filter)
                || aliases.iter().any(|a| a.eq_ignore_ascii_case(filter))
            {
                return canon;
            }
        }
        filter
    }

    pub fn same_filter(&self, a: &str, b: &str) -> bool {
        self.normalize(a).eq_ignore_ascii_case(self.normalize(b))
    }

    /// Whether any token of `name` names the same filter as `filter`.
    pub fn name_has_filter(&self, name: &str, filter: &str) -> bool {
        name_tokens(name).any(|t| self.same_filter(t, filter))
    }
}
