use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, SaturnError};
use crate::frame::BayerPattern;
use crate::io::fits::{read_header, FitsHeader};

/// Acquisition metadata of one frame. Extracted once, never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameMetadata {
    pub instrument: String,
    pub observer: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub object: String,
    pub filter: String,
    /// Set for one-shot-colour frames (`BAYERPAT` present).
    pub cfa: Option<BayerPattern>,
    /// Sensor temperature in whole degrees Celsius.
    pub temperature: i32,
    pub binning: u32,
    /// Exposure in seconds.
    pub exposure: f64,
}

impl FrameMetadata {
    pub fn is_cfa(&self) -> bool {
        self.cfa.is_some()
    }

    /// Build metadata from a decoded header.
    ///
    /// Every required keyword must be present; the first absent one is
    /// reported as [`SaturnError::MetadataMissing`].
    pub fn from_header(header: &FitsHeader, path: &Path) -> Result<Self> {
        let missing = |keyword: &str| SaturnError::MetadataMissing {
            path: path.to_path_buf(),
            keyword: keyword.to_string(),
        };
        let text = |keyword: &str| -> Result<String> {
            header
                .get_str(keyword)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| missing(keyword))
        };

        let instrument = text("INSTRUME")?;
        let observer = text("OBSERVER")?;
        let (date, time) = header
            .get_str("DATE-OBS")
            .and_then(parse_date_obs)
            .ok_or_else(|| missing("DATE-OBS"))?;
        let exposure = header
            .get_f64("EXPTIME")
            .or_else(|| header.get_f64("EXPOSURE"))
            .ok_or_else(|| missing("EXPTIME"))?;
        let temperature = header
            .get_f64("CCD-TEMP")
            .or_else(|| header.get_f64("SET-TEMP"))
            .ok_or_else(|| missing("CCD-TEMP"))?
            .round() as i32;
        let filter = text("FILTER")?;
        let object = text("OBJECT")?;
        let binning = header
            .get_i64("XBINNING")
            .or_else(|| header.get_i64("BINNING"))
            .filter(|b| *b > 0)
            .ok_or_else(|| missing("XBINNING"))? as u32;
        let cfa = header.get_str("BAYERPAT").and_then(BayerPattern::parse);

        Ok(Self {
            instrument,
            observer,
            date,
            time,
            object,
            filter,
            cfa,
            temperature,
            binning,
            exposure,
        })
    }
}

/// Parse `DATE-OBS` as a full timestamp or a bare date.
fn parse_date_obs(s: &str) -> Option<(NaiveDate, NaiveTime)> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some((dt.date(), dt.time()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| (d, NaiveTime::MIN))
}

/// Source of frame headers.
///
/// The pipeline only needs a keyed header map per file; implementors decide
/// how to decode it.
pub trait MetadataSource {
    fn read_header(&self, path: &Path) -> Result<FitsHeader>;

    fn read_metadata(&self, path: &Path) -> Result<FrameMetadata> {
        let header = self.read_header(path)?;
        FrameMetadata::from_header(&header, path)
    }
}

/// Reads metadata from FITS primary headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct FitsMetadataSource;

impl MetadataSource for FitsMetadataSource {
    fn read_header(&self, path: &Path) -> Result<FitsHeader> {
        read_header(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fits::HeaderValue;

    fn full_header() -> FitsHeader {
        let mut h = FitsHeader::new();
        h.set("INSTRUME", HeaderValue::String("ASI2600MM".into()));
        h.set("OBSERVER", HeaderValue::String("jdoe".into()));
        h.set("DATE-OBS", HeaderValue::String("2023-01-01T22:15:03.250".into()));
        h.set("EXPTIME", HeaderValue::Float(300.0));
        h.set("CCD-TEMP", HeaderValue::Float(-9.6));
        h.set("FILTER", HeaderValue::String("L".into()));
        h.set("OBJECT", HeaderValue::String("M51".into()));
        h.set("XBINNING", HeaderValue::Integer(1));
        h
    }

    #[test]
    fn extracts_all_fields() {
        let meta = FrameMetadata::from_header(&full_header(), Path::new("x.fit")).unwrap();
        assert_eq!(meta.instrument, "ASI2600MM");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(meta.temperature, -10);
        assert_eq!(meta.binning, 1);
        assert_eq!(meta.exposure, 300.0);
        assert!(!meta.is_cfa());
    }

    #[test]
    fn missing_filter_is_reported_by_keyword() {
        let mut h = full_header();
        h.remove("FILTER");
        match FrameMetadata::from_header(&h, Path::new("x.fit")) {
            Err(SaturnError::MetadataMissing { keyword, .. }) => assert_eq!(keyword, "FILTER"),
            other => panic!("expected MetadataMissing, got {other:?}"),
        }
    }

    #[test]
    fn fallback_keywords_are_accepted() {
        let mut h = full_header();
        h.remove("EXPTIME");
        h.remove("CCD-TEMP");
        h.set("EXPOSURE", HeaderValue::Integer(120));
        h.set("SET-TEMP", HeaderValue::Integer(0));
        let meta = FrameMetadata::from_header(&h, Path::new("x.fit")).unwrap();
        assert_eq!(meta.exposure, 120.0);
        assert_eq!(meta.temperature, 0);
    }

    #[test]
    fn date_only_timestamp_parses() {
        let (d, t) = parse_date_obs("2024-03-09").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(t, NaiveTime::MIN);
        assert!(parse_date_obs("yesterday").is_none());
    }
}
