use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{Result, SaturnError};

/// Keywords describing the data layout. They are regenerated on write and
/// never copied from a source header.
const STRUCTURAL_KEYWORDS: [&str; 9] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "BZERO", "BSCALE",
];

/// Parsed value of a header card.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => Some(f.round() as i64),
            Self::String(s) => s.trim().parse().ok(),
            Self::Logical(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            Self::Logical(_) => None,
        }
    }

    fn format(&self) -> String {
        match self {
            Self::String(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{:<8}'", escaped)
            }
            Self::Integer(i) => format!("{:>20}", i),
            Self::Float(f) => format!("{:>20}", format_float(*f)),
            Self::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// One 80-character header record.
#[derive(Clone, Debug)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: Option<HeaderValue>,
    /// Free text: the comment after `/`, or the body of COMMENT/HISTORY cards.
    pub text: String,
}

impl HeaderCard {
    fn render(&self) -> String {
        let mut line = match &self.value {
            Some(value) => {
                let mut s = format!("{:<8}= {}", self.keyword, value.format());
                if !self.text.is_empty() {
                    s.push_str(" / ");
                    s.push_str(&self.text);
                }
                s
            }
            None => format!("{:<8}{}", self.keyword, self.text),
        };
        line.truncate(FITS_CARD_SIZE);
        format!("{:<width$}", line, width = FITS_CARD_SIZE)
    }
}

/// Ordered FITS primary header. Keyword lookups are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct FitsHeader {
    cards: Vec<HeaderCard>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|c| c.value.is_some() && c.keyword.eq_ignore_ascii_case(keyword))
            .and_then(|c| c.value.as_ref())
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Insert or replace a valued card.
    pub fn set(&mut self, keyword: &str, value: HeaderValue) {
        let keyword = keyword.to_ascii_uppercase();
        if let Some(card) = self
            .cards
            .iter_mut()
            .find(|c| c.value.is_some() && c.keyword == keyword)
        {
            card.value = Some(value);
            return;
        }
        self.cards.push(HeaderCard {
            keyword,
            value: Some(value),
            text: String::new(),
        });
    }

    pub fn remove(&mut self, keyword: &str) {
        self.cards
            .retain(|c| !(c.value.is_some() && c.keyword.eq_ignore_ascii_case(keyword)));
    }

    pub fn push_history(&mut self, text: &str) {
        self.cards.push(HeaderCard {
            keyword: "HISTORY".into(),
            value: None,
            text: text.to_string(),
        });
    }
}

fn parse_card(record: &str) -> Option<HeaderCard> {
    let keyword = record.get(..8).unwrap_or(record).trim().to_string();
    if keyword.is_empty() {
        return None;
    }
    let rest = record.get(8..).unwrap_or("");
    if let Some(body) = rest.strip_prefix("= ") {
        let (value, text) = parse_value(body);
        return Some(HeaderCard {
            keyword,
            value,
            text,
        });
    }
    Some(HeaderCard {
        keyword,
        value: None,
        text: rest.trim_end().to_string(),
    })
}

/// Parse the value field of a card, returning the value and trailing comment.
fn parse_value(body: &str) -> (Option<HeaderValue>, String) {
    let body = body.trim_start();
    if let Some(quoted) = body.strip_prefix('\'') {
        // '' inside a string is an escaped quote
        let mut value = String::new();
        let mut chars = quoted.char_indices().peekable();
        let mut end = quoted.len();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = i + 1;
                    break;
                }
            } else {
                value.push(ch);
            }
        }
        let comment = quoted[end..]
            .split_once('/')
            .map(|(_, c)| c.trim().to_string())
            .unwrap_or_default();
        return (Some(HeaderValue::String(value.trim_end().to_string())), comment);
    }

    let (raw, comment) = match body.split_once('/') {
        Some((v, c)) => (v.trim(), c.trim().to_string()),
        None => (body.trim(), String::new()),
    };
    let value = match raw {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => raw
            .parse::<i64>()
            .map(HeaderValue::Integer)
            .or_else(|_| raw.replace(['D', 'd'], "E").parse::<f64>().map(HeaderValue::Float))
            .ok(),
    };
    (value, comment)
}

/// Memory-mapped FITS primary HDU reader.
pub struct FitsReader {
    mmap: Mmap,
    pub header: FitsHeader,
    data_offset: usize,
}

impl FitsReader {
    /// Open a FITS file and parse its primary header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < FITS_BLOCK_SIZE || !mmap.starts_with(b"SIMPLE  =") {
            return Err(SaturnError::InvalidFits(format!(
                "{} is not a FITS file",
                path.display()
            )));
        }

        let (header, data_offset) = parse_header(&mmap)?;
        Ok(Self {
            mmap,
            header,
            data_offset,
        })
    }

    /// Image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> Result<(usize, usize)> {
        let naxis = self.header.get_i64("NAXIS").unwrap_or(0);
        if naxis < 2 {
            return Err(SaturnError::InvalidFits(format!(
                "expected a 2D image, NAXIS = {naxis}"
            )));
        }
        if naxis > 2 && self.header.get_i64("NAXIS3").unwrap_or(1) != 1 {
            return Err(SaturnError::InvalidFits(
                "multi-plane images are not supported".into(),
            ));
        }
        let width = self
            .header
            .get_i64("NAXIS1")
            .ok_or_else(|| SaturnError::InvalidFits("missing NAXIS1".into()))?;
        let height = self
            .header
            .get_i64("NAXIS2")
            .ok_or_else(|| SaturnError::InvalidFits("missing NAXIS2".into()))?;
        Ok((width.max(0) as usize, height.max(0) as usize))
    }

    /// Decode the primary image into physical values (BSCALE/BZERO applied).
    pub fn read_image(&self) -> Result<Array2<f32>> {
        let (w, h) = self.dimensions()?;
        let bitpix = self
            .header
            .get_i64("BITPIX")
            .ok_or_else(|| SaturnError::InvalidFits("missing BITPIX".into()))?;
        let bzero = self.header.get_f64("BZERO").unwrap_or(0.0);
        let bscale = self.header.get_f64("BSCALE").unwrap_or(1.0);

        let bytes_per = match bitpix {
            8 => 1,
            16 => 2,
            32 | -32 => 4,
            -64 => 8,
            other => return Err(SaturnError::UnsupportedBitpix(other)),
        };
        let too_large = || SaturnError::InvalidFits(format!("image of {w}x{h} pixels is too large"));
        let len = w
            .checked_mul(h)
            .and_then(|n| n.checked_mul(bytes_per))
            .ok_or_else(too_large)?;
        let end = self.data_offset.checked_add(len).ok_or_else(too_large)?;
        let raw = self
            .mmap
            .get(self.data_offset..end)
            .ok_or_else(|| {
                SaturnError::InvalidFits(format!(
                    "data truncated: expected {} bytes after header",
                    len
                ))
            })?;

        let decode = |chunk: &[u8]| -> f64 {
            match bitpix {
                8 => chunk[0] as f64,
                16 => BigEndian::read_i16(chunk) as f64,
                32 => BigEndian::read_i32(chunk) as f64,
                -32 => BigEndian::read_f32(chunk) as f64,
                _ => BigEndian::read_f64(chunk),
            }
        };
        let values: Vec<f32> = raw
            .chunks_exact(bytes_per)
            .map(|c| (decode(c) * bscale + bzero) as f32)
            .collect();

        Array2::from_shape_vec((h, w), values)
            .map_err(|e| SaturnError::InvalidFits(format!("bad image shape: {e}")))
    }
}

fn parse_header(bytes: &[u8]) -> Result<(FitsHeader, usize)> {
    let mut header = FitsHeader::new();
    let mut offset = 0;
    loop {
        let record = bytes
            .get(offset..offset + FITS_CARD_SIZE)
            .ok_or_else(|| SaturnError::InvalidFits("header has no END card".into()))?;
        offset += FITS_CARD_SIZE;
        let record = String::from_utf8_lossy(record);
        if record.get(..8).map(str::trim_end) == Some("END") {
            break;
        }
        if let Some(card) = parse_card(&record) {
            header.cards.push(card);
        }
    }
    let data_offset = offset.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
    Ok((header, data_offset))
}

/// Read only the primary header of a FITS file.
pub fn read_header(path: &Path) -> Result<FitsHeader> {
    Ok(FitsReader::open(path)?.header)
}

/// Read the primary image and its header.
pub fn read_fits(path: &Path) -> Result<(Array2<f32>, FitsHeader)> {
    let reader = FitsReader::open(path)?;
    let data = reader.read_image()?;
    Ok((data, reader.header))
}

/// Write a 32-bit float FITS file.
///
/// Non-structural cards of `header` are carried over in order; the layout
/// keywords are regenerated from `data`.
pub fn write_fits(path: &Path, data: &Array2<f32>, header: &FitsHeader) -> Result<()> {
    let (h, w) = data.dim();
    let mut cards = vec![
        HeaderCard {
            keyword: "SIMPLE".into(),
            value: Some(HeaderValue::Logical(true)),
            text: String::new(),
        },
        HeaderCard {
            keyword: "BITPIX".into(),
            value: Some(HeaderValue::Integer(-32)),
            text: String::new(),
        },
        HeaderCard {
            keyword: "NAXIS".into(),
            value: Some(HeaderValue::Integer(2)),
            text: String::new(),
        },
        HeaderCard {
            keyword: "NAXIS1".into(),
            value: Some(HeaderValue::Integer(w as i64)),
            text: String::new(),
        },
        HeaderCard {
            keyword: "NAXIS2".into(),
            value: Some(HeaderValue::Integer(h as i64)),
            text: String::new(),
        },
    ];
    cards.extend(
        header
            .cards
            .iter()
            .filter(|c| {
                !STRUCTURAL_KEYWORDS
                    .iter()
                    .any(|k| c.keyword.eq_ignore_ascii_case(k))
            })
            .cloned(),
    );

    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for card in &cards {
        out.write_all(card.render().as_bytes())?;
        written += FITS_CARD_SIZE;
    }
    out.write_all(format!("{:<width$}", "END", width = FITS_CARD_SIZE).as_bytes())?;
    written += FITS_CARD_SIZE;
    let pad = written.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE - written;
    out.write_all(&vec![b' '; pad])?;

    for &v in data.iter() {
        out.write_f32::<BigEndian>(v)?;
    }
    let data_len = w * h * 4;
    let pad = data_len.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE - data_len;
    out.write_all(&vec![0u8; pad])?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_string_value_with_comment() {
        let (v, c) = parse_value("'ZWO ASI2600MM Pro'  / camera");
        assert_eq!(v, Some(HeaderValue::String("ZWO ASI2600MM Pro".into())));
        assert_eq!(c, "camera");
    }

    #[test]
    fn parse_escaped_quote() {
        let (v, _) = parse_value("'O''Brien'");
        assert_eq!(v, Some(HeaderValue::String("O'Brien".into())));
    }

    #[test]
    fn parse_numeric_and_logical_values() {
        assert_eq!(parse_value("  300 / s").0, Some(HeaderValue::Integer(300)));
        assert_eq!(parse_value("-10.5").0, Some(HeaderValue::Float(-10.5)));
        assert_eq!(parse_value("1.5D2").0, Some(HeaderValue::Float(150.0)));
        assert_eq!(parse_value("T").0, Some(HeaderValue::Logical(true)));
    }

    #[test]
    fn rendered_card_is_80_chars() {
        let card = HeaderCard {
            keyword: "OBJECT".into(),
            value: Some(HeaderValue::String("M51".into())),
            text: String::new(),
        };
        let line = card.render();
        assert_eq!(line.len(), FITS_CARD_SIZE);
        assert!(line.starts_with("OBJECT  = 'M51     '"));
    }

    fn header_only_file(path: &Path, width: i64, height: i64) {
        let cards = [
            ("SIMPLE", HeaderValue::Logical(true)),
            ("BITPIX", HeaderValue::Integer(16)),
            ("NAXIS", HeaderValue::Integer(2)),
            ("NAXIS1", HeaderValue::Integer(width)),
            ("NAXIS2", HeaderValue::Integer(height)),
        ];
        let mut bytes: Vec<u8> = cards
            .into_iter()
            .flat_map(|(keyword, value)| {
                HeaderCard {
                    keyword: keyword.into(),
                    value: Some(value),
                    text: String::new(),
                }
                .render()
                .into_bytes()
            })
            .collect();
        bytes.extend(format!("{:<width$}", "END", width = FITS_CARD_SIZE).bytes());
        bytes.resize(FITS_BLOCK_SIZE, b' ');
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn oversized_dimensions_are_invalid_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.fit");
        header_only_file(&path, 8_589_934_592, 8_589_934_592);
        let err = read_fits(&path).unwrap_err();
        assert!(matches!(err, SaturnError::InvalidFits(_)));
    }

    #[test]
    fn truncated_data_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.fit");
        header_only_file(&path, 64, 64);
        assert!(matches!(read_fits(&path), Err(SaturnError::InvalidFits(_))));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut header = FitsHeader::new();
        header.set("exptime", HeaderValue::Float(300.0));
        assert_eq!(header.get_f64("EXPTIME"), Some(300.0));
        header.remove("EXPTIME");
        assert!(!header.contains("exptime"));
    }
}
