//! Pure field extractors. Every one of them signals failure with `None`, never a panic.

use std::sync::OnceLock;

use regex::Regex;

/// Label the site puts in front of the floor number ("floor no.").
const FLOOR_LABEL: &str = "ชั้นที่";

const CORNER_KEYWORDS: &[&str] = &["corner", "มุม"];
const RIVER_KEYWORDS: &[&str] = &["river", "แม่น้ำ"];
const TRANSIT_KEYWORDS: &[&str] = &["bts", "mrt", "ใกล้รถไฟฟ้า"];

/// Flags derived from the listing title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordFlags {
    pub is_corner: bool,
    pub is_river_view: bool,
    pub near_bts: bool,
}

/// Keeps only the digits of `text` and parses them. `None` if there are no digits
/// or the number doesn't fit.
pub fn parse_price(text: &str) -> Option<u64> {
    let digits = digits_only(text);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Turns the floor description into a single number.
///
/// * `"3-4"`  -> `3.5` (mean of the range)
/// * `"12"`   -> `12.0`
/// * `"30+"`  -> `32.0` (open ended, guessed two floors up)
///
/// Anything else gives `None`.
pub fn parse_floor(text: &str) -> Option<f64> {
    let text = text.replace(FLOOR_LABEL, "");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.contains('-') {
        let mut parts = text.split('-');
        let (low, high) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let low: f64 = low.trim().parse().ok()?;
        let high: f64 = high.trim().parse().ok()?;
        Some((low + high) / 2.0)
    } else if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else if text.contains('+') {
        let digits = digits_only(text);
        let base: f64 = digits.parse().ok()?;
        Some(base + 2.0)
    } else {
        None
    }
}

/// Case-insensitive keyword search over the title, in English and Thai.
pub fn extract_keywords(text: Option<&str>) -> KeywordFlags {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return KeywordFlags::default();
    };
    let text = text.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    KeywordFlags {
        is_corner: has_any(CORNER_KEYWORDS),
        is_river_view: has_any(RIVER_KEYWORDS),
        near_bts: has_any(TRANSIT_KEYWORDS),
    }
}

/// First decimal number in the text, e.g. `"35.5 ตร.ม."` -> `35.5`.
pub fn first_decimal(text: &str) -> Option<f64> {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    let re = DECIMAL.get_or_init(|| Regex::new(r"\d+(\.\d+)?").expect("valid decimal regex"));
    re.find(text)?.as_str().parse().ok()
}

/// First run of digits in the text, e.g. `"2 ห้องนอน"` -> `2`.
pub fn first_integer(text: &str) -> Option<u32> {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    let re = INTEGER.get_or_init(|| Regex::new(r"\d+").expect("valid integer regex"));
    re.find(text)?.as_str().parse().ok()
}

#[inline]
fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}
