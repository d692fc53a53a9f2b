//! PDF date canonicalization
//!
//! Every date written by this crate has the form `D:YYYYMMDDHHmmSS+HH'MM'`,
//! exactly [`CANONICAL_LENGTH`] characters long.

use crate::error::{PdfUtilError, Result};
use chrono::{DateTime, Local, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

pub const CANONICAL_LENGTH: usize = 23;
pub const DEFAULT_OFFSET: &str = "+00'00'";

const PREFIX: &str = "D:";
const DATE_DIGITS: usize = 14;

lazy_static! {
    /// Offsets that are not already canonical: `Z`, `Z00'00'`, `+HH`,
    /// `+HHMM`, `+HH'MM`.
    static ref LOOSE_OFFSET: Regex =
        Regex::new(r"^(?:Z(?:00'?00'?)?|([+-])(\d{2})(?:'?(\d{2})'?)?)$").unwrap();
}

/// Canonicalize a raw date string.
///
/// Absent or empty input stays absent. Short dates are right-padded with
/// zeros, a missing offset becomes `+00'00'`. Applying this to its own
/// output returns the output unchanged.
pub fn normalize(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut text = raw.trim();
    text = text.strip_prefix('(').unwrap_or(text);
    text = text.strip_suffix(')').unwrap_or(text);
    if text.is_empty() {
        return Ok(None);
    }

    let body = text.strip_prefix(PREFIX).unwrap_or(text);
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, suffix) = body.split_at(digits_end);

    if digits.len() > DATE_DIGITS {
        return Err(invalid(raw));
    }

    let offset = canonical_offset(suffix).ok_or_else(|| invalid(raw))?;
    let canonical = format!("{}{:0<width$}{}", PREFIX, digits, offset, width = DATE_DIGITS);
    debug_assert_eq!(canonical.len(), CANONICAL_LENGTH);

    Ok(Some(canonical))
}

/// The current local time in canonical form.
pub fn now() -> String {
    format_date(&Local::now())
}

/// Format any timezone-aware timestamp in canonical form.
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = date.format("%Y%m%d%H%M%S");
    // %:z renders as +HH:MM
    let zone = date.format("%:z").to_string();
    format!("{}{}{}'{}'", PREFIX, stamp, &zone[..3], &zone[4..6])
}

/// Whether `suffix` already is a well-formed `+HH'MM'` offset, checked by
/// position: sign at -7, apostrophes at -4 and -1.
fn is_canonical_offset(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    bytes.len() == DEFAULT_OFFSET.len()
        && matches!(bytes[0], b'+' | b'-')
        && bytes[3] == b'\''
        && bytes[6] == b'\''
        && [1, 2, 4, 5].iter().all(|&i| bytes[i].is_ascii_digit())
}

fn canonical_offset(suffix: &str) -> Option<String> {
    if suffix.is_empty() {
        return Some(DEFAULT_OFFSET.to_string());
    }
    if is_canonical_offset(suffix) {
        return Some(suffix.to_string());
    }

    let caps = LOOSE_OFFSET.captures(suffix)?;
    match caps.get(1) {
        None => Some(DEFAULT_OFFSET.to_string()),
        Some(sign) => {
            let hours = &caps[2];
            let minutes = caps.get(3).map_or("00", |m| m.as_str());
            Some(format!("{}{}'{}'", sign.as_str(), hours, minutes))
        }
    }
}

fn invalid(raw: &str) -> PdfUtilError {
    PdfUtilError::InvalidDate {
        value: raw.to_string(),
    }
}
