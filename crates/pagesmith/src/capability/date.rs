//! Date parsing and formatting for the `date` filter.
//!
//! Format specs use dateformat-style masks:
//!
//! | Token | Output |
//! |-------|--------|
//! | `d` `dd` | day of month, unpadded / padded |
//! | `ddd` `dddd` | `Tue` / `Tuesday` |
//! | `m` `mm` | month number, unpadded / padded |
//! | `mmm` `mmmm` | `Mar` / `March` |
//! | `yy` `yyyy` | two / four digit year |
//! | `h` `hh` `H` `HH` | 12h / 24h hour |
//! | `M` `MM` `s` `ss` | minutes, seconds |
//! | `l` `L` | milliseconds (3 digits), centiseconds (2 digits) |
//! | `t` `tt` `T` `TT` | `a` / `am` / `A` / `AM` |
//! | `o` `p` | `+0100` / `+01:00` |
//! | `S` | ordinal suffix of the day (`st`, `nd`, `rd`, `th`) |
//! | `Z` | `UTC` or `GMT+0100` |
//! | `N` `W` `WW` | ISO weekday, ISO week, padded ISO week |
//! | `'...'` `"..."` | literal text |
//!
//! Named masks (`isoDate`, `longDate`, ...) expand first. A `UTC:` prefix
//! converts the date to UTC before formatting. A spec containing `%` is
//! treated as a chrono strftime string instead.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::RenderError;

/// Formats a date according to a format spec.
pub trait DateFormatter: Send + Sync {
    fn format(&self, date: &DateTime<FixedOffset>, spec: &str) -> Result<String, RenderError>;
}

/// Mask used when no format is given.
pub const DEFAULT_MASK: &str = "ddd mmm dd yyyy HH:MM:ss";

const NAMED_MASKS: &[(&str, &str)] = &[
    ("default", DEFAULT_MASK),
    ("shortDate", "m/d/yy"),
    ("mediumDate", "mmm d, yyyy"),
    ("longDate", "mmmm d, yyyy"),
    ("fullDate", "dddd, mmmm d, yyyy"),
    ("shortTime", "h:MM TT"),
    ("mediumTime", "h:MM:ss TT"),
    ("longTime", "h:MM:ss TT Z"),
    ("isoDate", "yyyy-mm-dd"),
    ("isoTime", "HH:MM:ss"),
    ("isoDateTime", "yyyy-mm-dd'T'HH:MM:sso"),
    ("isoUtcDateTime", "UTC:yyyy-mm-dd'T'HH:MM:ss'Z'"),
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Looks up a named mask such as `isoDate`.
pub fn named_mask(name: &str) -> Option<&'static str> {
    NAMED_MASKS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, mask)| *mask)
}

/// Interprets a template value as a date.
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DD[ HH:MM:SS]` strings and epoch
/// milliseconds. `null` means now.
pub fn parse_date(value: &serde_json::Value) -> Result<DateTime<FixedOffset>, RenderError> {
    match value {
        serde_json::Value::Null => Ok(Utc::now().fixed_offset()),
        serde_json::Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| RenderError::Date(format!("invalid timestamp: {}", n)))?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|d| d.fixed_offset())
                .ok_or_else(|| RenderError::Date(format!("timestamp out of range: {}", millis)))
        }
        serde_json::Value::String(s) => parse_date_str(s.trim()),
        other => Err(RenderError::Date(format!("cannot interpret {} as a date", other))),
    }
}

fn parse_date_str(s: &str) -> Result<DateTime<FixedOffset>, RenderError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Ok(date);
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(s) {
        return Ok(date);
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = day.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(RenderError::Date(format!("unrecognized date: {:?}", s)))
}

/// [`DateFormatter`] understanding dateformat masks and strftime specs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskFormatter;

impl MaskFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl DateFormatter for MaskFormatter {
    fn format(&self, date: &DateTime<FixedOffset>, spec: &str) -> Result<String, RenderError> {
        let spec = named_mask(spec).unwrap_or(spec);

        if spec.contains('%') {
            return strftime(date, spec);
        }

        let (utc, mask) = match spec
            .strip_prefix("UTC:")
            .or_else(|| spec.strip_prefix("GMT:"))
        {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let date = if utc {
            date.with_timezone(&Utc).fixed_offset()
        } else {
            *date
        };

        Ok(apply_mask(&date, mask, utc))
    }
}

fn strftime(date: &DateTime<FixedOffset>, spec: &str) -> Result<String, RenderError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(spec).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(RenderError::Date(format!("invalid strftime format: {:?}", spec)));
    }
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.into_iter()))
        .map_err(|_| RenderError::Date(format!("cannot format date with {:?}", spec)))?;
    Ok(out)
}

fn run_length(chars: &[char], start: usize, max: usize) -> usize {
    let c = chars[start];
    chars[start..]
        .iter()
        .take(max)
        .take_while(|&&x| x == c)
        .count()
}

fn apply_mask(date: &DateTime<FixedOffset>, mask: &str, utc: bool) -> String {
    let chars: Vec<char> = mask.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let len = match c {
            '\'' | '"' => {
                match chars[i + 1..].iter().position(|&x| x == c) {
                    Some(n) => {
                        out.extend(&chars[i + 1..i + 1 + n]);
                        i += n + 2;
                    }
                    None => {
                        out.push(c);
                        i += 1;
                    }
                }
                continue;
            }
            'd' | 'm' => run_length(&chars, i, 4),
            'y' => match run_length(&chars, i, 4) {
                4 => 4,
                2 | 3 => 2,
                _ => 0,
            },
            'H' | 'h' | 'M' | 's' | 'T' | 't' | 'W' => run_length(&chars, i, 2),
            'l' | 'L' | 'o' | 'p' | 'S' | 'Z' | 'N' => 1,
            _ => 0,
        };

        if len == 0 {
            out.push(c);
            i += 1;
        } else {
            out.push_str(&token(date, c, len, utc));
            i += len;
        }
    }

    out
}

fn token(date: &DateTime<FixedOffset>, c: char, len: usize, utc: bool) -> String {
    let weekday = date.weekday().num_days_from_monday() as usize;
    let month = date.month0() as usize;
    let millis = date.timestamp_subsec_millis() % 1000;

    match (c, len) {
        ('d', 1) => date.day().to_string(),
        ('d', 2) => format!("{:02}", date.day()),
        ('d', 3) => DAY_NAMES[weekday][..3].to_string(),
        ('d', _) => DAY_NAMES[weekday].to_string(),
        ('m', 1) => date.month().to_string(),
        ('m', 2) => format!("{:02}", date.month()),
        ('m', 3) => MONTH_NAMES[month][..3].to_string(),
        ('m', _) => MONTH_NAMES[month].to_string(),
        ('y', 2) => format!("{:02}", date.year().rem_euclid(100)),
        ('y', _) => format!("{:04}", date.year()),
        ('h', 1) => date.hour12().1.to_string(),
        ('h', _) => format!("{:02}", date.hour12().1),
        ('H', 1) => date.hour().to_string(),
        ('H', _) => format!("{:02}", date.hour()),
        ('M', 1) => date.minute().to_string(),
        ('M', _) => format!("{:02}", date.minute()),
        ('s', 1) => date.second().to_string(),
        ('s', _) => format!("{:02}", date.second()),
        ('l', _) => format!("{:03}", millis),
        ('L', _) => format!("{:02}", millis / 10),
        ('t', 1) => meridiem(date, "a", "p"),
        ('t', _) => meridiem(date, "am", "pm"),
        ('T', 1) => meridiem(date, "A", "P"),
        ('T', _) => meridiem(date, "AM", "PM"),
        ('o', _) => offset(date, false),
        ('p', _) => offset(date, true),
        ('S', _) => ordinal_suffix(date.day()).to_string(),
        ('Z', _) => {
            if utc || date.offset().local_minus_utc() == 0 {
                "UTC".to_string()
            } else {
                format!("GMT{}", offset(date, false))
            }
        }
        ('N', _) => (weekday + 1).to_string(),
        ('W', 1) => date.iso_week().week().to_string(),
        ('W', _) => format!("{:02}", date.iso_week().week()),
        _ => c.to_string().repeat(len),
    }
}

fn meridiem(date: &DateTime<FixedOffset>, am: &str, pm: &str) -> String {
    let (is_pm, _) = date.hour12();
    let text = if is_pm { pm } else { am };
    text.to_string()
}

fn offset(date: &DateTime<FixedOffset>, colon: bool) -> String {
    let seconds = date.offset().local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    if colon {
        format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
    } else {
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-05T14:07:09.123+00:00").unwrap()
    }

    fn fmt(spec: &str) -> String {
        MaskFormatter::new().format(&sample(), spec).unwrap()
    }

    #[test]
    fn test_numeric_masks() {
        assert_eq!(fmt("yyyy-mm-dd"), "2024-03-05");
        assert_eq!(fmt("m/d/yy"), "3/5/24");
        assert_eq!(fmt("HH:MM:ss.l"), "14:07:09.123");
        assert_eq!(fmt("L"), "12");
    }

    #[test]
    fn test_named_parts() {
        assert_eq!(fmt("dddd, mmmm dS, yyyy"), "Tuesday, March 5th, 2024");
        assert_eq!(fmt("ddd mmm"), "Tue Mar");
    }

    #[test]
    fn test_twelve_hour_clock() {
        assert_eq!(fmt("h:MM TT"), "2:07 PM");
        assert_eq!(fmt("hh:MM tt"), "02:07 pm");
    }

    #[test]
    fn test_named_masks() {
        assert_eq!(fmt("isoDate"), "2024-03-05");
        assert_eq!(fmt("default"), "Tue Mar 05 2024 14:07:09");
        assert_eq!(fmt("isoDateTime"), "2024-03-05T14:07:09+0000");
        assert_eq!(fmt("longDate"), "March 5, 2024");
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(fmt("yyyy'T'HH"), "2024T14");
        assert_eq!(fmt("\"day\" d"), "day 5");
    }

    #[test]
    fn test_utc_prefix_converts() {
        let date = DateTime::parse_from_rfc3339("2024-03-05T01:00:00+02:00").unwrap();
        let out = MaskFormatter::new()
            .format(&date, "UTC:yyyy-mm-dd HH Z")
            .unwrap();
        assert_eq!(out, "2024-03-04 23 UTC");

        let local = MaskFormatter::new().format(&date, "HH o p Z").unwrap();
        assert_eq!(local, "01 +0200 +02:00 GMT+0200");
    }

    #[test]
    fn test_strftime_spec() {
        assert_eq!(fmt("%Y/%m/%d"), "2024/03/05");
    }

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn test_parse_date_inputs() {
        let day = parse_date(&json!("2024-03-05")).unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-05T00:00:00+00:00");

        let stamp = parse_date(&json!("2024-03-05 10:30:00")).unwrap();
        assert_eq!(stamp.hour(), 10);

        let epoch = parse_date(&json!(0)).unwrap();
        assert_eq!(epoch.year(), 1970);

        let rfc = parse_date(&json!("2024-03-05T14:07:09Z")).unwrap();
        assert_eq!(rfc.minute(), 7);

        assert!(parse_date(&json!(null)).is_ok());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(
            parse_date(&json!("not a date")),
            Err(RenderError::Date(_))
        ));
        assert!(parse_date(&json!([1, 2])).is_err());
    }
}
