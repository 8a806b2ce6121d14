//! Timestamp recovery from file names.
//!
//! Patterns are tried in order, most information-rich first, and the first
//! pattern whose match yields a valid calendar value wins. Each pattern carries
//! its own interpreter, so adding a format is one more table entry.

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use time::{Date, Month, PrimitiveDateTime, Time};

type Interpreter = fn(&Captures) -> Option<PrimitiveDateTime>;

struct FilenamePattern {
    name: &'static str,
    regex: Regex,
    interpret: Interpreter,
}

impl FilenamePattern {
    fn new(name: &'static str, pattern: &str, interpret: Interpreter) -> Self {
        FilenamePattern {
            name,
            regex: Regex::new(pattern).expect("filename date pattern must compile"),
            interpret,
        }
    }
}

static PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    vec![
        // 2021-10-02 08:49:00, 2021_10_02T08:49:00
        FilenamePattern::new(
            "separated date-time",
            r"(?P<date>[0-9]{4}[_\-/][0-9]{2}[_\-/][0-9]{2}[_\- T][0-9]{2}:[0-9]{2}:[0-9]{2})",
            from_digit_run,
        ),
        // 20211002_084900, 2021_10_02-084900
        FilenamePattern::new(
            "date + 6-digit time",
            r"(?P<date>[0-9]{4}[_\-/]?[0-9]{2}[_\-/]?[0-9]{2}[_\-T][0-9]{6})",
            from_digit_run,
        ),
        // 20211002_0849, 2021-10-02_0849
        FilenamePattern::new(
            "date + 4-digit time",
            r"(?P<date>[0-9]{4}[_\-/]?[0-9]{2}[_\-/]?[0-9]{2}[_\-T][0-9]{4})",
            from_digit_run,
        ),
        // 2021-10-02, 2021_10_02
        FilenamePattern::new(
            "separated date",
            r"(?P<date>[0-9]{4}[_\-/][0-9]{2}[_\-/][0-9]{2})",
            from_digit_run,
        ),
        // 20211002
        FilenamePattern::new("compact date", r"(?P<date>[0-9]{8})", from_digit_run),
        // 2021年10月2日
        FilenamePattern::new(
            "localized date",
            r"(?P<year>[0-9]{4})年(?P<month>[0-9]{1,2})月(?P<day>[0-9]{1,2})日",
            from_localized_parts,
        ),
        // IMG_20211002, VID_20211002
        FilenamePattern::new(
            "vendor prefix",
            r"(?:IMG|VID)_(?P<date>[0-9]{8})",
            from_digit_run,
        ),
        FilenamePattern::new("iso date", r"(?P<date>[0-9]{4}-[0-9]{2}-[0-9]{2})", from_digit_run),
    ]
});

/// Extract a timestamp from the bare file name of `path`.
///
/// Never fails: an unmatched name or an impossible calendar value is `None`.
pub fn date_from_filename(path: &Path) -> Option<PrimitiveDateTime> {
    let name = path.file_name()?.to_str()?;

    for pattern in PATTERNS.iter() {
        let Some(caps) = pattern.regex.captures(name) else {
            continue;
        };
        match (pattern.interpret)(&caps) {
            Some(dt) => {
                log::debug!("Filename {} matched {} pattern: {}", name, pattern.name, dt);
                return Some(dt);
            }
            None => {
                log::debug!(
                    "Filename {} matched {} pattern but is not a valid date",
                    name,
                    pattern.name
                );
            }
        }
    }

    None
}

/// Strip the `date` capture to its digits and interpret the run by length.
fn from_digit_run(caps: &Captures) -> Option<PrimitiveDateTime> {
    let digits: String = caps
        .name("date")?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    parse_digit_run(&digits)
}

fn from_localized_parts(caps: &Captures) -> Option<PrimitiveDateTime> {
    let year: i32 = caps.name("year")?.as_str().parse().ok()?;
    let month: u8 = caps.name("month")?.as_str().parse().ok()?;
    let day: u8 = caps.name("day")?.as_str().parse().ok()?;
    build(year, month, day, 0, 0, 0)
}

/// 14 digits: full date-time. 12: date, hour and minute. 8: date only.
pub fn parse_digit_run(digits: &str) -> Option<PrimitiveDateTime> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| -> Option<u8> { digits.get(range)?.parse().ok() };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = field(4..6)?;
    let day = field(6..8)?;

    match digits.len() {
        14 => build(year, month, day, field(8..10)?, field(10..12)?, field(12..14)?),
        12 => build(year, month, day, field(8..10)?, field(10..12)?, 0),
        8 => build(year, month, day, 0, 0, 0),
        _ => None,
    }
}

fn build(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<PrimitiveDateTime> {
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn guess(name: &str) -> Option<PrimitiveDateTime> {
        date_from_filename(Path::new(name))
    }

    #[test]
    fn test_vendor_name_with_short_time() {
        assert_eq!(guess("IMG_20211002_0849.jpg"), Some(datetime!(2021-10-02 08:49:00)));
    }

    #[test]
    fn test_guess_patterns() {
        assert_eq!(guess("2021-10-02 08:49:07.jpg"), Some(datetime!(2021-10-02 08:49:07)));
        assert_eq!(guess("VID_20190509_154733.mp4"), Some(datetime!(2019-05-09 15:47:33)));
        assert_eq!(guess("2021_10_02_084900.mov"), Some(datetime!(2021-10-02 08:49:00)));
        assert_eq!(guess("2021-10-02_0849.png"), Some(datetime!(2021-10-02 08:49:00)));
        assert_eq!(guess("holiday 2021_10_02.jpg"), Some(datetime!(2021-10-02 00:00:00)));
        assert_eq!(guess("scan20211002.jpg"), Some(datetime!(2021-10-02 00:00:00)));
        assert_eq!(guess("照片2021年1月2日.jpg"), Some(datetime!(2021-01-02 00:00:00)));
        assert_eq!(guess("random_photo.jpg"), None);
    }

    #[test]
    fn test_localized_date_reads_each_field() {
        assert_eq!(guess("2021年1月2日 拍摄.png"), Some(datetime!(2021-01-02 00:00:00)));
        assert_eq!(guess("2021年12月31日.heic"), Some(datetime!(2021-12-31 00:00:00)));
        assert_eq!(guess("2021年13月2日.jpg"), None);
    }

    #[test]
    fn test_only_bare_name_is_considered() {
        assert_eq!(guess("/photos/2019-01-01/random.jpg"), None);
        assert_eq!(
            guess("/photos/2019-01-01/IMG_20200304.jpg"),
            Some(datetime!(2020-03-04 00:00:00))
        );
    }

    #[test]
    fn test_invalid_calendar_value_is_no_match() {
        assert_eq!(guess("IMG_20211302_0849.jpg"), None);
        assert_eq!(guess("2021-02-30.jpg"), None);
        assert_eq!(guess("20211002_2561.jpg"), Some(datetime!(2021-10-02 00:00:00)));
    }

    #[test]
    fn test_digit_run_lengths() {
        assert_eq!(parse_digit_run("20211002084907"), Some(datetime!(2021-10-02 08:49:07)));
        assert_eq!(parse_digit_run("202110020849"), Some(datetime!(2021-10-02 08:49:00)));
        assert_eq!(parse_digit_run("20211002"), Some(datetime!(2021-10-02 00:00:00)));
        assert_eq!(parse_digit_run("2021100208"), None);
        assert_eq!(parse_digit_run("2021"), None);
        assert_eq!(parse_digit_run(""), None);
    }

    #[test]
    fn test_matched_digits_round_trip() {
        let format = time::macros::format_description!(
            "[year][month][day][hour][minute][second]"
        );
        for (name, digits) in [
            ("2021-10-02 08:49:07.jpg", "20211002084907"),
            ("IMG_20190509_154733.jpg", "20190509154733"),
        ] {
            let dt = guess(name).unwrap();
            assert_eq!(dt.format(format).unwrap(), digits);
        }
    }
}
