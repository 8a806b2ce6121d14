use crate::timesort_core::error::{Result, TimesortError};
use crate::timesort_core::filename_date::date_from_filename;
use crate::timesort_core::metadata::MetadataBag;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use time::format_description::well_known::Iso8601;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Date format used in EXIF data.
const EXIF_DATE_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

/// Which strategy produced a timestamp, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    CaptureTag,
    ContainerCreation,
    Filename,
    Filesystem,
}

impl std::fmt::Display for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeSource::CaptureTag => "DateTimeOriginal",
            TimeSource::ContainerCreation => "creation_time",
            TimeSource::Filename => "filename",
            TimeSource::Filesystem => "filesystem",
        };
        f.write_str(name)
    }
}

/// The single authoritative timestamp of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub datetime: PrimitiveDateTime,
    pub source: TimeSource,
}

/// Four-tier timestamp resolution; the first tier that yields a value wins.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    local_offset: UtcOffset,
}

impl TimeResolver {
    /// `local_offset` converts filesystem times to wall-clock time.
    pub fn new(local_offset: UtcOffset) -> Self {
        TimeResolver { local_offset }
    }

    pub fn resolve(&self, path: &Path, bag: &MetadataBag) -> Result<ResolvedTimestamp> {
        let tiers = [
            (TimeSource::CaptureTag, capture_time(bag)),
            (TimeSource::ContainerCreation, container_creation_time(bag)),
        ];
        for (source, datetime) in tiers {
            if let Some(datetime) = datetime {
                return Ok(ResolvedTimestamp { datetime, source });
            }
        }

        if let Some(datetime) = date_from_filename(path) {
            return Ok(ResolvedTimestamp {
                datetime,
                source: TimeSource::Filename,
            });
        }

        let datetime = self.filesystem_time(path)?;
        Ok(ResolvedTimestamp {
            datetime,
            source: TimeSource::Filesystem,
        })
    }

    /// The earlier of creation and modification time, as local wall-clock time.
    ///
    /// A copy bumps the modification time past the true creation time, so the
    /// minimum of the two is the better guess.
    pub fn filesystem_time(&self, path: &Path) -> Result<PrimitiveDateTime> {
        let meta = fs::metadata(path)?;
        let modified = meta.modified()?;
        let earliest = match meta.created() {
            Ok(created) => created.min(modified),
            Err(_) => modified,
        };
        Ok(self.to_local(earliest))
    }

    fn to_local(&self, time: SystemTime) -> PrimitiveDateTime {
        let local = OffsetDateTime::from(time).to_offset(self.local_offset);
        PrimitiveDateTime::new(local.date(), local.time())
    }
}

/// Tier 1: the image's `DateTimeOriginal` tag.
fn capture_time(bag: &MetadataBag) -> Option<PrimitiveDateTime> {
    let MetadataBag::Image(image) = bag else {
        return None;
    };
    let raw = image.date_time_original.as_deref()?;
    match parse_exif_date(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            log::debug!("Unusable DateTimeOriginal {:?}: {}", raw, e);
            None
        }
    }
}

/// Tier 2: the video container's `creation_time` tag.
fn container_creation_time(bag: &MetadataBag) -> Option<PrimitiveDateTime> {
    let MetadataBag::Video(video) = bag else {
        return None;
    };
    let raw = video.creation_time.as_deref()?;
    match parse_creation_time(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            log::debug!("Unusable creation_time {:?}: {}", raw, e);
            None
        }
    }
}

/// Parse an EXIF `YYYY:MM:DD hh:mm:ss` value.
pub fn parse_exif_date(date_str: &str) -> Result<PrimitiveDateTime> {
    if date_str.is_empty() {
        return Err(TimesortError::InvalidDateFormat("empty date".to_string()));
    }
    PrimitiveDateTime::parse(date_str.trim(), EXIF_DATE_FORMAT)
        .map_err(|e| TimesortError::InvalidDateFormat(e.to_string()))
}

/// Parse an extended ISO 8601 timestamp such as `2021-10-02T08:49:00.000000Z`.
///
/// The wall-clock time in the stated offset is kept; a value without an
/// offset is taken as-is.
pub fn parse_creation_time(value: &str) -> Result<PrimitiveDateTime> {
    let value = value.trim().replacen(' ', "T", 1);
    if let Ok(dt) = OffsetDateTime::parse(&value, &Iso8601::DEFAULT) {
        return Ok(PrimitiveDateTime::new(dt.date(), dt.time()));
    }
    PrimitiveDateTime::parse(&value, &Iso8601::DEFAULT)
        .map_err(|e| TimesortError::InvalidDateFormat(e.to_string()))
}

/// Get the local timezone offset, falling back to UTC if unavailable.
///
/// On Unix this only succeeds while the process is single-threaded, so call
/// it before spawning any threads.
pub fn get_local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or_else(|_| {
        log::warn!("Failed to determine local timezone offset, using UTC instead.");
        UtcOffset::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timesort_core::metadata::{ImageMetadata, VideoMetadata};
    use assert_fs::prelude::*;
    use time::macros::datetime;

    fn image_bag(original: &str) -> MetadataBag {
        MetadataBag::Image(ImageMetadata {
            date_time_original: Some(original.to_string()),
            ..Default::default()
        })
    }

    fn video_bag(creation: &str) -> MetadataBag {
        MetadataBag::Video(VideoMetadata {
            creation_time: Some(creation.to_string()),
            location: None,
        })
    }

    fn resolver() -> TimeResolver {
        TimeResolver::new(UtcOffset::UTC)
    }

    #[test]
    fn test_capture_tag_wins_over_filename_and_filesystem() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("IMG_20990101_1200.jpg");
        file.touch().unwrap();

        let resolved = resolver()
            .resolve(file.path(), &image_bag("2015:06:07 10:11:12"))
            .unwrap();
        assert_eq!(resolved.datetime, datetime!(2015-06-07 10:11:12));
        assert_eq!(resolved.source, TimeSource::CaptureTag);
    }

    #[test]
    fn test_bad_capture_tag_falls_through_to_filename() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("IMG_20211002_0849.jpg");
        file.touch().unwrap();

        let resolved = resolver()
            .resolve(file.path(), &image_bag("0000:00:00 00:00:00"))
            .unwrap();
        assert_eq!(resolved.datetime, datetime!(2021-10-02 08:49:00));
        assert_eq!(resolved.source, TimeSource::Filename);
    }

    #[test]
    fn test_container_creation_time() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("VID_20000101.mp4");
        file.touch().unwrap();

        let resolved = resolver()
            .resolve(file.path(), &video_bag("2021-10-02T08:49:00.000000Z"))
            .unwrap();
        assert_eq!(resolved.datetime, datetime!(2021-10-02 08:49:00));
        assert_eq!(resolved.source, TimeSource::ContainerCreation);
    }

    #[test]
    fn test_bad_creation_time_falls_through() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("VID_20200304.mp4");
        file.touch().unwrap();

        let resolved = resolver()
            .resolve(file.path(), &video_bag("yesterday"))
            .unwrap();
        assert_eq!(resolved.datetime, datetime!(2020-03-04 00:00:00));
        assert_eq!(resolved.source, TimeSource::Filename);
    }

    #[test]
    fn test_filesystem_fallback_uses_earlier_time() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("holiday.jpg");
        file.touch().unwrap();

        // Modified long before the file was created here
        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        fs::File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(past)
            .unwrap();

        let resolved = resolver().resolve(file.path(), &MetadataBag::Empty).unwrap();
        assert_eq!(resolved.source, TimeSource::Filesystem);
        assert_eq!(resolved.datetime, datetime!(2001-09-09 01:46:40));

        let east = TimeResolver::new(UtcOffset::from_hms(8, 0, 0).unwrap());
        assert_eq!(
            east.filesystem_time(file.path()).unwrap(),
            datetime!(2001-09-09 09:46:40)
        );
    }

    #[test]
    fn test_filesystem_fallback_missing_file_is_error() {
        let result = resolver().resolve(Path::new("/no/such/holiday.jpg"), &MetadataBag::Empty);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_creation_time_variants() {
        assert_eq!(
            parse_creation_time("2021-10-02T08:49:00Z").unwrap(),
            datetime!(2021-10-02 08:49:00)
        );
        assert_eq!(
            parse_creation_time("2021-10-02T08:49:00+08:00").unwrap(),
            datetime!(2021-10-02 08:49:00)
        );
        assert_eq!(
            parse_creation_time("2021-10-02 08:49:00").unwrap(),
            datetime!(2021-10-02 08:49:00)
        );
        assert!(parse_creation_time("").is_err());
    }

    #[test]
    fn test_parse_exif_date() {
        assert_eq!(
            parse_exif_date("2024:05:21 12:30:00").unwrap(),
            datetime!(2024-05-21 12:30:00)
        );
        assert!(parse_exif_date("").is_err());
        assert!(parse_exif_date("2024-05-21 12:30:00").is_err());
    }
}
