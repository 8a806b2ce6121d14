use crate::timesort_core::error::{Result, TimesortError};
use crate::timesort_core::media::{MediaFile, MediaKind};
use exif::{In, Reader, Tag, Value};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Container tags that may carry an ISO 6709 location string, in lookup order.
const VIDEO_LOCATION_TAGS: &[&str] = &[
    "location",
    "com.apple.quicktime.location.ISO6709",
    "location-eng",
];

/// Unsigned EXIF rational, kept unreduced until GPS conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    pub fn new(num: u32, denom: u32) -> Self {
        Rational { num, denom }
    }

    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl From<exif::Rational> for Rational {
    fn from(r: exif::Rational) -> Self {
        Rational::new(r.num, r.denom)
    }
}

/// Embedded tags of a still image, with GPS values kept as raw rationals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    /// `DateTimeOriginal` exactly as stored, e.g. `2021:10:02 08:49:00`.
    pub date_time_original: Option<String>,
    pub gps_latitude: Option<Vec<Rational>>,
    pub gps_latitude_ref: Option<String>,
    pub gps_longitude: Option<Vec<Rational>>,
    pub gps_longitude_ref: Option<String>,
}

/// Container-format tags reported by the video probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub creation_time: Option<String>,
    /// Combined location string such as `+35.6586+139.7454/`.
    pub location: Option<String>,
}

/// Normalized view over a file's embedded metadata.
///
/// An `Empty` bag means "no metadata" and is never an error for callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MetadataBag {
    #[default]
    Empty,
    Image(ImageMetadata),
    Video(VideoMetadata),
}

/// Source of container tags for video files.
pub trait VideoProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// Runs `ffprobe` and reads `format.tags` from its JSON report.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: PathBuf,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Ffprobe {
            program: PathBuf::from("ffprobe"),
        }
    }
}

impl Ffprobe {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Ffprobe {
            program: program.into(),
        }
    }
}

impl VideoProbe for Ffprobe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| TimesortError::VideoProbe {
                path: path.to_path_buf(),
                reason: format!("could not run {}: {}", self.program.display(), e),
            })?;

        parse_probe_output(&output.stdout).map_err(|e| TimesortError::VideoProbe {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
struct ProbeReport {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Deserialize, Debug, Default)]
struct ProbeFormat {
    #[serde(default)]
    tags: BTreeMap<String, JsonValue>,
}

/// Parse the JSON document printed by `ffprobe -show_format`.
pub fn parse_probe_output(stdout: &[u8]) -> std::result::Result<VideoMetadata, serde_json::Error> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;
    let tag = |key: &str| {
        report
            .format
            .tags
            .get(key)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(VideoMetadata {
        creation_time: tag("creation_time"),
        location: VIDEO_LOCATION_TAGS.iter().find_map(|key| tag(key)),
    })
}

/// Dispatches metadata extraction on media kind.
pub struct MetadataExtractor {
    probe: Box<dyn VideoProbe>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(Box::new(Ffprobe::default()))
    }
}

impl MetadataExtractor {
    pub fn new(probe: Box<dyn VideoProbe>) -> Self {
        MetadataExtractor { probe }
    }

    /// Extract metadata, distinguishing "nothing embedded" (`Ok` with an empty
    /// bag) from a failed read (`Err`).
    pub fn try_extract(&self, file: &MediaFile) -> Result<MetadataBag> {
        match file.kind {
            MediaKind::Image => read_image_metadata(file).map(MetadataBag::Image),
            MediaKind::Video => self.probe.probe(&file.path).map(MetadataBag::Video),
        }
    }

    /// Extract metadata, logging failures and returning an empty bag in their place.
    pub fn extract(&self, file: &MediaFile) -> MetadataBag {
        match self.try_extract(file) {
            Ok(bag) => bag,
            Err(e) => {
                log::warn!("{}", e);
                MetadataBag::Empty
            }
        }
    }

    /// Like [`extract`](Self::extract) for an arbitrary path; unsupported
    /// extensions yield an empty bag.
    pub fn extract_path(&self, path: &Path) -> MetadataBag {
        match MediaFile::from_path(path) {
            Some(file) => self.extract(&file),
            None => MetadataBag::Empty,
        }
    }
}

/// Read EXIF from an image. kamadak-exif locates the EXIF block itself:
/// the item table for HEIF, APP1 for JPEG, the eXIf chunk for PNG.
fn read_image_metadata(file: &MediaFile) -> Result<ImageMetadata> {
    let path = &file.path;
    let extraction_error = |reason: String| TimesortError::MetadataExtraction {
        path: path.clone(),
        reason,
    };

    let handle = File::open(path).map_err(|e| extraction_error(e.to_string()))?;
    let mut reader = BufReader::new(handle);
    log::debug!(
        "Reading EXIF from {} container: {}",
        if file.is_heif() { "HEIF" } else { "raster" },
        path.display()
    );

    let read = Reader::new()
        .continue_on_error(true)
        .read_from_container(&mut reader)
        .or_else(|e| {
            e.distill_partial_result(|errors| {
                for err in errors {
                    log::debug!("Ignoring malformed EXIF field in {}: {}", path.display(), err);
                }
            })
        });
    let exif = match read {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data in {}", path.display());
            return Ok(ImageMetadata::default());
        }
        Err(e) => return Err(extraction_error(e.to_string())),
    };

    let ascii = |tag: Tag| -> Option<String> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Ascii(parts) => parts
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).trim_matches(char::from(0)).trim().to_string())
                .find(|s| !s.is_empty()),
            _ => None,
        }
    };
    let rationals = |tag: Tag| -> Option<Vec<Rational>> {
        match &exif.get_field(tag, In::PRIMARY)?.value {
            Value::Rational(values) => Some(values.iter().map(|r| Rational::from(*r)).collect()),
            _ => None,
        }
    };

    Ok(ImageMetadata {
        date_time_original: ascii(Tag::DateTimeOriginal),
        gps_latitude: rationals(Tag::GPSLatitude),
        gps_latitude_ref: ascii(Tag::GPSLatitudeRef),
        gps_longitude: rationals(Tag::GPSLongitude),
        gps_longitude_ref: ascii(Tag::GPSLongitudeRef),
    })
}
