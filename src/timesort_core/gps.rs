use crate::timesort_core::metadata::{ImageMetadata, MetadataBag, Rational, VideoMetadata};

/// Signed decimal degrees; south and west are negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates if both values are finite and within range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Coordinates> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && latitude.abs() <= 90.0
            && longitude.abs() <= 180.0;
        valid.then_some(Coordinates { latitude, longitude })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Recover coordinates from whichever kind of metadata the bag holds.
pub fn resolve_coordinates(bag: &MetadataBag) -> Option<Coordinates> {
    match bag {
        MetadataBag::Image(image) => image_coordinates(image),
        MetadataBag::Video(video) => video_coordinates(video),
        MetadataBag::Empty => None,
    }
}

/// Both rational triples are required; a missing reference tag means north/east.
fn image_coordinates(image: &ImageMetadata) -> Option<Coordinates> {
    let mut latitude = dms_to_degrees(image.gps_latitude.as_deref()?)?;
    let mut longitude = dms_to_degrees(image.gps_longitude.as_deref()?)?;

    if is_reference(image.gps_latitude_ref.as_deref(), 'S') {
        latitude = -latitude;
    }
    if is_reference(image.gps_longitude_ref.as_deref(), 'W') {
        longitude = -longitude;
    }

    Coordinates::new(latitude, longitude)
}

fn is_reference(value: Option<&str>, hemisphere: char) -> bool {
    value
        .and_then(|v| v.trim().chars().next())
        .is_some_and(|c| c.eq_ignore_ascii_case(&hemisphere))
}

/// `degrees + minutes/60 + seconds/3600` over a degrees/minutes/seconds triple.
pub fn dms_to_degrees(values: &[Rational]) -> Option<f64> {
    let [degrees, minutes, seconds] = values.get(..3)? else {
        return None;
    };
    if [degrees, minutes, seconds].iter().any(|r| r.denom == 0) {
        return None;
    }
    Some(degrees.to_f64() + minutes.to_f64() / 60.0 + seconds.to_f64() / 3600.0)
}

fn video_coordinates(video: &VideoMetadata) -> Option<Coordinates> {
    let location = video.location.as_deref()?;
    let coordinates = parse_location_string(location);
    if coordinates.is_none() {
        log::debug!("Unusable video location string {:?}", location);
    }
    coordinates
}

/// Parse a container location string.
///
/// Accepts the ISO 6709 form `+35.6586+139.7454/`, where each component is
/// led by its sign, and the slash form `35.6586/139.7454/`. Strings with a
/// third component (altitude) are rejected.
pub fn parse_location_string(location: &str) -> Option<Coordinates> {
    let location = location.trim();
    let head = location.split('/').next()?;
    let components = sign_led_components(head);

    let (latitude, longitude) = if components.len() >= 2 {
        let [lat, lon] = components.as_slice() else {
            return None;
        };
        (lat.parse().ok()?, lon.parse().ok()?)
    } else {
        let stripped = location.replace('+', "");
        let mut fields = stripped.split('/');
        (
            fields.next()?.trim().parse().ok()?,
            fields.next()?.trim().parse().ok()?,
        )
    };

    Coordinates::new(latitude, longitude)
}

/// Split `+35.6+139.7-12.0` into `["+35.6", "+139.7", "-12.0"]`.
fn sign_led_components(head: &str) -> Vec<&str> {
    let starts: Vec<usize> = head
        .char_indices()
        .filter(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .collect();
    if starts.first() != Some(&0) {
        return Vec::new();
    }
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(head.len());
            &head[start..end]
        })
        .collect()
}
