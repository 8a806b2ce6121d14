use crate::timesort_core::error::{Result, TimesortError};
use crate::timesort_core::gps::Coordinates;
use serde::Deserialize;
use std::time::Duration;

/// Label used when no place name can be determined.
pub const UNKNOWN_LOCATION: &str = "未知地点";

const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const USER_AGENT: &str = concat!("timesort/", env!("CARGO_PKG_VERSION"));

/// Place name substituted into destination file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationLabel {
    /// Supplied by the user; applies to every file.
    Fixed(String),
    /// First component of a reverse-geocoded address.
    Geocoded(String),
    Unknown,
}

impl LocationLabel {
    pub fn as_str(&self) -> &str {
        match self {
            LocationLabel::Fixed(label) | LocationLabel::Geocoded(label) => label,
            LocationLabel::Unknown => UNKNOWN_LOCATION,
        }
    }

    /// The label with path separators replaced, safe to embed in a file name.
    pub fn file_component(&self) -> String {
        self.as_str().replace(['/', '\\'], "_")
    }
}

impl std::fmt::Display for LocationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reverse geocoding: coordinates to an address string.
pub trait Geocoder {
    fn reverse(&self, coordinates: Coordinates, language: &str) -> Result<String>;
}

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Deserialize, Debug)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(NOMINATIM_REVERSE_URL, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TimesortError::Geocoding(e.to_string()))?;
        Ok(NominatimGeocoder {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn reverse(&self, coordinates: Coordinates, language: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("accept-language", language.to_string()),
            ])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TimesortError::Geocoding(format!("request timed out: {}", e))
                } else {
                    TimesortError::Geocoding(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TimesortError::Geocoding(format!(
                "HTTP status: {}",
                response.status()
            )));
        }

        let body: ReverseResponse = response
            .json()
            .map_err(|e| TimesortError::Geocoding(e.to_string()))?;
        match (body.display_name, body.error) {
            (Some(address), _) => Ok(address),
            (None, Some(error)) => Err(TimesortError::Geocoding(error)),
            (None, None) => Err(TimesortError::Geocoding("empty response".to_string())),
        }
    }
}

/// Chooses the location label for a file.
pub struct LocationResolver {
    fixed: Option<String>,
    geocoder: Box<dyn Geocoder>,
    language: String,
}

impl LocationResolver {
    pub fn new(fixed: Option<String>, geocoder: Box<dyn Geocoder>, language: impl Into<String>) -> Self {
        LocationResolver {
            fixed: fixed.filter(|label| !label.trim().is_empty()),
            geocoder,
            language: language.into(),
        }
    }

    /// A fixed label always wins. Otherwise one lookup is attempted; no
    /// coordinates or a failed lookup give [`LocationLabel::Unknown`].
    pub fn resolve(&self, coordinates: Option<Coordinates>) -> LocationLabel {
        if let Some(fixed) = &self.fixed {
            return LocationLabel::Fixed(fixed.clone());
        }
        let Some(coordinates) = coordinates else {
            return LocationLabel::Unknown;
        };

        match self.geocoder.reverse(coordinates, &self.language) {
            Ok(address) => match first_component(&address) {
                Some(place) => LocationLabel::Geocoded(place),
                None => {
                    log::warn!("Reverse geocoding returned an empty address for {}", coordinates);
                    LocationLabel::Unknown
                }
            },
            Err(e) => {
                log::warn!("{} ({})", e, coordinates);
                LocationLabel::Unknown
            }
        }
    }
}

fn first_component(address: &str) -> Option<String> {
    let place = address.split(',').next()?.trim();
    (!place.is_empty()).then(|| place.to_string())
}
