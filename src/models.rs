use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One entry in the reference table of known points of presence / cities.
///
/// Loaded once from the location collection at startup and read-only for the
/// rest of the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Airport-style 3-letter facility code, e.g. "ORD".
    pub iata: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    /// ISO 3166-1 alpha-2 country code.
    pub c2: String,
    /// ISO 3166-1 alpha-3 country code.
    pub c3: String,
    pub state: String,
    pub city: String,
    /// IANA timezone name, e.g. "America/Chicago".
    pub timezone: String,
}

/// A training class as loaded from the event collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    /// Start timestamp, kept as an opaque string for display.
    pub start: String,
}

/// Whether the device's live geolocation contributed to a resolved location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationServices {
    Enabled,
    Disabled,
}

impl fmt::Display for LocationServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationServices::Enabled => write!(f, "enabled"),
            LocationServices::Disabled => write!(f, "disabled"),
        }
    }
}

/// Output of the location resolver.
///
/// Coordinates are optional: the all-tiers-failed fallback carries none.
/// When present they come from a single source tier; the header tier may pair
/// header-provided coordinates with administrative metadata from the nearest
/// reference record, but never mixes coordinates across tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: String,
    pub c2: String,
    pub c3: String,
    pub state: String,
    /// Duplicate of `state`, kept for consumers that key on "region".
    pub region: String,
    pub city: String,
    pub timezone: String,
    pub locationservices: LocationServices,
    /// BCP 47 language tag detected from the device environment, or "".
    pub language: String,
}

impl ResolvedLocation {
    /// A resolved location built entirely from a reference record.
    pub fn from_record(record: &LocationRecord) -> Self {
        Self {
            latitude: Some(record.latitude),
            longitude: Some(record.longitude),
            country: record.country.clone(),
            c2: record.c2.clone(),
            c3: record.c3.clone(),
            state: record.state.clone(),
            region: record.state.clone(),
            city: record.city.clone(),
            timezone: record.timezone.clone(),
            locationservices: LocationServices::Disabled,
            language: String::new(),
        }
    }

    /// The all-tiers-failed fallback: no coordinates, empty text fields.
    pub fn empty() -> Self {
        Self {
            latitude: None,
            longitude: None,
            country: String::new(),
            c2: String::new(),
            c3: String::new(),
            state: String::new(),
            region: String::new(),
            city: String::new(),
            timezone: String::new(),
            locationservices: LocationServices::Disabled,
            language: String::new(),
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// Distance unit chosen from the user's country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Km,
    Mi,
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Km => write!(f, "km"),
            DistanceUnit::Mi => write!(f, "mi"),
        }
    }
}

/// An event annotated with its distance from the user and a relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEvent {
    #[serde(flatten)]
    pub event: EventRecord,
    /// Distance in `unit` from the search location.
    pub distance: f64,
    pub unit: DistanceUnit,
    /// Count of query tokens matched (1 for every event on an empty query).
    pub score: u32,
}

/// Response headers captured once from the location-collection fetch.
///
/// Names are stored lower-cased so lookups are case-insensitive. Set exactly
/// once during initialization and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct HeaderSnapshot {
    headers: HashMap<String, String>,
}

impl HeaderSnapshot {
    pub fn new(headers: HashMap<String, String>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        Self { headers }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
