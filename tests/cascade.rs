//! Integration tests for the public classradar API.
//!
//! These exercise the full path from construction through location
//! resolution and event search, with canned data sources and device
//! environments standing in for the network and the host.

use async_trait::async_trait;
use classradar::client::ClassRadar;
use classradar::device::DeviceEnv;
use classradar::models::{
    Coordinates, EventRecord, HeaderSnapshot, LocationRecord, LocationServices,
};
use classradar::source::{DataBundle, DataSource};
use color_eyre::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const FIX_TIMEOUT: Duration = Duration::from_secs(5);

struct FixedSource {
    bundle: DataBundle,
}

#[async_trait]
impl DataSource for FixedSource {
    async fn fetch(&self) -> Result<DataBundle> {
        Ok(self.bundle.clone())
    }
}

struct FixedDevice {
    fix: Option<Coordinates>,
    fix_delay: Option<Duration>,
    language: Option<String>,
    timezone: Option<String>,
}

impl FixedDevice {
    fn offline() -> Self {
        Self {
            fix: None,
            fix_delay: None,
            language: None,
            timezone: None,
        }
    }
}

#[async_trait]
impl DeviceEnv for FixedDevice {
    async fn position(&self) -> Option<Coordinates> {
        if let Some(delay) = self.fix_delay {
            tokio::time::sleep(delay).await;
        }
        self.fix
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn timezone(&self) -> Option<String> {
        self.timezone.clone()
    }
}

fn chicago() -> LocationRecord {
    LocationRecord {
        iata: "ORD".to_string(),
        latitude: 41.9,
        longitude: -87.6,
        country: "United States".to_string(),
        c2: "US".to_string(),
        c3: "USA".to_string(),
        state: "Illinois".to_string(),
        city: "Chicago".to_string(),
        timezone: "America/Chicago".to_string(),
    }
}

fn berlin() -> LocationRecord {
    LocationRecord {
        iata: "BER".to_string(),
        latitude: 52.52,
        longitude: 13.405,
        country: "Germany".to_string(),
        c2: "DE".to_string(),
        c3: "DEU".to_string(),
        state: "Berlin".to_string(),
        city: "Berlin".to_string(),
        timezone: "Europe/Berlin".to_string(),
    }
}

fn event(name: &str, category: &str, address: &str, lat: f64, lon: f64) -> EventRecord {
    EventRecord {
        name: name.to_string(),
        category: category.to_string(),
        latitude: lat,
        longitude: lon,
        address: address.to_string(),
        start: "2025-06-01T09:00:00Z".to_string(),
    }
}

fn bundle_with_headers(pairs: &[(&str, &str)]) -> DataBundle {
    let headers: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    DataBundle {
        locations: vec![chicago(), berlin()],
        events: vec![
            event("Morning Yoga", "yoga", "100 W Main St, Chicago", 41.92, -87.6),
            event("Spin Class", "cycling", "200 N State St, Chicago", 41.95, -87.6),
            event(
                "Stretch Hour",
                "wellness",
                "yoga studio, Berlin",
                52.5,
                13.4,
            ),
        ],
        headers: HeaderSnapshot::new(headers),
    }
}

fn client(bundle: DataBundle, device: FixedDevice) -> ClassRadar {
    ClassRadar::with_parts(
        Arc::new(FixedSource { bundle }),
        Arc::new(device),
        FIX_TIMEOUT,
    )
}

#[tokio::test]
async fn test_served_by_facility_code_resolves_chicago() {
    let radar = client(
        bundle_with_headers(&[("x-served-by", "cache-chi-ORD")]),
        FixedDevice::offline(),
    );

    let location = radar.location_fast().await;
    assert_eq!(location.city, "Chicago");
    assert_eq!(location.c2, "US");
    assert_eq!(location.locationservices, LocationServices::Disabled);
}

#[tokio::test]
async fn test_header_coordinates_beat_facility_code_and_keep_header_city() {
    let radar = client(
        bundle_with_headers(&[
            ("x-client-city-lat-long", "52.5,13.4"),
            ("cf-ipcity", "Potsdam"),
            ("x-served-by", "cache-ord"),
        ]),
        FixedDevice::offline(),
    );

    let location = radar.location_fast().await;
    assert_eq!(location.latitude, Some(52.5), "combined header coordinate");
    assert_eq!(location.city, "Potsdam", "header city overrides the match");
    assert_eq!(location.c2, "DE", "codes from the nearest record");
}

#[tokio::test]
async fn test_locale_tier_when_headers_are_bare() {
    let radar = client(
        bundle_with_headers(&[]),
        FixedDevice {
            language: Some("de-DE".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
            ..FixedDevice::offline()
        },
    );

    let location = radar.location_fast().await;
    assert_eq!(location.city, "Berlin");
    assert_eq!(location.language, "de-DE");
}

#[tokio::test]
async fn test_search_ranks_matches_before_near_non_matches() {
    let radar = client(
        bundle_with_headers(&[("x-served-by", "cache-ord")]),
        FixedDevice::offline(),
    );

    let location = radar.location_fast().await;
    let results = radar.search_events("yoga", &location, 3).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].event.name, "Morning Yoga", "near match first");
    assert_eq!(results[1].event.name, "Stretch Hour", "far match second");
    assert_eq!(results[2].score, 0, "non-match last despite being close");
    assert!(
        results.iter().all(|r| r.unit.to_string() == "mi"),
        "US location implies miles for every result"
    );
}

#[tokio::test]
async fn test_closest_events_orders_by_distance() {
    let radar = client(
        bundle_with_headers(&[("x-served-by", "cache-ord")]),
        FixedDevice::offline(),
    );

    let results = radar.closest_events(2).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].event.name, "Morning Yoga");
    assert_eq!(results[1].event.name, "Spin Class");
    assert!(results[0].distance < results[1].distance);
}

#[tokio::test]
async fn test_accurate_fix_refines_fast_estimate() {
    let radar = client(
        bundle_with_headers(&[("x-served-by", "cache-ord")]),
        FixedDevice {
            fix: Some(Coordinates::new(52.51, 13.41)),
            ..FixedDevice::offline()
        },
    );

    let fast = radar.location_fast().await;
    assert_eq!(fast.city, "Chicago");

    let accurate = radar.location_accurate().await.expect("fix granted");
    assert_eq!(accurate.city, "Berlin", "fix snaps to the nearest record");
    assert_eq!(accurate.latitude, Some(52.51), "device coordinates verbatim");
    assert_eq!(accurate.locationservices, LocationServices::Enabled);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fix_times_out_to_none() {
    let radar = client(
        bundle_with_headers(&[]),
        FixedDevice {
            fix: Some(Coordinates::new(52.51, 13.41)),
            fix_delay: Some(Duration::from_secs(60)),
            ..FixedDevice::offline()
        },
    );

    assert!(radar.location_accurate().await.is_none());
}
