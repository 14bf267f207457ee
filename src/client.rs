//! The public facade: owns the loaded reference data and wires the resolver
//! and search engine together.
//!
//! Construction kicks off one asynchronous load of the location table and
//! the event catalog. Every public operation awaits that same load first, so
//! nothing ever observes partially loaded data, and concurrent callers share
//! the single in-flight fetch instead of triggering duplicates. After the
//! load the data is never mutated, so no further synchronization is needed.

use crate::config::Config;
use crate::device::{DeviceEnv, SystemDevice};
use crate::models::{HeaderSnapshot, RankedEvent, ResolvedLocation};
use crate::resolver::LocationResolver;
use crate::search::EventSearchEngine;
use crate::source::{DataSource, HttpSource};
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::error;

/// Reference data in its final, read-only form. `ok` is false when the load
/// failed and the collections were left empty.
struct LoadedData {
    locations: Vec<crate::models::LocationRecord>,
    events: Vec<crate::models::EventRecord>,
    headers: HeaderSnapshot,
    ok: bool,
}

async fn load(source: Arc<dyn DataSource>) -> LoadedData {
    match source.fetch().await {
        Ok(bundle) => LoadedData {
            locations: bundle.locations,
            events: bundle.events,
            headers: bundle.headers,
            ok: true,
        },
        Err(e) => {
            // Degrade to empty collections; callers see ok == false from
            // wait_for_load and otherwise keep working.
            error!("Failed to load reference data: {e:#}");
            LoadedData {
                locations: Vec::new(),
                events: Vec::new(),
                headers: HeaderSnapshot::default(),
                ok: false,
            }
        }
    }
}

/// Location resolution and event search over lazily-shared reference data.
pub struct ClassRadar {
    data: Arc<OnceCell<LoadedData>>,
    source: Arc<dyn DataSource>,
    device: Arc<dyn DeviceEnv>,
    fix_timeout: Duration,
}

impl ClassRadar {
    /// Builds the production client from configuration. Must be called from
    /// within a tokio runtime: the initial load is spawned immediately.
    pub fn new(config: &Config) -> Result<Self> {
        let source = HttpSource::new(
            config.data.locations_url.clone(),
            config.data.events_url.clone(),
            config.data.request_timeout_seconds,
        )?;
        Ok(Self::with_parts(
            Arc::new(source),
            Arc::new(SystemDevice::new(config.location.probe_address.clone())),
            Duration::from_millis(config.location.fix_timeout_ms),
        ))
    }

    /// Assembles a client from injected collaborators (used by tests).
    pub fn with_parts(
        source: Arc<dyn DataSource>,
        device: Arc<dyn DeviceEnv>,
        fix_timeout: Duration,
    ) -> Self {
        let client = Self {
            data: Arc::new(OnceCell::new()),
            source,
            device,
            fix_timeout,
        };

        // Start the load now; wait_for_load and every operation join it.
        let data = client.data.clone();
        let source = client.source.clone();
        tokio::spawn(async move {
            data.get_or_init(|| load(source)).await;
        });

        client
    }

    async fn loaded(&self) -> &LoadedData {
        self.data.get_or_init(|| load(self.source.clone())).await
    }

    /// Waits for initialization and reports whether it succeeded. A `false`
    /// return means the collections are empty but every operation still
    /// works, just with degraded results.
    pub async fn wait_for_load(&self) -> bool {
        self.loaded().await.ok
    }

    /// Low-latency location estimate from headers and locale hints.
    pub async fn location_fast(&self) -> ResolvedLocation {
        let data = self.loaded().await;
        self.resolver(data).location_fast()
    }

    /// Live geolocation fix refined with reference metadata, or `None` when
    /// the fix is unavailable, denied, or times out.
    pub async fn location_accurate(&self) -> Option<ResolvedLocation> {
        let data = self.loaded().await;
        self.resolver(data).location_accurate().await
    }

    /// Ranks catalog events against `location` and the free-text `query`.
    pub async fn search_events(
        &self,
        query: &str,
        location: &ResolvedLocation,
        limit: usize,
    ) -> Vec<RankedEvent> {
        let data = self.loaded().await;
        EventSearchEngine::new(&data.events).search(query, location, limit)
    }

    /// The closest events to the fast location, no query.
    pub async fn closest_events(&self, limit: usize) -> Vec<RankedEvent> {
        let location = self.location_fast().await;
        self.search_events("", &location, limit).await
    }

    fn resolver<'a>(&'a self, data: &'a LoadedData) -> LocationResolver<'a> {
        LocationResolver::new(
            &data.locations,
            &data.headers,
            self.device.as_ref(),
            self.fix_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::StubDevice;
    use crate::models::{EventRecord, LocationRecord};
    use crate::source::DataBundle;
    use async_trait::async_trait;
    use color_eyre::eyre::eyre;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FIX_TIMEOUT: Duration = Duration::from_secs(5);

    /// Returns a fixed bundle and counts how many times it was fetched.
    struct CountingSource {
        fetches: AtomicUsize,
        bundle: DataBundle,
    }

    impl CountingSource {
        fn new(bundle: DataBundle) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                bundle,
            })
        }
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn fetch(&self) -> Result<DataBundle> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.bundle.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DataSource for FailingSource {
        async fn fetch(&self) -> Result<DataBundle> {
            Err(eyre!("connection refused"))
        }
    }

    fn bundle() -> DataBundle {
        let mut headers = HashMap::new();
        headers.insert("x-served-by".to_string(), "cache-ord".to_string());
        DataBundle {
            locations: vec![LocationRecord {
                iata: "ORD".to_string(),
                latitude: 41.9,
                longitude: -87.6,
                country: "United States".to_string(),
                c2: "US".to_string(),
                c3: "USA".to_string(),
                state: "Illinois".to_string(),
                city: "Chicago".to_string(),
                timezone: "America/Chicago".to_string(),
            }],
            events: vec![
                EventRecord {
                    name: "Morning Yoga".to_string(),
                    category: "yoga".to_string(),
                    latitude: 41.92,
                    longitude: -87.6,
                    address: "100 W Main St".to_string(),
                    start: "2025-06-01T09:00:00Z".to_string(),
                },
                EventRecord {
                    name: "Spin Class".to_string(),
                    category: "cycling".to_string(),
                    latitude: 42.2,
                    longitude: -87.6,
                    address: "200 N State St".to_string(),
                    start: "2025-06-02T18:00:00Z".to_string(),
                },
            ],
            headers: HeaderSnapshot::new(headers),
        }
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_one_load() {
        let source = CountingSource::new(bundle());
        let client = ClassRadar::with_parts(
            source.clone(),
            Arc::new(StubDevice::unavailable()),
            FIX_TIMEOUT,
        );

        let (a, b, c) = tokio::join!(
            client.wait_for_load(),
            client.wait_for_load(),
            client.wait_for_load(),
        );
        assert!(a && b && c);
        assert_eq!(
            source.fetches.load(Ordering::SeqCst),
            1,
            "exactly one underlying fetch"
        );

        // Later calls reuse the same loaded data too.
        assert!(client.wait_for_load().await);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_empty_collections() {
        let client = ClassRadar::with_parts(
            Arc::new(FailingSource),
            Arc::new(StubDevice::unavailable()),
            FIX_TIMEOUT,
        );

        assert!(!client.wait_for_load().await, "failure surfaces as false");

        let location = client.location_fast().await;
        assert!(location.latitude.is_none());
        assert_eq!(location.city, "");

        assert!(client.closest_events(3).await.is_empty());
        assert!(client.location_accurate().await.is_none());
    }

    #[tokio::test]
    async fn test_fast_location_then_search_end_to_end() {
        let client = ClassRadar::with_parts(
            CountingSource::new(bundle()),
            Arc::new(StubDevice::unavailable()),
            FIX_TIMEOUT,
        );

        let location = client.location_fast().await;
        assert_eq!(location.city, "Chicago", "resolved via x-served-by code");

        let results = client.search_events("yoga", &location, 3).await;
        assert_eq!(results[0].event.name, "Morning Yoga");
        assert_eq!(results[0].score, 1);
        assert_eq!(results[0].unit.to_string(), "mi", "US user gets miles");
    }

    #[tokio::test]
    async fn test_closest_events_is_empty_query_over_fast_location() {
        let client = ClassRadar::with_parts(
            CountingSource::new(bundle()),
            Arc::new(StubDevice::unavailable()),
            FIX_TIMEOUT,
        );

        let results = client.closest_events(1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event.name, "Morning Yoga", "nearest event");
    }

    #[tokio::test]
    async fn test_accurate_location_uses_device_fix() {
        let client = ClassRadar::with_parts(
            CountingSource::new(bundle()),
            Arc::new(StubDevice::with_fix(41.95, -87.61)),
            FIX_TIMEOUT,
        );

        let resolved = client.location_accurate().await.expect("fix available");
        assert_eq!(resolved.latitude, Some(41.95));
        assert_eq!(resolved.city, "Chicago");
        assert_eq!(resolved.locationservices.to_string(), "enabled");
    }
}
