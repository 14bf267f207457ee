//! Loading of the location reference table and the event catalog.
//!
//! [`HttpSource`] fetches both collections concurrently at startup and
//! captures the response headers of the location fetch — those headers feed
//! the header and point-of-presence tiers of the resolver. A [`DataSource`]
//! trait sits in front of it so tests can inject canned bundles.

use crate::models::{EventRecord, HeaderSnapshot, LocationRecord};
use async_trait::async_trait;
use color_eyre::Result;
use reqwest::Client;
use std::collections::HashMap;
use tracing::info;

/// Everything a single load produces: both collections plus the header
/// snapshot taken from the location-collection response.
#[derive(Debug, Clone, Default)]
pub struct DataBundle {
    pub locations: Vec<LocationRecord>,
    pub events: Vec<EventRecord>,
    pub headers: HeaderSnapshot,
}

/// Source of the reference data. Fetched exactly once per client.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<DataBundle>;
}

/// Fetches the collections over HTTP.
pub struct HttpSource {
    client: Client,
    locations_url: String,
    events_url: String,
}

impl HttpSource {
    pub fn new(locations_url: String, events_url: String, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            locations_url,
            events_url,
        })
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self) -> Result<DataBundle> {
        let (locations_res, events_res) = tokio::try_join!(
            self.client.get(&self.locations_url).send(),
            self.client.get(&self.events_url).send(),
        )?;

        // Only the location response contributes headers; the event response
        // is body-only.
        let mut headers = HashMap::new();
        for (name, value) in locations_res.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let (locations, events) = tokio::try_join!(
            locations_res.json::<Vec<LocationRecord>>(),
            events_res.json::<Vec<EventRecord>>(),
        )?;

        info!(
            "Loaded {} locations and {} events",
            locations.len(),
            events.len()
        );

        Ok(DataBundle {
            locations,
            events,
            headers: HeaderSnapshot::new(headers),
        })
    }
}
