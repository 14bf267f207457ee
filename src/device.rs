//! The device capability surface consumed by the resolver.
//!
//! This module provides a single trait, [`DeviceEnv`], covering the three
//! things the resolver may ask the host for: a one-shot geolocation fix, the
//! active locale tag, and the resolved IANA timezone. [`SystemDevice`] is the
//! production implementation: the fix comes from IP geolocation (IpApi) and
//! locale/timezone come from the process environment. Tests substitute stubs.

use crate::models::Coordinates;
use async_trait::async_trait;
use ipgeolocate::{Locator, Service};
use tracing::{debug, info, warn};

/// Host environment queried during location resolution.
///
/// Every method is total: a missing capability or a failed lookup is `None`,
/// never an error.
#[async_trait]
pub trait DeviceEnv: Send + Sync {
    /// Requests a single live position fix. Implementations handle their own
    /// failures; the resolver applies the timeout budget on top.
    async fn position(&self) -> Option<Coordinates>;

    /// Active BCP 47 locale tag, e.g. "en-US".
    fn language(&self) -> Option<String>;

    /// Resolved IANA timezone name, e.g. "Europe/Berlin".
    fn timezone(&self) -> Option<String>;
}

/// Production [`DeviceEnv`]: IP geolocation plus process environment.
pub struct SystemDevice {
    probe_address: String,
}

impl SystemDevice {
    /// `probe_address` is the IP handed to the geolocation service.
    pub fn new(probe_address: String) -> Self {
        Self { probe_address }
    }
}

#[async_trait]
impl DeviceEnv for SystemDevice {
    async fn position(&self) -> Option<Coordinates> {
        // Using IpApi as the service, it's pretty reliable.
        match Locator::get(&self.probe_address, Service::IpApi).await {
            Ok(loc) => {
                let lat = loc.latitude.parse::<f64>().ok()?;
                let lon = loc.longitude.parse::<f64>().ok()?;
                info!("Geolocation successful - ({}, {})", lat, lon);
                Some(Coordinates::new(lat, lon))
            }
            Err(e) => {
                warn!("Error using geolocation service: {}", e);
                None
            }
        }
    }

    fn language(&self) -> Option<String> {
        let raw = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))?;
        // "en_US.UTF-8" -> "en-US"
        let tag = raw
            .split('.')
            .next()
            .unwrap_or(&raw)
            .replace('_', "-");
        if tag.is_empty() || tag == "C" || tag == "POSIX" {
            return None;
        }
        debug!("Detected locale tag: {}", tag);
        Some(tag)
    }

    fn timezone(&self) -> Option<String> {
        if let Ok(tz) = std::env::var("TZ") {
            if !tz.is_empty() {
                return Some(tz);
            }
        }
        let tz = std::fs::read_to_string("/etc/timezone").ok()?;
        let tz = tz.trim();
        if tz.is_empty() {
            return None;
        }
        Some(tz.to_string())
    }
}
