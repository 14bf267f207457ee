//! The location-resolution cascade.
//!
//! `location_fast` walks an ordered list of tiers — response-header geodata,
//! CDN point-of-presence codes, locale/timezone hints — and takes the first
//! one that yields a usable location. No tier blocks on a device permission
//! prompt. `location_accurate` is the slow path: a single live geolocation
//! fix raced against a timeout, refined with the nearest reference record.
//!
//! Each tier is a plain function from a read-only [`TierContext`] to an
//! optional [`ResolvedLocation`], so tiers stay independently testable and
//! the cascade is just `find_map` over a fixed array.

use crate::device::DeviceEnv;
use crate::geo;
use crate::models::{
    Coordinates, HeaderSnapshot, LocationRecord, LocationServices, ResolvedLocation,
};
use std::time::Duration;
use tracing::{debug, info};

/// Combined "lat,long" header checked before the separate axis headers.
const COMBINED_COORDS_HEADER: &str = "x-client-city-lat-long";
const LATITUDE_HEADER: &str = "cf-iplatitude";
const LONGITUDE_HEADER: &str = "cf-iplongitude";
/// City headers in precedence order.
const CITY_HEADERS: [&str; 2] = ["cf-ipcity", "x-city"];
const COUNTRY_HEADER: &str = "x-country";
/// Edge/proxy headers whose trailing characters may carry a facility code,
/// in precedence order.
const POP_HEADERS: [&str; 2] = ["x-served-by", "cf-ray"];

/// Read-only inputs shared by every tier. Device hints are sampled once per
/// resolution so the tier functions themselves stay pure.
struct TierContext<'a> {
    headers: &'a HeaderSnapshot,
    locations: &'a [LocationRecord],
    language: Option<&'a str>,
    timezone: Option<&'a str>,
}

type Tier = fn(&TierContext) -> Option<ResolvedLocation>;

/// Fallback order: headers, then facility code, then locale/timezone.
const TIERS: [Tier; 3] = [header_tier, pop_tier, locale_tier];

/// Resolves a user location from injected read-only snapshots.
pub struct LocationResolver<'a> {
    locations: &'a [LocationRecord],
    headers: &'a HeaderSnapshot,
    device: &'a dyn DeviceEnv,
    fix_timeout: Duration,
}

impl<'a> LocationResolver<'a> {
    pub fn new(
        locations: &'a [LocationRecord],
        headers: &'a HeaderSnapshot,
        device: &'a dyn DeviceEnv,
        fix_timeout: Duration,
    ) -> Self {
        Self {
            locations,
            headers,
            device,
            fix_timeout,
        }
    }

    /// Fast path: first tier that yields data wins; the empty record is the
    /// final fallback. Never touches permission-gated device APIs.
    pub fn location_fast(&self) -> ResolvedLocation {
        let language = self.device.language();
        let timezone = self.device.timezone();
        let ctx = TierContext {
            headers: self.headers,
            locations: self.locations,
            language: language.as_deref(),
            timezone: timezone.as_deref(),
        };

        let mut resolved = TIERS
            .iter()
            .find_map(|tier| tier(&ctx))
            .unwrap_or_else(|| {
                debug!("All fast tiers came up empty");
                ResolvedLocation::empty()
            });

        resolved.locationservices = LocationServices::Disabled;
        resolved.language = language.unwrap_or_default();
        resolved
    }

    /// Accurate path: one live fix with a hard timeout. The slower of the
    /// fix and the timer is discarded; there are no retries.
    ///
    /// Returns `None` on missing capability, failure, timeout, or when the
    /// reference dataset is empty.
    pub async fn location_accurate(&self) -> Option<ResolvedLocation> {
        let fix = match tokio::time::timeout(self.fix_timeout, self.device.position()).await {
            Ok(Some(fix)) => fix,
            Ok(None) => {
                debug!("No usable device fix");
                return None;
            }
            Err(_) => {
                info!("Geolocation timed out after {:?}", self.fix_timeout);
                return None;
            }
        };

        let nearest = geo::find_nearest(self.locations, fix)?;
        let mut resolved = ResolvedLocation::from_record(nearest);
        resolved.latitude = Some(fix.latitude);
        resolved.longitude = Some(fix.longitude);
        resolved.locationservices = LocationServices::Enabled;
        resolved.language = self.device.language().unwrap_or_default();
        Some(resolved)
    }
}

/// Location fields supplied directly by response headers.
///
/// These are the only fields that may override a matched reference record:
/// city and country replace the record's values, coordinates are used
/// verbatim, and everything else (c2/c3/state/timezone) always comes from
/// the record.
#[derive(Debug, Default)]
struct HeaderHints {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country: Option<String>,
}

impl HeaderHints {
    fn extract(headers: &HeaderSnapshot) -> Self {
        let mut hints = Self::default();

        if let Some(combined) = headers.get(COMBINED_COORDS_HEADER) {
            if let Some((lat, lon)) = combined.split_once(',') {
                hints.latitude = lat.trim().parse().ok();
                hints.longitude = lon.trim().parse().ok();
            }
        } else {
            hints.latitude = headers.get(LATITUDE_HEADER).and_then(|v| v.parse().ok());
            hints.longitude = headers.get(LONGITUDE_HEADER).and_then(|v| v.parse().ok());
        }

        hints.city = CITY_HEADERS
            .iter()
            .find_map(|name| headers.get(name))
            .map(str::to_string);
        hints.country = headers.get(COUNTRY_HEADER).map(str::to_string);

        hints
    }

    fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.city.is_none()
            && self.country.is_none()
    }

    /// Applies the field-level override table to a record-derived location.
    fn apply_overrides(&self, resolved: &mut ResolvedLocation) {
        if let Some(city) = &self.city {
            resolved.city = city.clone();
        }
        if let Some(country) = &self.country {
            resolved.country = country.clone();
        }
    }
}

/// Tier 1: geodata in the response headers.
///
/// With a full coordinate pair, the header coordinates are kept verbatim and
/// administrative metadata comes from the nearest reference record. Without
/// one, a city or country header triggers an exact-match dataset lookup.
fn header_tier(ctx: &TierContext) -> Option<ResolvedLocation> {
    let hints = HeaderHints::extract(ctx.headers);
    if hints.is_empty() {
        return None;
    }
    debug!("Header tier hints: {:?}", hints);

    if let Some(point) = hints.coordinates() {
        if let Some(nearest) = geo::find_nearest(ctx.locations, point) {
            info!("Resolved from header coordinates near {}", nearest.city);
            let mut resolved = ResolvedLocation::from_record(nearest);
            resolved.latitude = Some(point.latitude);
            resolved.longitude = Some(point.longitude);
            hints.apply_overrides(&mut resolved);
            return Some(resolved);
        }
    }

    if hints.city.is_some() || hints.country.is_some() {
        let matched = ctx.locations.iter().find(|record| {
            hints.city.as_deref() == Some(record.city.as_str())
                || hints.country.as_deref() == Some(record.country.as_str())
        })?;
        info!("Resolved from header city/country match: {}", matched.city);
        let mut resolved = ResolvedLocation::from_record(matched);
        hints.apply_overrides(&mut resolved);
        return Some(resolved);
    }

    None
}

/// Tier 2: facility code embedded in an edge/proxy header.
///
/// The last three characters of the header value, upper-cased, are treated
/// as a candidate code with no further validation. First listed header with
/// an exact dataset match wins.
fn pop_tier(ctx: &TierContext) -> Option<ResolvedLocation> {
    POP_HEADERS.iter().find_map(|name| {
        let value = ctx.headers.get(name)?;
        let code = trailing_code(value);
        let record = ctx.locations.iter().find(|r| r.iata == code)?;
        info!("Resolved from {} facility code {}", name, code);
        Some(ResolvedLocation::from_record(record))
    })
}

/// Last three characters of `value`, upper-cased. Values shorter than three
/// characters are used whole.
fn trailing_code(value: &str) -> String {
    let start = value
        .char_indices()
        .rev()
        .nth(2)
        .map(|(i, _)| i)
        .unwrap_or(0);
    value[start..].to_uppercase()
}

/// Tier 3: locale tag and timezone hints.
///
/// Filters the dataset by exact timezone match, then by the country code
/// derived from the locale tag, and takes the first survivor.
fn locale_tier(ctx: &TierContext) -> Option<ResolvedLocation> {
    if ctx.language.is_none() && ctx.timezone.is_none() {
        return None;
    }

    let country_guess = ctx.language.map(derive_country_code);
    debug!(
        "Locale tier: language={:?} timezone={:?} country_guess={:?}",
        ctx.language, ctx.timezone, country_guess
    );

    let mut matching: Vec<&LocationRecord> = ctx.locations.iter().collect();
    if let Some(tz) = ctx.timezone {
        matching.retain(|record| record.timezone == tz);
    }
    if let Some(cc) = &country_guess {
        matching.retain(|record| record.c2 == *cc);
    }

    matching.first().map(|record| {
        info!("Resolved from locale/timezone: {}", record.city);
        ResolvedLocation::from_record(record)
    })
}

/// Country-code guess from a locale tag: the subtag after the first `-`, or
/// the final two characters when the tag has no separator. Upper-cased.
fn derive_country_code(tag: &str) -> String {
    let guess = match tag.split('-').nth(1).filter(|s| !s.is_empty()) {
        Some(subtag) => subtag.to_string(),
        None => {
            let start = tag
                .char_indices()
                .rev()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(0);
            tag[start..].to_string()
        }
    };
    guess.to_uppercase()
}
