//! classradar - approximate user location with layered fallbacks, plus
//! nearby training class search.
//!
//! The resolver tries cheap signals first (response headers, CDN facility
//! codes, locale and timezone hints) and only then a live geolocation fix,
//! so callers can render a result immediately and refine it afterwards. The
//! search engine ranks the event catalog by query relevance and distance
//! from whichever location estimate is current.
//!
//! ```no_run
//! use classradar::client::ClassRadar;
//! use classradar::config::Config;
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let radar = ClassRadar::new(&Config::load())?;
//! radar.wait_for_load().await;
//!
//! let here = radar.location_fast().await;
//! let classes = radar.search_events("yoga", &here, 3).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod device;
pub mod geo;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod search;
pub mod source;

pub use client::ClassRadar;
pub use models::{
    Coordinates, DistanceUnit, EventRecord, HeaderSnapshot, LocationRecord, LocationServices,
    RankedEvent, ResolvedLocation,
};
pub use search::DEFAULT_RESULT_LIMIT;
