//! Free-text search and distance ranking over the event catalog.

use crate::geo::{self, KM_TO_MILES};
use crate::models::{DistanceUnit, EventRecord, RankedEvent, ResolvedLocation};
use std::cmp::Ordering;

/// Country codes that get distances in miles instead of kilometers.
const NON_METRIC_COUNTRIES: [&str; 2] = ["US", "GB"];

/// Default number of results when the caller does not specify a limit.
pub const DEFAULT_RESULT_LIMIT: usize = 3;

/// Scores and ranks the loaded event catalog against a user location.
pub struct EventSearchEngine<'a> {
    events: &'a [EventRecord],
}

impl<'a> EventSearchEngine<'a> {
    pub fn new(events: &'a [EventRecord]) -> Self {
        Self { events }
    }

    /// Ranks events by query relevance, then by distance.
    ///
    /// With no query tokens every event scores 1, so ranking degrades to
    /// pure distance order. Otherwise the score is the count of tokens found
    /// in the event's name, category, and address. Distances are converted
    /// to miles when the user's country code is in the non-metric set; the
    /// same unit applies to every result of one call.
    pub fn search(
        &self,
        query: &str,
        location: &ResolvedLocation,
        limit: usize,
    ) -> Vec<RankedEvent> {
        let unit = unit_for(&location.c2);
        let tokens = tokenize(query);

        let mut ranked: Vec<RankedEvent> = self
            .events
            .iter()
            .map(|event| {
                let km = match location.coordinates() {
                    Some(point) => geo::distance(
                        point.latitude,
                        point.longitude,
                        event.latitude,
                        event.longitude,
                    ),
                    // No fix at all: distances are undefined and ranking
                    // falls back to score plus catalog order.
                    None => f64::NAN,
                };
                let distance = match unit {
                    DistanceUnit::Km => km,
                    DistanceUnit::Mi => km * KM_TO_MILES,
                };
                RankedEvent {
                    event: event.clone(),
                    distance,
                    unit,
                    score: score(event, &tokens),
                }
            })
            .collect();

        // Stable sort: score descending, then distance ascending. NaN
        // distances compare equal and keep catalog order.
        ranked.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(Ordering::Equal)
            })
        });
        ranked.truncate(limit);
        ranked
    }
}

fn unit_for(c2: &str) -> DistanceUnit {
    if NON_METRIC_COUNTRIES.contains(&c2) {
        DistanceUnit::Mi
    } else {
        DistanceUnit::Km
    }
}

/// Lower-cases and splits on whitespace and commas, dropping empty tokens.
fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count of query tokens present in the event's searchable text. A uniform
/// 1 when there are no tokens.
fn score(event: &EventRecord, tokens: &[String]) -> u32 {
    if tokens.is_empty() {
        return 1;
    }
    let searchable =
        format!("{} {} {}", event.name, event.category, event.address).to_lowercase();
    tokens
        .iter()
        .filter(|token| searchable.contains(token.as_str()))
        .count() as u32
}
