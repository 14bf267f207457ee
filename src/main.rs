use classradar::client::ClassRadar;
use classradar::config::Config;
use classradar::logging;
use classradar::models::{RankedEvent, ResolvedLocation};
use color_eyre::Result;
use structopt::StructOpt;
use tracing::{info, warn};

#[derive(StructOpt, Debug)]
#[structopt(name = "classradar", about = "Find training classes near you.")]
struct Opt {
    /// Free-text search over event name, category, and address.
    #[structopt(short, long, default_value = "")]
    search: String,

    /// Maximum number of events to show.
    #[structopt(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;

    let opt = Opt::from_args();
    let config = Config::load();
    let limit = opt.limit.unwrap_or(config.search.default_limit);

    println!("Loading location data...");
    let radar = ClassRadar::new(&config)?;
    if !radar.wait_for_load().await {
        // Keep going: every operation degrades gracefully on empty data.
        warn!("Reference data failed to load; results will be empty.");
        eprintln!("Warning: could not load reference data.");
    }

    // Fast estimate first so something renders immediately.
    let fast = radar.location_fast().await;
    render_location(&fast);

    let events = if opt.search.is_empty() {
        radar.closest_events(limit).await
    } else {
        radar.search_events(&opt.search, &fast, limit).await
    };
    render_events(&events);

    // Then refine with the live fix, when the user allows one.
    info!("Requesting accurate location fix...");
    if let Some(accurate) = radar.location_accurate().await {
        println!("\nRefined with location services:");
        render_location(&accurate);
        if opt.search.is_empty() {
            render_events(&radar.closest_events(limit).await);
        }
    }

    Ok(())
}

fn render_location(location: &ResolvedLocation) {
    let place = [
        location.city.as_str(),
        location.region.as_str(),
        location.country.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .cloned()
    .collect::<Vec<_>>()
    .join(", ");

    if place.is_empty() {
        println!("Your location could not be determined.");
    } else {
        println!("Your location: {place}");
    }
    if let Some(coords) = location.coordinates() {
        println!("  coordinates: {:.4}, {:.4}", coords.latitude, coords.longitude);
    }
    if !location.timezone.is_empty() {
        println!("  timezone:    {}", location.timezone);
    }
    println!("  location services: {}", location.locationservices);
}

fn render_events(events: &[RankedEvent]) {
    if events.is_empty() {
        println!("\nNo events found.");
        return;
    }

    println!("\nNearby classes:");
    for event in events {
        println!("  {} [{}]", event.event.name, event.event.category);
        println!(
            "    {} ({:.0} {})",
            event.event.address,
            event.distance,
            event.unit
        );
        println!("    Starts: {}", event.event.start);
    }
}
