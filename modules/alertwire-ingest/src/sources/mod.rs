//! One adapter per feed. Each maps its source-specific vocabulary onto the
//! common alert schema; the fixed severity mappings live next to the
//! adapter they belong to.

pub mod fires;
pub mod quakes;
pub mod river;
pub mod transit;
pub mod weather;

pub use fires::FireAdapter;
pub use quakes::QuakeAdapter;
pub use river::RiverAdapter;
pub use transit::TransitAdapter;
pub use weather::WeatherAdapter;

use std::time::Duration;

pub(crate) const USER_AGENT: &str = "alertwire/0.1 (ops@alertwire.dev)";
pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for feed fetches: bounded timeout, fixed User-Agent.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .expect("reqwest client")
}

/// Apply the terminal step of the coordinate resolution order: an alert is
/// never dropped for lack of coordinates, it lands on the configured
/// area-of-interest center.
pub(crate) fn or_center(point: Option<(f64, f64)>, center: (f64, f64)) -> (f64, f64) {
    point.unwrap_or(center)
}

/// Pull a string field out of a JSON object, treating empty as absent.
pub(crate) fn str_field<'a>(obj: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}
