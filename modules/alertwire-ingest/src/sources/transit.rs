//! Rail transit incident adapter (WMATA incidents API).
//!
//! Incidents carry no coordinates. The station directory is fetched into
//! the side cache each cycle and incident descriptions are scanned for
//! station names.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use alertwire_common::{truncate_chars, NormalizedAlert};

use crate::side_cache::SideCache;
use crate::traits::{RawData, SourceAdapter};

use super::{http_client, or_center, str_field};

const BASE_URL: &str = "https://api.wmata.com";
const STATUS_URL: &str = "https://wmata.com/service/status/";

pub struct TransitAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    center: (f64, f64),
}

impl TransitAdapter {
    pub fn new(api_key: Option<String>, center: (f64, f64)) -> Self {
        Self {
            client: http_client(),
            base_url: BASE_URL.to_string(),
            api_key,
            center,
        }
    }

    async fn fetch_stations(&self, api_key: &str) -> Option<Value> {
        let url = format!("{}/Rail.svc/json/jStations", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("api_key", api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match response {
            Ok(r) => r.json().await.ok(),
            Err(e) => {
                debug!(error = %e, "Station directory fetch failed");
                None
            }
        }
    }
}

/// Incident type → severity. Moderate phrasing is checked first: "major
/// delay" contains "delay", and routine single-tracking notices would
/// otherwise be flagged Severe.
fn incident_severity(incident_type: &str) -> &'static str {
    let text = incident_type.to_lowercase();
    const MODERATE: [&str; 3] = ["delay", "single tracking", "disabled train"];
    const SEVERE: [&str; 3] = ["suspended", "major delay", "station closure"];
    if MODERATE.iter().any(|kw| text.contains(kw)) {
        "Moderate"
    } else if SEVERE.iter().any(|kw| text.contains(kw)) {
        "Severe"
    } else {
        "Minor"
    }
}

#[async_trait]
impl SourceAdapter for TransitAdapter {
    fn name(&self) -> &'static str {
        "WMATA"
    }

    async fn fetch(&self) -> Option<RawData> {
        let Some(api_key) = &self.api_key else {
            debug!("WMATA API key not configured, skipping transit incidents");
            return None;
        };

        let url = format!("{}/Incidents.svc/json/Incidents", self.base_url);
        debug!("Fetching transit incidents");

        let response = self
            .client
            .get(&url)
            .header("api_key", api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<Value>().await {
                Ok(body) => Some(RawData::Json(body)),
                Err(e) => {
                    warn!(error = %e, "Transit incident response was not JSON");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "HTTP error fetching transit incidents");
                None
            }
        }
    }

    fn extract_items(&self, raw: &RawData) -> Vec<Value> {
        let RawData::Json(body) = raw else {
            return Vec::new();
        };
        body.get("Incidents")
            .and_then(|i| i.as_array())
            .cloned()
            .unwrap_or_default()
    }

    async fn build_side_cache(&self, items: &[Value]) -> SideCache {
        let mut cache = SideCache::default();
        if items.is_empty() {
            return cache;
        }
        let Some(api_key) = &self.api_key else {
            return cache;
        };
        let Some(directory) = self.fetch_stations(api_key).await else {
            return cache;
        };

        let stations = directory
            .get("Stations")
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default();
        for station in &stations {
            let Some(name) = str_field(station, "Name") else {
                continue;
            };
            let (Some(lat), Some(lon)) = (
                station.get("Lat").and_then(|v| v.as_f64()),
                station.get("Lon").and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            cache.stations.insert(name, lat, lon);
        }

        info!(stations = cache.stations.len(), "Station directory cached");
        cache
    }

    fn normalize_item(&self, item: &Value, cache: &SideCache) -> Option<NormalizedAlert> {
        let incident_type = str_field(item, "IncidentType").unwrap_or("Transit Incident");
        let description = str_field(item, "Description");
        // LinesAffected arrives as "BL; YL;" with stray separators
        let lines = str_field(item, "LinesAffected")
            .map(|l| {
                l.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "WMATA Metro".to_string());

        // The feed carries no geometry; a station named mid-description is
        // the best available point.
        let native = description.and_then(|d| cache.stations.find_in_text(d));
        let (latitude, longitude) = or_center(native, self.center);

        Some(NormalizedAlert {
            source: self.name().to_string(),
            provider_id: str_field(item, "IncidentID").map(str::to_string),
            title: truncate_chars(&format!("Transit Incident — {incident_type}"), 500),
            summary: Some(
                description
                    .map(|d| truncate_chars(d, 5000))
                    .unwrap_or_else(|| "Metro transit incident reported.".to_string()),
            ),
            event_type: Some("Transit".to_string()),
            severity: Some(incident_severity(incident_type).to_string()),
            urgency: Some("Immediate".to_string()),
            area: Some(truncate_chars(&lines, 500)),
            latitude: Some(latitude),
            longitude: Some(longitude),
            effective_at: Utc::now(),
            expires_at: None,
            url: Some(STATUS_URL.to_string()),
            raw_payload: serde_json::to_string(item).ok(),
        })
    }
}
