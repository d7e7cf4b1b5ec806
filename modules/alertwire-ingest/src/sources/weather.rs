//! Weather alert adapter (NWS-style GeoJSON feed).
//!
//! Alerts usually arrive without point geometry; affected zones are fetched
//! into the side cache so a zone polygon centroid can stand in.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use alertwire_common::geo::extract_point;
use alertwire_common::time::parse_datetime;
use alertwire_common::{truncate_chars, NormalizedAlert};

use crate::side_cache::SideCache;
use crate::traits::{RawData, SourceAdapter};

use super::{http_client, or_center, str_field};

const BASE_URL: &str = "https://api.weather.gov";
/// Upper bound on zone lookups per run; alerts beyond this fall back.
const MAX_ZONE_LOOKUPS: usize = 30;
/// Batch width for zone fetches. Deliberate backpressure, not a limitation.
const ZONE_FETCH_CONCURRENCY: usize = 5;

pub struct WeatherAdapter {
    client: reqwest::Client,
    base_url: String,
    center: (f64, f64),
    test_mode: bool,
}

impl WeatherAdapter {
    pub fn new(center: (f64, f64), test_mode: bool) -> Self {
        Self {
            client: http_client(),
            base_url: BASE_URL.to_string(),
            center,
            test_mode,
        }
    }

    async fn fetch_zone_point(&self, zone_url: &str) -> Option<(f64, f64)> {
        let response = self
            .client
            .get(zone_url)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let body: Value = match response {
            Ok(r) => r.json().await.ok()?,
            Err(e) => {
                debug!(zone = zone_url, error = %e, "Zone lookup failed");
                return None;
            }
        };
        extract_point(body.get("geometry")?)
    }
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    fn name(&self) -> &'static str {
        "NWS"
    }

    async fn fetch(&self) -> Option<RawData> {
        let url = if self.test_mode {
            // Statewide query yields live data even on quiet days
            format!("{}/alerts/active?area=VA", self.base_url)
        } else {
            format!(
                "{}/alerts/active?point={},{}",
                self.base_url, self.center.0, self.center.1
            )
        };

        debug!(url = %url, "Fetching weather alerts");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<Value>().await {
                Ok(body) => Some(RawData::Json(body)),
                Err(e) => {
                    warn!(error = %e, "Weather alert response was not JSON");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "HTTP error fetching weather alerts");
                None
            }
        }
    }

    fn extract_items(&self, raw: &RawData) -> Vec<Value> {
        let RawData::Json(body) = raw else {
            return Vec::new();
        };
        body.get("features")
            .and_then(|f| f.as_array())
            .cloned()
            .unwrap_or_default()
    }

    /// Resolve affected zone references to representative points, at most
    /// five in flight at a time.
    async fn build_side_cache(&self, items: &[Value]) -> SideCache {
        let zones: Vec<String> = items
            .iter()
            .filter_map(|item| item.pointer("/properties/affectedZones"))
            .filter_map(|z| z.as_array())
            .flatten()
            .filter_map(|z| z.as_str().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(MAX_ZONE_LOOKUPS)
            .collect();

        let mut cache = SideCache::default();
        if zones.is_empty() {
            return cache;
        }

        let resolved: Vec<(String, Option<(f64, f64)>)> = stream::iter(zones)
            .map(|zone| async move {
                let point = self.fetch_zone_point(&zone).await;
                (zone, point)
            })
            .buffer_unordered(ZONE_FETCH_CONCURRENCY)
            .collect()
            .await;

        for (zone, point) in resolved {
            if let Some(point) = point {
                cache.zone_points.insert(zone, point);
            }
        }

        info!(zones = cache.zone_points.len(), "Weather zone cache built");
        cache
    }

    fn normalize_item(&self, item: &Value, cache: &SideCache) -> Option<NormalizedAlert> {
        let props = item.get("properties")?;

        let title = str_field(props, "headline")
            .or_else(|| str_field(props, "event"))
            .unwrap_or("Weather Alert");

        let effective_at = str_field(props, "effective")
            .or_else(|| str_field(props, "onset"))
            .or_else(|| str_field(props, "sent"))
            .and_then(parse_datetime)
            .unwrap_or_else(Utc::now);

        let expires_at = str_field(props, "expires")
            .or_else(|| str_field(props, "ends"))
            .and_then(parse_datetime);

        // Feed geometry first, then the zone cache, then the fixed center.
        let native = item.get("geometry").and_then(extract_point);
        let from_zone = || {
            props
                .get("affectedZones")
                .and_then(|z| z.as_array())
                .and_then(|zones| {
                    zones
                        .iter()
                        .filter_map(|z| z.as_str())
                        .find_map(|z| cache.zone_points.get(z).copied())
                })
        };
        let (latitude, longitude) = or_center(native.or_else(from_zone), self.center);

        Some(NormalizedAlert {
            source: self.name().to_string(),
            provider_id: str_field(props, "id").map(str::to_string),
            title: truncate_chars(title, 500),
            summary: str_field(props, "description").map(|d| truncate_chars(d, 5000)),
            event_type: str_field(props, "event").map(str::to_string),
            severity: str_field(props, "severity").map(str::to_string),
            urgency: str_field(props, "urgency").map(str::to_string),
            area: str_field(props, "areaDesc").map(|a| truncate_chars(a, 500)),
            latitude: Some(latitude),
            longitude: Some(longitude),
            effective_at,
            expires_at,
            url: str_field(props, "id")
                .or_else(|| str_field(props, "@id"))
                .map(str::to_string),
            raw_payload: serde_json::to_string(item).ok(),
        })
    }
}
