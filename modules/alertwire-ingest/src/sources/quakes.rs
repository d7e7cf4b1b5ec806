//! Earthquake adapter (USGS FDSN event query).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use alertwire_common::geo::extract_point;
use alertwire_common::time::from_epoch_millis;
use alertwire_common::{truncate_chars, NormalizedAlert};

use crate::side_cache::SideCache;
use crate::traits::{RawData, SourceAdapter};

use super::{http_client, or_center, str_field};

const BASE_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
/// Look-back window for each fetch.
const WINDOW_HOURS: i64 = 48;
/// Cap per run; the feed is ordered newest first.
const MAX_ITEMS: usize = 30;

pub struct QuakeAdapter {
    client: reqwest::Client,
    base_url: String,
    center: (f64, f64),
    radius_km: u32,
    test_mode: bool,
}

impl QuakeAdapter {
    pub fn new(center: (f64, f64), radius_km: u32, test_mode: bool) -> Self {
        Self {
            client: http_client(),
            base_url: BASE_URL.to_string(),
            center,
            radius_km,
            test_mode,
        }
    }
}

/// Magnitude → severity mapping. Fixed policy, documented in tests.
fn magnitude_severity(magnitude: Option<f64>) -> &'static str {
    match magnitude {
        Some(m) if m >= 6.0 => "Severe",
        Some(m) if m >= 4.5 => "Moderate",
        _ => "Minor",
    }
}

#[async_trait]
impl SourceAdapter for QuakeAdapter {
    fn name(&self) -> &'static str {
        "USGS_Earthquakes"
    }

    async fn fetch(&self) -> Option<RawData> {
        let starttime = (Utc::now() - Duration::hours(WINDOW_HOURS)).to_rfc3339();
        let mut params: Vec<(&str, String)> = vec![
            ("format", "geojson".to_string()),
            ("orderby", "time".to_string()),
            ("starttime", starttime),
        ];
        if self.test_mode {
            // Global M4.5+ guarantees data for end-to-end runs
            params.push(("minmagnitude", "4.5".to_string()));
        } else {
            params.push(("latitude", self.center.0.to_string()));
            params.push(("longitude", self.center.1.to_string()));
            params.push(("maxradiuskm", self.radius_km.to_string()));
            params.push(("minmagnitude", "0".to_string()));
        }

        debug!("Fetching earthquakes");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<Value>().await {
                Ok(body) => Some(RawData::Json(body)),
                Err(e) => {
                    warn!(error = %e, "Earthquake response was not JSON");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "HTTP error fetching earthquakes");
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
            .map(|features| features.iter().take(MAX_ITEMS).cloned().collect())
            .unwrap_or_default()
    }

    fn normalize_item(&self, item: &Value, _cache: &SideCache) -> Option<NormalizedAlert> {
        let props = item.get("properties")?;

        let magnitude = props.get("mag").and_then(|m| m.as_f64());
        let place = str_field(props, "place").unwrap_or("Unknown location");
        let mag_display = magnitude
            .map(|m| format!("M{m}"))
            .unwrap_or_else(|| "M?".to_string());

        let effective_at = props
            .get("time")
            .and_then(|t| t.as_i64())
            .and_then(from_epoch_millis)
            .unwrap_or_else(Utc::now);

        let (latitude, longitude) =
            or_center(item.get("geometry").and_then(extract_point), self.center);

        Some(NormalizedAlert {
            source: self.name().to_string(),
            provider_id: str_field(item, "id").map(str::to_string),
            title: truncate_chars(&format!("{mag_display} Earthquake — {place}"), 500),
            summary: Some(format!(
                "Magnitude {} earthquake detected.",
                magnitude.map(|m| m.to_string()).unwrap_or_else(|| "?".to_string())
            )),
            event_type: Some("Earthquake".to_string()),
            severity: Some(magnitude_severity(magnitude).to_string()),
            urgency: Some("Immediate".to_string()),
            area: Some(truncate_chars(place, 500)),
            latitude: Some(latitude),
            longitude: Some(longitude),
            effective_at,
            expires_at: None,
            url: str_field(props, "url").map(str::to_string),
            raw_payload: serde_json::to_string(item).ok(),
        })
    }
}
