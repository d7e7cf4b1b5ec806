//! River gauge adapter (USGS NWIS instantaneous values).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use alertwire_common::geo::validate_coordinates;
use alertwire_common::time::parse_datetime;
use alertwire_common::{truncate_chars, NormalizedAlert};

use crate::side_cache::SideCache;
use crate::traits::{RawData, SourceAdapter};

use super::{http_client, or_center, str_field};

const BASE_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";
/// Gage height (00065) and discharge (00060).
const PARAMETER_CODES: &str = "00065,00060";

pub struct RiverAdapter {
    client: reqwest::Client,
    base_url: String,
    sites: Vec<String>,
    center: (f64, f64),
}

impl RiverAdapter {
    pub fn new(sites: Vec<String>, center: (f64, f64)) -> Self {
        Self {
            client: http_client(),
            base_url: BASE_URL.to_string(),
            sites,
            center,
        }
    }
}

#[async_trait]
impl SourceAdapter for RiverAdapter {
    fn name(&self) -> &'static str {
        "USGS_NWIS"
    }

    async fn fetch(&self) -> Option<RawData> {
        if self.sites.is_empty() {
            debug!("No NWIS sites configured, skipping river gauges");
            return None;
        }

        let sites = self.sites.join(",");
        debug!(sites = %sites, "Fetching river gauge readings");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("sites", sites.as_str()),
                ("parameterCd", PARAMETER_CODES),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => match r.json::<Value>().await {
                Ok(body) => Some(RawData::Json(body)),
                Err(e) => {
                    warn!(error = %e, "River gauge response was not JSON");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "HTTP error fetching river gauges");
                None
            }
        }
    }

    fn extract_items(&self, raw: &RawData) -> Vec<Value> {
        let RawData::Json(body) = raw else {
            return Vec::new();
        };
        body.pointer("/value/timeSeries")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default()
    }

    fn normalize_item(&self, item: &Value, _cache: &SideCache) -> Option<NormalizedAlert> {
        let source_info = item.get("sourceInfo")?;
        let site_name = str_field(source_info, "siteName").unwrap_or("USGS Site");
        let site_code = source_info
            .pointer("/siteCode/0/value")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        let variable = item.get("variable")?;
        let variable_name = str_field(variable, "variableName").unwrap_or("Water Parameter");
        let variable_code = variable
            .pointer("/variableCode/0/value")
            .and_then(|v| v.as_str())
            .unwrap_or("param");

        // A series with no readings carries no observation to alert on.
        let values = item.pointer("/values/0/value").and_then(|v| v.as_array())?;
        let latest = values.last()?;
        let reading = latest
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or("N/A");

        let effective_at = latest
            .get("dateTime")
            .and_then(|v| v.as_str())
            .and_then(parse_datetime)
            .unwrap_or_else(Utc::now);

        // Gauge sites carry their own survey coordinates.
        let native = source_info
            .pointer("/geoLocation/geogLocation")
            .and_then(|loc| {
                let lat = loc.get("latitude").and_then(|v| v.as_f64())?;
                let lon = loc.get("longitude").and_then(|v| v.as_f64())?;
                validate_coordinates(lat, lon).then_some((lat, lon))
            });
        let (latitude, longitude) = or_center(native, self.center);

        Some(NormalizedAlert {
            source: self.name().to_string(),
            provider_id: Some(format!("{site_code}_{variable_code}")),
            title: truncate_chars(&format!("River {variable_name} — {site_name}"), 500),
            summary: Some(format!("Latest reading: {reading}")),
            event_type: Some("River Level".to_string()),
            severity: Some("Moderate".to_string()),
            urgency: Some("Expected".to_string()),
            area: Some(truncate_chars(site_name, 500)),
            latitude: Some(latitude),
            longitude: Some(longitude),
            effective_at,
            expires_at: None,
            url: Some(format!(
                "https://waterdata.usgs.gov/monitoring-location/{site_code}"
            )),
            raw_payload: serde_json::to_string(item).ok(),
        })
    }
}
