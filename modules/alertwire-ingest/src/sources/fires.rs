//! Satellite fire detection adapter (NASA FIRMS area CSV).
//!
//! Requires an API key; without one the adapter self-disables. The feed
//! answers 404 when the bounding box has no detections, which is an empty
//! result rather than a failure.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use alertwire_common::config::BoundingBox;
use alertwire_common::geo::validate_coordinates;
use alertwire_common::time::parse_datetime;
use alertwire_common::{truncate_chars, NormalizedAlert};

use crate::side_cache::SideCache;
use crate::traits::{RawData, SourceAdapter};

use super::{http_client, or_center, str_field};

const BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv";
const SATELLITE_SOURCE: &str = "VIIRS_SNPP_NRT";
const DAY_RANGE: u8 = 7;
const MAX_ITEMS: usize = 50;

pub struct FireAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    bbox: BoundingBox,
    center: (f64, f64),
}

impl FireAdapter {
    pub fn new(api_key: Option<String>, bbox: BoundingBox, center: (f64, f64)) -> Self {
        Self {
            client: http_client(),
            base_url: BASE_URL.to_string(),
            api_key,
            bbox,
            center,
        }
    }
}

/// Detection confidence → severity. VIIRS reports l/n/h or spelled-out
/// values depending on product version.
fn confidence_severity(confidence: &str) -> &'static str {
    let conf = confidence.to_lowercase();
    if conf.contains("high") || conf == "h" {
        "Severe"
    } else if conf.contains("nominal") || conf == "n" {
        "Moderate"
    } else {
        "Minor"
    }
}

/// Combine `acq_date` (YYYY-MM-DD) with `acq_time` (HHMM, sometimes
/// unpadded) into a UTC timestamp. Non-numeric or out-of-range time
/// fields yield absent; never index into the raw string.
fn acquisition_time(acq_date: &str, acq_time: &str) -> Option<chrono::DateTime<Utc>> {
    if acq_date.is_empty() {
        return None;
    }
    let hhmm: u32 = acq_time.parse().ok()?;
    let (hour, minute) = (hhmm / 100, hhmm % 100);
    if hour > 23 || minute > 59 {
        return None;
    }
    parse_datetime(&format!("{acq_date}T{hour:02}:{minute:02}:00Z"))
}

/// Hand-rolled CSV split: header row then uniform data rows. Rows whose
/// field count disagrees with the header are skipped.
fn parse_csv(text: &str) -> Vec<Value> {
    let mut lines = text.trim().lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<&str> = header_line.split(',').map(str::trim).collect();
    if header.len() < 2 {
        return Vec::new();
    }

    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != header.len() {
                return None;
            }
            let row: Map<String, Value> = header
                .iter()
                .zip(fields)
                .map(|(k, v)| (k.to_string(), Value::String(v.trim().to_string())))
                .collect();
            Some(Value::Object(row))
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for FireAdapter {
    fn name(&self) -> &'static str {
        "NASA_FIRMS"
    }

    async fn fetch(&self) -> Option<RawData> {
        let Some(api_key) = &self.api_key else {
            debug!("FIRMS API key not configured, skipping fire detections");
            return None;
        };

        let url = format!(
            "{}/{}/{}/{},{},{},{}/{}",
            self.base_url,
            api_key,
            SATELLITE_SOURCE,
            self.bbox.min_lon,
            self.bbox.min_lat,
            self.bbox.max_lon,
            self.bbox.max_lat,
            DAY_RANGE
        );

        debug!("Fetching fire detections");

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "HTTP error fetching fire detections");
                return None;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("No fire detections in the area (404 from FIRMS)");
            return None;
        }

        match response.error_for_status() {
            Ok(r) => match r.text().await {
                Ok(body) => Some(RawData::Text(body)),
                Err(e) => {
                    warn!(error = %e, "Failed to read fire detection body");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "HTTP error fetching fire detections");
                None
            }
        }
    }

    fn extract_items(&self, raw: &RawData) -> Vec<Value> {
        let RawData::Text(body) = raw else {
            return Vec::new();
        };
        let mut rows = parse_csv(body);
        rows.truncate(MAX_ITEMS);
        rows
    }

    fn normalize_item(&self, item: &Value, _cache: &SideCache) -> Option<NormalizedAlert> {
        let latitude_str = str_field(item, "latitude").unwrap_or("");
        let longitude_str = str_field(item, "longitude").unwrap_or("");
        let native = match (latitude_str.parse::<f64>(), longitude_str.parse::<f64>()) {
            (Ok(lat), Ok(lon)) if validate_coordinates(lat, lon) => Some((lat, lon)),
            _ => None,
        };
        let (latitude, longitude) = or_center(native, self.center);

        let brightness = str_field(item, "bright_ti4");
        let confidence = str_field(item, "confidence").unwrap_or("");
        let acq_date = str_field(item, "acq_date").unwrap_or("");
        let acq_time = str_field(item, "acq_time").unwrap_or("");

        let effective_at = acquisition_time(acq_date, acq_time).unwrap_or_else(Utc::now);

        let mut title = "Thermal Anomaly Detected".to_string();
        if let Some(brightness) = brightness {
            title.push_str(&format!(" (Brightness: {brightness}K)"));
        }
        let location = format!("Lat: {latitude}, Lon: {longitude}");

        Some(NormalizedAlert {
            source: self.name().to_string(),
            provider_id: Some(format!(
                "{latitude_str}_{longitude_str}_{acq_date}_{acq_time}"
            )),
            title: truncate_chars(&title, 500),
            summary: Some(format!(
                "Fire or thermal anomaly detected via satellite. Confidence: {confidence}. Location: {location}"
            )),
            event_type: Some("Fire".to_string()),
            severity: Some(confidence_severity(confidence).to_string()),
            urgency: Some("Immediate".to_string()),
            area: Some(truncate_chars(&location, 500)),
            latitude: Some(latitude),
            longitude: Some(longitude),
            effective_at,
            expires_at: None,
            url: Some("https://firms.modaps.eosdis.nasa.gov/map/".to_string()),
            raw_payload: serde_json::to_string(item).ok(),
        })
    }
}
