//! Geolocation extraction — pure functions turning heterogeneous geometry
//! representations into a validated (lat, lon) point. No I/O here.

use std::collections::HashMap;

use serde_json::Value;

/// Reject coordinates outside the valid ranges. Never clamp — a bad pair
/// is treated as absent.
pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Extract a representative (latitude, longitude) point from a GeoJSON
/// geometry value.
///
/// - `Point`: coordinates are (lon, lat) order, swapped on return.
/// - `Polygon`: arithmetic centroid of the outer ring's valid vertices,
///   falling back to the first valid vertex when averaging finds none.
/// - `MultiPolygon`: resolves to its first polygon.
/// - A bare `[lon, lat]` array is accepted directly.
/// - A string is parsed as JSON first.
pub fn extract_point(geometry: &Value) -> Option<(f64, f64)> {
    match geometry {
        Value::Null => None,
        Value::String(s) => {
            let parsed: Value = serde_json::from_str(s).ok()?;
            extract_point(&parsed)
        }
        Value::Array(_) => lon_lat_pair(geometry),
        Value::Object(obj) => {
            let geom_type = obj.get("type").and_then(Value::as_str)?.to_lowercase();
            let coords = obj.get("coordinates")?;
            match geom_type.as_str() {
                "point" => lon_lat_pair(coords),
                "polygon" => polygon_point(coords),
                "multipolygon" => polygon_point(coords.as_array()?.first()?),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Representative point of a polygon: centroid of the outer ring's valid
/// vertices, else the first valid vertex, else absent.
fn polygon_point(coords: &Value) -> Option<(f64, f64)> {
    let outer_ring = coords.as_array()?.first()?.as_array()?;

    let valid: Vec<(f64, f64)> = outer_ring.iter().filter_map(lon_lat_pair_raw).collect();
    if valid.is_empty() {
        return None;
    }

    let count = valid.len() as f64;
    let (sum_lat, sum_lon) = valid
        .iter()
        .fold((0.0, 0.0), |(la, lo), (lat, lon)| (la + lat, lo + lon));
    let centroid = (sum_lat / count, sum_lon / count);

    if validate_coordinates(centroid.0, centroid.1) {
        Some(centroid)
    } else {
        // Averaging valid vertices stays in range, but keep the gate anyway
        valid.into_iter().next()
    }
}

/// Parse a `[lon, lat, ...]` array into a validated (lat, lon) pair.
fn lon_lat_pair(value: &Value) -> Option<(f64, f64)> {
    lon_lat_pair_raw(value)
}

fn lon_lat_pair_raw(value: &Value) -> Option<(f64, f64)> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    let lon = arr[0].as_f64()?;
    let lat = arr[1].as_f64()?;
    if validate_coordinates(lat, lon) {
        Some((lat, lon))
    } else {
        None
    }
}

/// Precomputed name → coordinate table for feeds without native geometry
/// (e.g. transit station names referenced in incident narratives).
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    entries: HashMap<String, (f64, f64)>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, lat: f64, lon: f64) {
        if validate_coordinates(lat, lon) {
            self.entries.insert(normalize_name(name), (lat, lon));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Scan free text for any known location name. Used on narrative
    /// fields where the location is buried mid-sentence.
    pub fn find_in_text(&self, text: &str) -> Option<(f64, f64)> {
        let haystack = normalize_name(text);
        if haystack.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(name, _)| haystack.contains(name.as_str()))
            .map(|(_, &point)| point)
    }
}

/// Case-fold, trim, and strip trailing possessive markers so that
/// "Braddock Road's" matches the "braddock road" table entry.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    lowered
        .strip_suffix("'s")
        .or_else(|| lowered.strip_suffix("\u{2019}s"))
        .unwrap_or(&lowered)
        .to_string()
}
