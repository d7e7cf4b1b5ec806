//! Coordinate backfill for rows ingested before geolocation extraction
//! covered their source. Re-derives a point from the stored raw payload;
//! rows that still resolve to nothing are left alone rather than pinned
//! to the fallback center.

use serde_json::Value;
use tracing::{info, warn};

use alertwire_common::geo::{extract_point, validate_coordinates};
use alertwire_store::AlertStore;

/// Re-derive a coordinate pair from a stored raw payload, using the same
/// per-source layout the live adapters read.
pub fn coords_from_payload(source: &str, payload: &Value) -> Option<(f64, f64)> {
    match source {
        "NWS" | "USGS_Earthquakes" => payload.get("geometry").and_then(extract_point),
        "NASA_FIRMS" => {
            let lat = payload.get("latitude")?.as_str()?.parse::<f64>().ok()?;
            let lon = payload.get("longitude")?.as_str()?.parse::<f64>().ok()?;
            validate_coordinates(lat, lon).then_some((lat, lon))
        }
        "USGS_NWIS" => {
            let loc = payload.pointer("/sourceInfo/geoLocation/geogLocation")?;
            let lat = loc.get("latitude")?.as_f64()?;
            let lon = loc.get("longitude")?.as_f64()?;
            validate_coordinates(lat, lon).then_some((lat, lon))
        }
        // WMATA payloads carry no geometry at all
        _ => None,
    }
}

/// Sweep every alert missing coordinates and attach whatever the payload
/// can still yield. Returns the number of rows updated.
pub async fn run(store: &dyn AlertStore) -> anyhow::Result<u64> {
    let candidates = store.alerts_missing_coordinates().await?;
    info!(candidates = candidates.len(), "Coordinate backfill starting");

    let mut updated: u64 = 0;
    for alert in candidates {
        let Some(raw) = alert.raw_payload.as_deref() else {
            continue;
        };
        let payload: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(alert_id = alert.id, error = %e, "Stored payload is not JSON");
                continue;
            }
        };
        if let Some((lat, lon)) = coords_from_payload(&alert.source, &payload) {
            store.set_coordinates(alert.id, lat, lon).await?;
            updated += 1;
        }
    }

    info!(updated, "Coordinate backfill complete");
    Ok(updated)
}
