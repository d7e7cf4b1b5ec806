//! End-to-end ingest flow against the in-memory store: canned feed
//! payloads go through extract, side cache, normalization, keying, and
//! dedup-insert exactly as a live cycle would, minus the network.

use async_trait::async_trait;
use serde_json::{json, Value};

use alertwire_ingest::sources::{QuakeAdapter, TransitAdapter, WeatherAdapter};
use alertwire_ingest::{pipeline, RawData, SourceAdapter};
use alertwire_store::memory::MemoryStore;

const CENTER: (f64, f64) = (38.8048, -77.0469);

/// Wraps a real adapter, replacing its network fetch with a canned body.
/// Extraction and normalization stay the adapter's own.
struct Canned<A> {
    inner: A,
    body: Value,
}

#[async_trait]
impl<A: SourceAdapter> SourceAdapter for Canned<A> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch(&self) -> Option<RawData> {
        Some(RawData::Json(self.body.clone()))
    }

    fn extract_items(&self, raw: &RawData) -> Vec<Value> {
        self.inner.extract_items(raw)
    }

    fn normalize_item(
        &self,
        item: &Value,
        cache: &alertwire_ingest::side_cache::SideCache,
    ) -> Option<alertwire_common::NormalizedAlert> {
        self.inner.normalize_item(item, cache)
    }
}

fn nws_body() -> Value {
    json!({
        "features": [
            {
                "geometry": {"type": "Point", "coordinates": [-77.05, 38.81]},
                "properties": {
                    "id": "urn:oid:2.49.0.1.840.0.flood",
                    "headline": "Flood Warning issued for Alexandria",
                    "event": "Flood Warning",
                    "severity": "Severe",
                    "urgency": "Immediate",
                    "areaDesc": "City of Alexandria",
                    "effective": "2024-03-15T10:00:00-04:00",
                    "expires": "2024-03-15T22:00:00-04:00"
                }
            },
            {
                "geometry": null,
                "properties": {
                    "id": "urn:oid:2.49.0.1.840.0.wind",
                    "event": "Wind Advisory",
                    "severity": "Minor",
                    "urgency": "Expected",
                    "areaDesc": "City of Alexandria",
                    "effective": "2024-03-15T08:00:00-04:00"
                }
            }
        ]
    })
}

fn quake_body() -> Value {
    json!({
        "features": [{
            "id": "us7000test",
            "geometry": {"type": "Point", "coordinates": [-77.10, 38.90, 10.0]},
            "properties": {
                "mag": 4.7,
                "place": "near Springfield, VA",
                "time": 1_710_500_400_000i64,
                "url": "https://earthquake.usgs.gov/earthquakes/eventpage/us7000test"
            }
        }]
    })
}

fn wmata_body() -> Value {
    json!({
        "Incidents": [{
            "IncidentID": "INC-1",
            "IncidentType": "Alert",
            "Description": "Trains single tracking between King Street and Braddock Road",
            "LinesAffected": "BL; YL;"
        }]
    })
}

#[tokio::test]
async fn mixed_sources_land_in_one_store() {
    let store = MemoryStore::new();

    let weather = Canned { inner: WeatherAdapter::new(CENTER, false), body: nws_body() };
    let quakes = Canned { inner: QuakeAdapter::new(CENTER, 10, false), body: quake_body() };
    let transit = Canned {
        inner: TransitAdapter::new(Some("k".into()), CENTER),
        body: wmata_body(),
    };

    assert_eq!(pipeline::run(&weather, &store).await, 2);
    assert_eq!(pipeline::run(&quakes, &store).await, 1);
    assert_eq!(pipeline::run(&transit, &store).await, 1);
    assert_eq!(store.alert_count(), 4);

    let backlog = store.alerts();
    assert!(backlog.iter().any(|a| a.source == "NWS" && a.severity.as_deref() == Some("Severe")));
    assert!(backlog.iter().any(|a| a.source == "USGS_Earthquakes"));
    assert!(backlog.iter().any(|a| a.source == "WMATA"));
    // Every row got coordinates, native or fallback
    assert!(backlog.iter().all(|a| a.latitude.is_some() && a.longitude.is_some()));
}

#[tokio::test]
async fn refetching_the_same_feed_inserts_nothing_new() {
    let store = MemoryStore::new();
    let weather = Canned { inner: WeatherAdapter::new(CENTER, false), body: nws_body() };

    assert_eq!(pipeline::run(&weather, &store).await, 2);
    assert_eq!(pipeline::run(&weather, &store).await, 0);
    assert_eq!(pipeline::run(&weather, &store).await, 0);
    assert_eq!(store.alert_count(), 2);
}

#[tokio::test]
async fn new_incidents_in_a_later_fetch_are_picked_up() {
    let store = MemoryStore::new();
    let first = Canned {
        inner: TransitAdapter::new(Some("k".into()), CENTER),
        body: wmata_body(),
    };
    assert_eq!(pipeline::run(&first, &store).await, 1);

    let mut body = wmata_body();
    body["Incidents"].as_array_mut().unwrap().push(json!({
        "IncidentID": "INC-2",
        "IncidentType": "Delay",
        "Description": "Residual delays on the Yellow Line",
        "LinesAffected": "YL;"
    }));
    let second = Canned { inner: TransitAdapter::new(Some("k".into()), CENTER), body };

    assert_eq!(pipeline::run(&second, &store).await, 1);
    assert_eq!(store.alert_count(), 2);
}
