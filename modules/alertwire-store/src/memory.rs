//! In-memory store for deterministic tests: no network, no database, no
//! Docker. Mirrors the Postgres semantics exactly — unique natural key,
//! newest-first backlog, at-most-once visibility through the backlog query.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use alertwire_common::{Alert, Classification, Criticality, NewClassification, NormalizedAlert};

use crate::traits::{AlertStore, InsertOutcome};

#[derive(Default)]
struct Inner {
    alerts: Vec<Alert>,
    classifications: Vec<Classification>,
    keys: HashSet<String>,
    next_alert_id: i64,
    next_classification_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert_count(&self) -> usize {
        self.inner.lock().unwrap().alerts.len()
    }

    pub fn classification_count(&self) -> usize {
        self.inner.lock().unwrap().classifications.len()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().alerts.clone()
    }

    pub fn classifications(&self) -> Vec<Classification> {
        self.inner.lock().unwrap().classifications.clone()
    }

    pub fn classification_for(&self, alert_id: i64) -> Option<Classification> {
        self.inner
            .lock()
            .unwrap()
            .classifications
            .iter()
            .filter(|c| c.alert_id == alert_id)
            .max_by_key(|c| c.created_at)
            .cloned()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(
        &self,
        natural_key: &str,
        alert: &NormalizedAlert,
    ) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.keys.insert(natural_key.to_string()) {
            return Ok(InsertOutcome::Duplicate);
        }
        inner.next_alert_id += 1;
        let id = inner.next_alert_id;
        inner.alerts.push(Alert {
            id,
            natural_key: natural_key.to_string(),
            source: alert.source.clone(),
            provider_id: alert.provider_id.clone(),
            title: alert.title.clone(),
            summary: alert.summary.clone(),
            event_type: alert.event_type.clone(),
            severity: alert.severity.clone(),
            urgency: alert.urgency.clone(),
            area: alert.area.clone(),
            latitude: alert.latitude,
            longitude: alert.longitude,
            effective_at: alert.effective_at,
            expires_at: alert.expires_at,
            created_at: Utc::now(),
            url: alert.url.clone(),
            raw_payload: alert.raw_payload.clone(),
        });
        Ok(InsertOutcome::Inserted(id))
    }

    async fn insert_classification(&self, classification: &NewClassification) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_classification_id += 1;
        let id = inner.next_classification_id;
        inner.classifications.push(Classification {
            id,
            alert_id: classification.alert_id,
            criticality: classification.criticality,
            rationale: Some(classification.rationale.clone()),
            model_version: classification.model_version.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn unclassified_alerts(&self, limit: i64) -> Result<Vec<Alert>> {
        let inner = self.inner.lock().unwrap();
        let classified: HashSet<i64> =
            inner.classifications.iter().map(|c| c.alert_id).collect();
        let mut backlog: Vec<Alert> = inner
            .alerts
            .iter()
            .filter(|a| !classified.contains(&a.id))
            .cloned()
            .collect();
        // Insertion order ties on created_at; id is the tiebreaker
        backlog.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        backlog.truncate(limit.max(0) as usize);
        Ok(backlog)
    }

    async fn alerts_missing_coordinates(&self) -> Result<Vec<Alert>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.latitude.is_none() || a.longitude.is_none())
            .cloned()
            .collect())
    }

    async fn set_coordinates(&self, alert_id: i64, lat: f64, lon: f64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(alert) = inner.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.latitude = Some(lat);
            alert.longitude = Some(lon);
        }
        Ok(())
    }
}

/// Convenience for tests that need a classified alert in place.
pub fn classify_directly(store: &MemoryStore, alert_id: i64, criticality: Criticality) {
    let mut inner = store.inner.lock().unwrap();
    inner.next_classification_id += 1;
    let id = inner.next_classification_id;
    inner.classifications.push(Classification {
        id,
        alert_id,
        criticality,
        rationale: None,
        model_version: "test".to_string(),
        created_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn normalized(title: &str) -> NormalizedAlert {
        NormalizedAlert {
            source: "TEST".to_string(),
            provider_id: None,
            title: title.to_string(),
            summary: None,
            event_type: None,
            severity: None,
            urgency: None,
            area: None,
            latitude: None,
            longitude: None,
            effective_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
            expires_at: None,
            url: None,
            raw_payload: None,
        }
    }

    #[tokio::test]
    async fn duplicate_key_is_a_no_op() {
        let store = MemoryStore::new();
        let a = store.insert_alert("key-1", &normalized("first")).await.unwrap();
        let b = store.insert_alert("key-1", &normalized("second")).await.unwrap();
        assert!(matches!(a, InsertOutcome::Inserted(_)));
        assert_eq!(b, InsertOutcome::Duplicate);
        assert_eq!(store.alert_count(), 1);
        // Never an overwrite
        assert_eq!(store.alerts()[0].title, "first");
    }

    #[tokio::test]
    async fn backlog_excludes_classified_alerts() {
        let store = MemoryStore::new();
        store.insert_alert("k1", &normalized("a")).await.unwrap();
        store.insert_alert("k2", &normalized("b")).await.unwrap();

        let backlog = store.unclassified_alerts(10).await.unwrap();
        assert_eq!(backlog.len(), 2);

        classify_directly(&store, backlog[0].id, Criticality::Low);
        let backlog = store.unclassified_alerts(10).await.unwrap();
        assert_eq!(backlog.len(), 1);
    }

    #[tokio::test]
    async fn backlog_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_alert(&format!("k{i}"), &normalized(&format!("t{i}")))
                .await
                .unwrap();
        }
        let backlog = store.unclassified_alerts(3).await.unwrap();
        assert_eq!(backlog.len(), 3);
        assert!(backlog[0].id > backlog[1].id);
        assert!(backlog[1].id > backlog[2].id);
    }
}
