//! Backlog classification against the in-memory store: verifies the
//! newest-first ordering, the at-most-once invariant, and the verdicts the
//! rules tier hands a realistic mix of alerts.

use chrono::Utc;

use alertwire_classify::{rules, ClassificationEngine};
use alertwire_common::{Criticality, NormalizedAlert};
use alertwire_store::memory::MemoryStore;
use alertwire_store::AlertStore;

fn alert(provider_id: &str, severity: &str, urgency: &str, event_type: &str) -> NormalizedAlert {
    NormalizedAlert {
        source: "TEST".into(),
        provider_id: Some(provider_id.into()),
        title: format!("Alert {provider_id}"),
        summary: None,
        event_type: (!event_type.is_empty()).then(|| event_type.to_string()),
        severity: (!severity.is_empty()).then(|| severity.to_string()),
        urgency: (!urgency.is_empty()).then(|| urgency.to_string()),
        area: None,
        latitude: Some(38.8),
        longitude: Some(-77.0),
        effective_at: Utc::now(),
        expires_at: None,
        url: None,
        raw_payload: None,
    }
}

#[tokio::test]
async fn rules_tier_classifies_a_realistic_mix() {
    let store = MemoryStore::new();
    store.insert_alert("k1", &alert("flood", "Severe", "Immediate", "Flood Warning")).await.unwrap();
    store.insert_alert("k2", &alert("quake", "Minor", "Immediate", "Earthquake")).await.unwrap();
    store.insert_alert("k3", &alert("gauge", "Moderate", "Expected", "River Level")).await.unwrap();
    store.insert_alert("k4", &alert("elevator", "Minor", "", "Transit")).await.unwrap();

    let engine = ClassificationEngine::new(None, None);
    assert_eq!(engine.classify_backlog(&store, 10).await.unwrap(), 4);

    let by_provider = |pid: &str| {
        let id = store
            .alerts()
            .into_iter()
            .find(|a| a.provider_id.as_deref() == Some(pid))
            .unwrap()
            .id;
        store.classification_for(id).unwrap()
    };

    assert_eq!(by_provider("flood").criticality, Criticality::High);
    assert_eq!(by_provider("quake").criticality, Criticality::High);
    assert_eq!(by_provider("gauge").criticality, Criticality::Medium);
    assert_eq!(by_provider("elevator").criticality, Criticality::Low);

    for c in store.classifications() {
        assert_eq!(c.model_version, rules::MODEL_VERSION);
    }
}

#[tokio::test]
async fn classified_alerts_leave_the_backlog() {
    let store = MemoryStore::new();
    for n in 0..3 {
        store
            .insert_alert(&format!("key-{n}"), &alert(&format!("p{n}"), "Minor", "", ""))
            .await
            .unwrap();
    }

    let engine = ClassificationEngine::new(None, None);
    assert_eq!(engine.classify_backlog(&store, 10).await.unwrap(), 3);
    // Nothing left to classify; a second pass is a no-op
    assert_eq!(engine.classify_backlog(&store, 10).await.unwrap(), 0);
    assert_eq!(store.classification_count(), 3);
}

#[tokio::test]
async fn batch_limit_takes_the_newest_alerts_first() {
    let store = MemoryStore::new();
    for n in 0..5 {
        store
            .insert_alert(&format!("key-{n}"), &alert(&format!("p{n}"), "Minor", "", ""))
            .await
            .unwrap();
    }

    let engine = ClassificationEngine::new(None, None);
    assert_eq!(engine.classify_backlog(&store, 2).await.unwrap(), 2);

    // The two most recently inserted alerts were classified
    let classified: Vec<i64> = store.classifications().iter().map(|c| c.alert_id).collect();
    let mut ids: Vec<i64> = store.alerts().iter().map(|a| a.id).collect();
    ids.sort_unstable();
    assert!(classified.contains(ids.last().unwrap()));
    assert!(!classified.contains(ids.first().unwrap()));
}
