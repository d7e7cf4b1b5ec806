//! Deterministic rules tier. Always produces a verdict; the check order
//! is load-bearing and changing it reclassifies history.

use alertwire_common::{Alert, Criticality};

pub const MODEL_VERSION: &str = "rules-fallback";

/// Ordered keyword rules over the normalized severity/urgency/event_type
/// fields. First match wins.
pub fn classify(alert: &Alert) -> (Criticality, &'static str) {
    let severity = lower(&alert.severity);
    let urgency = lower(&alert.urgency);
    let event_type = lower(&alert.event_type);

    if severity.contains("extreme") || severity.contains("severe") {
        return (Criticality::High, "Severe severity level detected.");
    }
    if urgency.contains("immediate") || urgency.contains("warning") {
        return (Criticality::High, "Immediate urgency detected.");
    }
    // A moderate quake already failed the severity checks above; keep it
    // out of High.
    if event_type.contains("earthquake") && !severity.contains("moderate") {
        return (Criticality::High, "Earthquake event detected.");
    }
    if severity.contains("moderate") || severity.contains("advisory") {
        return (Criticality::Medium, "Moderate severity.");
    }
    if urgency.contains("expected") || urgency.contains("watch") || urgency.contains("moderate") {
        return (Criticality::Medium, "Expected urgency level.");
    }
    (Criticality::Low, "Low risk - monitoring only.")
}

fn lower(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alert(severity: &str, urgency: &str, event_type: &str) -> Alert {
        Alert {
            id: 1,
            natural_key: "k".into(),
            source: "NWS".into(),
            provider_id: None,
            title: "t".into(),
            summary: None,
            event_type: (!event_type.is_empty()).then(|| event_type.to_string()),
            severity: (!severity.is_empty()).then(|| severity.to_string()),
            urgency: (!urgency.is_empty()).then(|| urgency.to_string()),
            area: None,
            latitude: None,
            longitude: None,
            effective_at: Utc::now(),
            expires_at: None,
            created_at: Utc::now(),
            url: None,
            raw_payload: None,
        }
    }

    #[test]
    fn severe_and_extreme_severity_are_high() {
        let (c, r) = classify(&alert("Severe", "", ""));
        assert_eq!(c, Criticality::High);
        assert_eq!(r, "Severe severity level detected.");
        let (c, _) = classify(&alert("Extreme", "", ""));
        assert_eq!(c, Criticality::High);
    }

    #[test]
    fn immediate_urgency_is_high() {
        let (c, r) = classify(&alert("Minor", "Immediate", ""));
        assert_eq!(c, Criticality::High);
        assert_eq!(r, "Immediate urgency detected.");
    }

    #[test]
    fn earthquake_without_moderate_severity_is_high() {
        let (c, r) = classify(&alert("Minor", "", "Earthquake"));
        assert_eq!(c, Criticality::High);
        assert_eq!(r, "Earthquake event detected.");
    }

    #[test]
    fn moderate_earthquake_is_medium_not_high() {
        // Magnitude 4.5-6.0 quakes arrive with Moderate severity
        let (c, r) = classify(&alert("Moderate", "", "Earthquake"));
        assert_eq!(c, Criticality::Medium);
        assert_eq!(r, "Moderate severity.");
    }

    #[test]
    fn severity_outranks_urgency() {
        let (c, r) = classify(&alert("Severe", "Expected", ""));
        assert_eq!(c, Criticality::High);
        assert_eq!(r, "Severe severity level detected.");
    }

    #[test]
    fn advisory_severity_is_medium() {
        let (c, _) = classify(&alert("Advisory", "", ""));
        assert_eq!(c, Criticality::Medium);
    }

    #[test]
    fn expected_and_watch_urgency_are_medium() {
        let (c, r) = classify(&alert("", "Expected", ""));
        assert_eq!(c, Criticality::Medium);
        assert_eq!(r, "Expected urgency level.");
        let (c, _) = classify(&alert("Minor", "Watch", ""));
        assert_eq!(c, Criticality::Medium);
    }

    #[test]
    fn everything_else_is_low() {
        let (c, r) = classify(&alert("", "", ""));
        assert_eq!(c, Criticality::Low);
        assert_eq!(r, "Low risk - monitoring only.");
        let (c, _) = classify(&alert("Minor", "Unknown", "River Level"));
        assert_eq!(c, Criticality::Low);
    }
}
