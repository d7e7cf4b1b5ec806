use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-level criticality assigned by the classification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criticality {
    High,
    Medium,
    Low,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::High => "High",
            Criticality::Medium => "Medium",
            Criticality::Low => "Low",
        }
    }

    /// Parse the exact enumerated spelling. Anything else is rejected —
    /// an LLM reply outside the enum is a tier failure, not a guess.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Criticality::High),
            "Medium" => Some(Criticality::Medium),
            "Low" => Some(Criticality::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized hazard/incident observation, as produced by an adapter
/// before it is keyed and inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedAlert {
    pub source: String,
    pub provider_id: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub event_type: Option<String>,
    pub severity: Option<String>,
    pub urgency: Option<String>,
    pub area: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub effective_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub raw_payload: Option<String>,
}

/// A persisted alert row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub natural_key: String,
    pub source: String,
    pub provider_id: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub event_type: Option<String>,
    pub severity: Option<String>,
    pub urgency: Option<String>,
    pub area: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub effective_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub url: Option<String>,
    pub raw_payload: Option<String>,
}

/// A persisted classification row. Owned by its alert (cascade delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub id: i64,
    pub alert_id: i64,
    pub criticality: Criticality,
    pub rationale: Option<String>,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

/// Classification output before persistence.
#[derive(Debug, Clone)]
pub struct NewClassification {
    pub alert_id: i64,
    pub criticality: Criticality,
    pub rationale: String,
    pub model_version: String,
}

/// Truncate a string to at most `max` characters on a char boundary.
/// Feed fields are free text and regularly overflow the column widths.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criticality_round_trips_exact_spellings() {
        for c in [Criticality::High, Criticality::Medium, Criticality::Low] {
            assert_eq!(Criticality::parse(c.as_str()), Some(c));
        }
        assert_eq!(Criticality::parse("high"), None);
        assert_eq!(Criticality::parse("HIGH"), None);
        assert_eq!(Criticality::parse("Critical"), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte chars must not be split
        assert_eq!(truncate_chars("日本語テスト", 3), "日本語");
    }
}
