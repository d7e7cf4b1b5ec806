//! Tiered classification: primary chat model, then a local fallback model,
//! then the deterministic rules. Rules always answer, so every backlog
//! alert leaves the cycle classified.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use alertwire_common::{truncate_chars, Alert, AlertwireError, Criticality, NewClassification};
use alertwire_store::AlertStore;
use llm_client::util::strip_code_fences;
use llm_client::ChatCompletion;

use crate::rules;

const SYSTEM_PROMPT: &str = "You are an emergency alert triage assistant. Assess the alert and \
     respond with JSON only: {\"criticality\": \"High\"|\"Medium\"|\"Low\", \
     \"rationale\": \"one sentence\"}. No other text.";

/// Summary excerpt length in the prompt. Full text stays in the database.
const PROMPT_SUMMARY_CHARS: usize = 200;
const RATIONALE_MAX_CHARS: usize = 1000;

#[derive(Deserialize)]
struct ModelVerdict {
    criticality: String,
    #[serde(default)]
    rationale: String,
}

pub struct ClassificationEngine {
    primary: Option<Box<dyn ChatCompletion>>,
    secondary: Option<Box<dyn ChatCompletion>>,
}

impl ClassificationEngine {
    pub fn new(
        primary: Option<Box<dyn ChatCompletion>>,
        secondary: Option<Box<dyn ChatCompletion>>,
    ) -> Self {
        Self { primary, secondary }
    }

    /// Classify up to `limit` backlog alerts, newest first. Returns the
    /// number classified. Storage errors abort the cycle; tier failures
    /// never do.
    pub async fn classify_backlog(&self, store: &dyn AlertStore, limit: i64) -> Result<u64> {
        let backlog = store.unclassified_alerts(limit).await?;
        if backlog.is_empty() {
            return Ok(0);
        }
        debug!(backlog = backlog.len(), "Classifying alerts");

        let mut classified: u64 = 0;
        for alert in &backlog {
            let verdict = self.classify_alert(alert).await;
            store
                .insert_classification(&verdict)
                .await
                .with_context(|| format!("persisting classification for alert {}", alert.id))?;
            classified += 1;
        }

        info!(classified, "Classification cycle complete");
        Ok(classified)
    }

    /// Walk the tiers for one alert. Never fails: the rules tier is total.
    pub async fn classify_alert(&self, alert: &Alert) -> NewClassification {
        let prompt = build_prompt(alert);

        for tier in [&self.primary, &self.secondary].into_iter().flatten() {
            match self.ask_model(tier.as_ref(), &prompt).await {
                Ok((criticality, rationale)) => {
                    return NewClassification {
                        alert_id: alert.id,
                        criticality,
                        rationale: truncate_chars(&rationale, RATIONALE_MAX_CHARS),
                        model_version: tier.model().to_string(),
                    };
                }
                Err(e) => {
                    warn!(alert_id = alert.id, model = tier.model(), error = %e, "Tier failed");
                }
            }
        }

        let (criticality, rationale) = rules::classify(alert);
        NewClassification {
            alert_id: alert.id,
            criticality,
            rationale: rationale.to_string(),
            model_version: rules::MODEL_VERSION.to_string(),
        }
    }

    async fn ask_model(
        &self,
        model: &dyn ChatCompletion,
        prompt: &str,
    ) -> Result<(Criticality, String)> {
        let reply = model.chat_completion(SYSTEM_PROMPT, prompt).await?;
        parse_verdict(&reply)
    }
}

/// Fixed-shape prompt over the normalized fields. Absent fields render as
/// "Unknown" so the shape never varies.
fn build_prompt(alert: &Alert) -> String {
    let summary = alert
        .summary
        .as_deref()
        .map(|s| truncate_chars(s, PROMPT_SUMMARY_CHARS))
        .unwrap_or_default();
    format!(
        "Source: {}\nEvent type: {}\nSeverity: {}\nUrgency: {}\nTitle: {}\nSummary: {}\nArea: {}",
        alert.source,
        alert.event_type.as_deref().unwrap_or("Unknown"),
        alert.severity.as_deref().unwrap_or("Unknown"),
        alert.urgency.as_deref().unwrap_or("Unknown"),
        alert.title,
        summary,
        alert.area.as_deref().unwrap_or("Unknown"),
    )
}

/// A reply counts only if it is valid JSON with an exact enum spelling.
fn parse_verdict(reply: &str) -> Result<(Criticality, String)> {
    let body = strip_code_fences(reply);
    let verdict: ModelVerdict = serde_json::from_str(body).map_err(|e| {
        AlertwireError::Classification(format!("model reply was not the expected JSON shape: {e}"))
    })?;
    let Some(criticality) = Criticality::parse(&verdict.criticality) else {
        return Err(AlertwireError::Classification(format!(
            "model returned criticality outside the enum: {:?}",
            verdict.criticality
        ))
        .into());
    };
    Ok((criticality, verdict.rationale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::Utc;

    struct CannedModel {
        name: &'static str,
        reply: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl ChatCompletion for CannedModel {
        async fn chat_completion(&self, _system: &str, _user: &str) -> Result<String> {
            match self.reply {
                Ok(r) => Ok(r.to_string()),
                Err(e) => bail!("{e}"),
            }
        }

        fn model(&self) -> &str {
            self.name
        }
    }

    fn alert() -> Alert {
        Alert {
            id: 7,
            natural_key: "k".into(),
            source: "NWS".into(),
            provider_id: None,
            title: "Flood Warning issued for Alexandria".into(),
            summary: Some("The river is expected to crest this evening.".into()),
            event_type: Some("Flood Warning".into()),
            severity: Some("Severe".into()),
            urgency: Some("Immediate".into()),
            area: Some("City of Alexandria".into()),
            latitude: Some(38.8),
            longitude: Some(-77.0),
            effective_at: Utc::now(),
            expires_at: None,
            created_at: Utc::now(),
            url: None,
            raw_payload: None,
        }
    }

    #[tokio::test]
    async fn primary_verdict_is_used_when_valid() {
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel {
                name: "gpt-test",
                reply: Ok(r#"{"criticality": "High", "rationale": "Severe flood."}"#),
            })),
            Some(Box::new(CannedModel { name: "local", reply: Err("should not be called") })),
        );
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.criticality, Criticality::High);
        assert_eq!(verdict.rationale, "Severe flood.");
        assert_eq!(verdict.model_version, "gpt-test");
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted() {
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel {
                name: "gpt-test",
                reply: Ok("```json\n{\"criticality\": \"Medium\", \"rationale\": \"ok\"}\n```"),
            })),
            None,
        );
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.criticality, Criticality::Medium);
        assert_eq!(verdict.model_version, "gpt-test");
    }

    #[tokio::test]
    async fn malformed_primary_falls_to_secondary() {
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel { name: "gpt-test", reply: Ok("I think it's High!") })),
            Some(Box::new(CannedModel {
                name: "llama-test",
                reply: Ok(r#"{"criticality": "Low", "rationale": "Routine."}"#),
            })),
        );
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.criticality, Criticality::Low);
        assert_eq!(verdict.model_version, "llama-test");
    }

    #[tokio::test]
    async fn out_of_enum_criticality_is_a_tier_failure() {
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel {
                name: "gpt-test",
                reply: Ok(r#"{"criticality": "Critical", "rationale": "bad"}"#),
            })),
            None,
        );
        let verdict = engine.classify_alert(&alert()).await;
        // Fell through to rules; the alert is Severe so rules say High
        assert_eq!(verdict.criticality, Criticality::High);
        assert_eq!(verdict.model_version, rules::MODEL_VERSION);
        assert_eq!(verdict.rationale, "Severe severity level detected.");
    }

    #[tokio::test]
    async fn both_tiers_erroring_still_yields_a_verdict() {
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel { name: "gpt-test", reply: Err("timeout") })),
            Some(Box::new(CannedModel { name: "llama-test", reply: Err("connection refused") })),
        );
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.criticality, Criticality::High);
        assert_eq!(verdict.model_version, rules::MODEL_VERSION);
    }

    #[tokio::test]
    async fn no_models_configured_goes_straight_to_rules() {
        let engine = ClassificationEngine::new(None, None);
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.model_version, rules::MODEL_VERSION);
        assert_eq!(verdict.criticality, Criticality::High);
    }

    #[tokio::test]
    async fn overlong_rationale_is_truncated() {
        let long = format!(r#"{{"criticality": "Low", "rationale": "{}"}}"#, "x".repeat(1500));
        let reply: &'static str = Box::leak(long.into_boxed_str());
        let engine = ClassificationEngine::new(
            Some(Box::new(CannedModel { name: "gpt-test", reply: Ok(reply) })),
            None,
        );
        let verdict = engine.classify_alert(&alert()).await;
        assert_eq!(verdict.rationale.chars().count(), 1000);
    }

    #[test]
    fn prompt_has_fixed_shape_and_truncated_summary() {
        let mut a = alert();
        a.summary = Some("y".repeat(500));
        a.severity = None;
        let prompt = build_prompt(&a);
        assert!(prompt.contains("Severity: Unknown"));
        assert!(prompt.contains(&"y".repeat(200)));
        assert!(!prompt.contains(&"y".repeat(201)));
        assert!(prompt.starts_with("Source: NWS\n"));
    }
}
