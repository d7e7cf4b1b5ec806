//! Postgres-backed alert store.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use alertwire_common::{Alert, AlertwireError, Criticality, NewClassification, NormalizedAlert};

use crate::traits::{AlertStore, InsertOutcome};

#[derive(Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run schema migrations. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AlertwireError::Database(e.to_string()))?;
        Ok(())
    }
}

const ALERT_COLUMNS: &str = "id, natural_key, source, provider_id, title, summary, event_type, \
     severity, urgency, area, latitude, longitude, effective_at, expires_at, created_at, url, raw_payload";

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn insert_alert(
        &self,
        natural_key: &str,
        alert: &NormalizedAlert,
    ) -> Result<InsertOutcome> {
        // ON CONFLICT DO NOTHING makes the duplicate path conflict-free:
        // concurrent inserts of the same key race benignly and exactly one wins.
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO alerts (
                natural_key, source, provider_id, title, summary, event_type,
                severity, urgency, area, latitude, longitude,
                effective_at, expires_at, url, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (natural_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(natural_key)
        .bind(&alert.source)
        .bind(&alert.provider_id)
        .bind(&alert.title)
        .bind(&alert.summary)
        .bind(&alert.event_type)
        .bind(&alert.severity)
        .bind(&alert.urgency)
        .bind(&alert.area)
        .bind(alert.latitude)
        .bind(alert.longitude)
        .bind(alert.effective_at)
        .bind(alert.expires_at)
        .bind(&alert.url)
        .bind(&alert.raw_payload)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AlertwireError::Database(e.to_string()))?;

        match row {
            Some((id,)) => Ok(InsertOutcome::Inserted(id)),
            None => {
                debug!(natural_key, source = %alert.source, "Duplicate alert ignored");
                Ok(InsertOutcome::Duplicate)
            }
        }
    }

    async fn insert_classification(&self, classification: &NewClassification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO classifications (alert_id, criticality, rationale, model_version)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(classification.alert_id)
        .bind(classification.criticality.as_str())
        .bind(&classification.rationale)
        .bind(&classification.model_version)
        .execute(&self.pool)
        .await
        .map_err(|e| AlertwireError::Database(e.to_string()))?;
        Ok(())
    }

    async fn unclassified_alerts(&self, limit: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts a
            WHERE NOT EXISTS (
                SELECT 1 FROM classifications c WHERE c.alert_id = a.id
            )
            ORDER BY a.created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AlertwireError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(AlertRow::into_alert).collect())
    }

    async fn alerts_missing_coordinates(&self) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts a
            WHERE a.latitude IS NULL OR a.longitude IS NULL
            ORDER BY a.id ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AlertwireError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(AlertRow::into_alert).collect())
    }

    async fn set_coordinates(&self, alert_id: i64, lat: f64, lon: f64) -> Result<()> {
        sqlx::query("UPDATE alerts SET latitude = $2, longitude = $3 WHERE id = $1")
            .bind(alert_id)
            .bind(lat)
            .bind(lon)
            .execute(&self.pool)
            .await
            .map_err(|e| AlertwireError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Read the latest classification per alert for a set of alert ids.
/// "Latest" is max(created_at).
///
/// Nothing in the daemon calls this; it is the read seam a query/API
/// layer over this database builds on, kept alongside the `user_actions`
/// table for the same reason.
pub async fn latest_classifications(
    pool: &PgPool,
    alert_ids: &[i64],
) -> Result<Vec<alertwire_common::Classification>> {
    let rows = sqlx::query_as::<_, ClassificationRow>(
        r#"
        SELECT DISTINCT ON (alert_id)
            id, alert_id, criticality, rationale, model_version, created_at
        FROM classifications
        WHERE alert_id = ANY($1)
        ORDER BY alert_id, created_at DESC
        "#,
    )
    .bind(alert_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| AlertwireError::Database(e.to_string()))?;

    rows.into_iter().map(ClassificationRow::into_common).collect()
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    natural_key: String,
    source: String,
    provider_id: Option<String>,
    title: String,
    summary: Option<String>,
    event_type: Option<String>,
    severity: Option<String>,
    urgency: Option<String>,
    area: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    effective_at: chrono::DateTime<chrono::Utc>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    url: Option<String>,
    raw_payload: Option<String>,
}

impl AlertRow {
    fn into_alert(self) -> Alert {
        Alert {
            id: self.id,
            natural_key: self.natural_key,
            source: self.source,
            provider_id: self.provider_id,
            title: self.title,
            summary: self.summary,
            event_type: self.event_type,
            severity: self.severity,
            urgency: self.urgency,
            area: self.area,
            latitude: self.latitude,
            longitude: self.longitude,
            effective_at: self.effective_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            url: self.url,
            raw_payload: self.raw_payload,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClassificationRow {
    id: i64,
    alert_id: i64,
    criticality: String,
    rationale: Option<String>,
    model_version: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ClassificationRow {
    fn into_common(self) -> Result<alertwire_common::Classification> {
        let criticality = Criticality::parse(&self.criticality).ok_or_else(|| {
            AlertwireError::Database(format!("unknown criticality in row: {}", self.criticality))
        })?;
        Ok(alertwire_common::Classification {
            id: self.id,
            alert_id: self.alert_id,
            criticality,
            rationale: self.rationale,
            model_version: self.model_version,
            created_at: self.created_at,
        })
    }
}
