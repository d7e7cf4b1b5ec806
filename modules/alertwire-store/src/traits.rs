//! The persistence seam. Pipelines and the classifier talk to this trait;
//! production wires `PgAlertStore`, tests wire the in-memory store. The
//! uniqueness constraint on `natural_key` is the only concurrency guard —
//! duplicate-key conflicts are an expected outcome, not an error.

use anyhow::Result;
use async_trait::async_trait;

use alertwire_common::{Alert, NewClassification, NormalizedAlert};

/// Result of a dedup-checked insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created.
    Inserted(i64),
    /// An alert with this natural key already exists; nothing was written.
    Duplicate,
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert-if-absent keyed on `natural_key`. A duplicate is a no-op,
    /// never an overwrite.
    async fn insert_alert(
        &self,
        natural_key: &str,
        alert: &NormalizedAlert,
    ) -> Result<InsertOutcome>;

    /// Persist one classification row for an alert.
    async fn insert_classification(&self, classification: &NewClassification) -> Result<()>;

    /// Alerts with zero classification rows, newest created first.
    async fn unclassified_alerts(&self, limit: i64) -> Result<Vec<Alert>>;

    /// Alerts missing a coordinate pair (payload backfill candidates).
    async fn alerts_missing_coordinates(&self) -> Result<Vec<Alert>>;

    /// Attach a validated coordinate pair to an existing alert.
    async fn set_coordinates(&self, alert_id: i64, lat: f64, lon: f64) -> Result<()>;
}
