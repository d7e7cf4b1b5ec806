//! Fetch → extract → side cache → normalize → dedup-insert, one adapter at
//! a time. Every stage degrades to "nothing ingested this run" rather than
//! propagating; a broken feed never takes the cycle down with it.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use alertwire_common::dedupe::natural_key;
use alertwire_store::{AlertStore, InsertOutcome};

use crate::traits::SourceAdapter;

/// Run one adapter end to end against the store. Returns the number of new
/// alerts inserted; duplicates and per-item failures are counted out.
pub async fn run(adapter: &dyn SourceAdapter, store: &dyn AlertStore) -> u64 {
    let source = adapter.name();

    let Some(raw) = adapter.fetch().await else {
        debug!(source, "Nothing fetched");
        return 0;
    };

    let items = adapter.extract_items(&raw);
    if items.is_empty() {
        debug!(source, "No items in response");
        return 0;
    }

    let cache = adapter.build_side_cache(&items).await;

    let mut inserted: u64 = 0;
    let mut duplicates: u64 = 0;
    for item in &items {
        match ingest_item(adapter, store, item, &cache).await {
            Ok(Some(InsertOutcome::Inserted(_))) => inserted += 1,
            Ok(Some(InsertOutcome::Duplicate)) => duplicates += 1,
            Ok(None) => {}
            Err(e) => {
                // Item-level storage failure; siblings continue.
                error!(source, error = %e, "Failed to store alert");
            }
        }
    }

    info!(source, inserted, duplicates, total = items.len(), "Ingest run complete");
    inserted
}

async fn ingest_item(
    adapter: &dyn SourceAdapter,
    store: &dyn AlertStore,
    item: &Value,
    cache: &crate::side_cache::SideCache,
) -> anyhow::Result<Option<InsertOutcome>> {
    let Some(alert) = adapter.normalize_item(item, cache) else {
        warn!(source = adapter.name(), "Dropped unparseable item");
        return Ok(None);
    };

    let key = natural_key(
        &alert.source,
        alert.provider_id.as_deref(),
        Some(&alert.title),
        alert.area.as_deref(),
        Some(alert.effective_at),
    );

    let outcome = store.insert_alert(&key, &alert).await?;
    Ok(Some(outcome))
}
