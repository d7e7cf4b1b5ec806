//! The adapter contract every feed variant implements. The pipeline drives
//! one adapter end to end; the daemon builds the variant table.

use async_trait::async_trait;
use serde_json::Value;

use alertwire_common::NormalizedAlert;

use crate::side_cache::SideCache;

/// Raw response body from a feed, before item extraction.
#[derive(Debug, Clone)]
pub enum RawData {
    Json(Value),
    Text(String),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable adapter name; becomes the `source` column and half of the
    /// natural key, so renaming it re-ingests history.
    fn name(&self) -> &'static str;

    /// One bounded-timeout network call. Absent on any transport/HTTP
    /// failure or when a required credential is not configured — a
    /// configuration gap is not a fault.
    async fn fetch(&self) -> Option<RawData>;

    /// Pure parsing of the response envelope into candidate items.
    /// Malformed envelopes yield an empty sequence, not an error.
    fn extract_items(&self, raw: &RawData) -> Vec<Value>;

    /// Auxiliary lookups fetched once per run, before per-item
    /// normalization. Default: nothing to build.
    async fn build_side_cache(&self, _items: &[Value]) -> SideCache {
        SideCache::default()
    }

    /// Map one raw item onto the common alert vocabulary. Absent drops
    /// this item only; siblings continue.
    fn normalize_item(&self, item: &Value, cache: &SideCache) -> Option<NormalizedAlert>;
}
