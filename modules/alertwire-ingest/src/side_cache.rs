//! Per-run auxiliary lookup tables supporting coordinate resolution.

use std::collections::HashMap;

use alertwire_common::geo::LocationTable;

/// Built once per pipeline run by adapters that need side lookups; empty
/// for adapters whose feeds carry native geometry.
#[derive(Debug, Clone, Default)]
pub struct SideCache {
    /// Zone/region reference → representative point (weather zones).
    pub zone_points: HashMap<String, (f64, f64)>,
    /// Named locations matched against free text (transit stations).
    pub stations: LocationTable,
}

impl SideCache {
    pub fn is_empty(&self) -> bool {
        self.zone_points.is_empty() && self.stations.is_empty()
    }
}
