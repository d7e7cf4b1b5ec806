//! Fixed-interval ingest driver. One warm-start cycle runs immediately,
//! then every `interval` thereafter; adapters within a cycle run
//! concurrently and a cycle is never skipped because the previous one
//! found errors.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use alertwire_store::AlertStore;

use crate::pipeline;
use crate::traits::SourceAdapter;

pub struct IngestScheduler {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn AlertStore>,
    interval: Duration,
}

impl IngestScheduler {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn AlertStore>,
        interval: Duration,
    ) -> Self {
        Self { adapters, store, interval }
    }

    /// Loop until `shutdown` flips true. The first cycle runs before any
    /// sleeping so a fresh deployment has data within seconds.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.adapters.is_empty() {
            warn!("No ingest adapters configured; scheduler idle");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Ingest scheduler stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One pass over every adapter, concurrently.
    pub async fn run_cycle(&self) -> u64 {
        let cycle_id = uuid::Uuid::new_v4();
        let runs = self
            .adapters
            .iter()
            .map(|adapter| pipeline::run(adapter.as_ref(), self.store.as_ref()));
        let inserted: u64 = futures::future::join_all(runs).await.into_iter().sum();
        info!(%cycle_id, inserted, sources = self.adapters.len(), "Ingest cycle complete");
        inserted
    }
}
