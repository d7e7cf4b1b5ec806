//! Long-lived classification worker: drain up to a batch from the backlog,
//! sleep the poll interval, repeat. Cycle errors are logged and swallowed;
//! an unreachable database this cycle is retried next cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use alertwire_store::AlertStore;

use crate::engine::ClassificationEngine;

pub struct ClassifyWorker {
    engine: ClassificationEngine,
    store: Arc<dyn AlertStore>,
    poll_interval: Duration,
    batch_limit: i64,
}

impl ClassifyWorker {
    pub fn new(
        engine: ClassificationEngine,
        store: Arc<dyn AlertStore>,
        poll_interval: Duration,
        batch_limit: i64,
    ) -> Self {
        Self { engine, store, poll_interval, batch_limit }
    }

    /// Loop until `shutdown` flips true. An in-flight cycle at shutdown
    /// gets `grace` to finish before being abandoned.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>, grace: Duration) {
        loop {
            let cycle = self.run_cycle();
            tokio::pin!(cycle);

            tokio::select! {
                _ = &mut cycle => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        // Let the current batch land rather than dropping
                        // half-written work on the floor.
                        if tokio::time::timeout(grace, &mut cycle).await.is_err() {
                            error!("Classification cycle exceeded shutdown grace period");
                        }
                        info!("Classification worker stopping");
                        return;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Classification worker stopping");
                        return;
                    }
                }
            }
        }
    }

    async fn run_cycle(&self) {
        if let Err(e) = self
            .engine
            .classify_backlog(self.store.as_ref(), self.batch_limit)
            .await
        {
            error!(error = %e, "Classification cycle failed");
        }
    }
}
