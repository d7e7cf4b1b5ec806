pub mod backfill;
pub mod pipeline;
pub mod scheduler;
pub mod side_cache;
pub mod sources;
pub mod traits;

pub use scheduler::IngestScheduler;
pub use traits::{RawData, SourceAdapter};
