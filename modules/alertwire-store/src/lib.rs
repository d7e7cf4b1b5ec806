pub mod pg;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use pg::PgAlertStore;
pub use traits::{AlertStore, InsertOutcome};
