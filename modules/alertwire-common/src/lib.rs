pub mod config;
pub mod dedupe;
pub mod error;
pub mod geo;
pub mod time;
pub mod types;

pub use config::Config;
pub use error::AlertwireError;
pub use types::*;
