pub mod engine;
pub mod rules;
pub mod worker;

pub use engine::ClassificationEngine;
pub use worker::ClassifyWorker;
