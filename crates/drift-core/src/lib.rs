pub mod error;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod store;
pub mod threshold;
pub mod tracker;

pub use error::{DriftError, Result};
pub use orchestrator::Orchestrator;
pub use record::Outcome;
pub use report::Report;
