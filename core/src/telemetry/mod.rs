pub mod log;
pub mod metrics;

pub use log::EntityLog;
pub use metrics::{Counts, OperationCounters};
