pub mod measurement;
pub mod request;
pub mod sample;
pub mod simulation;

pub use measurement::Measurement;
pub use request::Request;
pub use sample::Sample;
pub use simulation::{ElementSimulation, Simulation};

use crate::prelude::TabId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out unique tab identifiers for open entities.
#[derive(Debug, Default)]
pub struct TabAllocator {
    next: AtomicU64,
}

impl TabAllocator {
    pub fn next(&self) -> TabId {
        TabId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
