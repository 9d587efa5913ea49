pub mod cuts;
pub mod events;
pub mod mask_pool;
pub mod tof_in;

pub use cuts::{compute_cuts, extract, CutKey, ExtractionReport};
pub use events::{load_events, EventData};
pub use mask_pool::MaskPool;
pub use tof_in::{tof_in_text, write_if_changed, GenerationReport, GenerationStatus, TofInOptions};
