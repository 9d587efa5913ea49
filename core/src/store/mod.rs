pub mod directory;
pub mod entity_id;
pub mod files;
pub mod layout;

pub use directory::{allocate, rename_directory, scan, Scan, ScannedEntry, SerialCounter};
pub use entity_id::{EntityId, EntityKind};
pub use layout::{MeasurementLayout, SimulationLayout};
