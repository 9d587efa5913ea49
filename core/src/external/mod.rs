pub mod file_backend;
pub mod mcerd;

pub use file_backend::InputFileBackend;
pub use mcerd::{McerdFiles, McerdSettings, SimulationBackend};
