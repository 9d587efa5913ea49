pub mod cut_file;
pub mod info;
pub mod json;
pub mod measurement_file;
pub mod profile_file;
pub mod request_file;
pub mod selections_file;
pub mod simulation_file;
pub mod text;
pub mod timestamp;

pub use cut_file::{CutFile, CutPoint};
pub use info::InfoFile;
pub use json::{read_json, write_json};
pub use measurement_file::MeasurementFile;
pub use profile_file::ProfileFile;
pub use request_file::RequestFile;
pub use simulation_file::{ElementSimulationFile, SimulationFile};
pub use timestamp::Timestamp;
