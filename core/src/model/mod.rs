pub mod detector;
pub mod element;
pub mod foil;
pub mod layer;
pub mod profile;
pub mod recoil;
pub mod run;
pub mod selection;
pub mod simulation_parameters;
pub mod target;

pub use detector::Detector;
pub use element::Element;
pub use foil::{Foil, FoilShape, SolidAngleUnit};
pub use layer::Layer;
pub use profile::ProfileSettings;
pub use recoil::{RecoilElement, RecoilPoint};
pub use run::{Beam, Run};
pub use selection::{AddPoint, Selection, SelectionLabel, SelectionType, Selector};
pub use simulation_parameters::{SimulationMode, SimulationParameters};
pub use target::Target;
