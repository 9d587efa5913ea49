//! Entity store and processing core of the ToF-ERD workbench.
//!
//! A request directory holds samples, each with measurements and Monte-Carlo
//! simulations. The modules cover the on-disk directory store, the JSON file
//! formats, the settings cascade between request defaults and local
//! overrides, tof.in generation and cut extraction from polygon selections.

pub mod entities;
pub mod external;
pub mod math;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod serialization;
pub mod settings;
pub mod store;
pub mod telemetry;

pub use entities::{ElementSimulation, Measurement, Request, Sample, Simulation};
pub use prelude::{CancelFlag, CoreError, CoreResult, TabId};
