pub mod cascade;
pub mod global;

pub use cascade::{
    resolve_element_simulation, resolve_measurement, resolve_simulation, MeasurementSettings,
    RequestDefaults, Resolved, ResolvedElementSimulation, ResolvedMeasurement, Setting,
    SettingsSource, SimulationSettings,
};
pub use global::{CrossSection, GlobalSettings};
