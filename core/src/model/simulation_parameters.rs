use serde::{Deserialize, Serialize};

/// Angular width of recoils accepted by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    Narrow,
    Wide,
}

impl SimulationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulationMode::Narrow => "narrow",
            SimulationMode::Wide => "wide",
        }
    }
}

/// Run configuration of one element simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub simulation_type: String,
    pub number_of_ions: u64,
    pub number_of_ions_in_presimu: u64,
    pub number_of_scaling_ions: u64,
    pub number_of_recoils: u64,
    pub minimum_scattering_angle: f64,
    pub minimum_main_scattering_angle: f64,
    pub minimum_energy_of_ions: f64,
    pub simulation_mode: SimulationMode,
    pub seed_number: u64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            simulation_type: "rec".to_string(),
            number_of_ions: 1_000_000,
            number_of_ions_in_presimu: 100_000,
            number_of_scaling_ions: 5,
            number_of_recoils: 10,
            minimum_scattering_angle: 0.05,
            minimum_main_scattering_angle: 20.0,
            minimum_energy_of_ions: 1.0,
            simulation_mode: SimulationMode::Narrow,
            seed_number: 101,
        }
    }
}
