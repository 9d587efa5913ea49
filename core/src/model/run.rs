use crate::model::element::Element;
use serde::{Deserialize, Serialize};

/// Ion beam used in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Beam {
    pub ion: Element,
    pub energy: f64,
    pub charge: u32,
    pub energy_distribution: f64,
    pub spot_size: (f64, f64),
    pub divergence: f64,
    pub profile: String,
}

impl Default for Beam {
    fn default() -> Self {
        Self {
            ion: Element::new("Cl", Some(35), None),
            energy: 10.0,
            charge: 4,
            energy_distribution: 0.0,
            spot_size: (3.0, 5.0),
            divergence: 0.0,
            profile: "uniform".to_string(),
        }
    }
}

/// Run parameters stored in the `beam` and `run` sections of a `.measurement` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub beam: Beam,
    pub fluence: f64,
    pub current: f64,
    pub charge: f64,
    pub run_time: f64,
    pub conversion_factor: f64,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            beam: Beam::default(),
            fluence: 1.0e12,
            current: 1.07,
            charge: 0.641,
            run_time: 600.0,
            conversion_factor: 1.0,
        }
    }
}
