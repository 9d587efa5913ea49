use crate::model::{RecoilElement, SimulationParameters};
use crate::prelude::CoreResult;
use crate::serialization::json::{read_json, write_json};
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A `.simulation` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
    #[serde(default)]
    pub use_request_settings: bool,
}

impl SimulationFile {
    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    pub fn write(&mut self, path: &Path) -> CoreResult<()> {
        self.modified = Timestamp::now();
        write_json(path, self)
    }
}

/// A `.mc_simu` file holding the parameters of one element simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSimulationFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
    #[serde(flatten)]
    pub parameters: SimulationParameters,
    #[serde(default)]
    pub use_default_settings: bool,
}

impl ElementSimulationFile {
    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    pub fn write(&mut self, path: &Path) -> CoreResult<()> {
        self.modified = Timestamp::now();
        write_json(path, self)
    }
}

/// Reads a `.rec` recoil distribution file.
pub fn read_recoil(path: &Path) -> CoreResult<RecoilElement> {
    read_json(path)
}

pub fn write_recoil(path: &Path, recoil: &RecoilElement) -> CoreResult<()> {
    write_json(path, recoil)
}
