use crate::model::{Beam, Run};
use crate::prelude::CoreResult;
use crate::serialization::json::{merge_sections, read_json, to_value};
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySection {
    pub detector_theta: f64,
    pub target_theta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub fluence: f64,
    pub current: f64,
    pub charge: f64,
    pub run_time: f64,
    pub conversion_factor: f64,
}

impl Default for RunSection {
    fn default() -> Self {
        RunSection::from(&Run::default())
    }
}

impl From<&Run> for RunSection {
    fn from(run: &Run) -> Self {
        Self {
            fluence: run.fluence,
            current: run.current,
            charge: run.charge,
            run_time: run.run_time,
            conversion_factor: run.conversion_factor,
        }
    }
}

/// A `.measurement` file: `general`, `geometry`, `beam` and `run` sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFile {
    pub general: GeneralSection,
    pub geometry: GeometrySection,
    #[serde(default)]
    pub beam: Beam,
    #[serde(default)]
    pub run: RunSection,
}

impl MeasurementFile {
    pub fn new(name: &str, description: &str, run: &Run, detector_theta: f64, target_theta: f64) -> Self {
        Self {
            general: GeneralSection {
                name: name.to_string(),
                description: description.to_string(),
                modified: Timestamp::now(),
            },
            geometry: GeometrySection {
                detector_theta,
                target_theta,
            },
            beam: run.beam.clone(),
            run: RunSection::from(run),
        }
    }

    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    /// Writes the four sections, keeping other sections present in an existing file.
    pub fn write(&self, path: &Path) -> CoreResult<()> {
        merge_sections(
            path,
            vec![
                ("general", to_value(path, &self.general)?),
                ("geometry", to_value(path, &self.geometry)?),
                ("beam", to_value(path, &self.beam)?),
                ("run", to_value(path, &self.run)?),
            ],
        )
    }

    pub fn to_run(&self) -> Run {
        Run {
            beam: self.beam.clone(),
            fluence: self.run.fluence,
            current: self.run.current,
            charge: self.run.charge,
            run_time: self.run.run_time,
            conversion_factor: self.run.conversion_factor,
        }
    }
}
