use crate::prelude::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory structure of a measurement:
/// `Data`, `Data/Cuts`, `Composition_changes/Changes`, `Depth_profiles`,
/// `Energy_spectra`, `tof_in` and `Detector/Efficiency_files`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementLayout {
    root: PathBuf,
}

impl MeasurementLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("Data")
    }

    /// `Data/<measurement>.selections`.
    pub fn selections_file(&self, measurement_name: &str) -> PathBuf {
        self.data_dir().join(format!("{}.selections", measurement_name))
    }

    pub fn cuts_dir(&self) -> PathBuf {
        self.data_dir().join("Cuts")
    }

    pub fn composition_changes_dir(&self) -> PathBuf {
        self.root.join("Composition_changes")
    }

    pub fn changes_dir(&self) -> PathBuf {
        self.composition_changes_dir().join("Changes")
    }

    pub fn depth_profiles_dir(&self) -> PathBuf {
        self.root.join("Depth_profiles")
    }

    pub fn energy_spectra_dir(&self) -> PathBuf {
        self.root.join("Energy_spectra")
    }

    pub fn tof_in_dir(&self) -> PathBuf {
        self.root.join("tof_in")
    }

    pub fn detector_dir(&self) -> PathBuf {
        self.root.join("Detector")
    }

    pub fn efficiency_dir(&self) -> PathBuf {
        self.detector_dir().join("Efficiency_files")
    }

    pub fn create_all(&self) -> CoreResult<()> {
        for dir in [
            self.data_dir(),
            self.cuts_dir(),
            self.composition_changes_dir(),
            self.changes_dir(),
            self.depth_profiles_dir(),
            self.energy_spectra_dir(),
            self.tof_in_dir(),
            self.efficiency_dir(),
        ] {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

/// Directory structure of a simulation: its own `Detector` directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationLayout {
    root: PathBuf,
}

impl SimulationLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn detector_dir(&self) -> PathBuf {
        self.root.join("Detector")
    }

    pub fn create_all(&self) -> CoreResult<()> {
        create_dir(&self.root)?;
        create_dir(&self.detector_dir())
    }
}

pub(crate) fn create_dir(dir: &Path) -> CoreResult<()> {
    fs::create_dir_all(dir).map_err(|err| CoreError::io(dir, err))
}
