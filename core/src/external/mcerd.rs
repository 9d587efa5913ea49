use crate::model::{Beam, Detector, FoilShape, RecoilElement, SimulationMode, Target};
use crate::prelude::CoreResult;
use crate::serialization::text::format_float;
use crate::settings::ResolvedElementSimulation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings handed to the external Monte-Carlo simulation process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McerdSettings {
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
    pub beam: Beam,
    pub target: Target,
    pub detector: Detector,
    pub recoil_element: RecoilElement,
    pub sim_dir: PathBuf,
}

/// Paths of the input files referenced from the command file.
#[derive(Debug, Clone, PartialEq)]
pub struct McerdFiles {
    pub command: PathBuf,
    pub target: PathBuf,
    pub detector: PathBuf,
    pub foils: PathBuf,
    pub recoil: PathBuf,
}

impl McerdFiles {
    /// Input files named `<base>.<kind>` inside `directory`.
    pub fn in_dir(directory: &Path, base: &str) -> Self {
        let file = |ext: &str| directory.join(format!("{}.{}", base, ext));
        Self {
            command: file("mcerd_command"),
            target: file("erd_target"),
            detector: file("erd_detector"),
            foils: file("foils"),
            recoil: file("recoil"),
        }
    }
}

impl McerdSettings {
    pub fn new(
        resolved: &ResolvedElementSimulation<'_>,
        recoil_element: &RecoilElement,
        sim_dir: impl Into<PathBuf>,
    ) -> Self {
        let parameters = resolved.parameters;
        Self {
            simulation_type: parameters.simulation_type.clone(),
            number_of_ions: parameters.number_of_ions,
            number_of_ions_in_presimu: parameters.number_of_ions_in_presimu,
            number_of_scaling_ions: parameters.number_of_scaling_ions,
            number_of_recoils: parameters.number_of_recoils,
            minimum_scattering_angle: parameters.minimum_scattering_angle,
            minimum_main_scattering_angle: parameters.minimum_main_scattering_angle,
            minimum_energy_of_ions: parameters.minimum_energy_of_ions,
            simulation_mode: parameters.simulation_mode,
            seed_number: parameters.seed_number,
            beam: resolved.settings.run.beam.clone(),
            target: resolved.settings.target.clone(),
            detector: resolved.settings.detector.clone(),
            recoil_element: recoil_element.clone(),
            sim_dir: sim_dir.into(),
        }
    }

    /// Main command file read by the simulation binary.
    pub fn command_text(&self, files: &McerdFiles) -> String {
        let beam = &self.beam;
        let recoils_per_ion = if self.number_of_ions == 0 {
            0.0
        } else {
            self.number_of_recoils as f64 / self.number_of_ions as f64
        };
        let ions_per_scaling_ion = if self.number_of_scaling_ions == 0 {
            0.0
        } else {
            self.number_of_ions as f64 / self.number_of_scaling_ions as f64
        };
        let lines = [
            format!("Type of simulation: {}", self.simulation_type.to_uppercase()),
            format!("Beam ion: {}", beam.ion.label()),
            format!("Beam energy: {} MeV", format_float(beam.energy)),
            format!("Target description file: {}", files.target.display()),
            format!("Detector description file: {}", files.detector.display()),
            format!("Recoiling atom: {}", self.recoil_element.element.label()),
            format!("Recoiling material distribution: {}", files.recoil.display()),
            format!("Target angle: {} deg", format_float(self.target.target_theta)),
            format!("Beam spot size: {:.1} {:.1} mm", beam.spot_size.0, beam.spot_size.1),
            format!(
                "Minimum angle of scattering: {} deg",
                format_float(self.minimum_scattering_angle)
            ),
            format!(
                "Minimum main scattering angle: {} deg",
                format_float(self.minimum_main_scattering_angle)
            ),
            format!(
                "Minimum energy of ions: {} MeV",
                format_float(self.minimum_energy_of_ions)
            ),
            format!(
                "Average number of recoils per primary ion: {}",
                format_float(recoils_per_ion)
            ),
            format!(
                "Recoil angle width (wide or narrow): {}",
                self.simulation_mode.as_str()
            ),
            format!("Presimulation * result file: {}", self.sim_dir.join("presimu").display()),
            format!("Number of ions: {}", self.number_of_ions),
            format!("Number of ions in the presimulation: {}", self.number_of_ions_in_presimu),
            format!("Seed number of the random number generator: {}", self.seed_number),
            format!("Beam divergence: {}", format_float(beam.divergence)),
            format!("Beam profile: {}", beam.profile),
            format!("Surface topography file: {}", self.target.image_file),
            format!(
                "Side length of the surface topography image: {} {}",
                self.target.image_size.0, self.target.image_size.1
            ),
            format!(
                "Number of real ions per each scaling ion: {}",
                format_float(ions_per_scaling_ion)
            ),
        ];
        lines.join("\n") + "\n"
    }

    /// Detector description file with one block per foil.
    pub fn detector_text(&self, files: &McerdFiles) -> String {
        let detector = &self.detector;
        let timing: Vec<String> = detector
            .tof_foils
            .iter()
            .map(|index| (index + 1).to_string())
            .collect();
        let mut text = format!(
            "Detector type: {}\nDetector angle: {}\nVirtual detector size: {:.1} {:.1}\n\
             Timing detector numbers: {}\nDescription file for the detector foils: {}\n==========\n",
            detector.detector_type,
            format_float(detector.detector_theta),
            detector.virtual_size.0,
            detector.virtual_size.1,
            timing.join(" "),
            files.foils.display(),
        );
        for foil in &detector.foils {
            match foil.shape {
                FoilShape::Circular { diameter } => {
                    text.push_str("Foil type: circular\n");
                    text.push_str(&format!("Foil diameter: {}\n", format_float(diameter)));
                }
                FoilShape::Rectangular { size } => {
                    text.push_str("Foil type: rectangular\n");
                    text.push_str(&format!("Foil size: {:.1} {:.1}\n", size.0, size.1));
                }
            }
            text.push_str(&format!("Foil distance: {}\n==========\n", format_float(foil.distance)));
        }
        text
    }
}

/// Seam for running the external simulation process.
pub trait SimulationBackend {
    /// Prepares and starts a simulation, returning the path of its result file.
    fn run(&self, settings: &McerdSettings) -> CoreResult<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{resolve_element_simulation, RequestDefaults, Setting};

    fn settings() -> McerdSettings {
        let defaults = RequestDefaults::default();
        let simulation = Setting::Inherited;
        let parameters = Setting::Inherited;
        let resolved = resolve_element_simulation(&defaults, &simulation, &parameters);
        let recoil = RecoilElement::with_default_points("4He".parse().unwrap());
        McerdSettings::new(&resolved, &recoil, "/tmp/sim")
    }

    #[test]
    fn command_file_uses_expected_keys() {
        let settings = settings();
        let files = McerdFiles::in_dir(Path::new("/tmp/sim"), "4He-Default");
        let text = settings.command_text(&files);
        assert!(text.starts_with("Type of simulation: REC\nBeam ion: 35Cl\nBeam energy: 10.0 MeV\n"));
        assert!(text.contains("Recoiling atom: 4He\n"));
        assert!(text.contains("Recoil angle width (wide or narrow): narrow\n"));
        assert!(text.contains("Number of ions: 1000000\n"));
        assert!(text.contains("Seed number of the random number generator: 101\n"));
        assert!(text.contains("Number of real ions per each scaling ion: 200000.0\n"));
    }

    #[test]
    fn detector_file_lists_every_foil() {
        let settings = settings();
        let files = McerdFiles::in_dir(Path::new("/tmp/sim"), "x");
        let text = settings.detector_text(&files);
        assert!(text.contains("Timing detector numbers: 2 3\n"));
        assert_eq!(text.matches("Foil type: circular").count(), 3);
        assert_eq!(text.matches("Foil type: rectangular").count(), 1);
    }

    #[test]
    fn settings_serialize_for_the_process() {
        let json = serde_json::to_value(settings()).unwrap();
        assert_eq!(json["simulation_mode"], "narrow");
        assert_eq!(json["beam"]["ion"], "35Cl");
        assert_eq!(json["recoil_element"]["element"], "4He");
    }
}
