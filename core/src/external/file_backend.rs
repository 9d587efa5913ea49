use crate::external::mcerd::{McerdFiles, McerdSettings, SimulationBackend};
use crate::prelude::{CoreError, CoreResult};
use crate::serialization::json::write_json;
use crate::telemetry::EntityLog;
use std::fs;
use std::path::PathBuf;

/// Backend that only writes the simulation input files into `sim_dir`,
/// leaving the actual process launch to the caller.
#[derive(Debug, Clone, Default)]
pub struct InputFileBackend;

impl InputFileBackend {
    pub fn write_inputs(&self, settings: &McerdSettings) -> CoreResult<McerdFiles> {
        let base = format!(
            "{}-{}",
            settings.recoil_element.element.label(),
            settings.recoil_element.name
        );
        let files = McerdFiles::in_dir(&settings.sim_dir, &base);
        fs::create_dir_all(&settings.sim_dir).map_err(|err| CoreError::io(&settings.sim_dir, err))?;
        fs::write(&files.command, settings.command_text(&files))
            .map_err(|err| CoreError::io(&files.command, err))?;
        fs::write(&files.detector, settings.detector_text(&files))
            .map_err(|err| CoreError::io(&files.detector, err))?;
        settings.recoil_element.write_recoil_file(&files.recoil)?;
        write_json(&settings.sim_dir.join(format!("{}.mcerd.json", base)), settings)?;
        EntityLog::new(settings.recoil_element.element.label())
            .info(&format!("Wrote simulation inputs to {}", settings.sim_dir.display()));
        Ok(files)
    }
}

impl SimulationBackend for InputFileBackend {
    fn run(&self, settings: &McerdSettings) -> CoreResult<PathBuf> {
        let files = self.write_inputs(settings)?;
        Ok(files.command.with_extension("erd"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecoilElement;
    use crate::settings::{resolve_element_simulation, RequestDefaults, Setting};
    use tempfile::TempDir;

    #[test]
    fn writes_command_detector_and_recoil_files() {
        let dir = TempDir::new().unwrap();
        let defaults = RequestDefaults::default();
        let (simulation, parameters) = (Setting::Inherited, Setting::Inherited);
        let resolved = resolve_element_simulation(&defaults, &simulation, &parameters);
        let recoil = RecoilElement::with_default_points("4He".parse().unwrap());
        let settings = McerdSettings::new(&resolved, &recoil, dir.path());

        let result = InputFileBackend.run(&settings).unwrap();
        assert!(result.ends_with("4He-Default.erd"));
        let files = McerdFiles::in_dir(dir.path(), "4He-Default");
        assert!(files.command.is_file());
        assert!(files.detector.is_file());
        assert!(fs::read_to_string(&files.recoil)
            .unwrap()
            .starts_with("0.00 0.000001\n"));
    }
}
