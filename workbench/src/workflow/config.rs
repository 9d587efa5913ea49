use anyhow::Context;
use erdcore::settings::{CrossSection, GlobalSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    pub request_dir: PathBuf,
    #[serde(default)]
    pub global: GlobalSettings,
    /// Event generator settings used by the `demo` command.
    #[serde(default)]
    pub demo: crate::generator::events::EventGeneratorConfig,
}

impl WorkbenchConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workbench config {}", path_ref.display()))?;
        let config: WorkbenchConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workbench config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        request_dir: PathBuf,
        cross_section: u8,
        num_iterations: u32,
    ) -> anyhow::Result<Self> {
        let cross_section = CrossSection::try_from(cross_section)
            .map_err(anyhow::Error::msg)
            .context("reading --cross-section")?;
        Ok(Self {
            request_dir,
            global: GlobalSettings {
                cross_section,
                num_iterations,
            },
            demo: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_maps_cross_section_flag() {
        let cfg = WorkbenchConfig::from_args("req".into(), 1, 5).unwrap();
        assert_eq!(cfg.global.cross_section, CrossSection::Rutherford);
        assert_eq!(cfg.global.num_iterations, 5);
        assert!(WorkbenchConfig::from_args("req".into(), 7, 3).is_err());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"request_dir: /tmp/requests/demo\nglobal:\n  cross_section: 2\ndemo:\n  events: 500\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkbenchConfig::load(&path).unwrap();
        assert_eq!(cfg.request_dir, PathBuf::from("/tmp/requests/demo"));
        assert_eq!(cfg.global.cross_section, CrossSection::LEcuyer);
        assert_eq!(cfg.global.num_iterations, 3);
        assert_eq!(cfg.demo.events, 500);
    }

    #[test]
    fn config_load_rejects_missing_request_dir() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"global:\n  num_iterations: 4\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkbenchConfig::load(&path).is_err());
    }
}
