use crate::model::ProfileSettings;
use crate::prelude::CoreResult;
use crate::serialization::json::{python_bool, read_json, write_json};
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileGeneral {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    modified: Timestamp,
    #[serde(with = "python_bool")]
    use_default_settings: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DepthProfiles {
    reference_density: f64,
    number_of_depth_steps: u32,
    depth_step_for_stopping: u32,
    depth_step_for_output: u32,
    depth_for_concentration_from: f64,
    depth_for_concentration_to: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnergySpectra {
    channel_width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompositionChanges {
    #[serde(default)]
    reference_cut: String,
    number_of_splits: u32,
    normalization: String,
}

/// A `.profile` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    general: ProfileGeneral,
    depth_profiles: DepthProfiles,
    energy_spectra: EnergySpectra,
    composition_changes: CompositionChanges,
}

impl ProfileFile {
    pub fn new(profile: &ProfileSettings, use_default_settings: bool) -> Self {
        Self {
            general: ProfileGeneral {
                name: profile.profile_name.clone(),
                description: profile.profile_description.clone(),
                modified: Timestamp::now(),
                use_default_settings,
            },
            depth_profiles: DepthProfiles {
                reference_density: profile.reference_density,
                number_of_depth_steps: profile.number_of_depth_steps,
                depth_step_for_stopping: profile.depth_step_for_stopping,
                depth_step_for_output: profile.depth_step_for_output,
                depth_for_concentration_from: profile.depth_for_concentration_from,
                depth_for_concentration_to: profile.depth_for_concentration_to,
            },
            energy_spectra: EnergySpectra {
                channel_width: profile.channel_width,
            },
            composition_changes: CompositionChanges {
                reference_cut: profile.reference_cut.clone(),
                number_of_splits: profile.number_of_splits,
                normalization: profile.normalization.clone(),
            },
        }
    }

    pub fn read(path: &Path) -> CoreResult<Self> {
        read_json(path)
    }

    pub fn write(&self, path: &Path) -> CoreResult<()> {
        write_json(path, self)
    }

    pub fn use_default_settings(&self) -> bool {
        self.general.use_default_settings
    }

    pub fn to_settings(&self) -> ProfileSettings {
        ProfileSettings {
            profile_name: self.general.name.clone(),
            profile_description: self.general.description.clone(),
            profile_modified: self.general.modified.clone(),
            reference_density: self.depth_profiles.reference_density,
            number_of_depth_steps: self.depth_profiles.number_of_depth_steps,
            depth_step_for_stopping: self.depth_profiles.depth_step_for_stopping,
            depth_step_for_output: self.depth_profiles.depth_step_for_output,
            depth_for_concentration_from: self.depth_profiles.depth_for_concentration_from,
            depth_for_concentration_to: self.depth_profiles.depth_for_concentration_to,
            channel_width: self.energy_spectra.channel_width,
            reference_cut: self.composition_changes.reference_cut.clone(),
            number_of_splits: self.composition_changes.number_of_splits,
            normalization: self.composition_changes.normalization.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::CoreError;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flag_is_stored_as_python_literal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Default.profile");
        let mut profile = ProfileSettings::default();
        profile.number_of_splits = 7;
        ProfileFile::new(&profile, false).write(&path).unwrap();

        let raw: Value = read_json(&path).unwrap();
        assert_eq!(raw["general"]["use_default_settings"], "False");
        assert_eq!(raw["composition_changes"]["number_of_splits"], 7);

        let loaded = ProfileFile::read(&path).unwrap();
        assert!(!loaded.use_default_settings());
        assert_eq!(loaded.to_settings().number_of_splits, 7);
    }

    #[test]
    fn rejects_non_literal_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.profile");
        let mut raw = serde_json::to_value(ProfileFile::new(&ProfileSettings::default(), true)).unwrap();
        raw["general"]["use_default_settings"] = Value::Bool(true);
        fs::write(&path, raw.to_string()).unwrap();
        assert!(matches!(ProfileFile::read(&path), Err(CoreError::Parse { .. })));
    }
}
