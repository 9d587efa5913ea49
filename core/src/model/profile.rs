use crate::serialization::timestamp::Timestamp;

/// Depth-profile, energy-spectrum and composition-change parameters of a measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettings {
    pub profile_name: String,
    pub profile_description: String,
    pub profile_modified: Timestamp,
    pub reference_density: f64,
    pub number_of_depth_steps: u32,
    pub depth_step_for_stopping: u32,
    pub depth_step_for_output: u32,
    pub depth_for_concentration_from: f64,
    pub depth_for_concentration_to: f64,
    pub channel_width: f64,
    pub reference_cut: String,
    pub number_of_splits: u32,
    pub normalization: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            profile_name: "Default".to_string(),
            profile_description: String::new(),
            profile_modified: Timestamp::now(),
            reference_density: 3.0,
            number_of_depth_steps: 150,
            depth_step_for_stopping: 10,
            depth_step_for_output: 10,
            depth_for_concentration_from: 200.0,
            depth_for_concentration_to: 400.0,
            channel_width: 0.025,
            reference_cut: String::new(),
            number_of_splits: 10,
            normalization: "First".to_string(),
        }
    }
}
