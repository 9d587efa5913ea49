use crate::model::element::Element;
use crate::model::foil::Foil;
use crate::model::layer::Layer;
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DETECTOR_THETA: f64 = 40.0;

/// Time-of-flight detector telescope.
///
/// `tof_foils` holds indices into `foils` naming the timing foils.
/// `detector_theta` lives in the owning `.measurement` file, not in the
/// `.detector` file, so it is skipped here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
    pub detector_type: String,
    pub foils: Vec<Foil>,
    pub tof_foils: Vec<usize>,
    pub timeres: f64,
    pub virtual_size: (f64, f64),
    pub tof_slope: f64,
    pub tof_offset: f64,
    pub angle_slope: f64,
    pub angle_offset: f64,
    #[serde(skip, default = "default_theta")]
    pub detector_theta: f64,
}

fn default_theta() -> f64 {
    DEFAULT_DETECTOR_THETA
}

impl Default for Detector {
    fn default() -> Self {
        let carbon = || vec![Element::new("C", None, Some(1.0))];
        Self {
            name: "Default".to_string(),
            description: "This a default detector setting file.".to_string(),
            modified: Timestamp::now(),
            detector_type: "TOF".to_string(),
            foils: vec![
                Foil::circular("Default", 7.0, 256.0, vec![Layer::new("First", carbon(), 0.1, 2.25)]),
                Foil::circular("Default", 9.0, 319.0, vec![Layer::new("Second", carbon(), 13.3, 2.25)]),
                Foil::circular("Default", 18.0, 942.0, vec![Layer::new("Third", carbon(), 44.4, 2.25)]),
                Foil::rectangular(
                    "Default",
                    (14.0, 14.0),
                    957.0,
                    vec![Layer::new(
                        "Fourth",
                        vec![
                            Element::new("N", None, Some(0.57)),
                            Element::new("Si", None, Some(0.43)),
                        ],
                        1.0,
                        3.44,
                    )],
                ),
            ],
            tof_foils: vec![1, 2],
            timeres: 250.0,
            virtual_size: (2.0, 5.0),
            tof_slope: 1e-11,
            tof_offset: 1e-9,
            angle_slope: 0.0,
            angle_offset: 0.0,
            detector_theta: DEFAULT_DETECTOR_THETA,
        }
    }
}

impl Detector {
    /// Foils referenced by `tof_foils`, in index order. Out-of-range indices are ignored.
    pub fn timing_foils(&self) -> Vec<&Foil> {
        self.tof_foils
            .iter()
            .filter_map(|&index| self.foils.get(index))
            .collect()
    }
}
