use crate::model::element::Element;
use crate::model::layer::Layer;
use crate::serialization::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_THETA: f64 = 20.5;

/// Sample target description. `target_theta` is stored in the `.measurement` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub modified: Timestamp,
    pub target_type: String,
    pub image_size: (u32, u32),
    pub image_file: String,
    pub scattering_element: Element,
    pub layers: Vec<Layer>,
    #[serde(skip, default = "default_theta")]
    pub target_theta: f64,
}

fn default_theta() -> f64 {
    DEFAULT_TARGET_THETA
}

impl Default for Target {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            description: String::new(),
            modified: Timestamp::now(),
            target_type: "AFM".to_string(),
            image_size: (1024, 1024),
            image_file: String::new(),
            scattering_element: Element::new("He", Some(4), Some(3.0)),
            layers: Vec::new(),
            target_theta: DEFAULT_TARGET_THETA,
        }
    }
}
