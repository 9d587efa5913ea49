use crate::model::element::Element;
use serde::{Deserialize, Serialize};

/// A target or foil layer. Thickness is in nanometres, density in g/cm3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub elements: Vec<Element>,
    pub thickness: f64,
    pub density: f64,
    #[serde(default)]
    pub start_depth: f64,
}

impl Layer {
    pub fn new(name: impl Into<String>, elements: Vec<Element>, thickness: f64, density: f64) -> Self {
        Self {
            name: name.into(),
            elements,
            thickness,
            density,
            start_depth: 0.0,
        }
    }
}
