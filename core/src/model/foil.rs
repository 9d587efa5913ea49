use crate::model::layer::Layer;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Unit of a solid angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidAngleUnit {
    Steradian,
    Millisteradian,
    Microsteradian,
}

impl SolidAngleUnit {
    fn factor(self) -> f64 {
        match self {
            SolidAngleUnit::Steradian => 1.0,
            SolidAngleUnit::Millisteradian => 1_000.0,
            SolidAngleUnit::Microsteradian => 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FoilShape {
    Circular { diameter: f64 },
    Rectangular { size: (f64, f64) },
}

/// A detector foil. `distance` is measured from the sample along the beam line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foil {
    pub name: String,
    pub distance: f64,
    pub layers: Vec<Layer>,
    #[serde(default = "default_transmission")]
    pub transmission: f64,
    #[serde(flatten)]
    pub shape: FoilShape,
}

fn default_transmission() -> f64 {
    1.0
}

impl Foil {
    pub fn circular(name: impl Into<String>, diameter: f64, distance: f64, layers: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            distance,
            layers,
            transmission: 1.0,
            shape: FoilShape::Circular { diameter },
        }
    }

    pub fn rectangular(
        name: impl Into<String>,
        size: (f64, f64),
        distance: f64,
        layers: Vec<Layer>,
    ) -> Self {
        Self {
            name: name.into(),
            distance,
            layers,
            transmission: 1.0,
            shape: FoilShape::Rectangular { size },
        }
    }

    pub fn solid_angle(&self, unit: SolidAngleUnit) -> f64 {
        if self.distance == 0.0 {
            return 0.0;
        }
        let area = match self.shape {
            FoilShape::Circular { diameter } => PI * (diameter / 2.0).powi(2),
            FoilShape::Rectangular { size } => size.0 * size.1,
        };
        area / self.distance.powi(2) * unit.factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_solid_angle_in_millisteradians() {
        let foil = Foil::rectangular("det", (14.0, 14.0), 957.0, Vec::new());
        let expected = 14.0 * 14.0 / (957.0 * 957.0) * 1000.0;
        assert!((foil.solid_angle(SolidAngleUnit::Millisteradian) - expected).abs() < 1e-12);
    }

    #[test]
    fn foil_shape_is_tagged_in_json() {
        let foil = Foil::circular("tof", 7.0, 256.0, Vec::new());
        let json = serde_json::to_value(&foil).unwrap();
        assert_eq!(json["type"], "circular");
        assert_eq!(json["diameter"], 7.0);
        let back: Foil = serde_json::from_value(json).unwrap();
        assert_eq!(back, foil);
    }
}
