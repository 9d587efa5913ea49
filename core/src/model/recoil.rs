use crate::model::element::Element;
use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One (depth, concentration) point of a recoil distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoilPoint {
    pub x: f64,
    pub y: f64,
}

/// Recoil atom distribution parameterizing the target composition of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoilElement {
    pub element: Element,
    pub name: String,
    pub description: String,
    /// Multiplied by 1e22 by the consumer.
    pub reference_density: f64,
    points: Vec<RecoilPoint>,
}

impl RecoilElement {
    pub fn new(element: Element, points: Vec<RecoilPoint>) -> Self {
        let mut recoil = Self {
            element,
            name: "Default".to_string(),
            description: String::new(),
            reference_density: 4.98,
            points,
        };
        recoil.sort_points();
        recoil
    }

    /// Default two-point box distribution used for new element simulations.
    pub fn with_default_points(element: Element) -> Self {
        Self::new(
            element,
            vec![
                RecoilPoint { x: 0.0, y: 1.0 },
                RecoilPoint { x: 100.0, y: 1.0 },
            ],
        )
    }

    pub fn points(&self) -> &[RecoilPoint] {
        &self.points
    }

    pub fn add_point(&mut self, point: RecoilPoint) {
        self.points.push(point);
        self.sort_points();
    }

    pub fn remove_point(&mut self, index: usize) -> Option<RecoilPoint> {
        if index < self.points.len() {
            Some(self.points.remove(index))
        } else {
            None
        }
    }

    fn sort_points(&mut self) {
        self.points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    /// Distribution text consumed by the simulation process. It must start at
    /// depth zero with a near-zero plateau and end with two zero points.
    pub fn recoil_file_text(&self) -> CoreResult<String> {
        let last = self.points.last().ok_or_else(|| {
            CoreError::Consistency(format!("recoil element {} has no points", self.element))
        })?;

        let mut text = String::from("0.00 0.000001\n10.00 0.000001\n");
        for point in &self.points {
            text.push_str(&format!("{:.2} {:.4}\n", point.x + 10.01, point.y));
        }
        text.push_str(&format!("{:.2} 0.0\n", last.x + 10.02));
        text.push_str(&format!("{:.2} 0.0\n", last.x + 10.03));
        Ok(text)
    }

    pub fn write_recoil_file(&self, path: &Path) -> CoreResult<()> {
        let text = self.recoil_file_text()?;
        fs::write(path, text).map_err(|err| CoreError::io(path, err))
    }
}
