use crate::prelude::{CoreError, CoreResult};
use ndarray::ArrayView1;
use rayon::prelude::*;

/// Number of events tested per parallel work unit.
const CHUNK: usize = 16_384;

/// Tolerance for deciding a point lies on an edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Closed polygon with a cached bounding box.
///
/// Containment uses the even-odd rule. Points lying exactly on an edge or a
/// vertex count as inside.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
    min: (f64, f64),
    max: (f64, f64),
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> CoreResult<Self> {
        if vertices.len() < 3 {
            return Err(CoreError::Consistency(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &vertices {
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
        Ok(Self { vertices, min, max })
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        let count = self.vertices.len();
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % count]))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        if x < self.min.0 || x > self.max.0 || y < self.min.1 || y > self.max.1 {
            return false;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if on_segment(a, b, (x, y)) {
                return true;
            }
            if (a.1 > y) != (b.1 > y) {
                let crossing = (b.0 - a.0) * (y - a.1) / (b.1 - a.1) + a.0;
                if x < crossing {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Tests every event against the polygon, writing the result for event
    /// `i` into `mask[i]`. `mask` must be as long as the coordinate rows.
    pub fn contains_all<T>(&self, xs: ArrayView1<T>, ys: ArrayView1<T>, mask: &mut [bool]) -> CoreResult<()>
    where
        T: Copy + Into<f64> + Sync,
    {
        if xs.len() != ys.len() || xs.len() != mask.len() {
            return Err(CoreError::Consistency(format!(
                "row lengths differ: x {}, y {}, mask {}",
                xs.len(),
                ys.len(),
                mask.len()
            )));
        }

        mask.par_chunks_mut(CHUNK)
            .enumerate()
            .for_each(|(chunk_index, chunk)| {
                let offset = chunk_index * CHUNK;
                for (k, slot) in chunk.iter_mut().enumerate() {
                    let i = offset + k;
                    *slot = self.contains(xs[i].into(), ys[i].into());
                }
            });
        Ok(())
    }
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn square() -> Polygon {
        Polygon::new(vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap()
    }

    #[test]
    fn interior_and_exterior_points() {
        let polygon = square();
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(15.0, 15.0));
        assert!(!polygon.contains(-1.0, 5.0));
    }

    #[test]
    fn edges_and_vertices_are_inside() {
        let polygon = square();
        assert!(polygon.contains(0.0, 0.0));
        assert!(polygon.contains(10.0, 5.0));
        assert!(polygon.contains(5.0, 10.0));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        let polygon = Polygon::new(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (5.0, 4.0),
            (0.0, 10.0),
        ])
        .unwrap();
        assert!(polygon.contains(5.0, 2.0));
        assert!(!polygon.contains(5.0, 8.0));
    }

    #[test]
    fn bulk_test_matches_scalar_test() {
        let polygon = square();
        let xs = array![5u16, 15, 0, 3, 11];
        let ys = array![5u16, 15, 0, 9, 2];
        let mut mask = vec![false; xs.len()];
        polygon.contains_all(xs.view(), ys.view(), &mut mask).unwrap();
        assert_eq!(mask, vec![true, false, true, true, false]);
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        assert!(Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
    }
}
