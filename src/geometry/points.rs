//! Synapse locations as mesh-space point sets.

use std::borrow::Borrow;

use nalgebra::Point3;

use crate::graph::SynapseEdge;
use crate::mapper::CoordinateMapper;

/// Maps edge locations into mesh space.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointExtractor {
    mapper: CoordinateMapper,
}

impl PointExtractor {
    /// Create an extractor using the given mapper.
    pub fn new(mapper: CoordinateMapper) -> Self {
        Self { mapper }
    }

    /// One mapped location per edge, in edge order.
    pub fn extract<E: Borrow<SynapseEdge>>(&self, edges: &[E]) -> Vec<Point3<f64>> {
        edges
            .iter()
            .map(|e| self.mapper.map(&e.borrow().location))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Calibration;

    #[test]
    fn test_extract_preserves_order() {
        let edges: Vec<SynapseEdge> = (0..5)
            .map(|i| SynapseEdge::at(1, 2, Point3::new(i as f64, 2.0 * i as f64, 1.0)))
            .collect();
        let extractor = PointExtractor::new(CoordinateMapper::new(
            Calibration::identity().with_scale_xy(2.0),
        ));

        let points = extractor.extract(&edges);
        assert_eq!(points.len(), 5);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(*p, Point3::new(2.0 * i as f64, 4.0 * i as f64, 1.0));
        }
    }

    #[test]
    fn test_extract_empty() {
        let edges: Vec<&SynapseEdge> = Vec::new();
        assert!(PointExtractor::default().extract(&edges).is_empty());
    }

    #[test]
    fn test_extract_reference_point() {
        let edge = SynapseEdge::at(1, 2, Point3::new(100000.0, 100000.0, 0.0));
        let points = PointExtractor::default().extract(&[edge]);
        assert!((points[0].x - 3.5902).abs() < 1e-9);
        assert!((points[0].y - 3.69252).abs() < 1e-9);
        assert!(points[0].z.abs() < 1e-12);
    }
}
