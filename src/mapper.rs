//! Graph-space to mesh-space coordinate mapping.
//!
//! Synapse coordinates in the connectivity graph and the vertices of the
//! separately produced cell surface meshes live in two independently
//! calibrated spaces. [`CoordinateMapper`] reconciles them with a per-axis
//! affine transform:
//!
//! ```text
//! out = p * base_scale - shift
//! out.x *= scale_xy
//! out.y *= scale_xy
//! out.z *= scale_z
//! ```
//!
//! The constants live in [`Calibration`]. The defaults were fit empirically
//! by comparing extents of the two data sets; they are approximate, not a
//! derived ground truth, so they are loaded from configuration like any other
//! setting.
//!
//! # Example
//!
//! ```
//! use synmesh::mapper::{Calibration, CoordinateMapper};
//! use nalgebra::Point3;
//!
//! let mapper = CoordinateMapper::new(Calibration::default());
//! let p = mapper.map(&Point3::new(100000.0, 100000.0, 0.0));
//! assert!((p.x - 3.5902).abs() < 1e-9);
//! assert!((p.y - 3.69252).abs() < 1e-9);
//! ```

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynMeshError};

/// Constants of the graph-space to mesh-space transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Offset subtracted after base scaling.
    pub shift: [f64; 3],
    /// Scale applied to x and y after the shift.
    pub scale_xy: f64,
    /// Scale applied to z after the shift.
    pub scale_z: f64,
    /// Uniform scale applied to raw graph coordinates.
    pub base_scale: f64,
}

impl Default for Calibration {
    /// The empirically fit calibration between the synapse graph and the
    /// 10x downsampled cell meshes. Approximate.
    fn default() -> Self {
        Self {
            shift: [0.10245, 0.07687, 0.0],
            scale_xy: 4.0,
            scale_z: 40.0,
            base_scale: 0.00001,
        }
    }
}

impl Calibration {
    /// A calibration under which mapping is the identity.
    pub fn identity() -> Self {
        Self {
            shift: [0.0; 3],
            scale_xy: 1.0,
            scale_z: 1.0,
            base_scale: 1.0,
        }
    }

    /// Set the shift vector.
    pub fn with_shift(mut self, shift: [f64; 3]) -> Self {
        self.shift = shift;
        self
    }

    /// Set the x/y scale.
    pub fn with_scale_xy(mut self, scale_xy: f64) -> Self {
        self.scale_xy = scale_xy;
        self
    }

    /// Set the z scale.
    pub fn with_scale_z(mut self, scale_z: f64) -> Self {
        self.scale_z = scale_z;
        self
    }

    /// Set the base scale.
    pub fn with_base_scale(mut self, base_scale: f64) -> Self {
        self.base_scale = base_scale;
        self
    }

    /// Check that every constant is finite.
    ///
    /// Negative scales are allowed; box building copes with corners whose
    /// ordering flips under the transform.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("shift.x", self.shift[0]),
            ("shift.y", self.shift[1]),
            ("shift.z", self.shift[2]),
            ("scale_xy", self.scale_xy),
            ("scale_z", self.scale_z),
            ("base_scale", self.base_scale),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(SynMeshError::invalid_param(name, value, "must be finite"));
            }
        }
        Ok(())
    }
}

/// Maps graph-space points into mesh space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    calibration: Calibration,
    shift: Vector3<f64>,
    axis_scale: Vector3<f64>,
}

impl CoordinateMapper {
    /// Create a mapper from a calibration.
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            shift: Vector3::from(calibration.shift),
            axis_scale: Vector3::new(
                calibration.scale_xy,
                calibration.scale_xy,
                calibration.scale_z,
            ),
        }
    }

    /// The calibration this mapper was built from.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Map a single graph-space point.
    #[inline]
    pub fn map(&self, p: &Point3<f64>) -> Point3<f64> {
        let shifted = p.coords * self.calibration.base_scale - self.shift;
        Point3::from(shifted.component_mul(&self.axis_scale))
    }

    /// Map a slice of points, preserving order.
    pub fn map_all(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.map(p)).collect()
    }

    /// The linear part of the transform, per axis.
    ///
    /// `map(p) - map(q) == (p - q).component_mul(scale_factors())`.
    pub fn scale_factors(&self) -> Vector3<f64> {
        self.axis_scale * self.calibration.base_scale
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(Calibration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(100000.0, 100000.0, 0.0),
            Point3::new(-12.5, 3.25, 7.0),
            Point3::new(1.0e6, -2.0e5, 4321.0),
        ]
    }

    #[test]
    fn test_identity_calibration() {
        let mapper = CoordinateMapper::new(Calibration::identity());
        for p in sample_points() {
            assert_eq!(mapper.map(&p), p);
        }
    }

    #[test]
    fn test_default_calibration_reference_point() {
        let mapper = CoordinateMapper::default();
        let p = mapper.map(&Point3::new(100000.0, 100000.0, 0.0));
        assert!((p.x - 3.5902).abs() < 1e-9);
        assert!((p.y - 3.69252).abs() < 1e-9);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_differences_scale_per_axis() {
        let mapper = CoordinateMapper::default();
        let scale = mapper.scale_factors();
        let points = sample_points();

        for p in &points {
            for q in &points {
                let lhs = mapper.map(p) - mapper.map(q);
                let rhs = (p - q).component_mul(&scale);
                assert!((lhs - rhs).norm() < 1e-9, "{:?} vs {:?}", lhs, rhs);
            }
        }
    }

    #[test]
    fn test_negative_scale() {
        let mapper = CoordinateMapper::new(Calibration::identity().with_scale_z(-2.0));
        let p = mapper.map(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3::new(1.0, 2.0, -6.0));
    }

    #[test]
    fn test_map_all_preserves_order() {
        let mapper = CoordinateMapper::default();
        let points = sample_points();
        let mapped = mapper.map_all(&points);
        assert_eq!(mapped.len(), points.len());
        for (p, m) in points.iter().zip(&mapped) {
            assert_eq!(mapper.map(p), *m);
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(Calibration::default().validate().is_ok());
        assert!(Calibration::default().with_scale_z(f64::NAN).validate().is_err());
        assert!(Calibration::default()
            .with_shift([0.0, f64::INFINITY, 0.0])
            .validate()
            .is_err());
    }
}
