//! Mesh-space geometry derived from synapse edges.
//!
//! - [`PointExtractor`] turns edge locations into point sets
//! - [`BoxMeshBuilder`] turns edge bounding boxes into a concatenated
//!   hexahedral [`BoxMesh`]
//!
//! Both apply a [`CoordinateMapper`](crate::mapper::CoordinateMapper) so the
//! output lines up with the cell surface meshes.

pub mod boxes;
pub mod points;

pub use boxes::{box_corners, BoxMesh, BoxMeshBuilder, BoxMeshOptions, BOX_FACES, BOX_VERTICES};
pub use points::PointExtractor;

use nalgebra::Point3;

/// Axis-aligned bounds of a point set, or `None` when empty.
pub fn bounding_box(points: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;

    for p in points {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }

    Some((min, max))
}
