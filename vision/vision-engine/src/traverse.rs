//! Ray traversal over the unit voxel grid.
//!
//! Uses the DDA (Amanatides & Woo) algorithm: at each step the ray advances
//! to the nearest voxel boundary among the three axes, so every voxel the ray
//! passes through is visited exactly once, in order.

use nalgebra::{Point3, Vector3};
use vision_types::Voxel;

/// Returns an iterator over the voxels a ray passes through, in order.
///
/// Yields `(voxel, distance)` pairs where `distance` is how far along the ray
/// the voxel is entered (0.0 for the voxel containing the origin). Iteration
/// stops once the entry distance exceeds `max_distance`. The direction is
/// normalized internally, so `distance` is in world units.
///
/// # Example
///
/// ```
/// use vision_engine::voxels_along;
/// use vision_types::{Point3, Vector3, Voxel};
///
/// let path: Vec<_> = voxels_along(Point3::new(0.5, 0.5, 0.5), Vector3::x(), 2.5).collect();
/// let voxels: Vec<_> = path.iter().map(|(v, _)| *v).collect();
/// assert_eq!(
///     voxels,
///     vec![Voxel::new(0, 0, 0), Voxel::new(1, 0, 0), Voxel::new(2, 0, 0)],
/// );
/// ```
#[must_use]
pub fn voxels_along(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    max_distance: f64,
) -> VoxelTraversal {
    VoxelTraversal::new(origin, direction, max_distance)
}

/// Iterator yielding `(Voxel, f64)` pairs along a ray. See [`voxels_along`].
#[derive(Debug, Clone)]
pub struct VoxelTraversal {
    current: Voxel,
    step: [i32; 3],
    t_max: [f64; 3],
    t_delta: [f64; 3],
    max_distance: f64,
    first: bool,
}

impl VoxelTraversal {
    fn new(origin: Point3<f64>, direction: Vector3<f64>, max_distance: f64) -> Self {
        let norm = direction.norm();
        let dir = if norm < f64::EPSILON {
            Vector3::zeros()
        } else {
            direction / norm
        };

        let current = Voxel::containing(origin);

        let mut step = [0i32; 3];
        let mut t_max = [f64::INFINITY; 3];
        let mut t_delta = [f64::INFINITY; 3];

        let d = [dir.x, dir.y, dir.z];
        let pos = [origin.x, origin.y, origin.z];
        let coord = [current.x, current.y, current.z];

        for i in 0..3 {
            if d[i].abs() > f64::EPSILON {
                step[i] = if d[i] > 0.0 { 1 } else { -1 };
                t_delta[i] = (1.0 / d[i]).abs();

                // Distance along the ray to the first boundary on this axis.
                let boundary = if d[i] > 0.0 {
                    f64::from(coord[i]) + 1.0
                } else {
                    f64::from(coord[i])
                };
                t_max[i] = (boundary - pos[i]) / d[i];
            }
        }

        Self {
            current,
            step,
            t_max,
            t_delta,
            max_distance,
            first: true,
        }
    }
}

impl Iterator for VoxelTraversal {
    type Item = (Voxel, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.first {
            self.first = false;
            return Some((self.current, 0.0));
        }

        let min_axis = if self.t_max[0] < self.t_max[1] {
            if self.t_max[0] < self.t_max[2] { 0 } else { 2 }
        } else if self.t_max[1] < self.t_max[2] {
            1
        } else {
            2
        };

        let t = self.t_max[min_axis];
        if t > self.max_distance {
            return None;
        }

        match min_axis {
            0 => self.current.x = self.current.x.wrapping_add(self.step[0]),
            1 => self.current.y = self.current.y.wrapping_add(self.step[1]),
            _ => self.current.z = self.current.z.wrapping_add(self.step[2]),
        }
        self.t_max[min_axis] += self.t_delta[min_axis];

        Some((self.current, t))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_traverse_along_x() {
        let voxels: Vec<_> = voxels_along(Point3::new(0.5, 0.5, 0.5), Vector3::x(), 4.0)
            .map(|(v, _)| v)
            .collect();
        assert_eq!(
            voxels,
            vec![
                Voxel::new(0, 0, 0),
                Voxel::new(1, 0, 0),
                Voxel::new(2, 0, 0),
                Voxel::new(3, 0, 0),
                Voxel::new(4, 0, 0),
            ]
        );
    }

    #[test]
    fn test_traverse_negative_direction() {
        let voxels: Vec<_> = voxels_along(Point3::new(0.5, 0.5, 0.5), -Vector3::y(), 2.0)
            .map(|(v, _)| v)
            .collect();
        assert_eq!(
            voxels,
            vec![Voxel::new(0, 0, 0), Voxel::new(0, -1, 0), Voxel::new(0, -2, 0)]
        );
    }

    #[test]
    fn test_traverse_respects_max_distance() {
        let count = voxels_along(Point3::new(0.5, 0.5, 0.5), Vector3::x(), 10.0).count();
        // Entry distances are 0.0, 0.5, 1.5, ..., 9.5.
        assert_eq!(count, 11);
    }

    #[test]
    fn test_entry_distances_increase() {
        let ts: Vec<f64> = voxels_along(
            Point3::new(0.2, 0.7, 0.4),
            Vector3::new(1.0, -2.0, 0.5),
            8.0,
        )
        .map(|(_, t)| t)
        .collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        assert!(ts.iter().all(|&t| t <= 8.0));
        assert_eq!(ts[0], 0.0);
    }

    #[test]
    fn test_consecutive_voxels_are_face_adjacent() {
        let voxels: Vec<_> = voxels_along(
            Point3::new(0.1, 0.9, 0.5),
            Vector3::new(1.0, 1.0, -0.3),
            12.0,
        )
        .map(|(v, _)| v)
        .collect();
        for pair in voxels.windows(2) {
            let d = pair[1] - pair[0];
            assert_eq!(d.x.abs() + d.y.abs() + d.z.abs(), 1);
        }
    }

    #[test]
    fn test_unnormalized_direction_distances_in_world_units() {
        let ts: Vec<f64> = voxels_along(Point3::new(0.5, 0.5, 0.5), Vector3::x() * 10.0, 2.0)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(ts, vec![0.0, 0.5, 1.5]);
    }

    #[test]
    fn test_zero_direction_yields_only_origin_voxel() {
        let voxels: Vec<_> =
            voxels_along(Point3::new(1.5, 2.5, 3.5), Vector3::zeros(), 5.0).collect();
        assert_eq!(voxels, vec![(Voxel::new(1, 2, 3), 0.0)]);
    }
}
