//! Angular partitioning of the discretized sphere surface.
//!
//! [`SphereSurfaceHash`] enumerates every voxel offset on the spherical shell
//! of a given radius, canonicalizes each into an [`Orientation`], and buckets
//! the orientations into a 2D grid of angular regions. It also precomputes,
//! for every offset inside the shell, which regions a unit-cube obstruction
//! at that offset would wholly occlude. Built once per radius, immutable
//! afterward.

use std::f64::consts::{PI, TAU};

use hashbrown::HashMap;
use tracing::info;
use vision_types::{Orientation, OrientationKey, Voxel};

use crate::error::VisibilityError;

/// How many orientations each angular region should hold on average.
const TARGET_ORIENTATIONS_PER_REGION: f64 = 3.0;

/// Half the diagonal of a unit cube, the circumradius of a voxel seen from
/// its center.
const HALF_CUBE_DIAGONAL: f64 = 0.866_025_403_784_438_6;

/// Index of one angular region: a (θ-bin, φ-bin) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionIdx {
    /// Azimuthal bin, in `0..theta_bins`.
    pub theta: usize,
    /// Polar bin, in `0..phi_bins`.
    pub phi: usize,
}

/// What a unit-cube obstruction at one voxel offset occludes.
#[derive(Debug, Clone)]
pub struct OcclusionEntry {
    angular_radius: f64,
    regions: Vec<RegionIdx>,
}

impl OcclusionEntry {
    /// The angular radius (in radians) subtended by a unit cube at this
    /// offset's distance.
    #[must_use]
    pub fn angular_radius(&self) -> f64 {
        self.angular_radius
    }

    /// Regions whose every orientation falls within the subtended angle, so
    /// a hit here settles them without casting their rays.
    #[must_use]
    pub fn occluded_regions(&self) -> &[RegionIdx] {
        &self.regions
    }
}

/// Immutable spherical-shell geometry for one radius.
///
/// # Example
///
/// ```
/// use vision_engine::SphereSurfaceHash;
///
/// let hash = SphereSurfaceHash::new(4).unwrap();
/// assert!(hash.orientation_count() > 0);
/// let down = hash.down_region();
/// assert!(!hash.orientations_in(down).is_empty());
/// ```
pub struct SphereSurfaceHash {
    radius: u32,
    theta_bins: usize,
    phi_bins: usize,
    /// Orientation keys in discovery order, for deterministic iteration.
    keys: Vec<OrientationKey>,
    orientations: HashMap<OrientationKey, Orientation>,
    region_of: HashMap<OrientationKey, RegionIdx>,
    /// Region members, indexed densely as `phi * theta_bins + theta`.
    members: Vec<Vec<OrientationKey>>,
    neighbors: Vec<Vec<RegionIdx>>,
    occlusion: HashMap<Voxel, OcclusionEntry>,
    avg_orientations_per_region: f64,
    down_region: RegionIdx,
}

impl SphereSurfaceHash {
    /// Builds the shell geometry for the given radius.
    ///
    /// Construction cost is O(R³) in the enumeration and O(R³ · R²) in the
    /// occlusion precompute, paid once per radius.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::InvalidRadius`] when `radius` is zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn new(radius: u32) -> Result<Self, VisibilityError> {
        if radius == 0 {
            return Err(VisibilityError::InvalidRadius(radius));
        }
        let r = f64::from(radius);
        let half = radius as i32 + 1;

        // Enumerate the discretized shell: every offset whose distance to the
        // origin is within half a voxel of the radius. First-seen offset wins
        // when two offsets collapse to the same orientation.
        let mut keys = Vec::new();
        let mut orientations: HashMap<OrientationKey, Orientation> = HashMap::new();
        for x in -half..=half {
            for y in -half..=half {
                for z in -half..=half {
                    if x == 0 && y == 0 && z == 0 {
                        continue;
                    }
                    let offset = Voxel::new(x, y, z);
                    if (offset.norm() - r).abs() > 0.5 {
                        continue;
                    }
                    let orientation = Orientation::towards(offset)?;
                    let key = orientation.key();
                    if !orientations.contains_key(&key) {
                        orientations.insert(key, orientation);
                        keys.push(key);
                    }
                }
            }
        }

        // Bin counts: more θ resolution than φ, since the sin(φ) area element
        // shrinks the bins toward the poles.
        let target_cells = keys.len() as f64 / TARGET_ORIENTATIONS_PER_REGION;
        let theta_bins = ((2.0 * target_cells).sqrt().ceil() as usize).max(1);
        let phi_bins = ((target_cells / 2.0).sqrt().ceil() as usize).max(1);

        let mut members = vec![Vec::new(); theta_bins * phi_bins];
        let mut region_of = HashMap::new();
        for &key in &keys {
            let region = region_for_angles(key.theta(), key.phi(), theta_bins, phi_bins);
            members[region.phi * theta_bins + region.theta].push(key);
            region_of.insert(key, region);
        }

        // Region adjacency: θ wraps around, φ stops at the poles.
        let mut neighbors = vec![Vec::new(); theta_bins * phi_bins];
        for phi in 0..phi_bins {
            for theta in 0..theta_bins {
                let list = &mut neighbors[phi * theta_bins + theta];
                for dp in -1i64..=1 {
                    for dt in -1i64..=1 {
                        if dp == 0 && dt == 0 {
                            continue;
                        }
                        let np = phi as i64 + dp;
                        if np < 0 || np >= phi_bins as i64 {
                            continue;
                        }
                        let nt =
                            (theta as i64 + dt).rem_euclid(theta_bins as i64) as usize;
                        let neighbor = RegionIdx {
                            theta: nt,
                            phi: np as usize,
                        };
                        if neighbor != (RegionIdx { theta, phi }) && !list.contains(&neighbor) {
                            list.push(neighbor);
                        }
                    }
                }
            }
        }

        let occupied = members.iter().filter(|m| !m.is_empty()).count().max(1);
        let avg_orientations_per_region = keys.len() as f64 / occupied as f64;

        // Occlusion-skip table: for every offset inside the shell, the set of
        // regions a solid block there would wholly hide from the observer.
        let mut occlusion = HashMap::new();
        for x in -half..=half {
            for y in -half..=half {
                for z in -half..=half {
                    if x == 0 && y == 0 && z == 0 {
                        continue;
                    }
                    let offset = Voxel::new(x, y, z);
                    let dist = offset.norm();
                    if dist > r + 0.5 {
                        continue;
                    }
                    let angular_radius = (HALF_CUBE_DIAGONAL / dist).atan();
                    let center = Orientation::towards(offset)?;
                    let mut regions = Vec::new();
                    for phi in 0..phi_bins {
                        for theta in 0..theta_bins {
                            let bucket = &members[phi * theta_bins + theta];
                            if bucket.is_empty() {
                                continue;
                            }
                            let wholly_occluded = bucket.iter().all(|k| {
                                orientations.get(k).is_some_and(|o| {
                                    o.angular_distance_to(&center) <= angular_radius
                                })
                            });
                            if wholly_occluded {
                                regions.push(RegionIdx { theta, phi });
                            }
                        }
                    }
                    occlusion.insert(
                        offset,
                        OcclusionEntry {
                            angular_radius,
                            regions,
                        },
                    );
                }
            }
        }

        let down_region = region_for_angles(0.0, PI, theta_bins, phi_bins);

        info!(
            radius,
            orientations = keys.len(),
            theta_bins,
            phi_bins,
            occlusion_offsets = occlusion.len(),
            "built sphere surface hash"
        );

        Ok(Self {
            radius,
            theta_bins,
            phi_bins,
            keys,
            orientations,
            region_of,
            members,
            neighbors,
            occlusion,
            avg_orientations_per_region,
            down_region,
        })
    }

    /// The radius this hash was built for.
    #[must_use]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of distinct shell orientations.
    #[must_use]
    pub fn orientation_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of azimuthal bins.
    #[must_use]
    pub fn theta_bins(&self) -> usize {
        self.theta_bins
    }

    /// Number of polar bins.
    #[must_use]
    pub fn phi_bins(&self) -> usize {
        self.phi_bins
    }

    /// All shell orientation keys, in deterministic discovery order.
    #[must_use]
    pub fn orientation_keys(&self) -> &[OrientationKey] {
        &self.keys
    }

    /// The full orientation for a shell key.
    #[must_use]
    pub fn orientation(&self, key: &OrientationKey) -> Option<&Orientation> {
        self.orientations.get(key)
    }

    /// The region a shell orientation was bucketed into.
    #[must_use]
    pub fn region_of(&self, key: &OrientationKey) -> Option<RegionIdx> {
        self.region_of.get(key).copied()
    }

    /// The orientations bucketed into a region.
    #[must_use]
    pub fn orientations_in(&self, region: RegionIdx) -> &[OrientationKey] {
        &self.members[region.phi * self.theta_bins + region.theta]
    }

    /// The precomputed angular neighbors of a region.
    #[must_use]
    pub fn neighbors_of(&self, region: RegionIdx) -> &[RegionIdx] {
        &self.neighbors[region.phi * self.theta_bins + region.theta]
    }

    /// The occlusion-skip entry for a voxel offset, if the offset lies within
    /// the shell.
    #[must_use]
    pub fn occlusion(&self, offset: Voxel) -> Option<&OcclusionEntry> {
        self.occlusion.get(&offset)
    }

    /// Average orientations per occupied region, used to estimate the rays
    /// saved by settling a region without casting.
    #[must_use]
    pub fn avg_orientations_per_region(&self) -> f64 {
        self.avg_orientations_per_region
    }

    /// The region containing the straight-down direction, where frontier
    /// traversal starts.
    #[must_use]
    pub fn down_region(&self) -> RegionIdx {
        self.down_region
    }
}

impl std::fmt::Debug for SphereSurfaceHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SphereSurfaceHash")
            .field("radius", &self.radius)
            .field("orientations", &self.keys.len())
            .field("theta_bins", &self.theta_bins)
            .field("phi_bins", &self.phi_bins)
            .finish_non_exhaustive()
    }
}

/// Maps angles to their bin pair by floor division, clamped into range.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn region_for_angles(theta: f64, phi: f64, theta_bins: usize, phi_bins: usize) -> RegionIdx {
    let theta_width = TAU / theta_bins as f64;
    let phi_width = PI / phi_bins as f64;
    let t = ((theta / theta_width).floor() as usize).min(theta_bins - 1);
    let p = ((phi / phi_width).floor() as usize).min(phi_bins - 1);
    RegionIdx { theta: t, phi: p }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_radius_rejected() {
        assert!(matches!(
            SphereSurfaceHash::new(0),
            Err(VisibilityError::InvalidRadius(0))
        ));
    }

    #[test]
    fn test_every_orientation_has_a_region() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        assert!(hash.orientation_count() > 0);
        for key in hash.orientation_keys() {
            let region = hash.region_of(key).unwrap();
            assert!(hash.orientations_in(region).contains(key));
        }
    }

    #[test]
    fn test_region_assignment_respects_bin_widths() {
        let hash = SphereSurfaceHash::new(5).unwrap();
        let theta_width = TAU / hash.theta_bins() as f64;
        let phi_width = PI / hash.phi_bins() as f64;
        for key in hash.orientation_keys() {
            let region = hash.region_of(key).unwrap();
            let t_lo = region.theta as f64 * theta_width;
            let p_lo = region.phi as f64 * phi_width;
            assert!(key.theta() >= t_lo - 1e-12);
            assert!(key.phi() >= p_lo - 1e-12);
            // Upper edge may clamp into the last bin.
            if region.theta + 1 < hash.theta_bins() {
                assert!(key.theta() < (region.theta as f64 + 1.0) * theta_width + 1e-12);
            }
            if region.phi + 1 < hash.phi_bins() {
                assert!(key.phi() < (region.phi as f64 + 1.0) * phi_width + 1e-12);
            }
        }
    }

    #[test]
    fn test_down_region_contains_straight_down() {
        let hash = SphereSurfaceHash::new(5).unwrap();
        let down_key = Orientation::down().key();
        assert_eq!(hash.region_of(&down_key), Some(hash.down_region()));
    }

    #[test]
    fn test_neighbors_wrap_in_theta_not_phi() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        let first = RegionIdx { theta: 0, phi: 1 };
        let last_theta = hash.theta_bins() - 1;
        assert!(hash
            .neighbors_of(first)
            .contains(&RegionIdx { theta: last_theta, phi: 1 }));
        // Bottom polar row has no neighbor below it.
        let bottom = RegionIdx {
            theta: 0,
            phi: hash.phi_bins() - 1,
        };
        assert!(hash
            .neighbors_of(bottom)
            .iter()
            .all(|n| n.phi < hash.phi_bins()));
    }

    #[test]
    fn test_occlusion_claims_are_sound() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        // Every orientation in a "wholly occluded" region must sit within the
        // angular footprint of the obstruction at that offset.
        let offsets = [
            Voxel::new(0, -2, 0),
            Voxel::new(1, 1, 1),
            Voxel::new(-3, 0, 2),
            Voxel::new(0, 4, 0),
        ];
        for offset in offsets {
            let entry = hash.occlusion(offset).unwrap();
            let center = Orientation::towards(offset).unwrap();
            for &region in entry.occluded_regions() {
                for key in hash.orientations_in(region) {
                    let orientation = hash.orientation(key).unwrap();
                    assert!(
                        orientation.angular_distance_to(&center) <= entry.angular_radius(),
                        "false occlusion claim at offset {offset}, region {region:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_occlusion_radius_shrinks_with_distance() {
        let hash = SphereSurfaceHash::new(5).unwrap();
        let near = hash.occlusion(Voxel::new(0, -1, 0)).unwrap();
        let far = hash.occlusion(Voxel::new(0, -5, 0)).unwrap();
        assert!(near.angular_radius() > far.angular_radius());
    }

    #[test]
    fn test_nearby_obstruction_occludes_regions() {
        // A block one voxel below the eye hides a wide angular patch; at
        // radius 5 that patch spans whole regions.
        let hash = SphereSurfaceHash::new(5).unwrap();
        let entry = hash.occlusion(Voxel::new(0, -1, 0)).unwrap();
        assert!(!entry.occluded_regions().is_empty());
    }

    #[test]
    fn test_construction_is_deterministic() {
        let a = SphereSurfaceHash::new(3).unwrap();
        let b = SphereSurfaceHash::new(3).unwrap();
        assert_eq!(a.orientation_keys(), b.orientation_keys());
        assert_eq!(a.theta_bins(), b.theta_bins());
        assert_eq!(a.phi_bins(), b.phi_bins());
    }
}
