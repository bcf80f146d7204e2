//! Frontier-expansion visibility raycasting with occlusion skip.

use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

use hashbrown::HashSet;
use tracing::debug;
use vision_types::{Orientation, OrientationKey, Point3, RayHit, SphericalAngles, Voxel, WorldOracle};

use crate::sphere_hash::{RegionIdx, SphereSurfaceHash};

/// Skip a region batch only when doing so saves more than this many rays.
const OCCLUSION_SKIP_MIN_SAVINGS: f64 = 4.0;

/// A lazy breadth-first sweep of the angular regions around an observer.
///
/// Starts at the region containing straight-down and expands outward through
/// region adjacency, casting every orientation in a region before moving on.
/// When a ray hits a block whose precomputed occlusion footprint covers
/// enough whole regions, those regions are settled without casting their
/// rays; four supplemental rays around the hit's angular footprint are cast
/// instead to catch the obstruction's edges.
///
/// Yields `(orientation key, hit)` pairs one at a time; the caller drives
/// consumption and the raycaster keeps no state beyond the sweep itself.
pub struct VisibilityRaycaster<'a, W: WorldOracle + ?Sized> {
    hash: &'a SphereSurfaceHash,
    world: &'a W,
    origin: Point3<f64>,
    eye_voxel: Voxel,
    max_distance: f64,
    frontier: VecDeque<RegionIdx>,
    enqueued: HashSet<RegionIdx>,
    occluded: HashSet<RegionIdx>,
    ready: VecDeque<(OrientationKey, Option<RayHit>)>,
    rays_cast: usize,
    regions_settled_by_occlusion: usize,
}

impl<'a, W: WorldOracle + ?Sized> VisibilityRaycaster<'a, W> {
    /// Begins a sweep from the voxel containing `eye`.
    ///
    /// Rays originate at the eye voxel's center so the sweep depends only on
    /// which voxel the observer occupies, not the fractional position.
    #[must_use]
    pub fn new(hash: &'a SphereSurfaceHash, world: &'a W, eye: Point3<f64>) -> Self {
        let eye_voxel = Voxel::containing(eye);
        let mut frontier = VecDeque::new();
        let mut enqueued = HashSet::new();
        let start = hash.down_region();
        frontier.push_back(start);
        enqueued.insert(start);
        Self {
            hash,
            world,
            origin: eye_voxel.center(),
            eye_voxel,
            max_distance: f64::from(hash.radius()) + 0.5,
            frontier,
            enqueued,
            occluded: HashSet::new(),
            ready: VecDeque::new(),
            rays_cast: 0,
            regions_settled_by_occlusion: 0,
        }
    }

    /// How many rays this sweep has cast so far, supplemental rays included.
    #[must_use]
    pub fn rays_cast(&self) -> usize {
        self.rays_cast
    }

    /// How many regions were settled by occlusion skip instead of casting.
    #[must_use]
    pub fn regions_settled_by_occlusion(&self) -> usize {
        self.regions_settled_by_occlusion
    }

    /// Processes the next frontier region, filling the ready queue.
    fn advance(&mut self) {
        let hash = self.hash;
        let Some(region) = self.frontier.pop_front() else {
            return;
        };

        if !self.occluded.contains(&region) {
            for &key in hash.orientations_in(region) {
                let Some(orientation) = hash.orientation(&key) else {
                    continue;
                };
                let hit = self
                    .world
                    .raycast(self.origin, orientation.unit(), self.max_distance);
                self.rays_cast += 1;
                // The hit itself is yielded before the supplemental edge rays
                // it triggers, preserving visitation order.
                self.ready.push_back((key, hit));
                if let Some(hit) = hit {
                    self.settle_behind(&hit, *orientation);
                }
            }
        }

        // The frontier expands through settled regions too, otherwise the
        // sweep would stall at the edge of an obstruction.
        for &neighbor in hash.neighbors_of(region) {
            if self.enqueued.insert(neighbor) {
                self.frontier.push_back(neighbor);
            }
        }
    }

    /// On a hit, settles the regions its occlusion footprint covers and casts
    /// the supplemental edge rays, when the savings clear the threshold.
    fn settle_behind(&mut self, hit: &RayHit, orientation: Orientation) {
        let hash = self.hash;
        let offset = hit.voxel - self.eye_voxel;
        let Some(entry) = hash.occlusion(offset) else {
            return;
        };
        #[allow(clippy::cast_precision_loss)]
        let savings =
            entry.occluded_regions().len() as f64 * hash.avg_orientations_per_region();
        if savings <= OCCLUSION_SKIP_MIN_SAVINGS {
            return;
        }

        for &region in entry.occluded_regions() {
            if self.occluded.insert(region) {
                self.regions_settled_by_occlusion += 1;
            }
        }
        debug!(
            ?offset,
            settled = entry.occluded_regions().len(),
            "occlusion skip engaged"
        );

        // Probe just past the obstruction's angular footprint on both axes.
        let r = entry.angular_radius();
        let theta = orientation.angles().theta();
        let phi = orientation.angles().phi();
        let probes = [
            ((theta + r).rem_euclid(TAU), phi),
            ((theta - r).rem_euclid(TAU), phi),
            (theta, (phi + r).clamp(0.0, PI)),
            (theta, (phi - r).clamp(0.0, PI)),
        ];
        for (t, p) in probes {
            if let Ok(angles) = SphericalAngles::new(t, p) {
                let probe = Orientation::from_angles(angles);
                let hit = self
                    .world
                    .raycast(self.origin, probe.unit(), self.max_distance);
                self.rays_cast += 1;
                self.ready.push_back((probe.key(), hit));
            }
        }
    }
}

impl<W: WorldOracle + ?Sized> Iterator for VisibilityRaycaster<'_, W> {
    type Item = (OrientationKey, Option<RayHit>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.frontier.is_empty() {
                return None;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hashbrown::HashMap;
    use vision_types::{BiomeId, BlockDescriptor, BlockKindId, Vector3};

    /// Minimal solid-block world for exercising the sweep.
    struct BlockWorld {
        solid: HashMap<Voxel, BlockDescriptor>,
    }

    impl BlockWorld {
        fn empty() -> Self {
            Self {
                solid: HashMap::new(),
            }
        }

        fn with_block(mut self, voxel: Voxel) -> Self {
            self.solid.insert(
                voxel,
                BlockDescriptor {
                    kind: BlockKindId(1),
                    biome: BiomeId(0),
                },
            );
            self
        }
    }

    impl WorldOracle for BlockWorld {
        fn raycast(
            &self,
            origin: Point3<f64>,
            direction: Vector3<f64>,
            max_distance: f64,
        ) -> Option<RayHit> {
            for (voxel, t) in crate::traverse::voxels_along(origin, direction, max_distance) {
                if self.solid.contains_key(&voxel) {
                    return Some(RayHit {
                        voxel,
                        intersection: origin + direction * t,
                    });
                }
            }
            None
        }

        fn block_at(&self, voxel: Voxel) -> Option<BlockDescriptor> {
            self.solid.get(&voxel).copied()
        }
    }

    #[test]
    fn test_empty_world_casts_every_orientation() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        let world = BlockWorld::empty();
        let raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let results: Vec<_> = raycaster.collect();
        assert_eq!(results.len(), hash.orientation_count());
        assert!(results.iter().all(|(_, hit)| hit.is_none()));
    }

    #[test]
    fn test_sweep_visits_each_shell_orientation_once() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        let world = BlockWorld::empty();
        let raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let mut seen = HashSet::new();
        for (key, _) in raycaster {
            assert!(seen.insert(key), "orientation cast twice");
        }
        assert_eq!(seen.len(), hash.orientation_count());
    }

    #[test]
    fn test_obstruction_below_engages_occlusion_skip() {
        let hash = SphereSurfaceHash::new(5).unwrap();
        let world = BlockWorld::empty().with_block(Voxel::new(0, -2, 0));
        let mut raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let results: Vec<_> = raycaster.by_ref().collect();
        assert!(raycaster.regions_settled_by_occlusion() > 0);
        assert!(raycaster.rays_cast() < hash.orientation_count());
        // The block itself is still reported hit.
        assert!(results
            .iter()
            .any(|(_, hit)| hit.is_some_and(|h| h.voxel == Voxel::new(0, -2, 0))));
    }

    #[test]
    fn test_hits_report_the_obstructing_voxel() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        let world = BlockWorld::empty().with_block(Voxel::new(3, 0, 0));
        let raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let hits: Vec<RayHit> = raycaster.filter_map(|(_, hit)| hit).collect();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.voxel == Voxel::new(3, 0, 0)));
    }

    #[test]
    fn test_triggering_hit_yields_before_its_supplemental_rays() {
        let hash = SphereSurfaceHash::new(5).unwrap();
        let world = BlockWorld::empty().with_block(Voxel::new(0, -2, 0));
        let raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let items: Vec<_> = raycaster.collect();

        // Supplemental edge rays carry keys the shell never produced.
        let first_supplemental = items
            .iter()
            .position(|(key, _)| hash.orientation(key).is_none())
            .expect("occlusion skip should cast supplemental rays here");
        let first_hit = items
            .iter()
            .position(|(_, hit)| hit.is_some())
            .expect("the obstruction should be hit");
        assert!(
            first_hit < first_supplemental,
            "hit at {first_hit} must precede its supplemental rays at {first_supplemental}"
        );
    }

    #[test]
    fn test_down_obstruction_settles_regions_without_casting_them() {
        // A block straight below: its footprint settles whole regions near
        // the down start, whose shell orientations are then never yielded.
        let hash = SphereSurfaceHash::new(5).unwrap();
        let world = BlockWorld::empty().with_block(Voxel::new(0, -1, 0));
        let mut raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let yielded: HashSet<OrientationKey> = raycaster.by_ref().map(|(key, _)| key).collect();
        assert!(raycaster.regions_settled_by_occlusion() > 0);

        let skipped_regions = hash
            .orientation_keys()
            .iter()
            .filter(|key| !yielded.contains(*key))
            .filter_map(|key| hash.region_of(key))
            .collect::<HashSet<_>>();
        assert!(!skipped_regions.is_empty());
        // Settled regions are skipped wholesale, never partially.
        for region in skipped_regions {
            assert!(hash
                .orientations_in(region)
                .iter()
                .all(|key| !yielded.contains(key)));
        }
    }

    #[test]
    fn test_sweep_starts_at_the_down_region() {
        let hash = SphereSurfaceHash::new(4).unwrap();
        let world = BlockWorld::empty();
        let mut raycaster = VisibilityRaycaster::new(&hash, &world, Point3::new(0.5, 0.5, 0.5));
        let (first_key, _) = raycaster.next().unwrap();
        assert_eq!(hash.region_of(&first_key), Some(hash.down_region()));
    }
}
