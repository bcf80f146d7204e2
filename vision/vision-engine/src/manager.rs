//! Long-lived managed raycasts and the visibility window they maintain.

use std::f64::consts::{PI, TAU};

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use smallvec::SmallVec;
use tracing::{debug, info};
use vision_types::{Orientation, SphericalAngles, Voxel, WorldOracle};

use crate::error::VisibilityError;
use crate::traverse::voxels_along;
use crate::window::VoxelWindow;

/// Margin multiplied into the minimum raycast density so the sphere surface
/// stays covered despite discretization.
pub const RAYCAST_DENSITY_SAFETY_FACTOR: f64 = 2.0;

/// Golden angle in radians, the azimuth increment of the Fibonacci lattice.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Default half-width of the cube searched for raycasts that penetrate a
/// changed voxel.
pub const DEFAULT_LOCAL_NEIGHBORHOOD_RADIUS: u32 = 1;

/// The smallest raycast count that covers a sphere of the given radius with
/// at least one ray per unit-area surface patch, with the safety margin
/// applied.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn minimum_raycast_count(radius: u32) -> usize {
    let r = f64::from(radius);
    (4.0 * PI * r * r * RAYCAST_DENSITY_SAFETY_FACTOR).ceil() as usize
}

/// A comfortable raycast count for the given radius: the minimum rounded up
/// to the next thousand.
#[must_use]
pub fn recommended_raycast_count(radius: u32) -> usize {
    minimum_raycast_count(radius).div_ceil(1000) * 1000
}

/// Verifies a requested raycast count against the minimum density.
///
/// # Errors
///
/// Returns [`VisibilityError::InsufficientRaycastDensity`] when `count` would
/// leave unsampled surface patches at `radius`.
pub fn assert_minimum_raycast_density(count: usize, radius: u32) -> Result<(), VisibilityError> {
    let minimum = minimum_raycast_count(radius);
    if count < minimum {
        return Err(VisibilityError::InsufficientRaycastDensity {
            requested: count,
            minimum,
            radius,
        });
    }
    Ok(())
}

/// Generates `count` orientations spread evenly over the sphere using the
/// Fibonacci lattice.
///
/// # Errors
///
/// Propagates angle validation failures, which cannot occur for the lattice's
/// own values but keeps the constructor honest.
#[allow(clippy::cast_precision_loss)]
pub fn uniform_orientations(count: usize) -> Result<Vec<Orientation>, VisibilityError> {
    let n = count as f64;
    let mut orientations = Vec::with_capacity(count);
    for i in 0..count {
        let y = 1.0 - 2.0 * (i as f64 + 0.5) / n;
        let phi = y.clamp(-1.0, 1.0).acos();
        let theta = (i as f64 * GOLDEN_ANGLE).rem_euclid(TAU);
        let angles = SphericalAngles::new(theta, phi)?;
        orientations.push(Orientation::from_angles(angles));
    }
    Ok(orientations)
}

/// How [`VisibilityRaycastManager::update_raycasts`] selects rays to re-cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Re-cast every managed raycast, shifting the window first. Used at
    /// observation start and after the eye crosses a voxel boundary.
    Everywhere,
    /// Re-cast only raycasts whose penetration path passes within
    /// `neighborhood_radius` (Chebyshev) of `voxel`. Requires the eye voxel
    /// to be unchanged since the last full update.
    AroundVoxel {
        /// The changed voxel, in world coordinates.
        voxel: Voxel,
        /// Half-width of the cubic neighborhood searched around it.
        neighborhood_radius: u32,
    },
}

impl UpdateStrategy {
    /// Local update around a voxel with the default neighborhood.
    #[must_use]
    pub fn around(voxel: Voxel) -> Self {
        Self::AroundVoxel {
            voxel,
            neighborhood_radius: DEFAULT_LOCAL_NEIGHBORHOOD_RADIUS,
        }
    }
}

/// One recorded ray hit at a voxel. Several rays can hit the same voxel at
/// different sub-voxel points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// The exact intersection point.
    pub point: Point3<f64>,
    /// Which managed raycast recorded this hit.
    ray: usize,
}

/// One long-lived sampling direction and the voxels its path penetrates.
#[derive(Debug, Clone)]
struct ManagedRaycast {
    orientation: Orientation,
    /// Eye-relative offsets of every voxel the ray passes through, in order.
    penetrated: Vec<Voxel>,
}

/// Owns a fixed, evenly distributed set of raycasts and the shifting
/// visibility window they keep current.
///
/// The ray directions are chosen once at construction, independent of where
/// the observer faces. Each ray's penetrated-voxel path is precomputed as
/// eye-relative offsets, so a single block change only re-casts the rays that
/// actually pass near it.
///
/// Per-voxel state lives in one window of hit-record lists; a voxel is
/// visible exactly when its list is non-empty, which keeps the visibility
/// mask and the hit index in lockstep by construction.
pub struct VisibilityRaycastManager {
    radius: u32,
    raycasts: Vec<ManagedRaycast>,
    /// World voxel of each ray's currently recorded hit, if any.
    last_hit: Vec<Option<Voxel>>,
    /// Eye-relative offset -> indices of rays whose path penetrates it.
    penetration_index: HashMap<Voxel, Vec<usize>>,
    hits: VoxelWindow<SmallVec<[HitRecord; 2]>>,
}

impl VisibilityRaycastManager {
    /// Builds the managed raycast set for a radius of interest.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::InvalidRadius`] for a zero radius and
    /// [`VisibilityError::InsufficientRaycastDensity`] when `raycast_count`
    /// cannot cover the sphere at this radius.
    #[allow(clippy::cast_possible_wrap)]
    pub fn new(radius: u32, raycast_count: usize) -> Result<Self, VisibilityError> {
        if radius == 0 {
            return Err(VisibilityError::InvalidRadius(radius));
        }
        assert_minimum_raycast_density(raycast_count, radius)?;

        let r = radius as i32;
        let max_distance = f64::from(radius);
        let mut raycasts = Vec::with_capacity(raycast_count);
        let mut penetration_index: HashMap<Voxel, Vec<usize>> = HashMap::new();
        for (i, orientation) in uniform_orientations(raycast_count)?.into_iter().enumerate() {
            // Trace from the center of the eye voxel; offsets stay valid for
            // any eye voxel since the path is translation-invariant.
            let penetrated: Vec<Voxel> =
                voxels_along(Voxel::origin().center(), orientation.unit(), max_distance)
                    .map(|(voxel, _)| voxel)
                    .filter(|v| v.x.abs() <= r && v.y.abs() <= r && v.z.abs() <= r)
                    .collect();
            for &offset in &penetrated {
                penetration_index.entry(offset).or_default().push(i);
            }
            raycasts.push(ManagedRaycast {
                orientation,
                penetrated,
            });
        }

        info!(
            radius,
            raycast_count,
            indexed_offsets = penetration_index.len(),
            "built managed raycast set"
        );

        Ok(Self {
            radius,
            raycasts,
            last_hit: vec![None; raycast_count],
            penetration_index,
            hits: VoxelWindow::new(radius)?,
        })
    }

    /// The radius of interest.
    #[must_use]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of managed raycasts.
    #[must_use]
    pub fn raycast_count(&self) -> usize {
        self.raycasts.len()
    }

    /// The eye voxel the window is centered on, once a full update has run.
    #[must_use]
    pub fn eye_voxel(&self) -> Option<Voxel> {
        self.hits.eye_voxel()
    }

    /// Whether any managed raycast's path penetrates the given world voxel.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::EyeNotInitialized`] before the first full
    /// update.
    pub fn any_raycast_penetrates(&self, world_voxel: Voxel) -> Result<bool, VisibilityError> {
        let eye = self.eye_voxel().ok_or(VisibilityError::EyeNotInitialized)?;
        Ok(self.penetration_index.contains_key(&(world_voxel - eye)))
    }

    /// Whether something is currently visible at a world voxel. Voxels
    /// outside the window are never visible.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::EyeNotInitialized`] before the first full
    /// update.
    pub fn is_visible(&self, world_voxel: Voxel) -> Result<bool, VisibilityError> {
        let eye = self.eye_voxel().ok_or(VisibilityError::EyeNotInitialized)?;
        Ok(self
            .hits
            .get(world_voxel - eye)
            .is_some_and(|list| !list.is_empty()))
    }

    /// The recorded hits at a world voxel, if any.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::EyeNotInitialized`] before the first full
    /// update.
    pub fn hits_at(&self, world_voxel: Voxel) -> Result<Option<&[HitRecord]>, VisibilityError> {
        let eye = self.eye_voxel().ok_or(VisibilityError::EyeNotInitialized)?;
        Ok(self.hits.get(world_voxel - eye).map(SmallVec::as_slice))
    }

    /// Iterates the world voxels currently marked visible.
    pub fn visible_voxels(&self) -> impl Iterator<Item = Voxel> + '_ {
        self.eye_voxel().into_iter().flat_map(move |eye| {
            self.hits
                .iter_populated()
                .filter(|(_, list)| !list.is_empty())
                .map(move |(offset, _)| offset + eye)
        })
    }

    /// Re-executes managed raycasts per the strategy and updates the window.
    ///
    /// `Everywhere` first un-registers every recorded hit, re-centers the
    /// window on `eye`, then re-casts all rays. `AroundVoxel` re-casts only
    /// the rays whose paths pass near the voxel, and demands that `eye` still
    /// lies in the voxel of the last full update.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::StaleEyePosition`] for a local update after
    /// the eye crossed a voxel boundary, [`VisibilityError::HitOutsideWindow`]
    /// when the oracle reports a hit past the radius, and
    /// [`VisibilityError::HitNotRecorded`] when the hit index has lost track
    /// of a ray's previous hit.
    pub fn update_raycasts<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
        strategy: UpdateStrategy,
    ) -> Result<(), VisibilityError> {
        match strategy {
            UpdateStrategy::Everywhere => self.update_everywhere(world, eye),
            UpdateStrategy::AroundVoxel {
                voxel,
                neighborhood_radius,
            } => self.update_around(world, eye, voxel, neighborhood_radius),
        }
    }

    fn update_everywhere<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
    ) -> Result<(), VisibilityError> {
        if self.hits.eye_voxel().is_none() {
            self.hits.set_initial_eye(Voxel::containing(eye))?;
        } else {
            for i in 0..self.raycasts.len() {
                self.remove_previous_hit(i)?;
            }
            self.hits.update_eye_and_shift(eye)?;
        }

        for i in 0..self.raycasts.len() {
            self.cast_one(world, eye, i)?;
        }
        debug!(visible = self.hits.populated_count(), "full raycast update");
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn update_around<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
        voxel: Voxel,
        neighborhood_radius: u32,
    ) -> Result<(), VisibilityError> {
        let expected = self.eye_voxel().ok_or(VisibilityError::EyeNotInitialized)?;
        let actual = Voxel::containing(eye);
        if actual != expected {
            return Err(VisibilityError::StaleEyePosition { expected, actual });
        }

        // Cubic neighborhood: cheap and close enough for single-voxel edits.
        let nr = neighborhood_radius as i32;
        let mut affected: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        for dx in -nr..=nr {
            for dy in -nr..=nr {
                for dz in -nr..=nr {
                    let offset = (voxel + Voxel::new(dx, dy, dz)) - expected;
                    if let Some(rays) = self.penetration_index.get(&offset) {
                        for &i in rays {
                            if seen.insert(i) {
                                affected.push(i);
                            }
                        }
                    }
                }
            }
        }
        affected.sort_unstable();

        debug!(%voxel, rays = affected.len(), "local raycast update");
        for i in affected {
            self.remove_previous_hit(i)?;
            self.cast_one(world, eye, i)?;
        }
        Ok(())
    }

    /// Un-registers ray `i`'s recorded hit. Clearing a hit that other rays
    /// still share at the same voxel leaves the voxel visible.
    fn remove_previous_hit(&mut self, i: usize) -> Result<(), VisibilityError> {
        let Some(hit_voxel) = self.last_hit[i].take() else {
            return Ok(());
        };
        let eye = self
            .hits
            .eye_voxel()
            .ok_or(VisibilityError::EyeNotInitialized)?;
        let offset = hit_voxel - eye;
        let Some(list) = self.hits.get_mut(offset) else {
            return Err(VisibilityError::HitNotRecorded { voxel: hit_voxel });
        };
        let Some(pos) = list.iter().position(|record| record.ray == i) else {
            return Err(VisibilityError::HitNotRecorded { voxel: hit_voxel });
        };
        list.swap_remove(pos);
        if list.is_empty() {
            self.hits.unset(offset);
        }
        Ok(())
    }

    /// Casts ray `i` from the exact eye position and records the outcome.
    fn cast_one<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
        i: usize,
    ) -> Result<(), VisibilityError> {
        let direction = self.raycasts[i].orientation.unit();
        let Some(hit) = world.raycast(eye, direction, f64::from(self.radius)) else {
            return Ok(());
        };

        let eye_voxel = self
            .hits
            .eye_voxel()
            .ok_or(VisibilityError::EyeNotInitialized)?;
        let offset = hit.voxel - eye_voxel;
        if self.hits.offset_to_index(offset).is_none() {
            // The oracle returned a hit the max range should have excluded.
            return Err(VisibilityError::HitOutsideWindow {
                voxel: hit.voxel,
                radius: self.radius,
            });
        }

        let record = HitRecord {
            point: hit.intersection,
            ray: i,
        };
        if let Some(list) = self.hits.get_mut(offset) {
            list.push(record);
        } else {
            self.hits.set(offset, SmallVec::from_elem(record, 1));
        }
        self.last_hit[i] = Some(hit.voxel);
        Ok(())
    }
}

impl std::fmt::Debug for VisibilityRaycastManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityRaycastManager")
            .field("radius", &self.radius)
            .field("raycast_count", &self.raycasts.len())
            .field("eye_voxel", &self.eye_voxel())
            .field("visible", &self.hits.populated_count())
            .finish_non_exhaustive()
    }
}
