//! The eleven-way partition of the observation window and its manager.
//!
//! The space around the observer divides into one immediate vicinity (a
//! sphere of the immediate radius) and ten distant vicinities: cylindrical
//! up/down columns over the immediate sphere's footprint, plus eight compass
//! wedges partitioning the remaining volume out to the distant radius.
//! Every voxel offset belongs to at most one vicinity.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Point3;
use tracing::{debug, info};
use vision_types::{BlockDescriptor, NameRegistry, Voxel, WorldOracle};

use crate::error::VisibilityError;
use crate::manager::{UpdateStrategy, VisibilityRaycastManager};
use crate::report::{DistantReport, ImmediateReport, SurroundingsReport};
use crate::window::VoxelWindow;

/// One of the ten directions slicing the distant surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Toward −Z.
    North,
    /// Toward −Z, +X.
    Northeast,
    /// Toward +X.
    East,
    /// Toward +Z, +X.
    Southeast,
    /// Toward +Z.
    South,
    /// Toward +Z, −X.
    Southwest,
    /// Toward −X.
    West,
    /// Toward −Z, −X.
    Northwest,
    /// The column above the observer.
    Up,
    /// The column below the observer.
    Down,
}

impl Direction {
    /// All ten directions, compass wedges first.
    pub const ALL: [Self; 10] = [
        Self::North,
        Self::Northeast,
        Self::East,
        Self::Southeast,
        Self::South,
        Self::Southwest,
        Self::West,
        Self::Northwest,
        Self::Up,
        Self::Down,
    ];

    /// The lowercase name of this direction.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::Northeast => "northeast",
            Self::East => "east",
            Self::Southeast => "southeast",
            Self::South => "south",
            Self::Southwest => "southwest",
            Self::West => "west",
            Self::Northwest => "northwest",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one of the eleven vicinities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VicinityName {
    /// The sphere immediately around the observer.
    Immediate,
    /// One of the ten distant directional slices.
    Distant(Direction),
}

impl std::fmt::Display for VicinityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => f.write_str("immediate"),
            Self::Distant(direction) => direction.fmt(f),
        }
    }
}

/// The two radii defining the vicinity partition.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservationRadii {
    immediate: f64,
    distant: u32,
}

impl ObservationRadii {
    /// Creates a validated radius pair.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::InvalidRadii`] unless
    /// `0 < immediate < distant`.
    pub fn new(immediate: f64, distant: u32) -> Result<Self, VisibilityError> {
        if immediate <= 0.0 || immediate >= f64::from(distant) {
            return Err(VisibilityError::InvalidRadii { immediate, distant });
        }
        Ok(Self { immediate, distant })
    }

    /// The immediate sphere's radius.
    #[must_use]
    pub fn immediate(&self) -> f64 {
        self.immediate
    }

    /// The outer radius bounding all vicinities.
    #[must_use]
    pub fn distant(&self) -> u32 {
        self.distant
    }
}

/// Classifies a position into its vicinity relative to an observer, or
/// `None` when it lies beyond the distant radius.
///
/// # Example
///
/// ```
/// use vision_engine::{classify_vicinity, Direction, ObservationRadii, VicinityName};
/// use vision_types::Point3;
///
/// let radii = ObservationRadii::new(2.0, 8).unwrap();
/// let observer = Point3::origin();
/// assert_eq!(
///     classify_vicinity(Point3::new(0.0, 0.0, -5.0), observer, &radii),
///     Some(VicinityName::Distant(Direction::North)),
/// );
/// assert_eq!(
///     classify_vicinity(Point3::new(1.0, 0.0, 0.0), observer, &radii),
///     Some(VicinityName::Immediate),
/// );
/// ```
#[must_use]
pub fn classify_vicinity(
    pos: Point3<f64>,
    observer: Point3<f64>,
    radii: &ObservationRadii,
) -> Option<VicinityName> {
    let delta = pos - observer;
    let distance = delta.norm();

    if distance <= radii.immediate {
        return Some(VicinityName::Immediate);
    }
    if distance > f64::from(radii.distant) {
        return None;
    }

    // The up/down columns extend the immediate sphere's horizontal footprint.
    let horizontal = delta.x.hypot(delta.z);
    if horizontal <= radii.immediate {
        let vertical = if delta.y > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        return Some(VicinityName::Distant(vertical));
    }

    // Compass angle measured clockwise from north (-Z), in degrees.
    let angle = delta.x.atan2(-delta.z).to_degrees().rem_euclid(360.0);
    let direction = if !(22.5..337.5).contains(&angle) {
        Direction::North
    } else if angle < 67.5 {
        Direction::Northeast
    } else if angle < 112.5 {
        Direction::East
    } else if angle < 157.5 {
        Direction::Southeast
    } else if angle < 202.5 {
        Direction::South
    } else if angle < 247.5 {
        Direction::Southwest
    } else if angle < 292.5 {
        Direction::West
    } else {
        Direction::Northwest
    };
    Some(VicinityName::Distant(direction))
}

/// Builds the static boolean mask of each vicinity over the window's offsets.
#[allow(clippy::cast_possible_wrap)]
fn build_vicinity_masks(
    radii: &ObservationRadii,
) -> Result<Vec<(VicinityName, VoxelWindow<bool>)>, VisibilityError> {
    let mut masks = Vec::with_capacity(11);
    masks.push((
        VicinityName::Immediate,
        VoxelWindow::new(radii.distant())?,
    ));
    for direction in Direction::ALL {
        masks.push((
            VicinityName::Distant(direction),
            VoxelWindow::new(radii.distant())?,
        ));
    }

    let r = radii.distant() as i32;
    for x in -r..=r {
        for y in -r..=r {
            for z in -r..=r {
                let offset = Voxel::new(x, y, z);
                let pos = Point3::new(f64::from(x), f64::from(y), f64::from(z));
                if let Some(name) = classify_vicinity(pos, Point3::origin(), radii) {
                    if let Some((_, mask)) = masks.iter_mut().find(|(n, _)| *n == name) {
                        mask.set(offset, true);
                    }
                }
            }
        }
    }
    Ok(masks)
}

/// Composes the raycast manager, the vicinity masks, and a block cache into
/// the engine's outward-facing observation surface.
///
/// Drive it with the world's event feed: [`Self::begin_observation`] once,
/// then [`Self::handle_observer_moved`] and [`Self::handle_block_changed`]
/// as events arrive. Between events the window, the block cache, and the
/// visibility mask are self-consistent at rest.
///
/// Block kinds the injected [`NameRegistry`] marks ignored (air, typically)
/// are never cached or reported, and kinds the registry cannot name are
/// omitted from reports.
pub struct VicinitiesManager<R: NameRegistry> {
    registry: R,
    radii: ObservationRadii,
    raycasts: VisibilityRaycastManager,
    masks: Vec<(VicinityName, VoxelWindow<bool>)>,
    /// Descriptors for currently visible voxels, keyed like the hit window.
    blocks: VoxelWindow<BlockDescriptor>,
    last_eye: Option<Point3<f64>>,
    observing: bool,
}

impl<R: NameRegistry> VicinitiesManager<R> {
    /// Builds the vicinity partition and the managed raycast set.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::InvalidRadii`] for an unusable radius pair
    /// and propagates raycast-density validation from
    /// [`VisibilityRaycastManager::new`].
    pub fn new(
        registry: R,
        radii: ObservationRadii,
        raycast_count: usize,
    ) -> Result<Self, VisibilityError> {
        let raycasts = VisibilityRaycastManager::new(radii.distant(), raycast_count)?;
        let masks = build_vicinity_masks(&radii)?;
        Ok(Self {
            registry,
            radii,
            raycasts,
            masks,
            blocks: VoxelWindow::new(radii.distant())?,
            last_eye: None,
            observing: false,
        })
    }

    /// The configured radii.
    #[must_use]
    pub fn radii(&self) -> ObservationRadii {
        self.radii
    }

    /// The underlying raycast manager.
    #[must_use]
    pub fn raycasts(&self) -> &VisibilityRaycastManager {
        &self.raycasts
    }

    /// Whether `begin_observation` has run.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Starts the observation session: a full raycast pass from `eye` and an
    /// initial fill of the block cache.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::ObservationAlreadyStarted`] on a second
    /// call; the session is irreversible.
    pub fn begin_observation<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
    ) -> Result<(), VisibilityError> {
        if self.observing {
            return Err(VisibilityError::ObservationAlreadyStarted);
        }
        self.raycasts
            .update_raycasts(world, eye, UpdateStrategy::Everywhere)?;
        self.blocks.set_initial_eye(Voxel::containing(eye))?;
        self.last_eye = Some(eye);
        self.reconcile_blocks(world)?;
        self.observing = true;
        info!(
            eye_voxel = %Voxel::containing(eye),
            visible = self.blocks.populated_count(),
            "observation started"
        );
        Ok(())
    }

    /// Reacts to observer movement. A move within the same voxel only
    /// refreshes the stored eye position; a voxel crossing triggers a full
    /// raycast pass, shifts the block cache, and reconciles it against the
    /// refreshed visibility.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::ObservationNotStarted`] before
    /// [`Self::begin_observation`].
    pub fn handle_observer_moved<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
    ) -> Result<(), VisibilityError> {
        if !self.observing {
            return Err(VisibilityError::ObservationNotStarted);
        }
        let crossed = self.raycasts.eye_voxel() != Some(Voxel::containing(eye));
        self.last_eye = Some(eye);
        if !crossed {
            return Ok(());
        }

        debug!(eye_voxel = %Voxel::containing(eye), "eye crossed voxel boundary");
        self.raycasts
            .update_raycasts(world, eye, UpdateStrategy::Everywhere)?;
        self.blocks.update_eye_and_shift(eye)?;
        self.reconcile_blocks(world)
    }

    /// Reacts to a single block change at `voxel`. Re-casts locally when the
    /// voxel was visible, or when a block was placed on some managed ray's
    /// path; an invisible change elsewhere is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::ObservationNotStarted`] before
    /// [`Self::begin_observation`], and propagates local-update failures.
    pub fn handle_block_changed<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
        eye: Point3<f64>,
        voxel: Voxel,
        new_block: Option<BlockDescriptor>,
    ) -> Result<(), VisibilityError> {
        if !self.observing {
            return Err(VisibilityError::ObservationNotStarted);
        }

        let was_visible = self.raycasts.is_visible(voxel)?;
        let placed_on_path = new_block.is_some() && self.raycasts.any_raycast_penetrates(voxel)?;
        if !was_visible && !placed_on_path {
            return Ok(());
        }

        // Invalidate the cached descriptor so a still-visible voxel gets
        // re-queried with its new contents.
        self.blocks.unset_at_world(voxel, eye)?;
        self.raycasts
            .update_raycasts(world, eye, UpdateStrategy::around(voxel))?;
        self.reconcile_blocks(world)
    }

    /// The vicinity of a world position relative to the current eye.
    #[must_use]
    pub fn vicinity_of(&self, pos: Point3<f64>) -> Option<VicinityName> {
        let eye = self.last_eye?;
        classify_vicinity(pos, eye, &self.radii)
    }

    /// Iterates the visible blocks of one vicinity as
    /// `(world voxel, descriptor)` pairs.
    pub fn visible_in(
        &self,
        name: VicinityName,
    ) -> impl Iterator<Item = (Voxel, &BlockDescriptor)> {
        let eye = self.raycasts.eye_voxel();
        let mask = self
            .masks
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, mask)| mask);
        self.blocks
            .iter_populated()
            .filter(move |(offset, _)| {
                mask.is_some_and(|m| m.get(*offset) == Some(&true))
            })
            .filter_map(move |(offset, descriptor)| eye.map(|e| (offset + e, descriptor)))
    }

    /// Distinct block names visible in one vicinity.
    #[must_use]
    pub fn distinct_block_names(&self, name: VicinityName) -> BTreeSet<&str> {
        self.visible_in(name)
            .filter_map(|(_, descriptor)| self.registry.block_name(descriptor.kind))
            .collect()
    }

    /// The nearest visible voxel holding the named block, optionally
    /// restricted to one distant direction. Linear scan; windows are small.
    #[must_use]
    pub fn nearest_visible_block(
        &self,
        block_name: &str,
        direction: Option<Direction>,
    ) -> Option<Voxel> {
        let eye = self.last_eye?;
        let vicinities: Vec<VicinityName> = match direction {
            Some(d) => vec![VicinityName::Distant(d)],
            None => {
                let mut all = vec![VicinityName::Immediate];
                all.extend(Direction::ALL.map(VicinityName::Distant));
                all
            }
        };

        let mut best: Option<(f64, Voxel)> = None;
        for name in vicinities {
            for (voxel, descriptor) in self.visible_in(name) {
                if self.registry.block_name(descriptor.kind) != Some(block_name) {
                    continue;
                }
                let dist = (voxel.center() - eye).norm_squared();
                if best.is_none_or(|(d, _)| dist < d) {
                    best = Some((dist, voxel));
                }
            }
        }
        best.map(|(_, voxel)| voxel)
    }

    /// Builds the immediate vicinity's full-detail report.
    #[must_use]
    pub fn immediate_report(&self) -> ImmediateReport {
        let eye = self.last_eye.unwrap_or_else(Point3::origin);
        let mut visible_blocks: BTreeMap<String, Vec<(f64, [i32; 3])>> = BTreeMap::new();
        let mut visible_biomes = BTreeSet::new();
        for (voxel, descriptor) in self.visible_in(VicinityName::Immediate) {
            if let Some(name) = self.registry.block_name(descriptor.kind) {
                let dist = (voxel.center() - eye).norm_squared();
                visible_blocks
                    .entry(name.to_owned())
                    .or_default()
                    .push((dist, voxel.as_array()));
            }
            if let Some(biome) = self.registry.biome_name(descriptor.biome) {
                visible_biomes.insert(biome.to_owned());
            }
        }

        let visible_blocks = visible_blocks
            .into_iter()
            .map(|(name, mut coords)| {
                coords.sort_by(|a, b| a.0.total_cmp(&b.0));
                (name, coords.into_iter().map(|(_, c)| c).collect())
            })
            .collect();
        ImmediateReport {
            visible_blocks,
            visible_biomes,
        }
    }

    /// Builds the count-level report for one distant direction, tracking the
    /// nearest visible voxel of each block kind.
    #[must_use]
    pub fn distant_report(&self, direction: Direction) -> DistantReport {
        let eye = self.last_eye.unwrap_or_else(Point3::origin);
        let mut visible_block_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut closest: BTreeMap<String, (f64, [i32; 3])> = BTreeMap::new();
        let mut visible_biomes = BTreeSet::new();
        for (voxel, descriptor) in self.visible_in(VicinityName::Distant(direction)) {
            if let Some(name) = self.registry.block_name(descriptor.kind) {
                *visible_block_counts.entry(name.to_owned()).or_default() += 1;
                let dist = (voxel.center() - eye).norm_squared();
                closest
                    .entry(name.to_owned())
                    .and_modify(|best| {
                        if dist < best.0 {
                            *best = (dist, voxel.as_array());
                        }
                    })
                    .or_insert((dist, voxel.as_array()));
            }
            if let Some(biome) = self.registry.biome_name(descriptor.biome) {
                visible_biomes.insert(biome.to_owned());
            }
        }
        DistantReport {
            visible_block_counts,
            closest_coords: closest
                .into_iter()
                .map(|(name, (_, coords))| (name, coords))
                .collect(),
            visible_biomes,
        }
    }

    /// Snapshots every vicinity into one report.
    #[must_use]
    pub fn surroundings_report(&self) -> SurroundingsReport {
        SurroundingsReport {
            immediate: self.immediate_report(),
            distant: Direction::ALL
                .into_iter()
                .map(|direction| (direction, self.distant_report(direction)))
                .collect(),
        }
    }

    /// Re-derives the block cache from the refreshed visibility: drops
    /// entries no longer visible, queries the oracle for newly visible
    /// voxels, and skips ignored block kinds.
    fn reconcile_blocks<W: WorldOracle + ?Sized>(
        &mut self,
        world: &W,
    ) -> Result<(), VisibilityError> {
        let eye = self
            .raycasts
            .eye_voxel()
            .ok_or(VisibilityError::EyeNotInitialized)?;

        let stale: Vec<Voxel> = self
            .blocks
            .iter_populated()
            .map(|(offset, _)| offset)
            .filter(|&offset| {
                !self
                    .raycasts
                    .is_visible(offset + eye)
                    .unwrap_or(false)
            })
            .collect();
        for offset in stale {
            self.blocks.unset(offset);
        }

        for voxel in self.raycasts.visible_voxels().collect::<Vec<_>>() {
            let offset = voxel - eye;
            if self.blocks.get(offset).is_some() {
                continue;
            }
            let Some(descriptor) = world.block_at(voxel) else {
                continue;
            };
            if self.registry.is_ignored(descriptor.kind) {
                continue;
            }
            self.blocks.set(offset, descriptor);
        }
        Ok(())
    }
}

impl<R: NameRegistry> std::fmt::Debug for VicinitiesManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VicinitiesManager")
            .field("radii", &self.radii)
            .field("observing", &self.observing)
            .field("cached_blocks", &self.blocks.populated_count())
            .finish_non_exhaustive()
    }
}
