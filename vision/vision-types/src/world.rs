//! The seam between the visibility engine and the surrounding world.

use nalgebra::{Point3, Vector3};

use crate::voxel::Voxel;

/// Compact identifier for a kind of block (stone, dirt, water, ...).
///
/// The mapping from id to name is owned by the embedding application and
/// exposed through a [`NameRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockKindId(pub u32);

/// Compact identifier for a biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BiomeId(pub u32);

/// What the world reports about a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockDescriptor {
    /// The kind of block occupying the voxel.
    pub kind: BlockKindId,
    /// The biome the voxel lies in.
    pub biome: BiomeId,
}

/// The result of a ray striking a solid block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The voxel containing the struck block.
    pub voxel: Voxel,
    /// The exact world-space point where the ray entered the block.
    pub intersection: Point3<f64>,
}

/// Read access to the world the observer stands in.
///
/// The engine never stores an oracle; callers pass one to each operation
/// that needs world state, so the engine stays independent of how the world
/// is loaded, cached, or simulated.
pub trait WorldOracle {
    /// Casts a ray and returns the first solid block it strikes within
    /// `max_distance`, or `None` if the ray escapes.
    ///
    /// `direction` must be a unit vector. Blocks the oracle considers
    /// non-solid (air, and anything else the application ignores) must be
    /// passed through, not reported as hits.
    fn raycast(
        &self,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
    ) -> Option<RayHit>;

    /// Describes the block at a voxel, or `None` if the voxel is outside
    /// loaded world data.
    fn block_at(&self, voxel: Voxel) -> Option<BlockDescriptor>;
}

/// Read-only lookup from compact ids to human-readable names.
///
/// Implementations are supplied by the embedding application, which owns the
/// block and biome palettes.
pub trait NameRegistry {
    /// The name of a block kind, or `None` for an unknown id.
    fn block_name(&self, kind: BlockKindId) -> Option<&str>;

    /// The name of a biome, or `None` for an unknown id.
    fn biome_name(&self, biome: BiomeId) -> Option<&str>;

    /// Whether a block kind should be omitted from observation reports.
    ///
    /// Air is the canonical ignored kind. Defaults to ignoring nothing.
    fn is_ignored(&self, _kind: BlockKindId) -> bool {
        false
    }
}
