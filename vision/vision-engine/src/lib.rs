//! Observer-relative voxel visibility tracking.
//!
//! From a moving first-person viewpoint inside a voxel world, this crate
//! keeps track of which voxels are actually visible, not merely in range:
//! unobstructed along a line of sight from the observer's eyes. It combines:
//!
//! - [`SphereSurfaceHash`] - Angular bucketing of the discretized sphere
//!   shell, with a precomputed occlusion-skip table
//! - [`VisibilityRaycaster`] - A lazy frontier sweep of the angular regions
//!   that skips full-density casting behind solid obstructions
//! - [`VisibilityRaycastManager`] - A fixed budget of evenly distributed
//!   long-lived raycasts and the per-voxel visibility state they maintain
//! - [`VoxelWindow`] - The shifting 3D window re-centered on the observer's
//!   eye voxel as it moves
//! - [`VicinitiesManager`] - The eleven-way spatial partition (immediate
//!   plus ten directions) and the block reports handed to the consumer
//!
//! The world itself stays behind the [`WorldOracle`] trait from
//! [`vision_types`]; the engine performs no physics and makes no decisions
//! about what to do with visibility information.
//!
//! # Example
//!
//! ```no_run
//! use vision_engine::{recommended_raycast_count, ObservationRadii, VicinitiesManager};
//! use vision_types::{NameRegistry, Point3, WorldOracle};
//!
//! fn observe<W: WorldOracle, R: NameRegistry>(world: &W, registry: R) {
//!     let radii = ObservationRadii::new(2.0, 8).unwrap();
//!     let rays = recommended_raycast_count(radii.distant());
//!     let mut manager = VicinitiesManager::new(registry, radii, rays).unwrap();
//!
//!     let eye = Point3::new(10.5, 64.5, 10.5);
//!     manager.begin_observation(world, eye).unwrap();
//!     let report = manager.surroundings_report();
//!     println!("visible biomes: {:?}", report.immediate.visible_biomes);
//! }
//! ```
//!
//! # Concurrency
//!
//! The engine is single-threaded and event-driven: updates run to completion
//! synchronously and the window is only ever consistent at rest between
//! events. Drive it from one thread.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod manager;
mod raycaster;
mod report;
mod sphere_hash;
mod traverse;
mod vicinity;
mod window;

pub use error::VisibilityError;
pub use manager::{
    assert_minimum_raycast_density, minimum_raycast_count, recommended_raycast_count,
    uniform_orientations, HitRecord, UpdateStrategy, VisibilityRaycastManager,
    DEFAULT_LOCAL_NEIGHBORHOOD_RADIUS, RAYCAST_DENSITY_SAFETY_FACTOR,
};
pub use raycaster::VisibilityRaycaster;
pub use report::{DistantReport, ImmediateReport, SurroundingsReport};
pub use sphere_hash::{OcclusionEntry, RegionIdx, SphereSurfaceHash};
pub use traverse::{voxels_along, VoxelTraversal};
pub use vicinity::{
    classify_vicinity, Direction, ObservationRadii, VicinitiesManager, VicinityName,
};
pub use window::VoxelWindow;

// Re-export the foundational types crate.
pub use vision_types::{
    BiomeId, BlockDescriptor, BlockKindId, NameRegistry, Orientation, OrientationKey, RayHit,
    SphericalAngles, Voxel, WorldOracle,
};
