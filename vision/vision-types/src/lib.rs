//! Core types for observer-relative voxel visibility tracking.
//!
//! This crate provides the foundational value types shared by the visibility
//! engine and its consumers:
//!
//! - [`Voxel`] - Integer voxel coordinates in a unit-cube world grid
//! - [`Orientation`] and [`SphericalAngles`] - View directions from an observer
//! - [`OrientationKey`] - Canonical hashable key for an orientation
//! - [`WorldOracle`] - The seam to the surrounding world (block lookup, raycasts)
//! - [`BlockDescriptor`], [`RayHit`] - Data returned by the oracle
//! - [`NameRegistry`] - Injected read-only block/biome name lookup
//!
//! # Layer 0 Crate
//!
//! This crate has no engine logic and no heavyweight dependencies. It can be
//! consumed by servers, CLI tools, or test harnesses without pulling in the
//! visibility engine itself.
//!
//! # Coordinate Systems
//!
//! The world is a grid of unit cubes. World coordinates are continuous `f64`
//! values with **Y up**; voxel coordinates are discrete `i32` values obtained
//! by flooring each world component. View directions use spherical angles in
//! the mathematical convention adapted to a Y-up world: the polar angle φ is
//! measured from the +Y axis (φ = 0 straight up, φ = π straight down) and the
//! azimuth θ is measured in the XZ plane from +X toward +Z, θ ∈ [0, 2π).
//!
//! # Example
//!
//! ```
//! use vision_types::{Orientation, Voxel};
//! use nalgebra::Point3;
//!
//! // The voxel containing an eye position
//! let eye = Point3::new(10.3, 64.9, -2.1);
//! let eye_voxel = Voxel::containing(eye);
//! assert_eq!(eye_voxel, Voxel::new(10, 64, -3));
//!
//! // A view direction toward a nearby voxel
//! let orientation = Orientation::towards(Voxel::new(0, -2, 0)).unwrap();
//! assert!(orientation.angles().phi() > std::f64::consts::FRAC_PI_2);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod orientation;
mod voxel;
mod world;

pub use error::TypesError;
pub use orientation::{Orientation, OrientationKey, SphericalAngles};
pub use voxel::Voxel;
pub use world::{BiomeId, BlockDescriptor, BlockKindId, NameRegistry, RayHit, WorldOracle};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
