//! Error types for the visibility engine.

use vision_types::{TypesError, Voxel};

/// Errors that can occur while constructing or driving the visibility engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VisibilityError {
    /// The observation radius must be a positive number of voxels.
    #[error("observation radius must be positive, got {0}")]
    InvalidRadius(u32),

    /// The immediate radius must be positive and smaller than the distant radius.
    #[error("immediate radius {immediate} must be positive and smaller than distant radius {distant}")]
    InvalidRadii {
        /// The requested immediate radius.
        immediate: f64,
        /// The requested distant radius.
        distant: u32,
    },

    /// The requested raycast count would leave gaps on the sphere surface.
    #[error(
        "{requested} raycasts cannot cover a sphere of radius {radius} without gaps \
         (minimum {minimum})"
    )]
    InsufficientRaycastDensity {
        /// The raycast count the caller asked for.
        requested: usize,
        /// The smallest acceptable raycast count for this radius.
        minimum: usize,
        /// The radius the density was checked against.
        radius: u32,
    },

    /// A world-position accessor was called with an eye position whose voxel
    /// does not match the window's last-known eye voxel.
    #[error("stale eye position: window is centered on {expected}, caller claims {actual}")]
    StaleEyePosition {
        /// The eye voxel the window is currently centered on.
        expected: Voxel,
        /// The eye voxel implied by the caller's argument.
        actual: Voxel,
    },

    /// A window operation requires an eye voxel that was never established.
    #[error("the window has no eye voxel yet; run a full update first")]
    EyeNotInitialized,

    /// The window's initial eye voxel was set twice.
    #[error("the window's eye voxel is already initialized")]
    EyeAlreadyInitialized,

    /// An observation-session method was called before `begin_observation`.
    #[error("observation has not been started")]
    ObservationNotStarted,

    /// `begin_observation` was called twice for the same session.
    #[error("observation has already been started")]
    ObservationAlreadyStarted,

    /// A raycast's previously recorded hit is missing from the hit index.
    #[error("no hit recorded at {voxel} for the raycast being cleared")]
    HitNotRecorded {
        /// The voxel the stale hit was expected at.
        voxel: Voxel,
    },

    /// The world oracle reported a hit beyond the configured window. This
    /// signals a geometry mismatch between the engine and the oracle.
    #[error("raycast hit at {voxel} falls outside the radius-{radius} window")]
    HitOutsideWindow {
        /// The voxel the oracle claims was hit.
        voxel: Voxel,
        /// The window radius the hit should have been inside.
        radius: u32,
    },

    /// A core type failed to construct.
    #[error(transparent)]
    Types(#[from] TypesError),
}
