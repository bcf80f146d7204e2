//! Error types for the core vision types.

/// Errors that can occur constructing or converting core types.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TypesError {
    /// The azimuthal angle must lie in [0, 2π).
    #[error("theta must be in [0, 2π), got {0}")]
    ThetaOutOfRange(f64),

    /// The polar angle must lie in [0, π].
    #[error("phi must be in [0, π], got {0}")]
    PhiOutOfRange(f64),

    /// A direction vector with zero length has no orientation.
    #[error("cannot derive an orientation from a zero-length direction")]
    ZeroDirection,
}
