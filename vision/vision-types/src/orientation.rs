//! View directions and their spherical-angle representation.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use crate::error::TypesError;
use crate::voxel::Voxel;

/// A pair of validated spherical angles in a Y-up world.
///
/// `theta` is the azimuth in the XZ plane, measured from +X toward +Z, in
/// [0, 2π). `phi` is the polar angle from the +Y axis, in [0, π]: 0 points
/// straight up and π straight down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphericalAngles {
    theta: f64,
    phi: f64,
}

impl SphericalAngles {
    /// Creates a validated angle pair.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ThetaOutOfRange`] unless θ ∈ [0, 2π), and
    /// [`TypesError::PhiOutOfRange`] unless φ ∈ [0, π].
    pub fn new(theta: f64, phi: f64) -> Result<Self, TypesError> {
        if !(0.0..TAU).contains(&theta) {
            return Err(TypesError::ThetaOutOfRange(theta));
        }
        if !(0.0..=PI).contains(&phi) {
            return Err(TypesError::PhiOutOfRange(phi));
        }
        // Collapse -0.0 to +0.0 so bit-exact keys stay canonical.
        let theta = if theta == 0.0 { 0.0 } else { theta };
        let phi = if phi == 0.0 { 0.0 } else { phi };
        Ok(Self { theta, phi })
    }

    /// The azimuthal angle, in [0, 2π).
    #[must_use]
    pub const fn theta(self) -> f64 {
        self.theta
    }

    /// The polar angle from +Y, in [0, π].
    #[must_use]
    pub const fn phi(self) -> f64 {
        self.phi
    }
}

/// A canonical, hashable key identifying an [`Orientation`].
///
/// Two orientations compare equal under this key exactly when their spherical
/// angles are bit-identical, which matches the discrimination of the angles
/// themselves while staying allocation-free. The [`std::fmt::Display`] form is
/// `"theta,phi"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrientationKey {
    theta_bits: u64,
    phi_bits: u64,
}

impl OrientationKey {
    /// The azimuthal angle this key encodes.
    #[must_use]
    pub fn theta(self) -> f64 {
        f64::from_bits(self.theta_bits)
    }

    /// The polar angle this key encodes.
    #[must_use]
    pub fn phi(self) -> f64 {
        f64::from_bits(self.phi_bits)
    }
}

impl std::fmt::Display for OrientationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.theta(), self.phi())
    }
}

/// A direction from an observer, stored both as a unit vector and as
/// spherical angles.
///
/// The two representations are computed once at construction and kept
/// consistent thereafter; the type is plain `Copy` data.
///
/// # Example
///
/// ```
/// use vision_types::{Orientation, Voxel};
///
/// let down = Orientation::down();
/// assert!((down.angles().phi() - std::f64::consts::PI).abs() < 1e-12);
///
/// let east = Orientation::towards(Voxel::new(4, 0, 0)).unwrap();
/// assert!((east.unit().x - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    unit: Vector3<f64>,
    angles: SphericalAngles,
}

impl Orientation {
    /// Creates an orientation from a direction vector.
    ///
    /// The vector is normalized; it does not need unit length.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ZeroDirection`] for a zero-length vector.
    pub fn from_vector(direction: Vector3<f64>) -> Result<Self, TypesError> {
        let norm = direction.norm();
        if norm < f64::EPSILON {
            return Err(TypesError::ZeroDirection);
        }
        let unit = direction / norm;

        // Polar angle from +Y; clamp guards against rounding past ±1.
        let phi = unit.y.clamp(-1.0, 1.0).acos();
        // Azimuth in the XZ plane, normalized into [0, 2π). A tiny negative
        // atan2 result can round to exactly TAU after the adjustment.
        let mut theta = unit.z.atan2(unit.x);
        if theta < 0.0 {
            theta += TAU;
        }
        if theta >= TAU {
            theta = 0.0;
        }
        let angles = SphericalAngles::new(theta, phi)?;
        Ok(Self { unit, angles })
    }

    /// Creates the orientation pointing from the origin toward a voxel offset.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ZeroDirection`] for the origin offset.
    pub fn towards(offset: Voxel) -> Result<Self, TypesError> {
        Self::from_vector(offset.to_vector())
    }

    /// Creates an orientation from validated spherical angles.
    #[must_use]
    pub fn from_angles(angles: SphericalAngles) -> Self {
        let (sin_phi, cos_phi) = angles.phi().sin_cos();
        let (sin_theta, cos_theta) = angles.theta().sin_cos();
        let unit = Vector3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
        Self { unit, angles }
    }

    /// The orientation pointing straight down (−Y).
    #[must_use]
    pub fn down() -> Self {
        Self {
            unit: Vector3::new(0.0, -1.0, 0.0),
            angles: SphericalAngles { theta: 0.0, phi: PI },
        }
    }

    /// The orientation pointing straight up (+Y).
    #[must_use]
    pub fn up() -> Self {
        Self {
            unit: Vector3::new(0.0, 1.0, 0.0),
            angles: SphericalAngles {
                theta: 0.0,
                phi: 0.0,
            },
        }
    }

    /// The unit direction vector.
    #[must_use]
    pub const fn unit(&self) -> Vector3<f64> {
        self.unit
    }

    /// The spherical angles.
    #[must_use]
    pub const fn angles(&self) -> SphericalAngles {
        self.angles
    }

    /// The canonical map key for this orientation.
    #[must_use]
    pub fn key(&self) -> OrientationKey {
        OrientationKey {
            theta_bits: self.angles.theta().to_bits(),
            phi_bits: self.angles.phi().to_bits(),
        }
    }

    /// Angular distance to another orientation, in radians [0, π].
    ///
    /// Computed from the clamped dot product of the unit vectors, which is
    /// numerically stable and immune to azimuth wraparound.
    ///
    /// # Example
    ///
    /// ```
    /// use vision_types::Orientation;
    ///
    /// let up = Orientation::up();
    /// let down = Orientation::down();
    /// assert!((up.angular_distance_to(&down) - std::f64::consts::PI).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn angular_distance_to(&self, other: &Self) -> f64 {
        self.unit.dot(&other.unit).clamp(-1.0, 1.0).acos()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_angle_validation() {
        assert!(SphericalAngles::new(0.0, 0.0).is_ok());
        assert!(SphericalAngles::new(TAU - 1e-12, PI).is_ok());
        assert!(matches!(
            SphericalAngles::new(TAU, 0.0),
            Err(TypesError::ThetaOutOfRange(_))
        ));
        assert!(matches!(
            SphericalAngles::new(-0.1, 0.0),
            Err(TypesError::ThetaOutOfRange(_))
        ));
        assert!(matches!(
            SphericalAngles::new(0.0, PI + 0.1),
            Err(TypesError::PhiOutOfRange(_))
        ));
    }

    #[test]
    fn test_zero_vector_rejected() {
        assert!(matches!(
            Orientation::from_vector(Vector3::zeros()),
            Err(TypesError::ZeroDirection)
        ));
        assert!(Orientation::towards(Voxel::origin()).is_err());
    }

    #[test]
    fn test_axis_directions() {
        let east = Orientation::from_vector(Vector3::x()).unwrap();
        assert_relative_eq!(east.angles().theta(), 0.0);
        assert_relative_eq!(east.angles().phi(), FRAC_PI_2);

        let south = Orientation::from_vector(Vector3::z()).unwrap();
        assert_relative_eq!(south.angles().theta(), FRAC_PI_2);

        let up = Orientation::from_vector(Vector3::y()).unwrap();
        assert_relative_eq!(up.angles().phi(), 0.0);

        let down = Orientation::from_vector(-Vector3::y()).unwrap();
        assert_relative_eq!(down.angles().phi(), PI);
    }

    #[test]
    fn test_angles_vector_roundtrip() {
        for &(theta, phi) in &[
            (0.3, 0.7),
            (3.9, 2.2),
            (5.5, FRAC_PI_2),
            (0.0, 0.01),
            (6.2, 3.1),
        ] {
            let angles = SphericalAngles::new(theta, phi).unwrap();
            let orientation = Orientation::from_angles(angles);
            let back = Orientation::from_vector(orientation.unit()).unwrap();
            assert_relative_eq!(back.angles().theta(), theta, epsilon = 1e-10);
            assert_relative_eq!(back.angles().phi(), phi, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_key_equality_matches_angles() {
        let a = Orientation::towards(Voxel::new(3, 1, -2)).unwrap();
        let b = Orientation::towards(Voxel::new(6, 2, -4)).unwrap();
        // Parallel offsets normalize to the same direction and key.
        assert_eq!(a.key(), b.key());

        let c = Orientation::towards(Voxel::new(3, 1, 2)).unwrap();
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_key_display_roundtrips_angles() {
        let orientation = Orientation::towards(Voxel::new(1, 2, 3)).unwrap();
        let key = orientation.key();
        assert_relative_eq!(key.theta(), orientation.angles().theta());
        assert_relative_eq!(key.phi(), orientation.angles().phi());
        let text = key.to_string();
        assert!(text.contains(','));
    }

    #[test]
    fn test_angular_distance() {
        let east = Orientation::from_vector(Vector3::x()).unwrap();
        let south = Orientation::from_vector(Vector3::z()).unwrap();
        assert_relative_eq!(east.angular_distance_to(&south), FRAC_PI_2);
        assert_relative_eq!(east.angular_distance_to(&east), 0.0);
    }

    #[test]
    fn test_theta_near_the_wraparound_stays_in_range() {
        // atan2 returns a tiny negative angle here; adding TAU rounds to
        // exactly TAU, which must collapse back to 0 rather than fail
        // validation.
        let orientation = Orientation::from_vector(Vector3::new(1.0, 0.0, -1e-17)).unwrap();
        assert_eq!(orientation.angles().theta(), 0.0);
    }

    #[test]
    fn test_negative_zero_theta_is_canonical() {
        // atan2 can produce -0.0; keys for +X-ish directions must agree.
        let a = Orientation::from_vector(Vector3::new(1.0, 0.0, 0.0)).unwrap();
        let b = Orientation::from_vector(Vector3::new(1.0, 0.0, -0.0)).unwrap();
        assert_eq!(a.key(), b.key());
    }
}
