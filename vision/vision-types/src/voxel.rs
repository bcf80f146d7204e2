//! Voxel coordinate type.

use nalgebra::{Point3, Vector3};

/// A discrete coordinate identifying one unit cube of the world grid.
///
/// Uses `i32` components so voxels anywhere in the world, including at
/// negative coordinates, can be addressed. Equality and hashing compare the
/// exact integer components.
///
/// # Example
///
/// ```
/// use vision_types::Voxel;
///
/// let voxel = Voxel::new(1, -2, 3);
/// assert_eq!(voxel.x, 1);
/// assert_eq!(voxel.y, -2);
/// assert_eq!(voxel.z, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Voxel {
    /// X component (east axis).
    pub x: i32,
    /// Y component (vertical axis, up positive).
    pub y: i32,
    /// Z component (south axis).
    pub z: i32,
}

impl Voxel {
    /// Creates a voxel coordinate from its components.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel at the origin (0, 0, 0).
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0, 0, 0)
    }

    /// Returns the voxel containing a continuous world position.
    ///
    /// Each component is floored, so positions on a cube's lower faces belong
    /// to that cube.
    ///
    /// # Example
    ///
    /// ```
    /// use vision_types::Voxel;
    /// use nalgebra::Point3;
    ///
    /// assert_eq!(
    ///     Voxel::containing(Point3::new(1.9, -0.1, 3.0)),
    ///     Voxel::new(1, -1, 3),
    /// );
    /// ```
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(position: Point3<f64>) -> Self {
        Self::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// Returns the world-space center of this voxel (+0.5 on each axis).
    ///
    /// # Example
    ///
    /// ```
    /// use vision_types::Voxel;
    /// use nalgebra::Point3;
    ///
    /// assert_eq!(Voxel::new(2, 0, -1).center(), Point3::new(2.5, 0.5, -0.5));
    /// ```
    #[must_use]
    pub fn center(self) -> Point3<f64> {
        Point3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Converts to the world-space point at the voxel's minimum corner.
    #[must_use]
    pub fn to_point(self) -> Point3<f64> {
        Point3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Converts to a floating-point vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Returns the components as an array.
    #[must_use]
    pub const fn as_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance from the origin to this voxel's minimum corner.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.to_vector().norm()
    }

    /// Chebyshev distance to another voxel (maximum per-axis difference).
    ///
    /// # Example
    ///
    /// ```
    /// use vision_types::Voxel;
    ///
    /// let a = Voxel::new(0, 0, 0);
    /// let b = Voxel::new(3, -4, 2);
    /// assert_eq!(a.chebyshev_distance(b), 4);
    /// ```
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        dx.max(dy).max(dz)
    }
}

impl From<[i32; 3]> for Voxel {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<(i32, i32, i32)> for Voxel {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Voxel> for [i32; 3] {
    fn from(voxel: Voxel) -> Self {
        voxel.as_array()
    }
}

impl std::ops::Add for Voxel {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(
            self.x.wrapping_add(other.x),
            self.y.wrapping_add(other.y),
            self.z.wrapping_add(other.z),
        )
    }
}

impl std::ops::Sub for Voxel {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(
            self.x.wrapping_sub(other.x),
            self.y.wrapping_sub(other.y),
            self.z.wrapping_sub(other.z),
        )
    }
}

impl std::ops::Neg for Voxel {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(
            self.x.wrapping_neg(),
            self.y.wrapping_neg(),
            self.z.wrapping_neg(),
        )
    }
}

impl std::fmt::Display for Voxel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
