//! The shifting 3D window of per-voxel state around the observer's eyes.

use nalgebra::Point3;
use tracing::debug;
use vision_types::Voxel;

use crate::error::VisibilityError;

/// A dense cube of optional per-voxel values, indexed by offset from the
/// voxel containing the observer's eyes.
///
/// The side length is `2 * radius + 1`, so offsets range over
/// `[-radius, radius]` on each axis and the center cell is always the eye
/// voxel itself. World-position accessors translate through the last-known
/// eye voxel and reject callers whose eye argument has gone stale.
///
/// # Example
///
/// ```
/// use vision_engine::VoxelWindow;
/// use vision_types::{Point3, Voxel};
///
/// let mut window: VoxelWindow<u8> = VoxelWindow::new(2).unwrap();
/// let eye = Point3::new(10.3, 64.9, 10.1);
/// window.set_initial_eye(Voxel::containing(eye)).unwrap();
///
/// assert!(window.set_at_world(Voxel::new(10, 64, 12), eye, 7).unwrap());
/// assert_eq!(window.get(Voxel::new(0, 0, 2)), Some(&7));
/// ```
#[derive(Debug, Clone)]
pub struct VoxelWindow<T> {
    radius: u32,
    dim: usize,
    cells: Vec<Option<T>>,
    eye_voxel: Option<Voxel>,
}

impl<T> VoxelWindow<T> {
    /// Creates an empty window covering offsets in `[-radius, radius]`.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::InvalidRadius`] when `radius` is zero.
    pub fn new(radius: u32) -> Result<Self, VisibilityError> {
        if radius == 0 {
            return Err(VisibilityError::InvalidRadius(radius));
        }
        let dim = 2 * radius as usize + 1;
        let mut cells = Vec::new();
        cells.resize_with(dim * dim * dim, || None);
        Ok(Self {
            radius,
            dim,
            cells,
            eye_voxel: None,
        })
    }

    /// The window radius.
    #[must_use]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// The eye voxel the window is currently centered on, once established.
    #[must_use]
    pub fn eye_voxel(&self) -> Option<Voxel> {
        self.eye_voxel
    }

    /// Establishes the initial eye voxel.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::EyeAlreadyInitialized`] if called twice;
    /// later re-centering goes through [`Self::update_eye_and_shift`].
    pub fn set_initial_eye(&mut self, eye_voxel: Voxel) -> Result<(), VisibilityError> {
        if self.eye_voxel.is_some() {
            return Err(VisibilityError::EyeAlreadyInitialized);
        }
        self.eye_voxel = Some(eye_voxel);
        Ok(())
    }

    /// Maps an offset to its dense cell index, or `None` when out of bounds.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn offset_to_index(&self, offset: Voxel) -> Option<usize> {
        let r = self.radius as i32;
        if offset.x.abs() > r || offset.y.abs() > r || offset.z.abs() > r {
            return None;
        }
        let x = (offset.x + r) as usize;
        let y = (offset.y + r) as usize;
        let z = (offset.z + r) as usize;
        Some((x * self.dim + y) * self.dim + z)
    }

    /// Maps a dense cell index back to its offset. Inverse of
    /// [`Self::offset_to_index`] for in-bounds offsets.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn index_to_offset(&self, index: usize) -> Voxel {
        let r = self.radius as i32;
        let z = (index % self.dim) as i32 - r;
        let y = ((index / self.dim) % self.dim) as i32 - r;
        let x = (index / (self.dim * self.dim)) as i32 - r;
        Voxel::new(x, y, z)
    }

    /// The value stored at an offset, if any.
    #[must_use]
    pub fn get(&self, offset: Voxel) -> Option<&T> {
        let index = self.offset_to_index(offset)?;
        self.cells[index].as_ref()
    }

    /// Mutable access to the value stored at an offset, if any.
    pub fn get_mut(&mut self, offset: Voxel) -> Option<&mut T> {
        let index = self.offset_to_index(offset)?;
        self.cells[index].as_mut()
    }

    /// Stores a value at an offset, returning the previous value. Returns
    /// `None` without storing when the offset is out of bounds.
    pub fn set(&mut self, offset: Voxel, value: T) -> Option<Option<T>> {
        let index = self.offset_to_index(offset)?;
        Some(self.cells[index].replace(value))
    }

    /// Clears the value at an offset, returning it.
    pub fn unset(&mut self, offset: Voxel) -> Option<T> {
        let index = self.offset_to_index(offset)?;
        self.cells[index].take()
    }

    /// Translates a world voxel into a window offset, checking the caller's
    /// eye position against the window's.
    fn world_to_offset(
        &self,
        world_voxel: Voxel,
        claimed_eye: Point3<f64>,
    ) -> Result<Voxel, VisibilityError> {
        let expected = self.eye_voxel.ok_or(VisibilityError::EyeNotInitialized)?;
        let actual = Voxel::containing(claimed_eye);
        if actual != expected {
            return Err(VisibilityError::StaleEyePosition { expected, actual });
        }
        Ok(world_voxel - expected)
    }

    /// The value stored for a world voxel. `Ok(None)` covers both an empty
    /// cell and a voxel outside the window.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::StaleEyePosition`] when `eye` no longer
    /// matches the window's eye voxel, and
    /// [`VisibilityError::EyeNotInitialized`] before the first update.
    pub fn get_at_world(
        &self,
        world_voxel: Voxel,
        eye: Point3<f64>,
    ) -> Result<Option<&T>, VisibilityError> {
        let offset = self.world_to_offset(world_voxel, eye)?;
        Ok(self.get(offset))
    }

    /// Mutable access to the value stored for a world voxel.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::get_at_world`].
    pub fn get_mut_at_world(
        &mut self,
        world_voxel: Voxel,
        eye: Point3<f64>,
    ) -> Result<Option<&mut T>, VisibilityError> {
        let offset = self.world_to_offset(world_voxel, eye)?;
        Ok(self.get_mut(offset))
    }

    /// Stores a value for a world voxel. Returns `Ok(false)` when the voxel
    /// lies outside the window (nothing stored).
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::get_at_world`].
    pub fn set_at_world(
        &mut self,
        world_voxel: Voxel,
        eye: Point3<f64>,
        value: T,
    ) -> Result<bool, VisibilityError> {
        let offset = self.world_to_offset(world_voxel, eye)?;
        Ok(self.set(offset, value).is_some())
    }

    /// Clears the value for a world voxel, returning it.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::get_at_world`].
    pub fn unset_at_world(
        &mut self,
        world_voxel: Voxel,
        eye: Point3<f64>,
    ) -> Result<Option<T>, VisibilityError> {
        let offset = self.world_to_offset(world_voxel, eye)?;
        Ok(self.unset(offset))
    }

    /// Re-centers the window on the voxel containing `eye`.
    ///
    /// A fractional move within the same voxel is a no-op returning
    /// `Ok(None)`. On a voxel crossing, every populated cell is translated by
    /// the integer delta between old and new eye voxel; cells landing outside
    /// the bounds are dropped and freshly in-bounds cells are left empty.
    /// Returns the delta applied to stored offsets.
    ///
    /// # Errors
    ///
    /// Returns [`VisibilityError::EyeNotInitialized`] before the first
    /// [`Self::set_initial_eye`].
    pub fn update_eye_and_shift(
        &mut self,
        eye: Point3<f64>,
    ) -> Result<Option<Voxel>, VisibilityError> {
        let old = self.eye_voxel.ok_or(VisibilityError::EyeNotInitialized)?;
        let new = Voxel::containing(eye);
        if new == old {
            return Ok(None);
        }

        // Drain everything first, then reinsert at translated offsets. This
        // sidesteps the in-place ordering hazard where a destination cell is
        // itself a pending shift source.
        let delta = old - new;
        let mut carried = Vec::new();
        for index in 0..self.cells.len() {
            if let Some(value) = self.cells[index].take() {
                carried.push((self.index_to_offset(index), value));
            }
        }
        let mut dropped = 0usize;
        for (offset, value) in carried {
            if self.set(offset + delta, value).is_none() {
                dropped += 1;
            }
        }

        self.eye_voxel = Some(new);
        debug!(%old, %new, %delta, dropped, "shifted voxel window");
        Ok(Some(delta))
    }

    /// Iterates populated cells as `(offset, value)` pairs, in index order.
    pub fn iter_populated(&self) -> impl Iterator<Item = (Voxel, &T)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.as_ref().map(|v| (self.index_to_offset(index), v)))
    }

    /// Number of populated cells.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Clears every cell, keeping the eye voxel.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn eye() -> Point3<f64> {
        Point3::new(10.3, 64.9, 10.1)
    }

    #[test]
    fn test_zero_radius_rejected() {
        assert!(matches!(
            VoxelWindow::<u8>::new(0),
            Err(VisibilityError::InvalidRadius(0))
        ));
    }

    #[test]
    fn test_index_offset_bijection() {
        let window: VoxelWindow<u8> = VoxelWindow::new(3).unwrap();
        for x in -3..=3 {
            for y in -3..=3 {
                for z in -3..=3 {
                    let offset = Voxel::new(x, y, z);
                    let index = window.offset_to_index(offset).unwrap();
                    assert_eq!(window.index_to_offset(index), offset);
                }
            }
        }
        assert!(window.offset_to_index(Voxel::new(4, 0, 0)).is_none());
        assert!(window.offset_to_index(Voxel::new(0, -4, 0)).is_none());
    }

    #[test]
    fn test_world_accessors_translate_through_eye_voxel() {
        let mut window: VoxelWindow<&str> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::containing(eye())).unwrap();

        assert!(window
            .set_at_world(Voxel::new(10, 63, 10), eye(), "below")
            .unwrap());
        assert_eq!(window.get(Voxel::new(0, -1, 0)), Some(&"below"));
        assert_eq!(
            window.get_at_world(Voxel::new(10, 63, 10), eye()).unwrap(),
            Some(&"below")
        );

        // Outside the radius-2 window: nothing stored, no error.
        assert!(!window
            .set_at_world(Voxel::new(20, 64, 10), eye(), "far")
            .unwrap());
    }

    #[test]
    fn test_stale_eye_is_rejected() {
        let mut window: VoxelWindow<u8> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::containing(eye())).unwrap();

        let stale = Point3::new(15.0, 64.5, 10.5);
        let err = window.get_at_world(Voxel::new(10, 64, 10), stale).unwrap_err();
        assert!(matches!(err, VisibilityError::StaleEyePosition { .. }));
    }

    #[test]
    fn test_uninitialized_eye_is_rejected() {
        let window: VoxelWindow<u8> = VoxelWindow::new(2).unwrap();
        assert!(matches!(
            window.get_at_world(Voxel::new(0, 0, 0), eye()),
            Err(VisibilityError::EyeNotInitialized)
        ));
    }

    #[test]
    fn test_double_initialization_is_rejected() {
        let mut window: VoxelWindow<u8> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::origin()).unwrap();
        assert!(matches!(
            window.set_initial_eye(Voxel::origin()),
            Err(VisibilityError::EyeAlreadyInitialized)
        ));
    }

    #[test]
    fn test_fractional_move_is_a_noop() {
        let mut window: VoxelWindow<u8> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::containing(eye())).unwrap();
        window.set(Voxel::new(1, 0, 0), 9);

        let delta = window.update_eye_and_shift(Point3::new(10.9, 64.1, 10.7)).unwrap();
        assert_eq!(delta, None);
        assert_eq!(window.get(Voxel::new(1, 0, 0)), Some(&9));
    }

    #[test]
    fn test_shift_translates_scattered_values() {
        let mut window: VoxelWindow<i32> = VoxelWindow::new(3).unwrap();
        window.set_initial_eye(Voxel::new(10, 64, 10)).unwrap();

        let scattered = [
            (Voxel::new(0, 0, 3), 1),
            (Voxel::new(-2, 1, 0), 2),
            (Voxel::new(3, 3, 3), 3),
            (Voxel::new(0, -3, 0), 4),
            (Voxel::new(1, 1, -2), 5),
        ];
        for (offset, value) in scattered {
            window.set(offset, value);
        }

        // Eye crosses to (11, 64, 12): delta = old - new = (-1, 0, -2).
        let delta = window
            .update_eye_and_shift(Point3::new(11.5, 64.5, 12.5))
            .unwrap()
            .unwrap();
        assert_eq!(delta, Voxel::new(-1, 0, -2));

        for (offset, value) in scattered {
            let shifted = offset + delta;
            match window.offset_to_index(shifted) {
                Some(_) => assert_eq!(window.get(shifted), Some(&value)),
                None => {} // dropped out of bounds
            }
        }
        // (3,3,3) shifted to (2,3,1): survives. (0,0,3) shifted to (-1,0,1).
        assert_eq!(window.get(Voxel::new(2, 3, 1)), Some(&3));
        assert_eq!(window.get(Voxel::new(-1, 0, 1)), Some(&1));
        // Every survivor equals the pre-shift value at (offset - delta).
        for (offset, value) in window.iter_populated() {
            let source = offset - delta;
            assert!(scattered.contains(&(source, *value)));
        }
    }

    #[test]
    fn test_shift_handles_chained_destinations() {
        // Values one cell apart along the shift axis: each destination is the
        // other's origin.
        let mut window: VoxelWindow<i32> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::new(0, 0, 0)).unwrap();
        window.set(Voxel::new(0, 0, 0), 10);
        window.set(Voxel::new(0, 0, -1), 20);
        window.set(Voxel::new(0, 0, -2), 30);

        // Eye moves +1 in z: delta = (0, 0, -1).
        window
            .update_eye_and_shift(Point3::new(0.5, 0.5, 1.5))
            .unwrap();
        assert_eq!(window.get(Voxel::new(0, 0, -1)), Some(&10));
        assert_eq!(window.get(Voxel::new(0, 0, -2)), Some(&20));
        // 30 shifted past the boundary and was dropped.
        assert_eq!(window.populated_count(), 2);
    }

    #[test]
    fn test_shift_drops_out_of_bounds_and_leaves_new_cells_empty() {
        let mut window: VoxelWindow<i32> = VoxelWindow::new(2).unwrap();
        window.set_initial_eye(Voxel::new(0, 0, 0)).unwrap();
        window.set(Voxel::new(-2, 0, 0), 1);

        // Eye moves +1 in x: delta = (-1, 0, 0); the value falls off the edge.
        window
            .update_eye_and_shift(Point3::new(1.5, 0.5, 0.5))
            .unwrap();
        assert_eq!(window.populated_count(), 0);
        assert_eq!(window.get(Voxel::new(2, 0, 0)), None);
    }
}
