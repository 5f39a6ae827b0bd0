//! Dense 3-D storage with x-fastest layout.

use std::ops::{Index, IndexMut};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Resolution of a 3-D array. A planar grid has `z == 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size3 {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Size3 {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_planar(&self) -> bool {
        self.z == 1
    }

    /// Extent along `axis` (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> usize {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.y + j) * self.x + i
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let i = idx % self.x;
        let j = (idx / self.x) % self.y;
        let k = idx / (self.x * self.y);
        (i, j, k)
    }

    /// Same size grown by one along `axis`; the layout of a face array.
    pub fn staggered(&self, axis: usize) -> Self {
        let mut s = *self;
        match axis {
            0 => s.x += 1,
            1 => s.y += 1,
            _ => s.z += 1,
        }
        s
    }

    /// Next multigrid level: even axes halve, unit axes stay at one.
    ///
    /// Returns `None` when an axis is odd and larger than one, or when the
    /// grid is already a single cell.
    pub fn coarsened(&self) -> Option<Self> {
        fn halve(n: usize) -> Option<usize> {
            match n {
                1 => Some(1),
                n if n % 2 == 0 => Some(n / 2),
                _ => None,
            }
        }
        let next = Self::new(halve(self.x)?, halve(self.y)?, halve(self.z)?);
        (next != *self).then_some(next)
    }
}

/// Owned 3-D array. Indexable by flat index or `(i, j, k)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array3<T> {
    size: Size3,
    data: Vec<T>,
}

impl<T: Clone + Default> Array3<T> {
    pub fn new(size: Size3) -> Self {
        Self::filled(size, T::default())
    }

    pub fn filled(size: Size3, value: T) -> Self {
        Self {
            size,
            data: vec![value; size.len()],
        }
    }

    /// Changes the resolution. Contents reset to the default when the size
    /// changes and are left alone otherwise.
    pub fn resize(&mut self, size: Size3) {
        if self.size != size {
            self.size = size;
            self.data.clear();
            self.data.resize(size.len(), T::default());
        }
    }

    /// Copies `other` into `self`, reusing the allocation.
    pub fn set(&mut self, other: &Array3<T>) {
        self.size = other.size;
        self.data.clone_from(&other.data);
    }
}

impl<T> Array3<T> {
    #[inline]
    pub fn size(&self) -> Size3 {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        if i < self.size.x && j < self.size.y && k < self.size.z {
            self.data.get(self.size.index(i, j, k))
        } else {
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T: Copy + Send + Sync> Array3<T> {
    pub fn fill(&mut self, value: T) {
        self.data.par_iter_mut().for_each(|v| *v = value);
    }

    /// Overwrites every element with `f(i, j, k)`, in parallel.
    pub fn par_fill_with<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, usize) -> T + Sync,
    {
        let size = self.size;
        self.data.par_iter_mut().enumerate().for_each(|(idx, v)| {
            let (i, j, k) = size.coords(idx);
            *v = f(i, j, k);
        });
    }
}

impl<T> Index<usize> for Array3<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &T {
        &self.data[idx]
    }
}

impl<T> IndexMut<usize> for Array3<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.data[idx]
    }
}

impl<T> Index<(usize, usize, usize)> for Array3<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &T {
        &self.data[self.size.index(i, j, k)]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Array3<T> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut T {
        let idx = self.size.index(i, j, k);
        &mut self.data[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_invert_index() {
        let size = Size3::new(5, 3, 4);
        for idx in 0..size.len() {
            let (i, j, k) = size.coords(idx);
            assert_eq!(size.index(i, j, k), idx);
        }
    }

    #[test]
    fn coarsening_stops_on_odd_axis() {
        assert_eq!(Size3::new(128, 128, 1).coarsened(), Some(Size3::new(64, 64, 1)));
        assert_eq!(Size3::new(6, 4, 1).coarsened(), Some(Size3::new(3, 2, 1)));
        assert_eq!(Size3::new(3, 2, 1).coarsened(), None);
        assert_eq!(Size3::new(1, 1, 1).coarsened(), None);
        assert_eq!(Size3::new(2, 1, 1).coarsened(), Some(Size3::new(1, 1, 1)));
    }

    #[test]
    fn resize_keeps_contents_when_unchanged() {
        let mut a = Array3::filled(Size3::new(2, 2, 1), 3.0);
        a.resize(Size3::new(2, 2, 1));
        assert!(a.iter().all(|&v| v == 3.0));
        a.resize(Size3::new(4, 2, 1));
        assert_eq!(a.len(), 8);
        assert!(a.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn par_fill_with_sees_coordinates() {
        let mut a = Array3::<usize>::new(Size3::new(3, 2, 2));
        a.par_fill_with(|i, j, k| i + 10 * j + 100 * k);
        assert_eq!(a[(2, 1, 1)], 112);
        assert_eq!(a[(0, 0, 0)], 0);
    }
}
