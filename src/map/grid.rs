//! Generic per-node storage for map-sized data

use std::ops::{Index, IndexMut};

use crate::map::point::{MapPoint, MapSize};

/// Dense grid with one value per map node
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    size: MapSize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(size: MapSize) -> Self {
        Self {
            size,
            data: vec![T::default(); size.node_count()],
        }
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    #[inline]
    pub fn get(&self, pt: MapPoint) -> Option<&T> {
        if self.size.contains(pt) {
            Some(&self.data[self.size.index(pt)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pt: MapPoint) -> Option<&mut T> {
        if self.size.contains(pt) {
            let idx = self.size.index(pt);
            Some(&mut self.data[idx])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, pt: MapPoint, value: T) {
        if let Some(slot) = self.get_mut(pt) {
            *slot = value;
        }
    }

    /// Reset every node to the default value
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|v| *v = T::default());
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MapPoint, &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.size.point(i), v))
    }
}

impl<T: Clone + Default> Index<MapPoint> for Grid<T> {
    type Output = T;

    fn index(&self, pt: MapPoint) -> &T {
        &self.data[self.size.index(pt)]
    }
}

impl<T: Clone + Default> IndexMut<MapPoint> for Grid<T> {
    fn index_mut(&mut self, pt: MapPoint) -> &mut T {
        let idx = self.size.index(pt);
        &mut self.data[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut grid: Grid<i32> = Grid::new(MapSize::new(4, 4));
        grid.set(MapPoint::new(1, 2), 7);
        assert_eq!(grid[MapPoint::new(1, 2)], 7);
        assert_eq!(grid.get(MapPoint::new(9, 0)), None);
        grid.clear();
        assert_eq!(grid[MapPoint::new(1, 2)], 0);
    }
}
