//! Hex coordinate system on a wrap-around map (offset coordinates)
//!
//! Odd rows are shifted half a node to the east. Both axes wrap, so every
//! node has exactly six neighbours.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Map node coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct MapPoint {
    pub x: u16,
    pub y: u16,
}

impl MapPoint {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction enum for hex neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    West,
    NorthWest,
    NorthEast,
    East,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// All directions, clockwise starting west
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// Get opposite direction
    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 3)
    }
}

/// Dimensions of a wrap-around map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u16,
    pub height: u16,
}

impl MapSize {
    pub fn new(width: u16, height: u16) -> Self {
        debug_assert!(width > 0 && height > 0 && height % 2 == 0);
        Self { width, height }
    }

    pub fn node_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn index(&self, pt: MapPoint) -> usize {
        pt.y as usize * self.width as usize + pt.x as usize
    }

    pub fn point(&self, index: usize) -> MapPoint {
        let w = self.width as usize;
        MapPoint::new((index % w) as u16, (index / w) as u16)
    }

    pub fn contains(&self, pt: MapPoint) -> bool {
        pt.x < self.width && pt.y < self.height
    }

    /// All map points in row-major order
    pub fn points(&self) -> impl Iterator<Item = MapPoint> + '_ {
        (0..self.node_count()).map(move |i| self.point(i))
    }

    fn wrap_x(&self, x: i32) -> u16 {
        x.rem_euclid(self.width as i32) as u16
    }

    fn wrap_y(&self, y: i32) -> u16 {
        y.rem_euclid(self.height as i32) as u16
    }

    /// Neighbour of `pt` in direction `dir`
    pub fn neighbor(&self, pt: MapPoint, dir: Direction) -> MapPoint {
        let x = pt.x as i32;
        let y = pt.y as i32;
        let odd = (pt.y & 1) as i32;
        let (nx, ny) = match dir {
            Direction::West => (x - 1, y),
            Direction::East => (x + 1, y),
            Direction::NorthWest => (x - 1 + odd, y - 1),
            Direction::NorthEast => (x + odd, y - 1),
            Direction::SouthWest => (x - 1 + odd, y + 1),
            Direction::SouthEast => (x + odd, y + 1),
        };
        MapPoint::new(self.wrap_x(nx), self.wrap_y(ny))
    }

    /// Get all 6 neighbouring points
    pub fn neighbors(&self, pt: MapPoint) -> [MapPoint; 6] {
        Direction::ALL.map(|dir| self.neighbor(pt, dir))
    }

    /// Hex distance, taking the shortest way around the map edges
    pub fn distance(&self, a: MapPoint, b: MapPoint) -> u32 {
        let (w, h) = (self.width as i32, self.height as i32);
        let mut best = u32::MAX;
        for ky in [-1, 0, 1] {
            for kx in [-1, 0, 1] {
                let d = cube_distance(
                    a.x as i32,
                    a.y as i32,
                    b.x as i32 + kx * w,
                    b.y as i32 + ky * h,
                );
                best = best.min(d);
            }
        }
        best
    }

    /// Points within `radius` of `center`, nearest first, center included
    pub fn points_in_radius(&self, center: MapPoint, radius: u32) -> Vec<MapPoint> {
        let mut result = vec![center];
        let mut seen = AHashSet::new();
        seen.insert(center);
        let mut frontier = VecDeque::from([(center, 0u32)]);
        while let Some((pt, dist)) = frontier.pop_front() {
            if dist >= radius {
                continue;
            }
            for next in self.neighbors(pt) {
                if seen.insert(next) {
                    result.push(next);
                    frontier.push_back((next, dist + 1));
                }
            }
        }
        result
    }
}

/// Distance between two unwrapped offset coordinates
fn cube_distance(x1: i32, y1: i32, x2: i32, y2: i32) -> u32 {
    // y may be negative after unwrapping, parity still follows y & 1
    let q1 = x1 - (y1 - (y1 & 1)) / 2;
    let q2 = x2 - (y2 - (y2 & 1)) / 2;
    let dq = q2 - q1;
    let dr = y2 - y1;
    ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> MapSize {
        MapSize::new(32, 32)
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let size = size();
        for pt in [MapPoint::new(5, 4), MapPoint::new(5, 5), MapPoint::new(0, 0)] {
            for n in size.neighbors(pt) {
                assert_eq!(size.distance(pt, n), 1, "{pt} -> {n}");
            }
        }
    }

    #[test]
    fn test_opposite_direction_returns() {
        let size = size();
        let pt = MapPoint::new(10, 7);
        for dir in Direction::ALL {
            let there = size.neighbor(pt, dir);
            assert_eq!(size.neighbor(there, dir.opposite()), pt);
        }
    }

    #[test]
    fn test_wrap_around() {
        let size = size();
        assert_eq!(size.neighbor(MapPoint::new(0, 0), Direction::West), MapPoint::new(31, 0));
        assert_eq!(size.neighbor(MapPoint::new(3, 0), Direction::NorthEast), MapPoint::new(3, 31));
        assert_eq!(size.distance(MapPoint::new(0, 3), MapPoint::new(31, 3)), 1);
    }

    #[test]
    fn test_points_in_radius_count() {
        let size = size();
        let pts = size.points_in_radius(MapPoint::new(10, 10), 2);
        assert_eq!(pts.len(), 19);
        assert_eq!(pts[0], MapPoint::new(10, 10));
        assert!(pts.iter().all(|&p| size.distance(MapPoint::new(10, 10), p) <= 2));
    }

    #[test]
    fn test_points_in_radius_nearest_first() {
        let size = size();
        let center = MapPoint::new(15, 16);
        let pts = size.points_in_radius(center, 4);
        let dists: Vec<u32> = pts.iter().map(|&p| size.distance(center, p)).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
    }
}
