pub mod grid;
pub mod node;
pub mod point;

pub use grid::Grid;
pub use node::{calc_resource, Node, NodeMap, NodeResource};
pub use point::{Direction, MapPoint, MapSize};
