//! Axis-aligned bounding boxes.

use super::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in micrometer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Create a bounding box from explicit corners.
    #[inline]
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Compute the bounding box of a point set.
    ///
    /// An empty set yields a degenerate box at the origin.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
        };
        for p in points {
            bb.merge_point(*p);
        }
        if points.is_empty() {
            bb.min = Point::zero();
            bb.max = Point::zero();
        }
        bb
    }

    /// Grow the box to include `p`.
    #[inline]
    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Grow the box to include another box.
    #[inline]
    pub fn merge(&mut self, other: &BoundingBox) {
        self.merge_point(other.min);
        self.merge_point(other.max);
    }

    /// Expand the box by `amount` on every side.
    #[inline]
    pub fn expand(&mut self, amount: Coord) {
        self.min.x -= amount;
        self.min.y -= amount;
        self.max.x += amount;
        self.max.y += amount;
    }

    /// Width of the box.
    #[inline]
    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    /// Height of the box.
    #[inline]
    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }
}
