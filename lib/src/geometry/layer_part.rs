//! Layer part type: one region of a layer with its holes.

use super::{BoundingBox, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single simply-connected region of a layer.
///
/// The outline is the outer boundary (counter-clockwise). The holes are
/// interior boundaries (clockwise). Every hole lies strictly inside the
/// outline and holes of the same part do not overlap; the clip engine
/// guarantees both when it partitions a layer.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPart {
    /// The outer contour of the part.
    pub outline: Polygon,
    /// The holes (interior contours) of the part.
    pub holes: Vec<Polygon>,
}

impl LayerPart {
    /// Create a new part with only an outline and no holes.
    #[inline]
    pub fn new(outline: Polygon) -> Self {
        Self {
            outline,
            holes: Vec::new(),
        }
    }

    /// Create a new part with an outline and holes.
    #[inline]
    pub fn with_holes(outline: Polygon, holes: Vec<Polygon>) -> Self {
        Self { outline, holes }
    }

    /// Check if the part is empty (no outline points).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }

    /// Check if this part has any holes.
    #[inline]
    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Calculate the area of the part (outline area minus hole areas).
    pub fn area(&self) -> CoordF {
        let holes_area: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.outline.area() - holes_area
    }

    /// Get the bounding box of the part (same as the outline's).
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.outline.bounding_box()
    }

    /// Check if a point is inside the part (inside the outline and not
    /// inside any hole).
    pub fn contains_point(&self, p: &Point) -> bool {
        if !self.outline.contains_point(p) {
            return false;
        }
        !self.holes.iter().any(|hole| hole.contains_point(p))
    }

    /// Simplify the outline and all holes in place.
    pub fn simplify(&mut self, min_seg_len: crate::Coord, max_deviation: crate::Coord) {
        self.outline.simplify(min_seg_len, max_deviation);
        for hole in &mut self.holes {
            hole.simplify(min_seg_len, max_deviation);
        }
        self.holes.retain(|h| h.len() >= 3);
    }
}

impl fmt::Debug for LayerPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LayerPart({} outline points, {} holes)",
            self.outline.len(),
            self.holes.len()
        )
    }
}

impl From<Polygon> for LayerPart {
    #[inline]
    fn from(outline: Polygon) -> Self {
        Self::new(outline)
    }
}

/// Type alias for a collection of layer parts.
pub type LayerParts = Vec<LayerPart>;

#[cfg(test)]
mod tests {
    use super::*;

    fn part_with_hole() -> LayerPart {
        let outline = Polygon::rectangle(Point::new(0, 0), Point::new(10_000, 10_000));
        let mut hole = Polygon::rectangle(Point::new(4_000, 4_000), Point::new(6_000, 6_000));
        hole.make_clockwise();
        LayerPart::with_holes(outline, vec![hole])
    }

    #[test]
    fn test_area_subtracts_holes() {
        let part = part_with_hole();
        // 10mm x 10mm minus 2mm x 2mm, in square micrometers
        assert!((part.area() - 96_000_000.0).abs() < 1.0);
    }

    #[test]
    fn test_contains_point() {
        let part = part_with_hole();
        assert!(part.contains_point(&Point::new(2_000, 2_000)));
        assert!(!part.contains_point(&Point::new(5_000, 5_000))); // inside the hole
        assert!(!part.contains_point(&Point::new(11_000, 5_000)));
    }
}
