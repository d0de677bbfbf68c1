//! Closed polygon and open polyline types.
//!
//! A [`Polygon`] is implicitly closed: the last point connects back to the
//! first without a repeated closing point. Outer contours are
//! counter-clockwise (positive area), holes are clockwise. A [`Polyline`] is
//! an open path, used for travel moves and infill lines.

use super::{BoundingBox, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default minimum segment length for simplification (micrometers).
pub const SIMPLIFY_MIN_SEGMENT: Coord = 100;

/// Default maximum deviation for collinear collapse (micrometers).
pub const SIMPLIFY_MAX_DEVIATION: Coord = 50;

/// A closed polygon defined by a sequence of points.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a new empty polygon.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Get the points of this polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get a mutable reference to the points.
    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        &mut self.points
    }

    /// Consume the polygon and return its points.
    #[inline]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Get the number of points in the polygon.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the polygon is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the polygon.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Calculate the signed area of the polygon using the shoelace formula.
    /// Positive for counter-clockwise (outer contour), negative for
    /// clockwise (hole).
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut sum: i128 = 0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            sum += self.points[i].x as i128 * self.points[j].y as i128;
            sum -= self.points[j].x as i128 * self.points[i].y as i128;
        }

        sum as CoordF / 2.0
    }

    /// Calculate the unsigned area of the polygon.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Check if the polygon is counter-clockwise (positive area).
    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Ensure the polygon is counter-clockwise by reversing if necessary.
    pub fn make_counter_clockwise(&mut self) {
        if self.signed_area() < 0.0 {
            self.reverse();
        }
    }

    /// Ensure the polygon is clockwise by reversing if necessary.
    pub fn make_clockwise(&mut self) {
        if self.signed_area() > 0.0 {
            self.reverse();
        }
    }

    /// Reverse the order of points in the polygon.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Calculate the perimeter (total edge length) of the polygon.
    pub fn perimeter(&self) -> CoordF {
        if self.points.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            total += self.points[i].distance(&self.points[j]);
        }
        total
    }

    /// Get the axis-aligned bounding box of the polygon.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Check if a point is inside the polygon (even-odd rule).
    ///
    /// Points exactly on the boundary may report either side.
    pub fn contains_point(&self, p: &Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                // Exact crossing test on the horizontal ray through p.
                let lhs = (p.x - pi.x) as i128 * (pj.y - pi.y) as i128;
                let rhs = (pj.x - pi.x) as i128 * (p.y - pi.y) as i128;
                let crossed = if pj.y > pi.y { lhs < rhs } else { lhs > rhs };
                if crossed {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Simplify the polygon in place.
    ///
    /// Removes consecutive points closer than `min_seg_len` to the
    /// previously kept point and collapses collinear runs whose middle
    /// point deviates from the surrounding edge by at most `max_deviation`
    /// (both in micrometers). Passing a negative value selects the default
    /// threshold.
    pub fn simplify(&mut self, min_seg_len: Coord, max_deviation: Coord) {
        let min_seg_len = if min_seg_len < 0 {
            SIMPLIFY_MIN_SEGMENT
        } else {
            min_seg_len
        };
        let max_deviation = if max_deviation < 0 {
            SIMPLIFY_MAX_DEVIATION
        } else {
            max_deviation
        };

        if self.points.len() < 3 {
            return;
        }

        // Drop points too close to the previously kept one.
        let mut kept: Vec<Point> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            match kept.last() {
                Some(last) if (p - *last).shorter_than(min_seg_len) => {}
                _ => kept.push(p),
            }
        }
        // The closing edge may still be too short.
        while kept.len() > 2 {
            let first = kept[0];
            let last = *kept.last().expect("non-empty");
            if (first - last).shorter_than(min_seg_len) {
                kept.pop();
            } else {
                break;
            }
        }

        // Collapse collinear runs.
        if kept.len() >= 3 {
            let mut out: Vec<Point> = Vec::with_capacity(kept.len());
            let n = kept.len();
            for i in 0..n {
                let prev = kept[(i + n - 1) % n];
                let cur = kept[i];
                let next = kept[(i + 1) % n];
                if deviation_exceeds(prev, cur, next, max_deviation) {
                    out.push(cur);
                }
            }
            if out.len() >= 3 {
                kept = out;
            }
        }

        self.points = kept;
    }

    /// Create a rectangle polygon from the min and max corners.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Create a regular polygon approximating a circle.
    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        let mut points = Vec::with_capacity(segments);
        for i in 0..segments {
            let angle = 2.0 * std::f64::consts::PI * i as CoordF / segments as CoordF;
            points.push(Point::new(
                center.x + (radius as CoordF * angle.cos()).round() as Coord,
                center.y + (radius as CoordF * angle.sin()).round() as Coord,
            ));
        }
        Self::from_points(points)
    }
}

/// Check whether `cur` deviates from the line `prev`-`next` by more than
/// `max_deviation`.
fn deviation_exceeds(prev: Point, cur: Point, next: Point, max_deviation: Coord) -> bool {
    let base = next - prev;
    let base_len_sq = base.length_squared();
    if base_len_sq == 0 {
        // prev == next, keep the point to avoid degenerating the ring
        return true;
    }
    // distance = |cross| / |base|, compare squared to avoid the root
    let cross = base.cross(&(cur - prev));
    let dev_sq_scaled = (cross * cross) as f64 / base_len_sq as f64;
    dev_sq_scaled > (max_deviation as f64) * (max_deviation as f64)
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// An open polyline defined by a sequence of points.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    /// Create a new empty polyline.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polyline from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Get the points of this polyline.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get a mutable reference to the points.
    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        &mut self.points
    }

    /// Get the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the polyline is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the end of the polyline.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get the first point, if any.
    #[inline]
    pub fn first_point(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Get the last point, if any.
    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Reverse the direction of the polyline.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Calculate the total length of the polyline.
    pub fn length(&self) -> CoordF {
        self.points
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    /// Get the axis-aligned bounding box of the polyline.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }
}

impl fmt::Debug for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polyline({} points)", self.points.len())
    }
}

/// Type alias for a collection of polylines.
pub type Paths = Vec<Polyline>;

/// Type alias for a collection of polygons.
pub type Polygons = Vec<Polygon>;
