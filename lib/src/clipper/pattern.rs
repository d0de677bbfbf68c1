//! Scanline fill patterns.
//!
//! A pattern is constructed once per part (the G-code generator supplies a
//! factory closure) and produces straight-line infill clipped against the
//! part. Clipping is exact: each scanline collects its even-odd crossings
//! with the part's outline and holes, and the sorted crossings pair up into
//! inside intervals.

use crate::geometry::{LayerPart, Paths, Point, Polygon, Polyline};
use crate::{to_radians, Coord, CoordF};

/// A field of parallel lines over an axis-aligned box.
///
/// Lines run at `rotation_deg` degrees, spaced `line_spacing` apart. With
/// `alternate_dir` the traversal direction flips on every line
/// (boustrophedon). With `zigzag` adjacent line ends are joined into a
/// continuous polyline wherever the joint stays inside the part.
#[derive(Clone, Debug)]
pub struct LinearPattern {
    line_width: Coord,
    line_spacing: Coord,
    min: Point,
    max: Point,
    rotation_rad: CoordF,
    alternate_dir: bool,
    zigzag: bool,
}

impl LinearPattern {
    /// Create a new linear pattern over the box `[min, max]`.
    pub fn new(
        line_width: Coord,
        line_spacing: Coord,
        min: Point,
        max: Point,
        rotation_deg: CoordF,
        alternate_dir: bool,
        zigzag: bool,
    ) -> Self {
        Self {
            line_width,
            line_spacing: line_spacing.max(1),
            min,
            max,
            rotation_rad: to_radians(rotation_deg),
            alternate_dir,
            zigzag,
        }
    }

    /// Generate the fill lines for a part, clipped to its interior.
    pub fn fill(&self, part: &LayerPart) -> Paths {
        self.fill_region(part)
    }

    /// Generate fill lines for a part after insetting it so the lines
    /// overlap the surrounding walls by `overlap_percent` of the line
    /// width. A zero percentage skips the inset entirely.
    pub fn fill_with_overlap(&self, part: &LayerPart, overlap_percent: i64) -> Paths {
        if overlap_percent == 0 {
            return self.fill_region(part);
        }

        let overlap =
            (self.line_width as f64 * (100.0 - overlap_percent as f64) / 100.0).round() as Coord;
        let regions = super::offset_part(part, -overlap);

        let mut result = Paths::new();
        for region in &regions {
            result.extend(self.fill_region(region));
        }
        result
    }

    fn fill_region(&self, part: &LayerPart) -> Paths {
        if part.is_empty() {
            return Paths::new();
        }

        // Work in the pattern frame: rotate the part so the lines become
        // vertical, clip, then rotate the result back.
        let rotated = rotate_part(part, -self.rotation_rad);
        let corners = [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ];
        let mut min_x = Coord::MAX;
        let mut max_x = Coord::MIN;
        for c in corners {
            let r = c.rotate(-self.rotation_rad);
            min_x = min_x.min(r.x);
            max_x = max_x.max(r.x);
        }

        // One interval of headroom keeps boundary-aligned lines out of
        // degenerate crossings.
        let mut columns: Vec<Vec<(Coord, Coord)>> = Vec::new();
        let mut x = min_x;
        while x <= max_x {
            columns.push(column_intervals(&rotated, x));
            x += self.line_spacing;
        }

        let mut result = Paths::new();
        let mut current: Option<Polyline> = None;

        for (nr, intervals) in columns.iter().enumerate() {
            let x = min_x + self.line_spacing * nr as Coord;
            // zigzag needs alternating directions to join adjacent ends
            let downward = (self.alternate_dir || self.zigzag) && nr % 2 == 1;

            if intervals.len() != 1 {
                if let Some(open) = current.take() {
                    result.push(open);
                }
            }

            for &(y0, y1) in intervals {
                let (start, end) = if downward {
                    (Point::new(x, y1), Point::new(x, y0))
                } else {
                    (Point::new(x, y0), Point::new(x, y1))
                };

                if self.zigzag && intervals.len() == 1 {
                    if let Some(mut open) = current.take() {
                        let tail = open.last_point().expect("open polyline has points");
                        let mid = Point::new((tail.x + start.x) / 2, (tail.y + start.y) / 2);
                        if rotated.contains_point(&mid) {
                            open.push(start);
                            open.push(end);
                            current = Some(open);
                            continue;
                        }
                        result.push(open);
                    }
                    current = Some(Polyline::from_points(vec![start, end]));
                } else {
                    result.push(Polyline::from_points(vec![start, end]));
                }
            }
        }

        if let Some(open) = current.take() {
            result.push(open);
        }

        if self.rotation_rad != 0.0 {
            for line in &mut result {
                for p in line.points_mut() {
                    *p = p.rotate(self.rotation_rad);
                }
            }
        }

        result.retain(|l| l.len() >= 2 && l.length() >= 1.0);
        result
    }
}

/// Rotate a part around the origin by `angle` radians.
fn rotate_part(part: &LayerPart, angle: CoordF) -> LayerPart {
    if angle == 0.0 {
        return part.clone();
    }

    let rotate_ring = |ring: &Polygon| -> Polygon {
        ring.points().iter().map(|p| p.rotate(angle)).collect()
    };

    LayerPart::with_holes(
        rotate_ring(&part.outline),
        part.holes.iter().map(rotate_ring).collect(),
    )
}

/// Collect the inside intervals of the vertical line at `x`.
///
/// Crossings with every ring of the part are gathered with a half-open
/// rule so vertices are counted exactly once, then sorted and paired
/// even-odd.
fn column_intervals(part: &LayerPart, x: Coord) -> Vec<(Coord, Coord)> {
    let mut crossings: Vec<Coord> = Vec::new();

    let mut scan_ring = |ring: &Polygon| {
        let points = ring.points();
        let n = points.len();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let crosses = (a.x <= x && b.x > x) || (b.x <= x && a.x > x);
            if crosses {
                let t = (x - a.x) as f64 / (b.x - a.x) as f64;
                let y = a.y as f64 + (b.y - a.y) as f64 * t;
                crossings.push(y.round() as Coord);
            }
        }
    };

    scan_ring(&part.outline);
    for hole in &part.holes {
        scan_ring(hole);
    }

    crossings.sort_unstable();

    crossings
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(y0, y1)| y1 > y0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square_part(size: Coord) -> LayerPart {
        LayerPart::new(Polygon::rectangle(Point::zero(), Point::new(size, size)))
    }

    #[test]
    fn test_column_intervals_square() {
        let part = square_part(10_000);
        let intervals = column_intervals(&part, 5_000);
        assert_eq!(intervals, vec![(0, 10_000)]);
    }

    #[test]
    fn test_column_intervals_with_hole() {
        let mut hole = Polygon::rectangle(Point::new(4_000, 4_000), Point::new(6_000, 6_000));
        hole.make_clockwise();
        let part = LayerPart::with_holes(
            Polygon::rectangle(Point::zero(), Point::new(10_000, 10_000)),
            vec![hole],
        );

        let intervals = column_intervals(&part, 5_000);
        assert_eq!(intervals, vec![(0, 4_000), (6_000, 10_000)]);
    }

    #[test]
    fn test_fill_line_count() {
        let part = square_part(10_000);
        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 400, bb.min, bb.max, 0.0, true, false);
        let lines = pattern.fill(&part);

        // 10mm box at 0.4mm spacing: columns at 0, 400, .. 9600 carry lines,
        // the final column grazes the right edge and stays empty
        assert_eq!(lines.len(), 25);

        // Boustrophedon: consecutive lines run in opposite directions
        let first = &lines[0];
        let second = &lines[1];
        assert!(first.first_point().unwrap().y < first.last_point().unwrap().y);
        assert!(second.first_point().unwrap().y > second.last_point().unwrap().y);
    }

    #[test]
    fn test_fill_lines_inside_part() {
        let part = square_part(10_000);
        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 400, bb.min, bb.max, 0.0, true, false);

        for line in pattern.fill(&part) {
            for p in line.points() {
                assert!(p.x >= 0 && p.x <= 10_000);
                assert!(p.y >= 0 && p.y <= 10_000);
            }
        }
    }

    #[test]
    fn test_fill_rotated() {
        let part = square_part(10_000);
        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 400, bb.min, bb.max, 90.0, false, false);
        let lines = pattern.fill(&part);

        assert!(!lines.is_empty());
        // Rotated 90 degrees: lines run along X, so y is constant per line
        for line in &lines {
            let first = line.first_point().unwrap();
            let last = line.last_point().unwrap();
            assert!((first.y - last.y).abs() <= 2, "{:?} -> {:?}", first, last);
        }
    }

    #[test]
    fn test_fill_with_overlap_narrows_lines() {
        let part = square_part(10_000);
        // The pattern box always comes from the un-inset part, so the
        // scanline grid is identical for both overlap settings.
        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 400, bb.min, bb.max, 0.0, true, false);

        let plain = pattern.fill_with_overlap(&part, 0);
        let tight = pattern.fill_with_overlap(&part, 50);
        assert!(!plain.is_empty());
        assert!(!tight.is_empty());

        let y_span = |paths: &Paths| {
            let mut min_y = Coord::MAX;
            let mut max_y = Coord::MIN;
            for path in paths {
                for p in path.points() {
                    min_y = min_y.min(p.y);
                    max_y = max_y.max(p.y);
                }
            }
            (min_y, max_y)
        };

        // 50% overlap insets the region by half a line width per side.
        assert_eq!(y_span(&plain), (0, 10_000));
        assert_eq!(y_span(&tight), (200, 9_800));
    }

    #[test]
    fn test_fill_with_overlap_avoids_holes() {
        let mut hole = Polygon::rectangle(Point::new(4_000, 4_000), Point::new(6_000, 6_000));
        hole.make_clockwise();
        let part = LayerPart::with_holes(
            Polygon::rectangle(Point::zero(), Point::new(10_000, 10_000)),
            vec![hole],
        );

        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 400, bb.min, bb.max, 0.0, true, false);
        for line in pattern.fill_with_overlap(&part, 50) {
            for pair in line.points().windows(2) {
                let mid = Point::new((pair[0].x + pair[1].x) / 2, (pair[0].y + pair[1].y) / 2);
                assert!(
                    !(mid.x > 4_050 && mid.x < 5_950 && mid.y > 4_050 && mid.y < 5_950),
                    "fill line crosses the hole at {:?}",
                    mid
                );
            }
        }
    }

    #[test]
    fn test_fill_zigzag_connects() {
        let part = square_part(10_000);
        let bb = part.bounding_box();
        let plain = LinearPattern::new(400, 2_000, bb.min, bb.max, 0.0, false, false);
        let zigzag = LinearPattern::new(400, 2_000, bb.min, bb.max, 0.0, false, true);

        let distinct = plain.fill(&part);
        let joined = zigzag.fill(&part);

        // Zigzag joins the whole square into far fewer polylines
        assert!(joined.len() < distinct.len());
        let longest = joined.iter().map(|l| l.len()).max().unwrap();
        assert!(longest > 2);
    }

    #[test]
    fn test_fill_zigzag_splits_at_holes() {
        let mut hole = Polygon::rectangle(Point::new(3_000, 0), Point::new(7_000, 10_000));
        hole.make_clockwise();
        // A hole splitting the square into two columns: connectors across
        // the hole would leave the part, so chains must break there.
        let part = LayerPart::with_holes(
            Polygon::rectangle(Point::zero(), Point::new(10_000, 10_000)),
            vec![hole],
        );

        let bb = part.bounding_box();
        let pattern = LinearPattern::new(400, 1_000, bb.min, bb.max, 0.0, false, true);
        for line in pattern.fill(&part) {
            for pair in line.points().windows(2) {
                let mid = Point::new((pair[0].x + pair[1].x) / 2, (pair[0].y + pair[1].y) / 2);
                assert!(
                    part.contains_point(&mid) || mid.x <= 3_000 || mid.x >= 7_000,
                    "connector crosses the hole at {:?}",
                    mid
                );
            }
        }
    }
}
