//! Polygon boolean and offset operations.
//!
//! This module provides the 2D clip engine used by the whole pipeline:
//! - Partitioning raw stitched polygons into layer parts (outer + holes)
//! - Boolean operations (union, intersection, difference) over part lists
//! - Successive insetting for perimeter generation
//! - Scanline fill patterns clipped against a part
//!
//! Booleans and offsets are delegated to the geo-clipper library; the
//! conversion layer maps micrometer integer coordinates onto `geo`'s
//! floating-point millimeters with a clipper scale factor that restores
//! micrometer resolution inside the engine.

mod pattern;

pub use pattern::LinearPattern;

use crate::geometry::{LayerPart, LayerParts, Point, Polygon};
use crate::{scale, unscale, Coord, Error, Result};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Scale factor handed to the clipper engine. Coordinates are converted to
/// millimeters first, so a factor of 1000 keeps micrometer resolution.
const CLIPPER_FACTOR: f64 = 1000.0;

/// Distance below which consecutive input points are dropped before
/// partitioning (micrometers).
pub const POINT_FILTER_DISTANCE: Coord = 100;

/// Convert a ring of points to a closed geo LineString.
fn ring_to_geo(points: &[Point]) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = points
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // geo stores an explicit closing point
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(*first);
        }
    }

    LineString::new(ring)
}

/// Convert a LayerPart to geo's Polygon type (with holes).
fn part_to_geo(part: &LayerPart) -> GeoPolygon<f64> {
    let holes: Vec<LineString<f64>> = part
        .holes
        .iter()
        .map(|hole| ring_to_geo(hole.points()))
        .collect();
    GeoPolygon::new(ring_to_geo(part.outline.points()), holes)
}

/// Convert a list of LayerParts to geo's MultiPolygon.
fn parts_to_geo_multi(parts: &[LayerPart]) -> MultiPolygon<f64> {
    MultiPolygon::new(parts.iter().map(part_to_geo).collect())
}

/// Convert a closed geo LineString back to a Polygon, dropping the
/// explicit closing point.
fn geo_to_polygon(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Polygon::from_points(points)
}

/// Convert a geo Polygon back to a LayerPart.
///
/// Outlines are normalized counter-clockwise and holes clockwise, the
/// winding every consumer of a part relies on.
fn geo_to_part(geo_poly: &GeoPolygon<f64>) -> LayerPart {
    let mut outline = geo_to_polygon(geo_poly.exterior());
    outline.make_counter_clockwise();

    let holes = geo_poly
        .interiors()
        .iter()
        .map(|ring| {
            let mut hole = geo_to_polygon(ring);
            hole.make_clockwise();
            hole
        })
        .collect();

    LayerPart::with_holes(outline, holes)
}

/// Convert a geo MultiPolygon back to a flat list of LayerParts.
///
/// The engine already assigns interiors to their exteriors, so the
/// alternating outer/hole tree arrives flattened: re-entrant contours
/// (outers inside holes) come back as separate top-level polygons.
fn geo_multi_to_parts(multi: &MultiPolygon<f64>) -> LayerParts {
    multi
        .0
        .iter()
        .map(geo_to_part)
        .filter(|part| part.outline.len() >= 3)
        .collect()
}

/// Orient a soup of rings to even-odd winding.
///
/// A ring contained in an even number of other rings becomes an outer
/// contour (counter-clockwise); odd containment depth makes it a hole
/// (clockwise). With this normalization the engine's non-zero union
/// produces exactly the even-odd partition of the input.
fn orient_even_odd(rings: &mut [Polygon]) {
    let probes: Vec<Option<Point>> = rings.iter().map(|r| r.points().first().copied()).collect();
    let mut depth = vec![0usize; rings.len()];

    for (i, probe) in probes.iter().enumerate() {
        let Some(p) = probe else { continue };
        for (j, other) in rings.iter().enumerate() {
            if i != j && other.contains_point(p) {
                depth[i] += 1;
            }
        }
    }

    for (ring, depth) in rings.iter_mut().zip(depth) {
        if depth % 2 == 0 {
            ring.make_counter_clockwise();
        } else {
            ring.make_clockwise();
        }
    }
}

/// Partition raw closed polygons into layer parts.
///
/// Consecutive points closer than `filter_distance` to the previously kept
/// point are dropped, the rings are unioned with even-odd fill, and the
/// resulting polygon tree is flattened into a list of parts. Empty input
/// yields an empty list.
pub fn generate_layer_parts(polygons: &[Polygon], filter_distance: Coord) -> Result<LayerParts> {
    let mut rings: Vec<Polygon> = Vec::with_capacity(polygons.len());

    for polygon in polygons {
        let points = polygon.points();
        if points.is_empty() {
            continue;
        }

        let mut filtered: Vec<Point> = Vec::with_capacity(points.len());
        filtered.push(points[0]);
        let mut prev = 0;
        for (j, point) in points.iter().enumerate().skip(1) {
            // filter too near points, always against the previous kept one
            if (*point - points[prev]).shorter_than_or_equal(filter_distance) {
                continue;
            }
            filtered.push(*point);
            prev = j;
        }

        if filtered.len() >= 3 {
            rings.push(Polygon::from_points(filtered));
        }
    }

    if rings.is_empty() {
        return Ok(Vec::new());
    }

    orient_even_odd(&mut rings);

    let subject = MultiPolygon::new(
        rings
            .iter()
            .map(|r| GeoPolygon::new(ring_to_geo(r.points()), vec![]))
            .collect(),
    );
    let result = subject.union(&MultiPolygon::new(vec![]), CLIPPER_FACTOR);

    Ok(geo_multi_to_parts(&result))
}

/// Compute the union of two part lists.
pub fn union(subject: &[LayerPart], clip: &[LayerPart]) -> Result<LayerParts> {
    if subject.is_empty() {
        return Ok(clip.to_vec());
    }
    if clip.is_empty() {
        return Ok(subject.to_vec());
    }

    let result = parts_to_geo_multi(subject).union(&parts_to_geo_multi(clip), CLIPPER_FACTOR);
    Ok(geo_multi_to_parts(&result))
}

/// Compute the intersection of two part lists.
pub fn intersection(subject: &[LayerPart], clip: &[LayerPart]) -> Result<LayerParts> {
    if subject.is_empty() || clip.is_empty() {
        return Ok(Vec::new());
    }

    let result =
        parts_to_geo_multi(subject).intersection(&parts_to_geo_multi(clip), CLIPPER_FACTOR);
    Ok(geo_multi_to_parts(&result))
}

/// Compute the difference of two part lists (subject minus clip).
pub fn difference(subject: &[LayerPart], clip: &[LayerPart]) -> Result<LayerParts> {
    if subject.is_empty() {
        return Ok(Vec::new());
    }
    if clip.is_empty() {
        return Ok(subject.to_vec());
    }

    let result = parts_to_geo_multi(subject).difference(&parts_to_geo_multi(clip), CLIPPER_FACTOR);
    Ok(geo_multi_to_parts(&result))
}

/// Offset a single part by `delta` micrometers.
///
/// Positive delta grows the part, negative shrinks it. Corners are squared
/// off; the underlying engine runs with a miter limit of 2.
pub fn offset_part(part: &LayerPart, delta: Coord) -> LayerParts {
    if part.is_empty() {
        return Vec::new();
    }

    let result = part_to_geo(part).offset(
        unscale(delta),
        JoinType::Square,
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_parts(&result)
}

/// Offset every part in a list by `delta` micrometers, merging the results.
pub fn offset_parts(parts: &[LayerPart], delta: Coord) -> LayerParts {
    if parts.is_empty() {
        return Vec::new();
    }

    let result = parts_to_geo_multi(parts).offset(
        unscale(delta),
        JoinType::Square,
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_parts(&result)
}

/// Compute successive insets for one part.
///
/// The result is indexed `[inset][subpart]`: inset 0 is the outermost wall.
/// Inset `i` is produced by offsetting the source part by
/// `offset * i + first_offset`; negative values shrink. The conventional
/// call for perimeters passes a negative line width and half of it as
/// `first_offset`, which centers the outermost wall half a line width
/// inside the contour.
pub fn inset_part(
    part: &LayerPart,
    offset: Coord,
    count: usize,
    first_offset: Coord,
) -> Vec<LayerParts> {
    let mut insets = Vec::with_capacity(count);

    for inset_nr in 0..count {
        let delta = offset * inset_nr as Coord + first_offset;
        insets.push(offset_part(part, delta));
    }

    insets
}

/// Compute successive insets for every part of a layer.
///
/// The result is indexed `[part][inset][subpart]`.
pub fn inset_layer(
    parts: &[LayerPart],
    offset: Coord,
    count: usize,
    first_offset: Coord,
) -> Vec<Vec<LayerParts>> {
    parts
        .iter()
        .map(|part| inset_part(part, offset, count, first_offset))
        .collect()
}

/// Validate that every ring of a part has at least three points.
///
/// Degenerate partitioning output surfaces as a geometry error instead of
/// propagating through the modifier chain.
pub fn check_parts(parts: &[LayerPart]) -> Result<()> {
    for part in parts {
        if part.outline.len() < 3 {
            return Err(Error::Geometry(
                "partitioned layer contains a degenerate outline".into(),
            ));
        }
        if part.holes.iter().any(|h| h.len() < 3) {
            return Err(Error::Geometry(
                "partitioned layer contains a degenerate hole".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(x: Coord, y: Coord, size: Coord) -> Polygon {
        Polygon::rectangle(Point::new(x, y), Point::new(x + size, y + size))
    }

    fn square_part(x: Coord, y: Coord, size: Coord) -> LayerPart {
        LayerPart::new(square(x, y, size))
    }

    fn total_area(parts: &[LayerPart]) -> f64 {
        parts.iter().map(|p| p.area()).sum()
    }

    #[test]
    fn test_generate_layer_parts_empty() {
        let parts = generate_layer_parts(&[], POINT_FILTER_DISTANCE).unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn test_generate_layer_parts_single_square() {
        let parts =
            generate_layer_parts(&[square(0, 0, 10_000)], POINT_FILTER_DISTANCE).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].holes.is_empty());
        assert!((parts[0].area() - 100_000_000.0).abs() < 100_000.0);
    }

    #[test]
    fn test_generate_layer_parts_hole() {
        // An inner ring becomes a hole regardless of its winding.
        let outer = square(0, 0, 10_000);
        let mut inner = square(3_000, 3_000, 4_000);
        inner.make_counter_clockwise();

        let parts = generate_layer_parts(&[outer, inner], POINT_FILTER_DISTANCE).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].holes.len(), 1);
        // 100mm² - 16mm² in µm²
        assert!((parts[0].area() - 84_000_000.0).abs() < 200_000.0);
    }

    #[test]
    fn test_generate_layer_parts_nested_island() {
        // outer > hole > island: depth 2 becomes its own part
        let parts = generate_layer_parts(
            &[
                square(0, 0, 20_000),
                square(2_000, 2_000, 16_000),
                square(6_000, 6_000, 8_000),
            ],
            POINT_FILTER_DISTANCE,
        )
        .unwrap();

        assert_eq!(parts.len(), 2);
        let with_hole = parts.iter().find(|p| p.has_holes()).unwrap();
        let island = parts.iter().find(|p| !p.has_holes()).unwrap();
        assert_eq!(with_hole.holes.len(), 1);
        assert!((island.area() - 64_000_000.0).abs() < 200_000.0);
    }

    #[test]
    fn test_generate_layer_parts_filters_near_points() {
        let mut ring = square(0, 0, 10_000);
        // Inject a point 70µm from the first corner; the filter must drop
        // it and keep the exact rectangle.
        ring.points_mut().insert(1, Point::new(50, 50));
        let parts = generate_layer_parts(&[ring], POINT_FILTER_DISTANCE).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].outline.len(), 4);
        assert!((parts[0].area() - 100_000_000.0).abs() < 100_000.0);
    }

    #[test]
    fn test_union_identity() {
        let a = vec![square_part(0, 0, 10_000)];
        let result = union(&a, &a).unwrap();
        assert!((total_area(&result) - total_area(&a)).abs() < 100_000.0);
    }

    #[test]
    fn test_difference_self_is_empty() {
        let a = vec![square_part(0, 0, 10_000)];
        let result = difference(&a, &a).unwrap();
        assert!(total_area(&result) < 100_000.0);
    }

    #[test]
    fn test_union_minus_b_within_a() {
        let a = vec![square_part(0, 0, 10_000)];
        let b = vec![square_part(5_000, 0, 10_000)];
        let u = union(&a, &b).unwrap();
        let diff = difference(&u, &b).unwrap();
        // (A ∪ B) \ B ⊆ A
        let outside_a = difference(&diff, &a).unwrap();
        assert!(total_area(&outside_a) < 100_000.0);
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = vec![square_part(0, 0, 10_000)];
        let b = vec![square_part(20_000, 0, 10_000)];
        let result = intersection(&a, &b).unwrap();
        assert!(total_area(&result) < 1_000.0);
    }

    #[test]
    fn test_offset_grow_shrink() {
        let part = square_part(0, 0, 10_000);
        let grown = offset_part(&part, 1_000);
        let shrunk = offset_part(&part, -1_000);

        assert!(total_area(&grown) > part.area());
        assert!(total_area(&shrunk) < part.area());
        // 10mm square shrunk by 1mm on each side -> 8mm square
        assert!((total_area(&shrunk) - 64_000_000.0).abs() < 500_000.0);
    }

    #[test]
    fn test_offset_shrink_to_nothing() {
        let part = square_part(0, 0, 2_000);
        let shrunk = offset_part(&part, -2_000);
        assert!(shrunk.is_empty() || total_area(&shrunk) < 1_000.0);
    }

    #[test]
    fn test_inset_part_walls() {
        // 10mm square, 400µm line width, 2 walls
        let part = square_part(0, 0, 10_000);
        let insets = inset_part(&part, -400, 2, -200);

        assert_eq!(insets.len(), 2);
        assert_eq!(insets[0].len(), 1);
        assert_eq!(insets[1].len(), 1);

        // Wall 0 centerline: 10mm - 2*0.2mm = 9.6mm square
        let wall0 = &insets[0][0];
        assert!((wall0.area() - 9_600.0 * 9_600.0).abs() < 200_000.0);

        // Wall 1 centerline: 10mm - 2*0.6mm = 8.8mm square
        let wall1 = &insets[1][0];
        assert!((wall1.area() - 8_800.0 * 8_800.0).abs() < 200_000.0);

        // Inset areas shrink monotonically
        assert!(wall1.area() < wall0.area());
    }

    #[test]
    fn test_inset_preserves_holes() {
        let mut hole = square(4_000, 4_000, 2_000);
        hole.make_clockwise();
        let part = LayerPart::with_holes(square(0, 0, 10_000), vec![hole]);

        let insets = inset_part(&part, -400, 1, -200);
        assert_eq!(insets.len(), 1);
        assert_eq!(insets[0].len(), 1);
        // The hole grows into the part as the outline shrinks
        assert!(insets[0][0].has_holes());
    }
}
