//! Layer data structures and segment stitching.
//!
//! A [`SlicedLayer`] collects the raw intersection segments of one Z plane
//! and stitches them into closed polygons by walking face adjacency. A
//! [`PartitionedLayer`] is the partitioned result: a list of parts plus the
//! attribute map the modifier chain writes into.

use crate::geometry::{LayerPart, LayerParts, Paths, Point, Polygon};
use crate::{Coord, Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Distance within which a segment start is considered to continue the
/// current polygon (micrometers).
pub const SEGMENT_SNAP_DISTANCE: Coord = 30;

/// Distance within which open polygon ends are joined during repair
/// (micrometers).
pub const REPAIR_SNAP_DISTANCE: Coord = 100;

/// Minimum total length of a polygon; shorter or still-open polygons are
/// dropped (micrometers). Doubles as the final closing distance.
pub const MIN_POLYGON_LENGTH: Coord = 1000;

/// A 2D line segment produced by intersecting one triangle with a Z plane.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    /// Index of the originating face in the optimized model.
    pub face_index: usize,
    /// Set once the segment has been consumed by a polygon.
    pub added_to_polygon: bool,
}

impl Segment {
    /// Create a new segment for the given face.
    pub fn new(start: Point, end: Point, face_index: usize) -> Self {
        Self {
            start,
            end,
            face_index,
            added_to_polygon: false,
        }
    }
}

/// Raw per-plane slicing state: segments plus the face lookup used while
/// stitching.
#[derive(Clone, Debug, Default)]
pub struct SlicedLayer {
    segments: Vec<Segment>,
    face_to_segment: HashMap<usize, usize>,
    polygons: Vec<Option<Polygon>>,
    closed: Vec<bool>,
}

impl SlicedLayer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment and index it by its originating face.
    pub fn add_segment(&mut self, segment: Segment) {
        self.face_to_segment
            .insert(segment.face_index, self.segments.len());
        self.segments.push(segment);
    }

    /// Get the number of collected segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Stitch the collected segments into closed polygons.
    ///
    /// Works in three passes: walk face adjacency to chain segments whose
    /// endpoints meet within `segment_snap`, join nearly-touching open
    /// polygons within `repair_snap`, then close almost-closed rings and
    /// drop everything that stays open or is shorter than `min_length`.
    /// The defaults are [`SEGMENT_SNAP_DISTANCE`], [`REPAIR_SNAP_DISTANCE`]
    /// and [`MIN_POLYGON_LENGTH`].
    pub fn make_polygons(
        &mut self,
        faces_touching: impl Fn(usize) -> [i64; 3],
        segment_snap: Coord,
        repair_snap: Coord,
        min_length: Coord,
    ) -> Vec<Polygon> {
        self.chain_segments(&faces_touching, segment_snap);
        self.connect_open_polygons(repair_snap);
        self.finish_polygons(min_length)
    }

    /// Walk segments along face adjacency, starting a new polygon at every
    /// segment not yet consumed.
    fn chain_segments(&mut self, faces_touching: &impl Fn(usize) -> [i64; 3], segment_snap: Coord) {
        for start_idx in 0..self.segments.len() {
            if self.segments[start_idx].added_to_polygon {
                continue;
            }

            let mut polygon = Polygon::new();
            polygon.push(self.segments[start_idx].start);

            let mut current_idx = start_idx;
            let mut can_close = false;

            loop {
                can_close = false;
                let current = self.segments[current_idx];
                self.segments[current_idx].added_to_polygon = true;
                let p0 = current.end;
                polygon.push(p0);

                // Check the segments of the faces touching the current
                // face: the one starting within snap distance of our end
                // point continues the polygon. Arriving back at the start
                // segment closes it.
                let mut next_idx: i64 = -1;
                for touching_face in faces_touching(current.face_index) {
                    if touching_face < 0 {
                        continue;
                    }
                    let Some(&touching_seg) = self.face_to_segment.get(&(touching_face as usize))
                    else {
                        continue;
                    };

                    let p1 = self.segments[touching_seg].start;
                    if (p0 - p1).shorter_than(segment_snap) {
                        if touching_seg == start_idx {
                            can_close = true;
                        }
                        if self.segments[touching_seg].added_to_polygon {
                            continue;
                        }
                        next_idx = touching_seg as i64;
                    }
                }

                if next_idx == -1 {
                    break;
                }
                current_idx = next_idx as usize;
            }

            if can_close {
                // The final segment's end duplicates the starting point.
                Self::close_if_almost_finished(&mut polygon, segment_snap);
            }

            self.polygons.push(Some(polygon));
            self.closed.push(can_close);
        }
    }

    /// Join open polygons whose tail sits near another polygon's head.
    ///
    /// Models are not always perfectly manifold, so leftover open chains
    /// are merged pairwise, preferring the closer joint and the longer
    /// partner, until no pair is within reach.
    fn connect_open_polygons(&mut self, repair_snap: Coord) {
        'rerun: loop {
            for i in 0..self.polygons.len() {
                let Some(polygon) = &self.polygons[i] else {
                    continue;
                };
                if self.closed[i] {
                    continue;
                }
                let Some(&tail) = polygon.points().last() else {
                    continue;
                };

                let mut best: i64 = -1;
                let mut best_score = (repair_snap + 1) as f64;
                for (j, candidate) in self.polygons.iter().enumerate() {
                    let Some(candidate) = candidate else { continue };
                    if self.closed[j] || i == j {
                        continue;
                    }
                    let Some(&head) = candidate.points().first() else {
                        continue;
                    };

                    let diff = tail - head;
                    if diff.shorter_than(repair_snap) {
                        let score = diff.length() - (candidate.len() * 10) as f64;
                        if score < best_score {
                            best = j as i64;
                            best_score = score;
                        }
                    }
                }

                if best > -1 {
                    let best = best as usize;
                    let merged_points = self.polygons[best]
                        .take()
                        .expect("candidate checked above")
                        .into_points();
                    let polygon = self.polygons[i].as_mut().expect("checked above");
                    polygon.points_mut().extend(merged_points);

                    if Self::close_if_almost_finished(polygon, repair_snap) {
                        self.closed[i] = true;
                    }
                    continue 'rerun;
                }
            }
            break;
        }
    }

    /// Close nearly-finished polygons and drop open or tiny ones.
    fn finish_polygons(&mut self, min_length: Coord) -> Vec<Polygon> {
        let mut cleared = Vec::new();

        for (i, slot) in self.polygons.iter_mut().enumerate() {
            let Some(polygon) = slot.take() else { continue };
            let mut polygon = polygon;

            if !self.closed[i] && Self::close_if_almost_finished(&mut polygon, min_length) {
                self.closed[i] = true;
            }

            let length: f64 = polygon
                .points()
                .windows(2)
                .map(|w| w[0].distance(&w[1]))
                .sum();

            if self.closed[i] && length > min_length as f64 && polygon.len() >= 3 {
                cleared.push(polygon);
            }
        }

        cleared
    }

    /// If the polygon's ends are within `snap`, drop the (nearly)
    /// duplicated end point and report it closed.
    fn close_if_almost_finished(polygon: &mut Polygon, snap: Coord) -> bool {
        let points = polygon.points();
        if points.len() < 3 {
            return false;
        }
        let first = points[0];
        let last = points[points.len() - 1];
        if (last - first).shorter_than(snap) {
            polygon.points_mut().pop();
            true
        } else {
            false
        }
    }
}

/// Typed value stored in a layer's attribute map.
#[derive(Clone, Debug)]
pub enum LayerAttribute {
    /// A flat list of parts (support, skins, infill regions).
    Parts(LayerParts),
    /// Nested inset results, indexed `[part][wall][subpart]`.
    Insets(Vec<Vec<LayerParts>>),
    /// Open paths (generated fill lines).
    Paths(Paths),
}

/// An ordered set of layer parts plus the attribute map filled in by the
/// modifier chain.
///
/// Layers hold no references to their neighbors; modifiers that need
/// cross-layer context receive the full layer slice instead.
#[derive(Clone, Debug, Default)]
pub struct PartitionedLayer {
    parts: LayerParts,
    attributes: HashMap<String, LayerAttribute>,
}

impl PartitionedLayer {
    /// Create a layer from its parts.
    pub fn new(parts: LayerParts) -> Self {
        Self {
            parts,
            attributes: HashMap::new(),
        }
    }

    /// Get the parts of this layer.
    #[inline]
    pub fn parts(&self) -> &[LayerPart] {
        &self.parts
    }

    /// Check if the layer has no geometry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Store an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: &str, value: LayerAttribute) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Remove an attribute.
    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    /// Check whether an attribute exists.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Read a parts attribute.
    ///
    /// A missing attribute reads as `None`; a value of a different type is
    /// an attribute error.
    pub fn parts_attribute(&self, name: &str) -> Result<Option<&LayerParts>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(LayerAttribute::Parts(parts)) => Ok(Some(parts)),
            Some(_) => Err(Error::Attribute(format!(
                "the attribute {name} has the wrong datatype"
            ))),
        }
    }

    /// Read an insets attribute (`[part][wall][subpart]`).
    pub fn insets_attribute(&self, name: &str) -> Result<Option<&Vec<Vec<LayerParts>>>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(LayerAttribute::Insets(insets)) => Ok(Some(insets)),
            Some(_) => Err(Error::Attribute(format!(
                "the attribute {name} has the wrong datatype"
            ))),
        }
    }

    /// Read a paths attribute.
    pub fn paths_attribute(&self, name: &str) -> Result<Option<&Paths>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(LayerAttribute::Paths(paths)) => Ok(Some(paths)),
            Some(_) => Err(Error::Attribute(format!(
                "the attribute {name} has the wrong datatype"
            ))),
        }
    }
}

impl fmt::Display for PartitionedLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PartitionedLayer({} parts, {} attributes)",
            self.parts.len(),
            self.attributes.len()
        )
    }
}
