//! Model slicing.
//!
//! The slicer intersects the optimized mesh with one horizontal plane per
//! layer, stitches the resulting segments into closed polygons and
//! partitions each layer into parts. Layers are independent and are sliced
//! in parallel; stitching within one layer is serial.

mod layer;

pub use layer::{
    LayerAttribute, PartitionedLayer, Segment, SlicedLayer, MIN_POLYGON_LENGTH,
    REPAIR_SNAP_DISTANCE, SEGMENT_SNAP_DISTANCE,
};

use crate::clipper;
use crate::config::Options;
use crate::geometry::{Point, Point3};
use crate::mesh::OptimizedModel;
use crate::{Coord, Error, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Slices an optimized model into partitioned layers.
pub struct Slicer<'o> {
    options: &'o Options,
}

impl<'o> Slicer<'o> {
    /// Create a new slicer using the given options.
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }

    /// Number of layers needed to cover the model.
    pub fn layer_count(&self, model: &OptimizedModel) -> usize {
        let initial = self.options.print.initial_layer_thickness;
        let thickness = self.options.print.layer_thickness;
        let span = model.max.z - initial;
        if span <= 0 {
            return 1;
        }
        (span as f64 / thickness as f64).ceil() as usize + 1
    }

    /// Z height of layer `nr` in micrometers.
    ///
    /// The initial layer is thicker to bond to the bed; every following
    /// layer advances by exactly one layer thickness.
    pub fn layer_z(&self, nr: usize) -> Coord {
        self.options.print.initial_layer_thickness
            + nr as Coord * self.options.print.layer_thickness
    }

    /// Slice the model into partitioned layers.
    ///
    /// The cancellation flag is checked per layer; a set flag aborts with
    /// [`Error::Cancelled`].
    pub fn slice(
        &self,
        model: &OptimizedModel,
        cancel: &AtomicBool,
    ) -> Result<Vec<PartitionedLayer>> {
        let count = self.layer_count(model);
        debug!(layers = count, faces = model.face_count(), "slicing model");

        (0..count)
            .into_par_iter()
            .map(|nr| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled);
                }
                self.slice_layer(model, nr)
                    .map_err(|e| annotate_layer(e, nr))
            })
            .collect()
    }

    /// Slice a single plane and partition it.
    fn slice_layer(&self, model: &OptimizedModel, nr: usize) -> Result<PartitionedLayer> {
        let z = self.layer_z(nr);
        let mut layer = SlicedLayer::new();

        for (face_idx, face) in model.faces.iter().enumerate() {
            let (min_z, max_z) = face.z_range(&model.vertices);
            if z < min_z || z > max_z || min_z == max_z {
                continue;
            }

            let p0 = model.vertices[face.indices[0]];
            let p1 = model.vertices[face.indices[1]];
            let p2 = model.vertices[face.indices[2]];

            if let Some((start, end)) = slice_face(z, p0, p1, p2) {
                if start != end {
                    layer.add_segment(Segment::new(start, end, face_idx));
                }
            }
        }

        let faces = &model.faces;
        let print = &self.options.print;
        let polygons = layer.make_polygons(
            |face_idx| faces[face_idx].touching,
            print.segment_snap_distance,
            print.point_filter_distance,
            print.min_polygon_length,
        );

        let parts = clipper::generate_layer_parts(&polygons, print.point_filter_distance)?;
        clipper::check_parts(&parts)?;

        Ok(PartitionedLayer::new(parts))
    }
}

/// Intersect one triangle with the plane at `z`.
///
/// Exactly one vertex lies strictly on the other side of the plane from
/// the remaining two; the two crossed edges are interpolated. The argument
/// order of the interpolation keeps the segment direction consistent with
/// the face winding, so outer contours stitch counter-clockwise and holes
/// clockwise.
fn slice_face(z: Coord, p0: Point3, p1: Point3, p2: Point3) -> Option<(Point, Point)> {
    if p0.z < z && p1.z >= z && p2.z >= z {
        Some(project_2d(z, p0, p2, p1))
    } else if p0.z > z && p1.z < z && p2.z < z {
        Some(project_2d(z, p0, p1, p2))
    } else if p1.z < z && p0.z >= z && p2.z >= z {
        Some(project_2d(z, p1, p0, p2))
    } else if p1.z > z && p0.z < z && p2.z < z {
        Some(project_2d(z, p1, p2, p0))
    } else if p2.z < z && p1.z >= z && p0.z >= z {
        Some(project_2d(z, p2, p1, p0))
    } else if p2.z > z && p0.z < z && p1.z < z {
        Some(project_2d(z, p2, p0, p1))
    } else {
        None
    }
}

/// Interpolate the crossings of edges `base`→`a` and `base`→`b` at `z`.
fn project_2d(z: Coord, base: Point3, a: Point3, b: Point3) -> (Point, Point) {
    (interpolate(z, base, a), interpolate(z, base, b))
}

fn interpolate(z: Coord, from: Point3, to: Point3) -> Point {
    let t = (z - from.z) as f64 / (to.z - from.z) as f64;
    Point::new(
        (from.x as f64 + (to.x - from.x) as f64 * t).round() as Coord,
        (from.y as f64 + (to.y - from.y) as f64 * t).round() as Coord,
    )
}

fn annotate_layer(e: Error, nr: usize) -> Error {
    match e {
        Error::Geometry(msg) => Error::Geometry(format!("layer {nr}: {msg}")),
        other => other,
    }
}
