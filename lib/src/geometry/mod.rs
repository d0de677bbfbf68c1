//! Geometry primitives.
//!
//! This module provides the basic geometric types used across the pipeline:
//! - [`Point`] / [`Point3`] / [`Point3F`] - micrometer and millimeter points
//! - [`Polygon`] / [`Polyline`] - closed contours and open paths
//! - [`BoundingBox`] - axis-aligned 2D extents
//! - [`LayerPart`] - one region of a layer with its holes

mod bounding_box;
mod layer_part;
mod point;
mod polygon;

pub use bounding_box::BoundingBox;
pub use layer_part::{LayerPart, LayerParts};
pub use point::{Point, Point3, Point3F, Points};
pub use polygon::{Paths, Polygon, Polygons, Polyline};
