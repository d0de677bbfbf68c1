//! # microslice
//!
//! A fused-filament slicer core: it converts closed triangle meshes (STL)
//! into RepRap/Marlin G-code.
//!
//! The pipeline runs strictly forward:
//! - STL loading and mesh optimization (vertex dedup + face adjacency)
//! - Plane slicing with stitching of non-manifold output
//! - Polygon partitioning into outer contours and holes
//! - A layer-modifier chain (perimeters, skins, infill, brim, support)
//! - G-code generation through a fixed renderer sequence
//!
//! ## Example
//!
//! ```rust,ignore
//! use microslice::config::Options;
//! use microslice::print::Pipeline;
//!
//! let options = Options::default();
//! Pipeline::new(options).process("model.stl", "model.gcode")?;
//! ```

pub mod clipper;
pub mod config;
pub mod gcode;
pub mod geometry;
pub mod mesh;
pub mod modifier;
pub mod print;
pub mod slice;

/// Integer coordinate type. 1 unit = 1 micrometer.
pub type Coord = i64;

/// Floating point coordinate type (millimeters, unscaled).
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 micrometer, so 1mm = 1_000 units.
pub const SCALING_FACTOR: f64 = 1_000.0;

/// Scale a floating-point millimeter value to integer micrometers.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale integer micrometers to floating-point millimeters.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Convert an angle in degrees to radians.
#[inline]
pub fn to_radians(degrees: CoordF) -> CoordF {
    degrees * std::f64::consts::PI / 180.0
}

/// Result type used throughout the slicer.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Attribute error: {0}")]
    Attribute(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
