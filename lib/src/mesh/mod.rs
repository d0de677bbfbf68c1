//! Mesh loading and processing.
//!
//! This module provides types and functions for working with triangle meshes:
//! - [`TriangleMesh`] - The raw triangle mesh as read from disk
//! - [`OptimizedModel`] - Deduplicated vertices plus face adjacency
//! - STL file loading (binary with ASCII fallback)

mod optimized;
mod stl;
mod triangle_mesh;

pub use optimized::{optimize, OptimizedFace, OptimizedModel};
pub use stl::{load_stl, parse_stl};
pub use triangle_mesh::{Triangle, TriangleMesh};
