//! Mesh optimization: vertex deduplication and face adjacency.
//!
//! The slicer walks from an intersected triangle to its neighbor while
//! stitching segments, so it needs a vertex-shared, face-adjacent mesh.
//! The optimizer snaps every vertex onto the integer micrometer grid,
//! merges exact duplicates, and records for each face the up to three
//! faces sharing one of its edges.

use super::TriangleMesh;
use crate::geometry::Point3;
use crate::{Error, Result};
use std::collections::HashMap;

/// A triangle with shared vertex indices and neighbor links.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizedFace {
    /// Indices into the shared vertex list.
    pub indices: [usize; 3],
    /// Index of the neighbor face across each edge `(i, i+1)`, or -1 when
    /// the edge has no partner.
    pub touching: [i64; 3],
}

impl OptimizedFace {
    /// Get the minimum and maximum Z of the face's vertices.
    pub fn z_range(&self, vertices: &[Point3]) -> (crate::Coord, crate::Coord) {
        let z0 = vertices[self.indices[0]].z;
        let z1 = vertices[self.indices[1]].z;
        let z2 = vertices[self.indices[2]].z;
        (z0.min(z1).min(z2), z0.max(z1).max(z2))
    }
}

/// A deduplicated, face-adjacent triangle mesh in micrometer coordinates.
#[derive(Clone, Debug, Default)]
pub struct OptimizedModel {
    pub vertices: Vec<Point3>,
    pub faces: Vec<OptimizedFace>,
    pub min: Point3,
    pub max: Point3,
}

impl OptimizedModel {
    /// Get the number of faces.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Get a face by index.
    #[inline]
    pub fn face(&self, idx: usize) -> &OptimizedFace {
        &self.faces[idx]
    }

    /// Get the snapped position of a face vertex.
    #[inline]
    pub fn face_vertex(&self, face: usize, corner: usize) -> Point3 {
        self.vertices[self.faces[face].indices[corner]]
    }
}

/// Optimize a raw triangle mesh.
///
/// Fails with a mesh error when the input has no usable faces. Edges
/// shared by more than two faces are tolerated; the first two faces
/// encountered become neighbors.
pub fn optimize(mesh: &TriangleMesh) -> Result<OptimizedModel> {
    if mesh.is_empty() {
        return Err(Error::Mesh("mesh contains no faces".into()));
    }

    let mut vertex_index: HashMap<Point3, usize> = HashMap::new();
    let mut vertices: Vec<Point3> = Vec::new();
    let mut faces: Vec<OptimizedFace> = Vec::new();

    for tri in mesh.faces() {
        let mut indices = [0usize; 3];
        for (slot, corner) in tri.iter().enumerate() {
            let snapped = corner.to_micrometer();
            let next = vertices.len();
            let idx = *vertex_index.entry(snapped).or_insert(next);
            if idx == next {
                vertices.push(snapped);
            }
            indices[slot] = idx;
        }

        // Snapping can collapse a sliver triangle onto a line or point.
        if indices[0] == indices[1] || indices[1] == indices[2] || indices[2] == indices[0] {
            continue;
        }

        faces.push(OptimizedFace {
            indices,
            touching: [-1; 3],
        });
    }

    if faces.is_empty() {
        return Err(Error::Mesh(
            "mesh contains no non-degenerate faces".into(),
        ));
    }

    // Map each undirected edge to the faces using it.
    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (face_idx, face) in faces.iter().enumerate() {
        for i in 0..3 {
            let a = face.indices[i];
            let b = face.indices[(i + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push(face_idx);
        }
    }

    for face_idx in 0..faces.len() {
        for i in 0..3 {
            let a = faces[face_idx].indices[i];
            let b = faces[face_idx].indices[(i + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };

            // Only the first two faces on an edge pair up; any further
            // duplicates keep a boundary marker so the neighbor relation
            // stays symmetric.
            let users = &edge_faces[&key];
            let pair = &users[..users.len().min(2)];
            if pair.contains(&face_idx) {
                if let Some(&n) = pair.iter().find(|&&other| other != face_idx) {
                    faces[face_idx].touching[i] = n as i64;
                }
            }
        }
    }

    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in &vertices {
        min = min.min(v);
        max = max.max(v);
    }

    Ok(OptimizedModel {
        vertices,
        faces,
        min,
        max,
    })
}
