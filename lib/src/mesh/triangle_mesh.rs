//! Triangle mesh data structure.

use crate::geometry::Point3F;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single triangle referencing three vertices by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    /// Create a new triangle from vertex indices.
    #[inline]
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// A triangle mesh with floating-point millimeter vertices.
///
/// This is the raw representation produced by the STL reader; vertices are
/// not shared between triangles until the optimizer deduplicates them.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    vertices: Vec<Point3F>,
    triangles: Vec<Triangle>,
}

impl TriangleMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
        }
    }

    /// Add a vertex and return nothing; indices are assigned sequentially.
    #[inline]
    pub fn add_vertex(&mut self, v: Point3F) {
        self.vertices.push(v);
    }

    /// Add a triangle referencing previously added vertices.
    #[inline]
    pub fn add_triangle(&mut self, t: Triangle) {
        self.triangles.push(t);
    }

    /// Append a free-standing triangle given by its three corners.
    pub fn push_face(&mut self, a: Point3F, b: Point3F, c: Point3F) {
        let base = self.vertices.len() as u32;
        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);
        self.triangles.push(Triangle::new(base, base + 1, base + 2));
    }

    /// Get the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Get the vertex positions of triangle `idx`.
    pub fn triangle_vertices(&self, idx: usize) -> [Point3F; 3] {
        let t = &self.triangles[idx];
        [
            self.vertices[t.indices[0] as usize],
            self.vertices[t.indices[1] as usize],
            self.vertices[t.indices[2] as usize],
        ]
    }

    /// Iterate over all triangles as vertex triples.
    pub fn faces(&self) -> impl Iterator<Item = [Point3F; 3]> + '_ {
        (0..self.triangle_count()).map(|i| self.triangle_vertices(i))
    }

    /// Create an axis-aligned cuboid between `min` and `max`.
    pub fn cuboid(min: Point3F, max: Point3F) -> Self {
        let mut mesh = Self::with_capacity(36, 12);

        let v = |x: CoordF, y: CoordF, z: CoordF| Point3F::new(x, y, z);
        let corners = [
            v(min.x, min.y, min.z),
            v(max.x, min.y, min.z),
            v(max.x, max.y, min.z),
            v(min.x, max.y, min.z),
            v(min.x, min.y, max.z),
            v(max.x, min.y, max.z),
            v(max.x, max.y, max.z),
            v(min.x, max.y, max.z),
        ];

        // Each face as two triangles with outward normals.
        const FACES: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // bottom (-z)
            [4, 5, 6, 7], // top (+z)
            [0, 1, 5, 4], // front (-y)
            [2, 3, 7, 6], // back (+y)
            [1, 2, 6, 5], // right (+x)
            [3, 0, 4, 7], // left (-x)
        ];

        for quad in FACES {
            mesh.push_face(corners[quad[0]], corners[quad[1]], corners[quad[2]]);
            mesh.push_face(corners[quad[0]], corners[quad[2]], corners[quad[3]]);
        }

        mesh
    }

    /// Create a cube of the given edge length with its base centered on
    /// the origin at z = 0.
    pub fn cube(size: CoordF) -> Self {
        let h = size / 2.0;
        Self::cuboid(Point3F::new(-h, -h, 0.0), Point3F::new(h, h, size))
    }

    /// Create a square pyramid with the given base edge length and height,
    /// base centered on the origin at z = 0.
    pub fn pyramid(base: CoordF, height: CoordF) -> Self {
        let h = base / 2.0;
        let apex = Point3F::new(0.0, 0.0, height);
        let corners = [
            Point3F::new(-h, -h, 0.0),
            Point3F::new(h, -h, 0.0),
            Point3F::new(h, h, 0.0),
            Point3F::new(-h, h, 0.0),
        ];

        let mut mesh = Self::with_capacity(18, 6);
        // base
        mesh.push_face(corners[0], corners[2], corners[1]);
        mesh.push_face(corners[0], corners[3], corners[2]);
        // sides
        for i in 0..4 {
            mesh.push_face(corners[i], corners[(i + 1) % 4], apex);
        }
        mesh
    }

    /// Create a cube with a vertical cylindrical hole through its center.
    ///
    /// The hole is approximated by an `segments`-sided prism. Base centered
    /// on the origin at z = 0.
    pub fn cube_with_hole(size: CoordF, radius: CoordF, segments: usize) -> Self {
        let h = size / 2.0;
        let outer = [
            (h, h),
            (-h, h),
            (-h, -h),
            (h, -h),
        ];
        let inner: Vec<(CoordF, CoordF)> = (0..segments)
            .map(|i| {
                let a = 2.0 * std::f64::consts::PI * i as CoordF / segments as CoordF;
                (radius * a.cos(), radius * a.sin())
            })
            .collect();

        let mut mesh = Self::new();

        // outer walls
        for i in 0..4 {
            let (x0, y0) = outer[i];
            let (x1, y1) = outer[(i + 1) % 4];
            let a = Point3F::new(x0, y0, 0.0);
            let b = Point3F::new(x1, y1, 0.0);
            let at = Point3F::new(x0, y0, size);
            let bt = Point3F::new(x1, y1, size);
            mesh.push_face(a, b, bt);
            mesh.push_face(a, bt, at);
        }

        // inner walls (normals point into the hole)
        for i in 0..segments {
            let (x0, y0) = inner[i];
            let (x1, y1) = inner[(i + 1) % segments];
            let a = Point3F::new(x0, y0, 0.0);
            let b = Point3F::new(x1, y1, 0.0);
            let at = Point3F::new(x0, y0, size);
            let bt = Point3F::new(x1, y1, size);
            mesh.push_face(b, a, at);
            mesh.push_face(b, at, bt);
        }

        // top and bottom annuli, bridged between the two rings
        for (z, flip) in [(size, false), (0.0, true)] {
            for tri in bridge_rings(&outer, &inner) {
                let [p, q, r] = tri;
                let a = Point3F::new(p.0, p.1, z);
                let b = Point3F::new(q.0, q.1, z);
                let c = Point3F::new(r.0, r.1, z);
                if flip {
                    mesh.push_face(a, c, b);
                } else {
                    mesh.push_face(a, b, c);
                }
            }
        }

        mesh
    }
}

/// Triangulate the annulus between an outer and an inner ring.
///
/// Both rings must be counter-clockwise. The pointer on the ring whose next
/// vertex comes first by angle advances, producing a fan of triangles that
/// covers the annulus without crossing either boundary.
fn bridge_rings(
    outer: &[(CoordF, CoordF)],
    inner: &[(CoordF, CoordF)],
) -> Vec<[(CoordF, CoordF); 3]> {
    let angle = |p: &(CoordF, CoordF)| p.1.atan2(p.0);

    // Start both pointers at the vertex with the smallest angle.
    let start_of = |ring: &[(CoordF, CoordF)]| {
        ring.iter()
            .enumerate()
            .min_by(|a, b| angle(a.1).partial_cmp(&angle(b.1)).expect("finite angles"))
            .map(|(i, _)| i)
            .expect("non-empty ring")
    };

    let oi0 = start_of(outer);
    let ii0 = start_of(inner);

    let mut tris = Vec::with_capacity(outer.len() + inner.len());
    let mut oi = 0; // steps taken on the outer ring
    let mut ii = 0; // steps taken on the inner ring

    let wrap = |base: usize, step: usize, len: usize| (base + step) % len;

    while oi < outer.len() || ii < inner.len() {
        let o_cur = outer[wrap(oi0, oi, outer.len())];
        let i_cur = inner[wrap(ii0, ii, inner.len())];

        let advance_outer = if oi == outer.len() {
            false
        } else if ii == inner.len() {
            true
        } else {
            // unwrapped angle of the next candidate on each ring
            let o_next = outer[wrap(oi0, oi + 1, outer.len())];
            let i_next = inner[wrap(ii0, ii + 1, inner.len())];
            let base = angle(&outer[oi0]);
            let unwrapped = |p: &(CoordF, CoordF), steps_done: usize, len: usize| {
                let mut a = angle(p) - base;
                while a < 0.0 {
                    a += 2.0 * std::f64::consts::PI;
                }
                // completing the ring wraps past a full turn
                if steps_done + 1 >= len {
                    a + 2.0 * std::f64::consts::PI
                } else {
                    a
                }
            };
            unwrapped(&o_next, oi, outer.len()) <= unwrapped(&i_next, ii, inner.len())
        };

        if advance_outer {
            let o_next = outer[wrap(oi0, oi + 1, outer.len())];
            tris.push([o_cur, o_next, i_cur]);
            oi += 1;
        } else {
            let i_next = inner[wrap(ii0, ii + 1, inner.len())];
            tris.push([o_cur, i_next, i_cur]);
            ii += 1;
        }
    }

    tris
}

impl fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TriangleMesh({} vertices, {} triangles)",
            self.vertices.len(),
            self.triangles.len()
        )
    }
}
