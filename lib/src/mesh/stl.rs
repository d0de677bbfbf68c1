//! STL model loading.
//!
//! Inputs carry no unit metadata and are interpreted as millimeters. The
//! format is picked from the data itself: a well-formed binary file states
//! its own length (80 header bytes, a 4-byte triangle count and fifty
//! bytes per triangle), so the length equation identifies binary files
//! even when their header happens to start with `solid`. Everything else
//! announcing a `solid` header is parsed as ASCII.

use super::TriangleMesh;
use crate::geometry::Point3F;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Size of the binary header plus triangle count field.
const BINARY_PREFIX: usize = 84;

/// Size of one binary triangle record: normal, three vertices, attribute
/// byte count.
const BINARY_RECORD: usize = 50;

/// Load a triangle mesh from an STL file.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let bytes = fs::read(path.as_ref())?;
    parse_stl(&bytes)
}

/// Parse STL data, picking the format from its structure.
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh> {
    if let Some(count) = consistent_binary_count(bytes) {
        return parse_binary(bytes, count);
    }

    if bytes.starts_with(b"solid") {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::Mesh("ASCII STL contains invalid UTF-8".into()))?;
        return parse_ascii(text);
    }

    // Neither self-consistent binary nor ASCII; parse the declared count
    // anyway and let the record parser report what is wrong.
    parse_binary(bytes, declared_count(bytes)?)
}

/// Triangle count of a structurally valid binary file.
///
/// Returns the declared count only when the file length matches it
/// exactly, which is what distinguishes binary data from ASCII text.
fn consistent_binary_count(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < BINARY_PREFIX {
        return None;
    }
    let count = u32::from_le_bytes(bytes[80..84].try_into().ok()?) as usize;
    (bytes.len() == BINARY_PREFIX + count * BINARY_RECORD).then_some(count)
}

/// Read the declared triangle count, requiring only the header to exist.
fn declared_count(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < BINARY_PREFIX {
        return Err(Error::Mesh("STL data shorter than a binary header".into()));
    }
    let field: [u8; 4] = bytes[80..84].try_into().expect("length checked above");
    Ok(u32::from_le_bytes(field) as usize)
}

/// Parse binary triangle records.
///
/// The stored normal is skipped; orientation comes from the vertex
/// winding wherever the pipeline needs it.
fn parse_binary(bytes: &[u8], count: usize) -> Result<TriangleMesh> {
    let records = &bytes[BINARY_PREFIX.min(bytes.len())..];
    if records.len() < count * BINARY_RECORD {
        return Err(Error::Mesh(format!(
            "binary STL truncated: {count} triangles declared, {} record bytes present",
            records.len()
        )));
    }

    let mut mesh = TriangleMesh::with_capacity(count * 3, count);
    for record in records.chunks_exact(BINARY_RECORD).take(count) {
        mesh.push_face(
            vertex_at(record, 12),
            vertex_at(record, 24),
            vertex_at(record, 36),
        );
    }

    if mesh.is_empty() {
        return Err(Error::Mesh("STL data contains no triangles".into()));
    }
    Ok(mesh)
}

/// Read the little-endian f32 vertex starting at `offset` of a record.
fn vertex_at(record: &[u8], offset: usize) -> Point3F {
    let float = |at: usize| {
        let raw: [u8; 4] = record[at..at + 4].try_into().expect("record is 50 bytes");
        f32::from_le_bytes(raw) as f64
    };
    Point3F::new(float(offset), float(offset + 4), float(offset + 8))
}

/// Parse ASCII STL as a token stream.
///
/// Every `vertex` keyword is followed by three coordinates and every
/// three vertices form one facet. No further keyword bookkeeping is done,
/// which also accepts the slightly malformed files some exporters write.
fn parse_ascii(text: &str) -> Result<TriangleMesh> {
    let mut mesh = TriangleMesh::new();
    let mut pending: Vec<Point3F> = Vec::with_capacity(3);

    let mut tokens = text.split_ascii_whitespace();
    while let Some(token) = tokens.next() {
        if token != "vertex" {
            continue;
        }

        let mut coord = || -> Result<f64> {
            tokens
                .next()
                .ok_or_else(|| Error::Mesh("ASCII STL ends inside a vertex".into()))?
                .parse()
                .map_err(|_| Error::Mesh("ASCII STL vertex is not a number".into()))
        };
        pending.push(Point3F::new(coord()?, coord()?, coord()?));

        if pending.len() == 3 {
            mesh.push_face(pending[0], pending[1], pending[2]);
            pending.clear();
        }
    }

    if mesh.is_empty() {
        return Err(Error::Mesh("STL data contains no triangles".into()));
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an ASCII STL from facet vertex triples.
    fn ascii_fixture(facets: &[[[f64; 3]; 3]]) -> String {
        let mut s = String::from("solid fixture\n");
        for facet in facets {
            s.push_str("facet normal 0.0 0.0 0.0\n  outer loop\n");
            for v in facet {
                s.push_str(&format!("    vertex {} {} {}\n", v[0], v[1], v[2]));
            }
            s.push_str("  endloop\nendfacet\n");
        }
        s.push_str("endsolid fixture\n");
        s
    }

    /// Build a binary STL from facet vertex triples, with an arbitrary
    /// header.
    fn binary_fixture(header: &[u8], facets: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = header.to_vec();
        bytes.resize(80, 0);
        bytes.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for facet in facets {
            bytes.extend_from_slice(&[0u8; 12]); // normal, ignored
            for v in facet {
                for f in v {
                    bytes.extend_from_slice(&f.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_parse_ascii() {
        let text = ascii_fixture(&[
            [[-1.5, 0.0, 0.25], [4.0, 0.0, 0.25], [0.0, 3.0, 0.25]],
            [[4.0, 0.0, 0.25], [4.0, 3.0, 0.25], [0.0, 3.0, 0.25]],
        ]);

        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);

        let first = mesh.triangle_vertices(0);
        assert!((first[0].x + 1.5).abs() < 1e-9);
        assert!((first[2].y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ascii_without_triangles_fails() {
        assert!(parse_stl(b"solid empty\nendsolid empty\n").is_err());
    }

    #[test]
    fn test_parse_ascii_bad_coordinate_fails() {
        let text = "solid broken\nvertex 0 zero 0\n";
        assert!(parse_stl(text.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_binary() {
        let bytes = binary_fixture(
            b"made by a test",
            &[[[0.0, 0.0, 0.0], [12.5, 0.0, 0.0], [0.0, 12.5, 7.0]]],
        );

        let mesh = parse_stl(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        let verts = mesh.triangle_vertices(0);
        assert!((verts[1].x - 12.5).abs() < 1e-6);
        assert!((verts[2].z - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_binary_with_solid_header() {
        // The length equation overrides the misleading header.
        let bytes = binary_fixture(
            b"solid exported-by-cad",
            &[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]],
        );

        let mesh = parse_stl(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_truncated_binary_fails() {
        let mut bytes = binary_fixture(
            b"",
            &[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]],
        );
        // Lie about the count: two declared, one present.
        bytes[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert!(parse_stl(&bytes).is_err());
    }

    #[test]
    fn test_too_short_input_fails() {
        assert!(parse_stl(b"not an stl").is_err());
    }

    #[test]
    fn test_load_stl_from_disk() {
        use std::io::Write;

        let bytes = binary_fixture(
            b"",
            &[[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, 5.0, 2.0]]],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plate.stl");
        fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let mesh = load_stl(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }
}
