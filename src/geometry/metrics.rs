//! Geometry metrics for simplex cells.
//!
//! The reference elements use the following vertex ordering:
//! - Segment: `[v0, v1]`.
//! - Triangle: `[v0, v1, v2]`, counter-clockwise in XY for positive area.
//! - Tetrahedron: `[v0, v1, v2, v3]` with `(v1 - v0) · ((v2 - v0) × (v3 - v0)) > 0`.
//!
//! Triangles lying in the XY plane carry a signed area; triangles embedded in
//! 3D have no intrinsic orientation and report the unsigned area.

use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::point::PointId;

/// Compute the signed cell volume/area/length for the given vertices.
pub fn simplex_volume(cell_type: CellType, vertices: &[Point]) -> Result<f64, MeshError> {
    let expected = cell_type.vertex_count();
    if vertices.len() != expected {
        return Err(MeshError::VertexCountMismatch {
            cell_type: cell_type.name(),
            expected,
            found: vertices.len(),
        });
    }
    let v: Vec<[f64; 3]> = vertices.iter().map(Point::coords).collect();
    let volume = match cell_type {
        CellType::Segment => norm(sub(v[1], v[0])),
        CellType::Triangle => {
            let n = cross(sub(v[1], v[0]), sub(v[2], v[0]));
            if v.iter().all(|p| p[2] == 0.0) {
                0.5 * n[2]
            } else {
                0.5 * norm(n)
            }
        }
        CellType::Tetrahedron => signed_volume(v[0], v[1], v[2], v[3]),
    };
    Ok(volume)
}

/// Returns `volume` when it is finite and strictly positive.
///
/// # Errors
/// [`MeshError::GeometryError`] for degenerate (zero) or inverted
/// (negative) elements.
pub fn check_positive_volume(elem: PointId, volume: f64) -> Result<f64, MeshError> {
    if volume.is_finite() && volume > 0.0 {
        Ok(volume)
    } else {
        Err(MeshError::GeometryError { elem, volume })
    }
}

/// Vertex average.
pub fn centroid(vertices: &[Point]) -> Point {
    let mut c = [0.0; 3];
    for p in vertices {
        let xyz = p.coords();
        c[0] += xyz[0];
        c[1] += xyz[1];
        c[2] += xyz[2];
    }
    let n = vertices.len().max(1) as f64;
    Point::from([c[0] / n, c[1] / n, c[2] / n])
}

/// Whether `p` lies in the plane of `triangle` and inside it.
///
/// Both tests allow a slack of `tol` relative to the longest edge.
pub fn triangle_contains(triangle: &[Point; 3], p: &Point, tol: f64) -> bool {
    let [a, b, c] = triangle.map(|q| q.coords());
    let x = p.coords();
    let n = cross(sub(b, a), sub(c, a));
    let area2 = norm(n);
    if area2 == 0.0 {
        return false;
    }
    let scale = norm(sub(b, a)).max(norm(sub(c, b))).max(norm(sub(a, c)));
    if dot(sub(x, a), n).abs() > tol * scale * area2 {
        return false;
    }
    // `p` must sit on the inner side of every edge.
    [(a, b), (b, c), (c, a)]
        .into_iter()
        .all(|(u, v)| dot(cross(sub(v, u), sub(x, u)), n) >= -tol * area2 * area2)
}

/// All points whose barycentric coordinates are multiples of `1 / level`.
///
/// The lattice includes the vertices themselves; `level == 0` yields the
/// centroid only.
pub fn barycentric_lattice(vertices: &[Point], level: usize) -> Vec<Point> {
    if level == 0 || vertices.is_empty() {
        return vec![centroid(vertices)];
    }
    let mut out = Vec::new();
    let mut weights = vec![0usize; vertices.len()];
    fill_lattice(vertices, level, 0, level, &mut weights, &mut out);
    out
}

fn fill_lattice(
    vertices: &[Point],
    level: usize,
    slot: usize,
    remaining: usize,
    weights: &mut [usize],
    out: &mut Vec<Point>,
) {
    if slot + 1 == vertices.len() {
        weights[slot] = remaining;
        let mut c = [0.0; 3];
        for (p, &w) in vertices.iter().zip(weights.iter()) {
            let t = w as f64 / level as f64;
            let xyz = p.coords();
            c[0] += t * xyz[0];
            c[1] += t * xyz[1];
            c[2] += t * xyz[2];
        }
        out.push(Point::from(c));
        return;
    }
    for w in 0..=remaining {
        weights[slot] = w;
        fill_lattice(vertices, level, slot + 1, remaining - w, weights, out);
    }
}

fn signed_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    let ab = sub(b, a);
    let ac = sub(c, a);
    let ad = sub(d, a);
    dot(ab, cross(ac, ad)) / 6.0
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
