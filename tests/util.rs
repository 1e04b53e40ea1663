#![allow(dead_code)]

use simplex_refine::geometry::point::Point;
use simplex_refine::topology::elem::Elem;
use simplex_refine::topology::mesh::{InMemoryMesh, SimplexMesh};
use simplex_refine::topology::point::PointId;

/// Fills `[0, n h]^3` with `n^3` cubes of six Kuhn tetrahedra each.
///
/// Every cube is cut along its `(0, 0, 0)`-`(1, 1, 1)` diagonal, so the
/// cubes meet face to face. Vertices strictly inside the box are moved by
/// `jitter([i, j, k])`; boundary vertices stay on the box faces.
pub fn kuhn_grid<F>(mesh: &mut InMemoryMesh, n: usize, h: f64, jitter: F)
where
    F: Fn([usize; 3]) -> [f64; 3],
{
    let side = n + 1;
    let mut nodes = Vec::with_capacity(side * side * side);
    for k in 0..side {
        for j in 0..side {
            for i in 0..side {
                let inside = [i, j, k].iter().all(|c| *c > 0 && *c < n);
                let d = if inside { jitter([i, j, k]) } else { [0.0; 3] };
                let p = [
                    h * i as f64 + d[0],
                    h * j as f64 + d[1],
                    h * k as f64 + d[2],
                ];
                nodes.push(mesh.add_node(p).unwrap());
            }
        }
    }
    let at = |i: usize, j: usize, k: usize| nodes[i + side * (j + side * k)];

    for ck in 0..n {
        for cj in 0..n {
            for ci in 0..n {
                let corner: Vec<PointId> = (0..8)
                    .map(|b| at(ci + (b & 1), cj + ((b >> 1) & 1), ck + ((b >> 2) & 1)))
                    .collect();
                for (i, j) in [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)] {
                    let a = corner[1 << i];
                    let b = corner[(1 << i) | (1 << j)];
                    let mut tet = Elem::tetrahedron([corner[0], a, b, corner[7]]).unwrap();
                    if tet.volume(|v| mesh.try_node(v)).unwrap() < 0.0 {
                        tet = Elem::tetrahedron([corner[0], b, a, corner[7]]).unwrap();
                    }
                    mesh.add_elem(tet).unwrap();
                }
            }
        }
    }
}

/// Six positively oriented tetrahedra filling the cube `[0, h]^3`.
pub fn kuhn_cube(mesh: &mut InMemoryMesh, h: f64) {
    kuhn_grid(mesh, 1, h, |_| [0.0; 3]);
}

/// Area of a triangle in space.
pub fn triangle_area(t: &[Point; 3]) -> f64 {
    let [a, b, c] = t.map(|p| p.coords());
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    0.5 * (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
}
