//! Mesh validation helpers.
//!
//! A mesh is conforming when no node sits in the interior of an edge that
//! some element still uses unsplit. With affine bisection the only node that
//! can do so is the edge's midpoint, so the check looks for edges `(a, b)`
//! whose endpoints are both joined to a node `m` at the center of `ab`.
//!
//! In 3D that is not enough: the tetrahedra on the two sides of a face can
//! each cut it without hanging nodes and still pick different diagonals.
//! [`validate_face_conformity`] catches those by comparing the facets used
//! only once against the domain boundary taken before refinement.

use crate::geometry::metrics::{centroid, check_positive_volume, triangle_contains};
use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::mesh::SimplexMesh;
use crate::topology::point::PointId;
use crate::topology::refine::registry::EdgeKey;
use hashbrown::{HashMap, HashSet};
use std::collections::{BTreeMap, BTreeSet};

const MIDPOINT_TOL: f64 = 1e-10;
const FACET_TOL: f64 = 1e-9;

/// Every distinct edge of the mesh, ascending.
pub fn mesh_edges<M>(mesh: &M) -> Result<BTreeSet<EdgeKey>, MeshError>
where
    M: SimplexMesh + ?Sized,
{
    let mut edges = BTreeSet::new();
    for id in mesh.elem_ids() {
        edges.extend(mesh.try_elem(id)?.edge_keys());
    }
    Ok(edges)
}

/// Check that no element uses an edge that another element has split.
///
/// # Errors
/// [`MeshError::ConformityViolation`] naming the unsplit edge and the
/// hanging midpoint node.
pub fn validate_conformity<M>(mesh: &M) -> Result<(), MeshError>
where
    M: SimplexMesh + ?Sized,
{
    let edges = mesh_edges(mesh)?;
    let mut adjacency: HashMap<PointId, HashSet<PointId>> = HashMap::new();
    for key in &edges {
        adjacency.entry(key.lo()).or_default().insert(key.hi());
        adjacency.entry(key.hi()).or_default().insert(key.lo());
    }

    for key in &edges {
        let (Some(around_lo), Some(around_hi)) =
            (adjacency.get(&key.lo()), adjacency.get(&key.hi()))
        else {
            continue;
        };
        let pa = mesh.try_node(key.lo())?;
        let pb = mesh.try_node(key.hi())?;
        let center = pa.midpoint(&pb);
        let tol = MIDPOINT_TOL * pa.distance(&pb);
        let mut shared: Vec<_> = around_lo.intersection(around_hi).copied().collect();
        shared.sort_unstable();
        for m in shared {
            if mesh.try_node(m)?.distance(&center) <= tol {
                return Err(MeshError::ConformityViolation {
                    edge: *key,
                    node: m,
                    reason: "an element keeps the edge unsplit while a neighbor bisected it"
                        .into(),
                });
            }
        }
    }
    Ok(())
}

/// Tetrahedron facets (vertex ids ascending) with their number of users.
fn tet_facets<M>(mesh: &M) -> Result<BTreeMap<[PointId; 3], usize>, MeshError>
where
    M: SimplexMesh + ?Sized,
{
    let mut facets = BTreeMap::new();
    for id in mesh.elem_ids() {
        let elem = mesh.try_elem(id)?;
        if elem.cell_type() != CellType::Tetrahedron {
            continue;
        }
        let v = elem.vertices();
        for side in 0..4 {
            let mut facet = [v[(side + 1) % 4], v[(side + 2) % 4], v[(side + 3) % 4]];
            facet.sort_unstable();
            *facets.entry(facet).or_insert(0) += 1;
        }
    }
    Ok(facets)
}

fn over_shared(facets: &BTreeMap<[PointId; 3], usize>) -> Result<(), MeshError> {
    match facets.iter().find(|(_, n)| **n > 2) {
        Some((facet, n)) => Err(MeshError::FaceConformityViolation {
            facet: *facet,
            reason: format!("shared by {n} tetrahedra"),
        }),
        None => Ok(()),
    }
}

/// Positions of the tetrahedron facets used by exactly one element.
///
/// On a conforming mesh these tile the domain boundary. Take this snapshot
/// before refining and hand it to [`validate_face_conformity`] afterwards.
pub fn boundary_facets<M>(mesh: &M) -> Result<Vec<[Point; 3]>, MeshError>
where
    M: SimplexMesh + ?Sized,
{
    let mut out = Vec::new();
    for (facet, n) in tet_facets(mesh)? {
        if n == 1 {
            out.push([
                mesh.try_node(facet[0])?,
                mesh.try_node(facet[1])?,
                mesh.try_node(facet[2])?,
            ]);
        }
    }
    Ok(out)
}

/// Check that tetrahedra sharing a face subdivide it the same way.
///
/// Every facet must be used by exactly two tetrahedra, or by one when it
/// lies on `boundary` (see [`boundary_facets`]). Meshes without tetrahedra
/// pass trivially; [`validate_conformity`] covers their edges.
///
/// # Errors
/// [`MeshError::FaceConformityViolation`] naming the first offending facet.
pub fn validate_face_conformity<M>(mesh: &M, boundary: &[[Point; 3]]) -> Result<(), MeshError>
where
    M: SimplexMesh + ?Sized,
{
    let facets = tet_facets(mesh)?;
    over_shared(&facets)?;
    for (facet, n) in facets {
        if n != 1 {
            continue;
        }
        let corners = [
            mesh.try_node(facet[0])?,
            mesh.try_node(facet[1])?,
            mesh.try_node(facet[2])?,
        ];
        let center = centroid(&corners);
        if !boundary
            .iter()
            .any(|tri| triangle_contains(tri, &center, FACET_TOL))
        {
            return Err(MeshError::FaceConformityViolation {
                facet,
                reason: "interior facet has no matching neighbor".into(),
            });
        }
    }
    Ok(())
}

/// Check that every element has a strictly positive volume.
pub fn validate_positive_volumes<M>(mesh: &M) -> Result<(), MeshError>
where
    M: SimplexMesh + ?Sized,
{
    for id in mesh.elem_ids() {
        check_positive_volume(id, mesh.elem_volume(id)?)?;
    }
    Ok(())
}

/// All checks that need no reference boundary: node references, positive
/// volumes, no facet shared by more than two tetrahedra, no hanging
/// midpoints.
pub fn validate_mesh<M>(mesh: &M) -> Result<(), MeshError>
where
    M: SimplexMesh + ?Sized,
{
    for id in mesh.elem_ids() {
        for v in mesh.try_elem(id)?.vertices() {
            mesh.try_node(*v)?;
        }
    }
    validate_positive_volumes(mesh)?;
    over_shared(&tet_facets(mesh)?)?;
    validate_conformity(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::elem::Elem;
    use crate::topology::mesh::InMemoryMesh;

    #[test]
    fn hanging_node_is_detected() {
        // Left triangle split along (a, b), right neighbor left untouched.
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node([0.0, 0.0]).unwrap();
        let b = mesh.add_node([2.0, 0.0]).unwrap();
        let c = mesh.add_node([1.0, 1.0]).unwrap();
        let d = mesh.add_node([1.0, -1.0]).unwrap();
        let m = mesh.add_node([1.0, 0.0]).unwrap();
        mesh.add_elem(Elem::triangle([a, m, c]).unwrap()).unwrap();
        mesh.add_elem(Elem::triangle([m, b, c]).unwrap()).unwrap();
        mesh.add_elem(Elem::triangle([b, a, d]).unwrap()).unwrap();

        let err = validate_conformity(&mesh).unwrap_err();
        match err {
            MeshError::ConformityViolation { edge, node, .. } => {
                assert_eq!(edge, EdgeKey::new(a, b).unwrap());
                assert_eq!(node, m);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn conforming_pair_passes() {
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node([0.0, 0.0]).unwrap();
        let b = mesh.add_node([1.0, 0.0]).unwrap();
        let c = mesh.add_node([1.0, 1.0]).unwrap();
        let d = mesh.add_node([0.0, 1.0]).unwrap();
        mesh.add_elem(Elem::triangle([a, b, c]).unwrap()).unwrap();
        mesh.add_elem(Elem::triangle([a, c, d]).unwrap()).unwrap();
        validate_mesh(&mesh).unwrap();
        assert_eq!(mesh_edges(&mesh).unwrap().len(), 5);
    }

    /// Two tetrahedra on either side of the square `p q r s` in the plane
    /// `z = 0`, split along the diagonal `(p, r)` from below and `(q, s)`
    /// from above.
    fn mismatched_diagonals() -> (InMemoryMesh, Vec<[Point; 3]>) {
        let mut mesh = InMemoryMesh::new();
        let p = mesh.add_node([0.0, 0.0, 0.0]).unwrap();
        let q = mesh.add_node([1.0, 0.0, 0.0]).unwrap();
        let r = mesh.add_node([1.0, 1.0, 0.0]).unwrap();
        let s = mesh.add_node([0.0, 1.0, 0.0]).unwrap();
        let top = mesh.add_node([0.5, 0.5, 1.0]).unwrap();
        let bottom = mesh.add_node([0.5, 0.5, -1.0]).unwrap();
        let mut add = |vs: [PointId; 4]| {
            let mut tet = Elem::tetrahedron(vs).unwrap();
            if tet.volume(|v| mesh.try_node(v)).unwrap() < 0.0 {
                tet = Elem::tetrahedron([vs[1], vs[0], vs[2], vs[3]]).unwrap();
            }
            mesh.add_elem(tet).unwrap();
        };
        add([p, q, r, bottom]);
        add([p, r, s, bottom]);
        add([p, q, s, top]);
        add([q, r, s, top]);
        // The hull is the eight slanted faces of the double pyramid.
        let at = |id: PointId| mesh.try_node(id).unwrap();
        let hull: Vec<[Point; 3]> = [(p, q), (q, r), (r, s), (s, p)]
            .into_iter()
            .flat_map(|(a, b)| [[at(a), at(b), at(top)], [at(a), at(b), at(bottom)]])
            .collect();
        (mesh, hull)
    }

    #[test]
    fn mismatched_face_diagonals_are_detected() {
        let (mesh, hull) = mismatched_diagonals();
        // No edge carries a midpoint, so the edge check is blind to it.
        validate_mesh(&mesh).unwrap();
        assert_eq!(boundary_facets(&mesh).unwrap().len(), 12);
        assert!(matches!(
            validate_face_conformity(&mesh, &hull),
            Err(MeshError::FaceConformityViolation { .. })
        ));
    }

    #[test]
    fn matched_face_passes() {
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node([0.0, 0.0, 0.0]).unwrap();
        let b = mesh.add_node([1.0, 0.0, 0.0]).unwrap();
        let c = mesh.add_node([0.0, 1.0, 0.0]).unwrap();
        let up = mesh.add_node([0.2, 0.2, 1.0]).unwrap();
        let down = mesh.add_node([0.2, 0.2, -1.0]).unwrap();
        mesh.add_elem(Elem::tetrahedron([a, b, c, up]).unwrap()).unwrap();
        mesh.add_elem(Elem::tetrahedron([a, c, b, down]).unwrap()).unwrap();
        validate_mesh(&mesh).unwrap();
        let hull = boundary_facets(&mesh).unwrap();
        assert_eq!(hull.len(), 6);
        validate_face_conformity(&mesh, &hull).unwrap();
    }

    #[test]
    fn inverted_element_is_reported() {
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node([0.0, 0.0]).unwrap();
        let b = mesh.add_node([1.0, 0.0]).unwrap();
        let c = mesh.add_node([0.0, 1.0]).unwrap();
        let t = mesh.add_elem(Elem::triangle([a, c, b]).unwrap()).unwrap();
        assert!(matches!(
            validate_positive_volumes(&mesh),
            Err(MeshError::GeometryError { elem, .. }) if elem == t
        ));
    }
}
