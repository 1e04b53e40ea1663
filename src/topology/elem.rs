//! Simplex element records.
//!
//! An [`Elem`] is a [`CellType`] plus an ordered list of node ids. Side `i`
//! of an element is the facet opposite local vertex `i`; boundary ids are
//! attached per side so that bisection can hand them down to the children
//! whose sides lie on the parent's sides.

use crate::geometry::metrics::simplex_volume;
use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::point::PointId;
use crate::topology::refine::registry::EdgeKey;
use serde::{Deserialize, Serialize};

/// A mesh element: simplex kind, vertex ids, and tags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Elem {
    cell_type: CellType,
    vertices: Vec<PointId>,
    subdomain_id: u16,
    /// Sorted, deduplicated `(side, boundary id)` pairs.
    boundary: Vec<(u8, i32)>,
}

impl Elem {
    /// Creates an untagged element.
    ///
    /// # Errors
    /// - [`MeshError::VertexCountMismatch`] if `vertices` does not match `cell_type`.
    /// - [`MeshError::DegenerateEdge`] if a vertex is repeated.
    pub fn new(cell_type: CellType, vertices: Vec<PointId>) -> Result<Self, MeshError> {
        let expected = cell_type.vertex_count();
        if vertices.len() != expected {
            return Err(MeshError::VertexCountMismatch {
                cell_type: cell_type.name(),
                expected,
                found: vertices.len(),
            });
        }
        for (i, v) in vertices.iter().enumerate() {
            if vertices[..i].contains(v) {
                return Err(MeshError::DegenerateEdge(*v));
            }
        }
        Ok(Self {
            cell_type,
            vertices,
            subdomain_id: 0,
            boundary: Vec::new(),
        })
    }

    /// Shorthand for a triangle.
    pub fn triangle(vertices: [PointId; 3]) -> Result<Self, MeshError> {
        Self::new(CellType::Triangle, vertices.to_vec())
    }

    /// Shorthand for a tetrahedron.
    pub fn tetrahedron(vertices: [PointId; 4]) -> Result<Self, MeshError> {
        Self::new(CellType::Tetrahedron, vertices.to_vec())
    }

    /// Shorthand for a segment.
    pub fn segment(vertices: [PointId; 2]) -> Result<Self, MeshError> {
        Self::new(CellType::Segment, vertices.to_vec())
    }

    /// Builder-style subdomain assignment.
    pub fn with_subdomain(mut self, subdomain_id: u16) -> Self {
        self.subdomain_id = subdomain_id;
        self
    }

    /// Builder-style boundary id assignment on `side`.
    pub fn with_boundary(mut self, side: u8, id: i32) -> Result<Self, MeshError> {
        self.add_boundary_id(side, id)?;
        Ok(self)
    }

    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    #[inline]
    pub fn vertices(&self) -> &[PointId] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn subdomain_id(&self) -> u16 {
        self.subdomain_id
    }

    pub fn set_subdomain_id(&mut self, subdomain_id: u16) {
        self.subdomain_id = subdomain_id;
    }

    /// Tags `side` with boundary `id`.
    pub fn add_boundary_id(&mut self, side: u8, id: i32) -> Result<(), MeshError> {
        if side as usize >= self.vertices.len() {
            return Err(MeshError::InvalidGeometry(format!(
                "side {side} out of range for a {}",
                self.cell_type.name()
            )));
        }
        if let Err(pos) = self.boundary.binary_search(&(side, id)) {
            self.boundary.insert(pos, (side, id));
        }
        Ok(())
    }

    /// Boundary ids on `side`, ascending.
    pub fn boundary_ids(&self, side: u8) -> impl Iterator<Item = i32> + '_ {
        self.boundary
            .iter()
            .filter(move |(s, _)| *s == side)
            .map(|(_, id)| *id)
    }

    /// All `(side, boundary id)` pairs.
    pub fn boundary(&self) -> &[(u8, i32)] {
        &self.boundary
    }

    /// Vertex id pairs of every edge, in local edge order.
    pub fn edges(&self) -> impl Iterator<Item = (PointId, PointId)> + '_ {
        self.cell_type
            .edges()
            .iter()
            .map(move |[a, b]| (self.vertices[*a], self.vertices[*b]))
    }

    /// Canonical keys of every edge, in local edge order.
    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        // Vertices are pairwise distinct by construction.
        self.edges().map(|(a, b)| EdgeKey::from_distinct(a, b))
    }

    /// Local index of `node`, if it is a vertex of this element.
    pub fn local_index(&self, node: PointId) -> Option<usize> {
        self.vertices.iter().position(|v| *v == node)
    }

    /// Signed volume given a node-position lookup.
    pub fn volume<F>(&self, mut position: F) -> Result<f64, MeshError>
    where
        F: FnMut(PointId) -> Result<Point, MeshError>,
    {
        let pts = self.positions(&mut position)?;
        simplex_volume(self.cell_type, &pts)
    }

    /// Node positions in local vertex order.
    pub fn positions<F>(&self, mut position: F) -> Result<Vec<Point>, MeshError>
    where
        F: FnMut(PointId) -> Result<Point, MeshError>,
    {
        self.vertices.iter().map(|v| position(*v)).collect()
    }

    /// Copy of this element with local vertex `slot` replaced by `node`.
    ///
    /// Tags are carried over except boundary ids on `interior_side`, which is
    /// the side shared with the sibling after a bisection.
    pub(crate) fn with_vertex_replaced(
        &self,
        slot: usize,
        node: PointId,
        interior_side: usize,
    ) -> Self {
        let mut vertices = self.vertices.clone();
        vertices[slot] = node;
        Self {
            cell_type: self.cell_type,
            vertices,
            subdomain_id: self.subdomain_id,
            boundary: self
                .boundary
                .iter()
                .copied()
                .filter(|(side, _)| *side as usize != interior_side)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(id: u64) -> PointId {
        PointId::new(id).unwrap()
    }

    #[test]
    fn construction_checks_vertices() {
        assert!(Elem::triangle([pt(1), pt(2), pt(3)]).is_ok());
        assert!(matches!(
            Elem::new(CellType::Triangle, vec![pt(1), pt(2)]),
            Err(MeshError::VertexCountMismatch { expected: 3, found: 2, .. })
        ));
        assert_eq!(
            Elem::triangle([pt(1), pt(2), pt(1)]),
            Err(MeshError::DegenerateEdge(pt(1)))
        );
    }

    #[test]
    fn edge_keys_are_canonical() {
        let tri = Elem::triangle([pt(3), pt(1), pt(2)]).unwrap();
        let keys: Vec<_> = tri.edge_keys().map(|k| (k.lo().get(), k.hi().get())).collect();
        assert_eq!(keys, vec![(1, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn boundary_ids_are_sorted_and_unique() {
        let mut tri = Elem::triangle([pt(1), pt(2), pt(3)]).unwrap();
        tri.add_boundary_id(2, 7).unwrap();
        tri.add_boundary_id(0, 4).unwrap();
        tri.add_boundary_id(2, 7).unwrap();
        assert_eq!(tri.boundary(), &[(0, 4), (2, 7)]);
        assert_eq!(tri.boundary_ids(2).collect::<Vec<_>>(), vec![7]);
        assert!(tri.add_boundary_id(3, 1).is_err());
    }

    #[test]
    fn volume_uses_lookup() {
        let tri = Elem::triangle([pt(1), pt(2), pt(3)]).unwrap();
        let vol = tri
            .volume(|id| {
                Ok(match id.get() {
                    1 => Point::new_2d(0.0, 0.0),
                    2 => Point::new_2d(2.0, 0.0),
                    _ => Point::new_2d(0.0, 2.0),
                })
            })
            .unwrap();
        assert_eq!(vol, 2.0);
    }
}
