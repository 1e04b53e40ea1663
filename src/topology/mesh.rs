//! Mesh collaborator contract and an in-memory implementation.
//!
//! The refiner never owns a mesh: it reads a snapshot of element ids at the
//! start of a pass, queries nodes and elements, and hands back one
//! [`RefinementBatch`] per pass. Nodes and elements share a single
//! [`PointId`] space, so new ids are allocated after
//! [`SimplexMesh::max_point_id`].

use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::elem::Elem;
use crate::topology::point::PointId;
use hashbrown::HashSet;
use std::collections::BTreeMap;

/// Structural mutations produced by one refinement pass.
#[derive(Clone, Debug, Default)]
pub struct RefinementBatch {
    /// New midpoint nodes, ascending id.
    pub nodes: Vec<(PointId, Point)>,
    /// New elements, in creation order.
    pub elems: Vec<(PointId, Elem)>,
    /// Elements replaced by their children.
    pub removed: Vec<PointId>,
}

impl RefinementBatch {
    /// `true` when applying the batch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.elems.is_empty() && self.removed.is_empty()
    }
}

/// Mesh storage consumed by the refiner.
pub trait SimplexMesh {
    /// Ids of the current elements, ascending. The returned vector is a
    /// snapshot: later mutations do not affect it.
    fn elem_ids(&self) -> Vec<PointId>;

    /// Element by id.
    fn elem(&self, id: PointId) -> Option<&Elem>;

    /// Node position by id.
    fn node(&self, id: PointId) -> Option<Point>;

    /// Largest id used by any node or element (0 for an empty mesh).
    fn max_point_id(&self) -> u64;

    /// Registers a node under a caller-chosen, unused id.
    fn insert_node(&mut self, id: PointId, point: Point) -> Result<(), MeshError>;

    /// Registers an element under a caller-chosen, unused id, taking ownership.
    fn insert_elem(&mut self, id: PointId, elem: Elem) -> Result<(), MeshError>;

    /// Deletes an element, returning it.
    fn remove_elem(&mut self, id: PointId) -> Result<Elem, MeshError>;

    /// Number of elements.
    fn n_elems(&self) -> usize {
        self.elem_ids().len()
    }

    /// Element by id, or [`MeshError::MissingElem`].
    fn try_elem(&self, id: PointId) -> Result<&Elem, MeshError> {
        self.elem(id).ok_or(MeshError::MissingElem(id))
    }

    /// Node position by id, or [`MeshError::MissingNode`].
    fn try_node(&self, id: PointId) -> Result<Point, MeshError> {
        self.node(id).ok_or(MeshError::MissingNode(id))
    }

    /// Signed volume of element `id`.
    fn elem_volume(&self, id: PointId) -> Result<f64, MeshError> {
        self.try_elem(id)?.volume(|v| self.try_node(v))
    }

    /// Applies a pass's mutations as one batch.
    ///
    /// The whole batch is checked before anything is mutated, so a rejected
    /// batch leaves the mesh untouched.
    fn commit(&mut self, batch: RefinementBatch) -> Result<(), MeshError> {
        let in_use = |mesh: &Self, id: PointId| mesh.node(id).is_some() || mesh.elem(id).is_some();
        let pending: HashSet<PointId> = batch.nodes.iter().map(|(id, _)| *id).collect();
        for (id, point) in &batch.nodes {
            if in_use(self, *id) {
                return Err(MeshError::DuplicatePoint(*id));
            }
            point.check_finite()?;
        }
        for (id, elem) in &batch.elems {
            if in_use(self, *id) {
                return Err(MeshError::DuplicatePoint(*id));
            }
            for v in elem.vertices() {
                if !pending.contains(v) && self.node(*v).is_none() {
                    return Err(MeshError::MissingNode(*v));
                }
            }
        }
        for id in &batch.removed {
            self.try_elem(*id)?;
        }

        for (id, point) in batch.nodes {
            self.insert_node(id, point)?;
        }
        for (id, elem) in batch.elems {
            self.insert_elem(id, elem)?;
        }
        for id in batch.removed {
            self.remove_elem(id)?;
        }
        Ok(())
    }
}

/// Ordered in-memory node and element store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMesh {
    nodes: BTreeMap<PointId, Point>,
    elems: BTreeMap<PointId, Elem>,
    max_id: u64,
}

impl InMemoryMesh {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> Result<PointId, MeshError> {
        let raw = self
            .max_id
            .checked_add(1)
            .ok_or(MeshError::InvalidPointId)?;
        PointId::new(raw)
    }

    fn is_used(&self, id: PointId) -> bool {
        self.nodes.contains_key(&id) || self.elems.contains_key(&id)
    }

    /// Allocates and registers a node, returning its id.
    pub fn add_node(&mut self, point: impl Into<Point>) -> Result<PointId, MeshError> {
        let id = self.next_id()?;
        self.insert_node(id, point.into())?;
        Ok(id)
    }

    /// Registers an element under a fresh id, returning the id.
    ///
    /// # Errors
    /// [`MeshError::MissingNode`] if a vertex is not a node of this mesh.
    pub fn add_elem(&mut self, elem: Elem) -> Result<PointId, MeshError> {
        let id = self.next_id()?;
        self.insert_elem(id, elem)?;
        Ok(id)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (PointId, Point)> + '_ {
        self.nodes.iter().map(|(id, p)| (*id, *p))
    }

    /// Elements in ascending id order.
    pub fn elems(&self) -> impl Iterator<Item = (PointId, &Elem)> + '_ {
        self.elems.iter().map(|(id, e)| (*id, e))
    }

    /// Sum of all element volumes.
    pub fn total_volume(&self) -> Result<f64, MeshError> {
        let mut total = 0.0;
        for id in self.elems.keys() {
            total += self.elem_volume(*id)?;
        }
        Ok(total)
    }
}

impl SimplexMesh for InMemoryMesh {
    fn elem_ids(&self) -> Vec<PointId> {
        self.elems.keys().copied().collect()
    }

    fn elem(&self, id: PointId) -> Option<&Elem> {
        self.elems.get(&id)
    }

    fn node(&self, id: PointId) -> Option<Point> {
        self.nodes.get(&id).copied()
    }

    fn max_point_id(&self) -> u64 {
        self.max_id
    }

    fn n_elems(&self) -> usize {
        self.elems.len()
    }

    fn insert_node(&mut self, id: PointId, point: Point) -> Result<(), MeshError> {
        if self.is_used(id) {
            return Err(MeshError::DuplicatePoint(id));
        }
        point.check_finite()?;
        self.nodes.insert(id, point);
        self.max_id = self.max_id.max(id.get());
        Ok(())
    }

    fn insert_elem(&mut self, id: PointId, elem: Elem) -> Result<(), MeshError> {
        if self.is_used(id) {
            return Err(MeshError::DuplicatePoint(id));
        }
        if let Some(v) = elem.vertices().iter().find(|v| !self.nodes.contains_key(*v)) {
            return Err(MeshError::MissingNode(*v));
        }
        self.elems.insert(id, elem);
        self.max_id = self.max_id.max(id.get());
        Ok(())
    }

    fn remove_elem(&mut self, id: PointId) -> Result<Elem, MeshError> {
        self.elems.remove(&id).ok_or(MeshError::MissingElem(id))
    }
}
