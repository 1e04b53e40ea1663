//! Edge keys and the per-pass midpoint registry.
//!
//! A new node `x` between nodes `y` and `z` (with `y < z`) is recorded as
//! `midpoints[(y, z)] = x`. Every element that touches edge `(y, z)` during
//! the pass gets the same `x`, which is what keeps bisection conforming.

use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::point::{PointId, PointIdAllocator};
use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::fmt;

/// Order-independent identifier of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    lo: PointId,
    hi: PointId,
}

impl EdgeKey {
    /// Canonicalizes `(a, b)` into ascending order.
    ///
    /// # Errors
    /// [`MeshError::DegenerateEdge`] when `a == b`.
    pub fn new(a: PointId, b: PointId) -> Result<Self, MeshError> {
        if a == b {
            return Err(MeshError::DegenerateEdge(a));
        }
        Ok(Self::from_distinct(a, b))
    }

    pub(crate) fn from_distinct(a: PointId, b: PointId) -> Self {
        if a < b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    #[inline]
    pub fn lo(&self) -> PointId {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> PointId {
        self.hi
    }

    /// Both endpoints, ascending.
    #[inline]
    pub fn endpoints(&self) -> [PointId; 2] {
        [self.lo, self.hi]
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}

/// A midpoint node created during a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Midpoint {
    /// Id reserved for the new node.
    pub node: PointId,
    /// Affine average of the edge endpoints.
    pub position: Point,
}

/// Outcome of [`EdgeRegistry::get_or_create_midpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidpointLookup {
    /// The edge was already split in this pass.
    Cached(PointId),
    /// A new node was reserved for the edge.
    Created(PointId),
}

impl MidpointLookup {
    pub fn node(self) -> PointId {
        match self {
            MidpointLookup::Cached(p) | MidpointLookup::Created(p) => p,
        }
    }
}

/// NewNodeMap for one refinement pass: `EdgeKey → Midpoint`.
///
/// Entries are append-only; an entry is never revised once created.
#[derive(Clone, Debug, Default)]
pub struct EdgeRegistry {
    midpoints: BTreeMap<EdgeKey, Midpoint>,
    positions: HashMap<PointId, Point>,
}

impl EdgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct edges split so far.
    pub fn len(&self) -> usize {
        self.midpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.midpoints.is_empty()
    }

    pub fn contains(&self, key: &EdgeKey) -> bool {
        self.midpoints.contains_key(key)
    }

    /// Midpoint node of `key`, if the edge was split in this pass.
    pub fn get(&self, key: &EdgeKey) -> Option<PointId> {
        self.midpoints.get(key).map(|m| m.node)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &Midpoint)> {
        self.midpoints.iter()
    }

    /// Position of a node created by this registry.
    pub fn position_of(&self, node: PointId) -> Option<Point> {
        self.positions.get(&node).copied()
    }

    /// Drops every entry; used between passes.
    pub fn clear(&mut self) {
        self.midpoints.clear();
        self.positions.clear();
    }

    /// Consumes the registry, yielding the new nodes in id order.
    pub fn into_nodes(self) -> Vec<(PointId, Point)> {
        let mut nodes: Vec<_> = self.positions.into_iter().collect();
        nodes.sort_unstable_by_key(|(id, _)| *id);
        nodes
    }

    /// Returns the shared midpoint of edge `(a, b)`, creating it on first use.
    ///
    /// Nodes created earlier in this pass are resolved by the registry itself;
    /// `position` resolves every other (committed) node. `ids` reserves the
    /// id of a new node.
    ///
    /// # Errors
    /// - [`MeshError::DegenerateEdge`] if `a == b`.
    /// - [`MeshError::ConformityViolation`] if the cached midpoint no longer
    ///   matches the endpoints' average.
    pub fn get_or_create_midpoint<F>(
        &mut self,
        a: PointId,
        b: PointId,
        mut position: F,
        ids: &mut PointIdAllocator,
    ) -> Result<MidpointLookup, MeshError>
    where
        F: FnMut(PointId) -> Result<Point, MeshError>,
    {
        let key = EdgeKey::new(a, b)?;
        let pa = match self.positions.get(&key.lo) {
            Some(p) => *p,
            None => position(key.lo)?,
        };
        let pb = match self.positions.get(&key.hi) {
            Some(p) => *p,
            None => position(key.hi)?,
        };
        let expected = pa.midpoint(&pb);

        if let Some(cached) = self.midpoints.get(&key) {
            let drift = cached.position.distance(&expected);
            if drift > 1e-12 * pa.distance(&pb) {
                return Err(MeshError::ConformityViolation {
                    edge: key,
                    node: cached.node,
                    reason: format!("cached midpoint is {drift:e} away from the edge center"),
                });
            }
            return Ok(MidpointLookup::Cached(cached.node));
        }

        let node = ids.alloc()?;
        self.positions.insert(node, expected);
        self.midpoints.insert(
            key,
            Midpoint {
                node,
                position: expected,
            },
        );
        Ok(MidpointLookup::Created(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(id: u64) -> PointId {
        PointId::new(id).unwrap()
    }

    fn lookup(id: PointId) -> Result<Point, MeshError> {
        Ok(match id.get() {
            1 => Point::new_2d(0.0, 0.0),
            2 => Point::new_2d(2.0, 0.0),
            3 => Point::new_2d(0.0, 2.0),
            _ => return Err(MeshError::MissingNode(id)),
        })
    }

    #[test]
    fn canonical_key_ignores_orientation() {
        assert_eq!(EdgeKey::new(pt(5), pt(2)), EdgeKey::new(pt(2), pt(5)));
        let key = EdgeKey::new(pt(5), pt(2)).unwrap();
        assert_eq!(key.endpoints(), [pt(2), pt(5)]);
        assert_eq!(key.to_string(), "(2, 5)");
        assert_eq!(EdgeKey::new(pt(4), pt(4)), Err(MeshError::DegenerateEdge(pt(4))));
    }

    #[test]
    fn second_lookup_returns_the_same_node() {
        let mut registry = EdgeRegistry::new();
        let mut ids = PointIdAllocator::after(10).unwrap();

        let first = registry
            .get_or_create_midpoint(pt(1), pt(2), lookup, &mut ids)
            .unwrap();
        let second = registry
            .get_or_create_midpoint(pt(2), pt(1), lookup, &mut ids)
            .unwrap();

        assert_eq!(first, MidpointLookup::Created(pt(11)));
        assert_eq!(second, MidpointLookup::Cached(pt(11)));
        assert_eq!(registry.len(), 1);
        assert_eq!(ids.peek(), 12);
        assert_eq!(registry.position_of(pt(11)), Some(Point::new_2d(1.0, 0.0)));
    }

    #[test]
    fn entry_count_matches_distinct_edges() {
        let mut registry = EdgeRegistry::new();
        let mut ids = PointIdAllocator::after(3).unwrap();
        for (a, b) in [(1, 2), (2, 3), (3, 1), (2, 1), (1, 3)] {
            registry
                .get_or_create_midpoint(pt(a), pt(b), lookup, &mut ids)
                .unwrap();
        }
        assert_eq!(registry.len(), 3);
        let nodes = registry.into_nodes();
        assert_eq!(
            nodes.iter().map(|(id, _)| id.get()).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
    }

    #[test]
    fn moved_endpoint_is_a_conformity_violation() {
        let mut registry = EdgeRegistry::new();
        let mut ids = PointIdAllocator::after(3).unwrap();
        registry
            .get_or_create_midpoint(pt(1), pt(2), lookup, &mut ids)
            .unwrap();

        let moved = |id: PointId| -> Result<Point, MeshError> {
            if id == pt(2) {
                Ok(Point::new_2d(4.0, 0.0))
            } else {
                lookup(id)
            }
        };
        let err = registry
            .get_or_create_midpoint(pt(1), pt(2), moved, &mut ids)
            .unwrap_err();
        assert!(matches!(err, MeshError::ConformityViolation { node, .. } if node == pt(4)));
    }

    #[test]
    fn midpoints_of_new_nodes_resolve_internally() {
        let mut registry = EdgeRegistry::new();
        let mut ids = PointIdAllocator::after(3).unwrap();
        let m = registry
            .get_or_create_midpoint(pt(1), pt(2), lookup, &mut ids)
            .unwrap()
            .node();
        let q = registry
            .get_or_create_midpoint(m, pt(3), lookup, &mut ids)
            .unwrap()
            .node();
        assert_eq!(registry.position_of(q), Some(Point::new_2d(0.5, 1.0)));
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let mut registry = EdgeRegistry::new();
        let mut ids = PointIdAllocator::after(3).unwrap();
        assert_eq!(
            registry.get_or_create_midpoint(pt(1), pt(9), lookup, &mut ids),
            Err(MeshError::MissingNode(pt(9)))
        );
        assert!(registry.is_empty());
    }
}
