//! Reference bisection of a simplex along one edge.
//!
//! For an edge `(a, b)` with midpoint `m`, the children are the parent with
//! `b` replaced by `m` and the parent with `a` replaced by `m`. Vertex order
//! is otherwise preserved, so both children keep the parent's orientation and
//! each carries exactly half of its volume.

use crate::mesh_error::MeshError;
use crate::topology::elem::Elem;
use crate::topology::point::PointId;
use crate::topology::refine::registry::EdgeKey;

/// Split `parent` along `edge` through `midpoint`.
///
/// The first child keeps `edge.lo()`, the second keeps `edge.hi()`. Each
/// child inherits the subdomain id and the boundary ids of every side except
/// the one it now shares with its sibling.
///
/// # Errors
/// [`MeshError::InvalidGeometry`] if `edge` is not an edge of `parent`, or
/// if `midpoint` is already one of its vertices.
pub fn bisect(parent: &Elem, edge: EdgeKey, midpoint: PointId) -> Result<[Elem; 2], MeshError> {
    let (Some(slot_lo), Some(slot_hi)) =
        (parent.local_index(edge.lo()), parent.local_index(edge.hi()))
    else {
        return Err(MeshError::InvalidGeometry(format!(
            "edge {edge} is not an edge of the {}",
            parent.cell_type().name()
        )));
    };
    if parent.local_index(midpoint).is_some() {
        return Err(MeshError::InvalidGeometry(format!(
            "midpoint {midpoint} of edge {edge} is already a vertex"
        )));
    }
    // Replacing the hi vertex makes the side opposite lo the shared face,
    // and vice versa.
    let keeps_lo = parent.with_vertex_replaced(slot_hi, midpoint, slot_lo);
    let keeps_hi = parent.with_vertex_replaced(slot_lo, midpoint, slot_hi);
    Ok([keeps_lo, keeps_hi])
}
