//! MeshError: Unified error type for simplex-refine public APIs
//!
//! Every fallible operation in this crate returns `Result<_, MeshError>`.
//! The three refinement failures (`GeometryError`, `ConformityViolation`,
//! `NonTerminatingRefinement`) abort the in-progress pass before anything is
//! committed, so a mesh is never left partially refined.

use crate::topology::point::PointId;
use crate::topology::refine::registry::EdgeKey;
use thiserror::Error;

/// Which bound stopped a non-converging refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementCap {
    /// Too many full passes over the mesh.
    Passes,
    /// Too many successive bisections of one element within a pass.
    Depth,
}

impl std::fmt::Display for RefinementCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinementCap::Passes => f.write_str("pass count"),
            RefinementCap::Depth => f.write_str("bisection depth"),
        }
    }
}

/// Unified error type for mesh refinement.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// A node id is referenced but not registered in the mesh.
    #[error("node {0} is not present in the mesh")]
    MissingNode(PointId),
    /// An element id is referenced but not registered in the mesh.
    #[error("element {0} is not present in the mesh")]
    MissingElem(PointId),
    /// An id is already used by another node or element.
    #[error("point id {0} is already in use")]
    DuplicatePoint(PointId),
    /// An element was built with the wrong number of vertices for its kind.
    #[error("{cell_type} expects {expected} vertices, found {found}")]
    VertexCountMismatch {
        cell_type: &'static str,
        expected: usize,
        found: usize,
    },
    /// Both endpoints of an edge are the same node.
    #[error("edge endpoints must differ, got {0} twice")]
    DegenerateEdge(PointId),
    /// Coordinates are unusable (non-finite, wrong dimension, ...).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Desired volume configuration or field sample is unachievable.
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    /// An element has a degenerate or inverted volume.
    #[error("element {elem} has non-positive volume {volume:e}")]
    GeometryError { elem: PointId, volume: f64 },
    /// Two elements disagree on how a shared edge is split.
    #[error("conformity violated on edge {edge} (node {node}): {reason}")]
    ConformityViolation {
        edge: EdgeKey,
        node: PointId,
        reason: String,
    },
    /// The tetrahedra on the two sides of a face subdivide it differently.
    #[error(
        "face ({}, {}, {}) is not conforming: {reason}",
        .facet[0],
        .facet[1],
        .facet[2]
    )]
    FaceConformityViolation {
        facet: [PointId; 3],
        reason: String,
    },
    /// Refinement did not converge within the configured bound.
    #[error("refinement did not terminate: {cap} limit of {limit} exceeded")]
    NonTerminatingRefinement { cap: RefinementCap, limit: usize },
}
