//! # simplex-refine
//!
//! simplex-refine adaptively refines conforming triangle and tetrahedron
//! meshes by edge bisection until every element meets a desired volume.
//!
//! ## Features
//! - A scalar desired volume, a position-dependent desired-volume field, or
//!   both (the scalar then sets how densely the field is sampled)
//! - Conforming longest-edge bisection: an element that is too large, or
//!   that holds an edge split earlier in the pass, is cut along its own
//!   longest edge. Every element touching a split edge shares its midpoint
//!   node, tetrahedra on both sides of a face cut it the same way, and each
//!   pass commits a conforming mesh
//! - Pass-atomic commits through the [`SimplexMesh`](topology::mesh::SimplexMesh)
//!   collaborator trait, with an in-memory implementation
//! - Subdomain and boundary ids inherited by children
//! - Bounded work: pass and bisection-depth caps
//!
//! ## Determinism
//!
//! Elements are visited in ascending id order, split edges are chosen by
//! exact length with ties broken by edge key, and new ids are allocated
//! sequentially. Refining the same mesh twice yields identical ids.
//!
//! ## Usage
//!
//! ```rust
//! use simplex_refine::prelude::*;
//!
//! let mut mesh = InMemoryMesh::new();
//! let a = mesh.add_node([0.0, 0.0])?;
//! let b = mesh.add_node([1.0, 0.0])?;
//! let c = mesh.add_node([0.0, 1.0])?;
//! mesh.add_elem(Elem::triangle([a, b, c])?)?;
//!
//! let mut refiner = SimplexRefiner::new(&mut mesh);
//! refiner.set_desired_volume(0.1)?;
//! assert!(refiner.refine_elements()?);
//! assert!(mesh.elems().all(|(id, _)| mesh.elem_volume(id).unwrap() <= 0.1));
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Logging
//! Progress is reported through the [`log`] facade: `debug` per pass,
//! `trace` per split, `info` on convergence and `warn` when a cap aborts
//! refinement. No logger is installed by the library.

pub mod adapt;
pub mod debug_invariants;
pub mod geometry;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::adapt::{VolumeField, VolumeMetric};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::point::Point;
    pub use crate::mesh_error::{MeshError, RefinementCap};
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::elem::Elem;
    pub use crate::topology::mesh::{InMemoryMesh, RefinementBatch, SimplexMesh};
    pub use crate::topology::point::PointId;
    pub use crate::topology::refine::registry::{EdgeKey, EdgeRegistry};
    pub use crate::topology::refine::{
        PassStats, RefineOptions, RefinementSummary, SimplexRefiner,
    };
}
