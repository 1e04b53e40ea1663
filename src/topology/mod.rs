//! Mesh topology: ids, elements, the mesh collaborator contract and
//! refinement.
//!
//! Most users build an [`mesh::InMemoryMesh`], wrap it in a
//! [`refine::SimplexRefiner`] and call
//! [`refine_elements`](refine::SimplexRefiner::refine_elements).

pub mod cell_type;
pub mod elem;
pub mod mesh;
pub mod point;
pub mod refine;
pub mod validation;

pub use cell_type::CellType;
pub use elem::Elem;
pub use mesh::{InMemoryMesh, RefinementBatch, SimplexMesh};
pub use point::PointId;
