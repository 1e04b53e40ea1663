use crate::mesh_error::MeshError;
use crate::topology::mesh::SimplexMesh;
use crate::topology::validation::validate_mesh;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds; a no-op in release builds.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshError>;
}

impl<M: SimplexMesh + ?Sized> DebugInvariants for M {
    fn debug_assert_invariants(&self) {
        #[cfg(debug_assertions)]
        if let Err(e) = self.validate_invariants() {
            panic!("[invariants] mesh: {e}");
        }
    }

    /// Node references, positive volumes, facet sharing, edge conformity
    /// and id bookkeeping.
    fn validate_invariants(&self) -> Result<(), MeshError> {
        validate_mesh(self)?;
        if self.elem_ids().iter().any(|id| id.get() > self.max_point_id()) {
            return Err(MeshError::InvalidGeometry(
                "element id above the recorded maximum".into(),
            ));
        }
        Ok(())
    }
}
