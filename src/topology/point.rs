//! `PointId`: a strong, zero-cost handle for mesh entities
//!
//! Nodes and elements share one id space: every entity of a mesh is
//! represented by a unique, opaque identifier. `PointId` wraps a nonzero
//! `u64` so that 0 stays reserved as an invalid or sentinel value.
//!
//! Ids are totally ordered, which is what makes edge keys canonical:
//! an edge `(a, b)` is always stored as `(min, max)` regardless of the
//! element or orientation that discovered it.

use crate::mesh_error::MeshError;
use std::{fmt, num::NonZeroU64};

/// Opaque handle for a node or element.
///
/// # Memory layout
/// This type is `repr(transparent)`, meaning it has the same ABI and
/// alignment as its single field (`NonZeroU64`).
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns [`MeshError::InvalidPointId`] if `raw == 0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use simplex_refine::topology::point::PointId;
    /// let p = PointId::new(1)?;
    /// assert_eq!(p.get(), 1);
    /// # Ok::<(), simplex_refine::mesh_error::MeshError>(())
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(MeshError::InvalidPointId)
    }

    /// Returns the inner `u64` value of this `PointId`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Sequential id allocator starting after the largest id in use.
#[derive(Clone, Debug)]
pub struct PointIdAllocator {
    next: u64,
}

impl PointIdAllocator {
    /// Allocator whose first id is `max_in_use + 1`.
    pub fn after(max_in_use: u64) -> Result<Self, MeshError> {
        let next = max_in_use
            .checked_add(1)
            .ok_or(MeshError::InvalidPointId)?;
        Ok(Self { next })
    }

    /// Hands out the next unused id.
    pub fn alloc(&mut self) -> Result<PointId, MeshError> {
        let id = PointId::new(self.next)?;
        self.next = self.next.checked_add(1).ok_or(MeshError::InvalidPointId)?;
        Ok(id)
    }

    /// The id that the next call to [`alloc`](Self::alloc) would return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.get()).finish()
    }
}

/// Prints the numeric ID without any wrapper text.
impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(PointId, u64);
    assert_eq_align!(PointId, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_zero_is_rejected() {
        assert_eq!(PointId::new(0), Err(MeshError::InvalidPointId));
    }

    #[test]
    fn new_and_get() {
        let p = PointId::new(42).unwrap();
        assert_eq!(p.get(), 42);
    }

    #[test]
    fn debug_and_display() {
        let p = PointId::new(7).unwrap();
        assert_eq!(format!("{:?}", p), "PointId(7)");
        assert_eq!(format!("{}", p), "7");
    }

    #[test]
    fn allocator_is_sequential_and_checked() {
        let mut ids = PointIdAllocator::after(9).unwrap();
        assert_eq!(ids.alloc().unwrap().get(), 10);
        assert_eq!(ids.alloc().unwrap().get(), 11);
        assert_eq!(ids.peek(), 12);
        assert!(PointIdAllocator::after(u64::MAX).is_err());

        let mut last = PointIdAllocator::after(u64::MAX - 1).unwrap();
        assert_eq!(last.alloc(), Err(MeshError::InvalidPointId));
    }
}
