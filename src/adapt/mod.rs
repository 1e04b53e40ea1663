//! Volume-driven refinement decisions.
//!
//! A [`VolumeMetric`] combines a scalar desired volume with an optional
//! position-dependent [`VolumeField`]. With a field set, the field decides
//! and the scalar only controls how densely the field is sampled inside
//! elements that are larger than it. Interior samples catch elements whose
//! vertices look acceptable while the field dips below their volume inside.

use crate::geometry::metrics::{
    barycentric_lattice, centroid, check_positive_volume, simplex_volume,
};
use crate::geometry::point::Point;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::point::PointId;
use std::fmt;

/// Desired element volume as a function of position.
pub trait VolumeField {
    /// Largest acceptable element volume at `p`. Must be finite and positive.
    fn desired_volume(&self, p: &Point) -> f64;
}

impl<F> VolumeField for F
where
    F: Fn(&Point) -> f64,
{
    fn desired_volume(&self, p: &Point) -> f64 {
        self(p)
    }
}

/// Scalar and spatial volume targets.
pub struct VolumeMetric {
    desired_volume: f64,
    field: Option<Box<dyn VolumeField>>,
    relative_tolerance: f64,
    max_sample_level: usize,
}

impl fmt::Debug for VolumeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeMetric")
            .field("desired_volume", &self.desired_volume)
            .field("has_field", &self.field.is_some())
            .field("relative_tolerance", &self.relative_tolerance)
            .field("max_sample_level", &self.max_sample_level)
            .finish()
    }
}

impl Default for VolumeMetric {
    fn default() -> Self {
        Self {
            desired_volume: 0.0,
            field: None,
            relative_tolerance: 1e-8,
            max_sample_level: 8,
        }
    }
}

impl VolumeMetric {
    /// Disabled metric with the given tolerance and sampling cap.
    pub fn new(relative_tolerance: f64, max_sample_level: usize) -> Self {
        Self {
            relative_tolerance,
            max_sample_level,
            ..Self::default()
        }
    }

    /// Scalar desired volume; 0 means "no scalar constraint".
    pub fn desired_volume(&self) -> f64 {
        self.desired_volume
    }

    /// Sets the scalar desired volume.
    ///
    /// # Errors
    /// [`MeshError::InvalidMetric`] for negative or non-finite values.
    pub fn set_desired_volume(&mut self, volume: f64) -> Result<(), MeshError> {
        if !volume.is_finite() || volume < 0.0 {
            return Err(MeshError::InvalidMetric(format!(
                "desired volume must be finite and non-negative, got {volume}"
            )));
        }
        self.desired_volume = volume;
        Ok(())
    }

    /// Installs or replaces the spatial field.
    pub fn set_field(&mut self, field: impl VolumeField + 'static) {
        self.field = Some(Box::new(field));
    }

    /// Removes the spatial field, falling back on the scalar.
    pub fn clear_field(&mut self) -> Option<Box<dyn VolumeField>> {
        self.field.take()
    }

    /// The spatial field, if any.
    pub fn field(&self) -> Option<&dyn VolumeField> {
        self.field.as_deref()
    }

    /// `false` when neither a scalar nor a field is configured.
    pub fn is_enabled(&self) -> bool {
        self.desired_volume > 0.0 || self.field.is_some()
    }

    pub fn relative_tolerance(&self) -> f64 {
        self.relative_tolerance
    }

    /// Target volume for a simplex with the given vertex positions.
    ///
    /// Without a field this is the scalar. With a field it is the smallest
    /// field value over the centroid, the vertices and, for elements larger
    /// than the scalar, an interior barycentric lattice whose spacing
    /// matches the scalar.
    ///
    /// The vertices are sampled for every element, including those at or
    /// below the scalar and those refined with no scalar set. This widens
    /// the sample set beyond the centroid alone, so the target can only be
    /// smaller: a field that dips at a corner still splits the element.
    ///
    /// # Errors
    /// [`MeshError::InvalidMetric`] if the field returns a non-finite or
    /// non-positive value.
    pub fn target_volume(
        &self,
        cell_type: CellType,
        vertices: &[Point],
    ) -> Result<f64, MeshError> {
        let Some(field) = self.field.as_deref() else {
            return Ok(self.desired_volume);
        };

        let mut target = sample(field, &centroid(vertices))?;
        let level = self.sample_level(cell_type, vertices)?;
        for p in barycentric_lattice(vertices, level) {
            target = target.min(sample(field, &p)?);
        }
        Ok(target)
    }

    /// Whether a simplex exceeds its target volume beyond the tolerance.
    ///
    /// Fails closed: a disabled metric never asks for refinement.
    ///
    /// # Errors
    /// - [`MeshError::GeometryError`] for degenerate or inverted elements.
    /// - [`MeshError::InvalidMetric`] for unusable field samples.
    pub fn should_refine(
        &self,
        elem: PointId,
        cell_type: CellType,
        vertices: &[Point],
    ) -> Result<bool, MeshError> {
        if !self.is_enabled() {
            return Ok(false);
        }
        let volume = check_positive_volume(elem, simplex_volume(cell_type, vertices)?)?;
        let target = self.target_volume(cell_type, vertices)?;
        Ok(volume > target * (1.0 + self.relative_tolerance))
    }

    /// Lattice level `k` such that `k^dim` sub-simplices are about the size
    /// of the scalar desired volume. Level 1 samples the vertices only.
    fn sample_level(&self, cell_type: CellType, vertices: &[Point]) -> Result<usize, MeshError> {
        if self.desired_volume <= 0.0 {
            return Ok(1);
        }
        let volume = simplex_volume(cell_type, vertices)?.abs();
        if volume <= self.desired_volume {
            return Ok(1);
        }
        let ratio = volume / self.desired_volume;
        // Shave rounding noise so exact powers do not bump to the next level.
        let level = (ratio.powf(1.0 / cell_type.dimension() as f64) - 1e-9).ceil() as usize;
        Ok(level.clamp(1, self.max_sample_level.max(1)))
    }
}

fn sample(field: &dyn VolumeField, p: &Point) -> Result<f64, MeshError> {
    let v = field.desired_volume(p);
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(MeshError::InvalidMetric(format!(
            "desired volume {v} at {:?} is unachievable",
            p.coords()
        )))
    }
}
