//! Coordinate value type.
//!
//! Points are stored as `(x, y, z)`; 2D meshes use `z = 0`.

use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};

/// An immutable 2D/3D coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point([f64; 3]);

impl Point {
    /// Point in the XY plane.
    pub const fn new_2d(x: f64, y: f64) -> Self {
        Point([x, y, 0.0])
    }

    /// Point in space.
    pub const fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Point([x, y, z])
    }

    /// Builds a point from a 1-, 2- or 3-component slice.
    pub fn from_slice(coords: &[f64]) -> Result<Self, MeshError> {
        let mut xyz = [0.0; 3];
        if coords.is_empty() || coords.len() > 3 {
            return Err(MeshError::InvalidGeometry(format!(
                "unsupported coordinate dimension: {}",
                coords.len()
            )));
        }
        xyz[..coords.len()].copy_from_slice(coords);
        let p = Point(xyz);
        p.check_finite()?;
        Ok(p)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Raw `[x, y, z]` array.
    #[inline]
    pub fn coords(&self) -> [f64; 3] {
        self.0
    }

    /// Affine average of `self` and `other`.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point([
            0.5 * (self.0[0] + other.0[0]),
            0.5 * (self.0[1] + other.0[1]),
            0.5 * (self.0[2] + other.0[2]),
        ])
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Point) -> f64 {
        let d = [
            self.0[0] - other.0[0],
            self.0[1] - other.0[1],
            self.0[2] - other.0[2],
        ];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// Rejects NaN and infinite components.
    pub fn check_finite(&self) -> Result<(), MeshError> {
        if self.0.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(MeshError::InvalidGeometry(format!(
                "non-finite coordinate {:?}",
                self.0
            )))
        }
    }
}

impl From<[f64; 3]> for Point {
    fn from(value: [f64; 3]) -> Self {
        Point(value)
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Point::new_2d(value[0], value[1])
    }
}
