//! Geometry utilities: node positions and simplex measures.

pub mod metrics;
pub mod point;
