//! Vector analysis algorithms
//!
//! Geometric operations on polygon features:
//! - Centroid: geometric center
//! - Bounding box: axis-aligned envelope
//! - Dissolve: merge polygons by key (true union)
//! - Area: planar measurement

mod measurements;
mod spatial;

pub use measurements::area;
pub use spatial::{centroid, dissolve, union_all, BoundingBox};
