//! Spatial reference systems and coordinate transforms.
//!
//! # Responsibility
//! - Represent points tagged with their spatial reference (SRID).
//! - Convert geographic WGS84 coordinates into the application projection.
//!
//! # Invariants
//! - A `Point` is always interpreted in the SRS named by its `srid`.
//! - Transforms go through geographic coordinates, so any supported pair of
//!   reference systems can be converted.

mod transform;

pub use transform::{
    convert_from_wgs84, transform, GeoError, GeoResult, Point, SpatialReference, PROJECTION_SRID,
};
