//! Shared data model for the neowatch workspace: catalog records, orbital
//! elements and trajectory points, plus the null-aware orderings used to rank them.

pub mod ordering;
pub mod types;

pub use types::{
    resolve_identifier, Catalog, CatalogRecord, OrbitalElementSet, PhysicalAttributes,
    PlanarPoint, TrajectoryPoint,
};
