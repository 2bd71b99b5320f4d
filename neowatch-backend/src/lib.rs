//! Near-Earth object catalog backend: catalog ingestion and enrichment, orbit
//! tracing and close-approach ranking.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod module;
