//! Catalog ingestion: remote partitions or a local dump, a snapshot cache, and
//! per-object enrichment.

pub mod types;
pub mod coerce;
pub mod rate_limit;
pub mod api_client;
pub mod cache;
pub mod loader;
pub mod fetcher;
pub mod enricher;

pub use api_client::{ObjectLookup, PartitionSource, SbdbClient};
pub use cache::{CacheKey, CatalogCache, FileCatalogCache, MemoryCatalogCache};
pub use enricher::{EnrichmentOutcome, EnrichmentPipeline, EnrichmentSettings};
pub use fetcher::CatalogFetcher;
pub use loader::load_local_catalog;
pub use rate_limit::{RateLimiter, StopSignal};
pub use types::{
    EnrichedRecord, EnrichmentReport, EnrichmentStatus, FetchQuery, FetchReport, LoadReport,
    OrbitEnrichment, Partition, SbdbTable,
};
