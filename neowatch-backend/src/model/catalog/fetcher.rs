use neowatch_common::Catalog;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::api_client::PartitionSource;
use super::cache::{CacheKey, CatalogCache};
use super::coerce::{json_cells, record_from_cells};
use super::types::{FetchQuery, FetchReport};

/// Builds a catalog from several remote partitions, backed by a snapshot cache.
pub struct CatalogFetcher {
    source: Arc<dyn PartitionSource>,
    cache: Arc<dyn CatalogCache>,
}

impl CatalogFetcher {
    pub fn new(source: Arc<dyn PartitionSource>, cache: Arc<dyn CatalogCache>) -> Self {
        Self { source, cache }
    }

    /// Fetch the catalog described by `query`.
    ///
    /// A cached snapshot for the same query is returned as-is without touching the
    /// network. Otherwise every partition is queried in order, rows are
    /// concatenated and deduplicated by identifier (earlier partitions win).
    /// Failed partitions are skipped; if all fail the catalog is empty. Any
    /// non-empty result is written to the cache, including one missing partitions.
    pub async fn fetch(&self, query: &FetchQuery) -> (Catalog, FetchReport) {
        let started = Instant::now();
        let key = CacheKey::for_query(query);
        let mut report = FetchReport::new();

        match self.cache.get(&key).await {
            Ok(Some(catalog)) => {
                info!("Cache hit for {}: {} records", key, catalog.len());
                report.cache_hit = true;
                report.records = catalog.len();
                report.duration_seconds = started.elapsed().as_secs_f64();
                return (catalog, report);
            }
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Failed to read cache {}: {}, fetching fresh", key, e),
        }

        info!(
            "Fetching {} partitions (limit {} each)",
            query.partitions.len(),
            query.limit
        );

        let mut records = Vec::new();

        for partition in &query.partitions {
            let table = match self
                .source
                .query_partition(partition, &query.fields, query.limit)
                .await
            {
                Ok(table) => table,
                Err(e) => {
                    warn!("Skipping partition {}: {}", partition, e);
                    report.partitions_failed.push(partition.to_string());
                    continue;
                }
            };

            let mut received = 0;
            for row in table.rows() {
                received += 1;
                match record_from_cells(json_cells(&row)) {
                    Some(record) => records.push(record),
                    None => report.rows_skipped += 1,
                }
            }

            debug!("Partition {}: {} rows", partition, received);
            report.rows_received += received;
            report.partitions_ok.push(partition.to_string());
        }

        let parsed = records.len();
        let catalog = Catalog::from_records(records);
        report.duplicates_dropped = parsed - catalog.len();
        report.records = catalog.len();

        if catalog.is_empty() {
            warn!("Fetch produced an empty catalog, nothing cached");
        } else if let Err(e) = self.cache.put(&key, &catalog).await {
            warn!("Failed to write cache {}: {}", key, e);
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Fetch completed: {} records from {} partitions \
             ({} failed, {} rows skipped, {} duplicates)",
            report.records,
            report.partitions_ok.len(),
            report.partitions_failed.len(),
            report.rows_skipped,
            report.duplicates_dropped
        );

        (catalog, report)
    }
}
