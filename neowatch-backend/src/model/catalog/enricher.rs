//! Per-object enrichment
//!
//! One lookup per catalog row, at most `max_concurrency` in flight and at most
//! `requests_per_second` issued in aggregate. Any failure null-fills the row, so the
//! output always has one row per input row and the same columns on every row.

use futures::future::join_all;
use neowatch_common::{Catalog, CatalogRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::api_client::ObjectLookup;
use super::rate_limit::{RateLimiter, StopSignal};
use super::types::{EnrichedRecord, EnrichmentReport, EnrichmentStatus};
use crate::config::EnrichmentConfig;

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub max_concurrency: usize,
    /// `<= 0` disables pacing
    pub requests_per_second: f64,
    pub lookup_timeout: Duration,
}

impl EnrichmentSettings {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            requests_per_second: config.requests_per_second,
            lookup_timeout: config.lookup_timeout(),
        }
    }
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self::from_config(&EnrichmentConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    /// `rows[k]` belongs to the k-th record of the input catalog
    pub rows: Vec<EnrichedRecord>,
    pub report: EnrichmentReport,
}

impl EnrichmentOutcome {
    /// Records with enrichment merged into their missing fields.
    pub fn merged_catalog(&self) -> Catalog {
        Catalog::from_records(self.rows.iter().map(EnrichedRecord::merged))
    }
}

pub struct EnrichmentPipeline {
    lookup: Arc<dyn ObjectLookup>,
    settings: EnrichmentSettings,
}

impl EnrichmentPipeline {
    pub fn new(lookup: Arc<dyn ObjectLookup>, settings: EnrichmentSettings) -> Self {
        Self { lookup, settings }
    }

    /// Enrich every record of `catalog`.
    ///
    /// Raising `stop` halts new lookups; in-flight ones finish or time out and the
    /// rows never issued come back as `NotAttempted`.
    pub async fn run(&self, catalog: &Catalog, stop: &StopSignal) -> EnrichmentOutcome {
        let started = Instant::now();
        let permits = Semaphore::new(self.settings.max_concurrency.max(1));
        let limiter = RateLimiter::per_second(self.settings.requests_per_second);

        info!(
            "Enriching {} records (concurrency {}, {:?})",
            catalog.len(),
            self.settings.max_concurrency.max(1),
            limiter
        );

        let rows = join_all(
            catalog
                .iter()
                .map(|record| self.enrich_one(record, &permits, &limiter, stop)),
        )
        .await;

        let mut report = EnrichmentReport::tally(&rows);
        report.duration_seconds = started.elapsed().as_secs_f64();

        info!(
            "Enrichment completed: {} enriched, {} failed, {} timed out, {} not attempted",
            report.enriched, report.failed, report.timed_out, report.not_attempted
        );
        if report.stopped_early {
            warn!("Enrichment stopped before all lookups were issued");
        }

        EnrichmentOutcome { rows, report }
    }

    async fn enrich_one(
        &self,
        record: &CatalogRecord,
        permits: &Semaphore,
        limiter: &RateLimiter,
        stop: &StopSignal,
    ) -> EnrichedRecord {
        let not_attempted =
            || EnrichedRecord::null_filled(record.clone(), EnrichmentStatus::NotAttempted);

        if stop.is_stopped() {
            return not_attempted();
        }
        let Ok(_permit) = permits.acquire().await else {
            return not_attempted();
        };
        if stop.is_stopped() {
            return not_attempted();
        }
        limiter.acquire().await;
        if stop.is_stopped() {
            return not_attempted();
        }

        let key = record.lookup_key();
        match timeout(self.settings.lookup_timeout, self.lookup.lookup(key)).await {
            Ok(Ok(enrichment)) => {
                debug!("Enriched '{}'", key);
                EnrichedRecord::enriched(record.clone(), enrichment)
            }
            Ok(Err(e)) => {
                warn!("Lookup failed for '{}': {}", key, e);
                EnrichedRecord::null_filled(record.clone(), EnrichmentStatus::Failed(e.to_string()))
            }
            Err(_) => {
                warn!(
                    "Lookup for '{}' timed out after {:?}",
                    key, self.settings.lookup_timeout
                );
                EnrichedRecord::null_filled(record.clone(), EnrichmentStatus::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, Result};
    use crate::model::catalog::types::OrbitEnrichment;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Answer,
        Fail,
        Empty,
        Hang,
    }

    struct FakeLookup {
        behaviors: HashMap<String, Behavior>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        stop_after_first: Option<StopSignal>,
    }

    impl FakeLookup {
        fn new(delay: Duration) -> Self {
            Self {
                behaviors: HashMap::new(),
                delay,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                stop_after_first: None,
            }
        }

        fn with(mut self, key: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(key.to_string(), behavior);
            self
        }
    }

    #[async_trait]
    impl ObjectLookup for FakeLookup {
        async fn lookup(&self, key: &str) -> Result<OrbitEnrichment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stop) = &self.stop_after_first {
                stop.stop();
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let behavior = self.behaviors.get(key).copied().unwrap_or(Behavior::Answer);
            let delay = match behavior {
                Behavior::Hang => Duration::from_secs(3600),
                _ => self.delay,
            };
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match behavior {
                Behavior::Answer | Behavior::Hang => Ok(OrbitEnrichment {
                    a: Some(1.5),
                    e: Some(0.2),
                    moid: Some(0.01),
                    pha: Some(true),
                    ..Default::default()
                }),
                Behavior::Fail => Err(CatalogError::row_failed(key, "HTTP 500")),
                Behavior::Empty => Err(CatalogError::EmptyLookup(key.to_string())),
            }
        }
    }

    fn catalog(n: usize) -> Catalog {
        Catalog::from_records((0..n).map(|k| {
            let mut record = CatalogRecord::new(format!("object {}", k));
            record.spkid = Some(format!("{}", 3_000_000 + k));
            record
        }))
    }

    fn settings(max_concurrency: usize, requests_per_second: f64) -> EnrichmentSettings {
        EnrichmentSettings {
            max_concurrency,
            requests_per_second,
            lookup_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_failed_rows_keep_full_schema() {
        let lookup = FakeLookup::new(Duration::ZERO)
            .with("3000001", Behavior::Fail)
            .with("3000003", Behavior::Empty);
        let pipeline = EnrichmentPipeline::new(Arc::new(lookup), settings(4, 0.0));

        let outcome = pipeline.run(&catalog(5), &StopSignal::new()).await;

        let columns: Vec<BTreeSet<String>> = outcome
            .rows
            .iter()
            .map(|row| {
                let value = serde_json::to_value(row.enrichment).unwrap();
                value.as_object().unwrap().keys().cloned().collect()
            })
            .collect();
        assert_eq!(columns[0].len(), 11);
        assert!(columns.iter().all(|c| c == &columns[0]));

        assert_eq!(outcome.rows[1].enrichment, OrbitEnrichment::default());
        assert!(matches!(outcome.rows[1].status, EnrichmentStatus::Failed(_)));
        assert!(matches!(outcome.rows[3].status, EnrichmentStatus::Failed(_)));
        assert_eq!(outcome.report.enriched, 3);
        assert_eq!(outcome.report.failed, 2);
    }

    #[tokio::test]
    async fn test_rows_stay_aligned_with_input() {
        let input = catalog(20);
        let lookup = FakeLookup::new(Duration::ZERO).with("3000007", Behavior::Fail);
        let pipeline = EnrichmentPipeline::new(Arc::new(lookup), settings(8, 0.0));

        let outcome = pipeline.run(&input, &StopSignal::new()).await;

        assert_eq!(outcome.rows.len(), input.len());
        for (row, record) in outcome.rows.iter().zip(input.iter()) {
            assert_eq!(&row.record, record);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_lookup_is_null_filled() {
        let lookup = FakeLookup::new(Duration::from_millis(10)).with("3000002", Behavior::Hang);
        let pipeline = EnrichmentPipeline::new(Arc::new(lookup), settings(4, 0.0));

        let outcome = pipeline.run(&catalog(4), &StopSignal::new()).await;

        assert_eq!(outcome.rows[2].status, EnrichmentStatus::TimedOut);
        assert_eq!(outcome.rows[2].enrichment, OrbitEnrichment::default());
        assert_eq!(outcome.report.timed_out, 1);
        assert_eq!(outcome.report.enriched, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let lookup = Arc::new(FakeLookup::new(Duration::from_millis(50)));
        let pipeline = EnrichmentPipeline::new(lookup.clone(), settings(3, 0.0));

        let outcome = pipeline.run(&catalog(12), &StopSignal::new()).await;

        assert_eq!(outcome.report.enriched, 12);
        assert_eq!(lookup.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_spaces_lookups() {
        let pipeline =
            EnrichmentPipeline::new(Arc::new(FakeLookup::new(Duration::ZERO)), settings(16, 10.0));
        let started = Instant::now();

        let outcome = pipeline.run(&catalog(5), &StopSignal::new()).await;

        assert_eq!(outcome.report.enriched, 5);
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_stopped_before_start_issues_nothing() {
        let lookup = Arc::new(FakeLookup::new(Duration::ZERO));
        let pipeline = EnrichmentPipeline::new(lookup.clone(), settings(4, 0.0));
        let stop = StopSignal::new();
        stop.stop();

        let outcome = pipeline.run(&catalog(6), &stop).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.rows.len(), 6);
        assert_eq!(outcome.report.not_attempted, 6);
        assert!(outcome.report.stopped_early);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_lookup_finish() {
        let stop = StopSignal::new();
        let mut lookup = FakeLookup::new(Duration::from_millis(20));
        lookup.stop_after_first = Some(stop.clone());
        let lookup = Arc::new(lookup);
        let pipeline = EnrichmentPipeline::new(lookup.clone(), settings(1, 0.0));

        let outcome = pipeline.run(&catalog(5), &stop).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.rows[0].status, EnrichmentStatus::Enriched);
        assert!(outcome.rows[1..]
            .iter()
            .all(|row| row.status == EnrichmentStatus::NotAttempted));
        assert_eq!(outcome.rows.len(), 5);
    }

    #[tokio::test]
    async fn test_merged_catalog_fills_elements() {
        let pipeline =
            EnrichmentPipeline::new(Arc::new(FakeLookup::new(Duration::ZERO)), settings(2, 0.0));

        let outcome = pipeline.run(&catalog(2), &StopSignal::new()).await;
        let merged = outcome.merged_catalog();

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| r.is_trajectory_eligible()));
        assert_eq!(merged.records()[0].moid, Some(0.01));
    }
}
