use neowatch_backend::config::{self, NeowatchConfig, DEFAULT_CONFIG_PATH};
use neowatch_backend::logging;
use neowatch_backend::model::catalog::{
    load_local_catalog, CatalogFetcher, EnrichmentPipeline, EnrichmentReport, EnrichmentSettings,
    FetchQuery, FetchReport, FileCatalogCache, LoadReport, SbdbClient, StopSignal,
};
use neowatch_backend::module::orbit::{earth_reference_elements, trajectories_for, OrbitTrajectory};
use neowatch_backend::module::risk::{
    curate_by_interest, filter_large_objects, rank_by_moid, RiskRanking,
};
use neowatch_common::{Catalog, CatalogRecord};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SourceReport {
    Remote(FetchReport),
    LocalFile { path: String, report: LoadReport },
}

#[derive(Debug, Serialize)]
struct RunReport {
    generated_at: DateTime<Utc>,
    source: SourceReport,
    enrichment: Option<EnrichmentReport>,
    records: usize,
    ranked: usize,
    curated: usize,
    large_objects: usize,
    trajectories: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::read_config(&config_path)?;

    // Initialize logging
    let _logging_guard = logging::init_logging(&config.log_dir, "neowatch", &config.log_level)
        .context("Failed to initialize logging")?;

    tracing::info!("neowatch starting (config: {})", config_path);

    let (catalog, source) = load_catalog(config).await?;
    if catalog.is_empty() {
        tracing::error!("Catalog is empty, nothing to analyze");
        anyhow::bail!("No catalog records available from {}", describe_source(&source));
    }

    let (catalog, enrichment) = if config.enrichment.enabled {
        let (catalog, report) = enrich(config, catalog).await?;
        (catalog, Some(report))
    } else {
        (catalog, None)
    };

    let output_dir = Path::new(&config.trajectory.output_dir);
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    write_json(output_dir, "catalog.json", &catalog).await?;

    // Risk ranking
    let ranking = rank_by_moid(&catalog, config.ranking.top_n);
    match &ranking {
        RiskRanking::Ranked(objects) => {
            for (place, object) in objects.iter().enumerate() {
                tracing::info!(
                    "#{} {} - MOID {:.5} AU ({:.2} LD), diameter {}",
                    place + 1,
                    object.identifier,
                    object.moid_au,
                    object.moid_ld,
                    object
                        .diameter_km
                        .map_or("unknown".to_string(), |d| format!("{:.3} km", d))
                );
            }
        }
        RiskRanking::NoQualifyingObjects => {
            tracing::info!("No hazardous objects with MOID data found");
        }
    }
    write_json(output_dir, "risk_ranking.json", &ranking).await?;

    let curated = curate_by_interest(&catalog, config.ranking.curation_limit);
    write_json(output_dir, "curated.json", &curated).await?;

    let large = filter_large_objects(&catalog, config.ranking.large_diameter_km);
    tracing::info!(
        "{} objects larger than {} km",
        large.len(),
        config.ranking.large_diameter_km
    );
    write_json(output_dir, "large_objects.json", &large).await?;

    // Trajectories for the curated selection
    let traced = trace_orbits(config, &curated)?;
    write_json(output_dir, "trajectories.json", &traced).await?;

    let report = RunReport {
        generated_at: Utc::now(),
        source,
        enrichment,
        records: catalog.len(),
        ranked: ranking.objects().len(),
        curated: curated.len(),
        large_objects: large.len(),
        trajectories: traced.len(),
    };
    write_json(output_dir, "run_report.json", &report).await?;

    tracing::info!("neowatch finished, results in {:?}", output_dir);
    Ok(())
}

async fn load_catalog(config: &NeowatchConfig) -> Result<(Catalog, SourceReport)> {
    if let Some(path) = &config.catalog.local_file {
        let (catalog, report) = load_local_catalog(path)
            .await
            .with_context(|| format!("Failed to load local catalog {}", path))?;
        return Ok((
            catalog,
            SourceReport::LocalFile {
                path: path.clone(),
                report,
            },
        ));
    }

    let client = Arc::new(SbdbClient::new(&config.api).context("Failed to build API client")?);
    let cache = Arc::new(FileCatalogCache::new(&config.catalog.cache_dir));
    let fetcher = CatalogFetcher::new(client, cache);

    let query = FetchQuery::from_names(
        &config.catalog.partitions,
        config.catalog.fields.clone(),
        config.catalog.limit_per_partition,
    );
    let (catalog, report) = fetcher.fetch(&query).await;
    Ok((catalog, SourceReport::Remote(report)))
}

async fn enrich(config: &NeowatchConfig, catalog: Catalog) -> Result<(Catalog, EnrichmentReport)> {
    let client = Arc::new(SbdbClient::new(&config.api).context("Failed to build API client")?);
    let pipeline =
        EnrichmentPipeline::new(client, EnrichmentSettings::from_config(&config.enrichment));

    let stop = StopSignal::new();
    let on_ctrl_c = stop.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, no new lookups will be issued");
            on_ctrl_c.stop();
        }
    });

    let outcome = pipeline.run(&catalog, &stop).await;
    watcher.abort();

    if outcome.report.null_filled() > 0 {
        tracing::warn!(
            "{} of {} rows could not be enriched",
            outcome.report.null_filled(),
            outcome.report.total
        );
    }
    Ok((outcome.merged_catalog(), outcome.report))
}

fn trace_orbits(
    config: &NeowatchConfig,
    selection: &[&CatalogRecord],
) -> Result<Vec<OrbitTrajectory>> {
    let resolution = config.trajectory.resolution;

    let mut traced = Vec::new();
    if config.trajectory.include_earth {
        traced.push(OrbitTrajectory::trace(
            "Earth",
            &earth_reference_elements(),
            resolution.samples(),
        )?);
    }
    traced.extend(trajectories_for(
        selection.iter().copied(),
        resolution,
        config.trajectory.max_orbits,
    ));
    Ok(traced)
}

fn describe_source(source: &SourceReport) -> String {
    match source {
        SourceReport::Remote(report) => format!(
            "remote query ({} partitions failed)",
            report.partitions_failed.len()
        ),
        SourceReport::LocalFile { path, .. } => path.clone(),
    }
}

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}
