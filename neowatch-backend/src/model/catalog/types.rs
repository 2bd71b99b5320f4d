//! Catalog pipeline data structures
//!
//! Query descriptions, the remote table format, enrichment rows and the aggregate
//! reports each stage hands back to the driver.

use chrono::{DateTime, Utc};
use neowatch_common::{CatalogRecord, OrbitalElementSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named subset of the remote catalog, queried independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Orbit class code such as "ATE", "APO", "AMO" or "IEO"
    OrbitClass(String),
    /// Objects flagged as potentially hazardous
    Hazardous,
}

impl Partition {
    pub fn as_str(&self) -> &str {
        match self {
            Partition::OrbitClass(code) => code,
            Partition::Hazardous => "PHA",
        }
    }

    /// Query parameter selecting this partition.
    pub fn selector(&self) -> (&'static str, String) {
        match self {
            Partition::OrbitClass(code) => ("sb-class", code.clone()),
            Partition::Hazardous => ("sb-group", "pha".to_string()),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        match code.as_str() {
            "" => Err("Empty partition name".to_string()),
            "PHA" => Ok(Partition::Hazardous),
            _ if code.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(Partition::OrbitClass(code))
            }
            _ => Err(format!("Invalid partition name: {}", s)),
        }
    }
}

/// Everything that determines the content of a fetched catalog.
///
/// Two fetches with equal queries produce interchangeable catalogs, which is
/// what makes the query usable as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchQuery {
    /// Precedence order: on duplicate identifiers the earliest partition wins
    pub partitions: Vec<Partition>,
    pub fields: Vec<String>,
    pub limit: usize,
}

impl FetchQuery {
    pub fn new(partitions: Vec<Partition>, fields: Vec<String>, limit: usize) -> Self {
        Self {
            partitions,
            fields,
            limit,
        }
    }

    /// Parse partition names from configuration, skipping invalid entries.
    pub fn from_names(names: &[String], fields: Vec<String>, limit: usize) -> Self {
        let partitions = names
            .iter()
            .filter_map(|name| match name.parse::<Partition>() {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("Ignoring partition: {}", e);
                    None
                }
            })
            .collect();
        Self::new(partitions, fields, limit)
    }
}

/// Tabular response of the remote query API: a field-name list plus rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SbdbTable {
    #[serde(default)]
    pub fields: Vec<String>,

    /// Absent when nothing matched
    #[serde(default)]
    pub data: Vec<Vec<Value>>,

    /// Declared row count; the API sends it as a number or a string
    #[serde(default)]
    pub count: Option<Value>,
}

impl SbdbTable {
    pub fn declared_count(&self) -> Option<u64> {
        match self.count.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A declared zero count or a missing row list both mean "no results".
    pub fn is_empty(&self) -> bool {
        self.declared_count() == Some(0) || self.data.is_empty()
    }

    /// Rows as (field, cell) pairs. Rows shorter than the field list yield
    /// only the cells they have.
    pub fn rows(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        let empty = self.declared_count() == Some(0);
        self.data
            .iter()
            .filter(move |_| !empty)
            .map(move |row| {
                self.fields
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter())
                    .collect()
            })
    }
}

/// Summary of one catalog fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub fetched_at: DateTime<Utc>,
    pub cache_hit: bool,
    pub partitions_ok: Vec<String>,
    pub partitions_failed: Vec<String>,
    pub rows_received: usize,
    pub rows_skipped: usize,
    pub duplicates_dropped: usize,
    pub records: usize,
    pub duration_seconds: f64,
}

impl FetchReport {
    pub fn new() -> Self {
        Self {
            fetched_at: Utc::now(),
            cache_hit: false,
            partitions_ok: Vec::new(),
            partitions_failed: Vec::new(),
            rows_received: 0,
            rows_skipped: 0,
            duplicates_dropped: 0,
            records: 0,
            duration_seconds: 0.0,
        }
    }
}

impl Default for FetchReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a local file load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub duplicates_dropped: usize,
    pub records: usize,
}

/// Fields filled by a per-object lookup.
///
/// Every field is always present; a failed lookup leaves all of them `None`,
/// so the set of columns never depends on which rows succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitEnrichment {
    pub a: Option<f64>,
    pub e: Option<f64>,
    pub i: Option<f64>,
    pub om: Option<f64>,
    pub w: Option<f64>,
    pub ma: Option<f64>,
    pub q: Option<f64>,
    pub ad: Option<f64>,
    pub per_y: Option<f64>,
    pub moid: Option<f64>,
    pub pha: Option<bool>,
}

impl OrbitEnrichment {
    /// Remote field names requested for each lookup.
    pub const FIELDS: &'static [&'static str] = &[
        "spkid", "a", "e", "i", "om", "w", "ma", "q", "ad", "per_y", "moid", "pha",
    ];

    pub fn elements(&self) -> OrbitalElementSet {
        OrbitalElementSet {
            a: self.a,
            e: self.e,
            i: self.i,
            om: self.om,
            w: self.w,
            ma: self.ma,
        }
    }
}

/// Outcome of one row's lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Enriched,
    Failed(String),
    TimedOut,
    /// Not issued because the run was stopped first
    NotAttempted,
}

/// A catalog row augmented with its enrichment columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: CatalogRecord,
    pub enrichment: OrbitEnrichment,
    pub status: EnrichmentStatus,
}

impl EnrichedRecord {
    pub fn enriched(record: CatalogRecord, enrichment: OrbitEnrichment) -> Self {
        Self {
            record,
            enrichment,
            status: EnrichmentStatus::Enriched,
        }
    }

    /// Row with every enrichment column null.
    pub fn null_filled(record: CatalogRecord, status: EnrichmentStatus) -> Self {
        Self {
            record,
            enrichment: OrbitEnrichment::default(),
            status,
        }
    }

    /// The record with missing fields filled from the enrichment; values the
    /// record already had are kept.
    pub fn merged(&self) -> CatalogRecord {
        let mut record = self.record.clone();
        let extra = &self.enrichment;
        record.elements = record.elements.or(&extra.elements());
        record.q = record.q.or(extra.q);
        record.ad = record.ad.or(extra.ad);
        record.per_y = record.per_y.or(extra.per_y);
        record.moid = record.moid.or(extra.moid);
        record.pha = record.pha.or(extra.pha);
        record
    }
}

/// Summary of one enrichment run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub total: usize,
    pub enriched: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub not_attempted: usize,
    pub stopped_early: bool,
    pub duration_seconds: f64,
}

impl EnrichmentReport {
    pub fn tally(rows: &[EnrichedRecord]) -> Self {
        let mut report = Self {
            total: rows.len(),
            ..Default::default()
        };
        for row in rows {
            match row.status {
                EnrichmentStatus::Enriched => report.enriched += 1,
                EnrichmentStatus::Failed(_) => report.failed += 1,
                EnrichmentStatus::TimedOut => report.timed_out += 1,
                EnrichmentStatus::NotAttempted => report.not_attempted += 1,
            }
        }
        report.stopped_early = report.not_attempted > 0;
        report
    }

    /// Rows that ended up null-filled for any reason.
    pub fn null_filled(&self) -> usize {
        self.failed + self.timed_out + self.not_attempted
    }
}
