use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::module::orbit::Resolution;

pub const DEFAULT_CONFIG_PATH: &str = "neowatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeowatchConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub trajectory: TrajectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_query_url")]
    pub query_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Partitions in precedence order: on duplicate identifiers the earlier one wins.
    #[serde(default = "default_partitions")]
    pub partitions: Vec<String>,

    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    #[serde(default = "default_limit_per_partition")]
    pub limit_per_partition: usize,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// When set, the catalog is read from this CSV dump instead of the remote API.
    #[serde(default)]
    pub local_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Aggregate request budget; `<= 0` disables rate limiting.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    #[serde(default = "default_lookup_timeout_seconds")]
    pub lookup_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_curation_limit")]
    pub curation_limit: usize,

    #[serde(default = "default_large_diameter_km")]
    pub large_diameter_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// "fine" (360 samples), "coarse" (180 samples) or a sample count
    #[serde(default)]
    pub resolution: Resolution,

    #[serde(default = "default_max_orbits")]
    pub max_orbits: usize,

    #[serde(default = "default_include_earth")]
    pub include_earth: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_query_url() -> String {
    "https://ssd-api.jpl.nasa.gov/sbdb_query.api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    2
}

fn default_partitions() -> Vec<String> {
    ["ATE", "APO", "AMO", "IEO", "PHA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fields() -> Vec<String> {
    [
        "spkid", "full_name", "h", "diameter", "albedo", "rot_per", "pha", "neo", "moid",
        "a", "e", "i", "om", "w", "ma", "q", "ad", "per_y", "data_arc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_limit_per_partition() -> usize {
    500
}

fn default_cache_dir() -> String {
    "data".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_requests_per_second() -> f64 {
    5.0
}

fn default_lookup_timeout_seconds() -> u64 {
    15
}

fn default_top_n() -> usize {
    10
}

fn default_curation_limit() -> usize {
    5000
}

fn default_large_diameter_km() -> f64 {
    1.0
}

fn default_max_orbits() -> usize {
    100
}

fn default_include_earth() -> bool {
    true
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Default for NeowatchConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            api: ApiConfig::default(),
            catalog: CatalogConfig::default(),
            enrichment: EnrichmentConfig::default(),
            ranking: RankingConfig::default(),
            trajectory: TrajectoryConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            query_url: default_query_url(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            fields: default_fields(),
            limit_per_partition: default_limit_per_partition(),
            cache_dir: default_cache_dir(),
            local_file: None,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrency: default_max_concurrency(),
            requests_per_second: default_requests_per_second(),
            lookup_timeout_seconds: default_lookup_timeout_seconds(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            curation_limit: default_curation_limit(),
            large_diameter_km: default_large_diameter_km(),
        }
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            max_orbits: default_max_orbits(),
            include_earth: default_include_earth(),
            output_dir: default_output_dir(),
        }
    }
}

impl NeowatchConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NeowatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

impl EnrichmentConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }
}

pub static CONFIG: OnceLock<NeowatchConfig> = OnceLock::new();

/// Read the configuration once for the whole process.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<&'static NeowatchConfig> {
    let path = path.as_ref();
    let config = NeowatchConfig::from_file_or_default(path)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;

    Ok(CONFIG.get_or_init(|| config))
}
