//! Small-body database API client
//!
//! One client serves both the multi-row partition queries used to build a catalog
//! and the single-object lookups used to enrich one.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::coerce::{enrichment_from_cells, json_cells};
use super::types::{OrbitEnrichment, Partition, SbdbTable};
use crate::config::ApiConfig;
use crate::error::{CatalogError, Result};

/// Source of whole catalog partitions.
#[async_trait]
pub trait PartitionSource: Send + Sync {
    async fn query_partition(
        &self,
        partition: &Partition,
        fields: &[String],
        limit: usize,
    ) -> Result<SbdbTable>;
}

/// Source of per-object orbital fields.
#[async_trait]
pub trait ObjectLookup: Send + Sync {
    /// Fetch the enrichment fields of the object identified by `key`.
    /// An unknown object is an error, never an all-null success.
    async fn lookup(&self, key: &str) -> Result<OrbitEnrichment>;
}

const CONSTRAINT_DELIMITERS: [char; 4] = ['|', ',', '"', '\\'];

pub struct SbdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl SbdbClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("neowatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.query_url.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        })
    }

    fn url_with(&self, params: &[(&str, String)]) -> String {
        let mut query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if let Some(key) = &self.api_key {
            query.push(format!("api_key={}", urlencoding::encode(key)));
        }
        format!("{}?{}", self.base_url, query.join("&"))
    }

    pub fn partition_url(&self, partition: &Partition, fields: &[String], limit: usize) -> String {
        let (selector, value) = partition.selector();
        self.url_with(&[
            ("fields", fields.join(",")),
            (selector, value),
            ("limit", limit.to_string()),
        ])
    }

    /// Keys containing constraint delimiters cannot be expressed in `sb-cdata`
    /// and are rejected.
    pub fn lookup_url(&self, key: &str) -> Result<String> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CatalogError::row_failed(key, "empty lookup key"));
        }
        if let Some(c) = key.chars().find(|c| CONSTRAINT_DELIMITERS.contains(c)) {
            return Err(CatalogError::row_failed(
                key,
                format!("key contains reserved character '{}'", c),
            ));
        }

        let constraint = if key.chars().all(|c| c.is_ascii_digit()) {
            format!(r#"{{"AND":["spkid|EQ|{}"]}}"#, key)
        } else {
            format!(r#"{{"AND":["full_name|EQ|{}"]}}"#, key)
        };
        Ok(self.url_with(&[
            ("fields", OrbitEnrichment::FIELDS.join(",")),
            ("sb-cdata", constraint),
            ("limit", "1".to_string()),
        ]))
    }

    /// GET a table, retrying with linear back-off.
    async fn get_table(&self, url: &str, label: &str, attempts: u32) -> Result<SbdbTable> {
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry_delay * (attempt - 1);
                tracing::debug!(
                    "Retrying {} after {:?} (attempt {}/{})",
                    label,
                    delay,
                    attempt,
                    attempts
                );
                tokio::time::sleep(delay).await;
            }

            match self.fetch_attempt(url).await {
                Ok(table) => return Ok(table),
                Err(e) => {
                    if attempt < attempts {
                        tracing::warn!(
                            "Attempt {}/{} failed for {}: {}",
                            attempt,
                            attempts,
                            label,
                            e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CatalogError::partition_failed(label, "no attempt made")))
    }

    /// Single fetch attempt
    async fn fetch_attempt(&self, url: &str) -> Result<SbdbTable> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus {
                status: response.status().as_u16(),
                url: self.base_url.clone(),
            });
        }

        Ok(response.json::<SbdbTable>().await?)
    }
}

#[async_trait]
impl PartitionSource for SbdbClient {
    async fn query_partition(
        &self,
        partition: &Partition,
        fields: &[String],
        limit: usize,
    ) -> Result<SbdbTable> {
        let url = self.partition_url(partition, fields, limit);
        let table = self
            .get_table(&url, partition.as_str(), self.max_retries)
            .await
            .map_err(|e| CatalogError::partition_failed(partition.as_str(), e))?;

        tracing::debug!(
            "Partition {} returned {} rows (declared count {:?})",
            partition,
            table.data.len(),
            table.declared_count()
        );
        Ok(table)
    }
}

#[async_trait]
impl ObjectLookup for SbdbClient {
    async fn lookup(&self, key: &str) -> Result<OrbitEnrichment> {
        let url = self.lookup_url(key)?;
        let table = self
            .get_table(&url, key, 1)
            .await
            .map_err(|e| CatalogError::row_failed(key, e))?;

        let row = table
            .rows()
            .next()
            .ok_or_else(|| CatalogError::EmptyLookup(key.to_string()))?;

        Ok(enrichment_from_cells(json_cells(&row)))
    }
}
