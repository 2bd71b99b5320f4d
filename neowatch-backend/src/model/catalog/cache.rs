use async_trait::async_trait;
use neowatch_common::Catalog;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::FetchQuery;
use crate::error::Result;

/// Identity of a cached catalog snapshot.
///
/// Built from everything that shapes a fetch result: partition order, row limit and
/// field list. The field list is folded into a short digest so the rendered form
/// stays a bounded, collision-resistant file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

/// Hex characters of the field-list digest kept in the key.
const FIELDS_DIGEST_LEN: usize = 16;

impl CacheKey {
    pub fn for_query(query: &FetchQuery) -> Self {
        let partitions: Vec<&str> = query.partitions.iter().map(|p| p.as_str()).collect();
        let raw = format!(
            "catalog_{}_{}_{}",
            partitions.join("-"),
            query.limit,
            fields_digest(&query.fields)
        );
        Self(sanitize(&raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn fields_digest(fields: &[String]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(FIELDS_DIGEST_LEN);
    digest
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Storage for whole catalog snapshots. No expiry: a present entry is a full hit.
#[async_trait]
pub trait CatalogCache: Send + Sync {
    /// `Ok(None)` on a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<Catalog>>;

    async fn put(&self, key: &CacheKey, catalog: &Catalog) -> Result<()>;
}

/// One JSON document per key under a cache directory.
pub struct FileCatalogCache {
    cache_dir: PathBuf,
}

impl FileCatalogCache {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    async fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await?;
            info!("Created cache directory: {:?}", self.cache_dir);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogCache for FileCatalogCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Catalog>> {
        let path = self.path_for(key);

        if !path.exists() {
            debug!("Cache file does not exist: {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let catalog: Catalog = serde_json::from_str(&content)?;

        info!("Loaded {} records from cache {:?}", catalog.len(), path);
        Ok(Some(catalog))
    }

    async fn put(&self, key: &CacheKey, catalog: &Catalog) -> Result<()> {
        self.ensure_cache_dir().await?;

        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(catalog)?;
        fs::write(&path, content).await?;

        debug!("Saved {} records to cache {:?}", catalog.len(), path);
        Ok(())
    }
}

/// Process-local cache, for tests and embedding.
#[derive(Default)]
pub struct MemoryCatalogCache {
    entries: RwLock<HashMap<CacheKey, Catalog>>,
}

impl MemoryCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CatalogCache for MemoryCatalogCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Catalog>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, catalog: &Catalog) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.clone(), catalog.clone());
        Ok(())
    }
}
