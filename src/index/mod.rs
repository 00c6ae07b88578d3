//! Flat vector index with a positional metadata companion
//!
//! The index is a flat squared-Euclidean scan: build-once, search-many,
//! wholesale-replaced on each ingestion. Row `i` of the index corresponds to
//! record `i` of the metadata sequence; that positional invariant is checked
//! on every replace and every search.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::StorageConfig;
use crate::error::IndexError;
use crate::persist::atomic_write;
use crate::types::{ChunkRecord, ScoredChunk};

/// Flat store of row-major embedding vectors with exact k-NN search
#[derive(Debug, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Construct a fresh index from an ordered sequence of vectors
    ///
    /// All vectors must share one dimension; zero vectors is an error.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimension = vectors.first().ok_or(IndexError::EmptyBuild)?.len();
        if dimension == 0 {
            return Err(IndexError::EmptyBuild);
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimension);
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }

        Ok(Self {
            dimension,
            vectors: flat,
        })
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the `k` nearest rows by ascending squared Euclidean distance
    ///
    /// `k` is clamped to the index size. Ties break by row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| (row, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.len()));
        Ok(scored)
    }

    /// Persist to `path` atomically
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let bytes = bincode::serialize(self).map_err(|e| IndexError::PersistFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        atomic_write(path, &bytes).map_err(|e| IndexError::PersistFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load from `path`
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IndexError::Missing(path.display().to_string()),
            _ => IndexError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        bincode::deserialize(&bytes).map_err(|e| IndexError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Ordered chunk records mirroring index rows
pub struct MetadataStore;

impl MetadataStore {
    /// Load the record sequence from `path`
    pub fn load(path: &Path) -> Result<Vec<ChunkRecord>, IndexError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IndexError::Missing(path.display().to_string()),
            _ => IndexError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        serde_json::from_slice(&bytes).map_err(|e| IndexError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Persist the record sequence to `path` atomically
    pub fn save(records: &[ChunkRecord], path: &Path) -> Result<(), IndexError> {
        let json =
            serde_json::to_vec_pretty(records).map_err(|e| IndexError::PersistFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        atomic_write(path, &json).map_err(|e| IndexError::PersistFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Durable index + metadata pair with guarded replacement
///
/// Ingestion replaces both files under the write lock; every search takes
/// the read lock and loads fresh from disk, so queries either see the old
/// pair or the new pair, never a mix.
pub struct IndexStore {
    index_path: PathBuf,
    metadata_path: PathBuf,
    lock: RwLock<()>,
}

impl IndexStore {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            index_path: storage.index_path(),
            metadata_path: storage.metadata_path(),
            lock: RwLock::new(()),
        }
    }

    /// Atomically replace the index and its metadata as one logical unit
    pub async fn replace(
        &self,
        index: &FlatIndex,
        records: &[ChunkRecord],
    ) -> Result<(), IndexError> {
        if index.len() != records.len() {
            return Err(IndexError::RowMismatch {
                index_rows: index.len(),
                metadata_rows: records.len(),
            });
        }

        let _guard = self.lock.write().await;
        index.save(&self.index_path)?;
        MetadataStore::save(records, &self.metadata_path)?;
        tracing::info!(rows = index.len(), "replaced vector index and metadata");
        Ok(())
    }

    /// Search the persisted index and resolve row hits against metadata
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        let _guard = self.lock.read().await;
        let index = FlatIndex::load(&self.index_path)?;
        let records = MetadataStore::load(&self.metadata_path)?;

        if records.len() != index.len() {
            return Err(IndexError::RowMismatch {
                index_rows: index.len(),
                metadata_rows: records.len(),
            });
        }

        let hits = index.search(query, k)?;
        Ok(hits
            .into_iter()
            .map(|(row, distance)| ScoredChunk {
                page: records[row].page,
                text: records[row].text.clone(),
                distance,
            })
            .collect())
    }
}
