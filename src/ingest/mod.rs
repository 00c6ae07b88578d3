//! PDF ingestion: text extraction, chunking, embedding, index construction,
//! and image extraction
//!
//! Text indexing and image extraction are independent steps. The index and
//! its metadata are replaced as one logical unit only after every prior step
//! succeeds, so a failed ingestion leaves the previous document searchable.

pub mod chunker;
pub mod images;
pub mod text;

pub use chunker::{TokenChunker, clean_text};

use std::path::Path;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{DocQaError, IngestionError};
use crate::index::{FlatIndex, IndexStore};
use crate::types::{ChunkRecord, IngestResponse};

/// Builds the searchable state for one uploaded document
pub struct IngestionPipeline {
    chunker: TokenChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexStore>,
    storage: StorageConfig,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        chunker: TokenChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<IndexStore>,
        storage: StorageConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            storage,
            batch_size,
        }
    }

    /// Ingest a PDF: index its text, then extract its images
    pub async fn ingest_pdf(&self, path: &Path) -> Result<IngestResponse, DocQaError> {
        let records = text::extract_chunks(path, &self.chunker)?;
        let chunks = self.index_chunks(records).await?;

        // Independent step: an image failure surfaces to the caller but the
        // text index above is already in place
        let images = images::extract_images(path, &self.storage.images_dir())?;

        Ok(IngestResponse {
            status: "success".to_string(),
            message: "PDF processed successfully".to_string(),
            chunks,
            images: images.len(),
        })
    }

    /// Index pre-extracted page texts (1-indexed by position)
    ///
    /// This is the pipeline below the PDF parser; it exists as its own entry
    /// point so the chunk/embed/index path can be driven without a PDF file.
    pub async fn ingest_pages(&self, pages: &[String]) -> Result<usize, DocQaError> {
        let mut records = Vec::new();
        for (page_idx, page_text) in pages.iter().enumerate() {
            let page = page_idx as u32 + 1;
            for text in self.chunker.chunk(page_text) {
                records.push(ChunkRecord { page, text });
            }
        }
        self.index_chunks(records).await
    }

    /// Embed chunk records and atomically swap in the new index + metadata
    async fn index_chunks(&self, records: Vec<ChunkRecord>) -> Result<usize, DocQaError> {
        if records.is_empty() {
            return Err(IngestionError::NoTextContent.into());
        }

        let mut vectors = Vec::with_capacity(records.len());
        for batch in records.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|record| record.text.clone()).collect();
            vectors.extend(self.embedder.embed_batch(&texts).await?);
        }

        let index = FlatIndex::build(vectors)?;
        self.index.replace(&index, &records).await?;

        tracing::info!(chunks = records.len(), "indexed document text");
        Ok(records.len())
    }
}
