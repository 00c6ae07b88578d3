use std::path::Path;

use crate::error::IngestionError;
use crate::ingest::chunker::TokenChunker;
use crate::types::ChunkRecord;

/// Extract per-page text from a PDF and chunk it
///
/// Pages are 1-indexed. Pages whose text is empty after cleaning contribute
/// no records. An unreadable or corrupt PDF is fatal for the upload.
pub fn extract_chunks(
    path: &Path,
    chunker: &TokenChunker,
) -> Result<Vec<ChunkRecord>, IngestionError> {
    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| IngestionError::PdfUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut records = Vec::new();
    for (page_idx, page_text) in pages.iter().enumerate() {
        let page = page_idx as u32 + 1;
        for text in chunker.chunk(page_text) {
            records.push(ChunkRecord { page, text });
        }
    }

    tracing::debug!(
        pages = pages.len(),
        chunks = records.len(),
        "extracted text from PDF"
    );
    Ok(records)
}
