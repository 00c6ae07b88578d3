mod openai;

pub use openai::OpenAiEmbedder;

use crate::error::EmbeddingError;

/// Trait for embedding generation
///
/// Implementations wrap an external embedding service; there is no local
/// caching, every call re-embeds.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one fixed-dimension vector per input string, same order
    ///
    /// The input must be non-empty.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}
