mod openai;

pub use openai::{OpenAiChatModel, OpenAiVisionModel};

use std::path::Path;

use crate::error::GenerationError;

/// Trait implemented by concrete text-generation models
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce a completion for a system + user message pair
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: usize,
    ) -> Result<String, GenerationError>;
}

/// Trait implemented by vision-capable models
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// Answer a prompt about one image file
    async fn describe_image(
        &self,
        image_path: &Path,
        prompt: &str,
    ) -> Result<String, GenerationError>;
}
