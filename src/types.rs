use serde::{Deserialize, Serialize};

/// One chunk of document text, tagged with its 1-indexed source page
///
/// Position in the metadata sequence equals the chunk's row in the vector
/// index; that positional correspondence is the only join key between
/// search results and chunk text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// 1-indexed page the chunk was extracted from
    pub page: u32,
    /// Cleaned chunk text
    pub text: String,
}

/// One extracted embedded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-indexed page the image was embedded on
    pub page: u32,
    /// Path of the extracted image file
    pub file_path: String,
}

/// A retrieved chunk with its distance to the query embedding
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub page: u32,
    pub text: String,
    /// Squared Euclidean distance (lower is closer)
    pub distance: f32,
}

/// One prior conversation turn supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

/// Request body for the chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,
    /// Prior conversation turns, oldest first
    #[serde(default)]
    pub chat_context: Vec<ChatTurn>,
}

/// Request body for the follow-up suggestion endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpRequest {
    pub current_text: String,
}

/// Response from PDF ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    /// Number of text chunks indexed
    pub chunks: usize,
    /// Number of images extracted
    pub images: usize,
}

/// Vision-model analysis of one extracted image
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub message: String,
    pub image_path: String,
}

/// Answer returned by the chat endpoint
///
/// Serialized untagged: the caller sees the variant's fields directly, the
/// way the three response shapes are defined for the endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatAnswer {
    /// Text-retrieval answer with cited pages and source chunks
    Text {
        message: String,
        relevant_pages: Vec<u32>,
        source_chunks: Vec<ChunkRecord>,
    },
    /// Image analysis, one entry per image found on the requested page
    Image {
        page: u32,
        analyses: Vec<ImageAnalysis>,
    },
    /// No page number in the question, or no images on the requested page
    NoMatch { message: String },
}
