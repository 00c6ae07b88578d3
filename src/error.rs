/// Centralized error types for docqa using thiserror
///
/// One enum per pipeline stage, wrapped by [`DocQaError`] for the layers that
/// cross stage boundaries (the HTTP handlers and the ingestion pipeline).
use thiserror::Error;

/// Main error type for the document QA system
#[derive(Error, Debug)]
pub enum DocQaError {
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while ingesting an uploaded PDF
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read PDF '{path}': {reason}")]
    PdfUnreadable { path: String, reason: String },

    #[error("PDF contains no extractable text")]
    NoTextContent,

    #[error("Failed to write {what} to '{path}': {reason}")]
    WriteFailed {
        what: &'static str,
        path: String,
        reason: String,
    },
}

/// Errors from the external embedding service
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Invalid embedding API credentials")]
    InvalidApiKey,

    #[error("Failed to build embedding HTTP client: {0}")]
    ClientBuildFailed(String),

    #[error("Embedding batch is empty")]
    EmptyBatch,

    #[error("Embedding request failed ({status}): {body}")]
    RequestFailed { status: String, body: String },

    #[error("Embedding service unreachable: {0}")]
    Transport(String),

    #[error("Embedding count mismatch: {expected} inputs, {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from the vector index and its metadata companion
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("No index found at '{0}'; ingest a document first")]
    Missing(String),

    #[error("Failed to load index from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to persist index to '{path}': {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("Cannot build an index from zero vectors")]
    EmptyBuild,

    #[error("Vector dimension mismatch: index is {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Metadata does not match index: {index_rows} rows, {metadata_rows} records")]
    RowMismatch {
        index_rows: usize,
        metadata_rows: usize,
    },
}

/// Errors from the external text-generation and vision models
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid generation API credentials")]
    InvalidApiKey,

    #[error("Failed to build generation HTTP client: {0}")]
    ClientBuildFailed(String),

    #[error("Generation request failed ({status}): {body}")]
    RequestFailed { status: String, body: String },

    #[error("Generation service unreachable: {0}")]
    Transport(String),

    #[error("Model response contained no content")]
    EmptyResponse,

    #[error("Failed to read image '{path}': {reason}")]
    ImageUnreadable { path: String, reason: String },
}

/// Errors from parsing model output into follow-up questions
///
/// These never surface to callers: the follow-up endpoint degrades to an
/// empty suggestion list instead.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Expected a bracketed list, got: {0:?}")]
    NotAList(String),

    #[error("Malformed list item near offset {0}")]
    MalformedItem(usize),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

// Conversion from anyhow::Error at application seams
impl From<anyhow::Error> for DocQaError {
    fn from(err: anyhow::Error) -> Self {
        DocQaError::Other(format!("{:#}", err))
    }
}

impl DocQaError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        DocQaError::Other(msg.into())
    }

    /// Message shown in HTTP error bodies
    pub fn user_message(&self) -> String {
        format!("{}", self)
    }
}
