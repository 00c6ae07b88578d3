//! # docqa - Document Question Answering
//!
//! A retrieval-augmented question-answering service over a single uploaded
//! PDF. Ingestion splits the document into token-bounded chunks, embeds them
//! through an external embedding API, and builds a flat squared-L2 vector
//! index persisted next to its positional metadata. Questions are routed by
//! vocabulary: image-related questions resolve extracted page images through
//! a vision model, everything else retrieves the nearest chunks and hands
//! them to a text-generation model for answer synthesis.
//!
//! ## Architecture
//!
//! ```text
//! PDF upload ──► text extraction ──► chunker ──► embeddings ──► FlatIndex
//!           └──► image extraction ──► images/ + images.json      + metadata
//!
//! question ──► QueryRouter ──┬─ text ──► index search ──► chat model
//!                            └─ image ─► page images  ──► vision model
//! ```
//!
//! ## Modules
//!
//! - [`ingest`]: PDF text/image extraction, chunking, and the ingestion pipeline
//! - [`embedding`]: embedding provider trait and the OpenAI-compatible client
//! - [`index`]: flat vector index, metadata store, and guarded atomic swap
//! - [`router`]: image-vs-text query classification and page extraction
//! - [`llm`]: chat and vision model clients
//! - [`service`]: retrieval orchestration and follow-up suggestion
//! - [`server`]: axum HTTP endpoints
//! - [`config`]: configuration with file, env, and default layering
//! - [`error`]: error types and utilities

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation via external OpenAI-compatible APIs
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Flat vector index with positional metadata and atomic replacement
pub mod index;

/// PDF ingestion pipeline: extraction, chunking, embedding, indexing
pub mod ingest;

/// External chat and vision model clients
pub mod llm;

/// Atomic file persistence helpers
mod persist;

/// Image-vs-text query classification
pub mod router;

/// HTTP server and application state
pub mod server;

/// Retrieval service orchestrating queries end to end
pub mod service;

/// Request/response and record types
pub mod types;
