/// Integration tests driving the ingestion pipeline and retrieval service
/// end to end with stub external providers
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use docqa::config::StorageConfig;
use docqa::embedding::EmbeddingProvider;
use docqa::error::{DocQaError, EmbeddingError, GenerationError};
use docqa::index::IndexStore;
use docqa::ingest::{IngestionPipeline, TokenChunker};
use docqa::llm::{ChatModel, VisionModel};
use docqa::router::QueryRouter;
use docqa::service::{RetrievalOptions, RetrievalService};
use docqa::types::{ChatAnswer, ImageRecord};

/// Deterministic embedder: maps a text to an axis by keyword so that
/// queries land nearest the chunks sharing their keyword
struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        if lowered.contains("alpha") {
            vec![1.0, 0.0, 0.0, 0.0]
        } else if lowered.contains("beta") {
            vec![0.0, 1.0, 0.0, 0.0]
        } else if lowered.contains("gamma") {
            vec![0.0, 0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 0.0, 1.0]
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyBatch);
        }
        Ok(texts.iter().map(|text| Self::vector_for(text)).collect())
    }

    fn dimension(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "keyword-stub"
    }
}

/// Chat stub that always answers with a fixed reply
struct CannedChat {
    reply: String,
}

#[async_trait::async_trait]
impl ChatModel for CannedChat {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: usize,
    ) -> Result<String, GenerationError> {
        Ok(self.reply.clone())
    }
}

/// Vision stub that echoes which file it was shown
struct EchoVision;

#[async_trait::async_trait]
impl VisionModel for EchoVision {
    async fn describe_image(
        &self,
        image_path: &Path,
        _prompt: &str,
    ) -> Result<String, GenerationError> {
        Ok(format!("analysis of {}", image_path.display()))
    }
}

struct Fixture {
    pipeline: IngestionPipeline,
    service: RetrievalService,
    images_dir: PathBuf,
    _dir: TempDir,
}

fn fixture_with(chat_reply: &str, max_tokens: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let storage = StorageConfig {
        data_dir: dir.path().to_path_buf(),
    };
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(KeywordEmbedder);
    let index = Arc::new(IndexStore::new(&storage));

    let pipeline = IngestionPipeline::new(
        TokenChunker::new(max_tokens),
        embedder.clone(),
        index.clone(),
        storage.clone(),
        8,
    );
    let service = RetrievalService::new(
        embedder,
        Arc::new(CannedChat {
            reply: chat_reply.to_string(),
        }),
        Arc::new(EchoVision),
        QueryRouter::new().unwrap(),
        index,
        storage.images_index_path(),
        RetrievalOptions {
            top_k: 5,
            answer_max_tokens: 500,
            followup_max_tokens: 200,
        },
    );

    Fixture {
        pipeline,
        service,
        images_dir: storage.images_dir(),
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with("the answer", 512)
}

fn seed_images(fixture: &Fixture, records: &[ImageRecord]) {
    std::fs::create_dir_all(&fixture.images_dir).unwrap();
    for record in records {
        std::fs::write(&record.file_path, b"fake-jpeg").unwrap();
    }
    std::fs::write(
        fixture.images_dir.join("images.json"),
        serde_json::to_vec_pretty(records).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_round_trip_cites_ingested_page() -> Result<()> {
    let fixture = fixture();
    let pages = vec![
        "alpha protocol overview and alpha setup".to_string(),
        "beta performance characteristics".to_string(),
        "gamma appendix notes".to_string(),
    ];
    let chunks = fixture.pipeline.ingest_pages(&pages).await?;
    assert_eq!(chunks, 3);

    let answer = fixture.service.answer("Summarize the alpha protocol", &[]).await?;
    match answer {
        ChatAnswer::Text {
            message,
            relevant_pages,
            source_chunks,
        } => {
            assert_eq!(message, "the answer");
            assert!(relevant_pages.contains(&1));
            assert_eq!(relevant_pages[0], 1);
            assert!(source_chunks.len() <= 5);
            assert!(source_chunks[0].text.contains("alpha"));
        }
        other => panic!("expected a text answer, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_top_k_and_page_dedup() -> Result<()> {
    // Chunk budget of 4 tokens turns one page into many chunks
    let fixture = fixture_with("the answer", 4);
    let long_page = (0..40)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let chunks = fixture.pipeline.ingest_pages(&[long_page]).await?;
    assert_eq!(chunks, 10);

    let answer = fixture.service.answer("anything at all", &[]).await?;
    match answer {
        ChatAnswer::Text {
            relevant_pages,
            source_chunks,
            ..
        } => {
            assert_eq!(source_chunks.len(), 5);
            // Every chunk comes from page 1; the page list is deduplicated
            assert_eq!(relevant_pages, vec![1]);
        }
        other => panic!("expected a text answer, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_pages_are_skipped_but_numbering_is_kept() -> Result<()> {
    let fixture = fixture();
    let pages = vec!["   ".to_string(), "beta section details".to_string()];
    let chunks = fixture.pipeline.ingest_pages(&pages).await?;
    assert_eq!(chunks, 1);

    let answer = fixture.service.answer("Explain the beta section", &[]).await?;
    match answer {
        ChatAnswer::Text { relevant_pages, .. } => {
            // The blank first page contributed nothing; the chunk still
            // carries its true 1-indexed page number
            assert_eq!(relevant_pages, vec![2]);
        }
        other => panic!("expected a text answer, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_reingestion_fully_replaces_prior_document() -> Result<()> {
    let fixture = fixture();
    let first = vec![
        "alpha chapter one".to_string(),
        "beta chapter two".to_string(),
    ];
    fixture.pipeline.ingest_pages(&first).await?;

    let second = vec!["delta content only".to_string()];
    fixture.pipeline.ingest_pages(&second).await?;

    let answer = fixture.service.answer("Where is alpha discussed?", &[]).await?;
    match answer {
        ChatAnswer::Text {
            relevant_pages,
            source_chunks,
            ..
        } => {
            assert_eq!(source_chunks.len(), 1);
            for chunk in &source_chunks {
                assert!(!chunk.text.contains("alpha"));
            }
            assert_eq!(relevant_pages, vec![1]);
        }
        other => panic!("expected a text answer, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_query_before_ingestion_fails_with_index_error() {
    let fixture = fixture();
    let err = fixture
        .service
        .answer("what is in the document?", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DocQaError::Index(_)));
}

#[tokio::test]
async fn test_image_query_without_page_number() -> Result<()> {
    let fixture = fixture();
    let answer = fixture.service.answer("Describe the image", &[]).await?;
    match answer {
        ChatAnswer::NoMatch { message } => {
            assert_eq!(message, "No page number found in the query.");
        }
        other => panic!("expected no-match, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_image_query_for_page_without_images() -> Result<()> {
    let fixture = fixture();
    seed_images(
        &fixture,
        &[ImageRecord {
            page: 1,
            file_path: fixture
                .images_dir
                .join("page_1_img_1.jpg")
                .to_string_lossy()
                .into_owned(),
        }],
    );

    let answer = fixture
        .service
        .answer("What does the figure on page 9 show?", &[])
        .await?;
    match answer {
        ChatAnswer::NoMatch { message } => {
            assert_eq!(message, "No relevant images found for the page number.");
        }
        other => panic!("expected no-match, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_image_query_analyzes_every_matching_image() -> Result<()> {
    let fixture = fixture();
    let records = vec![
        ImageRecord {
            page: 2,
            file_path: fixture
                .images_dir
                .join("page_2_img_1.jpg")
                .to_string_lossy()
                .into_owned(),
        },
        ImageRecord {
            page: 2,
            file_path: fixture
                .images_dir
                .join("page_2_img_2.jpg")
                .to_string_lossy()
                .into_owned(),
        },
    ];
    seed_images(&fixture, &records);

    let answer = fixture
        .service
        .answer("What is shown on page 2?", &[])
        .await?;
    match answer {
        ChatAnswer::Image { page, analyses } => {
            assert_eq!(page, 2);
            assert_eq!(analyses.len(), 2);
            assert!(analyses[0].message.contains("page_2_img_1.jpg"));
            assert!(analyses[1].message.contains("page_2_img_2.jpg"));
        }
        other => panic!("expected an image answer, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_followup_with_well_formed_response() -> Result<()> {
    let fixture = fixture_with("['What next?','Why so?','How come?']", 512);
    let questions = fixture.service.suggest_followups("tell me more").await?;
    assert_eq!(questions, vec!["What next?", "Why so?", "How come?"]);
    Ok(())
}

#[tokio::test]
async fn test_followup_with_malformed_response_degrades_to_empty() -> Result<()> {
    let fixture = fixture_with("Sure! Here are three questions you could ask:", 512);
    let questions = fixture.service.suggest_followups("tell me more").await?;
    assert!(questions.is_empty());
    Ok(())
}
