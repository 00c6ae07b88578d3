//! Retrieval service: routes questions, searches the index or the image
//! records, and hands the result to the external language models for answer
//! synthesis

use std::path::PathBuf;
use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::{DocQaError, EmbeddingError, ParseError};
use crate::index::IndexStore;
use crate::llm::{ChatModel, VisionModel};
use crate::router::{QueryKind, QueryRouter};
use crate::types::{ChatAnswer, ChatTurn, ChunkRecord, ImageAnalysis, ImageRecord};

const ANSWER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based only on the provided context.";

const FOLLOWUP_SYSTEM_PROMPT: &str =
    "Generate relevant follow-up questions based on the context and current question.";

const NO_PAGE_NUMBER_MESSAGE: &str = "No page number found in the query.";
const NO_IMAGES_MESSAGE: &str = "No relevant images found for the page number.";

/// Tunables for the retrieval service, taken from [`crate::config::Config`]
pub struct RetrievalOptions {
    /// Number of nearest chunks retrieved per text query
    pub top_k: usize,
    /// Token budget for synthesized answers
    pub answer_max_tokens: usize,
    /// Token budget for follow-up suggestions
    pub followup_max_tokens: usize,
}

/// Orchestrates query answering over the injected collaborators
///
/// All collaborators are constructed once at process start and shared across
/// requests; the service itself holds no per-request state.
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    vision: Arc<dyn VisionModel>,
    router: QueryRouter,
    index: Arc<IndexStore>,
    images_index_path: PathBuf,
    options: RetrievalOptions,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        vision: Arc<dyn VisionModel>,
        router: QueryRouter,
        index: Arc<IndexStore>,
        images_index_path: PathBuf,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            chat,
            vision,
            router,
            index,
            images_index_path,
            options,
        }
    }

    /// Answer a question, dispatching on its classification
    pub async fn answer(
        &self,
        question: &str,
        chat_context: &[ChatTurn],
    ) -> Result<ChatAnswer, DocQaError> {
        match self.router.classify(question) {
            QueryKind::Image => self.answer_from_images(question).await,
            QueryKind::Text => self.answer_from_index(question, chat_context).await,
        }
    }

    /// Text path: embed the question, retrieve top-k chunks, synthesize
    async fn answer_from_index(
        &self,
        question: &str,
        chat_context: &[ChatTurn],
    ) -> Result<ChatAnswer, DocQaError> {
        let query = vec![question.to_string()];
        let mut vectors = self.embedder.embed_batch(&query).await?;
        let query_vector = vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;

        let hits = self.index.search(&query_vector, self.options.top_k).await?;
        tracing::debug!(hits = hits.len(), "retrieved chunks for text query");

        let mut relevant_pages: Vec<u32> = Vec::new();
        for hit in &hits {
            if !relevant_pages.contains(&hit.page) {
                relevant_pages.push(hit.page);
            }
        }

        let source_chunks: Vec<ChunkRecord> = hits
            .into_iter()
            .map(|hit| ChunkRecord {
                page: hit.page,
                text: hit.text,
            })
            .collect();

        let prompt = answer_prompt(question, chat_context, &source_chunks);
        let message = self
            .chat
            .complete(ANSWER_SYSTEM_PROMPT, &prompt, self.options.answer_max_tokens)
            .await?;

        Ok(ChatAnswer::Text {
            message,
            relevant_pages,
            source_chunks,
        })
    }

    /// Image path: resolve the referenced page and analyze every image on it
    async fn answer_from_images(&self, question: &str) -> Result<ChatAnswer, DocQaError> {
        let Some(page) = self.router.extract_page(question) else {
            return Ok(ChatAnswer::NoMatch {
                message: NO_PAGE_NUMBER_MESSAGE.to_string(),
            });
        };

        let matches: Vec<ImageRecord> = self
            .load_image_records()?
            .into_iter()
            .filter(|record| record.page == page)
            .collect();

        if matches.is_empty() {
            return Ok(ChatAnswer::NoMatch {
                message: NO_IMAGES_MESSAGE.to_string(),
            });
        }

        let prompt = format!("Analyze this image and answer: {question}");
        let mut analyses = Vec::with_capacity(matches.len());
        for record in matches {
            let message = self
                .vision
                .describe_image(std::path::Path::new(&record.file_path), &prompt)
                .await?;
            analyses.push(ImageAnalysis {
                message,
                image_path: record.file_path,
            });
        }

        Ok(ChatAnswer::Image { page, analyses })
    }

    /// Suggest up to three follow-up questions for the current text
    ///
    /// Malformed model output degrades to an empty list instead of failing
    /// the request.
    pub async fn suggest_followups(&self, current_text: &str) -> Result<Vec<String>, DocQaError> {
        let prompt = followup_prompt(current_text);
        let response = self
            .chat
            .complete(
                FOLLOWUP_SYSTEM_PROMPT,
                &prompt,
                self.options.followup_max_tokens,
            )
            .await?;

        match parse_question_list(&response) {
            Ok(mut questions) => {
                questions.truncate(3);
                Ok(questions)
            }
            Err(err) => {
                tracing::debug!(%err, "discarding malformed follow-up response");
                Ok(Vec::new())
            }
        }
    }

    fn load_image_records(&self) -> Result<Vec<ImageRecord>, DocQaError> {
        let raw = match std::fs::read(&self.images_index_path) {
            Ok(raw) => raw,
            // No image index yet means no images, not a failure
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let records = serde_json::from_slice(&raw)
            .map_err(|e| DocQaError::other(format!("corrupt images index: {e}")))?;
        Ok(records)
    }
}

/// Fixed answer-synthesis template: prior turns, retrieved context, question
fn answer_prompt(question: &str, chat_context: &[ChatTurn], chunks: &[ChunkRecord]) -> String {
    let history = chat_context
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n");
    let context = chunks
        .iter()
        .map(|chunk| format!("[p. {}] {}", chunk.page, chunk.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Previous conversation:\n{history}\n\n\
         Relevant passages from the document:\n\
         ---------------------\n{context}\n---------------------\n\n\
         The user asks: {question}\n\n\
         Answer using the passages above where they apply, citing pages in \
         (p. X) format. If the question needs general knowledge beyond the \
         document, you may use it, and say so. If another part of the \
         document would answer better, mention that. Be clear, concise, and \
         accurate."
    )
}

/// Fixed follow-up template: demands a single-line bracketed list
fn followup_prompt(current_text: &str) -> String {
    format!(
        "Based on the context and the current question: \"{current_text}\", \
         suggest 3 relevant follow-up questions that would help explore the \
         topic further. Reply with exactly one line: a bracketed list of 3 \
         quoted questions, nothing else.\n\n\
         Format strictly: ['q1','q2','q3']"
    )
}

/// Strict parser for a bracketed list of quoted strings
///
/// Accepts single- or double-quoted items separated by commas. Anything
/// else is a [`ParseError`]; the input is never evaluated or executed.
pub fn parse_question_list(input: &str) -> Result<Vec<String>, ParseError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::NotAList(snippet(trimmed)))?;

    let mut questions = Vec::new();
    let mut chars = inner.char_indices().peekable();

    loop {
        // Skip whitespace between items
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&(start, quote)) = chars.peek() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(ParseError::MalformedItem(start));
        }
        chars.next();

        let mut item = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
            if c == quote {
                closed = true;
                break;
            }
            item.push(c);
        }
        if !closed {
            return Err(ParseError::MalformedItem(start));
        }
        questions.push(item);

        // After an item: optional whitespace, then a comma or the end
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some((_, ',')) => continue,
            Some((pos, _)) => return Err(ParseError::MalformedItem(pos)),
        }
    }

    Ok(questions)
}

fn snippet(input: &str) -> String {
    input.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_list() {
        let questions =
            parse_question_list("['What is X?','How does Y work?','Why Z?']").unwrap();
        assert_eq!(
            questions,
            vec!["What is X?", "How does Y work?", "Why Z?"]
        );
    }

    #[test]
    fn test_parse_double_quotes_and_spacing() {
        let questions =
            parse_question_list(r#"  [ "a" , 'b','c' ]  "#).unwrap();
        assert_eq!(questions, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_question_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_list() {
        assert!(matches!(
            parse_question_list("Here are three questions: ..."),
            Err(ParseError::NotAList(_))
        ));
        assert!(matches!(
            parse_question_list("['unterminated"),
            Err(ParseError::NotAList(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unquoted_items() {
        assert!(matches!(
            parse_question_list("[question one, question two]"),
            Err(ParseError::MalformedItem(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unterminated_quote() {
        assert!(matches!(
            parse_question_list("['open, 'closed']"),
            Err(ParseError::MalformedItem(_))
        ));
    }

    #[test]
    fn test_parse_never_executes_anything() {
        // Arbitrary code-looking payloads are just strings
        let questions = parse_question_list("['__import__(\"os\")']").unwrap();
        assert_eq!(questions, vec!["__import__(\"os\")"]);
    }

    #[test]
    fn test_answer_prompt_cites_pages() {
        let chunks = vec![ChunkRecord {
            page: 3,
            text: "important passage".to_string(),
        }];
        let prompt = answer_prompt("what matters?", &[], &chunks);
        assert!(prompt.contains("[p. 3] important passage"));
        assert!(prompt.contains("The user asks: what matters?"));
    }
}
