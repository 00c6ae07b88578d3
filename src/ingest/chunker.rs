/// Token-bounded text chunking
///
/// Chunk boundaries are purely token-count-based; a chunk may split
/// mid-sentence. Tokens are whitespace-delimited words of the cleaned text,
/// so joining a chunk's tokens with single spaces loses nothing relative to
/// the cleaned input.

/// Normalize raw page text before chunking: drop characters outside
/// printable ASCII, collapse whitespace runs to single spaces, and trim.
pub fn clean_text(text: &str) -> String {
    let ascii: String = text.chars().filter(|&c| (' '..='~').contains(&c)).collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits cleaned text into chunks of at most `max_tokens` tokens
pub struct TokenChunker {
    max_tokens: usize,
}

impl TokenChunker {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Chunk one page of text
    ///
    /// Returns chunks in source order, each at most `max_tokens` tokens,
    /// covering the cleaned input with no overlap and no loss. Empty or
    /// whitespace-only input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Vec::new();
        }

        let tokens: Vec<&str> = cleaned.split(' ').collect();
        tokens
            .chunks(self.max_tokens)
            .map(|window| window.join(" "))
            .collect()
    }
}
