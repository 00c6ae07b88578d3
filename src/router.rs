//! Query routing: decide whether a question is answered from the text index
//! or from extracted page images

use regex::Regex;

/// How a question should be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Answer by analyzing extracted page images
    Image,
    /// Answer by searching the vector index
    Text,
}

/// Stateless classifier over raw question strings
///
/// Both patterns are compiled once at startup; classification is a pure
/// function of the input.
pub struct QueryRouter {
    image_terms: Regex,
    page_pattern: Regex,
}

impl QueryRouter {
    pub fn new() -> Result<Self, regex::Error> {
        let image_terms = Regex::new(
            r"(?i)image|picture|figure|diagram|photo|illustration|what does .* show|what is shown|what appears|what can you see",
        )?;
        let page_pattern = Regex::new(r"(?i)\b(?:page|on page)\s*(\d+)\b")?;
        Ok(Self {
            image_terms,
            page_pattern,
        })
    }

    /// Classify a question as image-driven or text-retrieval-driven
    pub fn classify(&self, question: &str) -> QueryKind {
        if self.image_terms.is_match(question) {
            QueryKind::Image
        } else {
            QueryKind::Text
        }
    }

    /// Extract a referenced page number ("page 3", "on page 12")
    pub fn extract_page(&self, question: &str) -> Option<u32> {
        self.page_pattern
            .captures(question)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse().ok())
    }
}
