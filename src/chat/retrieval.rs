//! Document context retrieval for chat.
//!
//! The bundled retriever does keyword scoring over categorized documents'
//! extracted text. Vector or hybrid search belongs to a collaborator behind
//! the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::models::DocumentStatus;
use crate::repository::{DocumentFilter, DocumentRepository};

/// Maximum snippets returned per query.
const MAX_SNIPPETS: usize = 3;

/// Characters of text around the first match included in a snippet.
const SNIPPET_CONTEXT: usize = 240;

/// Fetches context snippets relevant to a question.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<String>>;
}

/// Term-overlap retriever over the document repository.
pub struct KeywordRetriever {
    repo: Arc<dyn DocumentRepository>,
    term_re: Regex,
}

impl KeywordRetriever {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repo,
            term_re: Regex::new(r"[\p{Alphabetic}\d]{3,}").expect("static regex"),
        }
    }

    fn terms(&self, query: &str) -> Vec<String> {
        self.term_re
            .find_iter(&query.to_lowercase())
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl ContextRetriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let terms = self.terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self
            .repo
            .list(&DocumentFilter {
                status: Some(DocumentStatus::Categorized),
                ..Default::default()
            })
            .await?;

        let mut scored: Vec<(usize, String)> = Vec::new();
        for doc in &docs {
            let Some(extraction) = &doc.extraction else {
                continue;
            };
            let text = extraction.text.to_lowercase();
            let score: usize = terms.iter().map(|t| text.matches(t.as_str()).count()).sum();
            if score == 0 {
                continue;
            }

            // Snippet around the first matching term.
            let start = terms
                .iter()
                .filter_map(|t| text.find(t.as_str()))
                .min()
                .unwrap_or(0);
            let snippet = snippet_around(&extraction.text, start);
            scored.push((score, format!("{}: {}", doc.name, snippet)));
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(MAX_SNIPPETS)
            .map(|(_, s)| s)
            .collect())
    }
}

/// Cut a readable window out of the text around a match position.
///
/// The position comes from a lowercased copy, so it is clamped and aligned
/// to a char boundary before slicing the original.
fn snippet_around(text: &str, match_start: usize) -> String {
    let mut start = match_start
        .saturating_sub(SNIPPET_CONTEXT / 4)
        .min(text.len());
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let window: String = text[start..].chars().take(SNIPPET_CONTEXT).collect();
    window.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessLevel, Document, Extraction};
    use crate::repository::MemoryDocumentRepository;
    use chrono::Utc;
    use std::collections::HashMap;

    async fn seeded_repo() -> Arc<MemoryDocumentRepository> {
        let repo = Arc::new(MemoryDocumentRepository::new());
        for (id, name, text) in [
            (
                "1",
                "Employment_Offer.pdf",
                "The notice period for termination is thirty days as agreed.",
            ),
            ("2", "Lease.pdf", "The premises are leased for two years."),
        ] {
            let mut doc = Document::new(
                id.into(),
                name.into(),
                "application/pdf".into(),
                1000,
                "hr".into(),
                AccessLevel::Admin,
            );
            doc.status = DocumentStatus::Categorized;
            doc.extraction = Some(Extraction {
                text: text.into(),
                fields: HashMap::new(),
                confidence: 0.95,
                extracted_at: Utc::now(),
            });
            repo.save(&doc).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_retrieves_matching_document() {
        let retriever = KeywordRetriever::new(seeded_repo().await);
        let snippets = retriever.retrieve("What is the notice period?").await.unwrap();
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].starts_with("Employment_Offer.pdf:"));
        assert!(snippets[0].contains("notice period"));
    }

    #[tokio::test]
    async fn test_no_terms_no_lookup() {
        let retriever = KeywordRetriever::new(seeded_repo().await);
        let snippets = retriever.retrieve("a an?!").await.unwrap();
        assert!(snippets.is_empty());
    }
}
