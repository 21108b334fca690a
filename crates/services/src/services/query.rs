//! Question answering over the indexed documents.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::{
    corpus::{DocumentCorpus, ScoredPassage},
    llm::LlmClient,
    text::{keywords, split_sentences},
};
use crate::ServiceError;

const DEFAULT_TOP_K: usize = 3;
const NO_ANSWER_MARKER: &str = "NO_ANSWER";

/// `Ok(None)` means the indexed material does not answer the question.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn answer(&self, question: &str) -> Result<Option<String>, ServiceError>;
}

pub struct CorpusQueryEngine {
    corpus: DocumentCorpus,
    llm: Option<LlmClient>,
    top_k: usize,
}

impl CorpusQueryEngine {
    pub fn new(corpus: DocumentCorpus, llm: Option<LlmClient>) -> Self {
        Self {
            corpus,
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    async fn synthesize(
        &self,
        llm: &LlmClient,
        question: &str,
        hits: &[ScoredPassage],
    ) -> Result<Option<String>, ServiceError> {
        let sources = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("Source {}:\n{}", i + 1, hit.passage.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let system = format!(
            "Answer the question using only the numbered sources. \
             If they do not contain the answer, reply with exactly {}.",
            NO_ANSWER_MARKER
        );
        let reply = llm
            .complete(&system, &format!("{}\n\nQuestion: {}", sources, question), false)
            .await?;
        let reply = reply.trim();
        Ok((!reply.is_empty() && reply != NO_ANSWER_MARKER).then(|| reply.to_string()))
    }
}

/// The sentence of the best passage that shares most terms with the question.
fn extractive_answer(question: &str, hits: &[ScoredPassage]) -> Option<String> {
    let query: HashSet<String> = keywords(question).into_iter().collect();
    let best = hits.first()?;
    split_sentences(&best.passage.text)
        .into_iter()
        .map(|s| {
            let overlap = keywords(&s).iter().filter(|w| query.contains(*w)).count();
            (overlap, s)
        })
        .filter(|(overlap, _)| *overlap > 0)
        .max_by_key(|(overlap, _)| *overlap)
        .map(|(_, s)| s)
}

pub fn format_answer(answer: &str, sources: &[String]) -> String {
    format!(
        "## Answer\n\n{}\n\n## Sources\n\n- {}",
        answer,
        sources.join("\n- ")
    )
}

#[async_trait]
impl QueryEngine for CorpusQueryEngine {
    async fn answer(&self, question: &str) -> Result<Option<String>, ServiceError> {
        let hits = self.corpus.search(question, self.top_k).await;
        debug!("[QUERY] {} passages match '{}'", hits.len(), question);
        if hits.is_empty() {
            return Ok(None);
        }

        let answer = match &self.llm {
            Some(llm) => self.synthesize(llm, question, &hits).await?,
            None => extractive_answer(question, &hits),
        };
        Ok(answer.map(|answer| {
            let sources: Vec<String> = hits.into_iter().map(|h| h.passage.text).collect();
            format_answer(&answer, &sources)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine() -> CorpusQueryEngine {
        let corpus = DocumentCorpus::new();
        corpus
            .add_document(
                "/library/plants.txt",
                "plants.txt",
                "Plants convert sunlight into energy. Chlorophyll absorbs red and blue light.",
            )
            .await;
        CorpusQueryEngine::new(corpus, None)
    }

    #[tokio::test]
    async fn answers_with_sources() {
        let answer = engine()
            .await
            .answer("What does chlorophyll absorb?")
            .await
            .unwrap()
            .unwrap();
        assert!(answer.starts_with("## Answer\n\nChlorophyll absorbs red and blue light."));
        assert!(answer.contains("\n\n## Sources\n\n- Plants convert sunlight"));
    }

    #[tokio::test]
    async fn unrelated_question_has_no_answer() {
        let answer = engine().await.answer("Who won the 1998 world cup?").await.unwrap();
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn empty_corpus_has_no_answer() {
        let engine = CorpusQueryEngine::new(DocumentCorpus::new(), None);
        assert!(engine.answer("anything at all?").await.unwrap().is_none());
    }

    #[test]
    fn answer_format_lists_every_source() {
        let text = format_answer("Blue.", &["a".to_string(), "b".to_string()]);
        assert_eq!(text, "## Answer\n\nBlue.\n\n## Sources\n\n- a\n- b");
    }
}
