//! In-process index of processed documents, searched by answer-query.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::RwLock;

use super::text::{chunk_text, keywords};

const CHUNK_CHARS: usize = 800;

#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub source: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub score: f32,
    pub passage: Passage,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    key: String,
    passage: Passage,
    terms: HashSet<String>,
}

/// Shared, cloneable handle. Clones see the same documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentCorpus {
    chunks: Arc<RwLock<Vec<IndexedChunk>>>,
}

impl DocumentCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `text` under `key`, shown to readers as `label`. Re-adding a key
    /// replaces its chunks.
    pub async fn add_document(&self, key: &str, label: &str, text: &str) -> usize {
        let new_chunks: Vec<IndexedChunk> = chunk_text(text, CHUNK_CHARS)
            .into_iter()
            .map(|chunk| IndexedChunk {
                key: key.to_string(),
                terms: keywords(&chunk).into_iter().collect(),
                passage: Passage {
                    source: label.to_string(),
                    text: chunk,
                },
            })
            .collect();
        let added = new_chunks.len();

        let mut chunks = self.chunks.write().await;
        chunks.retain(|c| c.key != key);
        chunks.extend(new_chunks);
        tracing::debug!("[CORPUS] Indexed {} chunks from {}", added, key);
        added
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    /// Passages sharing terms with `question`, best first.
    pub async fn search(&self, question: &str, limit: usize) -> Vec<ScoredPassage> {
        let query: HashSet<String> = keywords(question).into_iter().collect();
        if query.is_empty() {
            return Vec::new();
        }

        let chunks = self.chunks.read().await;
        let mut hits: Vec<ScoredPassage> = chunks
            .iter()
            .filter_map(|chunk| {
                let shared = query.intersection(&chunk.terms).count();
                (shared > 0).then(|| ScoredPassage {
                    score: shared as f32 / query.len() as f32,
                    passage: chunk.passage.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}
