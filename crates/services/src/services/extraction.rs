//! Turns an uploaded document into a [`Notebook`] and its raw text.

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use notebook::{models::MIN_HIGHLIGHTS, Notebook};
use tracing::{info, warn};

use super::{
    corpus::DocumentCorpus,
    llm::LlmClient,
    text::{keywords, split_sentences},
};
use crate::ServiceError;

const SUMMARY_SENTENCES: usize = 3;
const MAX_HIGHLIGHTS: usize = 5;

const EXTRACTION_INSTRUCTIONS: &str = "You read documents and produce study notes. \
Write a concise summary, at least three highlights quoting or paraphrasing the key points, \
and a list of questions a reader might ask with their answers taken from the document. \
`questions` and `answers` must have the same length and be paired by index.";

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub notebook: Notebook,
    pub raw_text: String,
}

/// `Ok(None)` means the document was read but nothing usable came out.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn process(&self, path: &Path) -> Result<Option<Extraction>, ServiceError>;
}

/// Document text, or `None` for empty and binary files.
pub async fn read_text(path: &Path) -> Result<Option<String>, ServiceError> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.contains(&0) {
        warn!("[EXTRACT] {} looks binary, skipping", path.display());
        return Ok(None);
    }
    match String::from_utf8(bytes) {
        Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
        Ok(_) => Ok(None),
        Err(_) => {
            warn!("[EXTRACT] {} is not valid UTF-8", path.display());
            Ok(None)
        }
    }
}

/// Corpus key and display label. Keys are full paths so equal file names in
/// different directories stay separate documents.
fn source_of(path: &Path) -> (String, String) {
    let key = path.display().to_string();
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.clone());
    (key, label)
}

/// Sentence scoring over keyword frequency. No network access.
pub struct HeuristicExtractor {
    corpus: DocumentCorpus,
}

impl HeuristicExtractor {
    pub fn new(corpus: DocumentCorpus) -> Self {
        Self { corpus }
    }

    pub fn notebook_for(text: &str) -> Option<Notebook> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return None;
        }

        let mut frequency: HashMap<String, usize> = HashMap::new();
        for word in keywords(text) {
            *frequency.entry(word).or_default() += 1;
        }

        let summary = sentences
            .iter()
            .take(SUMMARY_SENTENCES)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        let mut ranked: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| {
                let score = keywords(sentence)
                    .iter()
                    .filter_map(|w| frequency.get(w))
                    .sum();
                (score, i)
            })
            .collect();
        ranked.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let mut picked: Vec<usize> = ranked.iter().take(MAX_HIGHLIGHTS).map(|(_, i)| *i).collect();
        picked.sort_unstable();
        let key_sentences: Vec<String> = picked.iter().map(|i| sentences[*i].clone()).collect();

        let mut terms: Vec<(String, usize)> = frequency.into_iter().collect();
        terms.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut questions = Vec::new();
        let mut answers = Vec::new();
        for sentence in &key_sentences {
            if let Some(topic) = keywords(sentence).into_iter().next() {
                questions.push(format!("What does the document say about {}?", topic));
                answers.push(sentence.clone());
            }
        }

        let mut highlights = key_sentences;
        for (term, _) in &terms {
            if highlights.len() >= MIN_HIGHLIGHTS {
                break;
            }
            highlights.push(format!("Key term: {}", term));
        }

        let notebook = Notebook {
            summary,
            highlights,
            questions,
            answers,
        };
        notebook.validate().ok().map(|_| notebook)
    }
}

#[async_trait]
impl DocumentExtractor for HeuristicExtractor {
    async fn process(&self, path: &Path) -> Result<Option<Extraction>, ServiceError> {
        let Some(text) = read_text(path).await? else {
            return Ok(None);
        };
        let (notebook, text) =
            tokio::task::spawn_blocking(move || (Self::notebook_for(&text), text)).await?;
        let Some(notebook) = notebook else {
            info!("[EXTRACT] Not enough content in {}", path.display());
            return Ok(None);
        };
        let (key, label) = source_of(path);
        self.corpus.add_document(&key, &label, &text).await;
        Ok(Some(Extraction {
            notebook,
            raw_text: text,
        }))
    }
}

pub struct LlmExtractor {
    llm: LlmClient,
    corpus: DocumentCorpus,
}

impl LlmExtractor {
    pub fn new(llm: LlmClient, corpus: DocumentCorpus) -> Self {
        Self { llm, corpus }
    }
}

#[async_trait]
impl DocumentExtractor for LlmExtractor {
    async fn process(&self, path: &Path) -> Result<Option<Extraction>, ServiceError> {
        let Some(text) = read_text(path).await? else {
            return Ok(None);
        };
        let notebook: Notebook = match self.llm.complete_json(EXTRACTION_INSTRUCTIONS, &text).await
        {
            Ok(notebook) => notebook,
            Err(ServiceError::Json(e)) => {
                warn!("[EXTRACT] Model returned an unusable notebook: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = notebook.validate() {
            warn!("[EXTRACT] Rejected notebook for {}: {}", path.display(), e);
            return Ok(None);
        }
        let (key, label) = source_of(path);
        self.corpus.add_document(&key, &label, &text).await;
        Ok(Some(Extraction {
            notebook,
            raw_text: text,
        }))
    }
}
