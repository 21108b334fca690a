//! Capability providers behind the tool host: document extraction, concept
//! graph rendering, question answering, speech and claim verification.
//!
//! Every provider has an LLM-backed implementation and a deterministic
//! heuristic fallback. [`Capabilities::from_config`] picks between them.

use std::{path::PathBuf, sync::Arc};

pub mod services;

use services::{
    corpus::DocumentCorpus,
    extraction::{DocumentExtractor, HeuristicExtractor, LlmExtractor},
    llm::{LlmClient, LlmConfig},
    mind_map::{ConceptGraphRenderer, GraphRenderer, HeuristicMindMapBuilder, LlmMindMapBuilder},
    query::{CorpusQueryEngine, QueryEngine},
    speech::SpeechConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub llm: Option<LlmConfig>,
    pub speech: Option<SpeechConfig>,
    pub artifact_dir: PathBuf,
}

impl ServicesConfig {
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self {
            llm: None,
            speech: None,
            artifact_dir,
        }
    }

    pub fn from_env() -> std::io::Result<Self> {
        Ok(Self {
            llm: LlmConfig::from_env(),
            speech: SpeechConfig::from_env(),
            artifact_dir: utils::assets::artifact_dir()?,
        })
    }

    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = Some(llm);
        self
    }
}

/// The providers a tool host serves, sharing one corpus.
#[derive(Clone)]
pub struct Capabilities {
    pub corpus: DocumentCorpus,
    pub llm: Option<LlmClient>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub renderer: Arc<dyn GraphRenderer>,
    pub query: Arc<dyn QueryEngine>,
}

impl Capabilities {
    pub fn from_config(config: &ServicesConfig) -> Self {
        let corpus = DocumentCorpus::new();
        let llm = config.llm.clone().map(LlmClient::new);

        let (extractor, renderer): (Arc<dyn DocumentExtractor>, Arc<dyn GraphRenderer>) =
            match &llm {
                Some(client) => (
                    Arc::new(LlmExtractor::new(client.clone(), corpus.clone())),
                    Arc::new(ConceptGraphRenderer::new(
                        Arc::new(LlmMindMapBuilder::new(client.clone())),
                        config.artifact_dir.clone(),
                    )),
                ),
                None => {
                    tracing::warn!(
                        "[SERVICES] OPENAI_API_KEY not set, using heuristic providers"
                    );
                    (
                        Arc::new(HeuristicExtractor::new(corpus.clone())),
                        Arc::new(ConceptGraphRenderer::new(
                            Arc::new(HeuristicMindMapBuilder),
                            config.artifact_dir.clone(),
                        )),
                    )
                }
            };
        let query = Arc::new(CorpusQueryEngine::new(corpus.clone(), llm.clone()));

        Self {
            corpus,
            llm,
            extractor,
            renderer,
            query,
        }
    }

    /// Heuristic providers only, writing artifacts under `artifact_dir`.
    pub fn heuristic(artifact_dir: PathBuf) -> Self {
        Self::from_config(&ServicesConfig::new(artifact_dir))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn GraphRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}
