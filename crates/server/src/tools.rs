//! Handlers for the three notebook operations, backed by [`Capabilities`].

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use services::{
    Capabilities,
    services::{extraction::DocumentExtractor, mind_map::GraphRenderer, query::QueryEngine},
};
use tool_client::{
    AnswerPayload, AnswerQuery, AnswerQueryArgs, BuildConceptGraph, BuildConceptGraphArgs,
    ConceptGraphPayload, ProcessDocument, ProcessDocumentArgs, ProcessDocumentPayload,
};
use tracing::info;

use crate::{
    error::RegistryError,
    registry::{Tool, ToolRegistry},
};

pub struct ProcessDocumentTool {
    extractor: Arc<dyn DocumentExtractor>,
}

impl ProcessDocumentTool {
    pub fn new(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Tool for ProcessDocumentTool {
    type Call = ProcessDocument;

    async fn call(&self, args: ProcessDocumentArgs) -> anyhow::Result<ProcessDocumentPayload> {
        let path = Path::new(&args.file_path);
        let Some(extraction) = self.extractor.process(path).await? else {
            info!("[TOOL_HOST] {} could not be processed", path.display());
            return Ok(ProcessDocumentPayload::unprocessable());
        };
        Ok(ProcessDocumentPayload::Processed {
            structured_payload: serde_json::to_value(&extraction.notebook)?,
            raw_text: extraction.raw_text,
        })
    }
}

pub struct BuildConceptGraphTool {
    renderer: Arc<dyn GraphRenderer>,
}

impl BuildConceptGraphTool {
    pub fn new(renderer: Arc<dyn GraphRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for BuildConceptGraphTool {
    type Call = BuildConceptGraph;

    async fn call(&self, args: BuildConceptGraphArgs) -> anyhow::Result<ConceptGraphPayload> {
        let rendered = self.renderer.render(&args.summary, &args.highlights).await?;
        Ok(match rendered {
            Some(path) => ConceptGraphPayload::Rendered {
                artifact_path: path.to_string_lossy().into_owned(),
            },
            None => ConceptGraphPayload::failed(),
        })
    }
}

pub struct AnswerQueryTool {
    engine: Arc<dyn QueryEngine>,
}

impl AnswerQueryTool {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for AnswerQueryTool {
    type Call = AnswerQuery;

    async fn call(&self, args: AnswerQueryArgs) -> anyhow::Result<AnswerPayload> {
        Ok(match self.engine.answer(&args.question).await? {
            Some(answer) => AnswerPayload::Answered { answer },
            None => AnswerPayload::no_answer(),
        })
    }
}

/// All three operations over one set of capabilities.
pub fn default_registry(capabilities: &Capabilities) -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::new()
        .with(ProcessDocumentTool::new(capabilities.extractor.clone()))?
        .with(BuildConceptGraphTool::new(capabilities.renderer.clone()))?
        .with(AnswerQueryTool::new(capabilities.query.clone()))
}
