//! Concept graphs: build a [`MindMap`] from a summary and highlights, then
//! render it as a standalone HTML page.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use notebook::models::{MindMap, MindMapEdge, MindMapNode};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{llm::LlmClient, text::truncate_words};
use crate::ServiceError;

const NODE_WORDS: usize = 5;
const ROOT_ID: &str = "root";

const MIND_MAP_INSTRUCTIONS: &str = "You draw mind maps. Produce nodes with short ids and concise \
content of no more than five words, and directed edges between existing node ids. \
The first node should capture the document as a whole.";

#[async_trait]
pub trait MindMapBuilder: Send + Sync {
    async fn build(&self, summary: &str, highlights: &[String]) -> Result<MindMap, ServiceError>;
}

/// A root node for the summary with one child per highlight.
pub struct HeuristicMindMapBuilder;

#[async_trait]
impl MindMapBuilder for HeuristicMindMapBuilder {
    async fn build(&self, summary: &str, highlights: &[String]) -> Result<MindMap, ServiceError> {
        let mut nodes = vec![MindMapNode {
            id: ROOT_ID.to_string(),
            content: truncate_words(summary, NODE_WORDS),
        }];
        let mut edges = Vec::with_capacity(highlights.len());
        for (i, highlight) in highlights.iter().enumerate() {
            let id = format!("h{}", i + 1);
            nodes.push(MindMapNode {
                id: id.clone(),
                content: truncate_words(highlight, NODE_WORDS),
            });
            edges.push(MindMapEdge {
                from_id: ROOT_ID.to_string(),
                to_id: id,
            });
        }
        Ok(MindMap { nodes, edges })
    }
}

pub struct LlmMindMapBuilder {
    llm: LlmClient,
}

impl LlmMindMapBuilder {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl MindMapBuilder for LlmMindMapBuilder {
    async fn build(&self, summary: &str, highlights: &[String]) -> Result<MindMap, ServiceError> {
        let user = format!(
            "This is the summary for my document: {}\n\nAnd these are the key points:\n- {}",
            summary,
            highlights.join("\n- ")
        );
        self.llm.complete_json(MIND_MAP_INSTRUCTIONS, &user).await
    }
}

/// Produces a graph artifact. `Ok(None)` means no graph could be built.
#[async_trait]
pub trait GraphRenderer: Send + Sync {
    async fn render(
        &self,
        summary: &str,
        highlights: &[String],
    ) -> Result<Option<PathBuf>, ServiceError>;
}

pub struct ConceptGraphRenderer {
    builder: Arc<dyn MindMapBuilder>,
    artifact_dir: PathBuf,
}

impl ConceptGraphRenderer {
    pub fn new(builder: Arc<dyn MindMapBuilder>, artifact_dir: PathBuf) -> Self {
        Self {
            builder,
            artifact_dir,
        }
    }
}

#[async_trait]
impl GraphRenderer for ConceptGraphRenderer {
    async fn render(
        &self,
        summary: &str,
        highlights: &[String],
    ) -> Result<Option<PathBuf>, ServiceError> {
        let map = match self.builder.build(summary, highlights).await {
            Ok(map) => map,
            Err(e) => {
                warn!("[MIND_MAP] Building the mind map failed: {}", e);
                return Ok(None);
            }
        };
        if let Err(e) = map.validate() {
            warn!("[MIND_MAP] Discarding invalid mind map: {}", e);
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.artifact_dir).await?;
        let path = self.artifact_dir.join(format!("{}.html", Uuid::new_v4()));
        tokio::fs::write(&path, render_html(&map)).await?;
        info!(
            "[MIND_MAP] Rendered {} nodes, {} edges to {}",
            map.nodes.len(),
            map.edges.len(),
            path.display()
        );
        Ok(Some(path))
    }
}

/// Self-contained vis-network page. Directed edges, physics disabled.
pub fn render_html(map: &MindMap) -> String {
    let nodes: Vec<_> = map
        .nodes
        .iter()
        .map(|n| json!({"id": n.id, "label": n.content, "shape": "dot", "size": 10}))
        .collect();
    let edges: Vec<_> = map
        .edges
        .iter()
        .map(|e| json!({"from": e.from_id, "to": e.to_id, "arrows": "to"}))
        .collect();
    // Labels are model output; keep them from closing the script element.
    let script_json = |value: &serde_json::Value| value.to_string().replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<script src="https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js"></script>
<style>#mynetwork {{ width: 100%; height: 750px; border: 1px solid lightgray; }}</style>
</head>
<body>
<div id="mynetwork"></div>
<script type="text/javascript">
  var nodes = new vis.DataSet({nodes});
  var edges = new vis.DataSet({edges});
  var options = {{"physics": {{"enabled": false}}, "edges": {{"arrows": {{"to": {{"enabled": true}}}}}}}};
  new vis.Network(document.getElementById("mynetwork"), {{nodes: nodes, edges: edges}}, options);
</script>
</body>
</html>
"#,
        nodes = script_json(&json!(nodes)),
        edges = script_json(&json!(edges)),
    )
}
