//! Hand-off from a finished run to document storage.

use db::{DBService, ManagedDocument, StoredDocument};

use crate::{events::NotebookOutput, models::Notebook, Result};

impl NotebookOutput {
    /// Consume the output: the graph artifact is read into the record and
    /// deleted from disk.
    pub async fn into_document(self, title: &str) -> Result<ManagedDocument> {
        let notebook = Notebook {
            summary: self.summary,
            highlights: self.highlights,
            questions: self.questions,
            answers: self.answers,
        };
        let mindmap = self.graph_artifact.read_to_string_and_release().await?;

        Ok(ManagedDocument {
            document_name: title.to_string(),
            content: self.content,
            q_and_a: notebook.faq_markdown(),
            bullet_points: notebook.highlights_markdown(),
            summary: notebook.summary,
            mindmap,
        })
    }
}

/// Persist a finished notebook under `title`.
pub async fn save_output(
    db: &DBService,
    title: &str,
    output: NotebookOutput,
) -> Result<StoredDocument> {
    let document = output.into_document(title).await?;
    Ok(ManagedDocument::create(&db.pool, &document).await?)
}

#[cfg(test)]
mod tests {
    use utils::ephemeral::OwnedArtifact;

    use super::*;

    fn output_with_graph(dir: &std::path::Path) -> (NotebookOutput, std::path::PathBuf) {
        let path = dir.join("graph.html");
        std::fs::write(&path, "<html><body>sky graph</body></html>").unwrap();
        let notebook = Notebook {
            summary: "The sky is blue.".to_string(),
            highlights: vec!["sky is blue".to_string(), "light scatters".to_string()],
            questions: vec!["Why is the sky blue?".to_string()],
            answers: vec!["Rayleigh scattering.".to_string()],
        };
        let output = NotebookOutput {
            graph_artifact: OwnedArtifact::adopt(&path),
            content: notebook.to_markdown(),
            summary: notebook.summary.clone(),
            highlights: notebook.highlights.clone(),
            questions: notebook.questions.clone(),
            answers: notebook.answers.clone(),
        };
        (output, path)
    }

    #[tokio::test]
    async fn saving_reads_the_graph_into_the_record_and_deletes_it() {
        let dir = tempfile::tempdir().unwrap();
        let (output, graph_path) = output_with_graph(dir.path());
        let expected = Notebook {
            summary: output.summary.clone(),
            highlights: output.highlights.clone(),
            questions: output.questions.clone(),
            answers: output.answers.clone(),
        };
        let db = DBService::in_memory().await.unwrap();

        let stored = save_output(&db, "Sky notes", output).await.unwrap();

        assert!(!graph_path.exists());
        assert_eq!(stored.document_name, "Sky notes");
        assert_eq!(stored.mindmap, "<html><body>sky graph</body></html>");
        assert_eq!(stored.summary, "The sky is blue.");
        assert_eq!(stored.q_and_a, expected.faq_markdown());
        assert_eq!(stored.bullet_points, expected.highlights_markdown());
        assert_eq!(stored.content, expected.to_markdown());

        let recent = ManagedDocument::find_recent(&db.pool, None).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, stored.id);
        db.disconnect().await;
    }

    #[tokio::test]
    async fn missing_artifact_is_an_error_and_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (output, graph_path) = output_with_graph(dir.path());
        std::fs::remove_file(&graph_path).unwrap();
        let db = DBService::in_memory().await.unwrap();

        assert!(save_output(&db, "Gone", output).await.is_err());
        assert!(ManagedDocument::find_names(&db.pool).await.unwrap().is_empty());
    }
}
