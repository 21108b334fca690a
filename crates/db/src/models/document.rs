use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;

pub const DEFAULT_EXPORT_LIMIT: i64 = 15;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A finished notebook as handed to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedDocument {
    pub document_name: String,
    pub content: String,
    pub summary: String,
    pub q_and_a: String,
    /// Rendered concept graph (HTML).
    pub mindmap: String,
    pub bullet_points: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: i64,
    pub document_name: String,
    pub content: String,
    pub summary: String,
    pub q_and_a: String,
    pub mindmap: String,
    pub bullet_points: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredDocument> for ManagedDocument {
    fn from(stored: StoredDocument) -> Self {
        Self {
            document_name: stored.document_name,
            content: stored.content,
            summary: stored.summary,
            q_and_a: stored.q_and_a,
            mindmap: stored.mindmap,
            bullet_points: stored.bullet_points,
        }
    }
}

impl ManagedDocument {
    pub async fn create(
        pool: &SqlitePool,
        document: &ManagedDocument,
    ) -> Result<StoredDocument, DocumentError> {
        let stored = sqlx::query_as::<_, StoredDocument>(
            r#"
            INSERT INTO documents (
                document_name, content, summary, q_and_a, mindmap, bullet_points
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(&document.document_name)
        .bind(&document.content)
        .bind(&document.summary)
        .bind(&document.q_and_a)
        .bind(&document.mindmap)
        .bind(&document.bullet_points)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            "[DB] Stored document '{}' as #{}",
            stored.document_name,
            stored.id
        );
        Ok(stored)
    }

    /// Insert several documents in one transaction.
    pub async fn create_many(
        pool: &SqlitePool,
        documents: &[ManagedDocument],
    ) -> Result<Vec<StoredDocument>, DocumentError> {
        let mut tx = pool.begin().await?;
        let mut stored = Vec::with_capacity(documents.len());
        for document in documents {
            let row = sqlx::query_as::<_, StoredDocument>(
                r#"
                INSERT INTO documents (
                    document_name, content, summary, q_and_a, mindmap, bullet_points
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING *
                "#,
            )
            .bind(&document.document_name)
            .bind(&document.content)
            .bind(&document.summary)
            .bind(&document.q_and_a)
            .bind(&document.mindmap)
            .bind(&document.bullet_points)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }
        tx.commit().await?;
        Ok(stored)
    }

    /// Most recent documents first, `DEFAULT_EXPORT_LIMIT` when no limit is given.
    pub async fn find_recent(
        pool: &SqlitePool,
        limit: Option<i64>,
    ) -> Result<Vec<StoredDocument>, DocumentError> {
        let documents = sqlx::query_as::<_, StoredDocument>(
            r#"
            SELECT * FROM documents
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit.unwrap_or(DEFAULT_EXPORT_LIMIT))
        .fetch_all(pool)
        .await?;

        Ok(documents)
    }

    pub async fn find_names(pool: &SqlitePool) -> Result<Vec<String>, DocumentError> {
        let names = sqlx::query_scalar::<_, String>(
            r#"SELECT document_name FROM documents ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    fn sample(name: &str) -> ManagedDocument {
        ManagedDocument {
            document_name: name.to_string(),
            content: "## Summary\n\nThe sky is blue.".to_string(),
            summary: "The sky is blue.".to_string(),
            q_and_a: "### Why?\n\nScattering.".to_string(),
            mindmap: "<html></html>".to_string(),
            bullet_points: "- sky is blue".to_string(),
        }
    }

    #[tokio::test]
    async fn stores_and_exports_documents() {
        let db = DBService::in_memory().await.unwrap();

        let stored = ManagedDocument::create(&db.pool, &sample("sky")).await.unwrap();
        assert_eq!(stored.document_name, "sky");
        assert!(stored.id > 0);

        let exported = ManagedDocument::find_recent(&db.pool, None).await.unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(ManagedDocument::from(exported[0].clone()), sample("sky"));
    }

    #[tokio::test]
    async fn export_is_limited_and_newest_first() {
        let db = DBService::in_memory().await.unwrap();
        let batch: Vec<_> = (0..20).map(|i| sample(&format!("doc-{i}"))).collect();
        ManagedDocument::create_many(&db.pool, &batch).await.unwrap();

        let exported = ManagedDocument::find_recent(&db.pool, None).await.unwrap();
        assert_eq!(exported.len(), DEFAULT_EXPORT_LIMIT as usize);
        assert_eq!(exported[0].document_name, "doc-19");

        let names = ManagedDocument::find_names(&db.pool).await.unwrap();
        assert_eq!(names.len(), 20);
        db.disconnect().await;
    }
}
