//! Markdown pipe tables pulled out of a document and written as CSV.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use utils::ephemeral::{EphemeralFile, OwnedArtifact};

use super::extraction::read_text;
use crate::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn to_csv(&self) -> Result<Vec<u8>, ServiceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| ServiceError::Io(e.into_error()))
    }
}

/// A table and the CSV file holding it. The file is deleted when the
/// artifact is dropped unless the caller persists it.
#[derive(Debug)]
pub struct ExtractedTable {
    pub table: MarkdownTable,
    pub csv: OwnedArtifact,
}

fn cells(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if !line.contains('|') {
        return None;
    }
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    Some(inner.split('|').map(|c| c.trim().to_string()).collect())
}

fn is_delimiter(row: &[String]) -> bool {
    row.iter().all(|cell| {
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        !dashes.is_empty() && dashes.chars().all(|c| c == '-')
    })
}

/// Every well-formed pipe table in `text`. A table whose rows do not match
/// the header width is skipped.
pub fn find_tables(text: &str) -> Vec<MarkdownTable> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tables = Vec::new();
    let mut i = 0;

    while i + 1 < lines.len() {
        let (Some(header), Some(delimiter)) = (cells(lines[i]), cells(lines[i + 1])) else {
            i += 1;
            continue;
        };
        if delimiter.len() != header.len() || !is_delimiter(&delimiter) {
            i += 1;
            continue;
        }

        let mut rows = Vec::new();
        let mut j = i + 2;
        while let Some(row) = lines.get(j).and_then(|line| cells(line)) {
            rows.push(row);
            j += 1;
        }

        if rows.iter().all(|row| row.len() == header.len()) {
            tables.push(MarkdownTable { header, rows });
        } else {
            warn!("[TABLES] Skipping table at line {}: ragged rows", i + 1);
        }
        i = j;
    }
    tables
}

pub struct TableExtractor {
    artifact_dir: PathBuf,
}

impl TableExtractor {
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self { artifact_dir }
    }

    /// Tables in the document at `path`, each written to its own CSV file
    /// under the artifact directory. Unreadable documents have no tables.
    pub async fn extract(&self, path: &Path) -> Result<Vec<ExtractedTable>, ServiceError> {
        let Some(text) = read_text(path).await? else {
            return Ok(Vec::new());
        };

        let mut extracted = Vec::new();
        for table in find_tables(&text) {
            let file = EphemeralFile::create_in(&self.artifact_dir, "table-", ".csv")?;
            file.write(table.to_csv()?).await?;
            debug!(
                "[TABLES] {} columns x {} rows -> {}",
                table.header.len(),
                table.rows.len(),
                file.path().display()
            );
            extracted.push(ExtractedTable {
                table,
                csv: file.into_artifact(),
            });
        }
        info!(
            "[TABLES] Found {} tables in {}",
            extracted.len(),
            path.display()
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
# Quarterly report

Sales grew.

| Region | Units | Note |
|:-------|------:|------|
| North  | 120   | steady |
| South  | 95    | \"new\", promo |

Closing words.

| a | b |
|---|---|
| 1 |
";

    #[test]
    fn finds_pipe_tables_and_skips_ragged_ones() {
        let tables = find_tables(REPORT);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec!["Region", "Units", "Note"]);
        assert_eq!(
            tables[0].rows,
            vec![
                vec!["North", "120", "steady"],
                vec!["South", "95", "\"new\", promo"],
            ]
        );
    }

    #[test]
    fn prose_with_pipes_is_not_a_table() {
        assert!(find_tables("either | or\nthis | that\n").is_empty());
    }

    #[test]
    fn csv_quotes_commas_and_quotes() {
        let table = find_tables(REPORT).remove(0);
        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(
            csv,
            "Region,Units,Note\nNorth,120,steady\nSouth,95,\"\"\"new\"\", promo\"\n"
        );
    }

    #[tokio::test]
    async fn csv_artifacts_live_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("report.md");
        std::fs::write(&doc, REPORT).unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let extractor = TableExtractor::new(artifacts.path().to_path_buf());

        let mut tables = extractor.extract(&doc).await.unwrap();
        assert_eq!(tables.len(), 1);
        let first = tables.remove(0);
        assert!(first.csv.exists());
        assert_eq!(first.csv.path().extension().unwrap(), "csv");
        let csv_path = first.csv.path().to_path_buf();

        drop(first);
        assert!(!csv_path.exists());
    }

    #[tokio::test]
    async fn binary_documents_have_no_tables() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("scan.pdf");
        std::fs::write(&doc, [0x25, 0x50, 0x00, 0x01]).unwrap();
        let extractor = TableExtractor::new(dir.path().to_path_buf());
        assert!(extractor.extract(&doc).await.unwrap().is_empty());
    }
}
