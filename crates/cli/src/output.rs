//! Terminal rendering

use colored::Colorize;
use db::StoredDocument;
use services::services::tables::MarkdownTable;
use notebook::{workflow::RunProgress, ClaimVerification, NotebookOutput};

pub fn step(message: &str) {
    println!("{} {}", "→".bright_cyan(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".bright_green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".bright_yellow(), message);
}

/// One status line per run transition.
pub fn progress(event: &RunProgress) {
    match event {
        RunProgress::Started { .. } => {}
        RunProgress::StepStarted { step, .. } => {
            println!("  {} {}", "…".dimmed(), step.replace('_', " "));
        }
        RunProgress::StepCompleted {
            step, duration_ms, ..
        } => {
            println!(
                "  {} {} {}",
                "✓".green(),
                step.replace('_', " "),
                format!("({}ms)", duration_ms).dimmed()
            );
        }
        RunProgress::Retrying {
            step,
            error,
            delay_ms,
            ..
        } => {
            println!(
                "  {} {} failed ({}), retrying in {}ms",
                "↻".yellow(),
                step.replace('_', " "),
                error,
                delay_ms
            );
        }
        RunProgress::Finished { state, detail, .. } => {
            if let Some(detail) = detail {
                println!("  {} {}: {}", "✗".red(), state, detail);
            }
        }
    }
}

/// Light markdown styling: headings stand out, everything else is verbatim.
pub fn markdown(text: &str) {
    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("### ") {
            println!("{}", heading.bold());
        } else if let Some(heading) = line.strip_prefix("## ") {
            println!("{}", heading.bright_cyan().bold());
        } else {
            println!("{}", line);
        }
    }
}

pub fn notebook(output: &NotebookOutput) {
    println!();
    markdown(&output.content);
    println!();
}

pub fn documents(documents: &[StoredDocument]) {
    if documents.is_empty() {
        warning("No documents stored yet");
        return;
    }
    for doc in documents {
        println!(
            "{:>4}  {}  {}",
            doc.id.to_string().dimmed(),
            doc.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            doc.document_name.bright_white()
        );
    }
}

/// Header plus up to five rows.
pub fn table(number: usize, table: &MarkdownTable) {
    println!(
        "{} {}",
        format!("Table {}", number).bright_cyan().bold(),
        format!("({} rows)", table.rows.len()).dimmed()
    );
    println!("  {}", table.header.join(" | ").bold());
    for row in table.rows.iter().take(5) {
        println!("  {}", row.join(" | "));
    }
    if table.rows.len() > 5 {
        println!("  {}", "…".dimmed());
    }
}

pub fn verdict(verdict: &ClaimVerification) {
    if verdict.claim_is_true {
        success("The claim is supported");
    } else {
        warning("The claim is not supported");
    }
    for citation in verdict.supporting_citations.iter().flatten() {
        println!("  {} {}", "-".dimmed(), citation);
    }
}
