//! Notebook CLI - synchronous front end for the notebook assistant
//!
//! Every command runs on the calling thread and hands async work to a
//! [`notebook::Bridge`], blocking until it completes.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use notebook::podcast::{PodcastStyle, PodcastTone, TargetAudience};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Notebook assistant - documents in, notebooks out
#[derive(Parser)]
#[command(name = "notebook")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn documents into notebooks, concept graphs and podcasts")]
#[command(long_about = r#"
Talks to a running tool host (see `tool-host`) to process documents.

Examples:
  notebook process paper.md --title "Paper" --save
  notebook ask "What does the paper conclude?"
  notebook podcast paper.md --style interview --audience technical
  notebook documents --limit 5
  notebook tables report.md --keep
"#)]
struct Cli {
    /// Tool host URL
    #[arg(long, env = "TOOL_HOST_URL", default_value = "http://127.0.0.1:8000")]
    host: String,

    /// Worker threads for the async bridge
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a document into a notebook and concept graph
    Process {
        file: PathBuf,

        /// Title used when saving
        #[arg(short, long)]
        title: String,

        /// Store the notebook in the document database
        #[arg(long)]
        save: bool,
    },

    /// Ask a question about processed documents
    Ask { question: String },

    /// Generate a two-speaker podcast from a text file
    Podcast {
        file: PathBuf,

        #[arg(long, default_value_t = PodcastStyle::default())]
        style: PodcastStyle,

        #[arg(long, default_value_t = PodcastTone::default())]
        tone: PodcastTone,

        #[arg(long, default_value_t = TargetAudience::default())]
        audience: TargetAudience,

        /// Topic to discuss in depth (repeatable)
        #[arg(long = "focus")]
        focus: Vec<String>,

        /// Extra instructions for the script writer
        #[arg(long)]
        prompt: Option<String>,
    },

    /// List stored documents
    Documents {
        #[arg(short, long, default_value = "15")]
        limit: i64,
    },

    /// Check a claim against a sources file
    Verify {
        claim: String,

        #[arg(short, long)]
        sources: PathBuf,
    },

    /// Extract markdown tables from a document as CSV files
    Tables {
        file: PathBuf,

        /// Keep the CSV files instead of deleting them on exit
        #[arg(long)]
        keep: bool,
    },

    /// Check that the tool host is up
    Health,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "warn,notebook={level},notebook_cli={level},tool_client={level},services={level}",
                    level = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let ctx = commands::Context::new(&cli.host, cli.workers)?;

    match cli.command {
        Commands::Process { file, title, save } => commands::process(&ctx, file, &title, save),
        Commands::Ask { question } => commands::ask(&ctx, &question),
        Commands::Podcast {
            file,
            style,
            tone,
            audience,
            focus,
            prompt,
        } => {
            let config = notebook::PodcastConfig {
                style,
                tone,
                target_audience: audience,
                focus_topics: focus,
                custom_prompt: prompt,
                ..Default::default()
            };
            commands::podcast(&ctx, &file, config)
        }
        Commands::Documents { limit } => commands::documents(&ctx, limit),
        Commands::Verify { claim, sources } => commands::verify(&ctx, &claim, &sources),
        Commands::Tables { file, keep } => commands::tables(&ctx, &file, keep),
        Commands::Health => commands::health(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn podcast_options_parse_into_enums() {
        let cli = Cli::try_parse_from([
            "notebook",
            "podcast",
            "talk.txt",
            "--style",
            "interview",
            "--audience",
            "technical",
            "--focus",
            "ownership",
            "--focus",
            "lifetimes",
        ])
        .unwrap();
        let Commands::Podcast {
            style,
            tone,
            audience,
            focus,
            ..
        } = cli.command
        else {
            panic!("expected the podcast command");
        };
        assert_eq!(style, PodcastStyle::Interview);
        assert_eq!(tone, PodcastTone::Friendly);
        assert_eq!(audience, TargetAudience::Technical);
        assert_eq!(focus, vec!["ownership", "lifetimes"]);
    }

    #[test]
    fn tables_keep_flag_is_optional() {
        let cli = Cli::try_parse_from(["notebook", "tables", "report.md"]).unwrap();
        assert!(matches!(cli.command, Commands::Tables { keep: false, .. }));
        let cli = Cli::try_parse_from(["notebook", "tables", "report.md", "--keep"]).unwrap();
        assert!(matches!(cli.command, Commands::Tables { keep: true, .. }));
    }

    #[test]
    fn unknown_style_is_rejected() {
        assert!(Cli::try_parse_from(["notebook", "podcast", "t.txt", "--style", "rant"]).is_err());
    }
}
