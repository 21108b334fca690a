//! Command implementations. Each blocks on the bridge for its async work.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context as _, Result};
use db::{DBService, ManagedDocument};
use notebook::{
    documents::save_output, podcast::PodcastGenerator, Bridge, PodcastConfig, QueryError,
    WorkflowConfig, WorkflowEngine,
};
use services::{
    services::{
        llm::LlmClient,
        speech::{ElevenLabsSynthesizer, LlmConversationWriter},
        tables::TableExtractor,
        verification::ClaimVerifier,
    },
    ServiceError, ServicesConfig,
};
use tokio::sync::broadcast::error::RecvError;
use tool_client::{ToolClient, ToolClientConfig};
use utils::external_services::{host_and_port, wait_for_service};

use crate::output;

pub struct Context {
    bridge: Bridge,
    tools: Arc<ToolClient>,
    workflow: WorkflowConfig,
}

impl Context {
    pub fn new(host: &str, workers: usize) -> Result<Self> {
        let client_config = ToolClientConfig {
            base_url: host.to_string(),
            ..ToolClientConfig::from_env()
        };
        Ok(Self {
            bridge: Bridge::new(workers)?,
            tools: Arc::new(ToolClient::new(&client_config)),
            workflow: WorkflowConfig::from_env(),
        })
    }

    fn engine(&self) -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(self.tools.clone(), self.workflow.clone()))
    }
}

pub fn process(ctx: &Context, file: PathBuf, title: &str, save: bool) -> Result<()> {
    let file = std::fs::canonicalize(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    output::step(&format!("Processing {}", file.display()));

    let engine = ctx.engine();
    let mut progress = engine.subscribe();
    let printer = std::thread::spawn(move || loop {
        match progress.blocking_recv() {
            Ok(event) => output::progress(&event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("progress printer skipped {} events", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    });

    let result = ctx.bridge.process_file(engine, file);
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }
    let result = result?;
    output::notebook(&result);

    if save {
        let title = title.to_string();
        let stored = ctx.bridge.submit(async move {
            let db = DBService::new().await?;
            let stored = save_output(&db, &title, result).await;
            db.disconnect().await;
            anyhow::Ok(stored?)
        })??;
        output::success(&format!(
            "Saved '{}' as document #{}",
            stored.document_name, stored.id
        ));
    } else {
        let path = result.graph_artifact.persist();
        output::success(&format!("Concept graph written to {}", path.display()));
    }
    Ok(())
}

pub fn ask(ctx: &Context, question: &str) -> Result<()> {
    let tools = ctx.tools.clone();
    let question = question.to_string();
    let answer = ctx
        .bridge
        .submit(async move { notebook::answer_question(tools.as_ref(), &question).await })?;

    match answer {
        Ok(answer) => output::markdown(&answer),
        Err(QueryError::NoAnswerFound(message)) => output::warning(&message),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn podcast(ctx: &Context, file: &Path, config: PodcastConfig) -> Result<()> {
    let transcript = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let services = ServicesConfig::from_env()?;
    let llm = services.llm.ok_or(ServiceError::NotConfigured("OPENAI_API_KEY"))?;
    let speech = services
        .speech
        .ok_or(ServiceError::NotConfigured("ELEVENLABS_API_KEY"))?;
    let artifact_dir = services.artifact_dir;
    utils::assets::ensure_dir(&artifact_dir)?;

    output::step("Writing the script and synthesizing speech");
    let generator = PodcastGenerator::new(
        Arc::new(LlmConversationWriter::new(LlmClient::new(llm))),
        Arc::new(ElevenLabsSynthesizer::new(speech)),
        artifact_dir,
    );
    let audio = ctx
        .bridge
        .submit(async move { generator.create_conversation(&transcript, &config).await })??;

    let path = audio.persist();
    output::success(&format!("Podcast written to {}", path.display()));
    Ok(())
}

pub fn documents(ctx: &Context, limit: i64) -> Result<()> {
    let documents = ctx.bridge.submit(async move {
        let db = DBService::new().await?;
        let documents = ManagedDocument::find_recent(&db.pool, Some(limit)).await;
        db.disconnect().await;
        anyhow::Ok(documents?)
    })??;
    output::documents(&documents);
    Ok(())
}

pub fn verify(ctx: &Context, claim: &str, sources: &Path) -> Result<()> {
    let sources = std::fs::read_to_string(sources)
        .with_context(|| format!("cannot read {}", sources.display()))?;
    let llm = ServicesConfig::from_env()?.llm.map(LlmClient::new);
    let claim = claim.to_string();

    let verdict = ctx
        .bridge
        .submit(async move { ClaimVerifier::new(llm).verify(&claim, &sources).await })??;
    output::verdict(&verdict);
    Ok(())
}

pub fn tables(ctx: &Context, file: &Path, keep: bool) -> Result<()> {
    let file = std::fs::canonicalize(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let artifact_dir = ServicesConfig::from_env()?.artifact_dir;
    utils::assets::ensure_dir(&artifact_dir)?;

    let extractor = TableExtractor::new(artifact_dir);
    let tables = ctx
        .bridge
        .submit(async move { extractor.extract(&file).await })??;

    if tables.is_empty() {
        output::warning("No tables found");
        return Ok(());
    }
    for (index, extracted) in tables.into_iter().enumerate() {
        output::table(index + 1, &extracted.table);
        if keep {
            let path = extracted.csv.persist();
            output::success(&format!("Saved {}", path.display()));
        }
    }
    Ok(())
}

pub fn health(ctx: &Context) -> Result<()> {
    let tools = ctx.tools.clone();
    let base_url = tools.base_url().to_string();
    let (host, port) = host_and_port(&base_url)
        .with_context(|| format!("{} is not an http(s) URL", base_url))?;
    let reachable = ctx.bridge.submit(async move {
        wait_for_service(&host, port, 3, Duration::from_millis(300)).await
    })?;
    if !reachable {
        anyhow::bail!("no tool host is listening at {}", base_url);
    }

    let (health, listed) = ctx.bridge.submit(async move {
        let health = tools.health_check().await?;
        let listed = tools.list_tools().await?;
        Ok::<_, tool_client::ToolFailure>((health, listed))
    })??;

    output::success(&format!("{} is {}", base_url, health.status));
    for tool in listed {
        println!("  {:<22} {}", tool.name, tool.description);
    }
    Ok(())
}
