use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use notebook::{
    events::FileInput,
    workflow::{RetryPolicy, RunFailure, RunProgress, RunState, WorkflowConfig, WorkflowEngine},
    Bridge, BridgeError, NotebookError, RunError,
};
use serde_json::{json, Value};
use tool_client::{
    Operation, ToolFailure, ToolFailureKind, ToolInvoker, ToolRequest,
    GRAPH_CREATION_FAILED_MESSAGE, PROCESSING_FAILED_MESSAGE,
};

type Handler = Box<dyn Fn(&ToolRequest, usize) -> Result<Value, ToolFailure> + Send + Sync>;

/// In-process stand-in for the tool host.
struct FakeTools {
    handler: Handler,
    delay: Duration,
    calls: Mutex<Vec<Operation>>,
    counter: AtomicUsize,
}

impl FakeTools {
    fn new(handler: Handler) -> Self {
        Self {
            handler,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls_to(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|op| **op == operation)
            .count()
    }
}

#[async_trait]
impl ToolInvoker for FakeTools {
    async fn invoke(&self, request: ToolRequest) -> Result<Value, ToolFailure> {
        self.calls.lock().unwrap().push(request.operation);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(&request, n)
    }
}

fn notebook_payload(summary: &str, highlight: &str) -> Value {
    json!({
        "outcome": "processed",
        "structured_payload": {
            "summary": summary,
            "highlights": [highlight, "second point", "third point"],
            "questions": ["What is said?"],
            "answers": [summary]
        },
        "raw_text": summary
    })
}

/// Handler that extracts the file's own text and writes graphs into `dir`.
fn happy_path(dir: PathBuf) -> Handler {
    Box::new(move |request, _| match request.operation {
        Operation::ProcessDocument => {
            let path = request.arguments["file_path"].as_str().unwrap();
            let text = std::fs::read_to_string(path).unwrap();
            Ok(notebook_payload(text.trim(), "sky is blue"))
        }
        Operation::BuildConceptGraph => {
            let summary = request.arguments["summary"].as_str().unwrap();
            let path = dir.join(format!("{}.html", uuid_like(summary)));
            std::fs::write(&path, format!("<html>{}</html>", summary)).unwrap();
            Ok(json!({"outcome": "rendered", "artifact_path": path}))
        }
        Operation::AnswerQuery => Err(ToolFailure::not_found("unused")),
    })
}

fn uuid_like(seed: &str) -> String {
    seed.bytes().map(|b| format!("{:02x}", b)).collect::<String>()
}

fn write_input(dir: &std::path::Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn successful_run_produces_output_with_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "sky.txt", "The sky is blue.");
    let tools = Arc::new(FakeTools::new(happy_path(dir.path().to_path_buf())));
    let engine = WorkflowEngine::new(tools.clone(), WorkflowConfig::default());

    let run = engine.run(FileInput { path: input }).await;
    assert_eq!(
        run.completed_steps,
        vec!["extract_document", "prepare_graph", "build_graph"]
    );
    assert!(run.finished_at.is_some());

    let output = match run.state {
        RunState::Succeeded(output) => output,
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(output.summary, "The sky is blue.");
    assert!(output.content.starts_with("## Summary"));
    assert_eq!(output.highlights[0], "sky is blue");
    assert!(output.graph_artifact.exists());

    let artifact = output.graph_artifact.path().to_path_buf();
    let html = output
        .graph_artifact
        .read_to_string_and_release()
        .await
        .unwrap();
    assert!(html.contains("The sky is blue."));
    assert!(!artifact.exists());
}

#[tokio::test]
async fn processing_sentinel_fails_run_without_building_graph() {
    let tools = Arc::new(FakeTools::new(Box::new(|request, _| {
        match request.operation {
            Operation::ProcessDocument => Ok(json!({
                "outcome": "unprocessable",
                "message": PROCESSING_FAILED_MESSAGE
            })),
            _ => panic!("no other tool should be called"),
        }
    })));
    let engine = WorkflowEngine::new(tools.clone(), WorkflowConfig::default());

    let run = engine
        .run(FileInput {
            path: PathBuf::from("/nonexistent/scan.pdf"),
        })
        .await;
    match run.state {
        RunState::Failed(RunFailure::ProcessingFailed(message)) => {
            assert_eq!(message, PROCESSING_FAILED_MESSAGE)
        }
        other => panic!("expected ProcessingFailed, got {:?}", other),
    }
    assert_eq!(tools.calls_to(Operation::BuildConceptGraph), 0);
}

#[tokio::test]
async fn malformed_extraction_payload_is_processing_failure() {
    let tools = Arc::new(FakeTools::new(Box::new(|request, _| {
        match request.operation {
            Operation::ProcessDocument => Ok(json!({
                "outcome": "processed",
                "structured_payload": {"summary": "s", "highlights": ["only one"]},
                "raw_text": "s"
            })),
            _ => panic!("graph must not be built from a partial notebook"),
        }
    })));
    let engine = WorkflowEngine::new(tools.clone(), WorkflowConfig::default());

    let run = engine
        .run(FileInput {
            path: PathBuf::from("doc.txt"),
        })
        .await;
    assert!(matches!(
        run.state,
        RunState::Failed(RunFailure::ProcessingFailed(_))
    ));
    assert_eq!(run.completed_steps, vec!["extract_document"]);
}

#[tokio::test]
async fn graph_sentinel_names_the_failed_stage() {
    let tools = Arc::new(FakeTools::new(Box::new(|request, _| {
        match request.operation {
            Operation::ProcessDocument => Ok(notebook_payload("Summary.", "point")),
            _ => Ok(json!({"outcome": "failed", "message": GRAPH_CREATION_FAILED_MESSAGE})),
        }
    })));
    let engine = WorkflowEngine::new(tools, WorkflowConfig::default());

    let err = engine
        .process(FileInput {
            path: PathBuf::from("doc.txt"),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RunError::Failed(RunFailure::GraphCreationFailed(
            GRAPH_CREATION_FAILED_MESSAGE.to_string()
        ))
    );
}

#[tokio::test]
async fn protocol_failure_carries_its_kind() {
    let tools = Arc::new(FakeTools::new(Box::new(|_, _| {
        Err(ToolFailure::transport("connection refused"))
    })));
    let engine = WorkflowEngine::new(tools.clone(), WorkflowConfig::default());

    let run = engine
        .run(FileInput {
            path: PathBuf::from("doc.txt"),
        })
        .await;
    let RunState::Failed(reason) = run.state else {
        panic!("expected failure");
    };
    assert_eq!(
        reason.tool_failure_kind(),
        Some(ToolFailureKind::TransportError)
    );
    // no retries by default
    assert_eq!(tools.calls_to(Operation::ProcessDocument), 1);
}

#[tokio::test]
async fn run_times_out_within_budget() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Arc::new(
        FakeTools::new(happy_path(dir.path().to_path_buf())).with_delay(Duration::from_secs(10)),
    );
    let config = WorkflowConfig::default().with_run_timeout(Duration::from_millis(100));
    let engine = WorkflowEngine::new(tools, config);

    let started = Instant::now();
    let run = engine
        .run(FileInput {
            path: PathBuf::from("slow.txt"),
        })
        .await;
    assert!(matches!(run.state, RunState::TimedOut));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        run.into_result(),
        Err(RunError::TimedOut(d)) if d == Duration::from_millis(100)
    ));
}

#[tokio::test]
async fn bounded_retry_recovers_from_transient_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "flaky.txt", "Retries work.");
    let inner = happy_path(dir.path().to_path_buf());
    let tools = Arc::new(FakeTools::new(Box::new(move |request, n| {
        if n == 0 {
            return Err(ToolFailure::timeout("first call stalls"));
        }
        inner(request, n)
    })));
    let retry = RetryPolicy::bounded(2)
        .with_delays(Duration::from_millis(5), Duration::from_millis(20));
    let engine = WorkflowEngine::new(tools.clone(), WorkflowConfig::default().with_retry(retry));

    let output = engine.process(FileInput { path: input }).await.unwrap();
    assert_eq!(output.summary, "Retries work.");
    assert_eq!(tools.calls_to(Operation::ProcessDocument), 2);
}

#[tokio::test]
async fn progress_stream_follows_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "watched.txt", "Progress is observable.");
    let inner = happy_path(dir.path().to_path_buf());
    let tools = Arc::new(FakeTools::new(Box::new(move |request, n| {
        if n == 0 {
            return Err(ToolFailure::transport("connection reset"));
        }
        inner(request, n)
    })));
    let retry = RetryPolicy::bounded(1)
        .with_delays(Duration::from_millis(5), Duration::from_millis(10));
    let engine = WorkflowEngine::new(tools, WorkflowConfig::default().with_retry(retry));
    let mut progress = engine.subscribe();

    let run = engine.run(FileInput { path: input }).await;
    assert!(matches!(run.state, RunState::Succeeded(_)));

    let mut seen = Vec::new();
    while let Ok(event) = progress.try_recv() {
        let label = match event {
            RunProgress::Started { run_id, .. } => {
                assert_eq!(run_id, run.id);
                "started".to_string()
            }
            RunProgress::StepStarted { step, .. } => format!("start {}", step),
            RunProgress::Retrying { step, .. } => format!("retry {}", step),
            RunProgress::StepCompleted { step, .. } => format!("done {}", step),
            RunProgress::Finished { state, detail, .. } => {
                assert!(detail.is_none());
                format!("finished {}", state)
            }
        };
        seen.push(label);
    }
    assert_eq!(
        seen,
        vec![
            "started",
            "start extract_document",
            "retry extract_document",
            "done extract_document",
            "start prepare_graph",
            "done prepare_graph",
            "start build_graph",
            "done build_graph",
            "finished succeeded",
        ]
    );
}

#[tokio::test]
async fn retries_never_outlive_the_run_deadline() {
    let tools = Arc::new(FakeTools::new(Box::new(|_, n| {
        if n % 2 == 0 {
            Err(ToolFailure::timeout("host stalled"))
        } else {
            Err(ToolFailure::transport("connection refused"))
        }
    })));
    let retry = RetryPolicy::bounded(5).with_delays(Duration::from_secs(2), Duration::from_secs(5));
    let config = WorkflowConfig::default()
        .with_run_timeout(Duration::from_millis(200))
        .with_retry(retry);
    let engine = WorkflowEngine::new(tools.clone(), config);

    let started = Instant::now();
    let run = engine
        .run(FileInput {
            path: PathBuf::from("never.txt"),
        })
        .await;
    assert!(matches!(run.state, RunState::TimedOut));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(tools.calls_to(Operation::ProcessDocument), 1);
}

#[tokio::test]
async fn non_transient_failures_are_never_retried() {
    let tools = Arc::new(FakeTools::new(Box::new(|_, _| {
        Err(ToolFailure::remote("extractor crashed"))
    })));
    let engine = WorkflowEngine::new(
        tools.clone(),
        WorkflowConfig::default().with_retry(RetryPolicy::bounded(3)),
    );

    let err = engine
        .process(FileInput {
            path: PathBuf::from("doc.txt"),
        })
        .await
        .unwrap_err();
    let RunError::Failed(reason) = err else {
        panic!("expected failure");
    };
    assert_eq!(
        reason.tool_failure_kind(),
        Some(ToolFailureKind::RemoteExecutionError)
    );
    assert_eq!(tools.calls_to(Operation::ProcessDocument), 1);
}

#[tokio::test]
async fn concurrent_runs_match_sequential_runs() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_input(dir.path(), "a.txt", "Apples are red.");
    let b = write_input(dir.path(), "b.txt", "Bananas are yellow.");
    let tools = Arc::new(
        FakeTools::new(happy_path(dir.path().to_path_buf())).with_delay(Duration::from_millis(20)),
    );
    let engine = Arc::new(WorkflowEngine::new(tools, WorkflowConfig::default()));

    let summarize = |output: notebook::NotebookOutput| async move {
        let fields = (
            output.summary.clone(),
            output.content.clone(),
            output.highlights.clone(),
            output.questions_and_answers(),
        );
        let html = output
            .graph_artifact
            .read_to_string_and_release()
            .await
            .unwrap();
        (fields, html)
    };

    let seq_a = summarize(engine.process(FileInput { path: a.clone() }).await.unwrap()).await;
    let seq_b = summarize(engine.process(FileInput { path: b.clone() }).await.unwrap()).await;

    let (con_a, con_b) = tokio::join!(
        engine.process(FileInput { path: a }),
        engine.process(FileInput { path: b })
    );
    let con_a = summarize(con_a.unwrap()).await;
    let con_b = summarize(con_b.unwrap()).await;

    assert_eq!(seq_a, con_a);
    assert_eq!(seq_b, con_b);
    assert_ne!(con_a, con_b);
}

#[tokio::test]
async fn duplicate_step_registration_is_rejected() {
    let tools = Arc::new(FakeTools::new(Box::new(|_, _| Ok(Value::Null))));
    let engine = WorkflowEngine::new(tools, WorkflowConfig::default());
    let err = engine
        .with_step(Arc::new(notebook::workflow::ExtractDocument))
        .unwrap_err();
    assert!(matches!(err, NotebookError::DuplicateStep(_)));
}

#[tokio::test]
async fn run_without_steps_fails_cleanly() {
    let tools = Arc::new(FakeTools::new(Box::new(|_, _| Ok(Value::Null))));
    let engine = WorkflowEngine::empty(tools, WorkflowConfig::default());
    let run = engine
        .run(FileInput {
            path: PathBuf::from("doc.txt"),
        })
        .await;
    assert!(matches!(run.state, RunState::Failed(RunFailure::NoStep(_))));
}

#[tokio::test]
async fn upload_copy_is_removed_after_the_run() {
    let uploads = tempfile::tempdir().unwrap();
    let graphs = tempfile::tempdir().unwrap();
    let tools = Arc::new(FakeTools::new(happy_path(graphs.path().to_path_buf())));
    let engine = WorkflowEngine::new(tools, WorkflowConfig::default());

    let run = engine
        .run_upload(uploads.path(), "notes.md", b"Uploads are scoped.")
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);

    let output = run.into_result().unwrap();
    assert_eq!(output.summary, "Uploads are scoped.");
    output.graph_artifact.read_and_release().await.unwrap();
    assert_eq!(std::fs::read_dir(graphs.path()).unwrap().count(), 0);
}

#[test]
fn bridge_drives_the_engine_from_sync_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "sync.txt", "Bridges block.");
    let tools = Arc::new(FakeTools::new(happy_path(dir.path().to_path_buf())));
    let engine = Arc::new(WorkflowEngine::new(tools, WorkflowConfig::default()));

    let bridge = Bridge::new(2).unwrap();
    let output = bridge.process_file(engine.clone(), input).unwrap();
    assert_eq!(output.summary, "Bridges block.");
    let _ = output.graph_artifact.persist();

    let err = bridge
        .process_file(engine, dir.path().join("missing.txt"))
        .err();
    // the fake host panics reading a missing file, which the bridge reports
    assert!(matches!(err, Some(BridgeError::WorkerPanicked(_))));
}
