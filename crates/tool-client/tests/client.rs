use std::time::{Duration, Instant};

use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tool_client::{
    call, AnswerPayload, AnswerQuery, AnswerQueryArgs, ToolClient, ToolClientConfig,
    ToolFailureKind,
};

fn client_for(base_url: String, timeout: Duration) -> ToolClient {
    ToolClient::new(&ToolClientConfig {
        base_url,
        timeout,
    })
}

/// Read headers and a content-length body so the socket closes cleanly.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}

/// Serve exactly one canned HTTP response on an ephemeral port.
async fn one_shot_host(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{}", addr), Duration::from_secs(5));
    let failure = client
        .invoke_named("answer-query", json!({"question": "why?"}))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ToolFailureKind::TransportError);
    assert!(!client.is_running().await);
}

#[tokio::test]
async fn silent_host_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = client_for(format!("http://{}", addr), Duration::from_millis(200));
    let started = Instant::now();
    let failure = client
        .invoke_named("answer-query", json!({"question": "why?"}))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ToolFailureKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn failure_envelope_is_decoded_regardless_of_http_status() {
    let body = json!({
        "status": "failure",
        "kind": "not_found",
        "message": "unknown operation: summon-dragon"
    })
    .to_string();
    let base_url = one_shot_host("404 Not Found", body).await;

    let client = client_for(base_url, Duration::from_secs(5));
    let failure = client
        .invoke_named("summon-dragon", json!({}))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ToolFailureKind::NotFound);
    assert_eq!(failure.message, "unknown operation: summon-dragon");
}

#[tokio::test]
async fn typed_call_decodes_sentinel_payload() {
    let body = json!({
        "status": "success",
        "payload": {"outcome": "no_answer", "message": "Sorry, I was unable to find an answer to your question."}
    })
    .to_string();
    let base_url = one_shot_host("200 OK", body).await;

    let client = client_for(base_url, Duration::from_secs(5));
    let payload = call::<AnswerQuery>(
        &client,
        &AnswerQueryArgs {
            question: "What colour is the sky?".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(payload, AnswerPayload::no_answer());
}

#[tokio::test]
async fn non_envelope_body_is_a_transport_error() {
    let base_url = one_shot_host("502 Bad Gateway", "\"upstream down\"".to_string()).await;

    let client = client_for(base_url, Duration::from_secs(5));
    let failure = client
        .invoke_named("answer-query", json!({"question": "?"}))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, ToolFailureKind::TransportError);
}
