// tests/remote_client.rs

mod common;
use crate::common::{builders::ConfigFileBuilder, init_tracing, with_timeout};

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use retraindag::errors::TaskError;
use retraindag::exec::{
    AccuracyPayload, HttpRemoteClient, RemoteClient, RemoteOperation, RetryPolicy,
    TokenPayload, classify_status,
};
use retraindag::workflow::ContextKey;

#[test]
fn success_with_json_body_returns_payload() {
    let payload = classify_status(RemoteOperation::CheckAccuracy, 200, r#"{"accuracy":0.87}"#)
        .expect("2xx is success");
    assert_eq!(payload, Some(json!({ "accuracy": 0.87 })));
}

#[test]
fn empty_success_body_is_fine_only_without_expected_payload() {
    assert_eq!(
        classify_status(RemoteOperation::BackupModel, 204, ""),
        Ok(None)
    );
    assert_eq!(
        classify_status(RemoteOperation::RetrainModel, 200, "training started"),
        Ok(None)
    );
    assert!(matches!(
        classify_status(RemoteOperation::IssueToken, 200, "  "),
        Err(TaskError::MalformedPayload(_))
    ));
    assert!(matches!(
        classify_status(RemoteOperation::CheckAccuracy, 200, "<html>"),
        Err(TaskError::MalformedPayload(_))
    ));
}

#[test]
fn auth_statuses_are_unauthorized() {
    assert_eq!(
        classify_status(RemoteOperation::IssueToken, 400, "bad credentials"),
        Err(TaskError::Unauthorized { status: 400 })
    );
    assert_eq!(
        classify_status(RemoteOperation::BackupModel, 401, ""),
        Err(TaskError::Unauthorized { status: 401 })
    );
    assert_eq!(
        classify_status(RemoteOperation::ReloadData, 403, ""),
        Err(TaskError::Unauthorized { status: 403 })
    );
    // 400 only means bad credentials on the token endpoint.
    assert!(matches!(
        classify_status(RemoteOperation::ReloadData, 400, "bad request"),
        Err(TaskError::UnexpectedStatus { status: 400, .. })
    ));
}

#[test]
fn missing_evaluation_data_is_distinguished() {
    assert_eq!(
        classify_status(RemoteOperation::CheckAccuracy, 404, "no evaluation set"),
        Err(TaskError::DataUnavailable("no evaluation set".to_string()))
    );
    assert!(matches!(
        classify_status(RemoteOperation::RestoreModel, 404, "no backup"),
        Err(TaskError::UnexpectedStatus { status: 404, .. })
    ));
}

#[test]
fn long_error_bodies_are_truncated() {
    let body = "x".repeat(1000);
    match classify_status(RemoteOperation::RetrainModel, 500, &body) {
        Err(TaskError::UnexpectedStatus { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.len() < 300, "{}", body.len());
            assert!(body.ends_with("..."));
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

/// Request line and headers of every request a canned server saw.
type Seen = Arc<Mutex<Vec<String>>>;

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.expect("read request");
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve `responses` in order, one per connection.
async fn canned_server(responses: Vec<(u16, &'static str)>) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let seen: Seen = Arc::default();
    let seen_srv = Arc::clone(&seen);

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut stream).await;
            seen_srv.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (addr, seen)
}

fn client_for(addr: SocketAddr, timeout: &str) -> HttpRemoteClient {
    let cfg = ConfigFileBuilder::new()
        .base_url(&format!("http://{addr}/api"))
        .request_timeout(timeout)
        .build();
    HttpRemoteClient::new(&cfg.api).expect("client builds")
}

#[tokio::test]
async fn token_is_requested_with_form_credentials() {
    init_tracing();
    let (addr, seen) =
        canned_server(vec![(200, r#"{"access_token":"abc","token_type":"bearer"}"#)]).await;
    let client = client_for(addr, "5s");

    let result = with_timeout(client.call(RemoteOperation::IssueToken, None))
        .await
        .expect("token call succeeds");
    let token: TokenPayload = result.decode().expect("token payload");
    assert_eq!(token.access_token, "abc");
    assert_eq!(result.status, 200);

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("POST /api/token "), "{}", requests[0]);
    assert!(requests[0].contains("grant_type=password"), "{}", requests[0]);
    assert!(requests[0].contains("username=admin"), "{}", requests[0]);
}

#[tokio::test]
async fn accuracy_is_fetched_with_bearer_token() {
    init_tracing();
    let (addr, seen) = canned_server(vec![(200, r#"{"accuracy":0.91}"#)]).await;
    let client = client_for(addr, "5s");

    let result = with_timeout(client.call(RemoteOperation::CheckAccuracy, Some("abc")))
        .await
        .expect("accuracy call succeeds");
    let payload: AccuracyPayload = result.decode().expect("accuracy payload");
    assert_eq!(payload.accuracy, 0.91);

    let requests = seen.lock().unwrap().clone();
    assert!(requests[0].starts_with("GET /api/accuracy "), "{}", requests[0]);
    assert!(
        requests[0].to_ascii_lowercase().contains("authorization: bearer abc"),
        "{}",
        requests[0]
    );
}

#[tokio::test]
async fn reload_hits_raw_then_dataset() {
    init_tracing();
    let (addr, seen) = canned_server(vec![(200, ""), (200, "")]).await;
    let client = client_for(addr, "5s");

    with_timeout(client.call(RemoteOperation::ReloadData, Some("abc")))
        .await
        .expect("reload succeeds");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("POST /api/raw "), "{}", requests[0]);
    assert!(requests[1].starts_with("POST /api/dataset "), "{}", requests[1]);
}

#[tokio::test]
async fn error_status_is_classified() {
    init_tracing();
    let (addr, _) = canned_server(vec![(404, "no evaluation set")]).await;
    let client = client_for(addr, "5s");

    let err = with_timeout(client.call(RemoteOperation::CheckAccuracy, Some("abc")))
        .await
        .expect_err("404 is an error");
    assert_eq!(err, TaskError::DataUnavailable("no evaluation set".to_string()));
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    init_tracing();
    let (addr, seen) = canned_server(vec![]).await;
    let client = client_for(addr, "5s");

    let err = client
        .call(RemoteOperation::BackupModel, None)
        .await
        .expect_err("bearer token is required");
    assert_eq!(err, TaskError::MissingContext(ContextKey::Token));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn silent_server_times_out() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let client = client_for(addr, "200ms");
    let err = with_timeout(client.call(RemoteOperation::RetrainModel, Some("abc")))
        .await
        .expect_err("request must time out");
    assert_eq!(err, TaskError::Timeout(Duration::from_millis(200)));
    assert!(err.is_retryable());

    server.abort();
}

#[tokio::test]
async fn timeouts_use_the_whole_retry_budget() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let accepted = Arc::new(Mutex::new(0u32));
    let accepted_srv = Arc::clone(&accepted);
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            *accepted_srv.lock().unwrap() += 1;
            held.push(stream);
        }
    });

    let client = client_for(addr, "200ms");
    let attempted = with_timeout(RetryPolicy::new(2, Duration::ZERO).run(
        "check_accuracy",
        |_| client.call(RemoteOperation::CheckAccuracy, Some("abc")),
    ))
    .await;

    assert_eq!(attempted.attempts, 2);
    assert_eq!(
        attempted.result.map(|r| r.status),
        Err(TaskError::Timeout(Duration::from_millis(200)))
    );
    assert_eq!(*accepted.lock().unwrap(), 2);

    server.abort();
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = client_for(addr, "2s");
    let err = with_timeout(client.call(RemoteOperation::IssueToken, None))
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, TaskError::Transport(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[test]
fn debug_output_hides_the_password() {
    let cfg = ConfigFileBuilder::new().build();
    let client = HttpRemoteClient::new(&cfg.api).expect("client builds");
    let rendered = format!("{client:?} {:?}", cfg.api);
    assert!(!rendered.contains("secret"), "{rendered}");
    assert!(rendered.contains("<redacted>"));
}
