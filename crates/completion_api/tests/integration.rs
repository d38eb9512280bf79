use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use completion_api::{
    ChatCompletionRequest, ChatMessage, CompletionApiClient, CompletionApiConfig,
    CompletionApiError,
};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    },
    Reset,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    head: String,
    body: Vec<u8>,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let captured = Arc::clone(&captured);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let captured = Arc::clone(&captured);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, captured).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            captured,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("captured lock").clone()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "application/json",
        body: body.as_bytes().to_vec(),
    }
}

fn chat_request() -> ChatCompletionRequest {
    ChatCompletionRequest::new(
        "blackboxai/openai/gpt-4",
        vec![
            ChatMessage::new("system", "You are an intelligent AI coding assistant."),
            ChatMessage::new("user", "hello"),
        ],
        0.5,
        1024,
    )
}

#[tokio::test]
async fn complete_returns_first_choice_content_and_posts_full_history() {
    let server = ScriptedServer::new(vec![response_json(
        200,
        r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#,
    )])
    .await;

    let config = CompletionApiConfig::new(&server.base_url).with_api_key("relay-token");
    let client = CompletionApiClient::new(config).expect("client");

    let response = client
        .complete(&chat_request())
        .await
        .expect("completion should succeed");

    assert_eq!(response.first_content(), Some("Hi there"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(server.request_count(), 1);

    let captured = server.captured();
    let request = captured.first().expect("captured request");
    assert!(request.head.starts_with("POST /v1/chat/completions "));
    assert!(request
        .head
        .to_ascii_lowercase()
        .contains("authorization: bearer relay-token"));

    let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hello");
    assert_eq!(body["stream"], false);

    server.shutdown();
}

#[tokio::test]
async fn success_status_other_than_ok_is_kept_on_the_response() {
    let server = ScriptedServer::new(vec![response_json(
        203,
        r#"{"choices":[{"message":{"content":"cached"}}]}"#,
    )])
    .await;

    let client =
        CompletionApiClient::new(CompletionApiConfig::new(&server.base_url)).expect("client");

    let response = client
        .complete(&chat_request())
        .await
        .expect("2xx should succeed");

    assert_eq!(response.status, StatusCode::NON_AUTHORITATIVE_INFORMATION);
    assert_eq!(response.first_content(), Some("cached"));

    server.shutdown();
}

#[tokio::test]
async fn non_success_status_fails_once_without_retry() {
    let server = ScriptedServer::new(vec![
        response_json(503, r#"{"error":{"message":"overloaded"}}"#),
        response_json(200, r#"{"choices":[{"message":{"content":"late"}}]}"#),
    ])
    .await;

    let client =
        CompletionApiClient::new(CompletionApiConfig::new(&server.base_url)).expect("client");

    let error = client
        .complete(&chat_request())
        .await
        .expect_err("503 should fail");

    match &error {
        CompletionApiError::RequestFailed {
            status,
            status_text,
            detail,
        } => {
            assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(status_text, "Service Unavailable");
            assert_eq!(detail, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(error.to_string(), "API request failed: Service Unavailable");
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn malformed_body_fails_with_decode_error() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/html",
        body: b"<html>not json</html>".to_vec(),
    }])
    .await;

    let client =
        CompletionApiClient::new(CompletionApiConfig::new(&server.base_url)).expect("client");

    let error = client
        .complete(&chat_request())
        .await
        .expect_err("html should not decode");
    assert!(matches!(error, CompletionApiError::Decode(_)));

    server.shutdown();
}

#[tokio::test]
async fn connection_reset_fails_with_transport_error() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Reset]).await;

    let client =
        CompletionApiClient::new(CompletionApiConfig::new(&server.base_url)).expect("client");

    let error = client
        .complete(&chat_request())
        .await
        .expect_err("reset should fail");
    assert!(matches!(error, CompletionApiError::Transport(_)));
    assert!(error.to_string().starts_with("network error:"));

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        203 => "Non-Authoritative Information",
        400 => "Bad Request",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let request = match read_request(&mut socket).await {
        Ok(request) => request,
        Err(_) => return,
    };
    captured.lock().expect("captured lock").push(request);

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r#"{"error":"unexpected request"}"#));

    match response {
        ScriptedResponse::Reset => {}
        ScriptedResponse::Respond {
            status,
            content_type,
            body,
        } => {
            let headers = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_reason(status),
                content_type,
                body.len(),
            );

            if socket.write_all(headers.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(index) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break index + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < head_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    Ok(CapturedRequest {
        head,
        body: request[head_end..].to_vec(),
    })
}
