/// Local HTTP endpoint that answers every request with one canned reply.
///
/// Enough HTTP/1.1 for reqwest: reads the request head and body, writes the status and
/// headers, then the body in pieces, and closes the connection to end it.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::llm::LlmConfig;

pub struct MockReply {
    pub status: u16,
    pub content_type: &'static str,
    pub chunks: Vec<String>,
    /// Wait before the status line is written.
    pub delay: Duration,
    /// Wait after each body chunk.
    pub chunk_gap: Duration,
}

impl MockReply {
    /// Non-streamed chat completion whose message content is `content`.
    pub fn completion(content: &str) -> Self {
        let body = serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        });
        Self::raw(200, "application/json", vec![body.to_string()])
    }

    /// Event stream body, written chunk by chunk exactly as given.
    pub fn sse(chunks: &[&str]) -> Self {
        Self::raw(200, "text/event-stream", chunks.iter().map(|c| c.to_string()).collect())
    }

    pub fn raw(status: u16, content_type: &'static str, chunks: Vec<String>) -> Self {
        MockReply {
            status,
            content_type,
            chunks,
            delay: Duration::ZERO,
            chunk_gap: Duration::from_millis(5),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.chunk_gap = gap;
        self
    }
}

/// Delta line as an OpenAI-compatible server streams it.
pub fn delta_line(text: &str) -> String {
    let chunk = serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": text } }] });
    format!("data: {chunk}\n\n")
}

pub struct MockServer {
    pub endpoint: String,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn config(&self, timeout: Duration) -> LlmConfig {
        LlmConfig {
            endpoint: self.endpoint.clone(),
            model: "mock".into(),
            api_key: Some("test-key".into()),
            temperature: 0.0,
            timeout,
        }
    }
}

pub async fn serve(reply: MockReply) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = Arc::new(reply);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let reply = reply.clone();
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _ = respond(socket, &reply).await;
            });
        }
    });

    MockServer {
        endpoint: format!("http://{addr}"),
        hits,
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        let n = socket.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return Ok(());
            }
        }
    }
}

async fn respond(mut socket: TcpStream, reply: &MockReply) -> std::io::Result<()> {
    read_request(&mut socket).await?;
    tokio::time::sleep(reply.delay).await;

    let head = format!(
        "HTTP/1.1 {} Mock\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
        reply.status, reply.content_type
    );
    socket.write_all(head.as_bytes()).await?;
    socket.flush().await?;
    for chunk in &reply.chunks {
        socket.write_all(chunk.as_bytes()).await?;
        socket.flush().await?;
        tokio::time::sleep(reply.chunk_gap).await;
    }
    socket.shutdown().await
}

/// Client that talks to the mock directly, ignoring any proxy in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
