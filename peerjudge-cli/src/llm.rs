/// OpenAI-compatible chat client for the judging assistant.
///
/// Two shapes of call: `complete` waits for the whole reply; `stream_chat` reassembles a
/// streamed reply and hands each delta to a callback as it arrives.
use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sse::{SseDecoder, StreamEvent};

/// Configuration for the LLM endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
    #[error("could not decode LLM response: {0}")]
    Decode(String),
    #[error("no choices in LLM response")]
    NoChoices,
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
}

fn completions_url(endpoint: &str) -> String {
    format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'))
}

async fn send(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
    stream: bool,
) -> Result<reqwest::Response, LlmError> {
    let request = ChatCompletionRequest {
        model: &config.model,
        messages,
        temperature: config.temperature,
        stream,
    };

    let mut req_builder = client.post(completions_url(&config.endpoint)).json(&request);
    if let Some(ref key) = config.api_key {
        req_builder = req_builder.bearer_auth(key);
    }

    let resp = req_builder.send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let body = body.chars().take(200).collect();
        return Err(LlmError::Status { status, body });
    }
    Ok(resp)
}

async fn within<T>(limit: Duration, fut: impl Future<Output = Result<T, LlmError>>) -> Result<T, LlmError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| LlmError::Timeout(limit))?
}

/// Ask for a complete (non-streamed) reply. The timeout covers the whole exchange.
pub async fn complete(client: &Client, config: &LlmConfig, messages: &[ChatMessage]) -> Result<String, LlmError> {
    let call = async {
        let body = send(client, config, messages, false).await?.text().await?;
        let data: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
        let choice = data.choices.into_iter().next().ok_or(LlmError::NoChoices)?;
        Ok::<_, LlmError>(choice.message.content.unwrap_or_default())
    };
    within(config.timeout, call).await
}

/// Stream a reply, calling `on_delta` with each piece of text. Returns the full reply.
///
/// Ends at the server's end marker or when the connection closes, whichever comes first.
/// The timeout bounds the wait for the response head and for each chunk after it, so a
/// long reply that keeps arriving is never cut off.
pub async fn stream_chat(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
    mut on_delta: impl FnMut(&str),
) -> Result<String, LlmError> {
    let resp = within(config.timeout, send(client, config, messages, true)).await?;
    let mut body = resp.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut reply = String::new();

    'read: loop {
        let next = tokio::time::timeout(config.timeout, body.next())
            .await
            .map_err(|_| LlmError::Timeout(config.timeout))?;
        let Some(chunk) = next else {
            break;
        };
        decoder.feed(&chunk?);
        for event in decoder.by_ref() {
            match event {
                StreamEvent::Delta(text) => {
                    on_delta(&text);
                    reply.push_str(&text);
                }
                StreamEvent::Done => break 'read,
            }
        }
    }

    if !decoder.is_done() {
        decoder.finish();
        for event in decoder.by_ref() {
            if let StreamEvent::Delta(text) = event {
                on_delta(&text);
                reply.push_str(&text);
            }
        }
        debug!("Stream closed without end marker");
    }
    Ok(reply)
}
