/// Incremental decoder for OpenAI-style `text/event-stream` chat completions.
///
/// Feed raw byte chunks as they arrive; iterate to pull parsed events. Lines may be split
/// across chunks anywhere, including inside a multi-byte character. One decoder per
/// response: after `Done` nothing else is yielded.
use std::collections::VecDeque;

use serde::Deserialize;
use tracing::debug;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of assistant text.
    Delta(String),
    /// Explicit end-of-stream marker from the server.
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the line currently being assembled.
    partial: Vec<u8>,
    /// Complete lines not yet parsed.
    lines: VecDeque<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk from the transport.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.done {
            return;
        }
        for &byte in chunk {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.partial);
                self.lines.push_back(String::from_utf8_lossy(&raw).into_owned());
            } else {
                self.partial.push(byte);
            }
        }
    }

    /// The transport closed. Any unterminated trailing line is treated as complete.
    pub fn finish(&mut self) {
        if !self.partial.is_empty() {
            let raw = std::mem::take(&mut self.partial);
            self.lines.push_back(String::from_utf8_lossy(&raw).into_owned());
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn parse_line(line: &str) -> Option<StreamEvent> {
        let line = line.trim_end_matches('\r');
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }
        if payload == DONE_MARKER {
            return Some(StreamEvent::Done);
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content)
                .filter(|text| !text.is_empty())
                .map(StreamEvent::Delta),
            Err(e) => {
                debug!(error = %e, "Skipping malformed stream chunk");
                None
            }
        }
    }
}

impl Iterator for SseDecoder {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if self.done {
            return None;
        }
        while let Some(line) = self.lines.pop_front() {
            if let Some(event) = Self::parse_line(&line) {
                if event == StreamEvent::Done {
                    self.done = true;
                    self.lines.clear();
                    self.partial.clear();
                }
                return Some(event);
            }
        }
        None
    }
}
