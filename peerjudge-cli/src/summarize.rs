/// Background feedback summaries.
///
/// After each vote, the judge's conversation about a project is condensed into a few
/// strengths and weaknesses. This is best-effort: failures are logged and dropped, and
/// nothing here ever blocks judging.
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use peerjudge_core::{Feedback, ParticipantId};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::llm::{complete, ChatMessage, LlmConfig};
use crate::prompt::build_summary_instruction;

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

/// Pull feedback out of a reply that should be a bare JSON object but may be wrapped in
/// markdown fences or prose.
///
/// Returns the first well-formed JSON object with at least one non-empty entry, or `None`.
pub fn extract_feedback(text: &str) -> Option<Feedback> {
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<SummaryPayload>();
        if let Some(Ok(payload)) = values.next() {
            let feedback = Feedback::new(clean(payload.strengths), clean(payload.weaknesses));
            if !feedback.is_empty() {
                return Some(feedback);
            }
        }
    }
    None
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Transcript plus the extraction instruction.
pub fn build_summary_messages(transcript: &[ChatMessage], project_name: &str) -> Vec<ChatMessage> {
    let mut messages = transcript.to_vec();
    messages.push(ChatMessage::user(build_summary_instruction(project_name)));
    messages
}

/// One running task per key; starting a new one for a key aborts the previous.
///
/// The last task started for a key is the only one that can finish, so a slow older
/// request can never overwrite a newer result.
pub struct LatestWins<K> {
    tasks: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: Eq + Hash + Clone> LatestWins<K> {
    pub fn new() -> Self {
        LatestWins {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn `fut` for `key`, aborting whatever was still running for it.
    pub fn spawn<F>(&self, key: K, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|_, h| !h.is_finished());
        if let Some(previous) = tasks.insert(key, handle) {
            previous.abort();
        }
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }

    /// Wait for every task still registered. Aborted tasks count as finished.
    pub async fn join_all(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn pending(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.values().filter(|h| !h.is_finished()).count()
    }
}

impl<K: Eq + Hash + Clone> Default for LatestWins<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// One conversation about one participant: the participant plus the comparison it came from.
pub type ConversationKey = (ParticipantId, usize);

/// Fires summary requests and reports results on a channel.
///
/// Results arrive as `(participant, feedback)`; the judging loop drains them between votes
/// and merges them into its session. Summaries of different conversations run
/// independently. Only a repeat summary of the same conversation replaces one in flight.
pub struct Summarizer {
    client: Client,
    config: Arc<LlmConfig>,
    tasks: LatestWins<ConversationKey>,
    results: mpsc::UnboundedSender<(ParticipantId, Feedback)>,
}

impl Summarizer {
    pub fn new(
        client: Client,
        config: Arc<LlmConfig>,
    ) -> (Self, mpsc::UnboundedReceiver<(ParticipantId, Feedback)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let summarizer = Summarizer {
            client,
            config,
            tasks: LatestWins::new(),
            results: tx,
        };
        (summarizer, rx)
    }

    /// Summarize `transcript`, the conversation about `id` during comparison `round`, in
    /// the background.
    pub fn summarize(&self, id: ParticipantId, round: usize, project_name: String, transcript: Vec<ChatMessage>) {
        let client = self.client.clone();
        let config = self.config.clone();
        let results = self.results.clone();
        let key = (id.clone(), round);

        self.tasks.spawn(key, async move {
            let messages = build_summary_messages(&transcript, &project_name);
            match complete(&client, &config, &messages).await {
                Ok(reply) => match extract_feedback(&reply) {
                    Some(feedback) => {
                        debug!(%id, round, "Summary ready");
                        let _ = results.send((id, feedback));
                    }
                    None => warn!(%id, "Summary reply had no usable feedback"),
                },
                Err(e) => warn!(%id, error = %e, "Summary request failed"),
            }
        });
    }

    /// Give in-flight summaries a chance to land before exiting.
    pub async fn finish(&self) {
        self.tasks.join_all().await;
    }

    pub fn pending(&self) -> usize {
        self.tasks.pending()
    }
}

impl Drop for Summarizer {
    fn drop(&mut self) {
        self.tasks.cancel_all();
    }
}
