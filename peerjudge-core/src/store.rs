/// Storage port for participants, votes and feedback shared by every judge.
///
/// The session only ever talks to `dyn Store`; concrete backends live with the caller
/// (an in-memory one is provided here for tests and simulations).
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::constants::MIN_VISIBLE_PARTICIPANTS;
use crate::types::{Comparison, Feedback, Participant, ParticipantId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contents are malformed: {0}")]
    Format(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("participant {0} already exists")]
    DuplicateParticipant(ParticipantId),
}

/// Everything the store holds, as loaded in one read.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreSnapshot {
    pub participants: Vec<Participant>,
    /// Votes in the order they were appended.
    pub comparisons: Vec<Comparison>,
    pub feedback: BTreeMap<ParticipantId, Feedback>,
}

impl StoreSnapshot {
    /// Concatenate `feedback` onto whatever is stored for `id`.
    pub fn merge_feedback(&mut self, id: &str, feedback: &Feedback) {
        self.feedback.entry(id.to_string()).or_default().merge(feedback);
    }
}

/// Keyed-record store with load and append semantics.
///
/// Implementations are shared across judges and must be safe to call from several threads.
/// Appends are independent read-modify-write operations; nothing here groups them into
/// transactions.
pub trait Store: Send + Sync {
    fn load_all(&self) -> Result<StoreSnapshot, StoreError>;

    fn append_comparison(&self, comparison: &Comparison) -> Result<(), StoreError>;

    /// Merges by concatenation, never replacement.
    fn append_feedback(&self, id: &str, feedback: &Feedback) -> Result<(), StoreError>;

    /// Fails with `DuplicateParticipant` if the ID is already stored.
    fn add_participant(&self, participant: &Participant) -> Result<(), StoreError>;
}

/// Participants to show and judge.
///
/// Once there are `MIN_VISIBLE_PARTICIPANTS` real submissions only those are shown.
/// Below that, seed entries are appended in storage order to pad up to the threshold.
pub fn visible_participants(all: &[Participant]) -> Vec<Participant> {
    let real: Vec<Participant> = all.iter().filter(|p| !p.is_seed).cloned().collect();
    if real.len() >= MIN_VISIBLE_PARTICIPANTS {
        return real;
    }

    let needed = MIN_VISIBLE_PARTICIPANTS - real.len();
    let seeds = all.iter().filter(|p| p.is_seed).take(needed).cloned();
    real.into_iter().chain(seeds).collect()
}

/// In-process store. All mutations go through one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreSnapshot> {
        // A panic mid-append leaves a complete snapshot behind, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    fn load_all(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.lock().clone())
    }

    fn append_comparison(&self, comparison: &Comparison) -> Result<(), StoreError> {
        self.lock().comparisons.push(comparison.clone());
        Ok(())
    }

    fn append_feedback(&self, id: &str, feedback: &Feedback) -> Result<(), StoreError> {
        self.lock().merge_feedback(id, feedback);
        Ok(())
    }

    fn add_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.participants.iter().any(|p| p.id == participant.id) {
            return Err(StoreError::DuplicateParticipant(participant.id.clone()));
        }
        inner.participants.push(participant.clone());
        Ok(())
    }
}
