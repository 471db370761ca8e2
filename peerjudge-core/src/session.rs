/// One judge's judging session.
///
/// Owns the ratings, comparison log and current pair for a single judge and drives the
/// vote → update → select loop. Votes are persisted through the injected `Store`
/// best-effort: a failed write is logged and the session carries on.
///
/// Sessions are driven by one judge, one call at a time (`&mut self`); there is no
/// internal locking.
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::pairing::{select_next_pair, total_comparisons};
use crate::rating::update;
use crate::scoring::rank;
use crate::store::Store;
use crate::types::{Comparison, Feedback, Pair, Participant, ParticipantId, RankedParticipant, Rating, Ratings};

/// Lifecycle of a session. Linear: a finished session is replaced, not restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    Dashboard,
    Judging,
    Leaderboard,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no pair is awaiting a vote")]
    NoCurrentPair,
    #[error("{winner} is not part of the current pair {pair:?}")]
    NotInCurrentPair { winner: ParticipantId, pair: Pair },
}

pub struct JudgingSession {
    participants: Vec<Participant>,
    ratings: Ratings,
    comparisons: Vec<Comparison>,
    feedback: BTreeMap<ParticipantId, Feedback>,
    current_pair: Option<Pair>,
    phase: Phase,
    budget: usize,
    store: Arc<dyn Store>,
}

impl JudgingSession {
    /// New session over `participants`, every one at the prior rating.
    ///
    /// Panics on duplicate participant IDs.
    pub fn new(participants: Vec<Participant>, store: Arc<dyn Store>) -> Self {
        let mut ratings = Ratings::new();
        for p in &participants {
            let prev = ratings.insert(p.id.clone(), Rating::default());
            assert!(prev.is_none(), "Duplicate participant ID: {}", p.id);
        }
        let budget = total_comparisons(participants.len());

        JudgingSession {
            participants,
            ratings,
            comparisons: Vec::new(),
            feedback: BTreeMap::new(),
            current_pair: None,
            phase: Phase::Dashboard,
            budget,
            store,
        }
    }

    /// Begin judging. Goes straight to the leaderboard when no pair can be formed
    /// (fewer than two participants).
    pub fn start_judging(&mut self) -> Phase {
        self.budget = total_comparisons(self.participants.len());
        debug!(
            participants = self.participants.len(),
            budget = self.budget,
            "Starting judging session"
        );
        self.advance();
        self.phase
    }

    /// Record a vote for the current pair, stamped with the current wall-clock time.
    ///
    /// Returns the next pair, or `None` once judging is over.
    pub fn record_vote(&mut self, winner_id: &str) -> Result<Option<Pair>, SessionError> {
        self.record_vote_at(winner_id, chrono::Utc::now().timestamp_millis())
    }

    /// Record a vote with an explicit timestamp (Unix milliseconds).
    pub fn record_vote_at(&mut self, winner_id: &str, timestamp: i64) -> Result<Option<Pair>, SessionError> {
        let (a, b) = self.current_pair.clone().ok_or(SessionError::NoCurrentPair)?;
        let loser_id = if winner_id == a {
            b
        } else if winner_id == b {
            a
        } else {
            return Err(SessionError::NotInCurrentPair {
                winner: winner_id.to_string(),
                pair: (a, b),
            });
        };

        let (new_winner, new_loser) = update(self.rating_of(winner_id), self.rating_of(&loser_id));
        self.ratings.insert(winner_id.to_string(), new_winner);
        self.ratings.insert(loser_id.clone(), new_loser);

        let comparison = Comparison::new(winner_id, loser_id, timestamp);
        if let Err(e) = self.store.append_comparison(&comparison) {
            warn!(error = %e, winner = %comparison.winner_id, loser = %comparison.loser_id, "Failed to persist vote");
        }
        self.comparisons.push(comparison);

        debug!(
            done = self.comparisons.len(),
            budget = self.budget,
            "Vote recorded"
        );

        self.advance();
        Ok(self.current_pair.clone())
    }

    /// Add a participant mid-session. It starts at the prior and the budget grows with it.
    ///
    /// Panics if the ID is already known.
    pub fn add_participant(&mut self, participant: Participant) {
        let prev = self.ratings.insert(participant.id.clone(), Rating::default());
        assert!(prev.is_none(), "Duplicate participant ID: {}", participant.id);

        if let Err(e) = self.store.add_participant(&participant) {
            warn!(error = %e, id = %participant.id, "Failed to persist participant");
        }
        self.participants.push(participant);
        self.budget = total_comparisons(self.participants.len());
    }

    /// Merge feedback for a participant into the session and persist it.
    pub fn add_feedback(&mut self, id: &str, feedback: &Feedback) {
        if feedback.is_empty() {
            return;
        }
        self.feedback.entry(id.to_string()).or_default().merge(feedback);
        if let Err(e) = self.store.append_feedback(id, feedback) {
            warn!(error = %e, id, "Failed to persist feedback");
        }
    }

    /// Current standings of this session's participants.
    pub fn ranked(&self) -> Vec<RankedParticipant> {
        rank(&self.ratings, &self.participants)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_pair(&self) -> Option<&Pair> {
        self.current_pair.as_ref()
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    pub fn rating(&self, id: &str) -> Option<&Rating> {
        self.ratings.get(id)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn feedback(&self) -> &BTreeMap<ParticipantId, Feedback> {
        &self.feedback
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    fn rating_of(&self, id: &str) -> &Rating {
        self.ratings
            .get(id)
            .unwrap_or_else(|| panic!("No rating for participant: {}", id))
    }

    fn advance(&mut self) {
        match select_next_pair(&self.ratings, &self.comparisons, self.budget) {
            Some(pair) => {
                self.current_pair = Some(pair);
                self.phase = Phase::Judging;
            }
            None => {
                self.current_pair = None;
                self.phase = Phase::Leaderboard;
                debug!(comparisons = self.comparisons.len(), "Judging complete");
            }
        }
    }
}
