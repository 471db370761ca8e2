/// peerjudge-core: Adaptive pairwise rating engine.
///
/// Judge picks a winner → ratings move → the next most informative unseen pair is chosen,
/// until a budget of ceil(3n/2) comparisons (or the supply of unseen pairs) runs out.
/// No async, no HTTP. Persistence goes through the `Store` trait you inject.
///
/// Participants are identified by caller-provided string IDs.
///
/// # Quick start
///
/// ```rust
/// use std::sync::Arc;
/// use peerjudge_core::{JudgingSession, MemoryStore, Participant, Phase};
///
/// let participants = vec![
///     Participant::new("team-1", "Solar Scheduler"),
///     Participant::new("team-2", "Bin Sorter"),
///     Participant::new("team-3", "Transit Pulse"),
/// ];
///
/// let mut session = JudgingSession::new(participants, Arc::new(MemoryStore::new()));
/// session.start_judging();
///
/// while let Some((left, _right)) = session.current_pair().cloned() {
///     // Ask a human. Here the left-hand project always wins.
///     session.record_vote(&left).unwrap();
/// }
///
/// assert_eq!(session.phase(), Phase::Leaderboard);
/// for r in session.ranked() {
///     println!("{:>3}  {}", r.score, r.participant.project_name);
/// }
/// ```

pub mod constants;
pub mod pairing;
pub mod rating;
pub mod scoring;
pub mod session;
pub mod store;
pub mod types;

// Re-export primary public API at crate root.
pub use pairing::{select_next_pair, total_comparisons};
pub use rating::{update, win_probability};
pub use scoring::{pooled_ranking, pooled_ratings, rank, PooledRanking};
pub use session::{JudgingSession, Phase, SessionError};
pub use store::{visible_participants, MemoryStore, Store, StoreError, StoreSnapshot};
pub use types::{Comparison, Feedback, Pair, Participant, ParticipantId, RankedParticipant, Rating, Ratings};
