/// Normalized 0..=100 rankings, for one judge's session or pooled across every judge.
use std::collections::HashSet;

use crate::constants::{MAX_SCORE, UNIFORM_SCORE};
use crate::rating::update;
use crate::store::{visible_participants, StoreSnapshot};
use crate::types::{Comparison, Participant, RankedParticipant, Ratings};

/// Rank `participants` by strength, scoring each on a 0..=100 scale.
///
/// The scale spans the min..max strength of exactly these participants. When every
/// strength is equal the scale is undefined and everyone gets `UNIFORM_SCORE` (50).
/// Sorted by score descending; equal scores keep input order.
///
/// Panics if a participant has no rating: the caller owns that invariant.
pub fn rank(ratings: &Ratings, participants: &[Participant]) -> Vec<RankedParticipant> {
    let strengths: Vec<f64> = participants
        .iter()
        .map(|p| {
            ratings
                .get(&p.id)
                .unwrap_or_else(|| panic!("No rating for participant: {}", p.id))
                .strength
        })
        .collect();

    let min = strengths.iter().copied().fold(f64::INFINITY, f64::min);
    let max = strengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut ranked: Vec<RankedParticipant> = participants
        .iter()
        .zip(&strengths)
        .map(|(p, &strength)| RankedParticipant {
            participant: p.clone(),
            score: normalize(strength, min, max),
            strength,
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Map `strength` into 0..=100 relative to `[min, max]`.
pub fn normalize(strength: f64, min: f64, max: f64) -> u32 {
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return UNIFORM_SCORE;
    }
    let scaled = ((strength - min) / range * MAX_SCORE as f64).round();
    scaled.clamp(0.0, MAX_SCORE as f64) as u32
}

/// Rebuild ratings from scratch by replaying comparisons in chronological order.
///
/// Every participant starts at the prior. Comparisons touching anyone outside
/// `participants` are skipped. Replay is ordered by timestamp; equal timestamps keep
/// their stored order. The update rule is order-dependent, so this is recomputed in
/// full every time rather than cached.
pub fn pooled_ratings(participants: &[Participant], comparisons: &[Comparison]) -> Ratings {
    let mut ratings: Ratings = participants
        .iter()
        .map(|p| (p.id.clone(), Default::default()))
        .collect();

    let known: HashSet<&str> = participants.iter().map(|p| p.id.as_str()).collect();

    let mut replay: Vec<&Comparison> = comparisons
        .iter()
        .filter(|c| known.contains(c.winner_id.as_str()) && known.contains(c.loser_id.as_str()))
        .filter(|c| c.winner_id != c.loser_id)
        .collect();
    replay.sort_by_key(|c| c.timestamp);

    for c in replay {
        let (w, l) = update(&ratings[&c.winner_id], &ratings[&c.loser_id]);
        ratings.insert(c.winner_id.clone(), w);
        ratings.insert(c.loser_id.clone(), l);
    }

    ratings
}

/// Cross-judge leaderboard.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PooledRanking {
    pub ranked: Vec<RankedParticipant>,
    /// Every persisted vote, including ones outside the visible population.
    pub total_votes: usize,
}

/// Rank the visible population using every judge's persisted votes.
pub fn pooled_ranking(snapshot: &StoreSnapshot) -> PooledRanking {
    let visible = visible_participants(&snapshot.participants);
    let ratings = pooled_ratings(&visible, &snapshot.comparisons);
    PooledRanking {
        ranked: rank(&ratings, &visible),
        total_votes: snapshot.comparisons.len(),
    }
}
