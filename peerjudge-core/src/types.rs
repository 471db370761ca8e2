use std::collections::{BTreeMap, HashSet};

use crate::constants::{INITIAL_STRENGTH, INITIAL_UNCERTAINTY};

/// Participant identifier. Stable and unique across the store (e.g. `team-1718000000000`).
pub type ParticipantId = String;

/// A pairing: two participant IDs to be compared, lower ID first.
pub type Pair = (ParticipantId, ParticipantId);

/// Ratings keyed by participant ID. Ordered so that pair enumeration is lexical.
pub type Ratings = BTreeMap<ParticipantId, Rating>;

/// A submitted project and the team behind it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Participant {
    pub id: ParticipantId,
    pub project_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub team_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub team_members: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub demo_url: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub presentation_url: Option<String>,
    /// Placeholder entry used only to pad a small population. Persisted as `seed`.
    #[cfg_attr(feature = "serde", serde(default, rename = "seed"))]
    pub is_seed: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, project_name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    pub fn seed(id: impl Into<ParticipantId>, project_name: impl Into<String>) -> Self {
        Participant {
            is_seed: true,
            ..Participant::new(id, project_name)
        }
    }
}

/// Strength estimate plus how little we know about it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rating {
    /// Relative skill. Only differences between participants are meaningful.
    pub strength: f64,
    /// Starts at 1.0 and decays with every comparison the participant takes part in.
    pub uncertainty: f64,
}

impl Default for Rating {
    fn default() -> Self {
        Rating {
            strength: INITIAL_STRENGTH,
            uncertainty: INITIAL_UNCERTAINTY,
        }
    }
}

/// One logged judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Comparison {
    pub winner_id: ParticipantId,
    pub loser_id: ParticipantId,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

impl Comparison {
    pub fn new(winner_id: impl Into<ParticipantId>, loser_id: impl Into<ParticipantId>, timestamp: i64) -> Self {
        Comparison {
            winner_id: winner_id.into(),
            loser_id: loser_id.into(),
            timestamp,
        }
    }

    /// The unordered pair this comparison covers, lower ID first.
    pub fn pair_key(&self) -> (&str, &str) {
        ordered(&self.winner_id, &self.loser_id)
    }
}

pub(crate) fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Free-text judge feedback for one participant.
///
/// Storage keeps every entry, duplicates included; `deduplicated()` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feedback {
    #[cfg_attr(feature = "serde", serde(default))]
    pub strengths: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weaknesses: Vec<String>,
}

impl Feedback {
    pub fn new(strengths: Vec<String>, weaknesses: Vec<String>) -> Self {
        Feedback { strengths, weaknesses }
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty() && self.weaknesses.is_empty()
    }

    /// Append another batch of feedback (concatenation, never replacement).
    pub fn merge(&mut self, other: &Feedback) {
        self.strengths.extend(other.strengths.iter().cloned());
        self.weaknesses.extend(other.weaknesses.iter().cloned());
    }

    /// Copy with repeated entries removed, keeping first occurrences in order.
    pub fn deduplicated(&self) -> Feedback {
        Feedback {
            strengths: dedup_preserving_order(&self.strengths),
            weaknesses: dedup_preserving_order(&self.weaknesses),
        }
    }
}

fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// A participant with its normalized 0..=100 display score.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedParticipant {
    pub participant: Participant,
    pub score: u32,
    pub strength: f64,
}
