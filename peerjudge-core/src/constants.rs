/// Learning rate applied to the surprise term of each rating update.
/// A win the model already expected moves strengths little; an upset moves them up to K.
pub const LEARNING_RATE: f64 = 0.4;

/// Multiplicative decay applied to both participants' uncertainty after every comparison,
/// regardless of who won.
pub const UNCERTAINTY_DECAY: f64 = 0.9;

/// Strength assigned to a participant the moment it becomes known.
pub const INITIAL_STRENGTH: f64 = 0.0;

/// Uncertainty assigned to a participant the moment it becomes known.
pub const INITIAL_UNCERTAINTY: f64 = 1.0;

/// Number of participants shown before seed entries stop being used as padding.
///
/// Below this many real submissions, seed participants (in storage order) fill
/// the visible population up to exactly this size.
pub const MIN_VISIBLE_PARTICIPANTS: usize = 10;

/// Display score given to every participant when all strengths are equal
/// (no comparisons yet, or a single participant).
pub const UNIFORM_SCORE: u32 = 50;

/// Upper bound of the normalized display score.
pub const MAX_SCORE: u32 = 100;
