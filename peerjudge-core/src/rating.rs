/// Online rating update for a single win/loss outcome.
///
/// A logistic (Bradley-Terry style) win probability drives a fixed-rate step on
/// strength; uncertainty decays for both sides because both have now been compared.
use crate::constants::{LEARNING_RATE, UNCERTAINTY_DECAY};
use crate::types::Rating;

/// P(a beats b) implied by the current strengths.
///
/// Equal to `exp(a) / (exp(a) + exp(b))`, written in the form that does not overflow.
pub fn win_probability(a: &Rating, b: &Rating) -> f64 {
    1.0 / (1.0 + (b.strength - a.strength).exp())
}

/// Apply one outcome. Returns `(new_winner, new_loser)`; inputs are not modified.
pub fn update(winner: &Rating, loser: &Rating) -> (Rating, Rating) {
    let p_win = win_probability(winner, loser);

    let new_winner = Rating {
        strength: winner.strength + LEARNING_RATE * (1.0 - p_win),
        uncertainty: winner.uncertainty * UNCERTAINTY_DECAY,
    };
    let new_loser = Rating {
        strength: loser.strength - LEARNING_RATE * p_win,
        uncertainty: loser.uncertainty * UNCERTAINTY_DECAY,
    };

    (new_winner, new_loser)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(strength: f64, uncertainty: f64) -> Rating {
        Rating { strength, uncertainty }
    }

    #[test]
    fn test_equal_strengths_move_symmetrically() {
        let (w, l) = update(&Rating::default(), &Rating::default());
        assert!((w.strength - 0.2).abs() < 1e-12);
        assert!((l.strength + 0.2).abs() < 1e-12);
        assert!((w.uncertainty - 0.9).abs() < 1e-12);
        assert!((l.uncertainty - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_matches_exponential_form() {
        let a = rating(0.7, 1.0);
        let b = rating(-0.3, 1.0);
        let expected = a.strength.exp() / (a.strength.exp() + b.strength.exp());
        assert!((win_probability(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let strong = rating(1.0, 1.0);
        let weak = rating(-1.0, 1.0);

        let (expected_w, _) = update(&strong, &weak);
        let (upset_w, _) = update(&weak, &strong);

        let expected_gain = expected_w.strength - strong.strength;
        let upset_gain = upset_w.strength - weak.strength;
        assert!(upset_gain > expected_gain);
        assert!(expected_gain > 0.0);
    }

    #[test]
    fn test_uncertainty_decays_regardless_of_outcome() {
        let a = rating(2.0, 0.5);
        let b = rating(-2.0, 0.25);
        let (w, l) = update(&b, &a);
        assert!((w.uncertainty - 0.225).abs() < 1e-12);
        assert!((l.uncertainty - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_uncertainty_monotonic_over_many_updates() {
        let mut a = Rating::default();
        let mut b = Rating::default();
        for i in 0..200 {
            let (prev_a, prev_b) = (a.uncertainty, b.uncertainty);
            let (x, y) = if i % 3 == 0 { update(&b, &a) } else { update(&a, &b) };
            if i % 3 == 0 {
                b = x;
                a = y;
            } else {
                a = x;
                b = y;
            }
            assert!(a.uncertainty <= prev_a && a.uncertainty >= 0.0);
            assert!(b.uncertainty <= prev_b && b.uncertainty >= 0.0);
        }
        assert!(a.uncertainty < 1e-6);
    }

    #[test]
    fn test_extreme_strengths_stay_finite() {
        let huge = rating(1.0e3, 1.0);
        let tiny = rating(-1.0e3, 1.0);
        let (w, l) = update(&tiny, &huge);
        assert!(w.strength.is_finite());
        assert!(l.strength.is_finite());
        // The upset is maximally surprising: nearly the full step.
        assert!((w.strength - (tiny.strength + LEARNING_RATE)).abs() < 1e-9);
    }
}
