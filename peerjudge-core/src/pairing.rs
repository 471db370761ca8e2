/// Next-pair selection and the comparison budget.
///
/// Each step asks the one unseen pair whose members we know least about. Selection is
/// deterministic: ties go to the first pair in lexical ID order.
use std::collections::HashSet;

use crate::types::{Comparison, Pair, Ratings};

/// Total comparisons allowed for a population of `num_items`: ceil(3n / 2).
///
/// Roughly three appearances per participant while staying linear in n.
pub fn total_comparisons(num_items: usize) -> usize {
    (3 * num_items).div_ceil(2)
}

/// Pick the next pair to compare, or `None` when judging is over.
///
/// Judging is over when the history has reached `budget`, or when every unordered pair
/// among `ratings` has already been asked. Pairs are never repeated.
///
/// Among eligible pairs the one with the greatest summed uncertainty wins. Enumeration is
/// ascending by ID (outer loop first member, inner loop second), and only a strictly
/// greater score replaces the current best.
pub fn select_next_pair(ratings: &Ratings, history: &[Comparison], budget: usize) -> Option<Pair> {
    if history.len() >= budget {
        return None;
    }

    let compared: HashSet<(&str, &str)> = history.iter().map(Comparison::pair_key).collect();

    let entries: Vec<(&String, f64)> = ratings
        .iter()
        .map(|(id, r)| (id, r.uncertainty))
        .collect();

    let mut best: Option<(&String, &String)> = None;
    let mut best_score = f64::NEG_INFINITY;

    for (i, &(id_a, u_a)) in entries.iter().enumerate() {
        for &(id_b, u_b) in &entries[i + 1..] {
            if compared.contains(&(id_a.as_str(), id_b.as_str())) {
                continue;
            }
            let score = u_a + u_b;
            if score > best_score {
                best_score = score;
                best = Some((id_a, id_b));
            }
        }
    }

    best.map(|(a, b)| (a.clone(), b.clone()))
}

/// Number of distinct unordered pairs in a population of `num_items`.
#[cfg(test)]
pub(crate) fn unique_pairs(num_items: usize) -> usize {
    num_items * num_items.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rating;

    fn ratings_of(entries: &[(&str, f64)]) -> Ratings {
        entries
            .iter()
            .map(|&(id, u)| (id.to_string(), Rating { strength: 0.0, uncertainty: u }))
            .collect()
    }

    #[test]
    fn test_budget_values() {
        assert_eq!(total_comparisons(0), 0);
        assert_eq!(total_comparisons(1), 2);
        assert_eq!(total_comparisons(2), 3);
        assert_eq!(total_comparisons(10), 15);
        assert_eq!(total_comparisons(11), 17);
    }

    #[test]
    fn test_unique_pairs() {
        assert_eq!(unique_pairs(0), 0);
        assert_eq!(unique_pairs(1), 0);
        assert_eq!(unique_pairs(2), 1);
        assert_eq!(unique_pairs(10), 45);
    }

    #[test]
    fn test_ties_pick_first_lexical_pair() {
        let ratings = ratings_of(&[("c", 1.0), ("a", 1.0), ("b", 1.0)]);
        let pair = select_next_pair(&ratings, &[], 10);
        assert_eq!(pair, Some(("a".to_string(), "b".to_string())));
    }

    #[test]
    fn test_prefers_most_uncertain_pair() {
        let ratings = ratings_of(&[("a", 0.5), ("b", 1.0), ("c", 0.9), ("d", 0.2)]);
        let pair = select_next_pair(&ratings, &[], 10);
        assert_eq!(pair, Some(("b".to_string(), "c".to_string())));
    }

    #[test]
    fn test_skips_pairs_in_either_order() {
        let ratings = ratings_of(&[("a", 1.0), ("b", 1.0), ("c", 0.1)]);
        let history = vec![Comparison::new("b", "a", 1)];
        let pair = select_next_pair(&ratings, &history, 10);
        assert_eq!(pair, Some(("a".to_string(), "c".to_string())));
    }

    #[test]
    fn test_budget_exhausted_returns_none() {
        let ratings = ratings_of(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        let history = vec![Comparison::new("a", "b", 1)];
        assert_eq!(select_next_pair(&ratings, &history, 1), None);
        assert_eq!(select_next_pair(&ratings, &[], 0), None);
    }

    #[test]
    fn test_all_pairs_exhausted_before_budget_returns_none() {
        let ratings = ratings_of(&[("a", 1.0), ("b", 1.0)]);
        let history = vec![Comparison::new("a", "b", 1)];
        assert_eq!(select_next_pair(&ratings, &history, total_comparisons(2)), None);
    }

    #[test]
    fn test_degenerate_populations() {
        assert_eq!(select_next_pair(&Ratings::new(), &[], 5), None);
        let one = ratings_of(&[("solo", 1.0)]);
        assert_eq!(select_next_pair(&one, &[], 5), None);
    }

    #[test]
    fn test_history_with_unknown_ids_is_harmless() {
        let ratings = ratings_of(&[("a", 1.0), ("b", 1.0)]);
        let history = vec![Comparison::new("x", "y", 1)];
        assert_eq!(select_next_pair(&ratings, &history, 5), Some(("a".to_string(), "b".to_string())));
    }
}
