/// Simulate command: how well does the comparison budget recover a known ranking?
///
/// Each trial draws hidden strengths, lets a synthetic judge vote (logistic noise on the
/// hidden strength gap), runs a full session, and measures rank agreement between the
/// hidden and recovered orders.
use std::sync::Arc;

use peerjudge_core::{JudgingSession, MemoryStore, Participant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub struct SimulationOptions {
    pub participants: usize,
    pub trials: usize,
    /// Standard deviation of hidden strengths. Larger = easier to tell apart.
    pub spread: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub participants: usize,
    pub trials: usize,
    pub mean_comparisons: f64,
    /// Mean Kendall tau between hidden and recovered strengths (1.0 = identical order).
    pub mean_kendall_tau: f64,
    /// Fraction of trials where the hidden best finished first.
    pub top1_accuracy: f64,
    /// Fraction of votes the synthetic judge gave to the weaker participant.
    pub upset_rate: f64,
}

/// Standard normal sample (Box-Muller).
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Kendall tau-a over paired observations. Pairs tied in either list count as neither.
pub fn kendall_tau(xs: &[f64], ys: &[f64]) -> f64 {
    assert_eq!(xs.len(), ys.len(), "kendall_tau needs equal-length inputs");
    let n = xs.len();
    if n < 2 {
        return 1.0;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let s = (xs[i] - xs[j]) * (ys[i] - ys[j]);
            if s > 0.0 {
                concordant += 1;
            } else if s < 0.0 {
                discordant += 1;
            }
        }
    }
    let total = (n * (n - 1) / 2) as f64;
    (concordant - discordant) as f64 / total
}

pub fn run_simulation(opts: &SimulationOptions) -> SimulationReport {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut total_comparisons = 0usize;
    let mut tau_sum = 0.0;
    let mut top1_hits = 0usize;
    let mut upsets = 0usize;

    for trial in 0..opts.trials {
        let hidden: Vec<f64> = (0..opts.participants)
            .map(|_| standard_normal(&mut rng) * opts.spread)
            .collect();
        let participants: Vec<Participant> = (0..opts.participants)
            .map(|i| Participant::new(format!("p{i:04}"), format!("Project {i}")))
            .collect();

        let mut session = JudgingSession::new(participants, Arc::new(MemoryStore::new()));
        session.start_judging();

        let mut ts = 0i64;
        while let Some((a, b)) = session.current_pair().cloned() {
            let (ia, ib) = (index_of(&a), index_of(&b));
            let p_a = 1.0 / (1.0 + (hidden[ib] - hidden[ia]).exp());
            let a_wins = rng.random::<f64>() < p_a;
            if a_wins != (hidden[ia] >= hidden[ib]) {
                upsets += 1;
            }
            let winner = if a_wins { a } else { b };
            session
                .record_vote_at(&winner, ts)
                .unwrap_or_else(|e| crate::bail(format!("Simulation vote rejected: {e}")));
            ts += 1;
        }

        let estimated: Vec<f64> = session
            .participants()
            .iter()
            .map(|p| session.rating(&p.id).map_or(0.0, |r| r.strength))
            .collect();
        tau_sum += kendall_tau(&hidden, &estimated);
        total_comparisons += session.comparisons().len();

        let hidden_best = argmax(&hidden);
        if let Some(top) = session.ranked().first() {
            if index_of(&top.participant.id) == hidden_best {
                top1_hits += 1;
            }
        }

        tracing::debug!(trial, comparisons = session.comparisons().len(), "Trial finished");
    }

    let trials = opts.trials.max(1) as f64;
    SimulationReport {
        participants: opts.participants,
        trials: opts.trials,
        mean_comparisons: total_comparisons as f64 / trials,
        mean_kendall_tau: tau_sum / trials,
        top1_accuracy: top1_hits as f64 / trials,
        upset_rate: if total_comparisons == 0 { 0.0 } else { upsets as f64 / total_comparisons as f64 },
    }
}

fn index_of(id: &str) -> usize {
    id.trim_start_matches('p')
        .parse()
        .unwrap_or_else(|_| panic!("Unexpected simulated participant ID: {id}"))
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

pub fn print_report(report: &SimulationReport) {
    println!(
        "{} participants, {} trials, {:.1} comparisons per session",
        report.participants, report.trials, report.mean_comparisons
    );
    println!("Kendall tau (hidden vs recovered): {:.3}", report.mean_kendall_tau);
    println!("Hidden best ranked first:          {:.1}%", report.top1_accuracy * 100.0);
    println!("Votes that went to the weaker side: {:.1}%", report.upset_rate * 100.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kendall_tau_extremes() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(kendall_tau(&xs, &[10.0, 20.0, 30.0, 40.0]), 1.0);
        assert_eq!(kendall_tau(&xs, &[4.0, 3.0, 2.0, 1.0]), -1.0);
        assert_eq!(kendall_tau(&[1.0], &[5.0]), 1.0);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 3.0, -2.0, 2.9]), 1);
    }

    #[test]
    fn test_simulation_runs_full_budget() {
        let report = run_simulation(&SimulationOptions {
            participants: 10,
            trials: 3,
            spread: 1.0,
            seed: Some(7),
        });
        assert_eq!(report.mean_comparisons, 15.0);
        assert!(report.mean_kendall_tau >= -1.0 && report.mean_kendall_tau <= 1.0);
        assert!((0.0..=1.0).contains(&report.top1_accuracy));
    }

    #[test]
    fn test_simulation_is_reproducible_with_seed() {
        let opts = SimulationOptions { participants: 8, trials: 2, spread: 2.0, seed: Some(42) };
        let a = run_simulation(&opts);
        let b = run_simulation(&opts);
        assert_eq!(a.mean_kendall_tau, b.mean_kendall_tau);
        assert_eq!(a.upset_rate, b.upset_rate);
    }

    #[test]
    fn test_well_separated_population_is_mostly_recovered() {
        let report = run_simulation(&SimulationOptions {
            participants: 12,
            trials: 20,
            spread: 50.0,
            seed: Some(1),
        });
        // Judge almost never errs, so the recovered order should agree far more than chance.
        assert!(report.upset_rate < 0.05);
        assert!(report.mean_kendall_tau > 0.3, "tau = {}", report.mean_kendall_tau);
    }
}
