/// Output formatting: terminal tables and JSON.
use std::collections::BTreeMap;

use peerjudge_core::{Feedback, Participant, ParticipantId, RankedParticipant};
use serde::Serialize;

#[derive(Serialize)]
struct JsonRankedItem<'a> {
    rank: usize,
    id: &'a str,
    project_name: &'a str,
    team_name: &'a str,
    score: u32,
    strength: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<Feedback>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    items: Vec<JsonRankedItem<'a>>,
    total_votes: usize,
}

/// Render a leaderboard as a terminal table.
pub fn format_table(ranked: &[RankedParticipant], total_votes: usize) -> String {
    let name_width = ranked
        .iter()
        .map(|r| r.participant.project_name.chars().count())
        .max()
        .unwrap_or(7)
        .max(7); // at least "Project"
    let team_width = ranked
        .iter()
        .map(|r| r.participant.team_name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = String::new();
    out.push_str(&format!(
        " # | {:<name_width$} | {:<team_width$} | Score | Strength\n",
        "Project", "Team"
    ));
    out.push_str(&format!(
        "---|-{}-|-{}-|-------|---------\n",
        "-".repeat(name_width),
        "-".repeat(team_width)
    ));

    for (i, r) in ranked.iter().enumerate() {
        let seed = if r.participant.is_seed { " *" } else { "" };
        out.push_str(&format!(
            "{:>2} | {:<name_width$} | {:<team_width$} | {:>5} | {:>8.3}{seed}\n",
            i + 1,
            r.participant.project_name,
            r.participant.team_name,
            r.score,
            r.strength,
        ));
    }

    out.push_str(&format!("\n{} projects ranked from {} votes\n", ranked.len(), total_votes));
    if ranked.iter().any(|r| r.participant.is_seed) {
        out.push_str("* placeholder entry\n");
    }
    out
}

/// Render stored feedback, duplicates removed, in leaderboard order.
pub fn format_feedback(ranked: &[RankedParticipant], feedback: &BTreeMap<ParticipantId, Feedback>) -> String {
    let mut out = String::new();
    for r in ranked {
        let Some(fb) = feedback.get(&r.participant.id) else {
            continue;
        };
        let fb = fb.deduplicated();
        if fb.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n", r.participant.project_name));
        for s in &fb.strengths {
            out.push_str(&format!("  + {s}\n"));
        }
        for w in &fb.weaknesses {
            out.push_str(&format!("  - {w}\n"));
        }
    }
    out
}

/// Short card shown for each side of a matchup.
pub fn format_card(label: &str, p: &Participant) -> String {
    let mut out = format!("[{label}] {}", p.project_name);
    if !p.team_name.is_empty() {
        out.push_str(&format!(" by {}", p.team_name));
    }
    if !p.team_members.is_empty() {
        out.push_str(&format!(" ({})", p.team_members.join(", ")));
    }
    out.push('\n');
    if !p.description.is_empty() {
        out.push_str(&format!("    {}\n", p.description));
    }
    if !p.demo_url.is_empty() {
        out.push_str(&format!("    demo: {}\n", p.demo_url));
    }
    if let Some(ref url) = p.presentation_url {
        out.push_str(&format!("    slides: {url}\n"));
    }
    out
}

/// Leaderboard as pretty JSON, with deduplicated feedback attached per project.
pub fn format_json(
    ranked: &[RankedParticipant],
    feedback: &BTreeMap<ParticipantId, Feedback>,
    total_votes: usize,
) -> String {
    let items = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| JsonRankedItem {
            rank: i + 1,
            id: &r.participant.id,
            project_name: &r.participant.project_name,
            team_name: &r.participant.team_name,
            score: r.score,
            strength: r.strength,
            feedback: feedback.get(&r.participant.id).map(Feedback::deduplicated),
        })
        .collect();

    let output = JsonOutput { items, total_votes };
    serde_json::to_string_pretty(&output).unwrap_or_else(|e| crate::bail(format!("Failed to encode JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked_entry(id: &str, name: &str, score: u32, seed: bool) -> RankedParticipant {
        let mut participant = Participant::new(id, name);
        participant.team_name = "Crew".into();
        participant.is_seed = seed;
        RankedParticipant { participant, score, strength: score as f64 / 100.0 }
    }

    #[test]
    fn test_table_lists_in_order_and_marks_seeds() {
        let ranked = vec![ranked_entry("a", "Alpha", 100, false), ranked_entry("s", "Seedling", 0, true)];
        let table = format_table(&ranked, 3);
        let alpha = table.find("Alpha").unwrap();
        let seed = table.find("Seedling").unwrap();
        assert!(alpha < seed);
        assert!(table.contains("2 projects ranked from 3 votes"));
        assert!(table.contains("* placeholder entry"));
    }

    #[test]
    fn test_feedback_is_deduplicated() {
        let ranked = vec![ranked_entry("a", "Alpha", 100, false), ranked_entry("b", "Beta", 0, false)];
        let mut feedback = BTreeMap::new();
        feedback.insert(
            "a".to_string(),
            Feedback::new(vec!["Fast".into(), "Fast".into()], vec!["Thin docs".into()]),
        );
        let text = format_feedback(&ranked, &feedback);
        assert_eq!(text.matches("+ Fast").count(), 1);
        assert!(text.contains("- Thin docs"));
        assert!(!text.contains("Beta"));
    }

    #[test]
    fn test_json_output_shape() {
        let ranked = vec![ranked_entry("a", "Alpha", 100, false)];
        let json: serde_json::Value = serde_json::from_str(&format_json(&ranked, &BTreeMap::new(), 1)).unwrap();
        assert_eq!(json["total_votes"], 1);
        assert_eq!(json["items"][0]["rank"], 1);
        assert_eq!(json["items"][0]["project_name"], "Alpha");
        assert!(json["items"][0].get("feedback").is_none());
    }

    #[test]
    fn test_card_shows_available_fields() {
        let mut p = Participant::new("a", "Alpha");
        p.description = "Routes buses".into();
        let card = format_card("1", &p);
        assert!(card.starts_with("[1] Alpha"));
        assert!(card.contains("Routes buses"));
        assert!(!card.contains("demo:"));
    }
}
