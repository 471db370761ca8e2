/// Interactive judging from the terminal.
///
/// Shows two projects at a time and reads the judge's pick from stdin. With an assistant
/// configured, each project gets a streamed analysis first, the judge can ask follow-ups,
/// compare the pair side by side or have a presentation reviewed, and after every vote
/// both project conversations are summarized into feedback in the background.
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use peerjudge_core::{visible_participants, JudgingSession, Participant, Phase, Store};
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::bail;
use crate::llm::{stream_chat, ChatMessage, LlmConfig};
use crate::output::{format_card, format_feedback, format_table};
use crate::prompt::{
    build_compare_message, build_presentation_prompt, build_system_message, JudgingRules, INITIAL_PROMPT,
};
use crate::summarize::Summarizer;

/// LLM assistance for a judging session.
pub struct Assist {
    pub client: Client,
    pub config: Arc<LlmConfig>,
    pub rules: JudgingRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pick(Side),
    Ask(Side, String),
    Compare(String),
    Slides(Side),
    Quit,
    Help,
}

const HELP: &str = "  1 / 2            pick the winner
  ask 1 <text>     ask the assistant about project 1 (or 2)
  compare <text>   ask the assistant about both projects side by side
  slides 1         have the assistant review project 1's presentation (or 2)
  q                stop judging and show standings";

/// Parse one line of judge input. `None` means the line was not understood.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "1" => return Some(Command::Pick(Side::First)),
        "2" => return Some(Command::Pick(Side::Second)),
        "q" | "quit" | "exit" => return Some(Command::Quit),
        "?" | "h" | "help" => return Some(Command::Help),
        _ => {}
    }

    let (word, rest) = split_word(line);
    match word {
        "ask" => {
            let (side, question) = split_word(rest);
            let side = parse_side(side)?;
            (!question.is_empty()).then(|| Command::Ask(side, question.to_string()))
        }
        "compare" => (!rest.is_empty()).then(|| Command::Compare(rest.to_string())),
        "slides" => parse_side(rest).map(Command::Slides),
        _ => None,
    }
}

fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn parse_side(text: &str) -> Option<Side> {
    match text {
        "1" => Some(Side::First),
        "2" => Some(Side::Second),
        _ => None,
    }
}

/// First participant ID that occurs more than once, if any.
pub fn first_duplicate_id(participants: &[Participant]) -> Option<&str> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .map(|p| p.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Running conversation with the assistant.
struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    fn new(system: String) -> Self {
        Conversation {
            messages: vec![ChatMessage::system(system)],
        }
    }

    /// Ask a question, printing the streamed answer. Failures are reported and the
    /// question is dropped from the transcript.
    async fn ask(&mut self, assist: &Assist, question: &str) {
        self.messages.push(ChatMessage::user(question));
        let mut stdout = std::io::stdout();
        let result = stream_chat(&assist.client, &assist.config, &self.messages, |delta| {
            let _ = write!(stdout, "{delta}");
            let _ = stdout.flush();
        })
        .await;
        println!();

        match result {
            Ok(reply) => self.messages.push(ChatMessage::assistant(reply)),
            Err(e) => {
                self.messages.pop();
                warn!(error = %e, "Assistant request failed");
                eprintln!("(assistant unavailable: {e})");
            }
        }
    }

    /// Transcript worth summarizing, or `None` if the assistant never answered.
    fn transcript(&self) -> Option<Vec<ChatMessage>> {
        self.messages
            .iter()
            .any(|m| m.role == crate::llm::Role::Assistant)
            .then(|| self.messages.clone())
    }
}

pub async fn run_judge(store: Arc<dyn Store>, assist: Option<Assist>) {
    let snapshot = store
        .load_all()
        .unwrap_or_else(|e| bail(format!("Failed to load store: {e}")));
    let participants = visible_participants(&snapshot.participants);
    if let Some(id) = first_duplicate_id(&participants) {
        bail(format!("Participant ID {id} appears more than once in the store. Remove the duplicate before judging."));
    }

    let mut session = JudgingSession::new(participants, store.clone());
    if session.start_judging() == Phase::Leaderboard {
        eprintln!("Need at least 2 participants to judge. Add some with `peerjudge submit`.");
        return;
    }
    info!(
        participants = session.participants().len(),
        budget = session.budget(),
        assist = assist.is_some(),
        "Judging session started"
    );

    let (summarizer, mut summaries) = match &assist {
        Some(a) => {
            let (s, rx) = Summarizer::new(a.client.clone(), a.config.clone());
            (Some(s), Some(rx))
        }
        None => (None, None),
    };

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut quit = false;

    while let Some((id_a, id_b)) = session.current_pair().cloned() {
        let (pa, pb) = match (session.participant(&id_a), session.participant(&id_b)) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => bail(format!("Pair {id_a} / {id_b} is not in the session")),
        };

        println!(
            "\n=== Comparison {} of {} ===",
            session.comparisons().len() + 1,
            session.budget()
        );
        print!("{}", format_card("1", &pa));
        print!("{}", format_card("2", &pb));

        let mut conversations = assist.as_ref().map(|a| {
            (
                Conversation::new(build_system_message(&pa, &a.rules)),
                Conversation::new(build_system_message(&pb, &a.rules)),
            )
        });
        let mut side_by_side: Option<Conversation> = None;
        if let (Some(a), Some((conv_a, conv_b))) = (&assist, conversations.as_mut()) {
            println!("\n--- Assistant on {} ---", pa.project_name);
            conv_a.ask(a, INITIAL_PROMPT).await;
            println!("\n--- Assistant on {} ---", pb.project_name);
            conv_b.ask(a, INITIAL_PROMPT).await;
        }

        let winner = loop {
            print!("\nWinner? [1/2, ask 1|2 <q>, compare <q>, slides 1|2, ? for help, q] ");
            let _ = std::io::stdout().flush();

            let line = match input.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    quit = true;
                    break None;
                }
                Err(e) => bail(format!("Failed to read from stdin: {e}")),
            };

            match parse_command(&line) {
                Some(Command::Pick(Side::First)) => break Some(id_a.clone()),
                Some(Command::Pick(Side::Second)) => break Some(id_b.clone()),
                Some(Command::Quit) => {
                    quit = true;
                    break None;
                }
                Some(Command::Help) => println!("{HELP}"),
                Some(Command::Ask(side, question)) => match (&assist, conversations.as_mut()) {
                    (Some(a), Some((conv_a, conv_b))) => {
                        let conv = if side == Side::First { conv_a } else { conv_b };
                        conv.ask(a, &question).await;
                    }
                    _ => println!("No assistant configured. Run with --assist."),
                },
                Some(Command::Compare(question)) => match &assist {
                    Some(a) => {
                        let conv = side_by_side
                            .get_or_insert_with(|| Conversation::new(build_compare_message(&pa, &pb, &a.rules)));
                        conv.ask(a, &question).await;
                    }
                    None => println!("No assistant configured. Run with --assist."),
                },
                Some(Command::Slides(side)) => match (&assist, conversations.as_mut()) {
                    (Some(a), Some((conv_a, conv_b))) => {
                        let (p, conv) = if side == Side::First { (&pa, conv_a) } else { (&pb, conv_b) };
                        match build_presentation_prompt(p) {
                            Some(prompt) => conv.ask(a, &prompt).await,
                            None => println!("{} has no presentation link.", p.project_name),
                        }
                    }
                    _ => println!("No assistant configured. Run with --assist."),
                },
                None => println!("Not understood.\n{HELP}"),
            }
        };

        let Some(winner) = winner else { break };

        if let (Some(s), Some((conv_a, conv_b))) = (&summarizer, &conversations) {
            let round = session.comparisons().len();
            for (p, conv) in [(&pa, conv_a), (&pb, conv_b)] {
                if let Some(transcript) = conv.transcript() {
                    s.summarize(p.id.clone(), round, p.project_name.clone(), transcript);
                }
            }
        }

        if let Err(e) = session.record_vote(&winner) {
            bail(format!("Vote rejected: {e}"));
        }

        if let Some(rx) = summaries.as_mut() {
            while let Ok((id, feedback)) = rx.try_recv() {
                session.add_feedback(&id, &feedback);
            }
        }
    }

    if let (Some(s), Some(rx)) = (&summarizer, summaries.as_mut()) {
        if s.pending() > 0 {
            eprintln!("Waiting for {} feedback summaries...", s.pending());
        }
        s.finish().await;
        while let Ok((id, feedback)) = rx.try_recv() {
            session.add_feedback(&id, &feedback);
        }
    }

    if quit {
        println!("\nStopped after {} of {} comparisons.", session.comparisons().len(), session.budget());
    } else {
        println!("\nJudging complete.");
    }

    let ranked = session.ranked();
    println!("\n{}", format_table(&ranked, session.comparisons().len()));
    let feedback = format_feedback(&ranked, session.feedback());
    if !feedback.is_empty() {
        println!("Feedback:{feedback}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_picks_and_quit() {
        assert_eq!(parse_command(" 1 "), Some(Command::Pick(Side::First)));
        assert_eq!(parse_command("2"), Some(Command::Pick(Side::Second)));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("help"), Some(Command::Help));
    }

    #[test]
    fn test_parse_ask() {
        assert_eq!(
            parse_command("ask 2 How does it scale?"),
            Some(Command::Ask(Side::Second, "How does it scale?".into()))
        );
        assert_eq!(parse_command("ask 1"), None);
        assert_eq!(parse_command("ask 3 what?"), None);
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("12"), None);
        assert_eq!(parse_command("left"), None);
        assert_eq!(parse_command("asking 1 why"), None);
    }

    #[test]
    fn test_parse_compare_and_slides() {
        assert_eq!(
            parse_command("compare  Which one scales better? "),
            Some(Command::Compare("Which one scales better?".into()))
        );
        assert_eq!(parse_command("compare"), None);
        assert_eq!(parse_command("slides 1"), Some(Command::Slides(Side::First)));
        assert_eq!(parse_command("slides 2"), Some(Command::Slides(Side::Second)));
        assert_eq!(parse_command("slides"), None);
        assert_eq!(parse_command("slides 1 now"), None);
    }

    #[test]
    fn test_duplicate_ids_are_found() {
        let mut ps = vec![
            Participant::new("team-1", "Alpha"),
            Participant::new("team-2", "Beta"),
            Participant::new("team-3", "Gamma"),
        ];
        assert_eq!(first_duplicate_id(&ps), None);

        ps.push(Participant::seed("team-2", "Beta again"));
        assert_eq!(first_duplicate_id(&ps), Some("team-2"));
    }
}
