/// Prompt building for the judging assistant and the feedback summarizer.
use std::path::Path;

use peerjudge_core::Participant;

use crate::bail;

/// Judging criteria used when no rulebook file is configured.
pub const DEFAULT_RULEBOOK: &str = "\
Judging Criteria
  - Innovation (25%): Originality of the idea and approach.
  - Technical Execution (25%): Code quality, architecture, and completeness.
  - Design & UX (25%): Usability, visual design, and accessibility.
  - Impact (25%): Real-world potential and scalability.

Minimum Requirements
  - A working demo accessible via a public URL.
  - Source code in the provided Git repository.
  - A brief README with project description and tech stack.";

/// First question put to the assistant for every project.
pub const INITIAL_PROMPT: &str = "Analyze this project. Briefly summarize it, then evaluate how it aligns \
with the judging criteria (Innovation, Technical Execution, Design & UX, Impact). \
Note key strengths and concerns.";

/// Load a rulebook or challenge brief from a text file.
pub fn load_rulebook(path: &Path) -> String {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read rulebook {}: {e}", path.display())));
    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail(format!("Rulebook {} is empty", path.display()));
    }
    trimmed.to_string()
}

/// What the assistant judges against: general criteria plus an optional challenge brief.
#[derive(Debug, Clone)]
pub struct JudgingRules {
    pub criteria: String,
    pub challenge: Option<String>,
}

impl JudgingRules {
    pub fn new(criteria: impl Into<String>, challenge: Option<String>) -> Self {
        JudgingRules {
            criteria: criteria.into(),
            challenge,
        }
    }

    fn section(&self) -> String {
        let mut out = format!("JUDGING CRITERIA:\n{}\n", self.criteria);
        if let Some(ref brief) = self.challenge {
            out.push_str(&format!("\nCHALLENGE BRIEF:\n{brief}\n"));
        }
        out
    }
}

impl Default for JudgingRules {
    fn default() -> Self {
        JudgingRules::new(DEFAULT_RULEBOOK, None)
    }
}

fn project_block(p: &Participant) -> String {
    let members = if p.team_members.is_empty() {
        String::new()
    } else {
        format!(" ({})", p.team_members.join(", "))
    };
    let mut out = format!(
        "- Name: {}\n- Team: {}{members}\n- Description: {}\n- Demo: {}\n",
        p.project_name, p.team_name, p.description, p.demo_url
    );
    if let Some(ref url) = p.presentation_url {
        out.push_str(&format!("- Presentation: {url}\n"));
    }
    out
}

/// System message framing the assistant around one project.
pub fn build_system_message(p: &Participant, rules: &JudgingRules) -> String {
    format!(
        "You are a hackathon judging assistant helping a judge evaluate a project.\n\n\
         PROJECT:\n{project}\n\
         {rules}\n\
         Help the judge evaluate this project. Be concise and direct. \
         Use short paragraphs and bullet points.",
        project = project_block(p),
        rules = rules.section(),
    )
}

/// System message for a side-by-side conversation about both projects of a pair.
pub fn build_compare_message(first: &Participant, second: &Participant, rules: &JudgingRules) -> String {
    let slides_note = if first.presentation_url.is_some() || second.presentation_url.is_some() {
        "For any project with a Presentation URL, read the presentation and use it as \
         primary context for your comparison.\n\n"
    } else {
        ""
    };
    format!(
        "You are a hackathon judging assistant helping a judge compare two projects side by side.\n\n\
         PROJECT 1:\n{a}\n\
         PROJECT 2:\n{b}\n\
         {slides_note}{rules}\n\
         Help the judge compare these projects. Be concise and balanced. \
         Use short paragraphs and bullet points.",
        a = project_block(first),
        b = project_block(second),
        rules = rules.section(),
    )
}

/// Question asking for a structured review of the project's presentation, if it has one.
pub fn build_presentation_prompt(p: &Participant) -> Option<String> {
    let url = p.presentation_url.as_deref()?;
    Some(format!(
        "Read the presentation at: {url}\n\n\
         Based on the presentation content, give a structured evaluation:\n\
         1. Presentation Summary: what does the presentation cover?\n\
         2. Strengths: what stands out positively?\n\
         3. Weaknesses / Gaps: what is missing or could be improved?\n\
         4. Alignment with Criteria: how well does it match the judging criteria?\n\n\
         Be concise and use bullet points."
    ))
}

/// Instruction appended to a transcript to extract feedback as strict JSON.
pub fn build_summary_instruction(project_name: &str) -> String {
    format!(
        "Based on the conversation above, extract concise feedback for \"{project_name}\" as bullet points.\n\n\
         List 2-3 strengths and 2-3 weaknesses.\n\n\
         Each point must be very concise (3-8 words max), like:\n\
         - \"Strong technical architecture\"\n\
         - \"Unclear revenue model\"\n\n\
         Respond ONLY with valid JSON, no markdown, no explanation:\n\
         {{\"strengths\":[\"...\",\"...\"],\"weaknesses\":[\"...\",\"...\"]}}"
    )
}
