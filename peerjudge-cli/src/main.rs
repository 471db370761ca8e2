mod config;
mod judge;
mod llm;
#[cfg(test)]
mod mock_llm;
mod output;
mod prompt;
mod simulate;
mod sse;
mod store;
mod summarize;

use clap::Parser;
use peerjudge_core::{pooled_ranking, visible_participants, Participant, Store, StoreError};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::config::PeerjudgeConfig;
use crate::judge::{run_judge, Assist};
use crate::llm::LlmConfig;
use crate::store::JsonFileStore;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "peerjudge", version, about = "Rank hackathon projects by pairwise judging")]
struct Cli {
    /// Path to config file (default: ~/.config/peerjudge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the shared store file (default: data/store.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a default config file at ~/.config/peerjudge/config.toml
    Init,
    /// Submit a project
    Submit(SubmitArgs),
    /// List the participants currently being judged
    Participants,
    /// Judge projects two at a time
    Judge(JudgeArgs),
    /// Show the pooled leaderboard across all judges
    Leaderboard(LeaderboardArgs),
    /// Measure ranking quality against a synthetic judge
    Simulate(SimulateArgs),
}

#[derive(Parser)]
struct SubmitArgs {
    /// Project name
    #[arg(long)]
    project: String,

    /// Team name
    #[arg(long)]
    team: String,

    /// Team member (repeatable)
    #[arg(long = "member")]
    members: Vec<String>,

    /// Short project description
    #[arg(long, default_value = "")]
    description: String,

    /// Public demo URL
    #[arg(long, default_value = "")]
    demo_url: String,

    /// Presentation / slides URL
    #[arg(long)]
    presentation_url: Option<String>,
}

#[derive(Parser)]
struct JudgeArgs {
    /// Stream an assistant analysis of each project and summarize feedback after each vote
    #[arg(long)]
    assist: bool,

    /// OpenAI-compatible base URL (e.g. http://localhost:8000)
    #[arg(long)]
    endpoint: Option<String>,

    /// Bearer token for the API (also reads PEERJUDGE_API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model ID for the API
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature for the assistant
    #[arg(long)]
    temperature: Option<f64>,

    /// Seconds before an assistant request is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Rulebook text file for the assistant's system prompt
    #[arg(long)]
    rulebook: Option<PathBuf>,

    /// Challenge brief text file, added after the rulebook
    #[arg(long)]
    challenge: Option<PathBuf>,
}

#[derive(Parser)]
struct LeaderboardArgs {
    /// Output JSON instead of table
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SimulateArgs {
    /// Number of participants per session
    #[arg(long, default_value_t = 10)]
    participants: usize,

    /// Number of sessions to run
    #[arg(long, default_value_t = 200)]
    trials: usize,

    /// Spread (std dev) of hidden strengths
    #[arg(long, default_value_t = 1.0)]
    spread: f64,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_store(cli_store: Option<PathBuf>, cfg: &PeerjudgeConfig) -> Arc<dyn Store> {
    let path = cli_store
        .or_else(|| cfg.store.clone())
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_STORE_PATH));
    let seed = cfg.seed.clone().unwrap_or_else(|| PathBuf::from(config::DEFAULT_SEED_PATH));
    let store = JsonFileStore::new(path, Some(seed));
    tracing::debug!(path = %store.path().display(), "Using store");
    Arc::new(store)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Init = cli.command {
        let path = config::create_default_config();
        println!("Created config at {}", path.display());
        println!("Edit it to set your store location, assistant endpoint, etc.");
        return;
    }

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_config(&config_path);

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Submit(args) => run_submit(args, open_store(cli.store, &cfg)),
        Commands::Participants => run_participants(open_store(cli.store, &cfg)),
        Commands::Judge(args) => {
            let store = open_store(cli.store, &cfg);
            let assist = args.assist.then(|| build_assist(&args, &cfg, &config_path));
            run_judge(store, assist).await;
        }
        Commands::Leaderboard(args) => run_leaderboard(args, open_store(cli.store, &cfg)),
        Commands::Simulate(args) => run_simulate(args),
    }
}

fn build_assist(args: &JudgeArgs, cfg: &PeerjudgeConfig, config_path: &std::path::Path) -> Assist {
    let endpoint = args.endpoint.clone()
        .or_else(|| cfg.endpoint.clone())
        .unwrap_or_else(|| {
            bail(format!("No endpoint specified. Pass --endpoint or set it in {}", config_path.display()));
        });
    let model = args.model.clone()
        .or_else(|| cfg.model.clone())
        .unwrap_or_else(|| {
            bail(format!("No model specified. Pass --model or set it in {}", config_path.display()));
        });
    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("PEERJUDGE_API_KEY").ok())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let temperature = args.temperature.or(cfg.temperature).unwrap_or(config::DEFAULT_TEMPERATURE);
    let timeout = args.timeout.or(cfg.request_timeout_secs).unwrap_or(config::DEFAULT_TIMEOUT_SECS);

    let criteria = match args.rulebook.clone().or_else(|| cfg.rulebook.clone()) {
        Some(path) => prompt::load_rulebook(&path),
        None => prompt::DEFAULT_RULEBOOK.to_string(),
    };
    let challenge = args
        .challenge
        .clone()
        .or_else(|| cfg.challenge.clone())
        .map(|path| prompt::load_rulebook(&path));

    Assist {
        client: Client::new(),
        config: Arc::new(LlmConfig {
            endpoint,
            model,
            api_key,
            temperature,
            timeout: Duration::from_secs(timeout),
        }),
        rules: prompt::JudgingRules::new(criteria, challenge),
    }
}

fn run_submit(args: SubmitArgs, store: Arc<dyn Store>) {
    if args.project.trim().is_empty() {
        bail("--project must not be empty");
    }
    let participant = Participant {
        id: format!("team-{}", chrono::Utc::now().timestamp_millis()),
        project_name: args.project.trim().to_string(),
        description: args.description,
        team_name: args.team,
        team_members: args.members,
        demo_url: args.demo_url,
        presentation_url: args.presentation_url,
        is_seed: false,
    };

    let participant = save_submission(store.as_ref(), participant)
        .unwrap_or_else(|e| bail(format!("Failed to save submission: {e}")));
    println!("Submitted \"{}\" as {}", participant.project_name, participant.id);
}

const MAX_ID_ATTEMPTS: usize = 5;

/// Store a new submission, suffixing its ID if another submission already took it.
fn save_submission(store: &dyn Store, mut participant: Participant) -> Result<Participant, StoreError> {
    let base = participant.id.clone();
    for attempt in 1..=MAX_ID_ATTEMPTS {
        match store.add_participant(&participant) {
            Ok(()) => return Ok(participant),
            Err(StoreError::DuplicateParticipant(_)) if attempt < MAX_ID_ATTEMPTS => {
                participant.id = format!("{base}-{attempt}");
            }
            Err(e) => return Err(e),
        }
    }
    Err(StoreError::DuplicateParticipant(participant.id))
}

fn run_participants(store: Arc<dyn Store>) {
    let snapshot = store
        .load_all()
        .unwrap_or_else(|e| bail(format!("Failed to load store: {e}")));
    let visible = visible_participants(&snapshot.participants);
    if visible.is_empty() {
        println!("No participants yet.");
        return;
    }
    for (i, p) in visible.iter().enumerate() {
        print!("{:>2}. {}", i + 1, output::format_card(&p.id, p));
    }
}

fn run_leaderboard(args: LeaderboardArgs, store: Arc<dyn Store>) {
    let snapshot = store
        .load_all()
        .unwrap_or_else(|e| bail(format!("Failed to load store: {e}")));
    let pooled = pooled_ranking(&snapshot);

    if args.json {
        println!("{}", output::format_json(&pooled.ranked, &snapshot.feedback, pooled.total_votes));
        return;
    }

    print!("{}", output::format_table(&pooled.ranked, pooled.total_votes));
    let feedback = output::format_feedback(&pooled.ranked, &snapshot.feedback);
    if !feedback.is_empty() {
        println!("\nFeedback:{feedback}");
    }
}

fn run_simulate(args: SimulateArgs) {
    if args.participants < 2 {
        bail("--participants must be at least 2");
    }
    if args.spread.is_nan() || args.spread <= 0.0 {
        bail("--spread must be positive");
    }
    let report = simulate::run_simulation(&simulate::SimulationOptions {
        participants: args.participants,
        trials: args.trials,
        spread: args.spread,
        seed: args.seed,
    });

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => bail(format!("Failed to encode JSON: {e}")),
        }
    } else {
        simulate::print_report(&report);
    }
}
