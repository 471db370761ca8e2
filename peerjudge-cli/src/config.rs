/// Config file loading and creation for the peerjudge CLI.
///
/// Config lives at ~/.config/peerjudge/config.toml.
/// All fields are optional. CLI args override config values.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PeerjudgeConfig {
    pub store: Option<PathBuf>,
    pub seed: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub request_timeout_secs: Option<u64>,
    pub rulebook: Option<PathBuf>,
    pub challenge: Option<PathBuf>,
}

pub const DEFAULT_STORE_PATH: &str = "data/store.json";
pub const DEFAULT_SEED_PATH: &str = "data/seed.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# peerjudge configuration
# All values here can be overridden by CLI flags.

# Where participants, votes and feedback are kept (shared by all judges)
# store = \"data/store.json\"

# JSON array of placeholder participants used to initialise a new store
# seed = \"data/seed.json\"

# OpenAI-compatible API endpoint for the judging assistant
# endpoint = \"https://api.perplexity.ai\"

# Model ID
# model = \"sonar\"

# API key: use PEERJUDGE_API_KEY / OPENAI_API_KEY env vars or --api-key (not stored in config)

# Sampling temperature for assistant replies
# temperature = 0.2

# Give up on an assistant request after this many seconds
# request_timeout_secs = 60

# Path to a rulebook text file included in the assistant's system prompt.
# If not set, the built-in judging criteria are used.
# rulebook = \"/path/to/rulebook.txt\"

# Path to a challenge brief added after the rulebook, for challenge-specific judging.
# challenge = \"/path/to/challenge.txt\"
";

/// Returns the default config path: ~/.config/peerjudge/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("peerjudge").join("config.toml")
}

/// Parse config text. Unknown keys are rejected so typos surface early.
pub fn parse_config(content: &str) -> Result<PeerjudgeConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> PeerjudgeConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PeerjudgeConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();

    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses_to_empty_config() {
        let cfg = parse_config(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(cfg.store.is_none());
        assert!(cfg.endpoint.is_none());
        assert!(cfg.request_timeout_secs.is_none());
        assert!(cfg.challenge.is_none());
    }

    #[test]
    fn test_parse_values() {
        let cfg = parse_config(
            "store = \"/tmp/judging.json\"\nmodel = \"sonar\"\nrequest_timeout_secs = 15\ntemperature = 0.5\n",
        )
        .unwrap();
        assert_eq!(cfg.store, Some(PathBuf::from("/tmp/judging.json")));
        assert_eq!(cfg.model.as_deref(), Some("sonar"));
        assert_eq!(cfg.request_timeout_secs, Some(15));
        assert_eq!(cfg.temperature, Some(0.5));
    }

    #[test]
    fn test_parse_rule_files() {
        let cfg = parse_config("rulebook = \"rules.txt\"\nchallenge = \"brief.txt\"\n").unwrap();
        assert_eq!(cfg.rulebook, Some(PathBuf::from("rules.txt")));
        assert_eq!(cfg.challenge, Some(PathBuf::from("brief.txt")));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(parse_config("modle = \"typo\"\n").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("peerjudge-no-such-config.toml");
        let cfg = load_config(&path);
        assert!(cfg.model.is_none());
    }
}
