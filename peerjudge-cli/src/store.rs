/// JSON file store shared by every judge.
///
/// The whole store is one JSON document. Each mutation is a full read-modify-write done
/// under a process-wide lock and written atomically (temp file + rename), so writers in
/// this process never lose each other's updates. Separate processes writing the same file
/// are not coordinated; the last rename wins.
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use peerjudge_core::{Comparison, Feedback, Participant, ParticipantId, Store, StoreError, StoreSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    participants: Vec<Participant>,
    #[serde(default)]
    votes: Vec<Comparison>,
    #[serde(default)]
    feedback: BTreeMap<ParticipantId, Feedback>,
}

impl From<StoreFile> for StoreSnapshot {
    fn from(file: StoreFile) -> Self {
        StoreSnapshot {
            participants: file.participants,
            comparisons: file.votes,
            feedback: file.feedback,
        }
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    seed_path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// `seed_path` (a JSON array of participants) initialises the store the first time
    /// it is loaded, if the store file does not exist yet.
    pub fn new(path: impl Into<PathBuf>, seed_path: Option<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            seed_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the store, creating it from the seed file on first use. Caller holds the lock.
    fn read_or_init(&self) -> Result<StoreFile, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Format(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let file = StoreFile {
                    participants: self.load_seed()?,
                    ..Default::default()
                };
                info!(
                    path = %self.path.display(),
                    seeds = file.participants.len(),
                    "Initialising new store"
                );
                self.write(&file)?;
                Ok(file)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_seed(&self) -> Result<Vec<Participant>, StoreError> {
        let Some(seed_path) = &self.seed_path else {
            return Ok(Vec::new());
        };
        match std::fs::read_to_string(seed_path) {
            Ok(content) => {
                let mut seeds: Vec<Participant> = serde_json::from_str(&content)
                    .map_err(|e| StoreError::Format(format!("{}: {e}", seed_path.display())))?;
                for p in &mut seeds {
                    p.is_seed = true;
                }
                Ok(seeds)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %seed_path.display(), "No seed file, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| StoreError::Format(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut StoreFile) -> Result<(), StoreError>) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut file = self.read_or_init()?;
        apply(&mut file)?;
        self.write(&file)
    }
}

impl Store for JsonFileStore {
    fn load_all(&self) -> Result<StoreSnapshot, StoreError> {
        let _guard = self.lock();
        self.read_or_init().map(StoreSnapshot::from)
    }

    fn append_comparison(&self, comparison: &Comparison) -> Result<(), StoreError> {
        self.mutate(|file| {
            file.votes.push(comparison.clone());
            Ok(())
        })
    }

    fn append_feedback(&self, id: &str, feedback: &Feedback) -> Result<(), StoreError> {
        self.mutate(|file| {
            file.feedback.entry(id.to_string()).or_default().merge(feedback);
            Ok(())
        })
    }

    fn add_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        self.mutate(|file| {
            if file.participants.iter().any(|p| p.id == participant.id) {
                return Err(StoreError::DuplicateParticipant(participant.id.clone()));
            }
            file.participants.push(participant.clone());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "peerjudge-{name}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_store_initialised_from_seed() {
        let dir = scratch_dir("seed");
        let seed = dir.join("seed.json");
        std::fs::write(
            &seed,
            r#"[{"id":"s1","projectName":"Placeholder One"},{"id":"s2","projectName":"Placeholder Two","teamMembers":["Ada"]}]"#,
        )
        .unwrap();

        let store = JsonFileStore::new(dir.join("store.json"), Some(seed));
        let snapshot = store.load_all().unwrap();
        assert_eq!(snapshot.participants.len(), 2);
        assert!(snapshot.participants.iter().all(|p| p.is_seed));
        assert_eq!(snapshot.participants[1].team_members, vec!["Ada"]);
        assert!(dir.join("store.json").exists());
    }

    #[test]
    fn test_missing_seed_starts_empty() {
        let dir = scratch_dir("empty");
        let store = JsonFileStore::new(dir.join("nested").join("store.json"), Some(dir.join("nope.json")));
        assert_eq!(store.load_all().unwrap(), StoreSnapshot::default());
    }

    #[test]
    fn test_appends_survive_reopen() {
        let dir = scratch_dir("reopen");
        let path = dir.join("store.json");
        {
            let store = JsonFileStore::new(&path, None);
            store.add_participant(&Participant::new("team-1", "Alpha")).unwrap();
            store.append_comparison(&Comparison::new("team-1", "team-2", 42)).unwrap();
            store.append_feedback("team-1", &Feedback::new(vec!["Polished demo".into()], vec![])).unwrap();
            store.append_feedback("team-1", &Feedback::new(vec![], vec!["No tests".into()])).unwrap();
        }

        let reopened = JsonFileStore::new(&path, None);
        let snapshot = reopened.load_all().unwrap();
        assert_eq!(snapshot.participants[0].project_name, "Alpha");
        assert_eq!(snapshot.comparisons, vec![Comparison::new("team-1", "team-2", 42)]);
        assert_eq!(snapshot.feedback["team-1"].strengths, vec!["Polished demo"]);
        assert_eq!(snapshot.feedback["team-1"].weaknesses, vec!["No tests"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"votes\""));
        assert!(raw.contains("\"winnerId\""));
        assert!(raw.contains("\"projectName\""));
    }

    #[test]
    fn test_duplicate_participant_is_rejected_and_not_written() {
        let dir = scratch_dir("dup");
        let path = dir.join("store.json");
        let store = JsonFileStore::new(&path, None);
        store.add_participant(&Participant::new("team-7", "First")).unwrap();

        let err = store.add_participant(&Participant::new("team-7", "Second")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateParticipant(ref id) if id == "team-7"));

        let snapshot = JsonFileStore::new(&path, None).load_all().unwrap();
        assert_eq!(snapshot.participants.len(), 1);
        assert_eq!(snapshot.participants[0].project_name, "First");
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let dir = scratch_dir("threads");
        let store = Arc::new(JsonFileStore::new(dir.join("store.json"), None));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store
                            .append_comparison(&Comparison::new(format!("w{t}"), format!("l{i}"), i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.load_all().unwrap().comparisons.len(), 40);
    }

    #[test]
    fn test_malformed_store_is_format_error() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path, None);
        assert!(matches!(store.load_all(), Err(StoreError::Format(_))));
    }
}
