//! Short local record of finished plays, newest first.

use crate::{
    error::GameError,
    game::PlayOutcome,
};
use anyhow::{
    Context,
    Result,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use tracing::{
    error,
    warn,
};

pub const HISTORY_CAPACITY: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub guess: u8,
    pub winning_number: Option<u8>,
    pub won: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_outcome(outcome: &PlayOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            guess: outcome.guess.value(),
            winning_number: outcome.winning_number,
            won: outcome.won,
            timestamp,
        }
    }
}

/// Durable slot holding the serialized history.
pub trait HistoryBackend {
    /// `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;

    fn save(&mut self, serialized: &str) -> Result<()>;
}

/// History kept in a single JSON file.
#[derive(Clone, Debug)]
pub struct FileHistoryBackend {
    path: PathBuf,
}

impl FileHistoryBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryBackend for FileHistoryBackend {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path).with_context(|| {
            format!("Failed to read game history at {}", self.path.display())
        })?;
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn save(&mut self, serialized: &str) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create history directory {}", dir.display())
            })?;
        }
        fs::write(&self.path, serialized).with_context(|| {
            format!("Failed to write game history to {}", self.path.display())
        })?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryHistoryBackend {
    slot: Arc<Mutex<Option<String>>>,
}

impl InMemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(serialized: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(serialized.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl HistoryBackend for InMemoryHistoryBackend {
    fn load(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("history slot poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&mut self, serialized: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("history slot poisoned"))?;
        *slot = Some(serialized.to_string());
        Ok(())
    }
}

pub fn encode_entries(entries: &[HistoryEntry]) -> Result<String> {
    serde_json::to_string(entries).context("Failed to serialize game history")
}

pub fn decode_entries(serialized: &str) -> Result<Vec<HistoryEntry>, GameError> {
    serde_json::from_str(serialized).map_err(|e| GameError::PersistenceCorrupt(e.to_string()))
}

pub struct HistoryStore<B> {
    backend: B,
    entries: Vec<HistoryEntry>,
}

impl<B: HistoryBackend> HistoryStore<B> {
    /// Reads whatever the backend holds. Unreadable or corrupt data starts an empty
    /// history.
    pub fn load(backend: B) -> Self {
        let entries = match backend.load() {
            Ok(Some(serialized)) => match decode_entries(&serialized) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_CAPACITY);
                    entries
                }
                Err(err) => {
                    warn!(%err, "discarding stored history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(?err, "could not read stored history");
                Vec::new()
            }
        };
        Self { backend, entries }
    }

    pub fn all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Puts `entry` first, drops the oldest past capacity, and persists. A failed
    /// write keeps the in-memory history.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
        let saved = encode_entries(&self.entries)
            .and_then(|serialized| self.backend.save(&serialized));
        if let Err(err) = saved {
            error!(?err, "failed to persist game history");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn entry(guess: u8, ts: i64) -> HistoryEntry {
        HistoryEntry {
            guess,
            winning_number: Some(guess % 10 + 1),
            won: false,
            timestamp: Utc.timestamp_millis_opt(ts).unwrap(),
        }
    }

    #[test]
    fn entry__serializes_like_the_stored_layout() {
        let json = serde_json::to_value(entry(3, 1_700_000_000_000)).unwrap();
        assert_eq!(
            serde_json::json!({
                "guess": 3,
                "winningNumber": 4,
                "won": false,
                "timestamp": 1_700_000_000_000i64,
            }),
            json
        );
    }

    #[test]
    fn load__corrupt_data_is_empty_history() {
        let backend = InMemoryHistoryBackend::with_contents("{not json");
        let store = HistoryStore::load(backend);
        assert!(store.is_empty());
    }

    #[test]
    fn append__newest_first() {
        let mut store = HistoryStore::load(InMemoryHistoryBackend::new());
        store.append(entry(1, 1));
        store.append(entry(2, 2));
        let guesses: Vec<u8> = store.all().iter().map(|e| e.guess).collect();
        assert_eq!(vec![2, 1], guesses);
    }

    #[test]
    fn append__eleventh_entry_evicts_the_oldest() {
        // given
        let mut store = HistoryStore::load(InMemoryHistoryBackend::new());
        for i in 0..10 {
            store.append(entry(i % 10 + 1, i as i64));
        }

        // when
        store.append(entry(7, 100));

        // then
        assert_eq!(HISTORY_CAPACITY, store.len());
        assert_eq!(100, store.all()[0].timestamp.timestamp_millis());
        assert!(store.all().iter().all(|e| e.timestamp.timestamp_millis() != 0));
    }

    #[test]
    fn append__persists_through_backend() {
        let backend = InMemoryHistoryBackend::new();
        let mut store = HistoryStore::load(backend.clone());
        store.append(entry(5, 42));

        let reloaded = HistoryStore::load(backend);
        assert_eq!(store.all(), reloaded.all());
    }

    proptest! {
        #[test]
        fn append__never_exceeds_capacity(guesses in proptest::collection::vec(1u8..=10, 0..40)) {
            let mut store = HistoryStore::load(InMemoryHistoryBackend::new());
            for (i, g) in guesses.iter().enumerate() {
                store.append(entry(*g, i as i64));
            }
            prop_assert_eq!(guesses.len().min(HISTORY_CAPACITY), store.len());
        }

        #[test]
        fn encode_entries__round_trips_in_order(
            raw in proptest::collection::vec((1u8..=10, proptest::option::of(1u8..=10), any::<bool>(), 0i64..4_000_000_000_000), 0..=10)
        ) {
            let entries: Vec<HistoryEntry> = raw
                .into_iter()
                .map(|(guess, winning_number, won, ts)| HistoryEntry {
                    guess,
                    winning_number,
                    won,
                    timestamp: Utc.timestamp_millis_opt(ts).unwrap(),
                })
                .collect();
            let decoded = decode_entries(&encode_entries(&entries).unwrap()).unwrap();
            prop_assert_eq!(entries, decoded);
        }
    }
}
