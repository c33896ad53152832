#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Named save slots for runs.
//!
//! At most [`MAX_SLOTS`] saves coexist. Records are camelCase JSON and every
//! field is optional when read back, so a partial record restores on top of
//! the current run instead of replacing it.

mod record;
mod storage;

pub use record::{
    AmountDrop, DropSection, EnemyEntry, EnemySection, GameStateSection, GemDrop, GemSection,
    InventorySection, ItemDrop, PlayerSection, Position, SaveRecord, SpawnEntry, UpgradeSection,
};
pub use storage::{DirectoryStorage, MemoryStorage, SaveStorage, StorageError};

use std::fmt::Write as _;

use sha2::{Digest, Sha256};
use skulls_daggers_core::{RunSnapshot, TileCoord};
use thiserror::Error;
use tracing::{info, warn};

/// Prefix shared by every save key.
pub const KEY_PREFIX: &str = "isometricGameSave_";
/// Maximum number of named saves kept at once.
pub const MAX_SLOTS: usize = 3;

const KEY_HASH_DIGITS: usize = 16;

/// Failure of a save-slot operation.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// All slots are taken by other names.
    #[error("all {max} save slots are in use")]
    SlotLimit {
        /// Slot cap.
        max: usize,
    },
    /// A load was requested without a name and nothing has been saved.
    #[error("no saved runs")]
    NoSaves,
    /// No save exists under the name.
    #[error("no save named {name:?}")]
    NotFound {
        /// Requested name.
        name: String,
    },
    /// The save name is empty.
    #[error("save names cannot be blank")]
    InvalidName,
    /// A stored record could not be decoded.
    #[error("save {name:?} is unreadable: {source}")]
    Corrupt {
        /// Name of the save.
        name: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A record could not be encoded.
    #[error("failed to encode save: {0}")]
    Encode(#[source] serde_json::Error),
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Deterministic storage key of a save name.
#[must_use]
pub fn save_key(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_HASH_DIGITS);
    key.push_str(KEY_PREFIX);
    for byte in digest.iter().take(KEY_HASH_DIGITS / 2) {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

/// Listing entry for a stored save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveSummary {
    /// Save name.
    pub name: String,
    /// Milliseconds since the Unix epoch when it was written.
    pub timestamp: u64,
    /// One-line description of the saved run.
    pub summary: String,
}

/// A run restored from a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedRun {
    /// Name of the slot it came from.
    pub name: String,
    /// Run to hand to the world.
    pub snapshot: RunSnapshot,
}

/// Save slots over a storage backend.
#[derive(Debug)]
pub struct SaveSlots<S> {
    storage: S,
    current: Option<String>,
}

impl<S: SaveStorage> SaveSlots<S> {
    /// Wraps a storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            current: None,
        }
    }

    /// Name of the save last written or loaded.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Backend holding the records.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Releases the backend.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Writes `run` under `name`, replacing a save with the same name.
    ///
    /// A new name is rejected once every slot is taken. Unreadable records do
    /// not hold a slot.
    pub fn save(
        &mut self,
        name: &str,
        timestamp: u64,
        run: &RunSnapshot,
    ) -> Result<SaveSummary, PersistenceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PersistenceError::InvalidName);
        }
        let key = save_key(name);
        let taken = self.readable_slots()?;
        if !taken.iter().any(|(slot, _)| *slot == key) && taken.len() >= MAX_SLOTS {
            warn!(name, "save rejected: slot limit reached");
            return Err(PersistenceError::SlotLimit { max: MAX_SLOTS });
        }

        let record = SaveRecord::capture(name, timestamp, run);
        let bytes = serde_json::to_vec_pretty(&record).map_err(PersistenceError::Encode)?;
        if let Err(error) = self.storage.write(&key, &bytes) {
            warn!(name, %error, "save failed");
            return Err(error.into());
        }
        info!(name, bytes = bytes.len(), "run saved");
        self.current = Some(name.to_owned());
        Ok(summarize(name.to_owned(), &record))
    }

    /// Restores a save on top of `current`.
    ///
    /// Without a name, the save last used by these slots is loaded, falling
    /// back to the newest save. `boss_tile` places a living boss whose record
    /// carries no position.
    pub fn load(
        &mut self,
        name: Option<&str>,
        current: &RunSnapshot,
        boss_tile: TileCoord,
    ) -> Result<LoadedRun, PersistenceError> {
        let name = match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name.to_owned(),
            None => match self.current.clone() {
                Some(name) => name,
                None => self
                    .list_saves()?
                    .into_iter()
                    .next()
                    .map(|save| save.name)
                    .ok_or(PersistenceError::NoSaves)?,
            },
        };
        let record = self.read_record(&name)?;
        let snapshot = record.overlay(current, boss_tile);
        info!(name = name.as_str(), level = snapshot.level, "run loaded");
        self.current = Some(name.clone());
        Ok(LoadedRun { name, snapshot })
    }

    /// Removes the save called `name`, reporting whether it existed.
    pub fn delete(&mut self, name: &str) -> Result<bool, PersistenceError> {
        let removed = self.storage.remove(&save_key(name.trim()))?;
        if removed {
            info!(name, "save deleted");
        }
        if self.current.as_deref() == Some(name.trim()) {
            self.current = None;
        }
        Ok(removed)
    }

    /// Removes every save, returning how many were deleted.
    pub fn delete_all(&mut self) -> Result<usize, PersistenceError> {
        let mut removed = 0;
        for key in self.slot_keys()? {
            if self.storage.remove(&key)? {
                removed += 1;
            }
        }
        self.current = None;
        info!(removed, "all saves deleted");
        Ok(removed)
    }

    /// Readable saves, newest first.
    pub fn list_saves(&self) -> Result<Vec<SaveSummary>, PersistenceError> {
        let mut saves: Vec<SaveSummary> = self
            .readable_slots()?
            .into_iter()
            .map(|(_, save)| save)
            .collect();
        saves.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.name.cmp(&b.name))
        });
        saves.truncate(MAX_SLOTS);
        Ok(saves)
    }

    /// Keys of records that decode and carry a name, with their summaries.
    fn readable_slots(&self) -> Result<Vec<(String, SaveSummary)>, PersistenceError> {
        let mut slots = Vec::new();
        for key in self.slot_keys()? {
            let Some(bytes) = self.storage.read(&key)? else {
                continue;
            };
            let record: SaveRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(error) => {
                    warn!(key = key.as_str(), %error, "skipping unreadable save");
                    continue;
                }
            };
            let Some(name) = record.name.clone() else {
                warn!(key = key.as_str(), "skipping save without a name");
                continue;
            };
            let save = summarize(name, &record);
            slots.push((key, save));
        }
        Ok(slots)
    }

    fn slot_keys(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect())
    }

    fn read_record(&self, name: &str) -> Result<SaveRecord, PersistenceError> {
        let bytes = self
            .storage
            .read(&save_key(name))?
            .ok_or_else(|| PersistenceError::NotFound {
                name: name.to_owned(),
            })?;
        serde_json::from_slice(&bytes).map_err(|source| {
            warn!(name, %source, "save is unreadable");
            PersistenceError::Corrupt {
                name: name.to_owned(),
                source,
            }
        })
    }
}

fn summarize(name: String, record: &SaveRecord) -> SaveSummary {
    let level = record
        .game_state
        .as_ref()
        .and_then(|state| state.level)
        .unwrap_or(1);
    let mut summary = format!("Level {level}");
    let characters = [record.player.as_ref(), record.player2.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|player| player.character)
        .map(|character| format!("{character:?}"))
        .collect::<Vec<_>>();
    if !characters.is_empty() {
        let _ = write!(summary, " - {}", characters.join(" & "));
    }
    if let Some(gold) = record.player.as_ref().and_then(|player| player.gold) {
        let _ = write!(summary, " - {gold} gold");
    }
    SaveSummary {
        name,
        timestamp: record.timestamp.unwrap_or(0),
        summary,
    }
}
