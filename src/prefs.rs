//! Persisted user preferences.
//!
//! Stored as a small pretty-printed JSON file:
//!
//! ```json
//! {
//!     "rate": 150,
//!     "volume": 1.0,
//!     "recent_files": ["notes.txt"],
//!     "voice_id": null
//! }
//! ```
//!
//! Loading never fails: a missing or malformed file yields the defaults.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;

pub const RATE_RANGE: RangeInclusive<u32> = 50..=300;
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DEFAULT_RATE: u32 = 150;
pub const DEFAULT_VOLUME: f32 = 1.0;
pub const MAX_RECENT_FILES: usize = 5;

const CONFIG_DIR_NAME: &str = "tts-reader";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(thiserror::Error, Debug)]
pub enum PrefsError {
    #[error("rate {0} is out of range, expected 50-300")]
    RateOutOfRange(i64),
    #[error("volume {0} is out of range, expected 0.0-1.0")]
    VolumeOutOfRange(f32),
    #[error("failed to write preferences to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub rate: u32,
    pub volume: f32,
    #[serde(alias = "recentFiles")]
    pub recent_files: Vec<String>,
    #[serde(alias = "voiceId")]
    pub voice_id: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            volume: DEFAULT_VOLUME,
            recent_files: Vec::new(),
            voice_id: None,
        }
    }
}

impl Preferences {
    /// Set the speaking rate, keeping the old value if `rate` is out of range.
    pub fn set_rate(&mut self, rate: i64) -> Result<(), PrefsError> {
        match u32::try_from(rate) {
            Ok(r) if RATE_RANGE.contains(&r) => {
                self.rate = r;
                Ok(())
            }
            _ => Err(PrefsError::RateOutOfRange(rate)),
        }
    }

    /// Set the volume, keeping the old value if `volume` is out of range.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), PrefsError> {
        if !VOLUME_RANGE.contains(&volume) {
            return Err(PrefsError::VolumeOutOfRange(volume));
        }
        self.volume = volume;
        Ok(())
    }

    /// Move `path` to the end of the recent list, keeping the last five.
    pub fn record_recent_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.recent_files.retain(|p| *p != path);
        self.recent_files.push(path);
        if self.recent_files.len() > MAX_RECENT_FILES {
            let excess = self.recent_files.len() - MAX_RECENT_FILES;
            self.recent_files.drain(..excess);
        }
    }

    /// Pull values read from disk back into their valid ranges.
    fn sanitize(mut self) -> Self {
        if !RATE_RANGE.contains(&self.rate) {
            log::warn!("stored rate {} out of range, clamping", self.rate);
            self.rate = self.rate.clamp(*RATE_RANGE.start(), *RATE_RANGE.end());
        }
        if !VOLUME_RANGE.contains(&self.volume) {
            log::warn!("stored volume {} out of range, clamping", self.volume);
            self.volume = if self.volume.is_nan() {
                DEFAULT_VOLUME
            } else {
                self.volume.clamp(*VOLUME_RANGE.start(), *VOLUME_RANGE.end())
            };
        }
        if self.recent_files.len() > MAX_RECENT_FILES {
            let excess = self.recent_files.len() - MAX_RECENT_FILES;
            self.recent_files.drain(..excess);
        }
        self
    }
}

/// Location of the preferences file on disk.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/tts-reader/config.json`, or `./config.json` when the
    /// platform has no config directory.
    pub fn default_location() -> Self {
        let path = dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Preferences {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No preferences at {}. Using defaults.", self.path.display());
                return Preferences::default();
            }
            Err(e) => {
                log::warn!(
                    "Failed to read preferences {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                return Preferences::default();
            }
        };

        match serde_json::from_str::<Preferences>(&content) {
            Ok(prefs) => prefs.sanitize(),
            Err(e) => {
                log::warn!(
                    "Failed to parse preferences {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                Preferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        let json = serde_json::to_string_pretty(prefs)?;
        let write_err = |source| PrefsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        log::debug!("saved preferences to {}", self.path.display());
        Ok(())
    }
}

/// Preferences shared between the interactive loop and the interrupt handler.
///
/// Every mutation through [`SharedPreferences::update`] is persisted.
#[derive(Debug, Clone)]
pub struct SharedPreferences {
    store: PreferencesStore,
    prefs: Arc<Mutex<Preferences>>,
}

impl SharedPreferences {
    /// Load from `store` and share the result.
    pub fn load(store: PreferencesStore) -> Self {
        let prefs = store.load();
        Self {
            store,
            prefs: Arc::new(Mutex::new(prefs)),
        }
    }

    pub fn store(&self) -> &PreferencesStore {
        &self.store
    }

    /// Copy of the current preferences.
    pub fn snapshot(&self) -> Preferences {
        self.lock().clone()
    }

    /// Apply `f`, then save if it succeeded.
    ///
    /// A failing `f` leaves the record untouched and nothing is written. A
    /// failing save is returned but the in-memory change is kept.
    pub fn update<T, E>(
        &self,
        f: impl FnOnce(&mut Preferences) -> Result<T, E>,
    ) -> Result<T, ReaderError>
    where
        ReaderError: From<E>,
    {
        let mut guard = self.lock();
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        *guard = draft;
        self.store.save(&guard)?;
        Ok(value)
    }

    /// Save the current record.
    pub fn save(&self) -> Result<(), PrefsError> {
        let guard = self.lock();
        self.store.save(&guard)
    }

    fn lock(&self) -> MutexGuard<'_, Preferences> {
        // A panic while holding the lock cannot leave the record half-written:
        // updates go through a cloned draft.
        self.prefs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
