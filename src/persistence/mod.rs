//! Cross-session persistence
//!
//! The game only needs a small key-value contract: numbers with defaults
//! (`get`/`set`) plus opaque text blobs for the high score list. Browsers back
//! it with LocalStorage; tests and the native build use [`MemoryStore`].
//! Malformed values never fail startup, they read back as the default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key prefix shared by every stored value
pub const KEY_PREFIX: &str = "slice_surge_";

/// Key-value persistence collaborator
pub trait Store {
    /// Raw text for a key, if present
    fn load_text(&self, key: &str) -> Option<String>;

    fn save_text(&mut self, key: &str, value: &str);

    /// Numeric value for `key`, or `default` when missing or malformed
    fn get(&self, key: &str, default: f64) -> f64 {
        match self.load_text(key) {
            Some(text) => match text.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    log::warn!("Ignoring malformed stored value for '{}'", key);
                    default
                }
            },
            None => default,
        }
    }

    fn set(&mut self, key: &str, value: f64) {
        self.save_text(key, &value.to_string());
    }
}

/// In-memory store (native builds and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl Store for MemoryStore {
    fn load_text(&self, key: &str) -> Option<String> {
        self.values.get(&format!("{KEY_PREFIX}{key}")).cloned()
    }

    fn save_text(&mut self, key: &str, value: &str) {
        self.values
            .insert(format!("{KEY_PREFIX}{key}"), value.to_string());
    }
}

/// Browser LocalStorage store (WASM only)
#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    storage: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn new() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable - progress will not persist");
        }
        Self { storage }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl Store for LocalStore {
    fn load_text(&self, key: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;
        storage.get_item(&format!("{KEY_PREFIX}{key}")).ok().flatten()
    }

    fn save_text(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.set_item(&format!("{KEY_PREFIX}{key}"), value);
        }
    }
}

/// Stats that survive between sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub personal_best: u64,
    pub total_sliced: u64,
    pub best_perfect_streak: u32,
    pub daily_streak: u32,
    /// Day number (days since epoch) of the last session, 0 = never
    pub last_play_day: i64,
}

impl ProgressStats {
    const PERSONAL_BEST: &'static str = "personalBest";
    const TOTAL_SLICED: &'static str = "totalFruitsSliced";
    const BEST_PERFECT_STREAK: &'static str = "perfectSliceStreak";
    const DAILY_STREAK: &'static str = "dailyStreak";
    const LAST_PLAY_DAY: &'static str = "lastPlayDay";

    /// Read stats at session start; bad values fall back to zero
    pub fn load(store: &dyn Store) -> Self {
        let read_u64 = |key: &str| store.get(key, 0.0).max(0.0) as u64;
        Self {
            personal_best: read_u64(Self::PERSONAL_BEST),
            total_sliced: read_u64(Self::TOTAL_SLICED),
            best_perfect_streak: read_u64(Self::BEST_PERFECT_STREAK) as u32,
            daily_streak: read_u64(Self::DAILY_STREAK) as u32,
            last_play_day: store.get(Self::LAST_PLAY_DAY, 0.0) as i64,
        }
    }

    pub fn save(&self, store: &mut dyn Store) {
        store.set(Self::PERSONAL_BEST, self.personal_best as f64);
        store.set(Self::TOTAL_SLICED, self.total_sliced as f64);
        store.set(Self::BEST_PERFECT_STREAK, self.best_perfect_streak as f64);
        store.set(Self::DAILY_STREAK, self.daily_streak as f64);
        store.set(Self::LAST_PLAY_DAY, self.last_play_day as f64);
    }

    /// Record a session on `today`; returns true if the streak changed
    pub fn touch_day(&mut self, today: i64) -> bool {
        if self.last_play_day == today {
            return false;
        }
        if self.last_play_day != 0 && today - self.last_play_day == 1 {
            self.daily_streak += 1;
        } else {
            self.daily_streak = 1;
        }
        self.last_play_day = today;
        true
    }
}
