//! Persisted per-section playback settings.
//!
//! The controller only ever persists volume/shuffle/loop through the
//! [`SettingsStore`] trait; [`AudioLibrary`] is the on-disk TOML
//! implementation. Reads fall back to per-section defaults, writes are
//! best-effort: a failure to save is logged and never propagated into
//! playback.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::controller::SECTION_KEYS;

/// Persisted settings for one playback section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    pub volume: f32,
    pub shuffle: bool,
    #[serde(rename = "loop")]
    pub loop_enabled: bool,
    /// Last directory loaded into this section, for the next session.
    pub last_directory: String,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            shuffle: false,
            loop_enabled: false,
            last_directory: String::new(),
        }
    }
}

/// Settings persistence contract consumed by the controller.
pub trait SettingsStore: Send + Sync {
    /// Saved settings for `section`, defaults when nothing was persisted.
    fn section_settings(&self, section: &str) -> SectionSettings;

    fn save_volume(&self, section: &str, value: f32);
    fn save_shuffle(&self, section: &str, enabled: bool);
    fn save_loop(&self, section: &str, enabled: bool);
}

fn default_sections() -> BTreeMap<String, SectionSettings> {
    let mut sections = BTreeMap::new();
    sections.insert(
        "music".to_string(),
        SectionSettings {
            volume: 0.65,
            shuffle: false,
            loop_enabled: true,
            last_directory: String::new(),
        },
    );
    sections.insert(
        "effects".to_string(),
        SectionSettings {
            volume: 0.75,
            shuffle: false,
            loop_enabled: false,
            last_directory: String::new(),
        },
    );
    sections
}

/// TOML-file settings store.
pub struct AudioLibrary {
    path: PathBuf,
    data: Mutex<BTreeMap<String, SectionSettings>>,
}

impl AudioLibrary {
    /// Load the store at `path`, creating it with defaults when missing or
    /// unreadable.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = Mutex::new(load_sections(&path));
        let library = Self { path, data };
        if !library.path.exists() {
            library.save();
        }
        library
    }

    /// Last directory persisted for `section`, empty when never set.
    pub fn last_directory(&self, section: &str) -> String {
        self.data
            .lock()
            .map(|data| {
                data.get(section)
                    .map(|s| s.last_directory.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn save_last_directory(&self, section: &str, dir: &str) {
        self.update(section, |settings| {
            settings.last_directory = dir.to_string()
        });
    }

    fn update(&self, section: &str, apply: impl FnOnce(&mut SectionSettings)) {
        if let Ok(mut data) = self.data.lock() {
            apply(data.entry(section.to_string()).or_default());
        }
        self.save();
    }

    fn save(&self) {
        let serialized = match self.data.lock() {
            Ok(data) => toml::to_string_pretty(&*data),
            Err(_) => return,
        };
        let serialized = match serialized {
            Ok(s) => s,
            Err(e) => {
                error!("audio library: failed to serialize settings: {e}");
                return;
            }
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(dir) {
                    error!("audio library: failed to create {:?}: {e}", dir);
                    return;
                }
            }
        }
        if let Err(e) = fs::write(&self.path, serialized) {
            error!("audio library: failed to write {:?}: {e}", self.path);
        }
    }
}

impl SettingsStore for AudioLibrary {
    fn section_settings(&self, section: &str) -> SectionSettings {
        self.data
            .lock()
            .ok()
            .and_then(|data| data.get(section).cloned())
            .unwrap_or_default()
    }

    fn save_volume(&self, section: &str, value: f32) {
        self.update(section, |settings| {
            settings.volume = value.clamp(0.0, 1.0)
        });
    }

    fn save_shuffle(&self, section: &str, enabled: bool) {
        self.update(section, |settings| settings.shuffle = enabled);
    }

    fn save_loop(&self, section: &str, enabled: bool) {
        self.update(section, |settings| settings.loop_enabled = enabled);
    }
}

/// Read the file, overlaying parsed sections onto the defaults so missing
/// sections and new fields always have sane values.
fn load_sections(path: &Path) -> BTreeMap<String, SectionSettings> {
    let mut sections = default_sections();
    // Make sure every configured section key exists even if the defaults
    // table and SECTION_KEYS ever drift.
    for &key in SECTION_KEYS {
        sections.entry(key.to_string()).or_default();
    }

    if !path.exists() {
        return sections;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("audio library: failed to read {:?}: {e}", path);
            return sections;
        }
    };
    match toml::from_str::<BTreeMap<String, SectionSettings>>(&raw) {
        Ok(parsed) => {
            for (key, mut settings) in parsed {
                settings.volume = settings.volume.clamp(0.0, 1.0);
                sections.insert(key, settings);
            }
        }
        Err(e) => {
            warn!("audio library: unexpected structure in {:?}: {e}", path);
        }
    }
    sections
}
