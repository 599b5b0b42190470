//! Pluggable playback backend abstraction.
//!
//! [`PlaybackBackend`] decouples the player from the platform audio API.
//! The default implementation wraps `rodio` (see [`super::native`]); the
//! [`NullBackend`] stands in when no output device can be opened so the
//! rest of the application keeps working with playback disabled.
//!
//! The trait is object-safe on purpose: backends are selected at runtime
//! by [`create_backend`] and handed around as `Box<dyn PlaybackBackend>`.

use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;

use super::native::RodioBackend;

/// Errors raised by a playback backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("No track loaded")]
    NoTrackLoaded,
    #[error("Unsupported or corrupt audio file: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to transcode audio: {0}")]
    Transcode(String),
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
    #[error("Failed to play audio: {0}")]
    Play(String),
}

/// Capability interface over the OS audio subsystem.
///
/// One backend instance belongs to exactly one player and owns that
/// player's loaded file, playback handle and any transcoded temp file.
/// `stop` and `close` are the only release points and are idempotent.
pub trait PlaybackBackend {
    /// Short name for logs ("rodio", "null", "mock", ...).
    fn name(&self) -> &'static str;

    /// Prepare `path` for playback, transcoding if the format is not
    /// natively decodable.
    fn load(&mut self, path: &Path) -> Result<(), BackendError>;

    /// Start asynchronous playback of the loaded track.
    fn play(&mut self, looped: bool) -> Result<(), BackendError>;

    /// Stop playback. Safe to call when nothing is playing.
    fn stop(&mut self);

    /// Whether the backend still reports active playback.
    fn is_active(&self) -> bool;

    /// Apply a volume in `0.0..=1.0` (values are clamped by the caller,
    /// but implementations clamp again).
    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError>;

    /// Stop playback and release per-track resources (temp files included).
    fn close(&mut self);

    /// Whether `is_active` is meaningful; the monitor loop skips activity
    /// checks when this returns false.
    fn supports_polling(&self) -> bool {
        true
    }
}

/// Fallback backend used when no audio output is available.
///
/// Every operation no-ops; `is_active` always reports false and polling is
/// disabled so the monitor loop never mistakes silence for track completion.
pub struct NullBackend {
    volume: f32,
}

impl NullBackend {
    pub fn new() -> Self {
        Self { volume: 1.0 }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn load(&mut self, path: &Path) -> Result<(), BackendError> {
        warn!("null backend: unable to load {:?} (no audio output)", path);
        Ok(())
    }

    fn play(&mut self, _looped: bool) -> Result<(), BackendError> {
        warn!("null backend: audio playback is disabled");
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn close(&mut self) {}

    fn supports_polling(&self) -> bool {
        false
    }
}

/// Select a backend at player construction.
///
/// Tries the native `rodio` backend once; any failure downgrades to the
/// [`NullBackend`] with a logged warning, so this always returns something
/// usable.
pub fn create_backend() -> Box<dyn PlaybackBackend> {
    match RodioBackend::new() {
        Ok(backend) => {
            log::info!("audio: using rodio output backend");
            Box::new(backend)
        }
        Err(err) => {
            warn!("audio: falling back to null backend: {err}");
            Box::new(NullBackend::new())
        }
    }
}
