//! Controller-level state types and section constants.

use thiserror::Error;

use crate::audio::PlayerEvent;
use crate::library::{SectionSettings, Track};

/// Ordered list of playback sections. Each section gets its own player,
/// snapshot and persisted settings; keep the keys in sync with the store.
pub const SECTION_KEYS: &[&str] = &["music", "effects"];

/// Section used by callers that do not care about channels.
pub const DEFAULT_SECTION: &str = "music";

/// Errors raised synchronously by [`AudioController`](super::AudioController)
/// operations. These are usage errors; playback failures are reported
/// through boolean returns and the event stream instead.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Unknown audio section '{0}'")]
    UnknownSection(String),
}

/// Snapshot of one section's playback status.
///
/// The controller is the only writer; readers receive clones, so holding
/// on to a state can never observe or cause concurrent mutation.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub volume: f32,
    pub shuffle: bool,
    pub loop_enabled: bool,
    pub is_playing: bool,
    pub current_track: Option<Track>,
    pub last_track: Option<Track>,
    pub playlist: Vec<Track>,
    pub category: Option<String>,
    pub last_error: String,
}

impl PlaybackState {
    /// Initial state for a section, seeded from persisted settings.
    pub(super) fn from_saved(saved: &SectionSettings) -> Self {
        Self {
            volume: saved.volume.clamp(0.0, 1.0),
            shuffle: saved.shuffle,
            loop_enabled: saved.loop_enabled,
            is_playing: false,
            current_track: None,
            last_track: None,
            playlist: Vec::new(),
            category: None,
            last_error: String::new(),
        }
    }
}

/// Events delivered to controller listeners.
///
/// Player events are re-emitted verbatim; every state mutation is
/// additionally followed by a `StateChanged` carrying a snapshot clone.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    PlaylistSet {
        playlist: Vec<Track>,
        category: Option<String>,
    },
    StateChanged {
        state: PlaybackState,
    },
    TrackStarted {
        track: Track,
        index: usize,
    },
    Stopped {
        track: Track,
        index: usize,
    },
    PlaylistEnded,
    VolumeChanged {
        value: f32,
    },
    ShuffleChanged {
        value: bool,
    },
    LoopChanged {
        value: bool,
    },
    Error {
        track: Option<Track>,
        message: String,
    },
    PlayFailed {
        message: String,
    },
    NavigationFailed {
        message: String,
    },
}

impl ControllerEvent {
    pub(super) fn from_player(event: &PlayerEvent) -> Self {
        match event {
            PlayerEvent::TrackStarted { track, index } => ControllerEvent::TrackStarted {
                track: track.clone(),
                index: *index,
            },
            PlayerEvent::Stopped { track, index } => ControllerEvent::Stopped {
                track: track.clone(),
                index: *index,
            },
            PlayerEvent::PlaylistEnded => ControllerEvent::PlaylistEnded,
            PlayerEvent::VolumeChanged { value } => {
                ControllerEvent::VolumeChanged { value: *value }
            }
            PlayerEvent::ShuffleChanged { value } => {
                ControllerEvent::ShuffleChanged { value: *value }
            }
            PlayerEvent::LoopChanged { value } => ControllerEvent::LoopChanged { value: *value },
            PlayerEvent::Error { track, message } => ControllerEvent::Error {
                track: track.clone(),
                message: message.clone(),
            },
        }
    }
}

/// Callback registered on the controller: `(section, event)`.
///
/// Like player listeners, these run on whichever thread triggered the
/// change and must not call back into the controller for the same section.
pub type ControllerListener = Box<dyn Fn(&str, &ControllerEvent) + Send + Sync + 'static>;
