//! Audio-related small types and handles.
//!
//! This module defines the events, shared status snapshot and internal
//! command set used by the audio subsystem.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::library::Track;

/// Identifier returned by `add_listener`, used to unregister a callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Callback invoked synchronously for every player event.
///
/// Callbacks run on the player's audio thread (auto-advance) or on the
/// command path of whichever thread issued the operation. They must not
/// block for long and must not call back into the same player, or the
/// command channel deadlocks.
pub type PlayerListener = Box<dyn Fn(&PlayerEvent) + Send + 'static>;

/// Events emitted by an [`AudioPlayer`](super::AudioPlayer).
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A track started playing (explicit play, navigation or auto-advance).
    TrackStarted { track: Track, index: usize },
    /// Playback was stopped while the given track was current.
    Stopped { track: Track, index: usize },
    /// The playlist ran out with looping disabled.
    PlaylistEnded,
    /// Volume was set (already clamped to `0.0..=1.0`).
    VolumeChanged { value: f32 },
    /// Shuffle flag was set.
    ShuffleChanged { value: bool },
    /// Loop flag was set.
    LoopChanged { value: bool },
    /// A track could not be started; `message` mirrors `last_error`.
    Error { track: Option<Track>, message: String },
}

/// Runtime playback snapshot shared between the audio thread and callers.
#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    /// Index of the current track in the playlist (if any).
    pub index: Option<usize>,
    /// The current track itself, cloned out of the playlist.
    pub current_track: Option<Track>,
    /// Whether playback is currently active.
    pub is_playing: bool,
    /// Description of the most recent failure, empty if none.
    pub last_error: String,
}

pub type StatusHandle = Arc<Mutex<PlayerStatus>>;

/// Commands handled by the audio thread. Operations whose outcome callers
/// observe carry a reply channel so they behave synchronously.
pub(crate) enum PlayerCmd {
    SetPlaylist {
        tracks: Vec<Track>,
        reply: Sender<()>,
    },
    Play {
        start_index: Option<usize>,
        reply: Sender<bool>,
    },
    PlayTrackId {
        track_id: String,
        reply: Sender<bool>,
    },
    Stop {
        reply: Sender<()>,
    },
    Next {
        reply: Sender<bool>,
    },
    Previous {
        reply: Sender<bool>,
    },
    SetShuffle {
        enabled: bool,
        reply: Sender<()>,
    },
    SetLoop {
        enabled: bool,
        reply: Sender<()>,
    },
    SetVolume {
        value: f32,
        reply: Sender<()>,
    },
    AddListener {
        id: ListenerId,
        callback: PlayerListener,
        reply: Sender<()>,
    },
    RemoveListener {
        id: ListenerId,
        reply: Sender<()>,
    },
    Shutdown,
}
