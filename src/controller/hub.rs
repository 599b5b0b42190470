//! The shared audio controller.
//!
//! One [`AudioController`] multiplexes a fixed set of named sections, each
//! backed by its own [`AudioPlayer`]. It mirrors every player's activity
//! into a per-section [`PlaybackState`] snapshot, fans events out to any
//! number of UI listeners and persists volume/shuffle/loop through the
//! [`SettingsStore`] collaborator. Construct it once at application start
//! and hand references to every window that needs it.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::error;

use crate::audio::{
    AudioPlayer, ListenerId, PlaybackBackend, PlayerEvent, create_backend, panic_message,
};
use crate::config::AudioSettings;
use crate::library::{SettingsStore, Track};

use super::state::{
    ControllerError, ControllerEvent, ControllerListener, PlaybackState, SECTION_KEYS,
};

/// Factory invoked once per section on that section's audio thread.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn PlaybackBackend> + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    callback: ControllerListener,
}

type ListenerSet = Arc<Mutex<Vec<Arc<ListenerEntry>>>>;

struct SectionSlot {
    player: AudioPlayer,
    state: Arc<Mutex<PlaybackState>>,
}

pub struct AudioController {
    library: Arc<dyn SettingsStore>,
    sections: HashMap<&'static str, SectionSlot>,
    listeners: ListenerSet,
    next_listener_id: AtomicU64,
}

impl AudioController {
    /// Create a controller over the platform audio backend.
    pub fn new(library: Arc<dyn SettingsStore>, settings: &AudioSettings) -> Self {
        Self::with_backend_factory(library, settings, Arc::new(create_backend))
    }

    /// Create a controller with a custom backend factory; tests inject
    /// scripted backends through this.
    pub fn with_backend_factory(
        library: Arc<dyn SettingsStore>,
        settings: &AudioSettings,
        backend_factory: BackendFactory,
    ) -> Self {
        let listeners: ListenerSet = Arc::new(Mutex::new(Vec::new()));
        let poll_interval = Duration::from_millis(settings.poll_interval_ms);
        let mut sections = HashMap::new();

        for &section in SECTION_KEYS {
            let saved = library.section_settings(section);
            let state = Arc::new(Mutex::new(PlaybackState::from_saved(&saved)));

            let factory = backend_factory.clone();
            let player = AudioPlayer::new(Box::new(move || factory()), poll_interval);

            let handler_state = state.clone();
            let handler_listeners = listeners.clone();
            player.add_listener(Box::new(move |event| {
                handle_player_event(section, event, &handler_state, &handler_listeners);
            }));

            // Apply saved settings to the player without re-saving them.
            player.set_volume(saved.volume);
            player.set_shuffle(saved.shuffle);
            player.set_loop(saved.loop_enabled);

            sections.insert(section, SectionSlot { player, state });
        }

        Self {
            library,
            sections,
            listeners,
            next_listener_id: AtomicU64::new(1),
        }
    }

    // ------------------------------------------------------------------
    // Listener handling
    // ------------------------------------------------------------------

    pub fn add_listener(&self, callback: ControllerListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::new(ListenerEntry { id, callback }));
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|entry| entry.id != id);
        }
    }

    // ------------------------------------------------------------------
    // Public API used by UI components
    // ------------------------------------------------------------------

    /// Replace a section's playlist. Stops playback when the current track
    /// does not survive the replacement.
    pub fn set_playlist(
        &self,
        section: &str,
        tracks: Vec<Track>,
        category: Option<&str>,
    ) -> Result<(), ControllerError> {
        let slot = self.slot(section)?;
        slot.player.set_playlist(tracks.clone());

        let category = category.map(|c| c.to_string());
        let snapshot = {
            let mut state = match slot.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.playlist = tracks.clone();
            state.category = category.clone();
            state.last_error.clear();
            if !track_in_playlist(state.current_track.as_ref(), &tracks) {
                state.current_track = None;
                state.is_playing = false;
            }
            if !track_in_playlist(state.last_track.as_ref(), &tracks) {
                state.last_track = None;
            }
            state.clone()
        };

        emit_to(
            &self.listeners,
            section,
            &ControllerEvent::PlaylistSet {
                playlist: tracks,
                category,
            },
        );
        emit_to(
            &self.listeners,
            section,
            &ControllerEvent::StateChanged { state: snapshot },
        );
        Ok(())
    }

    /// Start playback, optionally at an explicit index. Returns `Ok(false)`
    /// with `last_error` set when the track could not be started.
    pub fn play(
        &self,
        section: &str,
        start_index: Option<usize>,
    ) -> Result<bool, ControllerError> {
        let slot = self.slot(section)?;
        let success = slot.player.play(start_index);
        self.finish_play(section, slot, success)
    }

    /// Start playback of the playlist entry with the given track id.
    pub fn play_track(&self, section: &str, track_id: &str) -> Result<bool, ControllerError> {
        let slot = self.slot(section)?;
        let success = slot.player.play_track_id(track_id);
        self.finish_play(section, slot, success)
    }

    /// Stop the section's playback. The backend has no pause capability,
    /// so pause and stop are the same operation.
    pub fn pause(&self, section: &str) -> Result<(), ControllerError> {
        let slot = self.slot(section)?;
        slot.player.stop();
        Ok(())
    }

    pub fn stop(&self, section: &str) -> Result<(), ControllerError> {
        self.pause(section)
    }

    pub fn next(&self, section: &str) -> Result<bool, ControllerError> {
        let slot = self.slot(section)?;
        let success = slot.player.next();
        self.finish_navigation(section, slot, success)
    }

    pub fn previous(&self, section: &str) -> Result<bool, ControllerError> {
        let slot = self.slot(section)?;
        let success = slot.player.previous();
        self.finish_navigation(section, slot, success)
    }

    pub fn set_shuffle(&self, section: &str, enabled: bool) -> Result<(), ControllerError> {
        let slot = self.slot(section)?;
        slot.player.set_shuffle(enabled);
        self.library.save_shuffle(section, enabled);
        Ok(())
    }

    pub fn set_loop(&self, section: &str, enabled: bool) -> Result<(), ControllerError> {
        let slot = self.slot(section)?;
        slot.player.set_loop(enabled);
        self.library.save_loop(section, enabled);
        Ok(())
    }

    pub fn set_volume(&self, section: &str, value: f32) -> Result<(), ControllerError> {
        let slot = self.slot(section)?;
        let normalized = value.clamp(0.0, 1.0);
        slot.player.set_volume(normalized);
        self.library.save_volume(section, normalized);
        Ok(())
    }

    /// Snapshot of the section's state; `None` for unknown sections so
    /// read-only callers never have to handle an error.
    pub fn get_state(&self, section: &str) -> Option<PlaybackState> {
        let slot = self.sections.get(section)?;
        match slot.state.lock() {
            Ok(state) => Some(state.clone()),
            Err(poisoned) => Some(poisoned.into_inner().clone()),
        }
    }

    pub fn get_last_error(&self, section: &str) -> String {
        self.get_state(section)
            .map(|state| state.last_error)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn slot(&self, section: &str) -> Result<&SectionSlot, ControllerError> {
        self.sections
            .get(section)
            .ok_or_else(|| ControllerError::UnknownSection(section.to_string()))
    }

    fn finish_play(
        &self,
        section: &str,
        slot: &SectionSlot,
        success: bool,
    ) -> Result<bool, ControllerError> {
        let message = if success {
            String::new()
        } else {
            slot.player.last_error()
        };
        self.update_last_error(section, slot, &message);
        if !success {
            emit_to(
                &self.listeners,
                section,
                &ControllerEvent::PlayFailed { message },
            );
        }
        Ok(success)
    }

    fn finish_navigation(
        &self,
        section: &str,
        slot: &SectionSlot,
        success: bool,
    ) -> Result<bool, ControllerError> {
        let message = if success {
            String::new()
        } else {
            slot.player.last_error()
        };
        self.update_last_error(section, slot, &message);
        if !success && !message.is_empty() {
            emit_to(
                &self.listeners,
                section,
                &ControllerEvent::NavigationFailed { message },
            );
        }
        Ok(success)
    }

    fn update_last_error(&self, section: &str, slot: &SectionSlot, message: &str) {
        let snapshot = {
            let mut state = match slot.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.last_error = message.to_string();
            state.clone()
        };
        emit_to(
            &self.listeners,
            section,
            &ControllerEvent::StateChanged { state: snapshot },
        );
    }
}

/// Translate a raw player event into state mutations, then re-emit it plus
/// a `StateChanged` snapshot. Runs on the player's audio thread.
fn handle_player_event(
    section: &'static str,
    event: &PlayerEvent,
    state: &Arc<Mutex<PlaybackState>>,
    listeners: &ListenerSet,
) {
    let snapshot = {
        let mut state = match state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply_player_event(&mut state, event);
        state.clone()
    };
    emit_to(listeners, section, &ControllerEvent::from_player(event));
    emit_to(
        listeners,
        section,
        &ControllerEvent::StateChanged { state: snapshot },
    );
}

fn apply_player_event(state: &mut PlaybackState, event: &PlayerEvent) {
    match event {
        PlayerEvent::TrackStarted { track, .. } => {
            state.current_track = Some(track.clone());
            state.last_track = Some(track.clone());
            state.is_playing = true;
            state.last_error.clear();
        }
        PlayerEvent::Stopped { track, .. } => {
            state.is_playing = false;
            state.last_track = Some(track.clone());
        }
        PlayerEvent::PlaylistEnded => {
            state.is_playing = false;
            if let Some(current) = state.current_track.clone() {
                state.last_track = Some(current);
            }
        }
        PlayerEvent::VolumeChanged { value } => state.volume = *value,
        PlayerEvent::ShuffleChanged { value } => state.shuffle = *value,
        PlayerEvent::LoopChanged { value } => state.loop_enabled = *value,
        PlayerEvent::Error { track, message } => {
            state.last_error = message.clone();
            state.is_playing = false;
            if let Some(track) = track.clone() {
                state.last_track = Some(track);
            }
        }
    }
}

/// Deliver an event to every controller listener. Callbacks are snapshotted
/// out of the lock before dispatch and panics are isolated, so a broken
/// listener neither deadlocks registration nor starves other observers.
fn emit_to(listeners: &ListenerSet, section: &str, event: &ControllerEvent) {
    let entries: Vec<Arc<ListenerEntry>> = match listeners.lock() {
        Ok(entries) => entries.clone(),
        Err(_) => return,
    };
    for entry in entries {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (entry.callback)(section, event))) {
            error!("controller: listener panicked: {}", panic_message(&panic));
        }
    }
}

fn track_in_playlist(track: Option<&Track>, playlist: &[Track]) -> bool {
    match track {
        Some(track) => playlist.iter().any(|item| item.is_same(track)),
        None => false,
    }
}
