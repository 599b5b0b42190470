//! The audio thread: playlist state machine plus monitor loop.
//!
//! One dedicated thread per player owns the backend and every piece of
//! mutable playlist state. Commands arrive over an mpsc channel; the
//! `recv_timeout` tick doubles as the monitor poll that detects track
//! completion and auto-advances. Because all mutation happens on this
//! thread, commands serialize naturally and no stop-request flag is
//! needed to keep navigation and auto-advance from racing.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, warn};
use rand::RngExt;
use rand::prelude::IndexedRandom;

use crate::library::Track;

use super::backend::PlaybackBackend;
use super::types::{ListenerId, PlayerCmd, PlayerEvent, PlayerListener, StatusHandle};

pub(super) fn spawn_audio_thread(
    backend_factory: Box<dyn FnOnce() -> Box<dyn PlaybackBackend> + Send>,
    rx: Receiver<PlayerCmd>,
    status: StatusHandle,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let backend = backend_factory();
        let mut core = PlayerCore::new(backend, status);

        loop {
            match rx.recv_timeout(poll_interval) {
                Ok(PlayerCmd::Shutdown) => break,
                Ok(cmd) => core.handle(cmd),
                Err(RecvTimeoutError::Timeout) => core.poll_tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        core.backend.stop();
        core.backend.close();
    })
}

/// All player state, confined to the audio thread.
struct PlayerCore {
    backend: Box<dyn PlaybackBackend>,
    supports_polling: bool,
    status: StatusHandle,
    listeners: Vec<(ListenerId, PlayerListener)>,
    playlist: Vec<Track>,
    current: Option<usize>,
    shuffle: bool,
    loop_enabled: bool,
    volume: f32,
    is_playing: bool,
    last_error: String,
}

impl PlayerCore {
    fn new(backend: Box<dyn PlaybackBackend>, status: StatusHandle) -> Self {
        let supports_polling = backend.supports_polling();
        Self {
            backend,
            supports_polling,
            status,
            listeners: Vec::new(),
            playlist: Vec::new(),
            current: None,
            shuffle: false,
            loop_enabled: false,
            volume: 0.8,
            is_playing: false,
            last_error: String::new(),
        }
    }

    fn handle(&mut self, cmd: PlayerCmd) {
        match cmd {
            PlayerCmd::SetPlaylist { tracks, reply } => {
                self.set_playlist(tracks);
                let _ = reply.send(());
            }
            PlayerCmd::Play { start_index, reply } => {
                let _ = reply.send(self.play(start_index));
            }
            PlayerCmd::PlayTrackId { track_id, reply } => {
                let _ = reply.send(self.play_track_id(&track_id));
            }
            PlayerCmd::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            PlayerCmd::Next { reply } => {
                let _ = reply.send(self.next());
            }
            PlayerCmd::Previous { reply } => {
                let _ = reply.send(self.previous());
            }
            PlayerCmd::SetShuffle { enabled, reply } => {
                self.shuffle = enabled;
                self.emit(&PlayerEvent::ShuffleChanged { value: enabled });
                let _ = reply.send(());
            }
            PlayerCmd::SetLoop { enabled, reply } => {
                self.loop_enabled = enabled;
                self.emit(&PlayerEvent::LoopChanged { value: enabled });
                let _ = reply.send(());
            }
            PlayerCmd::SetVolume { value, reply } => {
                self.set_volume(value);
                let _ = reply.send(());
            }
            PlayerCmd::AddListener {
                id,
                callback,
                reply,
            } => {
                self.listeners.push((id, callback));
                let _ = reply.send(());
            }
            PlayerCmd::RemoveListener { id, reply } => {
                self.listeners.retain(|(lid, _)| *lid != id);
                let _ = reply.send(());
            }
            PlayerCmd::Shutdown => unreachable!("handled by the thread loop"),
        }
    }

    /// Monitor tick: detect end-of-track and auto-advance.
    fn poll_tick(&mut self) {
        if !self.supports_polling || !self.is_playing {
            return;
        }
        if self.backend.is_active() {
            return;
        }
        self.advance_after_track();
    }

    // ------------------------------------------------------------------
    // Playlist control
    // ------------------------------------------------------------------

    fn set_playlist(&mut self, tracks: Vec<Track>) {
        self.last_error.clear();
        let current_track = self.current.and_then(|i| self.playlist.get(i).cloned());
        self.playlist = tracks;

        let carried = current_track
            .as_ref()
            .and_then(|cur| position_of(&self.playlist, cur));
        match carried {
            Some(index) => self.current = Some(index),
            None => {
                // Current track is gone (or the playlist is empty): force idle.
                if self.is_playing {
                    self.backend.stop();
                    self.backend.close();
                    self.is_playing = false;
                }
                self.current = None;
            }
        }
        self.sync_status();
    }

    fn play(&mut self, start_index: Option<usize>) -> bool {
        if self.playlist.is_empty() {
            self.fail("Playlist is empty.");
            return false;
        }
        let index = match start_index {
            Some(index) => index.min(self.playlist.len() - 1),
            None => match self.current {
                Some(index) => index,
                None if self.shuffle => rand::rng().random_range(0..self.playlist.len()),
                None => 0,
            },
        };
        self.start_track(index)
    }

    fn play_track_id(&mut self, track_id: &str) -> bool {
        match self.playlist.iter().position(|t| t.id == track_id) {
            Some(index) => self.start_track(index),
            None => {
                self.fail("Track not found in playlist.");
                false
            }
        }
    }

    fn stop(&mut self) {
        if !self.is_playing {
            return;
        }
        self.backend.stop();
        self.backend.close();
        self.is_playing = false;
        self.last_error.clear();
        self.sync_status();
        if let Some((index, track)) = self.current_entry() {
            self.emit(&PlayerEvent::Stopped { track, index });
        }
    }

    fn next(&mut self) -> bool {
        if self.playlist.is_empty() {
            self.fail("Playlist is empty.");
            return false;
        }
        if self.shuffle && self.playlist.len() > 1 {
            return self.start_track(self.random_other_index());
        }
        let next_index = self.current.map_or(0, |i| i + 1);
        if next_index >= self.playlist.len() {
            if self.loop_enabled {
                return self.start_track(0);
            }
            self.stop();
            self.emit(&PlayerEvent::PlaylistEnded);
            self.fail("Reached end of playlist.");
            return false;
        }
        self.start_track(next_index)
    }

    fn previous(&mut self) -> bool {
        if self.playlist.is_empty() {
            self.fail("Playlist is empty.");
            return false;
        }
        if self.shuffle && self.playlist.len() > 1 {
            return self.start_track(self.random_other_index());
        }
        // At the start, prev wraps only with loop enabled; otherwise it
        // clamps to the first track instead of ending the playlist, so
        // browsing backward never silently stops playback.
        let prev_index = match self.current {
            Some(index) if index > 0 => index - 1,
            _ if self.loop_enabled => self.playlist.len() - 1,
            _ => 0,
        };
        self.start_track(prev_index)
    }

    /// Auto-advance after the backend reports the current track finished.
    /// Shares the navigation policy with `next`, but exhaustion here ends
    /// quietly: the track already finished, so there is nothing to stop.
    fn advance_after_track(&mut self) {
        if self.playlist.is_empty() {
            self.is_playing = false;
            self.current = None;
            self.sync_status();
            self.emit(&PlayerEvent::PlaylistEnded);
            return;
        }
        let next_index = if self.shuffle && self.playlist.len() > 1 {
            self.random_other_index()
        } else {
            let candidate = self.current.map_or(0, |i| i + 1);
            if candidate >= self.playlist.len() {
                if self.loop_enabled {
                    0
                } else {
                    self.is_playing = false;
                    self.sync_status();
                    self.emit(&PlayerEvent::PlaylistEnded);
                    return;
                }
            } else {
                candidate
            }
        };
        self.start_track(next_index);
    }

    fn start_track(&mut self, index: usize) -> bool {
        let Some(track) = self.playlist.get(index).cloned() else {
            self.fail("Track index is out of range.");
            return false;
        };
        if track.path.as_os_str().is_empty() {
            self.fail("Track has no valid path.");
            self.emit(&PlayerEvent::Error {
                track: Some(track),
                message: "Track has no valid path.".to_string(),
            });
            return false;
        }
        if !track.path.exists() {
            let message = format!("File not found: {}", track.path.display());
            self.fail(&message);
            self.emit(&PlayerEvent::Error {
                track: Some(track),
                message,
            });
            return false;
        }

        let started = self
            .backend
            .load(&track.path)
            .and_then(|_| {
                if let Err(e) = self.backend.set_volume(self.volume) {
                    warn!("audio: backend rejected volume: {e}");
                }
                self.backend.play(false)
            });
        if let Err(err) = started {
            let message = err.to_string();
            error!("audio: failed to play {:?}: {message}", track.path);
            self.fail(&message);
            self.emit(&PlayerEvent::Error {
                track: Some(track),
                message,
            });
            return false;
        }

        self.current = Some(index);
        self.is_playing = true;
        self.last_error.clear();
        self.sync_status();
        self.emit(&PlayerEvent::TrackStarted { track, index });
        true
    }

    fn set_volume(&mut self, value: f32) {
        self.volume = value.clamp(0.0, 1.0);
        if let Err(err) = self.backend.set_volume(self.volume) {
            warn!("audio: backend rejected volume: {err}");
        }
        // Emitted even when the backend rejected the value; the flag is the
        // accepted setting, not the applied one.
        self.emit(&PlayerEvent::VolumeChanged { value: self.volume });
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    /// Uniform pick among all indices other than the current one.
    /// Callers guarantee the playlist has at least two tracks.
    fn random_other_index(&self) -> usize {
        let choices: Vec<usize> = (0..self.playlist.len())
            .filter(|&i| Some(i) != self.current)
            .collect();
        let mut rng = rand::rng();
        choices.choose(&mut rng).copied().unwrap_or(0)
    }

    fn current_entry(&self) -> Option<(usize, Track)> {
        let index = self.current?;
        self.playlist.get(index).map(|t| (index, t.clone()))
    }

    fn fail(&mut self, message: &str) {
        self.last_error = message.to_string();
        self.sync_status();
    }

    fn sync_status(&self) {
        if let Ok(mut status) = self.status.lock() {
            status.index = self.current;
            status.current_track = self.current.and_then(|i| self.playlist.get(i).cloned());
            status.is_playing = self.is_playing;
            status.last_error = self.last_error.clone();
        }
    }

    /// Deliver an event to every listener, isolating panics so one bad
    /// observer cannot break playback or starve the others.
    fn emit(&self, event: &PlayerEvent) {
        for (_, callback) in &self.listeners {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                error!("audio: listener panicked: {}", panic_message(&panic));
            }
        }
    }
}

fn position_of(playlist: &[Track], track: &Track) -> Option<usize> {
    playlist.iter().position(|item| item.is_same(track))
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
