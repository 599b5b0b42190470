//! Public handle for one playlist player.
//!
//! `AudioPlayer` is a thin façade over the audio thread: it forwards
//! commands over a channel, waits for replies where the caller needs a
//! synchronous outcome, and reads the shared status snapshot for queries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::library::Track;

use super::backend::{PlaybackBackend, create_backend};
use super::thread::spawn_audio_thread;
use super::types::{
    ListenerId, PlayerCmd, PlayerListener, PlayerStatus, StatusHandle,
};

/// The monitor loop never polls faster than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default poll interval used when no configuration is supplied.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct AudioPlayer {
    tx: Sender<PlayerCmd>,
    status: StatusHandle,
    next_listener_id: AtomicU64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Create a player whose backend is produced on the audio thread by
    /// `backend_factory`. The poll interval is clamped to
    /// [`MIN_POLL_INTERVAL`].
    pub fn new(
        backend_factory: Box<dyn FnOnce() -> Box<dyn PlaybackBackend> + Send>,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(PlayerStatus::default()));

        let handle = spawn_audio_thread(
            backend_factory,
            rx,
            status.clone(),
            poll_interval.max(MIN_POLL_INTERVAL),
        );

        Self {
            tx,
            status,
            next_listener_id: AtomicU64::new(1),
            join: Mutex::new(Some(handle)),
        }
    }

    /// Create a player on the platform backend, falling back to the null
    /// backend when no audio device is available.
    pub fn with_default_backend(poll_interval: Duration) -> Self {
        Self::new(Box::new(create_backend), poll_interval)
    }

    // ------------------------------------------------------------------
    // Playlist control
    // ------------------------------------------------------------------

    /// Replace the playlist. Stops playback if the current track is not in
    /// the new list. Clears the last error.
    pub fn set_playlist(&self, tracks: Vec<Track>) {
        self.request(|reply| PlayerCmd::SetPlaylist { tracks, reply });
    }

    /// Start playback at `start_index` (clamped), at the current track, or
    /// at a starting track chosen by the shuffle policy.
    pub fn play(&self, start_index: Option<usize>) -> bool {
        self.request(|reply| PlayerCmd::Play { start_index, reply })
            .unwrap_or(false)
    }

    /// Start playback of the playlist entry with the given track id.
    pub fn play_track_id(&self, track_id: &str) -> bool {
        let track_id = track_id.to_string();
        self.request(|reply| PlayerCmd::PlayTrackId { track_id, reply })
            .unwrap_or(false)
    }

    /// Stop playback. No-op when nothing is playing.
    pub fn stop(&self) {
        self.request(|reply| PlayerCmd::Stop { reply });
    }

    /// Advance according to the navigation policy. Returns false (and emits
    /// `PlaylistEnded`) at the end of a non-looping playlist.
    pub fn next(&self) -> bool {
        self.request(|reply| PlayerCmd::Next { reply })
            .unwrap_or(false)
    }

    /// Step backward according to the navigation policy.
    pub fn previous(&self) -> bool {
        self.request(|reply| PlayerCmd::Previous { reply })
            .unwrap_or(false)
    }

    pub fn set_shuffle(&self, enabled: bool) {
        self.request(|reply| PlayerCmd::SetShuffle { enabled, reply });
    }

    pub fn set_loop(&self, enabled: bool) {
        self.request(|reply| PlayerCmd::SetLoop { enabled, reply });
    }

    /// Set the volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, value: f32) {
        self.request(|reply| PlayerCmd::SetVolume { value, reply });
    }

    // ------------------------------------------------------------------
    // Listener handling
    // ------------------------------------------------------------------

    pub fn add_listener(&self, callback: PlayerListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.request(|reply| PlayerCmd::AddListener {
            id,
            callback,
            reply,
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.request(|reply| PlayerCmd::RemoveListener { id, reply });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.snapshot().is_playing
    }

    pub fn current_track(&self) -> Option<Track> {
        self.snapshot().current_track
    }

    pub fn last_error(&self) -> String {
        self.snapshot().last_error
    }

    /// Copy of the full status snapshot maintained by the audio thread.
    pub fn snapshot(&self) -> PlayerStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    /// Send a command and wait for its reply. Returns `None` when the audio
    /// thread is gone, which callers treat as operation failure.
    fn request<R>(&self, make: impl FnOnce(Sender<R>) -> PlayerCmd) -> Option<R> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx.send(make(reply_tx)).ok()?;
        reply_rx.recv().ok()
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        let _ = self.tx.send(PlayerCmd::Shutdown);
        if let Ok(mut join) = self.join.lock() {
            if let Some(handle) = join.take() {
                let _ = handle.join();
            }
        }
    }
}
