//! Audio subsystem: backend abstraction and playlist player.
//!
//! [`AudioPlayer`] owns one playlist, the shuffle/loop/volume flags and a
//! background audio thread that performs playback through a
//! [`PlaybackBackend`] and auto-advances when a track finishes. Events are
//! delivered to registered listeners; failures surface as a `false` return
//! plus a `last_error` message, never as panics or errors from the public
//! API.

mod backend;
mod native;
mod player;
mod thread;
mod types;

pub use backend::{BackendError, NullBackend, PlaybackBackend, create_backend};
pub use native::RodioBackend;
pub use player::{AudioPlayer, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use types::{ListenerId, PlayerEvent, PlayerListener, PlayerStatus};

pub(crate) use thread::panic_message;
