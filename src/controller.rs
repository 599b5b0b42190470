//! Shared playback coordination across named sections.

mod hub;
mod state;

pub use hub::{AudioController, BackendFactory};
pub use state::{
    ControllerError, ControllerEvent, ControllerListener, DEFAULT_SECTION, PlaybackState,
    SECTION_KEYS,
};
