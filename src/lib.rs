//! Sectioned playlist and playback engine for tabletop GM soundboards.
//!
//! The crate is organized around three layers:
//!
//! - [`audio`]: one [`audio::AudioPlayer`] per playlist, running playback
//!   on a dedicated thread through a pluggable [`audio::PlaybackBackend`].
//! - [`library`]: directory scanning into [`library::Track`]s and the
//!   persisted per-section settings store.
//! - [`controller`]: the [`controller::AudioController`] façade that UIs
//!   talk to, multiplexing the named sections and fanning out events.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bardbox::config::Settings;
//! use bardbox::controller::AudioController;
//! use bardbox::library::AudioLibrary;
//!
//! let settings = Settings::load().unwrap();
//! let library = Arc::new(AudioLibrary::new(settings.resolve_library_path()));
//! let controller = AudioController::new(library, &settings.audio);
//! controller.play("music", None).ok();
//! ```

pub mod audio;
pub mod config;
pub mod controller;
pub mod library;
