//! Track catalog and persisted settings.
//!
//! The scanner builds [`Track`]s from a directory tree; [`AudioLibrary`]
//! persists per-section playback settings through the [`SettingsStore`]
//! contract the controller consumes.

mod model;
mod scan;
mod store;

pub use model::Track;
pub use scan::scan;
pub use store::{AudioLibrary, SectionSettings, SettingsStore};

#[cfg(test)]
mod tests;
