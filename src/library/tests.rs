use std::path::PathBuf;

use tempfile::tempdir;

use super::model::Track;
use super::store::{AudioLibrary, SettingsStore};

fn t(id: &str, path: &str) -> Track {
    Track {
        id: id.into(),
        name: id.into(),
        path: PathBuf::from(path),
        category: "general".into(),
    }
}

#[test]
fn track_is_same_matches_by_id_then_path() {
    let a = t("a", "/music/a.mp3");
    assert!(a.is_same(&t("a", "/elsewhere/renamed.mp3")));
    assert!(a.is_same(&t("other", "/music/a.mp3")));
    assert!(!a.is_same(&t("other", "/music/b.mp3")));

    // Empty ids fall through to the path comparison.
    let anon = t("", "/music/a.mp3");
    assert!(anon.is_same(&t("", "/music/a.mp3")));
    assert!(!anon.is_same(&t("", "/music/b.mp3")));
}

#[test]
fn library_starts_with_per_section_defaults() {
    let dir = tempdir().unwrap();
    let library = AudioLibrary::new(dir.path().join("audio_library.toml"));

    let music = library.section_settings("music");
    assert!((music.volume - 0.65).abs() < f32::EPSILON);
    assert!(music.loop_enabled);
    assert!(!music.shuffle);

    let effects = library.section_settings("effects");
    assert!((effects.volume - 0.75).abs() < f32::EPSILON);
    assert!(!effects.loop_enabled);
}

#[test]
fn library_persists_settings_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audio_library.toml");

    {
        let library = AudioLibrary::new(&path);
        library.save_volume("music", 0.42);
        library.save_shuffle("music", true);
        library.save_loop("effects", true);
        library.save_last_directory("music", "/campaign/audio");
    }

    let reloaded = AudioLibrary::new(&path);
    let music = reloaded.section_settings("music");
    assert!((music.volume - 0.42).abs() < 1e-6);
    assert!(music.shuffle);
    assert!(reloaded.section_settings("effects").loop_enabled);
    assert_eq!(reloaded.last_directory("music"), "/campaign/audio");
}

#[test]
fn library_clamps_persisted_volume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audio_library.toml");

    let library = AudioLibrary::new(&path);
    library.save_volume("music", 7.5);
    assert!((library.section_settings("music").volume - 1.0).abs() < f32::EPSILON);

    // Out-of-range values written by hand are clamped on load too.
    std::fs::write(
        &path,
        "[music]\nvolume = 3.0\nshuffle = false\nloop = true\nlast_directory = \"\"\n",
    )
    .unwrap();
    let reloaded = AudioLibrary::new(&path);
    assert!((reloaded.section_settings("music").volume - 1.0).abs() < f32::EPSILON);
}

#[test]
fn library_falls_back_to_defaults_on_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audio_library.toml");
    std::fs::write(&path, "this is { not toml").unwrap();

    let library = AudioLibrary::new(&path);
    let music = library.section_settings("music");
    assert!((music.volume - 0.65).abs() < f32::EPSILON);
}

#[test]
fn unknown_section_reads_give_defaults() {
    let dir = tempdir().unwrap();
    let library = AudioLibrary::new(dir.path().join("audio_library.toml"));
    let ambient = library.section_settings("ambient");
    assert!((ambient.volume - 0.8).abs() < f32::EPSILON);
    assert!(!ambient.shuffle);
}
