use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use bardbox::config::Settings;
use bardbox::controller::{AudioController, ControllerEvent, DEFAULT_SECTION, SECTION_KEYS};
use bardbox::library::{AudioLibrary, scan};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let settings = Settings::load()?;
    settings.validate().map_err(io::Error::other)?;

    let library = Arc::new(AudioLibrary::new(settings.resolve_library_path()));
    let controller = AudioController::new(library.clone(), &settings.audio);

    controller.add_listener(Box::new(|section, event| match event {
        ControllerEvent::TrackStarted { track, .. } => {
            println!("[{section}] playing: {}", track.name);
        }
        ControllerEvent::Stopped { track, .. } => {
            println!("[{section}] stopped: {}", track.name);
        }
        ControllerEvent::PlaylistEnded => println!("[{section}] playlist ended"),
        ControllerEvent::Error { message, .. } => println!("[{section}] error: {message}"),
        _ => {}
    }));

    let mut section = DEFAULT_SECTION.to_string();

    // Load a playlist from the command line or the last session's directory.
    let dir = env::args()
        .nth(1)
        .unwrap_or_else(|| library.last_directory(&section));
    if !dir.is_empty() {
        load_directory(&controller, &library, &settings, &section, &dir);
    }

    println!("bardbox. Type 'help' for commands.");
    let stdin = io::stdin();
    loop {
        print!("{section}> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        let result = match command {
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => break,
            "section" => {
                match arg {
                    Some(name) if SECTION_KEYS.contains(&name) => section = name.to_string(),
                    Some(name) => println!("unknown section '{name}' (try: {SECTION_KEYS:?})"),
                    None => println!("sections: {SECTION_KEYS:?}"),
                }
                Ok(())
            }
            "load" => {
                match arg {
                    Some(dir) => load_directory(&controller, &library, &settings, &section, dir),
                    None => println!("usage: load <directory>"),
                }
                Ok(())
            }
            "list" => {
                if let Some(state) = controller.get_state(&section) {
                    for (i, track) in state.playlist.iter().enumerate() {
                        println!("{i:3}  {}", track.name);
                    }
                }
                Ok(())
            }
            "play" => {
                let index = arg.and_then(|a| a.parse().ok());
                controller.play(&section, index).map(report_outcome)
            }
            "stop" => controller.stop(&section),
            "next" => controller.next(&section).map(report_outcome),
            "prev" => controller.previous(&section).map(report_outcome),
            "shuffle" => controller.set_shuffle(&section, arg == Some("on")),
            "loop" => controller.set_loop(&section, arg == Some("on")),
            "vol" => match arg.and_then(|a| a.parse::<f32>().ok()) {
                Some(value) => controller.set_volume(&section, value),
                None => {
                    println!("usage: vol <0.0..=1.0>");
                    Ok(())
                }
            },
            "state" => {
                print_state(&controller, &section);
                Ok(())
            }
            other => {
                println!("unknown command '{other}' (try 'help')");
                Ok(())
            }
        };
        if let Err(err) = result {
            println!("{err}");
        }
    }

    Ok(())
}

fn load_directory(
    controller: &AudioController,
    library: &AudioLibrary,
    settings: &Settings,
    section: &str,
    dir: &str,
) {
    let tracks = scan(Path::new(dir), &settings.library);
    println!("loaded {} tracks from {dir}", tracks.len());
    if controller.set_playlist(section, tracks, None).is_ok() {
        library.save_last_directory(section, dir);
    }
}

fn report_outcome(success: bool) {
    if !success {
        println!("(nothing started)");
    }
}

fn print_state(controller: &AudioController, section: &str) {
    let Some(state) = controller.get_state(section) else {
        return;
    };
    println!(
        "playing: {}  track: {}  vol: {:.2}  shuffle: {}  loop: {}",
        state.is_playing,
        state
            .current_track
            .map(|t| t.name)
            .unwrap_or_else(|| "-".to_string()),
        state.volume,
        state.shuffle,
        state.loop_enabled,
    );
    if !state.last_error.is_empty() {
        println!("last error: {}", state.last_error);
    }
}

fn print_help() {
    println!(
        "commands:\n  \
         section [name]   switch or list sections\n  \
         load <dir>       scan a directory into the current section\n  \
         list             show the playlist\n  \
         play [index]     start playback\n  \
         stop             stop playback\n  \
         next / prev      navigate\n  \
         shuffle on|off   toggle shuffle\n  \
         loop on|off      toggle looping\n  \
         vol <value>      set volume (0.0..=1.0)\n  \
         state            show the section state\n  \
         quit             exit"
    );
}
