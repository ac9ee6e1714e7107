//! Headless driver for the mixer engine: loads WAV files (or a saved
//! project), plays them through the transport with optional metronome and
//! MIDI control, and reports the playhead on stdout.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mixdeck_audio::{NullBackend, SystemClock};
use mixdeck_core::config::Config;
use mixdeck_core::midi::MidiInputManager;
use mixdeck_core::project::ProjectSnapshot;
use mixdeck_core::Mixdeck;
use mixdeck_types::{Action, MidiAction, Notice, TransportAction};

/// Frame pacing of the main loop; the engine gates its own intervals.
const FRAME: Duration = Duration::from_millis(10);
const REPORT_INTERVAL_SECS: f64 = 0.5;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = mixdeck_core::config::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mixdeck.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path).unwrap_or_else(|_| {
        File::create("/tmp/mixdeck.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("mixdeck starting (log level: {:?})", log_level);
}

struct Args {
    verbose: bool,
    metronome: bool,
    looping: bool,
    midi: bool,
    bpm: Option<f32>,
    seek: Option<f64>,
    project: Option<PathBuf>,
    save: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args(args: &[String]) -> Args {
    let value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let takes_value = ["--bpm", "--seek", "--project", "--save"];
    let files = args
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, a)| !a.starts_with('-') && !takes_value.contains(&args[i - 1].as_str()))
        .map(|(_, a)| PathBuf::from(a))
        .collect();

    Args {
        verbose: args.iter().any(|a| a == "--verbose" || a == "-v"),
        metronome: args.iter().any(|a| a == "--metronome"),
        looping: args.iter().any(|a| a == "--loop"),
        midi: args.iter().any(|a| a == "--midi"),
        bpm: value("--bpm").and_then(|s| s.parse().ok()),
        seek: value("--seek").and_then(|s| s.parse().ok()),
        project: value("--project").map(PathBuf::from),
        save: value("--save").map(PathBuf::from),
        files,
    }
}

fn load_files(deck: &mut Mixdeck, files: &[PathBuf]) {
    for path in files {
        let Some(track_id) = deck
            .state()
            .tracks
            .tracks
            .iter()
            .find(|t| !t.has_audio())
            .map(|t| t.id)
        else {
            eprintln!("No free track for {}", path.display());
            break;
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(bytes) => {
                if let Err(e) = deck.load_audio(track_id, &name, &bytes) {
                    eprintln!("{}: {}", path.display(), e);
                }
            }
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }
    }
}

fn restore_project(deck: &mut Mixdeck, path: &Path) -> bool {
    match ProjectSnapshot::load(path) {
        Ok(snapshot) => {
            deck.restore(&snapshot);
            true
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            false
        }
    }
}

fn main() {
    let raw: Vec<String> = std::env::args().collect();
    let args = parse_args(&raw);
    init_logging(args.verbose);

    let config = Config::load();
    let mut deck = match Mixdeck::from_config(&config, Box::new(NullBackend), Box::new(SystemClock::new())) {
        Ok(deck) => deck,
        Err(e) => {
            eprintln!("Could not start audio session: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.project {
        if !restore_project(&mut deck, path) {
            std::process::exit(1);
        }
    }
    load_files(&mut deck, &args.files);

    if let Some(bpm) = args.bpm {
        deck.dispatch(&Action::Transport(TransportAction::SetBpm(bpm)));
    }
    if args.metronome != deck.state().transport().metronome_on {
        deck.dispatch(&Action::Transport(TransportAction::ToggleMetronome));
    }
    if args.looping != deck.state().transport().loop_enabled {
        deck.dispatch(&Action::Transport(TransportAction::ToggleLoop));
    }
    if let Some(seek) = args.seek {
        deck.dispatch(&Action::Transport(TransportAction::Seek(seek)));
    }

    if let Some(path) = &args.save {
        match deck.snapshot().save(path) {
            Ok(()) => println!("Saved {}", path.display()),
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }
    }

    let mut midi = MidiInputManager::new();
    if args.midi {
        midi.refresh_ports();
        for port in midi.list_ports() {
            println!("MIDI input: {} ({})", port.name, port.id);
        }
        deck.dispatch(&Action::Midi(MidiAction::SetDevices(midi.devices())));
        let ids: Vec<String> = midi.list_ports().iter().map(|p| p.id.clone()).collect();
        for id in &ids {
            deck.dispatch(&Action::Midi(MidiAction::SetDeviceEnabled(id.clone(), true)));
        }
        midi.sync_connections(&ids);
    }

    run(&mut deck, &midi);
    deck.shutdown();
}

fn run(deck: &mut Mixdeck, midi: &MidiInputManager) {
    deck.dispatch(&Action::Transport(TransportAction::Play));
    let transport = deck.state().transport();
    println!(
        "Playing {} track(s), {:.1}s timeline at {} bpm{}",
        deck.state().tracks.tracks.iter().filter(|t| t.has_audio()).count(),
        transport.duration,
        transport.bpm,
        if transport.loop_enabled { ", looping" } else { "" }
    );

    let mut last_report = f64::NEG_INFINITY;
    loop {
        for (device, event) in midi.poll_events() {
            deck.handle_midi(&device, &event);
        }

        let result = deck.tick();
        for notice in &result.notices {
            match notice {
                Notice::PlaybackFinished => {
                    println!("Finished");
                    return;
                }
                Notice::MidiBound { control, target } => {
                    println!("Bound {} to track {} {:?}", control, target.track_id, target.control)
                }
            }
        }

        let position = deck.state().transport().current_time;
        if (position - last_report).abs() >= REPORT_INTERVAL_SECS {
            let clipping: Vec<String> = deck
                .state()
                .tracks
                .tracks
                .iter()
                .filter(|t| t.clipping)
                .map(|t| t.name.clone())
                .collect();
            if clipping.is_empty() {
                println!("{:>7.2}s", position);
            } else {
                println!("{:>7.2}s  clipping: {}", position, clipping.join(", "));
            }
            last_report = position;
        }

        std::thread::sleep(FRAME);
    }
}
