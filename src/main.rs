use tonetype::console_display;
use tonetype::coordinator::Coordinator;
use tonetype::data_logger;
use tonetype::host::EditorHost;
use tonetype::osc_sender::OscContext;
use tonetype::recorder::RecorderContext;
use tonetype::sequencer::AudioContext;
use tonetype::session::{PersistedState, Session, Settings};
use tonetype::stdin_reader::StdinReader;
use tonetype::typist::Typist;
use tonetype::types::*;

use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, Sender};
use log::{error, info};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Log sequencer calls, no sound
    Log,
    /// Drive an external synth over OSC
    Osc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Input {
    /// Scripted typing of a demo text
    Typist,
    /// Lines typed on stdin
    Stdin,
}

#[derive(Parser)]
#[command(name = "tonetype")]
#[command(about = "Plays a melody over a looping bassline as you type")]
struct Cli {
    /// Where sequencer calls go
    #[arg(long, value_enum, default_value_t = Backend::Log)]
    backend: Backend,

    /// OSC synth address (with --backend osc)
    #[arg(long, default_value = "127.0.0.1:57120")]
    osc_target: String,

    /// Keystroke source
    #[arg(long, value_enum, default_value_t = Input::Typist)]
    input: Input,

    /// Typist demo text: "lorem" (default), "code", or "scale"
    #[arg(long, default_value = "lorem")]
    demo: String,

    /// Typist speed (words per minute)
    #[arg(long, default_value_t = 80)]
    wpm: u32,

    /// Number of open editors in the host
    #[arg(long, default_value_t = 1)]
    editors: u32,

    /// JSON settings file (tempo, max_notes, ornament_chance)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tempo override (BPM)
    #[arg(long)]
    tempo: Option<u32>,

    /// Melody length override (primary notes before rollover)
    #[arg(long)]
    max_notes: Option<usize>,

    /// Ornament probability override (0.0–1.0)
    #[arg(long)]
    ornament_chance: Option<f64>,

    /// Seed for the ornament draws (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Persisted view state, read at start and written at exit
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Enable console display (terminal panel)
    #[arg(long)]
    console: bool,

    /// Enable session logging
    #[arg(long)]
    log_data: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli);
    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  TONETYPE v{}", env!("CARGO_PKG_VERSION"));
    info!("  Tempo: {} BPM  Melody: {} notes  Ornaments: {:.0}%",
          settings.tempo, settings.max_notes, settings.ornament_chance * 100.0);
    info!("  Backend: {:?}  Input: {:?}", cli.backend, cli.input);
    if cli.console { info!("  UI: Console panel"); }
    if cli.log_data { info!("  Logging to {:?}", cli.output_dir); }
    info!("═══════════════════════════════════════════════");

    let host = EditorHost::new();
    let editors: Vec<EditorId> = (0..cli.editors.max(1)).map(|_| host.open_editor()).collect();

    // Channel: host → coordinator
    let (input_tx, input_rx) = bounded::<InputEvent>(4096);

    // Channels: coordinator → consumers
    let mut frame_txs: Vec<Sender<NoteFrame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<NoteFrame>(256);
        frame_txs.push(tx);
        let max_notes = settings.max_notes;
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            console_display::ConsoleDisplay::new(rx, max_notes).run();
        }).unwrap());
    }

    // ─── Session logger ─────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<NoteFrame>(4096);
        match data_logger::DataLogger::new(rx, &cli.output_dir, settings.clone()) {
            Ok(logger) => {
                frame_txs.push(tx);
                handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
                    if let Err(e) = logger.run() {
                        error!("Session logger failed: {}", e);
                    }
                }).unwrap());
            }
            Err(e) => error!("Cannot create session directory in {:?}: {}", cli.output_dir, e),
        }
    }

    // ─── Coordinator ────────────────────────────────────────────────
    let state = cli
        .state_file
        .as_deref()
        .and_then(PersistedState::load)
        .unwrap_or_default();
    let rng = match cli.seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_entropy(),
    };
    let coordinator = match cli.backend {
        Backend::Log => spawn_coordinator(
            RecorderContext::new(clock.clone()),
            &host, &input_tx, input_rx, frame_txs, &settings, rng, state, &clock,
        ),
        Backend::Osc => match OscContext::new(cli.osc_target.clone(), clock.clone()) {
            Ok(ctx) => spawn_coordinator(
                ctx, &host, &input_tx, input_rx, frame_txs, &settings, rng, state, &clock,
            ),
            Err(e) => Err(e),
        },
    };
    let coordinator = match coordinator {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    // ─── Input source (runs to completion) ──────────────────────────
    let editor = editors[0];
    let source_host = host.clone();
    let input = cli.input;
    let demo = cli.demo.clone();
    let wpm = cli.wpm;
    let source = thread::Builder::new().name("input".into()).spawn(move || match input {
        Input::Typist => Typist::new(source_host, editor, wpm).run(&demo),
        Input::Stdin => StdinReader::new(source_host, editor).run(),
    }).unwrap();
    let _ = source.join();
    let _ = input_tx.send(InputEvent::Shutdown);

    match coordinator.join() {
        Ok(state) => {
            if let Some(path) = cli.state_file.as_deref() {
                if let Err(e) = state.save(path) {
                    error!("Failed to save state to {:?}: {}", path, e);
                }
            }
        }
        Err(_) => error!("Coordinator thread panicked; state not saved"),
    }

    for h in handles {
        let _ = h.join();
    }
    info!("Bye.");
}

fn resolve_settings(cli: &Cli) -> Settings {
    let mut settings = cli
        .config
        .as_deref()
        .and_then(Settings::load)
        .unwrap_or_default();
    if let Some(t) = cli.tempo {
        settings.tempo = t;
    }
    if let Some(n) = cli.max_notes {
        settings.max_notes = n;
    }
    if let Some(p) = cli.ornament_chance {
        settings.ornament_chance = p;
    }
    settings
}

/// Create the session on this thread, so its commands are registered
/// before any input source starts, then hand it to the coordinator thread.
#[allow(clippy::too_many_arguments)]
fn spawn_coordinator<C>(
    ctx: C,
    host: &EditorHost,
    input_tx: &Sender<InputEvent>,
    input_rx: crossbeam_channel::Receiver<InputEvent>,
    frame_txs: Vec<Sender<NoteFrame>>,
    settings: &Settings,
    rng: Pcg32,
    state: PersistedState,
    clock: &SessionClock,
) -> tonetype::Result<JoinHandle<PersistedState>>
where
    C: AudioContext + Send + 'static,
    C::Sequence: Send + 'static,
{
    let session = Session::create(host.clone(), ctx, input_tx.clone(), settings, rng, state)?;
    let clock = clock.clone();
    let handle = thread::Builder::new().name("coordinator".into()).spawn(move || {
        Coordinator::new(input_rx, frame_txs, session, clock).run().serialize()
    })?;
    Ok(handle)
}
