//! The plugin context: everything one activation of tonetype owns, built
//! explicitly and handed to the coordinator.

use crate::controller::{KeyOutcome, SequenceController, MAX_NOTES, ORNAMENT_CHANCE};
use crate::error::Result;
use crate::host::{Disposables, Host};
use crate::indicator::{IndicatorView, ViewState};
use crate::sequencer::{bassline, AudioContext, Sequence, Voice, DEFAULT_TEMPO};
use crate::types::{Command, InputEvent, KeyEvent};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quarter notes per minute, shared by melody and bass
    pub tempo: u32,
    /// Primary notes per melody sequence before rollover
    pub max_notes: usize,
    /// Per-keystroke ornament probability
    pub ornament_chance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            max_notes: MAX_NOTES,
            ornament_chance: ORNAMENT_CHANCE,
        }
    }
}

impl Settings {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        load_json(path, "settings")
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_json(self, path, "Settings")
    }
}

/// State carried from one session to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub view: ViewState,
}

impl PersistedState {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        load_json(path, "state")
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_json(self, path, "State")
    }
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(v) => {
            info!("Loaded {} from {:?}", what, path);
            Some(v)
        }
        Err(e) => {
            warn!("Failed to parse {} file {:?}: {}", what, path, e);
            None
        }
    }
}

fn save_json<T: Serialize>(value: &T, path: &Path, what: &str) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)?;
    info!("{} saved to {:?}", what, path);
    Ok(())
}

/// One activation of the plugin.
///
/// Created idle: commands are registered but nothing plays. `toggle` starts
/// melody and bass together and listens to every editor, including ones
/// opened while active; `deactivate`
/// stops both and drops the listeners. All methods run on the coordinator
/// thread, so nothing here is shared.
pub struct Session<H: Host, C: AudioContext, R: Rng> {
    host: H,
    ctx: C,
    /// Where host listeners deliver events (the coordinator's input)
    tx: Sender<InputEvent>,
    view: IndicatorView,
    melody: SequenceController<C, R>,
    bass: C::Sequence,
    /// Command registrations, live for the whole session
    subscriptions: Disposables,
    /// Keyup listeners, live while active
    observers: Disposables,
    active: bool,
    torn_down: bool,
}

impl<H: Host, C: AudioContext, R: Rng> Session<H, C, R> {
    pub fn create(
        host: H,
        ctx: C,
        tx: Sender<InputEvent>,
        settings: &Settings,
        rng: R,
        state: PersistedState,
    ) -> Result<Self> {
        let view = IndicatorView::new(Some(state.view));
        let melody = SequenceController::new(ctx.clone(), settings.tempo, Voice::melody(), rng)?
            .with_limits(settings.max_notes, settings.ornament_chance);
        let bass = ctx.create_sequence(settings.tempo, &Voice::bass(), &bassline())?;

        let mut subscriptions = Disposables::new();
        subscriptions.add(host.add_commands(tx.clone()));

        info!(
            "Session created: tempo={} max_notes={} ornament_chance={:.2}",
            settings.tempo, settings.max_notes, settings.ornament_chance
        );

        Ok(Self {
            host,
            ctx,
            tx,
            view,
            melody,
            bass,
            subscriptions,
            observers: Disposables::new(),
            active: false,
            torn_down: false,
        })
    }

    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        debug!("command {}", command.name());
        match command {
            Command::Toggle => self.toggle(),
            Command::Deactivate => self.deactivate(),
        }
    }

    /// Start playing and listening, or stop if already active.
    pub fn toggle(&mut self) -> Result<()> {
        if self.active {
            return self.deactivate();
        }
        if self.torn_down {
            warn!("toggle after teardown ignored");
            return Ok(());
        }

        let when = self.ctx.current_time();
        self.melody.play(when)?;
        self.bass.play(when)?;

        self.observers
            .add(self.host.observe_text_editors(self.tx.clone()));
        self.view.show();
        self.active = true;
        info!(
            "Tonetype active at {:.3}s, listening to {} editor(s)",
            when,
            self.host.text_editors().len()
        );
        Ok(())
    }

    /// Stop melody and bass and stop listening. Buffered notes are lost.
    pub fn deactivate(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.observers.dispose();
        self.view.hide();
        self.active = false;

        let melody = self.melody.stop();
        let bass = self.bass.stop();
        info!("Tonetype deactivated");
        melody.and(bass)
    }

    /// Feed one keyup to the melody. Ignored while inactive.
    pub fn handle_key(&mut self, event: KeyEvent) -> Result<Option<KeyOutcome>> {
        if !self.active {
            debug!("key {:?} from {} while inactive", event.code, event.editor);
            return Ok(None);
        }
        self.melody.on_key_event(event.code)
    }

    pub fn serialize(&self) -> PersistedState {
        PersistedState {
            view: self.view.serialize(),
        }
    }

    /// Deactivate, unregister commands, destroy the view. Safe to call twice.
    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        let result = self.deactivate();
        self.subscriptions.dispose();
        self.view.destroy();
        self.torn_down = true;
        info!("Session torn down");
        result
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn view(&self) -> &IndicatorView {
        &self.view
    }

    pub fn melody(&self) -> &SequenceController<C, R> {
        &self.melody
    }
}
