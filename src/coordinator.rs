use crate::controller::KeyOutcome;
use crate::host::Host;
use crate::sequencer::AudioContext;
use crate::session::Session;
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, trace};
use rand::Rng;

/// The coordinator owns the session and is the only thread that touches it.
/// It drains InputEvents in arrival order (keyups from the host, plugin
/// commands, shutdown) and publishes a NoteFrame for every keystroke that
/// produced a note.
///
/// Sequencer failures are logged and the loop keeps going; one bad call to
/// the audio backend should not take the plugin down.
pub struct Coordinator<H: Host, C: AudioContext, R: Rng> {
    input_rx: Receiver<InputEvent>,
    frame_txs: Vec<Sender<NoteFrame>>,
    session: Session<H, C, R>,
    clock: SessionClock,
}

impl<H: Host, C: AudioContext, R: Rng> Coordinator<H, C, R> {
    pub fn new(
        input_rx: Receiver<InputEvent>,
        frame_txs: Vec<Sender<NoteFrame>>,
        session: Session<H, C, R>,
        clock: SessionClock,
    ) -> Self {
        Self {
            input_rx,
            frame_txs,
            session,
            clock,
        }
    }

    /// Blocks until a Shutdown event arrives or every sender is gone.
    /// Returns the session, torn down, so its state can be persisted.
    pub fn run(mut self) -> Session<H, C, R> {
        info!("Coordinator running");
        let mut key_count: u64 = 0;
        let mut note_count: u64 = 0;

        while let Ok(event) = self.input_rx.recv() {
            match event {
                InputEvent::Key(key) => {
                    key_count += 1;
                    match self.session.handle_key(key) {
                        Ok(Some(outcome)) => {
                            note_count += 1;
                            let frame = self.frame(&key, &outcome);
                            trace!("{}", frame);
                            for tx in &self.frame_txs {
                                let _ = tx.send(frame.clone());
                            }
                        }
                        Ok(None) => {}
                        Err(e) => error!("Key {:?} failed: {}", key.code, e),
                    }
                    if key_count % 100 == 0 {
                        debug!("Coordinator: {} keys, {} notes", key_count, note_count);
                    }
                }

                InputEvent::Command(cmd) => {
                    if let Err(e) = self.session.handle_command(cmd) {
                        error!("{} failed: {}", cmd.name(), e);
                    }
                }

                InputEvent::Shutdown => break,
            }
        }

        if let Err(e) = self.session.teardown() {
            error!("Teardown failed: {}", e);
        }
        info!(
            "Coordinator shutting down after {} keys ({} notes)",
            key_count, note_count
        );
        self.session
    }

    fn frame(&self, key: &KeyEvent, outcome: &KeyOutcome) -> NoteFrame {
        NoteFrame {
            timestamp_us: self.clock.now_us(),
            editor: key.editor,
            code: key.code.unwrap_or_default(),
            note: outcome.note.to_string(),
            ornament: outcome
                .ornament
                .map(|o| o.iter().map(|t| t.to_string()).collect()),
            rollover: outcome.rollover,
            note_count: outcome.note_count,
        }
    }
}
