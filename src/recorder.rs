use crate::error::Result;
use crate::sequencer::{AudioContext, Sequence, Voice};
use crate::types::{SessionClock, Token};
use log::{debug, info};
use std::sync::{Arc, Mutex};

/// One call made against the recorder backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        seq: u32,
        tempo: u32,
        voice: String,
        tokens: Vec<Token>,
    },
    Push { seq: u32, tokens: Vec<Token> },
    Play { seq: u32, when: f64 },
    Stop { seq: u32 },
}

#[derive(Clone)]
enum TimeSource {
    Clock(SessionClock),
    Manual(Arc<Mutex<f64>>),
}

/// Backend that produces no sound: every sequencer call is logged and
/// appended to a shared journal. Clones share the journal and time source.
#[derive(Clone)]
pub struct RecorderContext {
    journal: Arc<Mutex<Vec<Call>>>,
    next_seq: Arc<Mutex<u32>>,
    time: TimeSource,
}

impl RecorderContext {
    /// Playback time follows the session clock.
    pub fn new(clock: SessionClock) -> Self {
        Self::with_time(TimeSource::Clock(clock))
    }

    /// Playback time only moves through `set_time`. Starts at 0.0.
    pub fn manual() -> Self {
        Self::with_time(TimeSource::Manual(Arc::new(Mutex::new(0.0))))
    }

    fn with_time(time: TimeSource) -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            next_seq: Arc::new(Mutex::new(0)),
            time,
        }
    }

    /// No effect on a clock-driven recorder.
    pub fn set_time(&self, secs: f64) {
        if let TimeSource::Manual(t) = &self.time {
            *t.lock().unwrap() = secs;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Ids of sequences created with the given voice name, in creation order.
    pub fn sequences_for(&self, voice_name: &str) -> Vec<u32> {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Create { seq, voice, .. } if voice == voice_name => Some(*seq),
                _ => None,
            })
            .collect()
    }

    /// Everything pushed into one sequence, creation tokens included.
    pub fn tokens_of(&self, seq_id: u32) -> Vec<Token> {
        let journal = self.journal.lock().unwrap();
        let mut out = Vec::new();
        for call in journal.iter() {
            match call {
                Call::Create { seq, tokens, .. } | Call::Push { seq, tokens } if *seq == seq_id => {
                    out.extend_from_slice(tokens)
                }
                _ => {}
            }
        }
        out
    }

    pub fn count_where(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.journal.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.journal.lock().unwrap().push(call);
    }
}

impl AudioContext for RecorderContext {
    type Sequence = RecordedSequence;

    fn current_time(&self) -> f64 {
        match &self.time {
            TimeSource::Clock(clock) => clock.now_secs(),
            TimeSource::Manual(t) => *t.lock().unwrap(),
        }
    }

    fn create_sequence(&self, tempo: u32, voice: &Voice, tokens: &[Token]) -> Result<RecordedSequence> {
        let id = {
            let mut next = self.next_seq.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        };
        info!("seq {} created: voice={} tempo={} ({} tokens)", id, voice.name, tempo, tokens.len());
        self.record(Call::Create {
            seq: id,
            tempo,
            voice: voice.name.clone(),
            tokens: tokens.to_vec(),
        });
        Ok(RecordedSequence {
            id,
            ctx: self.clone(),
        })
    }
}

pub struct RecordedSequence {
    id: u32,
    ctx: RecorderContext,
}

impl RecordedSequence {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Sequence for RecordedSequence {
    fn push(&mut self, tokens: &[Token]) -> Result<()> {
        let names: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        debug!("seq {} push [{}]", self.id, names.join(", "));
        self.ctx.record(Call::Push {
            seq: self.id,
            tokens: tokens.to_vec(),
        });
        Ok(())
    }

    fn play(&mut self, when: f64) -> Result<()> {
        info!("seq {} play at {:.3}s", self.id, when);
        self.ctx.record(Call::Play { seq: self.id, when });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        info!("seq {} stop", self.id);
        self.ctx.record(Call::Stop { seq: self.id });
        Ok(())
    }
}
