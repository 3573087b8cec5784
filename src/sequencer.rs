//! The audio sequencer seam: what the melody and bass need from whatever
//! actually schedules notes.

use crate::error::Result;
use crate::types::Token;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPO: u32 = 120;

/// A looping note sequence owned by some audio backend.
pub trait Sequence {
    /// Append tokens to the end of the loop.
    fn push(&mut self, tokens: &[Token]) -> Result<()>;
    /// Start looping at `when` (seconds, on the context's clock).
    fn play(&mut self, when: f64) -> Result<()>;
    /// Stop all scheduled playback.
    fn stop(&mut self) -> Result<()>;
}

/// Shared playback context: the time reference plus a sequence factory.
/// Handles are cheap to clone and all refer to the same context.
pub trait AudioContext: Clone {
    type Sequence: Sequence;

    /// Current playback time in seconds.
    fn current_time(&self) -> f64;

    fn create_sequence(&self, tempo: u32, voice: &Voice, tokens: &[Token])
        -> Result<Self::Sequence>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Square,
    Sine,
    Triangle,
    Sawtooth,
    /// One cycle of a custom periodic wave, values in -1.0..=1.0
    Custom(Vec<f32>),
}

/// One band of the voice's three-band EQ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    pub frequency: f32,
    /// dB
    pub gain: f32,
}

/// Timbre settings a backend applies when it creates a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub waveform: Waveform,
    /// Fraction of each note's length cut off at the end
    pub staccato: f32,
    /// Portamento between consecutive notes, 0.0 = none
    pub smoothing: f32,
    /// Output gain, linear
    pub gain: f32,
    pub bass: EqBand,
    pub mid: EqBand,
    pub treble: EqBand,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            name: "default".into(),
            waveform: Waveform::Square,
            staccato: 0.0,
            smoothing: 0.0,
            gain: 1.0,
            bass: EqBand { frequency: 100.0, gain: 0.0 },
            mid: EqBand { frequency: 1000.0, gain: 0.0 },
            treble: EqBand { frequency: 2500.0, gain: 0.0 },
        }
    }
}

impl Voice {
    /// Plucky lead used for the typed melody.
    pub fn melody() -> Self {
        Self {
            name: "melody".into(),
            waveform: Waveform::Custom(vec![-0.6, 0.25, 0.9, 0.1, -1.0, -1.0, 0.0]),
            staccato: 0.25,
            gain: 0.5,
            mid: EqBand { frequency: 800.0, gain: 3.0 },
            ..Self::default()
        }
    }

    /// Round, legato-ish bass for the backing loop.
    pub fn bass() -> Self {
        Self {
            name: "bass".into(),
            staccato: 0.05,
            smoothing: 0.4,
            gain: 0.3,
            bass: EqBand { frequency: 80.0, gain: 6.0 },
            treble: EqBand { frequency: 2500.0, gain: -2.0 },
            ..Self::default()
        }
    }
}

const BASSLINE: [&str; 11] = [
    "D3  q", "-   h", "D3  q",
    "A2  q", "-   h", "A2  q",
    "Bb2 q", "-   h", "Bb2 q",
    "F2  h", "A2  h",
];

/// The fixed backing loop: four bars in 4/4 at any tempo.
pub fn bassline() -> Vec<Token> {
    BASSLINE
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Total loop length in beats.
pub fn loop_beats(tokens: &[Token]) -> f64 {
    tokens.iter().map(|t| t.value().beats()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bassline_parses_fully() {
        let bass = bassline();
        assert_eq!(bass.len(), BASSLINE.len());
        let rendered: Vec<String> = bass.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "D3 q", "- h", "D3 q", "A2 q", "- h", "A2 q", "Bb2 q", "- h", "Bb2 q", "F2 h",
                "A2 h"
            ]
        );
    }

    #[test]
    fn test_bassline_is_four_bars() {
        assert!((loop_beats(&bassline()) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_voice_presets() {
        let m = Voice::melody();
        assert_eq!(m.staccato, 0.25);
        assert_eq!(m.mid.frequency, 800.0);
        assert!(matches!(m.waveform, Waveform::Custom(ref w) if w.len() == 7));

        let b = Voice::bass();
        assert_eq!(b.bass.gain, 6.0);
        assert_eq!(b.treble.gain, -2.0);
        assert_eq!(b.smoothing, 0.4);
    }

    #[test]
    fn test_voice_json() {
        let json = serde_json::to_string(&Voice::melody()).unwrap();
        assert!(json.contains("\"custom\""));
        let back: Voice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Voice::melody());
    }
}
