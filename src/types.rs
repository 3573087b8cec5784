use crate::error::ParseTokenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

// ─── Pitches ────────────────────────────────────────────────────────────────

/// Note letter, ordered the way the key mapper indexes them (A first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pitch {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Pitch {
    pub fn letter(self) -> char {
        match self {
            Pitch::A => 'A',
            Pitch::B => 'B',
            Pitch::C => 'C',
            Pitch::D => 'D',
            Pitch::E => 'E',
            Pitch::F => 'F',
            Pitch::G => 'G',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'A' => Some(Pitch::A),
            'B' => Some(Pitch::B),
            'C' => Some(Pitch::C),
            'D' => Some(Pitch::D),
            'E' => Some(Pitch::E),
            'F' => Some(Pitch::F),
            'G' => Some(Pitch::G),
            _ => None,
        }
    }

    /// Semitones above C in the same octave.
    pub fn semitone(self) -> i32 {
        match self {
            Pitch::C => 0,
            Pitch::D => 2,
            Pitch::E => 4,
            Pitch::F => 5,
            Pitch::G => 7,
            Pitch::A => 9,
            Pitch::B => 11,
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    Natural,
    Flat,
    Sharp,
}

impl Accidental {
    fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Flat => -1,
            Accidental::Sharp => 1,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Flat => "b",
            Accidental::Sharp => "#",
        }
    }
}

// ─── Durations ──────────────────────────────────────────────────────────────

/// Length of a token, written as a one-letter code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    pub fn code(self) -> char {
        match self {
            NoteValue::Whole => 'w',
            NoteValue::Half => 'h',
            NoteValue::Quarter => 'q',
            NoteValue::Eighth => 'e',
            NoteValue::Sixteenth => 's',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "w" => Some(NoteValue::Whole),
            "h" => Some(NoteValue::Half),
            "q" => Some(NoteValue::Quarter),
            "e" => Some(NoteValue::Eighth),
            "s" => Some(NoteValue::Sixteenth),
            _ => None,
        }
    }

    /// Length in quarter-note beats.
    pub fn beats(self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
        }
    }
}

// ─── Note tokens ────────────────────────────────────────────────────────────

/// One entry of a sequence: a pitched note or a rest.
/// Renders as `"G4 e"`, `"Bb2 q"` or `"- h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Note {
        pitch: Pitch,
        accidental: Accidental,
        octave: u8,
        value: NoteValue,
    },
    Rest {
        value: NoteValue,
    },
}

impl Token {
    pub fn note(pitch: Pitch, octave: u8, value: NoteValue) -> Self {
        Token::Note {
            pitch,
            accidental: Accidental::Natural,
            octave,
            value,
        }
    }

    pub fn rest(value: NoteValue) -> Self {
        Token::Rest { value }
    }

    pub fn value(&self) -> NoteValue {
        match *self {
            Token::Note { value, .. } | Token::Rest { value } => value,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Token::Rest { .. })
    }

    /// Length in seconds at the given tempo (quarter notes per minute).
    pub fn seconds(&self, tempo: u32) -> f64 {
        self.value().beats() * 60.0 / tempo.max(1) as f64
    }

    /// MIDI note number (C4 = 60). None for rests.
    pub fn midi(&self) -> Option<i32> {
        match *self {
            Token::Note {
                pitch,
                accidental,
                octave,
                ..
            } => Some(12 * (octave as i32 + 1) + pitch.semitone() + accidental.offset()),
            Token::Rest { .. } => None,
        }
    }

    pub fn frequency_hz(&self) -> Option<f64> {
        self.midi().map(|m| midi_to_hz(m as f64))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Note {
                pitch,
                accidental,
                octave,
                value,
            } => write!(f, "{}{}{} {}", pitch, accidental.suffix(), octave, value.code()),
            Token::Rest { value } => write!(f, "- {}", value.code()),
        }
    }
}

impl FromStr for Token {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let head = fields.next().ok_or(ParseTokenError::Empty)?;
        let code = fields
            .next()
            .ok_or_else(|| ParseTokenError::MissingDuration(s.to_string()))?;
        if fields.next().is_some() {
            return Err(ParseTokenError::Trailing(s.to_string()));
        }
        let value =
            NoteValue::from_code(code).ok_or_else(|| ParseTokenError::Duration(code.to_string()))?;

        if head == "-" {
            return Ok(Token::Rest { value });
        }

        let bad_pitch = || ParseTokenError::Pitch(head.to_string());
        let mut chars = head.chars();
        let pitch = chars.next().and_then(Pitch::from_letter).ok_or_else(bad_pitch)?;
        let rest = chars.as_str();
        let (accidental, digits) = if let Some(d) = rest.strip_prefix('b') {
            (Accidental::Flat, d)
        } else if let Some(d) = rest.strip_prefix('#') {
            (Accidental::Sharp, d)
        } else {
            (Accidental::Natural, rest)
        };
        let octave: u8 = digits.parse().map_err(|_| bad_pitch())?;

        Ok(Token::Note {
            pitch,
            accidental,
            octave,
            value,
        })
    }
}

/// Equal-tempered frequency, A4 (MIDI 69) = 440 Hz.
pub fn midi_to_hz(midi: f64) -> f64 {
    440.0 * 2.0f64.powf((midi - 69.0) / 12.0)
}

// ─── Host events ────────────────────────────────────────────────────────────

/// Identifies one open text editor in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditorId(pub u32);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

/// A keyup in some editor. `code` is None when the event carried no key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub editor: EditorId,
    pub code: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Toggle,
    Deactivate,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Toggle, Command::Deactivate];

    pub fn name(self) -> &'static str {
        match self {
            Command::Toggle => "tonetype:toggle",
            Command::Deactivate => "tonetype:deactivate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Command::ALL.into_iter().find(|c| c.name() == name)
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(KeyEvent),
    Command(Command),
    Shutdown,
}

/// What one keystroke did to the melody. Produced by the coordinator,
/// consumed by the console display and the session logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteFrame {
    /// Microseconds since session start
    pub timestamp_us: u64,
    pub editor: EditorId,
    pub code: i64,
    /// Primary token, e.g. "G4 e"
    pub note: String,
    /// Ornament tokens when the draw hit, e.g. ["A4 s", "G4 s"]
    pub ornament: Option<Vec<String>>,
    /// True when this note started a fresh melody sequence
    pub rollover: bool,
    /// Primary notes in the melody after this event
    pub note_count: usize,
}

impl fmt::Display for NoteFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>10}µs  {}  code={:<4} note={:<5} count={:<2}",
            self.timestamp_us, self.editor, self.code, self.note, self.note_count,
        )?;
        if let Some(orn) = &self.ornament {
            write!(f, "  orn=[{}]", orn.join(", "))?;
        }
        if self.rollover {
            write!(f, "  ROLLOVER")?;
        }
        Ok(())
    }
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the session; doubles as the playback-time reference.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        assert_eq!(Token::note(Pitch::G, 4, NoteValue::Eighth).to_string(), "G4 e");
        assert_eq!(Token::rest(NoteValue::Half).to_string(), "- h");
    }

    #[test]
    fn test_parse_flat_with_padding() {
        let t: Token = "Bb2 q".parse().unwrap();
        assert_eq!(
            t,
            Token::Note {
                pitch: Pitch::B,
                accidental: Accidental::Flat,
                octave: 2,
                value: NoteValue::Quarter,
            }
        );
        let d: Token = "D3  q".parse().unwrap();
        assert_eq!(d.to_string(), "D3 q");
        let r: Token = "-   h".parse().unwrap();
        assert!(r.is_rest());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Token>(), Err(ParseTokenError::Empty));
        assert!(matches!("G4".parse::<Token>(), Err(ParseTokenError::MissingDuration(_))));
        assert!(matches!("H4 q".parse::<Token>(), Err(ParseTokenError::Pitch(_))));
        assert!(matches!("G q".parse::<Token>(), Err(ParseTokenError::Pitch(_))));
        assert!(matches!("G4 x".parse::<Token>(), Err(ParseTokenError::Duration(_))));
        assert!(matches!("G4 q q".parse::<Token>(), Err(ParseTokenError::Trailing(_))));
    }

    #[test]
    fn test_frequency() {
        let a4 = Token::note(Pitch::A, 4, NoteValue::Quarter);
        assert_eq!(a4.midi(), Some(69));
        assert!((a4.frequency_hz().unwrap() - 440.0).abs() < 1e-9);

        // Bb2 = MIDI 46 ≈ 116.54 Hz
        let bb2: Token = "Bb2 q".parse().unwrap();
        assert_eq!(bb2.midi(), Some(46));
        assert!((bb2.frequency_hz().unwrap() - 116.54).abs() < 0.01);

        assert_eq!(Token::rest(NoteValue::Quarter).frequency_hz(), None);
    }

    #[test]
    fn test_seconds_at_tempo() {
        let e = Token::note(Pitch::C, 4, NoteValue::Eighth);
        assert!((e.seconds(120) - 0.25).abs() < 1e-9);
        let h = Token::rest(NoteValue::Half);
        assert!((h.seconds(120) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::from_name("tonetype:toggle"), Some(Command::Toggle));
        assert_eq!(Command::from_name("tonetype:deactivate"), Some(Command::Deactivate));
        assert_eq!(Command::from_name("tonetype:nope"), None);
    }
}
