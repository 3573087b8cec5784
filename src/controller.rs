use crate::error::Result;
use crate::keymap::{next_pitch, pitch_for, range_for};
use crate::sequencer::{AudioContext, Sequence, Voice};
use crate::types::{NoteValue, Token};
use log::{debug, info};
use rand::Rng;

/// Primary notes a melody sequence holds before it is rolled over.
pub const MAX_NOTES: usize = 64;

/// Chance that a keystroke also gets a two-note flourish.
pub const ORNAMENT_CHANCE: f64 = 0.2;

/// What one keystroke did to the melody.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyOutcome {
    pub note: Token,
    /// Upper neighbour then the note itself, both sixteenths
    pub ornament: Option<[Token; 2]>,
    /// The note started a fresh sequence
    pub rollover: bool,
    pub note_count: usize,
}

/// Owns the typed melody: maps key codes to notes, pushes them into the
/// current sequence, and swaps in a fresh sequence once `max_notes` primary
/// notes have been pushed.
///
/// Ornament notes land in the same sequence but never count toward the
/// limit, so a sequence can hold more than `max_notes` tokens in total.
pub struct SequenceController<C: AudioContext, R: Rng> {
    ctx: C,
    sequence: C::Sequence,
    /// Every token pushed into `sequence`, ornaments included
    buffer: Vec<Token>,
    note_count: usize,
    tempo: u32,
    voice: Voice,
    max_notes: usize,
    ornament_chance: f64,
    rng: R,
}

impl<C: AudioContext, R: Rng> SequenceController<C, R> {
    pub fn new(ctx: C, tempo: u32, voice: Voice, rng: R) -> Result<Self> {
        let sequence = ctx.create_sequence(tempo, &voice, &[])?;
        Ok(Self {
            ctx,
            sequence,
            buffer: Vec::new(),
            note_count: 0,
            tempo,
            voice,
            max_notes: MAX_NOTES,
            ornament_chance: ORNAMENT_CHANCE,
            rng,
        })
    }

    pub fn with_limits(mut self, max_notes: usize, ornament_chance: f64) -> Self {
        self.max_notes = max_notes.max(1);
        self.ornament_chance = ornament_chance.clamp(0.0, 1.0);
        self
    }

    /// Handle one keyup. A missing or zero code does nothing.
    pub fn on_key_event(&mut self, code: Option<i64>) -> Result<Option<KeyOutcome>> {
        let code = match code {
            Some(c) if c != 0 => c,
            _ => return Ok(None),
        };

        let range = range_for(code);
        let pitch = pitch_for(code);
        let note = Token::note(pitch, range, NoteValue::Eighth);

        let rollover = self.note_count >= self.max_notes;
        if rollover {
            self.sequence.stop()?;
            self.sequence = self.ctx.create_sequence(self.tempo, &self.voice, &[])?;
            self.buffer.clear();
            self.note_count = 0;
            self.push(&[note])?;
            self.note_count = 1;
            let when = self.ctx.current_time();
            self.sequence.play(when)?;
            info!("Melody rolled over at {:.3}s", when);
        } else {
            self.push(&[note])?;
            self.note_count += 1;
        }

        // Drawn after the rollover decision; never counted
        let ornament = if self.rng.gen::<f64>() < self.ornament_chance {
            let orn = [
                Token::note(next_pitch(pitch), range, NoteValue::Sixteenth),
                Token::note(pitch, range, NoteValue::Sixteenth),
            ];
            self.push(&orn)?;
            Some(orn)
        } else {
            None
        };

        debug!(
            "key {} → {}{} ({} notes)",
            code,
            note,
            if ornament.is_some() { " +orn" } else { "" },
            self.note_count
        );

        Ok(Some(KeyOutcome {
            note,
            ornament,
            rollover,
            note_count: self.note_count,
        }))
    }

    pub fn play(&mut self, when: f64) -> Result<()> {
        self.sequence.play(when)
    }

    /// Stop playback and drop everything pushed so far. The next `play`
    /// starts an empty melody.
    pub fn stop(&mut self) -> Result<()> {
        self.sequence.stop()?;
        self.sequence = self.ctx.create_sequence(self.tempo, &self.voice, &[])?;
        self.buffer.clear();
        self.note_count = 0;
        Ok(())
    }

    pub fn note_count(&self) -> usize {
        self.note_count
    }

    pub fn buffer(&self) -> &[Token] {
        &self.buffer
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    fn push(&mut self, tokens: &[Token]) -> Result<()> {
        self.sequence.push(tokens)?;
        self.buffer.extend_from_slice(tokens);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Call, RecorderContext};
    use rand::rngs::mock::StepRng;

    fn never() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn always() -> StepRng {
        StepRng::new(0, 0)
    }

    fn controller(rng: StepRng) -> (RecorderContext, SequenceController<RecorderContext, StepRng>) {
        let ctx = RecorderContext::manual();
        let c = SequenceController::new(ctx.clone(), 120, Voice::melody(), rng).unwrap();
        (ctx, c)
    }

    fn rendered(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_three_g_notes() {
        let (_, mut c) = controller(never());
        for code in [7, 14, 21] {
            c.on_key_event(Some(code)).unwrap();
        }
        assert_eq!(rendered(c.buffer()), vec!["G4 e", "G4 e", "G4 e"]);
        assert_eq!(c.note_count(), 3);
    }

    #[test]
    fn test_zero_and_missing_codes_are_ignored() {
        let (ctx, mut c) = controller(always());
        ctx.clear();
        assert_eq!(c.on_key_event(Some(0)).unwrap(), None);
        assert_eq!(c.on_key_event(None).unwrap(), None);
        assert_eq!(c.note_count(), 0);
        assert!(c.buffer().is_empty());
        assert!(ctx.calls().is_empty(), "no sequencer calls expected");
    }

    #[test]
    fn test_64_notes_keep_one_sequence() {
        let (ctx, mut c) = controller(never());
        for _ in 0..64 {
            let out = c.on_key_event(Some(65)).unwrap().unwrap();
            assert!(!out.rollover);
        }
        assert_eq!(c.note_count(), 64);
        assert_eq!(ctx.sequences_for("melody").len(), 1);
        assert_eq!(ctx.count_where(|call| matches!(call, Call::Stop { .. })), 0);
    }

    #[test]
    fn test_65th_note_rolls_over_once() {
        let (ctx, mut c) = controller(never());
        for _ in 0..64 {
            c.on_key_event(Some(65)).unwrap();
        }
        ctx.set_time(12.0);
        let out = c.on_key_event(Some(66)).unwrap().unwrap();
        assert!(out.rollover);
        assert_eq!(out.note_count, 1);
        assert_eq!(c.note_count(), 1);
        assert_eq!(rendered(c.buffer()), vec!["C5 e"]);

        let seqs = ctx.sequences_for("melody");
        assert_eq!(seqs.len(), 2);
        assert_eq!(ctx.count_where(|call| *call == Call::Stop { seq: seqs[0] }), 1);
        assert_eq!(ctx.count_where(|call| matches!(call, Call::Stop { .. })), 1);
        assert_eq!(
            ctx.calls().last(),
            Some(&Call::Play { seq: seqs[1], when: 12.0 })
        );
        assert_eq!(rendered(&ctx.tokens_of(seqs[1])), vec!["C5 e"]);
    }

    #[test]
    fn test_rollover_period_is_64() {
        let (ctx, mut c) = controller(never());
        let rollovers = (0..64 * 3 + 1)
            .filter(|_| c.on_key_event(Some(40)).unwrap().unwrap().rollover)
            .count();
        assert_eq!(rollovers, 3);
        assert_eq!(ctx.sequences_for("melody").len(), 4);
    }

    #[test]
    fn test_ornament_tokens() {
        let (_, mut c) = controller(always());
        // 6 mod 7 = 6 → F; neighbour is code 7 → G
        let out = c.on_key_event(Some(6)).unwrap().unwrap();
        assert_eq!(rendered(&out.ornament.unwrap()), vec!["G4 s", "F4 s"]);
        // G wraps up to A
        let out = c.on_key_event(Some(42)).unwrap().unwrap();
        assert_eq!(out.note.to_string(), "G5 e");
        assert_eq!(rendered(&out.ornament.unwrap()), vec!["A5 s", "G5 s"]);
        assert_eq!(
            rendered(c.buffer()),
            vec!["F4 e", "G4 s", "F4 s", "G5 e", "A5 s", "G5 s"]
        );
        assert_eq!(c.note_count(), 2);
    }

    #[test]
    fn test_ornament_on_largest_code() {
        let (_, mut c) = controller(always());
        let out = c.on_key_event(Some(i64::MAX)).unwrap().unwrap();
        assert_eq!(out.note.to_string(), "G5 e");
        assert_eq!(rendered(&out.ornament.unwrap()), vec!["A5 s", "G5 s"]);

        let out = c.on_key_event(Some(i64::MIN)).unwrap().unwrap();
        assert_eq!(out.note_count, 2);
        assert!(out.ornament.is_some());
    }

    #[test]
    fn test_ornaments_do_not_trigger_rollover() {
        let (ctx, mut c) = controller(always());
        for _ in 0..64 {
            let out = c.on_key_event(Some(50)).unwrap().unwrap();
            assert!(!out.rollover);
        }
        assert_eq!(c.buffer().len(), 64 * 3);
        assert_eq!(ctx.sequences_for("melody").len(), 1);

        // The ornament lands in the fresh sequence after the primary note
        let out = c.on_key_event(Some(50)).unwrap().unwrap();
        assert!(out.rollover);
        assert_eq!(c.buffer().len(), 3);
        assert_eq!(c.note_count(), 1);
    }

    #[test]
    fn test_stop_discards_buffer() {
        let (ctx, mut c) = controller(never());
        c.play(0.0).unwrap();
        for code in 60..70 {
            c.on_key_event(Some(code)).unwrap();
        }
        c.stop().unwrap();
        assert_eq!(c.note_count(), 0);
        assert!(c.buffer().is_empty());
        let seqs = ctx.sequences_for("melody");
        assert_eq!(seqs.len(), 2);
        assert!(ctx.tokens_of(seqs[1]).is_empty());
    }

    #[test]
    fn test_custom_limit() {
        let (_, c) = controller(never());
        let mut c = c.with_limits(2, 0.0);
        c.on_key_event(Some(1)).unwrap();
        c.on_key_event(Some(2)).unwrap();
        let out = c.on_key_event(Some(3)).unwrap().unwrap();
        assert!(out.rollover);
    }
}
