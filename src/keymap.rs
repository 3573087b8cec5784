//! Key code → note mapping.
//!
//! Key codes are arbitrary hardware-dependent integers; the mapping only has
//! to be deterministic and land every key on some playable note.

use crate::types::{NoteValue, Pitch, Token};

/// Pitch table, indexed by `(code mod 7) - 1`.
pub const PITCHES: [Pitch; 7] = [
    Pitch::A,
    Pitch::B,
    Pitch::C,
    Pitch::D,
    Pitch::E,
    Pitch::F,
    Pitch::G,
];

pub const MIN_RANGE: u8 = 4;
pub const MAX_RANGE: u8 = 5;

/// Octave for a key code: `floor(code / 7)` clamped into [4, 5].
pub fn range_for(code: i64) -> u8 {
    code.div_euclid(7).clamp(MIN_RANGE as i64, MAX_RANGE as i64) as u8
}

/// Pitch for a key code. `code mod 7 == 0` gives index -1, which wraps to
/// the last entry (G).
pub fn pitch_for(code: i64) -> Pitch {
    let idx = code.rem_euclid(7) - 1;
    if idx < 0 {
        PITCHES[PITCHES.len() - 1]
    } else {
        PITCHES[idx as usize]
    }
}

/// The pitch one step above in the table, G wrapping to A.
pub fn next_pitch(pitch: Pitch) -> Pitch {
    let idx = PITCHES.iter().position(|&p| p == pitch).unwrap_or(0);
    PITCHES[(idx + 1) % PITCHES.len()]
}

pub fn note_for(code: i64, value: NoteValue) -> Token {
    Token::note(pitch_for(code), range_for(code), value)
}

/// Browser-style keyup code for a typed character.
pub fn key_code_for(c: char) -> Option<i64> {
    let code = match c {
        'a'..='z' => c.to_ascii_uppercase() as i64,
        'A'..='Z' | '0'..='9' => c as i64,
        ' ' => 32,
        '\n' | '\r' => 13,
        '\t' => 9,
        '\u{8}' => 8,
        ';' | ':' => 186,
        '=' | '+' => 187,
        ',' | '<' => 188,
        '-' | '_' => 189,
        '.' | '>' => 190,
        '/' | '?' => 191,
        '`' | '~' => 192,
        '[' | '{' => 219,
        '\\' | '|' => 220,
        ']' | '}' => 221,
        '\'' | '"' => 222,
        // Shifted digits share the digit key
        '!' => 49,
        '@' => 50,
        '#' => 51,
        '$' => 52,
        '%' => 53,
        '^' => 54,
        '&' => 55,
        '*' => 56,
        '(' => 57,
        ')' => 48,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_clamped() {
        assert_eq!(range_for(0), 4);
        assert_eq!(range_for(28), 4);
        assert_eq!(range_for(34), 4);
        assert_eq!(range_for(35), 5);
        assert_eq!(range_for(1000), 5);
        for c in -50..500 {
            let r = range_for(c);
            assert!(r == 4 || r == 5, "range_for({}) = {}", c, r);
        }
    }

    #[test]
    fn test_range_monotonic() {
        let mut prev = range_for(0);
        for c in 1..300 {
            let r = range_for(c);
            assert!(r >= prev);
            prev = r;
        }
    }

    #[test]
    fn test_pitch_wraps_to_last() {
        assert_eq!(pitch_for(7), Pitch::G);
        assert_eq!(pitch_for(0), Pitch::G);
        assert_eq!(pitch_for(14), Pitch::G);
    }

    #[test]
    fn test_pitch_cycle() {
        assert_eq!(pitch_for(1), Pitch::A);
        assert_eq!(pitch_for(8), Pitch::A);
        assert_eq!(pitch_for(6), Pitch::F);
        for c in 0..200 {
            assert_eq!(pitch_for(c), pitch_for(c + 7));
        }
    }

    #[test]
    fn test_next_pitch_matches_next_code() {
        assert_eq!(next_pitch(Pitch::G), Pitch::A);
        for c in -20..200 {
            assert_eq!(next_pitch(pitch_for(c)), pitch_for(c + 1));
        }
    }

    #[test]
    fn test_extreme_codes() {
        assert_eq!(range_for(i64::MAX), 5);
        assert_eq!(range_for(i64::MIN), 4);
        // i64::MAX is a multiple of 7
        assert_eq!(pitch_for(i64::MAX), Pitch::G);
        let _ = pitch_for(i64::MIN);
    }

    #[test]
    fn test_negative_codes_are_total() {
        // -1 mod 7 = 6 → F; floor(-1/7) = -1 → clamped to 4
        assert_eq!(pitch_for(-1), Pitch::F);
        assert_eq!(range_for(-1), 4);
    }

    #[test]
    fn test_note_for_letter_keys() {
        // 'A' = 65: 65 mod 7 = 2 → B, floor(65/7) = 9 → 5
        assert_eq!(note_for(65, NoteValue::Eighth).to_string(), "B5 e");
        // space = 32: 32 mod 7 = 4 → D, floor(32/7) = 4
        assert_eq!(note_for(32, NoteValue::Eighth).to_string(), "D4 e");
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(key_code_for('a'), Some(65));
        assert_eq!(key_code_for('A'), Some(65));
        assert_eq!(key_code_for('7'), Some(55));
        assert_eq!(key_code_for(' '), Some(32));
        assert_eq!(key_code_for('\n'), Some(13));
        assert_eq!(key_code_for(';'), Some(186));
        assert_eq!(key_code_for('é'), None);
    }
}
