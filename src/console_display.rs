use crate::indicator::ALIVE_MESSAGE;
use crate::types::*;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::io::{self, Write};

/// Notes kept in the scrolling history.
const HISTORY: usize = 12;

/// Renders a live ASCII panel of the melody as it is typed.
pub struct ConsoleDisplay {
    rx: Receiver<NoteFrame>,
    max_notes: usize,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<NoteFrame>, max_notes: usize) -> Self {
        Self { rx, max_notes }
    }

    pub fn run(&self) {
        let mut history: VecDeque<NoteFrame> = VecDeque::with_capacity(HISTORY);
        let mut rollovers: u64 = 0;
        let mut ornaments: u64 = 0;
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            if frame.rollover {
                rollovers += 1;
            }
            if frame.ornament.is_some() {
                ornaments += 1;
            }
            if history.len() == HISTORY {
                history.pop_front();
            }
            history.push_back(frame);

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            print!("{}", render(&history, self.max_notes, rollovers, ornaments));
            let _ = stdout.flush();
        }
    }
}

fn render(history: &VecDeque<NoteFrame>, max_notes: usize, rollovers: u64, ornaments: u64) -> String {
    let mut out = String::new();
    out.push_str("╔══════════════════════════════════════════════════════════╗\n");
    out.push_str(&format!("║  {:<56}║\n", ALIVE_MESSAGE));
    out.push_str("╠══════════════════════════════════════════════════════════╣\n");

    let count = history.back().map(|f| f.note_count).unwrap_or(0);
    let fill = if max_notes == 0 { 0.0 } else { count as f32 / max_notes as f32 };
    out.push_str(&format!(
        "║  Melody: {} {:>2}/{:<2}        ║\n",
        make_bar(fill, 30),
        count,
        max_notes
    ));
    out.push_str(&format!(
        "║  Rollovers: {:<6} Ornaments: {:<6}                    ║\n",
        rollovers, ornaments
    ));
    out.push_str("║                                                          ║\n");

    for f in history.iter().rev() {
        let orn = match &f.ornament {
            Some(o) => o.join(" "),
            None => String::new(),
        };
        let mark = if f.rollover { "↺" } else { " " };
        out.push_str(&format!(
            "║  {} key {:>3} → {:<5} {:<12}                          ║\n",
            mark, f.code, f.note, orn
        ));
    }

    out.push_str("╚══════════════════════════════════════════════════════════╝\n");
    out
}

fn make_bar(val: f32, width: usize) -> String {
    let filled = (val.clamp(0.0, 1.0) * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(code: i64, note: &str, count: usize, rollover: bool) -> NoteFrame {
        NoteFrame {
            timestamp_us: 0,
            editor: EditorId(0),
            code,
            note: note.into(),
            ornament: None,
            rollover,
            note_count: count,
        }
    }

    #[test]
    fn test_make_bar() {
        assert_eq!(make_bar(0.5, 4), "[██░░]");
        assert_eq!(make_bar(2.0, 2), "[██]");
    }

    #[test]
    fn test_render_lists_newest_first() {
        let mut h = VecDeque::new();
        h.push_back(frame(7, "G4 e", 1, false));
        h.push_back(frame(65, "B5 e", 2, false));
        let out = render(&h, 64, 0, 0);
        let g = out.find("G4 e").unwrap();
        let b = out.find("B5 e").unwrap();
        assert!(b < g);
        assert!(out.contains(" 2/64"));
    }
}
