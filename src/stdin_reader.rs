use crate::host::EditorHost;
use crate::keymap::key_code_for;
use crate::types::*;
use log::{error, info, warn};
use std::io::BufRead;

/// One parsed line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Command(Command),
    Quit,
    Text(String),
}

pub fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    match trimmed {
        ":toggle" => Line::Command(Command::Toggle),
        ":deactivate" => Line::Command(Command::Deactivate),
        ":quit" | ":q" => Line::Quit,
        _ => match trimmed.strip_prefix(':').and_then(Command::from_name) {
            Some(cmd) => Line::Command(cmd),
            None => Line::Text(line.trim_end_matches(['\r', '\n']).to_string()),
        },
    }
}

/// Turns lines of text into keyups for one editor. Each line ends with an
/// Enter keyup, like pressing return in the editor.
pub struct StdinReader {
    host: EditorHost,
    editor: EditorId,
}

impl StdinReader {
    pub fn new(host: EditorHost, editor: EditorId) -> Self {
        Self { host, editor }
    }

    /// Blocks until EOF or `:quit`.
    pub fn run(&self) {
        info!("Reading keystrokes from stdin (:toggle, :deactivate, :quit)");
        let stdin = std::io::stdin();
        self.run_with(stdin.lock());
    }

    pub fn run_with(&self, input: impl BufRead) {
        for line in input.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break;
                }
            };
            match parse_line(&line) {
                Line::Command(cmd) => {
                    if self.host.dispatch(cmd) == 0 {
                        warn!("{} has no listener", cmd.name());
                    }
                }
                Line::Quit => break,
                Line::Text(text) => {
                    for c in text.chars() {
                        self.host.keyup(self.editor, key_code_for(c));
                    }
                    self.host.keyup(self.editor, key_code_for('\n'));
                }
            }
        }
        info!("stdin closed");
    }
}
