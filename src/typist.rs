use crate::host::EditorHost;
use crate::keymap::key_code_for;
use crate::types::*;
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for the session to start listening after toggle.
const LISTEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Types text into an editor of the in-process host at a human pace,
/// exercising the full keyup → note path without a real editor.
pub struct Typist {
    host: EditorHost,
    editor: EditorId,
    wpm: u32,
}

impl Typist {
    pub fn new(host: EditorHost, editor: EditorId, wpm: u32) -> Self {
        Self { host, editor, wpm }
    }

    /// Dispatch toggle, type the named demo, then deactivate.
    /// Blocks the calling thread.
    pub fn run(&self, demo: &str) {
        let text = match demo_text(demo) {
            Some(t) => t,
            None => {
                warn!("Unknown demo {:?}, typing \"lorem\"", demo);
                LOREM
            }
        };
        info!("Typist starting demo {:?} at {} wpm", demo, self.wpm);
        self.host.dispatch(Command::Toggle);
        if !self.wait_for_listener(LISTEN_TIMEOUT) {
            warn!("No keyup listener after {:?}; typing anyway", LISTEN_TIMEOUT);
        }
        self.type_text(text);
        self.host.dispatch(Command::Deactivate);
        info!("Typist finished.");
    }

    /// Toggle is applied on the coordinator thread, so keys typed right
    /// after dispatch can arrive before anyone listens.
    fn wait_for_listener(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.host.keyup_listener_count() == 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// One keyup per character. Characters without a key code still fire a
    /// keyup, with no code.
    pub fn type_text(&self, text: &str) {
        let delay = key_interval(self.wpm);
        for c in text.chars() {
            self.host.keyup(self.editor, key_code_for(c));
            thread::sleep(delay);
        }
    }
}

/// Time between keystrokes: a "word" is five characters.
pub fn key_interval(wpm: u32) -> Duration {
    let chars_per_min = wpm.max(1) as u64 * 5;
    Duration::from_micros(60_000_000 / chars_per_min)
}

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\n\
Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris \
nisi ut aliquip ex ea commodo consequat.\n";

const CODE: &str = "fn main() {\n    let notes = vec![7, 14, 21];\n    \
for n in notes {\n        println!(\"{}\", n);\n    }\n}\n";

/// Letter keys G..F land on A5..G5 in order: up the scale and back down.
const SCALE: &str = "GABCDEFG GFEDCBAG ";

pub fn demo_text(name: &str) -> Option<&'static str> {
    match name {
        "lorem" => Some(LOREM),
        "code" => Some(CODE),
        "scale" => Some(SCALE),
        _ => None,
    }
}
