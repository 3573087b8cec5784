pub mod console_display;
pub mod controller;
pub mod coordinator;
pub mod data_logger;
pub mod error;
pub mod host;
pub mod indicator;
pub mod keymap;
pub mod osc_sender;
pub mod recorder;
pub mod sequencer;
pub mod session;
pub mod stdin_reader;
pub mod typist;
pub mod types;

pub use error::{Error, Result};
