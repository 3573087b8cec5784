use log::debug;
use serde::{Deserialize, Serialize};

pub const ALIVE_MESSAGE: &str = "The Tonetype package is Alive! It's ALIVE!";

/// Persisted view state. Carries nothing yet; kept so saved sessions stay
/// forward compatible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {}

/// The "active" indicator shown while typing plays notes.
#[derive(Debug, Clone)]
pub struct IndicatorView {
    message: String,
    visible: bool,
    destroyed: bool,
}

impl IndicatorView {
    pub fn new(_state: Option<ViewState>) -> Self {
        Self {
            message: ALIVE_MESSAGE.to_string(),
            visible: false,
            destroyed: false,
        }
    }

    pub fn show(&mut self) {
        if !self.destroyed {
            self.visible = true;
            debug!("Indicator shown");
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn serialize(&self) -> ViewState {
        ViewState {}
    }

    /// Hide for good; `show` is ignored afterwards.
    pub fn destroy(&mut self) {
        self.visible = false;
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
