use doggo_core::Stimulus;
use doggo_timing::TimerToken;

/// Timing snapshot taken at stimulus onset; later median updates do not
/// affect a trial already on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseWindow {
    pub onset_ms: f64,
    pub threshold_ms: f64,
    pub max_rt_ms: f64,
}

impl ResponseWindow {
    pub fn closes_at_ms(&self) -> f64 {
        self.onset_ms + self.max_rt_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveTrial {
    pub number: usize,
    pub stimulus: Stimulus,
    pub window: ResponseWindow,
}

/// Lifecycle of the one stimulus a session may have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StimulusState {
    #[default]
    Hidden,
    /// Waiting out the inter-stimulus delay.
    Armed {
        stimulus: Stimulus,
        armed_at_ms: f64,
        due_ms: f64,
        token: TimerToken,
    },
    Visible(LiveTrial),
}

impl StimulusState {
    pub fn is_visible(&self) -> bool {
        matches!(self, StimulusState::Visible(_))
    }

    pub fn live(&self) -> Option<&LiveTrial> {
        match self {
            StimulusState::Visible(trial) => Some(trial),
            _ => None,
        }
    }
}
