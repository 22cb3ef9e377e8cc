//! Alert debouncing for the verdict stream.
//!
//! The debouncer turns a stream of per-frame verdicts into alert events:
//! exactly one alert per maximal run of bad verdicts. The alert fires on
//! entry into bad posture, stays silent while bad posture persists and is
//! re-armed by the next good verdict.

use crate::posture::PostureVerdict;

/// Debouncer state carried from one tick to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceState {
    /// Verdict seen on the previous tick
    pub previous_verdict: PostureVerdict,
    /// Whether the next bad verdict should raise an alert
    pub alert_armed: bool,
}

impl Default for DebounceState {
    fn default() -> Self {
        Self {
            previous_verdict: PostureVerdict::Good,
            alert_armed: true,
        }
    }
}

impl DebounceState {
    /// Advance with the verdict of the current tick
    ///
    /// Returns the next state and whether an alert must be raised now.
    #[must_use]
    pub fn update(self, verdict: PostureVerdict) -> (Self, bool) {
        match verdict {
            PostureVerdict::Bad => {
                let next = Self {
                    previous_verdict: PostureVerdict::Bad,
                    alert_armed: false,
                };
                (next, self.alert_armed)
            }
            PostureVerdict::Good => (Self::default(), false),
        }
    }
}

/// Free-function form of [`DebounceState::update`]
#[must_use]
pub fn update(state: DebounceState, verdict: PostureVerdict) -> (DebounceState, bool) {
    state.update(verdict)
}

/// Session-owned debouncer
#[derive(Debug, Default)]
pub struct AlertDebouncer {
    state: DebounceState,
}

impl AlertDebouncer {
    /// Create a debouncer in the initial armed state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one verdict; returns true when an alert must be raised
    pub fn update(&mut self, verdict: PostureVerdict) -> bool {
        let (next, should_alert) = self.state.update(verdict);
        self.state = next;
        should_alert
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Return to the initial armed state
    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }
}
