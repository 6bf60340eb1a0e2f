//! Timer-backed debouncing of a single digital input.
//!
//! The stable flag flips only after the raw line has disagreed with it on
//! every observed tick for the whole window.  A return to agreement inside
//! the window marks the attempt as disturbed: the timer is left to run out
//! and is then discarded without a flip, after which a fresh window starts
//! if the disagreement is back.

use crate::error::TimerError;
use crate::timer::{Clock, Millis, TimerId, TimerMode, TimerService};

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    timer: TimerId,
    window: Millis,
    /// Raw level being confirmed; `None` once the window was disturbed.
    candidate: Option<bool>,
}

impl Debouncer {
    pub const fn new(timer: TimerId, window: Millis) -> Self {
        Self {
            timer,
            window,
            candidate: None,
        }
    }

    /// Feed one raw sample.  Returns the new stable value.
    pub fn update<C: Clock>(
        &mut self,
        raw: bool,
        stable: bool,
        timers: &mut TimerService<C>,
    ) -> Result<bool, TimerError> {
        if timers.exists(self.timer) {
            if raw == stable {
                self.candidate = None;
            }
            if timers.is_finished(self.timer) {
                timers.delete(self.timer);
                let confirmed = self.candidate.take() == Some(raw) && raw != stable;
                if confirmed {
                    return Ok(raw);
                }
            }
            return Ok(stable);
        }

        if raw != stable {
            timers.set_timer(self.timer, self.window, TimerMode::RunOnceAndHold)?;
            self.candidate = Some(raw);
        }
        Ok(stable)
    }
}
