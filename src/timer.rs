//! Timer service.
//!
//! Multiplexes a fixed set of named software timers over one free-running
//! millisecond counter.  The counter is the only state shared with
//! interrupt context: [`tick`] bumps it from the 1 ms hardware timer, and
//! every main-loop read goes through the same critical section.
//!
//! ```text
//!   1 ms ISR ──► tick() ──► MILLIS (Mutex<Cell<u32>>)
//!                               │
//!                               ▼  Clock::now()
//!   ┌──────────────────────────────────────────────┐
//!   │ TimerService                                 │
//!   │   slots[0..capacity]: Option<TimerSlot>      │
//!   │   set_timer / is_finished / reset_lapse ...  │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! The counter wraps after ~49.7 days.  All elapsed arithmetic is
//! `now.wrapping_sub(start)`, so a wrap inside a running window is
//! harmless as long as no single duration exceeds `u32::MAX`.

use core::cell::Cell;
use std::rc::Rc;

use critical_section::Mutex;
use log::{debug, warn};

use crate::error::TimerError;

/// Milliseconds since boot, wrapping.
pub type Millis = u32;

/// Number of physical slots in the table.
pub const TIMER_SLOTS: usize = 8;

// ═══════════════════════════════════════════════════════════════
//  Millisecond counter (shared with ISR)
// ═══════════════════════════════════════════════════════════════

static MILLIS: Mutex<Cell<Millis>> = Mutex::new(Cell::new(0));

/// Advance the millisecond counter by one.
///
/// Called from the 1 ms hardware timer only.  O(1); touches nothing but
/// the counter.
pub fn tick() {
    critical_section::with(|cs| {
        let c = MILLIS.borrow(cs);
        c.set(c.get().wrapping_add(1));
    });
}

/// Source of the current time for a [`TimerService`].
pub trait Clock {
    fn now(&self) -> Millis;
}

/// Reads the ISR-fed counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickClock;

impl Clock for SysTickClock {
    fn now(&self) -> Millis {
        critical_section::with(|cs| MILLIS.borrow(cs).get())
    }
}

/// Manually driven clock for simulation and tests.
///
/// Clones share the same time, so a test can keep one handle and move
/// the other into the service.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Millis>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(t: Millis) -> Self {
        Self(Rc::new(Cell::new(t)))
    }

    pub fn advance(&self, ms: Millis) {
        self.0.set(self.0.get().wrapping_add(ms));
    }

    pub fn set(&self, t: Millis) {
        self.0.set(t);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.0.get()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer identities and modes
// ═══════════════════════════════════════════════════════════════

/// One id per purpose.  At most one live slot carries a given id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Delay of the current FSM sub-step.
    FsmStep,
    /// Per-valve slot of the heat-modulation cycle.
    HeatCycle,
    /// Pump run-on after central heating.
    PumpShutdown,
    /// Persistence window for out-of-sequence flame.
    FlameDebounce,
    /// Stability window of the CH request contact.
    ChSwitchDebounce,
    /// Stability window of the airflow switch.
    AirflowDebounce,
    /// Periodic telemetry snapshot.
    Telemetry,
}

impl TimerId {
    pub const fn name(self) -> &'static str {
        match self {
            Self::FsmStep => "FSM_STEP",
            Self::HeatCycle => "HEAT_CYCLE",
            Self::PumpShutdown => "PUMP_SHUTDOWN",
            Self::FlameDebounce => "FLAME_DEBOUNCE",
            Self::ChSwitchDebounce => "CH_DEBOUNCE",
            Self::AirflowDebounce => "AIRFLOW_DEBOUNCE",
            Self::Telemetry => "TELEMETRY",
        }
    }
}

/// What happens once a timer's window has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Stays finished until reset or deleted.  The only restartable mode.
    RunOnceAndHold,
    /// Slot is reclaimed the first time it is observed finished.
    RunOnceAndDelete,
    /// Start time advances by one period each time it is observed
    /// finished.  Periodic maintenance only.
    RunContinuously,
}

#[derive(Debug, Clone, Copy)]
struct TimerSlot {
    id: TimerId,
    start: Millis,
    duration: Millis,
    mode: TimerMode,
}

impl TimerSlot {
    fn elapsed(&self, now: Millis) -> bool {
        now.wrapping_sub(self.start) >= self.duration
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer service
// ═══════════════════════════════════════════════════════════════

pub struct TimerService<C: Clock> {
    clock: C,
    slots: [Option<TimerSlot>; TIMER_SLOTS],
    /// Usable slots (<= TIMER_SLOTS).  Lowered in tests to exercise
    /// exhaustion.
    capacity: usize,
}

impl<C: Clock> TimerService<C> {
    pub fn new(clock: C) -> Self {
        Self::with_capacity(clock, TIMER_SLOTS)
    }

    pub fn with_capacity(clock: C, capacity: usize) -> Self {
        Self {
            clock,
            slots: [None; TIMER_SLOTS],
            capacity: capacity.min(TIMER_SLOTS),
        }
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    fn find(&self, id: TimerId) -> Option<usize> {
        self.slots[..self.capacity]
            .iter()
            .position(|s| s.is_some_and(|s| s.id == id))
    }

    /// Install a timer starting now.
    ///
    /// An existing slot with the same id is re-armed in place, so an id is
    /// never live twice.  Returns the slot index.
    pub fn set_timer(
        &mut self,
        id: TimerId,
        duration: Millis,
        mode: TimerMode,
    ) -> Result<usize, TimerError> {
        let index = match self.find(id) {
            Some(i) => i,
            None => self.slots[..self.capacity]
                .iter()
                .position(Option::is_none)
                .ok_or_else(|| {
                    warn!("timer: no free slot for {}", id.name());
                    TimerError::NoFreeSlot
                })?,
        };
        self.slots[index] = Some(TimerSlot {
            id,
            start: self.clock.now(),
            duration,
            mode,
        });
        debug!("timer: {} armed for {}ms in slot {}", id.name(), duration, index);
        Ok(index)
    }

    /// Whether the timer's window has elapsed.  Absent timers are never
    /// finished.
    ///
    /// Observing a finished `RunOnceAndDelete` slot frees it;
    /// observing a finished `RunContinuously` slot starts its next period.
    pub fn is_finished(&mut self, id: TimerId) -> bool {
        let now = self.clock.now();
        let Some(i) = self.find(id) else {
            return false;
        };
        let Some(slot) = self.slots[i].as_mut() else {
            return false;
        };
        if !slot.elapsed(now) {
            return false;
        }
        match slot.mode {
            TimerMode::RunOnceAndHold => {}
            TimerMode::RunContinuously => {
                slot.start = slot.start.wrapping_add(slot.duration);
            }
            TimerMode::RunOnceAndDelete => {
                debug!("timer: {} elapsed, slot {} freed", id.name(), i);
                self.slots[i] = None;
            }
        }
        true
    }

    /// Live and not yet elapsed.
    pub fn is_running(&self, id: TimerId) -> bool {
        let now = self.clock.now();
        self.find(id)
            .and_then(|i| self.slots[i])
            .is_some_and(|s| !s.elapsed(now))
    }

    pub fn exists(&self, id: TimerId) -> bool {
        self.find(id).is_some()
    }

    /// Milliseconds until the window elapses; zero when elapsed or absent.
    pub fn time_left(&self, id: TimerId) -> Millis {
        let now = self.clock.now();
        self.find(id)
            .and_then(|i| self.slots[i])
            .map_or(0, |s| s.duration.saturating_sub(now.wrapping_sub(s.start)))
    }

    /// Re-arm a `RunOnceAndHold` timer from now with a new duration.
    pub fn reset_lapse(&mut self, id: TimerId, duration: Millis) -> Result<(), TimerError> {
        let now = self.clock.now();
        let slot = self
            .find(id)
            .and_then(|i| self.slots[i].as_mut())
            .ok_or(TimerError::NotFound)?;
        if slot.mode != TimerMode::RunOnceAndHold {
            warn!("timer: reset_lapse refused for {} ({:?})", id.name(), slot.mode);
            return Err(TimerError::ModeForbidsRestart);
        }
        slot.start = now;
        slot.duration = duration;
        Ok(())
    }

    /// Re-arm a timer from now, keeping its duration.
    pub fn restart(&mut self, id: TimerId) -> Result<(), TimerError> {
        let duration = self
            .find(id)
            .and_then(|i| self.slots[i])
            .ok_or(TimerError::NotFound)?
            .duration;
        self.reset_lapse(id, duration)
    }

    /// Free the slot, elapsed or not.  No-op if absent.
    pub fn delete(&mut self, id: TimerId) {
        if let Some(i) = self.find(id) {
            self.slots[i] = None;
        }
    }

    /// Number of occupied slots.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
