//! Boiler finite state machine engine.
//!
//! The state is a sum type over `{state, inner step}`:
//!
//! ```text
//!  State::Off(OffStep)            flue-fan self test
//!  State::Ready                   idle, gas closed
//!  State::Igniting(IgnitionStep)  fan → airflow → security valve → fuel valve → spark → flame
//!  State::DhwOnDuty               burner lit for hot water
//!  State::ChOnDuty(ChStep)        burner on / off within the CH hysteresis band
//!  State::Error(ErrorStep)        gas off, code blinked, then back to OFF
//! ```
//!
//! Each tick, [`states::update`] matches the current value exhaustively and
//! may return the next one.  A different [`StateId`] is a full transition:
//! `on_exit(current)` → per-state timers released → `on_enter(next)`,
//! looked up in a fixed descriptor table.  A new inner step of the same
//! state is just stored.
//!
//! Handlers return `Result`; a timer failure anywhere in the sequence
//! means timed checks can no longer be trusted, so the engine halts in
//! ERROR with [`ErrorCode::TimerExhausted`].

pub mod context;
pub mod states;

use context::FsmContext;
use log::{debug, error, info};

use crate::app::ports::HardwareIo;
use crate::error::{ErrorCode, TimerError};
use crate::flags::OutputFlag;
use crate::timer::{Clock, TimerId};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Top-level states, without inner steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Off = 0,
    Ready = 1,
    Igniting = 2,
    DhwOnDuty = 3,
    ChOnDuty = 4,
    Error = 5,
}

impl StateId {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 6;

    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Ready => "READY",
            Self::Igniting => "IGNITING",
            Self::DhwOnDuty => "DHW_ON_DUTY",
            Self::ChOnDuty => "CH_ON_DUTY",
            Self::Error => "ERROR",
        }
    }
}

// ---------------------------------------------------------------------------
// Inner steps
// ---------------------------------------------------------------------------

/// Flue-fan self test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffStep {
    /// Everything off; airflow switch must stay open while it settles.
    AllOff,
    /// Fan running; airflow switch must close.
    WaitAirflowClose,
    /// Fan stopped; airflow switch must reopen.
    WaitAirflowOpen,
    /// Test passed.
    Handoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnitionStep {
    FanOn,
    WaitAirflow,
    SecurityValve,
    FuelValve,
    Spark,
    WaitFlame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChStep {
    /// Modulating until the water reaches the setpoint.
    BurnerOn,
    /// Gas closed, pump circulating until the water cools.
    BurnerOff,
}

impl ChStep {
    pub const fn name(self) -> &'static str {
        match self {
            Self::BurnerOn => "BURNER_ON",
            Self::BurnerOff => "BURNER_OFF",
        }
    }
}

/// Progress of the error display.  Repetitions and pulses are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStep {
    Blink { repeat: u8, pulse: u8, lit: bool },
    Pause { repeat: u8 },
    /// Unrecoverable; LED solid until reset.
    Halted,
}

impl ErrorStep {
    pub const START: Self = Self::Blink {
        repeat: 1,
        pulse: 1,
        lit: true,
    };
}

/// Full controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Off(OffStep),
    Ready,
    Igniting(IgnitionStep),
    DhwOnDuty,
    ChOnDuty(ChStep),
    Error(ErrorStep),
}

impl State {
    /// Power-up state.
    pub const BOOT: Self = Self::Off(OffStep::AllOff);

    pub const fn id(&self) -> StateId {
        match self {
            Self::Off(_) => StateId::Off,
            Self::Ready => StateId::Ready,
            Self::Igniting(_) => StateId::Igniting,
            Self::DhwOnDuty => StateId::DhwOnDuty,
            Self::ChOnDuty(_) => StateId::ChOnDuty,
            Self::Error(_) => StateId::Error,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Inner step label for the dashboard.
    pub const fn step_name(&self) -> &'static str {
        match self {
            Self::Off(OffStep::AllOff) => "ALL_OFF",
            Self::Off(OffStep::WaitAirflowClose) => "WAIT_AIRFLOW_CLOSE",
            Self::Off(OffStep::WaitAirflowOpen) => "WAIT_AIRFLOW_OPEN",
            Self::Off(OffStep::Handoff) => "HANDOFF",
            Self::Igniting(IgnitionStep::FanOn) => "FAN_ON",
            Self::Igniting(IgnitionStep::WaitAirflow) => "WAIT_AIRFLOW",
            Self::Igniting(IgnitionStep::SecurityValve) => "SECURITY_VALVE",
            Self::Igniting(IgnitionStep::FuelValve) => "FUEL_VALVE",
            Self::Igniting(IgnitionStep::Spark) => "SPARK",
            Self::Igniting(IgnitionStep::WaitFlame) => "WAIT_FLAME",
            Self::ChOnDuty(step) => step.name(),
            Self::Error(ErrorStep::Blink { .. }) => "BLINK",
            Self::Error(ErrorStep::Pause { .. }) => "PAUSE",
            Self::Error(ErrorStep::Halted) => "HALTED",
            Self::Ready | Self::DhwOnDuty => "-",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn<C> = fn(&mut FsmContext<C>, &mut dyn HardwareIo) -> Result<(), TimerError>;

/// Static descriptor for a single FSM state.
pub struct StateDescriptor<C: Clock> {
    pub id: StateId,
    pub on_enter: Option<StateActionFn<C>>,
    pub on_exit: Option<StateActionFn<C>>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm<C: Clock> {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor<C>; StateId::COUNT],
    /// Full transitions since boot.
    transitions: u32,
}

impl<C: Clock> Fsm<C> {
    pub fn new(table: [StateDescriptor<C>; StateId::COUNT]) -> Self {
        Self {
            table,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the current state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) {
        info!("FSM starting in state: {}", ctx.info.state.name());
        let id = ctx.info.state.id();
        if let Some(enter) = self.table[id as usize].on_enter {
            if let Err(e) = enter(ctx, hw) {
                self.halt(ctx, hw, e);
            }
        }
    }

    /// Dispatch the current state once and apply whatever it returns.
    pub fn tick(&mut self, ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) {
        match states::update(ctx, hw) {
            Ok(Some(next)) => self.transition(next, ctx, hw),
            Ok(None) => {}
            Err(e) => self.halt(ctx, hw, e),
        }
    }

    /// Force an immediate transition (used by the interlocks to jump to
    /// ERROR regardless of what the state handler wants).  No-op if
    /// already in `next`'s state.
    pub fn force_transition(&mut self, next: State, ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) {
        if next.id() != ctx.info.state.id() {
            self.transition(next, ctx, hw);
        }
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: State, ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) {
        let current = ctx.info.state;

        if next.id() == current.id() {
            if next != current {
                debug!(
                    "FSM step: {} {} -> {}",
                    current.name(),
                    current.step_name(),
                    next.step_name()
                );
            }
            ctx.info.state = next;
            return;
        }

        info!("FSM transition: {} -> {}", current.name(), next.name());

        if let Some(exit) = self.table[current.id() as usize].on_exit {
            if let Err(e) = exit(ctx, hw) {
                self.halt(ctx, hw, e);
                return;
            }
        }

        // Sub-step delays and the flame watch belong to the state.
        ctx.timers.delete(TimerId::FsmStep);
        ctx.timers.delete(TimerId::FlameDebounce);

        ctx.info.state = next;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[next.id() as usize].on_enter {
            if let Err(e) = enter(ctx, hw) {
                self.halt(ctx, hw, e);
            }
        }
    }

    /// Latch ERROR without touching the timer table.  Also used by the
    /// service when a timer fails outside the state handlers.
    pub fn halt(&mut self, ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo, cause: TimerError) {
        ctx.all_gas_off(hw);
        let code = ErrorCode::from(cause);
        error!("FSM halted in {}: {} ({})", ctx.info.state.name(), code, cause);
        if ctx.info.state.id() != StateId::Error {
            info!("FSM transition: {} -> {}", ctx.info.state.name(), StateId::Error.name());
            self.transitions = self.transitions.wrapping_add(1);
        }
        ctx.info.error = Some(code);
        ctx.info.state = State::Error(ErrorStep::Halted);
        ctx.info.set_output(hw, OutputFlag::StatusLed, true);
    }
}
