//! Application service: the hexagonal core.
//!
//! [`BoilerService`] owns the FSM, the interlocks, the sensor layer and
//! the shared context.  It exposes a hardware-agnostic API; all I/O flows
//! through port traits injected at call sites, so the whole controller
//! runs against mock adapters on the host.
//!
//! ```text
//!  HardwareIo ──────▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  SensorAveraging ──▶│        BoilerService          │
//!  HardwareIo ◀───────│ Sensors · Interlocks · FSM    │
//!                     └──────────────────────────────┘
//! ```
//!
//! One [`tick`](BoilerService::tick) is one pass of the control loop, in a
//! fixed order: sensor refresh → analog capture → interlocks → FSM
//! dispatch → pump overrun → telemetry → outbound events.

use log::{info, warn};

use crate::config::BoilerConfig;
use crate::control::Modulator;
use crate::error::{ErrorCode, TimerError};
use crate::flags::{Flag, OutputFlag};
use crate::fsm::context::{FsmContext, SysInfo};
use crate::fsm::states::build_state_table;
use crate::fsm::{ErrorStep, Fsm, State, StateId};
use crate::safety::Interlocks;
use crate::sensors::SensorLayer;
use crate::sensors::analog::AnalogSnapshot;
use crate::timer::{Clock, TimerId, TimerMode, TimerService};

use super::events::{AppEvent, Snapshot};
use super::ports::{EventSink, HardwareIo, SensorAveraging};

// ───────────────────────────────────────────────────────────────
// BoilerService
// ───────────────────────────────────────────────────────────────

pub struct BoilerService<C: Clock> {
    fsm: Fsm<C>,
    ctx: FsmContext<C>,
    sensors: SensorLayer,
    interlocks: Interlocks,
    tick_count: u64,
}

impl<C: Clock> BoilerService<C> {
    /// Construct the service.  Does **not** touch hardware; call
    /// [`start`](Self::start) next.
    pub fn new(config: BoilerConfig, clock: C) -> Self {
        Self::with_timers(config, TimerService::new(clock))
    }

    /// Same as [`new`](Self::new) with fewer usable timer slots.
    pub fn with_timer_capacity(config: BoilerConfig, clock: C, capacity: usize) -> Self {
        Self::with_timers(config, TimerService::with_capacity(clock, capacity))
    }

    fn with_timers(config: BoilerConfig, timers: TimerService<C>) -> Self {
        if let Err(e) = config.validate() {
            warn!("BoilerService: {e}");
        }
        let sensors = SensorLayer::new(&config);
        let ctx = FsmContext::new(config, timers, Modulator::new());
        Self {
            fsm: Fsm::new(build_state_table()),
            ctx,
            sensors,
            interlocks: Interlocks::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every output off, enter the boot state and arm telemetry.
    pub fn start(&mut self, hw: &mut impl HardwareIo, sink: &mut impl EventSink) {
        for &flag in OutputFlag::ALL {
            self.ctx.info.set_output(hw, flag, false);
        }
        self.fsm.start(&mut self.ctx, hw);

        let period = self.ctx.config.telemetry_interval_ms;
        if let Err(e) = self
            .ctx
            .timers
            .set_timer(TimerId::Telemetry, period, TimerMode::RunContinuously)
        {
            self.fail(hw, e);
        }

        sink.emit(&AppEvent::Started(self.state()));
        info!("BoilerService started in {}", self.ctx.info.state.name());
        if self.is_halted() {
            sink.emit(&AppEvent::Halted(ErrorCode::TimerExhausted));
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.
    ///
    /// `hw` satisfies **both** [`HardwareIo`] and [`SensorAveraging`]; one
    /// borrow covers pins and filtered ADC.
    pub fn tick(
        &mut self,
        hw: &mut (impl HardwareIo + SensorAveraging),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let prev = self.state();
        let was_halted = self.is_halted();

        // 1. Stable input flags
        if let Err(e) = self
            .sensors
            .refresh_all(hw, &mut self.ctx.timers, &mut self.ctx.info.inputs)
        {
            self.fail(hw, e);
        }

        // 2. Filtered analog readings
        self.ctx.info.analog = AnalogSnapshot::capture(|input| hw.filtered(input));

        // 3. Interlocks, whatever the state
        if let Some(code) = self.interlocks.evaluate(&mut self.ctx, hw) {
            if self.state() != StateId::Error {
                warn!("Interlock tripped in {}: {}", self.ctx.info.state.name(), code);
                if let Some(next) = self.ctx.raise(hw, code) {
                    self.fsm.force_transition(next, &mut self.ctx, hw);
                }
            }
        }

        // 4. State dispatch
        self.fsm.tick(&mut self.ctx, hw);

        // 5. Pump overrun
        self.service_pump(hw);

        // 6. Telemetry
        if self.ctx.timers.is_finished(TimerId::Telemetry) {
            sink.emit(&AppEvent::Telemetry(self.snapshot()));
        }

        // 7. Outbound events
        let now = self.state();
        if now != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: now });
        }
        if self.is_halted() && !was_halted {
            sink.emit(&AppEvent::Halted(ErrorCode::TimerExhausted));
        } else if now == StateId::Error && prev != StateId::Error {
            if let Some(code) = self.ctx.info.error {
                sink.emit(&AppEvent::FaultRaised(code));
            }
        }
        if prev == StateId::Error && now != StateId::Error {
            sink.emit(&AppEvent::FaultCleared);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Dashboard view of the controller.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(&self.ctx.info, self.ctx.timers.now())
    }

    /// Current top-level state.
    pub fn state(&self) -> StateId {
        self.ctx.info.state.id()
    }

    /// Current state including the inner step.
    pub fn full_state(&self) -> State {
        self.ctx.info.state
    }

    /// Latched in ERROR until reset.
    pub fn is_halted(&self) -> bool {
        self.ctx.info.state == State::Error(ErrorStep::Halted)
    }

    pub fn info(&self) -> &SysInfo {
        &self.ctx.info
    }

    pub fn config(&self) -> &BoilerConfig {
        &self.ctx.config
    }

    /// Interlock conditions seen on the last tick.
    pub fn interlock_faults(&self) -> u16 {
        self.interlocks.faults()
    }

    /// Full FSM transitions since boot.
    pub fn transitions(&self) -> u32 {
        self.fsm.transitions()
    }

    /// Control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Stop the pump once its overrun elapses, unless CH duty or an
    /// overheat bleed still needs it.
    fn service_pump(&mut self, hw: &mut impl HardwareIo) {
        if self.ctx.timers.is_finished(TimerId::PumpShutdown)
            && self.state() != StateId::ChOnDuty
            && !self.ctx.info.ch_overheat
        {
            info!("Pump overrun finished");
            self.ctx.info.set_output(hw, OutputFlag::Pump, false);
        }
    }

    fn fail(&mut self, hw: &mut impl HardwareIo, cause: TimerError) {
        if !self.is_halted() {
            self.fsm.halt(&mut self.ctx, hw, cause);
        }
    }
}
