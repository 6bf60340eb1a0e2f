//! Mock boiler for integration tests.
//!
//! Holds logical input levels (converted to raw electrical levels with the
//! board's polarity on read), records every actuator write, and hands back
//! analog values unfiltered.  Two small plant models make runs realistic:
//!
//! - the flue: with `airflow_follows_fan`, the airflow switch reports
//!   whatever the fan output is doing;
//! - the burner: with `FlameModel::Lights`, flame appears once gas and the
//!   igniter are on together and holds while gas keeps flowing.

#![allow(dead_code)]

use gasboiler::app::events::AppEvent;
use gasboiler::app::ports::{EventSink, HardwareIo, SensorAveraging};
use gasboiler::app::service::BoilerService;
use gasboiler::config::BoilerConfig;
use gasboiler::flags::{InputFlag, OutputFlag};
use gasboiler::fsm::StateId;
use gasboiler::pins;
use gasboiler::sensors::analog::{AnalogInput, AnalogSnapshot};
use gasboiler::timer::{ManualClock, Millis};

/// Loop period used by the rigs.
pub const TICK_MS: Millis = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlameModel {
    /// Flame never appears.
    Never,
    /// Gas + spark lights the burner; closing gas puts it out.
    Lights,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Logical levels, indexed by input bit.
    active: [bool; 5],
    /// Output levels, indexed by output bit.
    pub levels: [bool; 8],
    /// Every write, in order.
    pub writes: Vec<(OutputFlag, bool)>,
    pub analog: AnalogSnapshot,
    pub airflow_follows_fan: bool,
    pub flame_model: FlameModel,
    /// Overrides the burner model when set.
    pub flame_forced: Option<bool>,
    lit: bool,
}

impl MockHardware {
    /// Healthy, idle boiler: no demand, working flue, burner lights.
    pub fn new() -> Self {
        Self {
            active: [false; 5],
            levels: [false; 8],
            writes: Vec::new(),
            analog: AnalogSnapshot {
                dhw_temp: 400,
                ch_temp: 400,
                dhw_set: 600,
                ch_set: 600,
                mode: 0,
            },
            airflow_follows_fan: true,
            flame_model: FlameModel::Lights,
            flame_forced: None,
            lit: false,
        }
    }

    pub fn set_input(&mut self, flag: InputFlag, active: bool) {
        self.active[flag as usize] = active;
    }

    pub fn is_on(&self, output: OutputFlag) -> bool {
        self.levels[output as usize]
    }

    pub fn gas_open(&self) -> bool {
        OutputFlag::GAS.iter().any(|f| self.is_on(*f))
    }

    pub fn open_fuel_valves(&self) -> usize {
        OutputFlag::FUEL_VALVES.iter().filter(|f| self.is_on(**f)).count()
    }

    /// Whether `output` was ever driven on since the last `writes.clear()`.
    pub fn was_energised(&self, output: OutputFlag) -> bool {
        self.writes.iter().any(|&(f, on)| f == output && on)
    }

    fn logical(&mut self, input: InputFlag) -> bool {
        match input {
            InputFlag::Airflow if self.airflow_follows_fan => self.is_on(OutputFlag::Fan),
            InputFlag::Flame => {
                if let Some(forced) = self.flame_forced {
                    return forced;
                }
                let gas = self.is_on(OutputFlag::SecurityValve) && self.open_fuel_valves() > 0;
                self.lit = match self.flame_model {
                    FlameModel::Never => false,
                    FlameModel::Lights => gas && (self.lit || self.is_on(OutputFlag::Igniter)),
                };
                self.lit
            }
            _ => self.active[input as usize],
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareIo for MockHardware {
    fn read_digital(&mut self, input: InputFlag) -> bool {
        let active = self.logical(input);
        active == pins::input_active_high(input)
    }

    fn write_digital(&mut self, output: OutputFlag, on: bool) {
        self.levels[output as usize] = on;
        self.writes.push((output, on));
    }

    fn read_adc(&mut self, input: AnalogInput) -> u16 {
        self.analog.get(input)
    }
}

impl SensorAveraging for MockHardware {
    fn filtered(&mut self, input: AnalogInput) -> u16 {
        self.analog.get(input)
    }
}

// ── EventLog ──────────────────────────────────────────────────

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Service, board, sink and clock wired together.
pub struct Rig {
    pub clock: ManualClock,
    pub svc: BoilerService<ManualClock>,
    pub hw: MockHardware,
    pub log: EventLog,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(BoilerConfig::default())
    }

    pub fn with_config(config: BoilerConfig) -> Self {
        let clock = ManualClock::new();
        let svc = BoilerService::new(config, clock.clone());
        Self::started(clock, svc)
    }

    pub fn with_timer_capacity(capacity: usize) -> Self {
        let clock = ManualClock::new();
        let svc = BoilerService::with_timer_capacity(BoilerConfig::default(), clock.clone(), capacity);
        Self::started(clock, svc)
    }

    fn started(clock: ManualClock, mut svc: BoilerService<ManualClock>) -> Self {
        let mut hw = MockHardware::new();
        let mut log = EventLog::new();
        svc.start(&mut hw, &mut log);
        Self { clock, svc, hw, log }
    }

    /// Advance time by one loop period and run one tick.
    pub fn tick(&mut self) {
        self.clock.advance(TICK_MS);
        self.svc.tick(&mut self.hw, &mut self.log);
    }

    /// Run for `ms` of simulated time.
    pub fn run_for(&mut self, ms: Millis) {
        for _ in 0..ms / TICK_MS {
            self.tick();
        }
    }

    /// Tick until `done` holds, for at most `max_ms`.  Returns whether it
    /// did.
    pub fn run_until(&mut self, max_ms: Millis, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ms / TICK_MS {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    pub fn run_until_state(&mut self, state: StateId, max_ms: Millis) -> bool {
        self.run_until(max_ms, |r| r.svc.state() == state)
    }

    /// Boot through the fan test into READY.
    pub fn to_ready(&mut self) {
        assert!(self.run_until_state(StateId::Ready, 3_000), "fan test did not pass");
    }
}
