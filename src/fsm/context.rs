//! Shared mutable context threaded through every FSM handler.
//!
//! [`SysInfo`] is the aggregate root: state, flag sets, ignition and
//! modulation bookkeeping.  [`FsmContext`] bundles it with the timer
//! table, the modulator and the configuration so a handler has one
//! "blackboard" to read and write.  Hardware is passed alongside, per call.

use log::{debug, error};

use crate::app::ports::HardwareIo;
use crate::config::BoilerConfig;
use crate::control::Modulator;
use crate::error::{ErrorCode, TimerError};
use crate::flags::{FlagSet, InputFlag, OutputFlag};
use crate::sensors::analog::AnalogSnapshot;
use crate::timer::{Clock, Millis, TimerId, TimerMode, TimerService};

use super::{ChStep, ErrorStep, State};

// ---------------------------------------------------------------------------
// SysInfo (aggregate root)
// ---------------------------------------------------------------------------

/// Everything the controller knows about itself.  Re-initialised on every
/// power-up; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct SysInfo {
    /// Current state and inner step.
    pub state: State,
    /// Stable logical inputs.  Written only by the sensor layer.
    pub inputs: FlagSet<InputFlag>,
    /// Actuator outputs, always equal to what was last written to hardware.
    pub outputs: FlagSet<OutputFlag>,
    /// 1-based ignition attempt of the current episode.
    pub ignition_tries: u8,
    /// Active fault, cleared only by ERROR.
    pub error: Option<ErrorCode>,
    /// Heat table row in use.
    pub heat_level: u8,
    /// Valve slot of the running modulation cycle.
    pub valve_index: u8,
    pub cycle_in_progress: bool,
    /// Pump run-on left over when DHW pre-empted it.
    pub pump_memory: Millis,
    /// CH water overheated while serving DHW; pump is bleeding the heat.
    pub ch_overheat: bool,
    /// Modulator slot → fuel valve output.
    pub valves: [OutputFlag; 3],
    /// Filtered analog readings of this tick.
    pub analog: AnalogSnapshot,
    /// CH inner step to resume when DHW hands back.
    pub saved_ch_step: ChStep,
}

impl SysInfo {
    pub fn new() -> Self {
        Self {
            state: State::BOOT,
            inputs: FlagSet::empty(),
            outputs: FlagSet::empty(),
            ignition_tries: 0,
            error: None,
            heat_level: 0,
            valve_index: 0,
            cycle_in_progress: false,
            pump_memory: 0,
            ch_overheat: false,
            valves: OutputFlag::FUEL_VALVES,
            analog: AnalogSnapshot::default(),
            saved_ch_step: ChStep::BurnerOn,
        }
    }

    /// Numeric error code; 0 when healthy.
    pub fn error_code(&self) -> u8 {
        self.error.map_or(0, ErrorCode::code)
    }

    pub fn input(&self, flag: InputFlag) -> bool {
        self.inputs.contains(flag)
    }

    pub fn output(&self, flag: OutputFlag) -> bool {
        self.outputs.contains(flag)
    }

    /// Drive an actuator and its flag together.  The only way outputs
    /// change.
    pub fn set_output(&mut self, hw: &mut (impl HardwareIo + ?Sized), flag: OutputFlag, on: bool) {
        hw.write_digital(flag, on);
        if self.outputs.assign(flag, on) {
            debug!("output {:?} -> {}", flag, on);
        }
    }

    /// Whether any gas valve or the igniter is energised.
    pub fn gas_open(&self) -> bool {
        self.outputs.count_of(&OutputFlag::GAS) > 0
    }
}

impl Default for SysInfo {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext<C: Clock> {
    pub info: SysInfo,
    pub timers: TimerService<C>,
    pub modulator: Modulator,
    pub config: BoilerConfig,
}

impl<C: Clock> FsmContext<C> {
    pub fn new(config: BoilerConfig, timers: TimerService<C>, modulator: Modulator) -> Self {
        Self {
            info: SysInfo::new(),
            timers,
            modulator,
            config,
        }
    }

    /// Airflow proven.  With the sensor overridden, a running fan counts
    /// as proof.
    pub fn airflow_ok(&self) -> bool {
        if self.config.airflow_sensor_override {
            self.info.output(OutputFlag::Fan)
        } else {
            self.info.input(InputFlag::Airflow)
        }
    }

    /// Airflow switch closed while it should be open.  Never true with the
    /// sensor overridden.
    pub fn airflow_unexpected(&self) -> bool {
        !self.config.airflow_sensor_override && self.info.input(InputFlag::Airflow)
    }

    pub fn dhw_requested(&self) -> bool {
        self.info.input(InputFlag::DhwRequest)
    }

    pub fn ch_requested(&self) -> bool {
        self.info.input(InputFlag::ChRequest)
    }

    /// Close every gas valve, stop the igniter and the fan, abandon the
    /// modulation cycle.  Idempotent.  The pump is left alone.
    pub fn all_gas_off(&mut self, hw: &mut (impl HardwareIo + ?Sized)) {
        for flag in OutputFlag::GAS {
            self.info.set_output(hw, flag, false);
        }
        self.info.set_output(hw, OutputFlag::Fan, false);
        self.info.set_output(hw, OutputFlag::StatusLed, false);
        self.modulator.stop(&mut self.info, &mut self.timers);
    }

    /// Close gas, record `code` and hand back the ERROR target.
    pub fn raise(&mut self, hw: &mut (impl HardwareIo + ?Sized), code: ErrorCode) -> Option<State> {
        self.all_gas_off(hw);
        error!("fault {} in {}", code, self.info.state.name());
        self.info.error = Some(code);
        Some(State::Error(ErrorStep::START))
    }

    /// (Re-)arm the sub-step delay from now.
    pub fn arm_step(&mut self, ms: Millis) -> Result<(), TimerError> {
        if self.timers.exists(TimerId::FsmStep) {
            self.timers.reset_lapse(TimerId::FsmStep, ms)
        } else {
            self.timers
                .set_timer(TimerId::FsmStep, ms, TimerMode::RunOnceAndHold)
                .map(|_| ())
        }
    }

    /// Sub-step delay elapsed.
    pub fn step_done(&mut self) -> bool {
        self.timers.is_finished(TimerId::FsmStep)
    }

    /// Track flame while the burner should be cold.  Returns `true` once
    /// flame has persisted for the whole flame debounce window.
    pub fn flame_out_of_sequence(&mut self) -> Result<bool, TimerError> {
        if !self.info.input(InputFlag::Flame) {
            self.timers.delete(TimerId::FlameDebounce);
            return Ok(false);
        }
        if !self.timers.exists(TimerId::FlameDebounce) {
            self.timers.set_timer(
                TimerId::FlameDebounce,
                self.config.flame_debounce_ms,
                TimerMode::RunOnceAndHold,
            )?;
            return Ok(false);
        }
        Ok(self.timers.is_finished(TimerId::FlameDebounce))
    }

    /// Save the running pump overrun and stop the pump.
    pub fn park_pump_overrun(&mut self, hw: &mut (impl HardwareIo + ?Sized)) {
        if self.timers.exists(TimerId::PumpShutdown) {
            self.info.pump_memory = self.timers.time_left(TimerId::PumpShutdown);
            self.timers.delete(TimerId::PumpShutdown);
            if !self.info.ch_overheat {
                self.info.set_output(hw, OutputFlag::Pump, false);
            }
            debug!("pump overrun parked with {}ms left", self.info.pump_memory);
        }
    }

    /// Resume a parked pump overrun, if any.
    pub fn resume_pump_overrun(
        &mut self,
        hw: &mut (impl HardwareIo + ?Sized),
    ) -> Result<(), TimerError> {
        let left = core::mem::take(&mut self.info.pump_memory);
        if left > 0 {
            self.start_pump_overrun(hw, left)?;
        }
        Ok(())
    }

    /// Keep the pump running for `ms` more.
    pub fn start_pump_overrun(
        &mut self,
        hw: &mut (impl HardwareIo + ?Sized),
        ms: Millis,
    ) -> Result<(), TimerError> {
        self.timers
            .set_timer(TimerId::PumpShutdown, ms, TimerMode::RunOnceAndDelete)?;
        self.info.set_output(hw, OutputFlag::Pump, true);
        Ok(())
    }
}
