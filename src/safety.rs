//! Global interlocks.
//!
//! Evaluated **every tick, after the sensor refresh and before the FSM
//! dispatch**, whatever the state.  The interlocks keep a mask of the
//! conditions currently present and report the most severe one; the
//! service forces the FSM into ERROR with that code.
//!
//! ## Conditions
//!
//! | Condition                               | Result                        |
//! |-----------------------------------------|-------------------------------|
//! | overheat thermostat open (no override)  | ERROR 9, any state            |
//! | thermistor reading at an ADC rail       | ERROR 6 (DHW) / 7 (CH)        |
//! | CH water > setpoint + tolerance, CH duty| ERROR 8                       |
//! | same, DHW duty                          | pump on to bleed CH loop heat |
//!
//! The DHW-duty bleed is tracked in `SysInfo::ch_overheat` and released
//! once the water is back below setpoint + re-arm margin.

use log::{error, info, warn};

use crate::app::ports::HardwareIo;
use crate::error::ErrorCode;
use crate::flags::{InputFlag, OutputFlag};
use crate::fsm::StateId;
use crate::fsm::context::FsmContext;
use crate::timer::{Clock, TimerId};

/// Reported first when several conditions hold at once.
const SEVERITY: [ErrorCode; 4] = [
    ErrorCode::OverheatThermostat,
    ErrorCode::ChOverheat,
    ErrorCode::ChSensorRange,
    ErrorCode::DhwSensorRange,
];

pub struct Interlocks {
    /// Conditions present on the last evaluation (see `ErrorCode::mask()`).
    faults: u16,
}

impl Interlocks {
    pub fn new() -> Self {
        Self { faults: 0 }
    }

    /// Re-check every interlock.  Returns the fault to raise, if any.
    pub fn evaluate<C: Clock>(
        &mut self,
        ctx: &mut FsmContext<C>,
        hw: &mut dyn HardwareIo,
    ) -> Option<ErrorCode> {
        let cfg = &ctx.config;
        let analog = ctx.info.analog;
        let state = ctx.info.state.id();
        let at_rail = |raw: u16| raw <= cfg.adc_min_valid || raw >= cfg.adc_max_valid;

        // ── Limit thermostat ──────────────────────────────────────
        self.eval_fault(
            ErrorCode::OverheatThermostat,
            ctx.info.input(InputFlag::Overheat) && !cfg.overheat_override,
        );

        // ── Thermistor plausibility ───────────────────────────────
        self.eval_fault(ErrorCode::DhwSensorRange, at_rail(analog.dhw_temp));
        self.eval_fault(ErrorCode::ChSensorRange, at_rail(analog.ch_temp));

        // ── CH water temperature ──────────────────────────────────
        let water = analog.ch_temp & !1;
        let set = analog.ch_set & !1;
        let over = water > set.saturating_add(cfg.ch_overheat_tolerance);
        let rearmed = water < set.saturating_add(cfg.ch_overheat_rearm);

        self.eval_fault(ErrorCode::ChOverheat, over && state == StateId::ChOnDuty);

        if over && state == StateId::DhwOnDuty && !ctx.info.ch_overheat {
            warn!("INTERLOCK: CH water {} over setpoint {} in DHW duty, pump bleeding heat", water, set);
            ctx.info.ch_overheat = true;
            ctx.info.set_output(hw, OutputFlag::Pump, true);
        } else if ctx.info.ch_overheat && rearmed {
            info!("INTERLOCK: CH water back to {}, bleed stopped", water);
            ctx.info.ch_overheat = false;
            if state != StateId::ChOnDuty && !ctx.timers.exists(TimerId::PumpShutdown) {
                ctx.info.set_output(hw, OutputFlag::Pump, false);
            }
        }

        SEVERITY.into_iter().find(|code| self.has_fault(*code))
    }

    /// Current condition mask.
    pub fn faults(&self) -> u16 {
        self.faults
    }

    pub fn has_fault(&self, code: ErrorCode) -> bool {
        self.faults & code.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a condition bit, logging edges.
    fn eval_fault(&mut self, code: ErrorCode, condition: bool) {
        if condition {
            if !self.has_fault(code) {
                error!("INTERLOCK SET: {code}");
            }
            self.faults |= code.mask();
        } else {
            if self.has_fault(code) {
                info!("INTERLOCK CLEARED: {code}");
            }
            self.faults &= !code.mask();
        }
    }
}

impl Default for Interlocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoilerConfig;
    use crate::control::Modulator;
    use crate::fsm::{ChStep, State};
    use crate::sensors::analog::{AnalogInput, AnalogSnapshot};
    use crate::timer::{ManualClock, TimerMode, TimerService};

    struct Board;

    impl HardwareIo for Board {
        fn read_digital(&mut self, _input: InputFlag) -> bool {
            false
        }
        fn write_digital(&mut self, _output: OutputFlag, _on: bool) {}
        fn read_adc(&mut self, _input: AnalogInput) -> u16 {
            0
        }
    }

    fn ctx_at(ch_temp: u16, ch_set: u16, state: State) -> FsmContext<ManualClock> {
        let timers = TimerService::new(ManualClock::new());
        let mut ctx = FsmContext::new(BoilerConfig::default(), timers, Modulator::new());
        ctx.info.analog = AnalogSnapshot {
            dhw_temp: 500,
            ch_temp,
            dhw_set: 500,
            ch_set,
            mode: 0,
        };
        ctx.info.state = state;
        ctx
    }

    #[test]
    fn healthy_readings_raise_nothing() {
        let mut ctx = ctx_at(500, 600, State::Ready);
        let mut il = Interlocks::new();
        assert_eq!(il.evaluate(&mut ctx, &mut Board), None);
        assert_eq!(il.faults(), 0);
    }

    #[test]
    fn rail_readings_are_sensor_faults() {
        let mut ctx = ctx_at(500, 600, State::Ready);
        ctx.info.analog.dhw_temp = 0;
        let mut il = Interlocks::new();
        assert_eq!(il.evaluate(&mut ctx, &mut Board), Some(ErrorCode::DhwSensorRange));

        ctx.info.analog.dhw_temp = 500;
        ctx.info.analog.ch_temp = 1023;
        assert_eq!(il.evaluate(&mut ctx, &mut Board), Some(ErrorCode::ChSensorRange));
        assert!(!il.has_fault(ErrorCode::DhwSensorRange));
    }

    #[test]
    fn thermostat_is_fatal_unless_overridden() {
        let mut ctx = ctx_at(500, 600, State::DhwOnDuty);
        ctx.info.inputs.assign(InputFlag::Overheat, true);
        let mut il = Interlocks::new();
        assert_eq!(il.evaluate(&mut ctx, &mut Board), Some(ErrorCode::OverheatThermostat));

        ctx.config.overheat_override = true;
        assert_eq!(il.evaluate(&mut ctx, &mut Board), None);
    }

    #[test]
    fn ch_overheat_in_ch_duty_is_an_error() {
        let tol = BoilerConfig::default().ch_overheat_tolerance;
        let mut ctx = ctx_at(600 + tol + 2, 600, State::ChOnDuty(ChStep::BurnerOff));
        let mut il = Interlocks::new();
        assert_eq!(il.evaluate(&mut ctx, &mut Board), Some(ErrorCode::ChOverheat));
    }

    #[test]
    fn ch_overheat_in_dhw_duty_bleeds_with_pump() {
        let cfg = BoilerConfig::default();
        let mut ctx = ctx_at(600 + cfg.ch_overheat_tolerance + 2, 600, State::DhwOnDuty);
        let mut il = Interlocks::new();
        assert_eq!(il.evaluate(&mut ctx, &mut Board), None);
        assert!(ctx.info.ch_overheat);
        assert!(ctx.info.output(OutputFlag::Pump));

        // Between re-arm and tolerance: still bleeding.
        ctx.info.analog.ch_temp = 600 + cfg.ch_overheat_rearm + 2;
        il.evaluate(&mut ctx, &mut Board);
        assert!(ctx.info.ch_overheat);

        ctx.info.analog.ch_temp = 600;
        il.evaluate(&mut ctx, &mut Board);
        assert!(!ctx.info.ch_overheat);
        assert!(!ctx.info.output(OutputFlag::Pump));
    }

    #[test]
    fn bleed_release_keeps_pump_overrun() {
        let cfg = BoilerConfig::default();
        let mut ctx = ctx_at(600 + cfg.ch_overheat_tolerance + 2, 600, State::DhwOnDuty);
        let mut il = Interlocks::new();
        il.evaluate(&mut ctx, &mut Board);
        ctx.timers
            .set_timer(TimerId::PumpShutdown, 1000, TimerMode::RunOnceAndDelete)
            .unwrap();
        ctx.info.analog.ch_temp = 600;
        il.evaluate(&mut ctx, &mut Board);
        assert!(ctx.info.output(OutputFlag::Pump));
    }
}
