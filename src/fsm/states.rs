//! Concrete state handlers and the lifecycle table.
//!
//! ```text
//!  OFF ──[fan test ok]──▶ READY ──[DHW|CH demand]──▶ IGNITING
//!   ▲                       ▲                          │ flame
//!   │                       │ demand ends              ▼
//!   │                       ├──────────────── DHW_ON_DUTY ◀──┐
//!   │                       │                    │ DHW ends,  │ DHW demand
//!   │                       │                    ▼ CH wanted  │ (via IGNITING)
//!   │                       └──────────────── CH_ON_DUTY ─────┘
//!   │                                          BURNER_ON ⇄ BURNER_OFF
//!   │
//!   └──[code shown N times]── ERROR ◀──[any fault]── any state
//! ```
//!
//! Every fault goes through [`FsmContext::raise`]: gas off, code
//! recorded, ERROR returned.  Only ERROR clears the code.

use log::{info, warn};

use super::context::FsmContext;
use super::{ChStep, ErrorStep, IgnitionStep, OffStep, State, StateDescriptor, StateId};
use crate::app::ports::HardwareIo;
use crate::error::{ErrorCode, TimerError};
use crate::flags::{InputFlag, OutputFlag};
use crate::timer::{Clock, TimerId};

type Step = Result<Option<State>, TimerError>;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table<C: Clock>() -> [StateDescriptor<C>; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Off,
            on_enter: Some(off_enter),
            on_exit: None,
        },
        StateDescriptor {
            id: StateId::Ready,
            on_enter: Some(ready_enter),
            on_exit: None,
        },
        StateDescriptor {
            id: StateId::Igniting,
            on_enter: Some(igniting_enter),
            on_exit: None,
        },
        StateDescriptor {
            id: StateId::DhwOnDuty,
            on_enter: Some(dhw_enter),
            on_exit: Some(dhw_exit),
        },
        StateDescriptor {
            id: StateId::ChOnDuty,
            on_enter: Some(ch_enter),
            on_exit: Some(ch_exit),
        },
        StateDescriptor {
            id: StateId::Error,
            on_enter: Some(error_enter),
            on_exit: Some(error_exit),
        },
    ]
}

/// Per-tick dispatch on the current state and inner step.
pub fn update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Step {
    match ctx.info.state {
        State::Off(step) => off_update(ctx, hw, step),
        State::Ready => ready_update(ctx, hw),
        State::Igniting(step) => igniting_update(ctx, hw, step),
        State::DhwOnDuty => dhw_update(ctx, hw),
        State::ChOnDuty(step) => ch_update(ctx, hw, step),
        State::Error(step) => error_update(ctx, hw, step),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF: park state and flue-fan self test
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.all_gas_off(hw);
    if !ctx.info.ch_overheat && !ctx.timers.exists(TimerId::PumpShutdown) {
        ctx.info.set_output(hw, OutputFlag::Pump, false);
    }
    ctx.info.pump_memory = 0;
    ctx.info.ignition_tries = 0;
    ctx.info.saved_ch_step = ChStep::BurnerOn;
    // Give the airflow switch one debounce window to settle open.
    ctx.arm_step(ctx.config.airflow_debounce_ms)?;
    info!("OFF: gas closed, flue check pending");
    Ok(())
}

fn off_update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo, step: OffStep) -> Step {
    if ctx.flame_out_of_sequence()? {
        return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
    }

    match step {
        OffStep::AllOff => {
            if ctx.airflow_unexpected() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if !ctx.step_done() {
                return Ok(None);
            }
            if ctx.config.fan_test_override || ctx.config.airflow_sensor_override {
                info!("OFF: fan test skipped by override");
                return Ok(Some(State::Off(OffStep::Handoff)));
            }
            ctx.info.set_output(hw, OutputFlag::Fan, true);
            ctx.arm_step(ctx.config.airflow_on_timeout_ms)?;
            Ok(Some(State::Off(OffStep::WaitAirflowClose)))
        }
        OffStep::WaitAirflowClose => {
            if ctx.info.input(InputFlag::Airflow) {
                ctx.info.set_output(hw, OutputFlag::Fan, false);
                ctx.arm_step(ctx.config.airflow_off_timeout_ms)?;
                Ok(Some(State::Off(OffStep::WaitAirflowOpen)))
            } else if ctx.step_done() {
                Ok(ctx.raise(hw, ErrorCode::AirflowNotAsserted))
            } else {
                Ok(None)
            }
        }
        OffStep::WaitAirflowOpen => {
            if !ctx.info.input(InputFlag::Airflow) {
                Ok(Some(State::Off(OffStep::Handoff)))
            } else if ctx.step_done() {
                Ok(ctx.raise(hw, ErrorCode::AirflowNotReleased))
            } else {
                Ok(None)
            }
        }
        OffStep::Handoff => {
            if ctx.airflow_unexpected() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            Ok(Some(State::Ready))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  READY: gas closed, waiting for demand
// ═══════════════════════════════════════════════════════════════════════════

fn ready_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.all_gas_off(hw);
    ctx.info.ignition_tries = 0;
    // A DHW light-off that never reached DHW duty hands the CH loop its
    // pump back.
    ctx.resume_pump_overrun(hw)?;
    ctx.arm_step(ctx.config.ready_grace_ms)?;
    info!("READY: waiting for DHW or CH demand");
    Ok(())
}

fn ready_update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Step {
    // Sensors get a grace window to settle after the burner went out.
    if ctx.step_done() {
        if ctx.airflow_unexpected() {
            return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
        }
        if ctx.flame_out_of_sequence()? {
            return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
        }
    }

    if ctx.dhw_requested() || ctx.ch_requested() {
        info!(
            "READY: demand (dhw={}, ch={})",
            ctx.dhw_requested(),
            ctx.ch_requested()
        );
        return Ok(Some(State::Igniting(IgnitionStep::FanOn)));
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IGNITING: six-step light-off with retries
// ═══════════════════════════════════════════════════════════════════════════

fn igniting_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.all_gas_off(hw);
    ctx.info.ignition_tries = 1;
    if ctx.dhw_requested() {
        ctx.park_pump_overrun(hw);
    }
    info!(
        "IGNITING: attempt 1 of {}",
        ctx.config.max_ignition_tries
    );
    Ok(())
}

fn igniting_update<C: Clock>(
    ctx: &mut FsmContext<C>,
    hw: &mut dyn HardwareIo,
    step: IgnitionStep,
) -> Step {
    if !ctx.dhw_requested() && !ctx.ch_requested() {
        info!("IGNITING: demand withdrawn, aborting");
        ctx.all_gas_off(hw);
        return Ok(Some(State::Ready));
    }

    let settle = ctx.config.valve_settle_ms;

    match step {
        IgnitionStep::FanOn => {
            if ctx.flame_out_of_sequence()? {
                return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
            }
            ctx.info.set_output(hw, OutputFlag::Fan, true);
            ctx.arm_step(ctx.config.airflow_on_timeout_ms)?;
            Ok(Some(State::Igniting(IgnitionStep::WaitAirflow)))
        }
        IgnitionStep::WaitAirflow => {
            if ctx.flame_out_of_sequence()? {
                return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
            }
            if ctx.airflow_ok() {
                ctx.arm_step(settle)?;
                Ok(Some(State::Igniting(IgnitionStep::SecurityValve)))
            } else if ctx.step_done() {
                Ok(ctx.raise(hw, ErrorCode::AirflowNotAsserted))
            } else {
                Ok(None)
            }
        }
        IgnitionStep::SecurityValve => {
            if ctx.flame_out_of_sequence()? {
                return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
            }
            if !ctx.airflow_ok() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if !ctx.step_done() {
                return Ok(None);
            }
            ctx.info.set_output(hw, OutputFlag::SecurityValve, true);
            ctx.arm_step(settle)?;
            Ok(Some(State::Igniting(IgnitionStep::FuelValve)))
        }
        IgnitionStep::FuelValve => {
            if !ctx.airflow_ok() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if !ctx.step_done() {
                return Ok(None);
            }
            // Odd attempts use the primary valve, even ones the secondary,
            // so a single stuck valve cannot fail every attempt.
            let pick = usize::from(ctx.info.ignition_tries.saturating_sub(1) % 2);
            let valves = ctx.info.valves;
            for (i, valve) in valves.iter().enumerate() {
                ctx.info.set_output(hw, *valve, i == pick);
            }
            ctx.arm_step(settle)?;
            Ok(Some(State::Igniting(IgnitionStep::Spark)))
        }
        IgnitionStep::Spark => {
            if !ctx.airflow_ok() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if !ctx.step_done() {
                return Ok(None);
            }
            ctx.info.set_output(hw, OutputFlag::Igniter, true);
            ctx.arm_step(ctx.config.flame_timeout_ms)?;
            Ok(Some(State::Igniting(IgnitionStep::WaitFlame)))
        }
        IgnitionStep::WaitFlame => {
            if !ctx.airflow_ok() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if ctx.info.input(InputFlag::Flame) {
                ctx.info.set_output(hw, OutputFlag::Igniter, false);
                info!("IGNITING: flame proven on attempt {}", ctx.info.ignition_tries);
                ctx.info.ignition_tries = 1;
                return Ok(Some(if ctx.dhw_requested() {
                    State::DhwOnDuty
                } else {
                    State::ChOnDuty(ChStep::BurnerOn)
                }));
            }
            if !ctx.step_done() {
                return Ok(None);
            }

            ctx.info.set_output(hw, OutputFlag::Igniter, false);
            let valves = ctx.info.valves;
            for valve in valves {
                ctx.info.set_output(hw, valve, false);
            }
            if ctx.info.ignition_tries >= ctx.config.max_ignition_tries {
                return Ok(ctx.raise(hw, ErrorCode::IgnitionFailure));
            }
            ctx.info.ignition_tries += 1;
            warn!(
                "IGNITING: no flame, retry {} of {}",
                ctx.info.ignition_tries, ctx.config.max_ignition_tries
            );
            ctx.arm_step(settle)?;
            Ok(Some(State::Igniting(IgnitionStep::FuelValve)))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DHW_ON_DUTY: burner lit for domestic hot water
// ═══════════════════════════════════════════════════════════════════════════

fn dhw_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.modulator.stop(&mut ctx.info, &mut ctx.timers);
    ctx.info.set_output(hw, OutputFlag::StatusLed, true);
    info!("DHW_ON_DUTY: burner lit at level {}", ctx.info.heat_level);
    Ok(())
}

fn dhw_exit<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.resume_pump_overrun(hw)
}

fn dhw_update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Step {
    if !ctx.info.input(InputFlag::Flame) {
        // Never relight silently: the full sequence runs again, primary
        // valve first.
        warn!("DHW_ON_DUTY: flame lost, re-igniting");
        ctx.all_gas_off(hw);
        return Ok(Some(State::Igniting(IgnitionStep::FanOn)));
    }
    if !ctx.airflow_ok() {
        return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
    }

    if ctx.dhw_requested() {
        let requested = ctx.modulator.level_for_knob(ctx.info.analog.mode);
        let cycle = ctx.config.dhw_cycle_ms;
        ctx.modulator
            .run(&mut ctx.info, &mut ctx.timers, hw, requested, cycle)?;
        return Ok(None);
    }

    if ctx.ch_requested() {
        let step = ctx.info.saved_ch_step;
        info!("DHW_ON_DUTY: hot water done, back to CH at {}", step.name());
        return Ok(Some(State::ChOnDuty(step)));
    }

    info!("DHW_ON_DUTY: hot water done");
    ctx.all_gas_off(hw);
    Ok(Some(State::Ready))
}

// ═══════════════════════════════════════════════════════════════════════════
//  CH_ON_DUTY: central heating with a hysteresis band
// ═══════════════════════════════════════════════════════════════════════════

fn ch_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.timers.delete(TimerId::PumpShutdown);
    ctx.info.pump_memory = 0;
    ctx.info.set_output(hw, OutputFlag::Pump, true);
    ctx.modulator.stop(&mut ctx.info, &mut ctx.timers);
    match ctx.info.state {
        State::ChOnDuty(ChStep::BurnerOff) => ctx.all_gas_off(hw),
        _ => ctx.info.set_output(hw, OutputFlag::StatusLed, true),
    }
    info!("CH_ON_DUTY: pump on, {}", ctx.info.state.step_name());
    Ok(())
}

fn ch_exit<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.start_pump_overrun(hw, ctx.config.pump_overrun_ms)?;
    info!("CH_ON_DUTY: pump overrun {}ms", ctx.config.pump_overrun_ms);
    Ok(())
}

fn ch_update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo, step: ChStep) -> Step {
    if ctx.dhw_requested() {
        ctx.info.saved_ch_step = step;
        info!("CH_ON_DUTY: DHW demand pre-empts heating");
        return Ok(Some(State::Igniting(IgnitionStep::FanOn)));
    }
    if !ctx.ch_requested() {
        info!("CH_ON_DUTY: heating demand ended");
        ctx.all_gas_off(hw);
        ctx.info.saved_ch_step = ChStep::BurnerOn;
        return Ok(Some(State::Ready));
    }

    // LSB masked so ADC noise cannot toggle the burner at the threshold.
    let water = ctx.info.analog.ch_temp & !1;
    let high = ctx.info.analog.ch_set & !1;

    match step {
        ChStep::BurnerOn => {
            if !ctx.info.input(InputFlag::Flame) {
                warn!("CH_ON_DUTY: flame lost, re-igniting");
                ctx.all_gas_off(hw);
                ctx.info.saved_ch_step = ChStep::BurnerOn;
                return Ok(Some(State::Igniting(IgnitionStep::FanOn)));
            }
            if !ctx.airflow_ok() {
                return Ok(ctx.raise(hw, ErrorCode::AirflowOutOfSequence));
            }
            if water >= high {
                ctx.all_gas_off(hw);
                info!("CH_ON_DUTY: setpoint reached ({} >= {}), burner off", water, high);
                return Ok(Some(State::ChOnDuty(ChStep::BurnerOff)));
            }
            let requested = ctx.modulator.level_for_knob(ctx.info.analog.mode);
            let cycle = ctx.config.ch_cycle_ms;
            ctx.modulator
                .run(&mut ctx.info, &mut ctx.timers, hw, requested, cycle)?;
            Ok(None)
        }
        ChStep::BurnerOff => {
            if ctx.flame_out_of_sequence()? {
                return Ok(ctx.raise(hw, ErrorCode::FlameOutOfSequence));
            }
            let low = high.saturating_sub(ctx.config.ch_hysteresis);
            if water < low {
                info!("CH_ON_DUTY: water cooled ({} < {}), relighting", water, low);
                ctx.info.saved_ch_step = ChStep::BurnerOn;
                return Ok(Some(State::Igniting(IgnitionStep::FanOn)));
            }
            Ok(None)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR: gas off, code blinked, then retry from OFF
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    // Unconditional, whatever raised the fault.
    ctx.all_gas_off(hw);
    ctx.info.set_output(hw, OutputFlag::StatusLed, true);
    ctx.resume_pump_overrun(hw)?;

    if ctx.info.error.is_some_and(ErrorCode::halts) {
        warn!("ERROR: code {} is unrecoverable, halting", ctx.info.error_code());
        ctx.info.state = State::Error(ErrorStep::Halted);
        return Ok(());
    }

    warn!(
        "ERROR: code {} shown {} times before retry",
        ctx.info.error_code(),
        ctx.config.error_repeats
    );
    ctx.info.state = State::Error(ErrorStep::START);
    ctx.arm_step(ctx.config.error_blink_ms)
}

fn error_exit<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo) -> Result<(), TimerError> {
    ctx.info.set_output(hw, OutputFlag::StatusLed, false);
    Ok(())
}

fn error_update<C: Clock>(ctx: &mut FsmContext<C>, hw: &mut dyn HardwareIo, step: ErrorStep) -> Step {
    let pulses = ctx.info.error_code();
    let blink = ctx.config.error_blink_ms;

    match step {
        ErrorStep::Halted => Ok(None),
        ErrorStep::Blink { repeat, pulse, lit } => {
            if !ctx.step_done() {
                return Ok(None);
            }
            if lit {
                ctx.info.set_output(hw, OutputFlag::StatusLed, false);
                ctx.arm_step(blink)?;
                Ok(Some(State::Error(ErrorStep::Blink {
                    repeat,
                    pulse,
                    lit: false,
                })))
            } else if pulse < pulses {
                ctx.info.set_output(hw, OutputFlag::StatusLed, true);
                ctx.arm_step(blink)?;
                Ok(Some(State::Error(ErrorStep::Blink {
                    repeat,
                    pulse: pulse + 1,
                    lit: true,
                })))
            } else {
                ctx.arm_step(ctx.config.error_pause_ms)?;
                Ok(Some(State::Error(ErrorStep::Pause { repeat })))
            }
        }
        ErrorStep::Pause { repeat } => {
            if !ctx.step_done() {
                return Ok(None);
            }
            if repeat < ctx.config.error_repeats {
                ctx.info.set_output(hw, OutputFlag::StatusLed, true);
                ctx.arm_step(blink)?;
                return Ok(Some(State::Error(ErrorStep::Blink {
                    repeat: repeat + 1,
                    pulse: 1,
                    lit: true,
                })));
            }
            info!("ERROR: code {} cleared, restarting from OFF", pulses);
            ctx.info.error = None;
            Ok(Some(State::BOOT))
        }
    }
}
