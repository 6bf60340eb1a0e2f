//! End-to-end scenarios: BoilerService → sensors → interlocks → FSM →
//! mock actuators, on simulated time.

use gasboiler::app::events::AppEvent;
use gasboiler::config::BoilerConfig;
use gasboiler::error::ErrorCode;
use gasboiler::flags::{InputFlag, OutputFlag};
use gasboiler::fsm::{ChStep, IgnitionStep, OffStep, State, StateId};
use gasboiler::timer::Clock;

use crate::mock_hw::{FlameModel, Rig};

fn burning_dhw() -> Rig {
    let mut rig = Rig::new();
    rig.to_ready();
    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::DhwOnDuty, 2_000), "burner did not light");
    rig
}

fn burning_ch() -> Rig {
    let mut rig = Rig::new();
    rig.to_ready();
    rig.hw.set_input(InputFlag::ChRequest, true);
    assert!(
        rig.run_until(2_000, |r| r.svc.full_state() == State::ChOnDuty(ChStep::BurnerOn)),
        "burner did not light for heating"
    );
    rig
}

// ── Normal operation ──────────────────────────────────────────

#[test]
fn hot_water_round_trip_leaves_everything_off() {
    let mut rig = Rig::new();
    rig.to_ready();

    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::Igniting, 100));
    assert!(rig.run_until_state(StateId::DhwOnDuty, 2_000));
    rig.run_for(500);
    assert!(rig.hw.gas_open());
    assert!(rig.svc.info().input(InputFlag::Flame));

    rig.hw.set_input(InputFlag::DhwRequest, false);
    assert!(rig.run_until_state(StateId::Ready, 100));

    assert_eq!(rig.svc.info().error_code(), 0);
    assert!(rig.svc.info().outputs.is_empty());
    assert_eq!(rig.hw.levels, [false; 8]);
    assert!(rig.log.contains(&AppEvent::StateChanged {
        from: StateId::DhwOnDuty,
        to: StateId::Ready,
    }));
}

#[test]
fn fan_test_override_skips_the_fan() {
    let config = BoilerConfig {
        fan_test_override: true,
        ..BoilerConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.hw.airflow_follows_fan = false;
    rig.to_ready();
    assert!(!rig.hw.was_energised(OutputFlag::Fan));
}

#[test]
fn level_zero_holds_first_valve_for_whole_cycle() {
    let mut rig = burning_dhw();
    assert_eq!(rig.svc.info().heat_level, 0);
    rig.hw.writes.clear();

    let cycle = rig.svc.config().dhw_cycle_ms;
    for _ in 0..(cycle / crate::mock_hw::TICK_MS) {
        rig.tick();
        assert!(rig.hw.is_on(OutputFlag::Valve1));
        assert!(!rig.hw.is_on(OutputFlag::Valve2));
        assert!(!rig.hw.is_on(OutputFlag::Valve3));
    }
    assert!(!rig.hw.was_energised(OutputFlag::Valve2));
    assert!(!rig.hw.was_energised(OutputFlag::Valve3));
}

#[test]
fn mode_knob_selects_heat_level_at_cycle_boundary() {
    let mut rig = burning_dhw();
    rig.hw.analog.mode = 1023;
    let cycle = rig.svc.config().dhw_cycle_ms;
    rig.run_for(2 * cycle + 100);
    assert_eq!(rig.svc.info().heat_level, 7);
    // Level 7 runs entirely on valve 3.
    assert!(rig.hw.is_on(OutputFlag::Valve3));
    assert_eq!(rig.hw.open_fuel_valves(), 1);
}

#[test]
fn ch_setpoint_reached_closes_gas_within_one_tick() {
    let mut rig = burning_ch();
    rig.run_for(200);
    assert!(rig.hw.gas_open());

    rig.hw.analog.ch_temp = rig.hw.analog.ch_set;
    rig.tick();

    assert_eq!(rig.svc.full_state(), State::ChOnDuty(ChStep::BurnerOff));
    assert!(!rig.hw.gas_open());
    assert!(rig.hw.is_on(OutputFlag::Pump));

    // Inside the hysteresis band nothing happens.
    rig.hw.analog.ch_temp = rig.hw.analog.ch_set - 10;
    rig.run_for(500);
    assert_eq!(rig.svc.full_state(), State::ChOnDuty(ChStep::BurnerOff));

    // Below it the burner relights.
    rig.hw.analog.ch_temp = rig.hw.analog.ch_set - 40;
    rig.tick();
    assert_eq!(rig.svc.state(), StateId::Igniting);
}

#[test]
fn dhw_hands_back_to_ch_without_relighting() {
    let mut rig = burning_ch();
    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::DhwOnDuty, 2_000));
    // The CH pump overrun is parked while hot water runs.
    assert!(!rig.hw.is_on(OutputFlag::Pump));

    rig.hw.set_input(InputFlag::DhwRequest, false);
    rig.tick();
    assert_eq!(rig.svc.full_state(), State::ChOnDuty(ChStep::BurnerOn));
    assert!(rig.log.contains(&AppEvent::StateChanged {
        from: StateId::DhwOnDuty,
        to: StateId::ChOnDuty,
    }));
    rig.run_for(200);
    assert!(rig.svc.info().input(InputFlag::Flame));
    assert!(rig.hw.gas_open());
    assert!(rig.hw.is_on(OutputFlag::Pump));
}

#[test]
fn pump_runs_on_after_heating_ends() {
    let mut rig = burning_ch();
    rig.hw.set_input(InputFlag::ChRequest, false);
    assert!(rig.run_until_state(StateId::Ready, 1_000));
    assert!(rig.hw.is_on(OutputFlag::Pump));
    assert!(!rig.hw.gas_open());

    let overrun = rig.svc.config().pump_overrun_ms;
    rig.run_for(overrun - 1_000);
    assert!(rig.hw.is_on(OutputFlag::Pump));
    assert!(rig.run_until(2_000, |r| !r.hw.is_on(OutputFlag::Pump)));
}

#[test]
fn dhw_flame_loss_reruns_ignition_on_primary_valve() {
    let mut rig = burning_dhw();
    rig.hw.flame_forced = Some(false);
    rig.tick();

    assert_eq!(rig.svc.full_state(), State::Igniting(IgnitionStep::FanOn));
    assert!(!rig.hw.gas_open());
    assert_eq!(rig.svc.info().ignition_tries, 1);

    rig.hw.flame_forced = None;
    rig.hw.writes.clear();
    assert!(rig.run_until_state(StateId::DhwOnDuty, 2_000));
    assert!(rig.hw.was_energised(OutputFlag::Valve1));
    assert!(!rig.hw.was_energised(OutputFlag::Valve2));
    assert_eq!(rig.svc.info().error_code(), 0);
}

#[test]
fn retry_that_lights_resets_ignition_tries() {
    let mut rig = Rig::new();
    rig.hw.flame_model = FlameModel::Never;
    rig.to_ready();
    rig.hw.set_input(InputFlag::DhwRequest, true);

    assert!(rig.run_until(5_000, |r| r.svc.info().ignition_tries == 2));
    rig.hw.flame_model = FlameModel::Lights;
    assert!(rig.run_until_state(StateId::DhwOnDuty, 5_000));

    assert_eq!(rig.svc.info().ignition_tries, 1);
    // The second attempt runs on the secondary valve.
    assert!(rig.hw.was_energised(OutputFlag::Valve2));
}

#[test]
fn ignition_abandoned_when_demand_withdrawn() {
    let mut rig = Rig::new();
    rig.hw.flame_model = FlameModel::Never;
    rig.to_ready();
    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::Igniting, 100));
    rig.run_for(200);

    rig.hw.set_input(InputFlag::DhwRequest, false);
    rig.tick();

    assert_eq!(rig.svc.state(), StateId::Ready);
    assert!(!rig.hw.gas_open());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
    assert_eq!(rig.svc.info().error_code(), 0);
}

#[test]
fn parked_pump_overrun_resumes_when_dhw_light_off_is_abandoned() {
    let mut rig = burning_ch();
    rig.hw.flame_model = FlameModel::Never;
    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::Igniting, 100));
    assert!(!rig.hw.is_on(OutputFlag::Pump));
    assert!(rig.svc.info().pump_memory > 0);

    rig.hw.set_input(InputFlag::DhwRequest, false);
    rig.hw.set_input(InputFlag::ChRequest, false);
    assert!(rig.run_until_state(StateId::Ready, 1_000));

    assert!(rig.hw.is_on(OutputFlag::Pump));
    assert_eq!(rig.svc.info().pump_memory, 0);
    let overrun = rig.svc.config().pump_overrun_ms;
    assert!(rig.run_until(overrun + 1_000, |r| !r.hw.is_on(OutputFlag::Pump)));
}

#[test]
fn parked_pump_overrun_resumes_when_dhw_light_off_fails() {
    let mut rig = burning_ch();
    rig.hw.flame_model = FlameModel::Never;
    rig.hw.set_input(InputFlag::DhwRequest, true);
    assert!(rig.run_until_state(StateId::Igniting, 100));
    assert!(!rig.hw.is_on(OutputFlag::Pump));

    assert!(rig.run_until_state(StateId::Error, 15_000));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::IgnitionFailure.code());
    assert!(rig.hw.is_on(OutputFlag::Pump));
    assert_eq!(rig.svc.info().pump_memory, 0);
    assert!(!rig.hw.gas_open());
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn airflow_lost_on_duty_is_airflow_out_of_sequence() {
    let mut rig = burning_dhw();
    rig.hw.airflow_follows_fan = false;
    rig.hw.set_input(InputFlag::Airflow, false);

    assert!(rig.run_until_state(StateId::Error, 1_000));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::AirflowOutOfSequence.code());
    assert!(!rig.hw.gas_open());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
}

#[test]
fn airflow_while_ready_trips_after_grace() {
    let mut rig = Rig::new();
    rig.to_ready();
    rig.hw.airflow_follows_fan = false;
    rig.hw.set_input(InputFlag::Airflow, true);

    let grace = rig.svc.config().ready_grace_ms;
    rig.run_for(grace / 2);
    assert_eq!(rig.svc.state(), StateId::Ready);

    assert!(rig.run_until_state(StateId::Error, grace));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::AirflowOutOfSequence.code());
}

#[test]
fn flame_while_ready_trips_after_grace() {
    let mut rig = Rig::new();
    rig.to_ready();
    rig.hw.flame_forced = Some(true);

    let grace = rig.svc.config().ready_grace_ms;
    rig.run_for(grace / 2);
    assert_eq!(rig.svc.state(), StateId::Ready);

    assert!(rig.run_until_state(StateId::Error, grace));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::FlameOutOfSequence.code());
    assert!(!rig.hw.gas_open());
}

#[test]
fn airflow_switch_that_never_opens_fails_the_fan_test() {
    let mut rig = Rig::new();
    assert!(rig.run_until(
        2_000,
        |r| r.svc.full_state() == State::Off(OffStep::WaitAirflowOpen)
    ));
    rig.hw.airflow_follows_fan = false;
    rig.hw.set_input(InputFlag::Airflow, true);

    let timeout = rig.svc.config().airflow_off_timeout_ms;
    assert!(rig.run_until_state(StateId::Error, timeout + 500));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::AirflowNotReleased.code());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
}

#[test]
fn ch_overheat_on_duty_trips() {
    let mut rig = burning_ch();
    let cfg = rig.svc.config().clone();
    rig.hw.analog.ch_temp = rig.hw.analog.ch_set + cfg.ch_overheat_tolerance + 10;
    rig.tick();

    assert_eq!(rig.svc.state(), StateId::Error);
    assert_eq!(rig.svc.info().error_code(), ErrorCode::ChOverheat.code());
    assert!(rig.svc.interlock_faults() & ErrorCode::ChOverheat.mask() != 0);
    assert!(!rig.hw.gas_open());
    assert!(rig.log.contains(&AppEvent::FaultRaised(ErrorCode::ChOverheat)));
}

#[test]
fn ch_overheat_during_dhw_bleeds_through_the_pump() {
    let mut rig = burning_dhw();
    let cfg = rig.svc.config().clone();
    assert!(!rig.hw.is_on(OutputFlag::Pump));

    rig.hw.analog.ch_temp = rig.hw.analog.ch_set + cfg.ch_overheat_tolerance + 10;
    rig.tick();
    assert_eq!(rig.svc.state(), StateId::DhwOnDuty);
    assert!(rig.svc.info().ch_overheat);
    assert!(rig.hw.is_on(OutputFlag::Pump));
    assert_eq!(rig.svc.interlock_faults(), 0);
    assert!(rig.hw.gas_open());

    rig.hw.analog.ch_temp = rig.hw.analog.ch_set;
    rig.tick();
    assert!(!rig.svc.info().ch_overheat);
    assert!(!rig.hw.is_on(OutputFlag::Pump));
    assert_eq!(rig.svc.state(), StateId::DhwOnDuty);
}

#[test]
fn flame_while_off_is_flame_out_of_sequence() {
    let mut rig = Rig::new();
    rig.hw.flame_forced = Some(true);
    let window = rig.svc.config().flame_debounce_ms;

    assert!(rig.run_until_state(StateId::Error, 2 * window));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::FlameOutOfSequence.code());
    assert!(!rig.hw.gas_open());
    assert!(rig.log.contains(&AppEvent::FaultRaised(ErrorCode::FlameOutOfSequence)));
}

#[test]
fn three_failed_ignitions_raise_ignition_failure() {
    let mut rig = Rig::new();
    rig.hw.flame_model = FlameModel::Never;
    rig.to_ready();
    rig.hw.set_input(InputFlag::DhwRequest, true);

    let mut last_try = 0;
    let mut ticks = 0;
    while rig.svc.state() != StateId::Error {
        rig.tick();
        ticks += 1;
        assert!(ticks < 1_500, "ignition never gave up");
        if rig.svc.state() == StateId::Igniting {
            let tries = rig.svc.info().ignition_tries;
            assert!(tries >= last_try, "tries went {last_try} -> {tries}");
            last_try = tries;
        }
    }
    assert_eq!(last_try, rig.svc.config().max_ignition_tries);

    assert_eq!(rig.svc.info().error_code(), ErrorCode::IgnitionFailure.code());
    assert!(!rig.hw.gas_open());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
    // Attempts alternate between the first two valves.
    assert!(rig.hw.was_energised(OutputFlag::Valve1));
    assert!(rig.hw.was_energised(OutputFlag::Valve2));
}

#[test]
fn airflow_switch_that_never_closes_fails_the_fan_test() {
    let mut rig = Rig::new();
    rig.hw.airflow_follows_fan = false;
    assert!(rig.run_until_state(StateId::Error, 7_000));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::AirflowNotAsserted.code());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
}

#[test]
fn thermistor_at_rail_trips_from_ready() {
    let mut rig = Rig::new();
    rig.to_ready();
    rig.hw.analog.dhw_temp = 0;
    rig.tick();
    assert_eq!(rig.svc.state(), StateId::Error);
    assert_eq!(rig.svc.info().error_code(), ErrorCode::DhwSensorRange.code());
    assert!(rig.log.contains(&AppEvent::FaultRaised(ErrorCode::DhwSensorRange)));
}

#[test]
fn overheat_thermostat_closes_gas_while_burning() {
    let mut rig = burning_dhw();
    rig.run_for(100);
    assert!(rig.hw.gas_open());

    rig.hw.set_input(InputFlag::Overheat, true);
    rig.tick();
    assert_eq!(rig.svc.state(), StateId::Error);
    assert_eq!(rig.svc.info().error_code(), ErrorCode::OverheatThermostat.code());
    assert!(!rig.hw.gas_open());
    assert!(!rig.hw.is_on(OutputFlag::Fan));
}

#[test]
fn error_display_ends_and_controller_retries() {
    let mut rig = Rig::new();
    rig.hw.flame_forced = Some(true);
    assert!(rig.run_until_state(StateId::Error, 1_000));
    rig.hw.flame_forced = None;

    let cfg = rig.svc.config().clone();
    let per_repeat = 2 * cfg.error_blink_ms * u32::from(ErrorCode::FlameOutOfSequence.code())
        + cfg.error_pause_ms;
    assert!(rig.run_until_state(StateId::Off, per_repeat * u32::from(cfg.error_repeats) + 500));

    assert_eq!(rig.svc.info().error_code(), 0);
    assert!(rig.log.contains(&AppEvent::FaultCleared));
    assert!(!rig.hw.is_on(OutputFlag::StatusLed));
    rig.to_ready();
}

#[test]
fn timer_exhaustion_halts_for_good() {
    // Room for the step delay and telemetry only: the airflow debounce
    // cannot get a slot once the fan test starts.
    let mut rig = Rig::with_timer_capacity(2);
    assert!(rig.run_until(1_000, |r| r.svc.is_halted()));
    assert_eq!(rig.svc.info().error_code(), ErrorCode::TimerExhausted.code());
    assert!(rig.log.contains(&AppEvent::Halted(ErrorCode::TimerExhausted)));

    rig.run_for(10_000);
    assert!(rig.svc.is_halted());
    assert!(!rig.hw.gas_open());
    assert!(rig.hw.is_on(OutputFlag::StatusLed));
}

#[test]
fn telemetry_snapshots_track_state() {
    let mut rig = burning_dhw();
    rig.log.events.clear();
    rig.run_for(rig.svc.config().telemetry_interval_ms);

    let snap = rig
        .log
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::Telemetry(s) => Some(*s),
            _ => None,
        })
        .expect("no telemetry frame");
    assert_eq!(snap.state, StateId::DhwOnDuty);
    assert_eq!(snap.error_code, 0);
    assert_eq!(snap.analog, rig.hw.analog);
    assert_eq!(
        rig.svc.tick_count(),
        u64::from(rig.clock.now() / crate::mock_hw::TICK_MS)
    );
}
