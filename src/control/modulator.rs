//! Heat modulator: duty-cycle burner modulation over three fuel valves.
//!
//! ```text
//!   one cycle (cycle_ms)
//!   ├──── duty[0] ────┼──── duty[1] ────┼── duty[2] ──┤
//!   │  valve 1 open   │  valve 2 open   │ valve 3 open│
//! ```
//!
//! Exactly one fuel valve is open while a cycle runs.  A 0 % entry gives a
//! zero-length slot that elapses as soon as it is armed, so that valve is
//! never opened.  The heat level only changes at a cycle boundary.
//!
//! The security valve and igniter belong to the FSM and are never touched
//! here.

use log::{debug, warn};

use crate::app::ports::HardwareIo;
use crate::error::TimerError;
use crate::fsm::context::SysInfo;
use crate::sensors::analog::ADC_FULL_SCALE;
use crate::timer::{Clock, Millis, TimerId, TimerMode, TimerService};

use super::heat_table::{HEAT_LEVELS, HeatLevel};

/// Fuel valves sequenced per cycle.
pub const VALVE_COUNT: usize = 3;

pub struct Modulator {
    table: &'static [HeatLevel],
}

impl Modulator {
    pub fn new() -> Self {
        Self::with_table(&HEAT_LEVELS)
    }

    /// Use a different heat table (bench tuning, tests).
    pub fn with_table(table: &'static [HeatLevel]) -> Self {
        Self { table }
    }

    pub fn levels(&self) -> usize {
        self.table.len()
    }

    /// Map the mode knob linearly onto the heat table.
    pub fn level_for_knob(&self, mode: u16) -> u8 {
        let mode = u32::from(mode.min(ADC_FULL_SCALE));
        (mode * self.table.len() as u32 / (u32::from(ADC_FULL_SCALE) + 1)) as u8
    }

    /// Row for `level`, if it exists and covers exactly 100 %.
    pub fn valid_row(&self, level: u8) -> Option<&'static HeatLevel> {
        let table: &'static [HeatLevel] = self.table;
        table.get(usize::from(level)).filter(|row| row.is_valid())
    }

    fn slot_ms(row: &HeatLevel, valve: usize, cycle_ms: Millis) -> Millis {
        (u64::from(row.duty[valve]) * u64::from(cycle_ms) / 100) as Millis
    }

    /// Advance modulation by one tick.
    ///
    /// `requested` becomes the active level when the current cycle ends.
    pub fn run<C: Clock>(
        &self,
        info: &mut SysInfo,
        timers: &mut TimerService<C>,
        hw: &mut (impl HardwareIo + ?Sized),
        requested: u8,
        cycle_ms: Millis,
    ) -> Result<(), TimerError> {
        if !info.cycle_in_progress {
            let Some(row) = self.valid_row(info.heat_level) else {
                warn!(
                    "modulator: heat level {} unusable, falling back to level 0",
                    info.heat_level
                );
                info.heat_level = 0;
                return Ok(());
            };
            info.cycle_in_progress = true;
            info.valve_index = 0;
            timers.set_timer(
                TimerId::HeatCycle,
                Self::slot_ms(row, 0, cycle_ms),
                TimerMode::RunOnceAndHold,
            )?;
        }

        let Some(row) = self.valid_row(info.heat_level) else {
            self.stop(info, timers);
            return Ok(());
        };

        while timers.is_finished(TimerId::HeatCycle) {
            info.valve_index += 1;
            let valve = usize::from(info.valve_index);
            if valve >= VALVE_COUNT {
                info.cycle_in_progress = false;
                timers.delete(TimerId::HeatCycle);
                if requested != info.heat_level {
                    debug!("modulator: level {} -> {}", info.heat_level, requested);
                }
                info.heat_level = requested;
                return Ok(());
            }
            timers.reset_lapse(TimerId::HeatCycle, Self::slot_ms(row, valve, cycle_ms))?;
        }

        let current = usize::from(info.valve_index);
        let valves = info.valves;
        for (i, valve) in valves.iter().enumerate() {
            if i != current {
                info.set_output(hw, *valve, false);
            }
        }
        info.set_output(hw, valves[current], true);
        Ok(())
    }

    /// Abandon the current cycle.  Valves are left to the caller.
    pub fn stop<C: Clock>(&self, info: &mut SysInfo, timers: &mut TimerService<C>) {
        info.cycle_in_progress = false;
        info.valve_index = 0;
        timers.delete(TimerId::HeatCycle);
    }
}

impl Default for Modulator {
    fn default() -> Self {
        Self::new()
    }
}
