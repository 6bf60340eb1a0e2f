//! Sensor layer: turns raw pin levels into stable logical input flags.
//!
//! Two policies:
//!
//! - **Direct** (DHW request, flame, overheat): the flag follows the pin
//!   every tick with polarity applied.  Safety inputs get zero added
//!   latency.
//! - **Debounced** (CH request, airflow): the flag follows the pin only
//!   after a full stability window, see [`debounce::Debouncer`].
//!
//! The layer writes only input bits.  It never touches outputs.

pub mod analog;
pub mod debounce;

use log::debug;

use crate::app::ports::HardwareIo;
use crate::config::BoilerConfig;
use crate::error::TimerError;
use crate::flags::{FlagSet, InputFlag};
use crate::pins;
use crate::timer::{Clock, TimerId, TimerService};
use debounce::Debouncer;

/// Order in which inputs are refreshed each tick.
pub const REFRESH_ORDER: [InputFlag; 5] = [
    InputFlag::DhwRequest,
    InputFlag::ChRequest,
    InputFlag::Airflow,
    InputFlag::Flame,
    InputFlag::Overheat,
];

pub struct SensorLayer {
    ch_request: Debouncer,
    airflow: Debouncer,
}

impl SensorLayer {
    pub fn new(config: &BoilerConfig) -> Self {
        Self {
            ch_request: Debouncer::new(TimerId::ChSwitchDebounce, config.ch_debounce_ms),
            airflow: Debouncer::new(TimerId::AirflowDebounce, config.airflow_debounce_ms),
        }
    }

    /// Refresh one input flag from hardware.  Returns the post-refresh
    /// stable value.
    pub fn refresh_sensor<C: Clock>(
        &mut self,
        flag: InputFlag,
        hw: &mut (impl HardwareIo + ?Sized),
        timers: &mut TimerService<C>,
        inputs: &mut FlagSet<InputFlag>,
    ) -> Result<bool, TimerError> {
        let level = hw.read_digital(flag) == pins::input_active_high(flag);
        let stable = inputs.contains(flag);
        let next = match flag {
            InputFlag::ChRequest => self.ch_request.update(level, stable, timers)?,
            InputFlag::Airflow => self.airflow.update(level, stable, timers)?,
            InputFlag::DhwRequest | InputFlag::Flame | InputFlag::Overheat => level,
        };
        if inputs.assign(flag, next) {
            debug!("input {:?} -> {}", flag, next);
        }
        Ok(next)
    }

    /// Refresh every input in [`REFRESH_ORDER`].
    pub fn refresh_all<C: Clock>(
        &mut self,
        hw: &mut (impl HardwareIo + ?Sized),
        timers: &mut TimerService<C>,
        inputs: &mut FlagSet<InputFlag>,
    ) -> Result<(), TimerError> {
        for flag in REFRESH_ORDER {
            self.refresh_sensor(flag, hw, timers, inputs)?;
        }
        Ok(())
    }
}
