//! System configuration parameters
//!
//! All tunable parameters for the boiler controller.  Times are in
//! milliseconds, temperatures and setpoints in raw (filtered) ADC counts.
//! Loading from EEPROM is done outside the core; the serde derives let any
//! loader decode a stored blob straight into this struct.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timer::Millis;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoilerConfig {
    // --- Debounce ---
    /// Stability window for the CH request contact.
    pub ch_debounce_ms: Millis,
    /// Stability window for the flue airflow switch.
    pub airflow_debounce_ms: Millis,
    /// How long flame must persist before it counts as out of sequence.
    pub flame_debounce_ms: Millis,

    // --- Fan self-test (OFF state) ---
    /// Airflow switch must close within this time after the fan starts.
    pub airflow_on_timeout_ms: Millis,
    /// Airflow switch must reopen within this time after the fan stops.
    pub airflow_off_timeout_ms: Millis,

    // --- READY ---
    /// Airflow readings are ignored for this long after entering READY.
    pub ready_grace_ms: Millis,

    // --- Ignition ---
    /// Relay / valve settling time between ignition sub-steps.
    pub valve_settle_ms: Millis,
    /// Spark duration before an attempt counts as failed.
    pub flame_timeout_ms: Millis,
    /// Attempts before giving up with an ignition failure (1-based).
    pub max_ignition_tries: u8,

    // --- Modulation ---
    /// Valve time-slicing period while serving hot water.
    pub dhw_cycle_ms: Millis,
    /// Valve time-slicing period while serving central heating.
    pub ch_cycle_ms: Millis,

    // --- Pump ---
    /// Pump run-on after central heating stops.
    pub pump_overrun_ms: Millis,

    // --- Error display ---
    /// LED on/off time of one blink pulse.
    pub error_blink_ms: Millis,
    /// Dark pause between repetitions of the code.
    pub error_pause_ms: Millis,
    /// How many times the code is shown before retrying from OFF.
    pub error_repeats: u8,

    // --- Analog plausibility ---
    /// Readings at or below this are a shorted / disconnected sensor.
    pub adc_min_valid: u16,
    /// Readings at or above this are a shorted / disconnected sensor.
    pub adc_max_valid: u16,

    // --- Central heating thermostat ---
    /// Burner relights once CH water falls this far below the setpoint.
    pub ch_hysteresis: u16,
    /// CH water this far above the setpoint is an overheat.
    pub ch_overheat_tolerance: u16,
    /// DHW-mode overheat bleed stops once CH water is back below
    /// setpoint + this margin.  Must be below `ch_overheat_tolerance`.
    pub ch_overheat_rearm: u16,

    // --- Maintenance ---
    /// Period of the telemetry snapshot event.
    pub telemetry_interval_ms: Millis,

    // --- Site overrides (never enabled by default) ---
    /// No flue pressure switch fitted: airflow is assumed whenever the fan runs.
    pub airflow_sensor_override: bool,
    /// Skip the fan self-test in OFF.
    pub fan_test_override: bool,
    /// Ignore the overheat limit thermostat input.
    pub overheat_override: bool,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            // Debounce
            ch_debounce_ms: 300,
            airflow_debounce_ms: 300,
            flame_debounce_ms: 200,

            // Fan self-test
            airflow_on_timeout_ms: 5_000,
            airflow_off_timeout_ms: 5_000,

            // READY
            ready_grace_ms: 2_000,

            // Ignition
            valve_settle_ms: 5,
            flame_timeout_ms: 3_000,
            max_ignition_tries: 3,

            // Modulation
            dhw_cycle_ms: 1_000,
            ch_cycle_ms: 3_000,

            // Pump
            pump_overrun_ms: 60_000,

            // Error display
            error_blink_ms: 250,
            error_pause_ms: 1_500,
            error_repeats: 3,

            // Analog plausibility (10-bit ADC)
            adc_min_valid: 8,
            adc_max_valid: 1_015,

            // CH thermostat
            ch_hysteresis: 24,
            ch_overheat_tolerance: 40,
            ch_overheat_rearm: 10,

            // Maintenance
            telemetry_interval_ms: 1_000,

            // Overrides
            airflow_sensor_override: false,
            fan_test_override: false,
            overheat_override: false,
        }
    }
}

impl BoilerConfig {
    /// Reject combinations the controller cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ignition_tries == 0 {
            return Err(ConfigError::ValidationFailed("max_ignition_tries must be >= 1"));
        }
        if self.flame_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("flame_timeout_ms must be > 0"));
        }
        if self.airflow_on_timeout_ms == 0 || self.airflow_off_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("fan-test timeouts must be > 0"));
        }
        if self.ch_debounce_ms == 0 || self.airflow_debounce_ms == 0 {
            return Err(ConfigError::ValidationFailed("debounce windows must be > 0"));
        }
        if self.dhw_cycle_ms == 0 || self.ch_cycle_ms == 0 {
            return Err(ConfigError::ValidationFailed("modulation cycles must be > 0"));
        }
        if self.adc_min_valid >= self.adc_max_valid {
            return Err(ConfigError::ValidationFailed("adc_min_valid must be below adc_max_valid"));
        }
        if self.ch_overheat_rearm >= self.ch_overheat_tolerance {
            return Err(ConfigError::ValidationFailed(
                "ch_overheat_rearm must be below ch_overheat_tolerance",
            ));
        }
        if self.error_repeats == 0 || self.error_blink_ms == 0 {
            return Err(ConfigError::ValidationFailed("error display must blink at least once"));
        }
        if self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("telemetry_interval_ms must be > 0"));
        }
        Ok(())
    }
}
