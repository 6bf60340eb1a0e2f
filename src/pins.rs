//! GPIO / ADC assignments for the boiler control board.
//!
//! Single source of truth: adapters reference this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::flags::{InputFlag, OutputFlag};
use crate::sensors::analog::AnalogInput;

// ---------------------------------------------------------------------------
// Digital inputs
// ---------------------------------------------------------------------------

/// DHW flow switch.  Pulled up; LOW = hot water tap open.
pub const DHW_REQUEST_GPIO: i32 = 4;
/// Room thermostat contact.  Pulled up; LOW = heating demanded.
pub const CH_REQUEST_GPIO: i32 = 5;
/// Flue pressure switch.  Pulled up; LOW = airflow proven.
pub const AIRFLOW_GPIO: i32 = 6;
/// Flame rectification amplifier.  HIGH = flame present.
pub const FLAME_GPIO: i32 = 7;
/// Overheat limit thermostat.  Normally closed to GND; HIGH = tripped.
pub const OVERHEAT_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Digital outputs (all active HIGH, relay / MOSFET drivers)
// ---------------------------------------------------------------------------

pub const FAN_GPIO: i32 = 16;
pub const PUMP_GPIO: i32 = 17;
pub const IGNITER_GPIO: i32 = 18;
pub const SECURITY_VALVE_GPIO: i32 = 8;
pub const VALVE1_GPIO: i32 = 9;
pub const VALVE2_GPIO: i32 = 10;
pub const VALVE3_GPIO: i32 = 11;
pub const STATUS_LED_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Analog inputs (ADC1 channels)
// ---------------------------------------------------------------------------

pub const ADC1_CH_DHW_TEMP: u32 = 0;
pub const ADC1_CH_CH_TEMP: u32 = 1;
pub const ADC1_CH_DHW_SET: u32 = 2;
pub const ADC1_CH_CH_SET: u32 = 3;
pub const ADC1_CH_MODE: u32 = 5;

/// GPIO number of a logical input.
pub const fn input_gpio(input: InputFlag) -> i32 {
    match input {
        InputFlag::DhwRequest => DHW_REQUEST_GPIO,
        InputFlag::ChRequest => CH_REQUEST_GPIO,
        InputFlag::Airflow => AIRFLOW_GPIO,
        InputFlag::Flame => FLAME_GPIO,
        InputFlag::Overheat => OVERHEAT_GPIO,
    }
}

/// Electrical level at which a logical input counts as active.
pub const fn input_active_high(input: InputFlag) -> bool {
    match input {
        InputFlag::DhwRequest | InputFlag::ChRequest | InputFlag::Airflow => false,
        InputFlag::Flame | InputFlag::Overheat => true,
    }
}

/// GPIO number of an actuator output.
pub const fn output_gpio(output: OutputFlag) -> i32 {
    match output {
        OutputFlag::Fan => FAN_GPIO,
        OutputFlag::Pump => PUMP_GPIO,
        OutputFlag::Igniter => IGNITER_GPIO,
        OutputFlag::SecurityValve => SECURITY_VALVE_GPIO,
        OutputFlag::Valve1 => VALVE1_GPIO,
        OutputFlag::Valve2 => VALVE2_GPIO,
        OutputFlag::Valve3 => VALVE3_GPIO,
        OutputFlag::StatusLed => STATUS_LED_GPIO,
    }
}

/// ADC1 channel of an analog input.
pub const fn adc_channel(input: AnalogInput) -> u32 {
    match input {
        AnalogInput::DhwTemp => ADC1_CH_DHW_TEMP,
        AnalogInput::ChTemp => ADC1_CH_CH_TEMP,
        AnalogInput::DhwSet => ADC1_CH_DHW_SET,
        AnalogInput::ChSet => ADC1_CH_CH_SET,
        AnalogInput::Mode => ADC1_CH_MODE,
    }
}
