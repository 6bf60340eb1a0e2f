//! Unified error types for the boiler firmware.
//!
//! Two families live here:
//!
//! - [`ErrorCode`]: the user-visible fault taxonomy.  Numbers are stable:
//!   they are blinked on the status LED and shown on the dashboard.
//! - [`TimerError`] / [`ConfigError`]: typed returns of fallible internal
//!   operations.  The FSM propagates `TimerError` with `?`; the engine turns
//!   it into [`ErrorCode::TimerExhausted`].
//!
//! All variants are `Copy` so they pass through the FSM without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Fault codes
// ---------------------------------------------------------------------------

/// A combustion fault.  Raising one forces all gas off and moves the FSM to
/// ERROR, which is the only place a code is ever cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Flame sensed while the burner should be cold.
    FlameOutOfSequence = 1,
    /// Airflow switch closed while the fan should be still, or opened
    /// while the burner is firing.
    AirflowOutOfSequence = 2,
    /// Airflow switch did not close within the fan-test window.
    AirflowNotAsserted = 3,
    /// Airflow switch did not reopen after the fan stopped.
    AirflowNotReleased = 4,
    /// No flame after the maximum number of ignition attempts.
    IgnitionFailure = 5,
    /// DHW thermistor reading at an ADC rail (open or shorted).
    DhwSensorRange = 6,
    /// CH thermistor reading at an ADC rail (open or shorted).
    ChSensorRange = 7,
    /// Central-heating water overtemperature while in CH duty.
    ChOverheat = 8,
    /// Hardware overheat thermostat tripped.
    OverheatThermostat = 9,
    /// No free timer slot.  Timed safety checks can no longer be
    /// guaranteed, so this code halts instead of retrying.
    TimerExhausted = 15,
}

impl ErrorCode {
    /// Numeric code as rendered on the display.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Bit for fault bookkeeping masks.
    pub const fn mask(self) -> u16 {
        1 << self as u8
    }

    /// Whether the ERROR state must latch instead of returning to OFF.
    pub const fn halts(self) -> bool {
        matches!(self, Self::TimerExhausted)
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::FlameOutOfSequence),
            2 => Some(Self::AirflowOutOfSequence),
            3 => Some(Self::AirflowNotAsserted),
            4 => Some(Self::AirflowNotReleased),
            5 => Some(Self::IgnitionFailure),
            6 => Some(Self::DhwSensorRange),
            7 => Some(Self::ChSensorRange),
            8 => Some(Self::ChOverheat),
            9 => Some(Self::OverheatThermostat),
            15 => Some(Self::TimerExhausted),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FlameOutOfSequence => "flame out of sequence",
            Self::AirflowOutOfSequence => "airflow out of sequence",
            Self::AirflowNotAsserted => "airflow switch did not close",
            Self::AirflowNotReleased => "airflow switch did not open",
            Self::IgnitionFailure => "ignition failure",
            Self::DhwSensorRange => "DHW sensor out of range",
            Self::ChSensorRange => "CH sensor out of range",
            Self::ChOverheat => "CH water overheat",
            Self::OverheatThermostat => "overheat thermostat tripped",
            Self::TimerExhausted => "timer slots exhausted",
        };
        write!(f, "E{:02} {}", self.code(), text)
    }
}

// ---------------------------------------------------------------------------
// Timer service errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Every slot is occupied by a live timer.
    NoFreeSlot,
    /// No live slot carries the requested id.
    NotFound,
    /// The slot's mode does not permit re-arming.
    ModeForbidsRestart,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFreeSlot => write!(f, "no free timer slot"),
            Self::NotFound => write!(f, "timer not found"),
            Self::ModeForbidsRestart => write!(f, "timer mode forbids restart"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for ErrorCode {
    /// Any timer failure inside the control sequence means timed safety
    /// checks are no longer trustworthy.
    fn from(_: TimerError) -> Self {
        Self::TimerExhausted
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the text names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
